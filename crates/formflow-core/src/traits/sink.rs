// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Finalize/action sink trait for outbound side-effect delivery.

use async_trait::async_trait;

use crate::error::FormflowError;
use crate::types::{ActionDescriptor, FinalizePayload};

/// Accepts completed-session payloads and block-level external actions.
///
/// Delivery is at-least-once best-effort from the engine's side: the engine
/// logs failures and moves on, it never retries or awaits completion of the
/// downstream effect.
#[async_trait]
pub trait FinalizeSink: Send + Sync {
    /// Delivers the completed-session payload.
    async fn finalize(&self, payload: &FinalizePayload) -> Result<(), FormflowError>;

    /// Delivers a block-completion action to its external endpoint.
    async fn deliver_action(&self, action: &ActionDescriptor) -> Result<(), FormflowError>;
}
