// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP delivery of finalize payloads and block-completion actions.
//!
//! [`WebhookSink`] implements [`FinalizeSink`] over reqwest. Delivery is
//! best-effort: a non-success response or transport error is returned to the
//! engine, which logs it and moves on. No retries happen here.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use formflow_config::model::FinalizeConfig;
use formflow_core::error::FormflowError;
use formflow_core::traits::FinalizeSink;
use formflow_core::types::{ActionDescriptor, FinalizePayload};

/// Webhook-based finalize sink.
///
/// The finalize endpoint comes from config; block actions carry their own
/// endpoint in the descriptor. An optional API key is sent as `x-api-key`.
pub struct WebhookSink {
    client: Client,
    config: FinalizeConfig,
}

impl WebhookSink {
    pub fn new(config: FinalizeConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Use a pre-built client (custom timeouts, proxies).
    pub fn with_client(config: FinalizeConfig, client: Client) -> Self {
        Self { client, config }
    }

    async fn post_json(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<(), FormflowError> {
        let mut request = self.client.post(endpoint).json(body);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("x-api-key", api_key);
        }
        let response = request.send().await.map_err(|e| FormflowError::Sink {
            message: format!("delivery to {endpoint} failed"),
            source: Some(Box::new(e)),
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FormflowError::Sink {
                message: format!("{endpoint} answered {status}"),
                source: None,
            });
        }
        debug!(endpoint, %status, "webhook delivered");
        Ok(())
    }
}

#[async_trait]
impl FinalizeSink for WebhookSink {
    async fn finalize(&self, payload: &FinalizePayload) -> Result<(), FormflowError> {
        let Some(endpoint) = &self.config.endpoint else {
            debug!("no finalize endpoint configured, dropping payload");
            return Ok(());
        };
        let body = serde_json::to_value(payload).map_err(|e| FormflowError::Sink {
            message: "finalize payload serialization failed".to_string(),
            source: Some(Box::new(e)),
        })?;
        self.post_json(endpoint, &body).await
    }

    async fn deliver_action(&self, action: &ActionDescriptor) -> Result<(), FormflowError> {
        let Some(endpoint) = &action.endpoint else {
            warn!(action = %action.name, "action has no endpoint, skipping");
            return Ok(());
        };
        self.post_json(endpoint, &action.payload).await
    }
}
