// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in evidence validation.
//!
//! Checks type and size constraints on attached files. Semantic checks
//! (does the document actually support the answer) belong to custom
//! [`EvidenceValidator`] implementations layered on top.

use async_trait::async_trait;

use formflow_core::error::FormflowError;
use formflow_core::traits::EvidenceValidator;
use formflow_core::types::{Evidence, EvidenceVerdict, Question, Session};

const DEFAULT_MAX_SIZE_MB: u64 = 10;

const ALLOWED_MIMES: &[&str] = &["application/pdf", "image/jpeg", "image/png"];

/// Deterministic evidence validator: accepted mime types and a per-question
/// size ceiling. Files without a declared mime or size pass those checks,
/// since not every channel reports them.
#[derive(Debug, Default, Clone)]
pub struct BasicEvidenceValidator;

impl BasicEvidenceValidator {
    fn check(question: &Question, evidence: &[Evidence]) -> EvidenceVerdict {
        if evidence.is_empty() {
            return EvidenceVerdict {
                ok: false,
                reason: Some("no files attached".to_string()),
            };
        }
        let max_bytes = question
            .behavior
            .max_evidence_size_mb
            .unwrap_or(DEFAULT_MAX_SIZE_MB)
            * 1024
            * 1024;
        for item in evidence {
            if let Some(mime) = item.mime.as_deref() {
                if !ALLOWED_MIMES.contains(&mime) {
                    return EvidenceVerdict {
                        ok: false,
                        reason: Some(format!("file type {mime} is not accepted")),
                    };
                }
            }
            if let Some(size) = item.size_bytes {
                if size > max_bytes {
                    return EvidenceVerdict {
                        ok: false,
                        reason: Some(format!(
                            "file larger than {} MB",
                            max_bytes / (1024 * 1024)
                        )),
                    };
                }
            }
        }
        EvidenceVerdict { ok: true, reason: None }
    }
}

#[async_trait]
impl EvidenceValidator for BasicEvidenceValidator {
    async fn validate(
        &self,
        question: &Question,
        evidence: &[Evidence],
        _session: &Session,
    ) -> Result<EvidenceVerdict, FormflowError> {
        Ok(Self::check(question, evidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use formflow_core::types::QuestionType;

    fn evidence(mime: Option<&str>, size_bytes: Option<u64>) -> Evidence {
        Evidence {
            url: "https://files.example.test/a".to_string(),
            mime: mime.map(str::to_string),
            filename: None,
            size_bytes,
            attached_at: Utc::now(),
        }
    }

    fn question() -> Question {
        Question::new("doc", "Upload the document", QuestionType::Text)
    }

    #[test]
    fn accepts_pdf_within_default_ceiling() {
        let verdict =
            BasicEvidenceValidator::check(&question(), &[evidence(Some("application/pdf"), Some(1024))]);
        assert!(verdict.ok);
    }

    #[test]
    fn rejects_unknown_mime() {
        let verdict =
            BasicEvidenceValidator::check(&question(), &[evidence(Some("application/zip"), None)]);
        assert!(!verdict.ok);
        assert!(verdict.reason.unwrap().contains("application/zip"));
    }

    #[test]
    fn rejects_oversized_file_per_question_ceiling() {
        let mut q = question();
        q.behavior.max_evidence_size_mb = Some(1);
        let verdict =
            BasicEvidenceValidator::check(&q, &[evidence(Some("image/png"), Some(2 * 1024 * 1024))]);
        assert!(!verdict.ok);
        assert!(verdict.reason.unwrap().contains("1 MB"));
    }

    #[test]
    fn missing_metadata_passes() {
        let verdict = BasicEvidenceValidator::check(&question(), &[evidence(None, None)]);
        assert!(verdict.ok);
    }

    #[test]
    fn empty_attachment_set_is_rejected() {
        let verdict = BasicEvidenceValidator::check(&question(), &[]);
        assert!(!verdict.ok);
    }
}
