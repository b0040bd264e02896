//! Domain record types for pedidos and recursos
//!
//! Explicit typed records replace the ad hoc payload dictionaries of the
//! upstream data dumps. Optional columns stay `Option` and are rendered with
//! the `"N/A"` placeholder, never silently dropped.

mod dataset;

pub use dataset::{load_appeals, load_requests};

use crate::{NOT_AVAILABLE, SENTENCE_SEPARATOR};
use serde::{Deserialize, Serialize};

/// A freedom-of-information request (pedido)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestRecord {
    /// Numeric point id in the vector collection
    pub request_id: u64,

    /// Unique protocol identifier (kept as string, leading zeros matter)
    pub protocol: String,

    /// Recipient organization
    pub organization: Option<String>,

    /// Current status of the request
    pub status: Option<String>,

    /// Registration date, as provided by the source table
    pub registered_at: Option<String>,

    /// Short summary of the request
    pub summary: Option<String>,

    /// Detailed request text
    pub details: Option<String>,

    /// Canonical embedded text: summary + separator + details
    #[serde(default)]
    pub sentence: String,
}

/// An appeal (recurso) filed against a request decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppealRecord {
    /// Unique appeal id, doubles as the vector point id
    pub appeal_id: u64,

    /// Protocol of the parent request; orphan appeals carry no protocol
    pub protocol: Option<String>,

    /// Appeal type (first instance, second instance, ...)
    pub appeal_type: Option<String>,

    /// Free-text description of the appeal
    pub description: Option<String>,

    /// Decision label (Deferido, Indeferido, ...)
    pub decision: Option<String>,

    /// Judging instance (CGU, ANATEL, ...)
    pub instance: Option<String>,

    /// Organization named in the appeal
    pub organization: Option<String>,

    /// Canonical embedded text: appeal_type + separator + description
    #[serde(default)]
    pub sentence: String,
}

/// Join two optional text columns into the canonical embedded sentence
pub fn build_sentence(left: Option<&str>, right: Option<&str>) -> String {
    format!(
        "{}{}{}",
        left.unwrap_or(""),
        SENTENCE_SEPARATOR,
        right.unwrap_or("")
    )
}

/// True when a sentence carries no embeddable text (separator only)
pub fn sentence_is_blank(sentence: &str) -> bool {
    sentence.trim().is_empty() || sentence.trim() == SENTENCE_SEPARATOR.trim()
}

impl RequestRecord {
    /// Ensure the canonical sentence exists, building it from the text columns
    pub fn ensure_sentence(&mut self) {
        if self.sentence.is_empty() {
            self.sentence = build_sentence(self.summary.as_deref(), self.details.as_deref());
        }
    }

    /// Field accessor with the documented placeholder policy
    pub fn organization_label(&self) -> &str {
        self.organization.as_deref().unwrap_or(NOT_AVAILABLE)
    }

    pub fn status_label(&self) -> &str {
        self.status.as_deref().unwrap_or(NOT_AVAILABLE)
    }

    pub fn date_label(&self) -> &str {
        self.registered_at.as_deref().unwrap_or(NOT_AVAILABLE)
    }
}

impl AppealRecord {
    /// Ensure the canonical sentence exists, building it from the text columns
    pub fn ensure_sentence(&mut self) {
        if self.sentence.is_empty() {
            self.sentence = build_sentence(self.appeal_type.as_deref(), self.description.as_deref());
        }
    }

    /// Decision label, "Em análise" while undecided (matches the source system)
    pub fn decision_label(&self) -> &str {
        self.decision.as_deref().unwrap_or("Em análise")
    }

    pub fn protocol_label(&self) -> &str {
        self.protocol.as_deref().unwrap_or(NOT_AVAILABLE)
    }

    pub fn organization_label(&self) -> &str {
        self.organization.as_deref().unwrap_or(NOT_AVAILABLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(summary: Option<&str>, details: Option<&str>) -> RequestRecord {
        RequestRecord {
            request_id: 1,
            protocol: "12345678901234".into(),
            organization: None,
            status: None,
            registered_at: None,
            summary: summary.map(String::from),
            details: details.map(String::from),
            sentence: String::new(),
        }
    }

    #[test]
    fn test_sentence_building() {
        let mut req = request(Some("resumo"), Some("detalhe"));
        req.ensure_sentence();
        assert_eq!(req.sentence, "resumo <SEP> detalhe");
    }

    #[test]
    fn test_sentence_with_missing_columns() {
        let mut req = request(None, Some("detalhe"));
        req.ensure_sentence();
        assert_eq!(req.sentence, " <SEP> detalhe");
        assert!(!sentence_is_blank(&req.sentence));
    }

    #[test]
    fn test_blank_sentence_detection() {
        let mut req = request(None, None);
        req.ensure_sentence();
        assert!(sentence_is_blank(&req.sentence));
    }

    #[test]
    fn test_placeholder_policy() {
        let req = request(Some("resumo"), None);
        assert_eq!(req.organization_label(), "N/A");
        assert_eq!(req.status_label(), "N/A");
    }

    #[test]
    fn test_appeal_decision_label() {
        let appeal = AppealRecord {
            appeal_id: 42,
            protocol: None,
            appeal_type: Some("Primeira Instância".into()),
            description: None,
            decision: None,
            instance: None,
            organization: None,
            sentence: String::new(),
        };
        assert_eq!(appeal.decision_label(), "Em análise");
        assert_eq!(appeal.protocol_label(), "N/A");
    }
}
