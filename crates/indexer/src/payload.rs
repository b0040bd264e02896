//! Payload mapping for index points
//!
//! Translates typed records into the flat payload stored next to each
//! vector. Payloads never carry the vector or the embedded sentence; the
//! serving path re-reads text from the in-memory tables.

use lai_common::models::{AppealRecord, RequestRecord};
use lai_common::store::IndexPoint;
use serde_json::{Map, Value};

/// Context tag derived from the judging instance of an appeal
pub fn appeal_context_tag(instance: Option<&str>) -> &'static str {
    match instance {
        Some("CGU") => "orgao_demandado",
        Some(other) if !other.trim().is_empty() => "orgao_julgador",
        _ => "indefinido",
    }
}

fn opt(value: &Option<String>) -> Value {
    match value {
        Some(v) => Value::String(v.clone()),
        None => Value::Null,
    }
}

/// Build the index point for a pedido row
pub fn request_point(row: &RequestRecord, vector: Vec<f32>) -> IndexPoint {
    let mut payload = Map::new();
    payload.insert("protocol".into(), Value::String(row.protocol.clone()));
    payload.insert("organization".into(), opt(&row.organization));
    payload.insert("status".into(), opt(&row.status));
    payload.insert("registered_at".into(), opt(&row.registered_at));
    payload.insert("summary".into(), opt(&row.summary));

    IndexPoint {
        id: row.request_id,
        vector,
        payload,
    }
}

/// Build the index point for a recurso row, including the context tag
pub fn appeal_point(row: &AppealRecord, vector: Vec<f32>) -> IndexPoint {
    let mut payload = Map::new();
    payload.insert("protocol".into(), opt(&row.protocol));
    payload.insert("appeal_type".into(), opt(&row.appeal_type));
    payload.insert("description".into(), opt(&row.description));
    payload.insert("decision".into(), opt(&row.decision));
    payload.insert("instance".into(), opt(&row.instance));
    payload.insert(
        "context".into(),
        Value::String(appeal_context_tag(row.instance.as_deref()).to_string()),
    );

    IndexPoint {
        id: row.appeal_id,
        vector,
        payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn appeal(instance: Option<&str>) -> AppealRecord {
        AppealRecord {
            appeal_id: 7,
            protocol: Some("12345678901234".into()),
            appeal_type: Some("Primeira Instância".into()),
            description: Some("indeferido sem fundamentação".into()),
            decision: Some("Indeferido".into()),
            instance: instance.map(String::from),
            organization: None,
            sentence: String::new(),
        }
    }

    #[test]
    fn test_context_tag_cgu() {
        assert_eq!(appeal_context_tag(Some("CGU")), "orgao_demandado");
    }

    #[test]
    fn test_context_tag_other_instance() {
        assert_eq!(appeal_context_tag(Some("ANATEL")), "orgao_julgador");
    }

    #[test]
    fn test_context_tag_missing_instance() {
        assert_eq!(appeal_context_tag(None), "indefinido");
        assert_eq!(appeal_context_tag(Some("")), "indefinido");
    }

    #[test]
    fn test_appeal_payload_carries_context() {
        let point = appeal_point(&appeal(Some("CGU")), vec![0.1]);
        assert_eq!(point.id, 7);
        assert_eq!(point.payload["context"], "orgao_demandado");
        assert_eq!(point.payload["decision"], "Indeferido");
        assert!(point.payload.get("sentence").is_none());
    }

    #[test]
    fn test_request_payload_nulls_missing_fields() {
        let row = RequestRecord {
            request_id: 3,
            protocol: "99999999999999".into(),
            organization: None,
            status: Some("Concluída".into()),
            registered_at: None,
            summary: Some("resumo".into()),
            details: None,
            sentence: String::new(),
        };
        let point = request_point(&row, vec![0.2]);
        assert_eq!(point.payload["protocol"], "99999999999999");
        assert_eq!(point.payload["organization"], Value::Null);
        assert_eq!(point.payload["status"], "Concluída");
    }
}
