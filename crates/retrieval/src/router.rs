//! Query router
//!
//! Classifies a natural-language question into one of five retrieval routes,
//! checked strictly in priority order:
//!
//! 1. Exact protocol: first run of 14+ digits anywhere in the query
//! 2. Exact appeal id: 4-8 digit run that is a known appeal id
//! 3. Cross-entity: appeal-vocabulary keyword present
//! 4. (handled by the assembler as the empty-result fallback of 3)
//! 5. Plain request similarity
//!
//! When the recurso collection is unavailable, routes 2 and 3 are skipped and
//! every non-protocol query falls through to request similarity.

use crate::repository::CorpusRepository;
use regex_lite::Regex;
use std::sync::OnceLock;

/// Keyword vocabulary for the cross-entity route (checked on the lowercased
/// query, substring match)
const APPEAL_KEYWORDS: &[&str] = &[
    "recurso",
    "recursos",
    "reclamação",
    "indeferido",
    "negado",
    "deferido",
    "decisão",
    "recursal",
    "recorrido",
];

fn protocol_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{14,}\b").unwrap())
}

fn appeal_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{4,8}\b").unwrap())
}

/// Resolved retrieval route for one query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Exact pedido lookup by NUP protocol
    Protocol(String),
    /// Exact recurso lookup by id
    AppealId(u64),
    /// Requests-with-appeals search driven by appeal vocabulary
    CrossEntity,
    /// Plain recurso similarity; never produced by classification, selected
    /// by the assembler when the cross-entity stage comes back empty
    AppealSimilarity,
    /// Default semantic search over pedidos
    RequestSimilarity,
}

impl Route {
    /// Stable label for metrics and logs
    pub fn label(&self) -> &'static str {
        match self {
            Route::Protocol(_) => "protocol",
            Route::AppealId(_) => "appeal_id",
            Route::CrossEntity => "cross_entity",
            Route::AppealSimilarity => "appeal_similarity",
            Route::RequestSimilarity => "request_similarity",
        }
    }
}

/// Classify a query against the corpus. `appeals_available` gates the
/// appeal-dependent routes; pure function of its inputs otherwise.
pub fn classify_route(query: &str, repo: &CorpusRepository, appeals_available: bool) -> Route {
    if let Some(m) = protocol_pattern().find(query) {
        return Route::Protocol(m.as_str().to_string());
    }

    if appeals_available {
        // A 4-8 digit run only routes here when it is a known appeal id;
        // arbitrary short numbers (years, counts) fall through.
        for m in appeal_id_pattern().find_iter(query) {
            if let Ok(id) = m.as_str().parse::<u64>() {
                if repo.known_appeal_id(id) {
                    return Route::AppealId(id);
                }
            }
        }

        let lowered = query.to_lowercase();
        if APPEAL_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
            return Route::CrossEntity;
        }
    }

    Route::RequestSimilarity
}

#[cfg(test)]
mod tests {
    use super::*;
    use lai_common::models::{AppealRecord, RequestRecord};

    fn repo() -> CorpusRepository {
        let request = RequestRecord {
            request_id: 1,
            protocol: "23480019876202411".to_string(),
            organization: None,
            status: None,
            registered_at: None,
            summary: Some("acesso a contratos".into()),
            details: None,
            sentence: "acesso a contratos <SEP> ".into(),
        };
        let appeal = AppealRecord {
            appeal_id: 54321,
            protocol: Some("23480019876202411".into()),
            appeal_type: None,
            description: Some("recurso de primeira instância".into()),
            decision: Some("Indeferido".into()),
            instance: Some("CGU".into()),
            organization: None,
            sentence: " <SEP> recurso".into(),
        };
        CorpusRepository::new(vec![request], vec![appeal])
    }

    #[test]
    fn test_protocol_route() {
        let route = classify_route("qual o andamento do pedido 23480019876202411?", &repo(), true);
        assert_eq!(route, Route::Protocol("23480019876202411".into()));
    }

    #[test]
    fn test_protocol_beats_appeal_keyword() {
        // Both a protocol and appeal vocabulary present: protocol wins
        let route = classify_route("recurso sobre o pedido 23480019876202411", &repo(), true);
        assert_eq!(route, Route::Protocol("23480019876202411".into()));
    }

    #[test]
    fn test_appeal_id_requires_membership() {
        assert_eq!(
            classify_route("detalhes do recurso 54321", &repo(), true),
            Route::AppealId(54321)
        );
        // 2024 matches the digit pattern but is no known appeal id, and the
        // query has no appeal keyword either
        assert_eq!(
            classify_route("pedidos registrados em 2024", &repo(), true),
            Route::RequestSimilarity
        );
    }

    #[test]
    fn test_first_matching_appeal_id_wins() {
        assert_eq!(
            classify_route("compare 1111 com 54321", &repo(), true),
            Route::AppealId(54321)
        );
    }

    #[test]
    fn test_keyword_route_is_case_insensitive() {
        assert_eq!(
            classify_route("Quais pedidos foram INDEFERIDOS?", &repo(), true),
            Route::CrossEntity
        );
        assert_eq!(
            classify_route("Houve alguma decisão recente?", &repo(), true),
            Route::CrossEntity
        );
    }

    #[test]
    fn test_similarity_is_the_default() {
        assert_eq!(
            classify_route("pedidos sobre meio ambiente", &repo(), true),
            Route::RequestSimilarity
        );
    }

    #[test]
    fn test_appeals_unavailable_degrades_to_similarity() {
        assert_eq!(
            classify_route("detalhes do recurso 54321", &repo(), false),
            Route::RequestSimilarity
        );
        // Protocol route does not depend on the appeal collection
        assert_eq!(
            classify_route("pedido 23480019876202411", &repo(), false),
            Route::Protocol("23480019876202411".into())
        );
    }
}
