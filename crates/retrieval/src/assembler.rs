//! Context assembler
//!
//! Executes the routed retrieval and renders a bounded Portuguese context
//! string plus structured source records for the answering layer. The public
//! entrypoint never fails: routing or search errors degrade to an
//! internal-error context with an empty source list, so a store outage reads
//! as "no information" instead of a crashed query.

use crate::engine::SearchEngine;
use crate::repository::CorpusRepository;
use crate::router::{classify_route, Route};
use lai_common::config::RetrievalConfig;
use lai_common::errors::Result;
use lai_common::models::{AppealRecord, RequestRecord};
use lai_common::store::ScoredPoint;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

const INTERNAL_ERROR_CONTEXT: &str = "Erro interno ao buscar informações.";

/// Tuning knobs for the assembler, normally taken from `RetrievalConfig`
#[derive(Debug, Clone)]
pub struct AssemblerOptions {
    /// Final result count per query
    pub top_k: usize,
    /// Cross-entity over-fetch multiplier (stage one fetches `k × factor`)
    pub overfetch_factor: usize,
    /// Source excerpt budget, in characters
    pub excerpt_chars: usize,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            overfetch_factor: 5,
            excerpt_chars: 200,
        }
    }
}

impl From<&RetrievalConfig> for AssemblerOptions {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            top_k: config.top_k,
            overfetch_factor: config.overfetch_factor,
            excerpt_chars: config.excerpt_chars,
        }
    }
}

/// Structured provenance for one retrieved document
#[derive(Debug, Clone, Serialize)]
pub struct SourceRecord {
    pub protocol: String,
    pub organization: String,
    pub date: String,
    pub status: String,
    /// Cosine score; fixed `1.0` for exact-identifier routes
    pub score: f32,
    pub excerpt: String,
    /// Linked recurso count, pedido sources only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appeal_count: Option<usize>,
}

pub struct ContextAssembler {
    repo: Arc<CorpusRepository>,
    engine: SearchEngine,
    opts: AssemblerOptions,
    appeals_available: bool,
}

impl ContextAssembler {
    pub fn new(
        repo: Arc<CorpusRepository>,
        engine: SearchEngine,
        opts: AssemblerOptions,
        appeals_available: bool,
    ) -> Self {
        Self {
            repo,
            engine,
            opts,
            appeals_available,
        }
    }

    /// Route and execute one query. Always returns a context string and a
    /// (possibly empty) source list.
    pub async fn resolve_context(&self, query: &str, k: usize) -> (String, Vec<SourceRecord>) {
        let started = Instant::now();
        let route = classify_route(query, &self.repo, self.appeals_available);
        info!(route = route.label(), k, "Query routed");
        metrics::counter!("lai_rag_queries_routed_total", "route" => route.label()).increment(1);

        let outcome = self.execute_route(&route, query, k).await;

        metrics::histogram!("lai_rag_context_resolve_seconds")
            .record(started.elapsed().as_secs_f64());

        match outcome {
            Ok(result) => result,
            Err(e) => {
                error!(route = route.label(), error = %e, "Context resolution failed");
                (INTERNAL_ERROR_CONTEXT.to_string(), Vec::new())
            }
        }
    }

    pub fn lookup_by_protocol(&self, protocol: &str) -> Option<&RequestRecord> {
        self.repo.request_by_protocol(protocol)
    }

    pub fn lookup_by_appeal_id(&self, appeal_id: u64) -> Option<&AppealRecord> {
        self.repo.appeal_by_id(appeal_id)
    }

    async fn execute_route(
        &self,
        route: &Route,
        query: &str,
        k: usize,
    ) -> Result<(String, Vec<SourceRecord>)> {
        match route {
            Route::Protocol(protocol) => Ok(self.protocol_context(protocol)),
            Route::AppealId(id) => Ok(self.appeal_id_context(*id)),
            Route::CrossEntity => {
                let (context, sources) = self.cross_entity_context(query, k).await?;
                if sources.is_empty() {
                    // Fall through to plain appeal similarity
                    metrics::counter!(
                        "lai_rag_queries_routed_total",
                        "route" => Route::AppealSimilarity.label()
                    )
                    .increment(1);
                    return self.appeal_similarity_context(query, k).await;
                }
                Ok((context, sources))
            }
            Route::AppealSimilarity => self.appeal_similarity_context(query, k).await,
            Route::RequestSimilarity => self.request_similarity_context(query, k).await,
        }
    }

    fn protocol_context(&self, protocol: &str) -> (String, Vec<SourceRecord>) {
        let Some(request) = self.repo.request_by_protocol(protocol) else {
            return (
                format!(
                    "Não foi encontrado nenhum pedido com o protocolo {}.",
                    protocol
                ),
                Vec::new(),
            );
        };

        let context = format!(
            "[PEDIDO ESPECÍFICO ENCONTRADO]\n{}",
            self.render_request(1, request)
        );
        let source = self.request_source(request, 1.0, request.summary.as_deref().unwrap_or(""));
        (context, vec![source])
    }

    fn appeal_id_context(&self, appeal_id: u64) -> (String, Vec<SourceRecord>) {
        let Some(appeal) = self.repo.appeal_by_id(appeal_id) else {
            return (
                format!("Não foi encontrado nenhum recurso com o ID {}.", appeal_id),
                Vec::new(),
            );
        };

        let context = format!(
            "[RECURSO ESPECÍFICO ENCONTRADO]\n{}",
            render_appeal(1, appeal)
        );
        let source =
            self.appeal_source(appeal, 1.0, appeal.description.as_deref().unwrap_or(""));
        (context, vec![source])
    }

    /// Multi-stage cross-entity search: over-fetch pedidos by topic, keep
    /// only those with linked recursos, truncate to the first `k` survivors
    /// in original rank order. Empty sources signal the route-4 fallback.
    async fn cross_entity_context(
        &self,
        query: &str,
        k: usize,
    ) -> Result<(String, Vec<SourceRecord>)> {
        let overfetch = k.saturating_mul(self.opts.overfetch_factor).max(k);
        let hits = self.engine.search_requests(query, overfetch).await?;

        let survivors: Vec<(&RequestRecord, f32)> = hits
            .iter()
            .filter_map(|hit| self.resolve_request_hit(hit))
            .filter(|(request, _)| self.repo.has_appeals(&request.protocol))
            .take(k)
            .collect();

        if survivors.is_empty() {
            info!("Cross-entity search found no requests with linked appeals");
            return Ok((
                "Nenhum pedido com recursos sobre este tópico foi encontrado.".to_string(),
                Vec::new(),
            ));
        }

        let mut context = String::from("[PEDIDOS COM RECURSOS VINCULADOS ENCONTRADOS NA BUSCA]\n");
        let mut sources = Vec::with_capacity(survivors.len());
        for (idx, (request, score)) in survivors.iter().enumerate() {
            context.push_str(&self.render_request(idx + 1, request));
            context.push_str("\n\n");
            sources.push(self.request_source(request, *score, &request.sentence));
        }
        Ok((context, sources))
    }

    async fn appeal_similarity_context(
        &self,
        query: &str,
        k: usize,
    ) -> Result<(String, Vec<SourceRecord>)> {
        let hits = self.engine.search_appeals(query, k).await?;

        let found: Vec<(&AppealRecord, f32)> = hits
            .iter()
            .filter_map(|hit| match self.repo.appeal_by_id(hit.id) {
                Some(appeal) => Some((appeal, hit.score)),
                None => {
                    warn!(point_id = hit.id, "Appeal hit not present in corpus");
                    None
                }
            })
            .collect();

        if found.is_empty() {
            return Ok(("Nenhum recurso relevante foi encontrado.".to_string(), Vec::new()));
        }

        let mut context = String::from("[RECURSOS ENCONTRADOS NA BUSCA POR SIMILARIDADE]\n");
        let mut sources = Vec::with_capacity(found.len());
        for (idx, (appeal, score)) in found.iter().enumerate() {
            context.push_str(&render_appeal(idx + 1, appeal));
            context.push('\n');
            sources.push(self.appeal_source(appeal, *score, &appeal.sentence));
        }
        Ok((context, sources))
    }

    async fn request_similarity_context(
        &self,
        query: &str,
        k: usize,
    ) -> Result<(String, Vec<SourceRecord>)> {
        let hits = self.engine.search_requests(query, k).await?;

        let found: Vec<(&RequestRecord, f32)> = hits
            .iter()
            .filter_map(|hit| self.resolve_request_hit(hit))
            .collect();

        if found.is_empty() {
            return Ok(("Nenhum pedido relevante foi encontrado.".to_string(), Vec::new()));
        }

        let mut context = String::from("[PEDIDOS ENCONTRADOS NA BUSCA POR SIMILARIDADE]\n");
        let mut sources = Vec::with_capacity(found.len());
        for (idx, (request, score)) in found.iter().enumerate() {
            context.push_str(&self.render_request(idx + 1, request));
            context.push('\n');
            sources.push(self.request_source(request, *score, &request.sentence));
        }
        Ok((context, sources))
    }

    fn resolve_request_hit<'a>(&'a self, hit: &ScoredPoint) -> Option<(&'a RequestRecord, f32)> {
        match self.repo.request_by_point(hit.id) {
            Some(request) => Some((request, hit.score)),
            None => {
                // Stale index: point exists in the store but not in the
                // loaded tables. Skip rather than fabricate a record.
                warn!(point_id = hit.id, "Request hit not present in corpus");
                None
            }
        }
    }

    fn render_request(&self, idx: usize, request: &RequestRecord) -> String {
        let linked = self.repo.appeals_for_protocol(&request.protocol);
        let mut appeals_block = String::from("Recursos Vinculados: Não há.\n");
        if !linked.is_empty() {
            appeals_block = format!("Recursos Vinculados: SIM ({})\n", linked.len());
            for appeal in &linked {
                appeals_block.push_str(&format!(
                    "  - Recurso ID {}: Decisão '{}'\n",
                    appeal.appeal_id,
                    appeal.decision_label()
                ));
            }
        }

        format!(
            "--- [Documento {}: PEDIDO] ---\n\
             Protocolo: {}\n\
             Órgão: {}\n\
             Situação do Pedido: {}\n\
             {}Conteúdo do Pedido: {}",
            idx,
            request.protocol,
            request.organization_label(),
            request.status_label(),
            appeals_block,
            request.sentence
        )
    }

    fn request_source(&self, request: &RequestRecord, score: f32, text: &str) -> SourceRecord {
        SourceRecord {
            protocol: request.protocol.clone(),
            organization: request.organization_label().to_string(),
            date: request.date_label().to_string(),
            status: request.status_label().to_string(),
            score,
            excerpt: excerpt(text, self.opts.excerpt_chars),
            appeal_count: Some(self.repo.appeals_for_protocol(&request.protocol).len()),
        }
    }

    fn appeal_source(&self, appeal: &AppealRecord, score: f32, text: &str) -> SourceRecord {
        SourceRecord {
            protocol: appeal.protocol_label().to_string(),
            organization: appeal.organization_label().to_string(),
            date: lai_common::NOT_AVAILABLE.to_string(),
            status: format!(
                "Recurso ID {} - Decisão: {}",
                appeal.appeal_id,
                appeal.decision_label()
            ),
            score,
            excerpt: excerpt(text, self.opts.excerpt_chars),
            appeal_count: None,
        }
    }
}

fn render_appeal(idx: usize, appeal: &AppealRecord) -> String {
    format!(
        "--- [Documento {}: RECURSO] ---\n\
         ID do Recurso: {}\n\
         Protocolo do Pedido Associado: {}\n\
         Decisão do Recurso: {}\n\
         Texto do Recurso: {}",
        idx,
        appeal.appeal_id,
        appeal.protocol_label(),
        appeal.decision_label(),
        appeal.sentence
    )
}

/// Truncate to at most `max_chars` characters (never mid-codepoint) and mark
/// the cut with an ellipsis
fn excerpt(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lai_common::embeddings::MockEmbedder;
    use lai_common::errors::AppError;
    use lai_common::store::{IndexPoint, SearchQuery, VectorIndex};
    use std::collections::HashMap;

    fn request(id: u64, protocol: &str, summary: &str) -> RequestRecord {
        RequestRecord {
            request_id: id,
            protocol: protocol.to_string(),
            organization: Some("CGU".into()),
            status: Some("Concluída".into()),
            registered_at: Some("2024-03-01".into()),
            summary: Some(summary.to_string()),
            details: None,
            sentence: format!("{} <SEP> ", summary),
        }
    }

    fn appeal(id: u64, protocol: &str, decision: &str) -> AppealRecord {
        AppealRecord {
            appeal_id: id,
            protocol: Some(protocol.to_string()),
            appeal_type: Some("Primeira Instância".into()),
            description: Some(format!("recurso {}", id)),
            decision: Some(decision.to_string()),
            instance: Some("CGU".into()),
            organization: Some("CGU".into()),
            sentence: format!("Primeira Instância <SEP> recurso {}", id),
        }
    }

    /// Repo with requests 1..=5 (protocols P1..P5); appeals link P1, P2, P3.
    fn repo() -> Arc<CorpusRepository> {
        let requests = (1..=5)
            .map(|i| request(i, &format!("1000000000000{}", i), &format!("pedido {}", i)))
            .collect();
        let appeals = vec![
            appeal(9001, "10000000000001", "Indeferido"),
            appeal(9002, "10000000000002", "Deferido"),
            appeal(9003, "10000000000003", "Indeferido"),
        ];
        Arc::new(CorpusRepository::new(requests, appeals))
    }

    /// Index double returning a scripted hit list per collection, ignoring
    /// the query vector
    struct ScriptedIndex {
        hits: HashMap<String, Vec<ScoredPoint>>,
    }

    impl ScriptedIndex {
        fn new(hits: HashMap<String, Vec<ScoredPoint>>) -> Self {
            Self { hits }
        }

        fn hit(id: u64, score: f32) -> ScoredPoint {
            ScoredPoint {
                id,
                score,
                payload: serde_json::Map::new(),
            }
        }
    }

    #[async_trait]
    impl VectorIndex for ScriptedIndex {
        async fn collection_exists(&self, _collection: &str) -> lai_common::Result<bool> {
            Ok(true)
        }

        async fn delete_collection(&self, _collection: &str) -> lai_common::Result<()> {
            Ok(())
        }

        async fn create_collection(
            &self,
            _collection: &str,
            _dimension: usize,
        ) -> lai_common::Result<()> {
            Ok(())
        }

        async fn upsert(
            &self,
            _collection: &str,
            _points: &[IndexPoint],
        ) -> lai_common::Result<()> {
            Ok(())
        }

        async fn search(
            &self,
            collection: &str,
            query: SearchQuery,
        ) -> lai_common::Result<Vec<ScoredPoint>> {
            let mut hits = self.hits.get(collection).cloned().unwrap_or_default();
            hits.truncate(query.limit);
            Ok(hits)
        }
    }

    /// Index double whose every search fails
    struct FailingIndex;

    #[async_trait]
    impl VectorIndex for FailingIndex {
        async fn collection_exists(&self, _collection: &str) -> lai_common::Result<bool> {
            Ok(true)
        }

        async fn delete_collection(&self, _collection: &str) -> lai_common::Result<()> {
            Ok(())
        }

        async fn create_collection(
            &self,
            _collection: &str,
            _dimension: usize,
        ) -> lai_common::Result<()> {
            Ok(())
        }

        async fn upsert(
            &self,
            _collection: &str,
            _points: &[IndexPoint],
        ) -> lai_common::Result<()> {
            Ok(())
        }

        async fn search(
            &self,
            _collection: &str,
            _query: SearchQuery,
        ) -> lai_common::Result<Vec<ScoredPoint>> {
            Err(AppError::StoreUnavailable {
                message: "injected outage".into(),
            })
        }
    }

    fn assembler_with(store: Arc<dyn VectorIndex>) -> ContextAssembler {
        let embedder = Arc::new(MockEmbedder::new(16));
        let engine = SearchEngine::new(embedder, store, "pedidos", "recursos", None);
        ContextAssembler::new(repo(), engine, AssemblerOptions::default(), true)
    }

    #[tokio::test]
    async fn test_protocol_route_is_exact_lookup() {
        let assembler = assembler_with(Arc::new(FailingIndex));

        // Exact route never touches the store, so the failing index is fine
        let (context, sources) = assembler
            .resolve_context("andamento do pedido 10000000000001", 5)
            .await;

        assert!(context.starts_with("[PEDIDO ESPECÍFICO ENCONTRADO]"));
        assert!(context.contains("Protocolo: 10000000000001"));
        assert!(context.contains("Recursos Vinculados: SIM (1)"));
        assert!(context.contains("- Recurso ID 9001: Decisão 'Indeferido'"));
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].score, 1.0);
        assert_eq!(sources[0].appeal_count, Some(1));
    }

    #[tokio::test]
    async fn test_protocol_miss_renders_explicit_message() {
        let assembler = assembler_with(Arc::new(FailingIndex));
        let (context, sources) = assembler
            .resolve_context("pedido 99999999999999", 5)
            .await;
        assert_eq!(
            context,
            "Não foi encontrado nenhum pedido com o protocolo 99999999999999."
        );
        assert!(sources.is_empty());
    }

    #[tokio::test]
    async fn test_appeal_id_route() {
        let assembler = assembler_with(Arc::new(FailingIndex));
        let (context, sources) = assembler.resolve_context("detalhes do 9002", 5).await;

        assert!(context.starts_with("[RECURSO ESPECÍFICO ENCONTRADO]"));
        assert!(context.contains("ID do Recurso: 9002"));
        assert!(context.contains("Decisão do Recurso: Deferido"));
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].score, 1.0);
        assert!(sources[0].status.contains("Recurso ID 9002"));
    }

    #[tokio::test]
    async fn test_cross_entity_filters_and_keeps_rank_order() {
        // Ranks: 4, 1, 5, 2, 3. Linked protocols: P1, P2, P3. k=2 → [1, 2].
        let hits = vec![
            ScriptedIndex::hit(4, 0.9),
            ScriptedIndex::hit(1, 0.8),
            ScriptedIndex::hit(5, 0.7),
            ScriptedIndex::hit(2, 0.6),
            ScriptedIndex::hit(3, 0.5),
        ];
        let store = Arc::new(ScriptedIndex::new(HashMap::from([(
            "pedidos".to_string(),
            hits,
        )])));
        let assembler = assembler_with(store);

        let (context, sources) = assembler
            .resolve_context("quais pedidos tiveram recurso?", 2)
            .await;

        assert!(context.starts_with("[PEDIDOS COM RECURSOS VINCULADOS ENCONTRADOS NA BUSCA]"));
        let protocols: Vec<&str> = sources.iter().map(|s| s.protocol.as_str()).collect();
        assert_eq!(protocols, vec!["10000000000001", "10000000000002"]);
        // Original rank order preserved, no re-ranking
        assert!(sources[0].score > sources[1].score);
        assert_eq!(sources[0].appeal_count, Some(1));
    }

    #[tokio::test]
    async fn test_cross_entity_empty_falls_through_to_appeal_similarity() {
        // Request hits have no linked appeals; appeal collection has results
        let store = Arc::new(ScriptedIndex::new(HashMap::from([
            (
                "pedidos".to_string(),
                vec![ScriptedIndex::hit(4, 0.9), ScriptedIndex::hit(5, 0.8)],
            ),
            (
                "recursos".to_string(),
                vec![ScriptedIndex::hit(9003, 0.7)],
            ),
        ])));
        let assembler = assembler_with(store);

        let (context, sources) = assembler
            .resolve_context("pedidos com decisão negativa", 2)
            .await;

        assert!(context.starts_with("[RECURSOS ENCONTRADOS NA BUSCA POR SIMILARIDADE]"));
        assert_eq!(sources.len(), 1);
        assert!(sources[0].status.contains("Recurso ID 9003"));
    }

    #[tokio::test]
    async fn test_both_appeal_stages_empty() {
        let store = Arc::new(ScriptedIndex::new(HashMap::new()));
        let assembler = assembler_with(store);

        let (context, sources) = assembler
            .resolve_context("pedidos com decisão negativa", 2)
            .await;

        assert_eq!(context, "Nenhum recurso relevante foi encontrado.");
        assert!(sources.is_empty());
    }

    #[tokio::test]
    async fn test_request_similarity_default_route() {
        let store = Arc::new(ScriptedIndex::new(HashMap::from([(
            "pedidos".to_string(),
            vec![ScriptedIndex::hit(3, 0.9), ScriptedIndex::hit(5, 0.4)],
        )])));
        let assembler = assembler_with(store);

        let (context, sources) = assembler
            .resolve_context("pedidos sobre meio ambiente", 5)
            .await;

        assert!(context.starts_with("[PEDIDOS ENCONTRADOS NA BUSCA POR SIMILARIDADE]"));
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].protocol, "10000000000003");
    }

    #[tokio::test]
    async fn test_store_failure_degrades_to_internal_error() {
        let assembler = assembler_with(Arc::new(FailingIndex));
        let (context, sources) = assembler
            .resolve_context("pedidos sobre meio ambiente", 5)
            .await;
        assert_eq!(context, INTERNAL_ERROR_CONTEXT);
        assert!(sources.is_empty());
    }

    #[tokio::test]
    async fn test_stale_index_hits_are_skipped() {
        // Point 77 exists in the index but not in the loaded tables
        let store = Arc::new(ScriptedIndex::new(HashMap::from([(
            "pedidos".to_string(),
            vec![ScriptedIndex::hit(77, 0.9), ScriptedIndex::hit(1, 0.8)],
        )])));
        let assembler = assembler_with(store);

        let (_, sources) = assembler.resolve_context("qualquer tema", 5).await;
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].protocol, "10000000000001");
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        assert_eq!(excerpt("informação", 8), "informaç...");
        assert_eq!(excerpt("curto", 200), "curto...");
    }

    #[test]
    fn test_source_record_serializes_without_empty_appeal_count() {
        let source = SourceRecord {
            protocol: "N/A".into(),
            organization: "N/A".into(),
            date: "N/A".into(),
            status: "Recurso ID 1 - Decisão: Em análise".into(),
            score: 0.5,
            excerpt: "...".into(),
            appeal_count: None,
        };
        let json = serde_json::to_value(&source).unwrap();
        assert!(json.get("appeal_count").is_none());
    }
}
