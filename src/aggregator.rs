// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// AGREGADOR DE BUSCAS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Uma busca por query, com fan-out limitado e um único ponto de junção.
// Merge na ordem das queries, dedup por URL normalizada (primeira
// ocorrência vence), depois ranking e achatamento por categoria.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;

use crate::ranker::RelevanceRanker;
use crate::search::{normalize_url, RawSearchHit, SearchProvider};
use crate::types::{RankedResult, SearchResult};

/// Resultado de uma agregação
#[derive(Debug, Clone, Default)]
pub struct AggregationOutcome {
    /// Resultados ranqueados e achatados (já truncados)
    pub results: Vec<RankedResult>,
    /// Resultados distintos antes do ranking
    pub unique_results: usize,
    /// Erro do ranking, se houve
    pub ranking_error: Option<String>,
}

/// Agregador de buscas
pub struct SearchAggregator {
    provider: Arc<dyn SearchProvider>,
    ranker: RelevanceRanker,
    results_per_query: usize,
    max_concurrent: usize,
}

impl SearchAggregator {
    /// Cria o agregador
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        ranker: RelevanceRanker,
        results_per_query: usize,
        max_concurrent: usize,
    ) -> Self {
        Self {
            provider,
            ranker,
            results_per_query,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Executa todas as buscas e devolve os resultados distintos normalizados.
    ///
    /// Falha de uma query vira lista vazia para aquela query.
    pub async fn gather(&self, queries: &[String]) -> Vec<SearchResult> {
        let per_query: Vec<Vec<RawSearchHit>> = stream::iter(queries.iter())
            .map(|query| async move {
                match self.provider.search(query, self.results_per_query).await {
                    Ok(hits) => {
                        log::info!("🔍 '{}' → {} resultados", query, hits.len());
                        hits
                    }
                    Err(e) => {
                        log::warn!("⚠️ Busca '{}' falhou: {}", query, e);
                        Vec::new()
                    }
                }
            })
            .buffered(self.max_concurrent)
            .collect()
            .await;

        merge_hits(per_query)
    }

    /// Busca, deduplica, ranqueia e achata. `max_results` trunca a lista final.
    pub async fn aggregate(
        &self,
        queries: &[String],
        objective: &str,
        max_results: Option<usize>,
    ) -> AggregationOutcome {
        let unique = self.gather(queries).await;
        log::info!("🧮 {} queries → {} resultados distintos", queries.len(), unique.len());

        if unique.is_empty() {
            return AggregationOutcome::default();
        }

        let ranking = self.ranker.rank(&unique, objective).await;
        let mut results = ranking.flatten();
        if let Some(max) = max_results {
            results.truncate(max);
        }

        AggregationOutcome {
            results,
            unique_results: unique.len(),
            ranking_error: ranking.error,
        }
    }
}

/// Merge na ordem das queries, dedup por URL normalizada, sem URL descartado
pub fn merge_hits(per_query: Vec<Vec<RawSearchHit>>) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for hit in per_query.into_iter().flatten() {
        let Some(url) = hit.url.as_deref().and_then(normalize_url) else {
            continue;
        };
        if !seen.insert(url.clone()) {
            continue;
        }

        merged.push(SearchResult {
            url,
            title: hit.title.unwrap_or_default().trim().to_string(),
            snippet: hit.snippet.unwrap_or_default().trim().to_string(),
            publication_date: hit
                .date
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        });
    }

    merged
}
