// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RANKING DE RELEVÂNCIA
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Um prompt em batch para todos os resultados, na cadeia de ranking.
// Cada item com rating reconhecido vai para uma das quatro categorias;
// itens sem rating na resposta ficam fora de todas elas.
// Dentro da categoria: ordem estável por `rank_score` decrescente.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::llm::{FallbackChain, ModelInvoker};
use crate::parser::parse_rating_batch;
use crate::prompts::ranking_prompt;
use crate::types::{RankedResult, RelevanceTier, SearchResult};

/// Resultado do ranking
#[derive(Debug, Clone, Default)]
pub struct RankingOutcome {
    /// Resultados por categoria (todas as quatro chaves presentes)
    pub tiers: BTreeMap<RelevanceTier, Vec<RankedResult>>,
    /// Backend que respondeu
    pub backend: Option<String>,
    /// Erro quando todos os backends falharam
    pub error: Option<String>,
}

impl RankingOutcome {
    fn empty() -> Self {
        Self {
            tiers: RelevanceTier::ALL.iter().map(|t| (*t, Vec::new())).collect(),
            backend: None,
            error: None,
        }
    }

    /// Resultados de uma categoria
    pub fn tier(&self, tier: RelevanceTier) -> &[RankedResult] {
        self.tiers.get(&tier).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Achata as categorias: muito relevante → não relevante
    pub fn flatten(&self) -> Vec<RankedResult> {
        RelevanceTier::ALL
            .iter()
            .flat_map(|t| self.tier(*t).iter().cloned())
            .collect()
    }

    /// Total de resultados ranqueados
    pub fn len(&self) -> usize {
        self.tiers.values().map(Vec::len).sum()
    }

    /// Verifica se nenhum resultado foi ranqueado
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ranker de relevância
pub struct RelevanceRanker {
    invoker: Arc<ModelInvoker>,
    chain: FallbackChain,
}

impl RelevanceRanker {
    /// Cria o ranker com a cadeia de ranking
    pub fn new(invoker: Arc<ModelInvoker>, chain: FallbackChain) -> Self {
        Self { invoker, chain }
    }

    /// Ranqueia os resultados em relação à query.
    ///
    /// Entrada vazia não chama o modelo.
    pub async fn rank(&self, results: &[SearchResult], query: &str) -> RankingOutcome {
        let mut outcome = RankingOutcome::empty();

        if results.is_empty() {
            return outcome;
        }

        log::info!("📊 Ranqueando {} resultados para: {}", results.len(), query);

        let prompt = ranking_prompt(query, results);
        let success = match self.chain.run(&self.invoker, &prompt).await {
            Ok(success) => success,
            Err(e) => {
                log::error!("❌ Ranking falhou: {}", e);
                outcome.error = Some(e.to_string());
                return outcome;
            }
        };

        let entries = parse_rating_batch(&success.text, results.len());
        if entries.len() < results.len() {
            log::warn!(
                "⚠️ {} de {} resultados sem rating na resposta de {}",
                results.len() - entries.len(),
                results.len(),
                success.backend
            );
        }

        for entry in entries {
            let tier = RelevanceTier::from_rating(&entry.rating);
            let ranked = RankedResult::new(results[entry.index].clone(), tier, entry.explanation);
            outcome.tiers.entry(tier).or_default().push(ranked);
        }

        for bucket in outcome.tiers.values_mut() {
            // sort_by é estável: empates mantêm a ordem de entrada
            bucket.sort_by(|a, b| b.rank_score.total_cmp(&a.rank_score));
        }

        log::info!(
            "📊 Ranking via {}: {}",
            success.backend,
            RelevanceTier::ALL
                .iter()
                .map(|t| format!("{}={}", t.label(), outcome.tier(*t).len()))
                .collect::<Vec<_>>()
                .join(" | ")
        );

        outcome.backend = Some(success.backend);
        outcome
    }
}
