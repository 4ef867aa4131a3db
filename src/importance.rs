// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RANKING DE IMPORTÂNCIA DOS SITES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Etapa opcional depois da análise: uma chamada por site analisado pedindo
// `Importance: ...` e uma lista de próximas ações.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

use crate::analyzer::MAX_NEXT_ACTIONS;
use crate::llm::{FallbackChain, ModelInvoker};
use crate::parser::strip_bullet;
use crate::prompts::importance_prompt;
use crate::types::{AnalysisResult, Importance, RankedWebsite};

static IMPORTANCE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^[\s*#]*importance\s*\**\s*:\s*\**\s*(.+?)\s*$").unwrap());

/// Lê a importância e as ações de uma resposta.
///
/// Sem linha `Importance:` → `SomewhatImportant`.
pub fn parse_importance(text: &str) -> (Importance, Vec<String>) {
    let importance = IMPORTANCE_LINE
        .captures(text)
        .map(|caps| Importance::from_label(&caps[1]))
        .unwrap_or(Importance::SomewhatImportant);

    let actions = text
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("- ") || line.starts_with("* ") || line.starts_with('•'))
        .map(strip_bullet)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .take(MAX_NEXT_ACTIONS)
        .collect();

    (importance, actions)
}

/// Ranker de importância dos sites analisados
pub struct WebsiteRanker {
    invoker: Arc<ModelInvoker>,
    chain: FallbackChain,
}

impl WebsiteRanker {
    /// Cria o ranker com a cadeia de importância
    pub fn new(invoker: Arc<ModelInvoker>, chain: FallbackChain) -> Self {
        Self { invoker, chain }
    }

    /// Avalia cada análise e ordena: muito importante → desconhecido.
    ///
    /// Análises com erro entram como `Unknown` sem chamada ao modelo.
    pub async fn rank_websites(&self, query: &str, analyses: &[AnalysisResult]) -> Vec<RankedWebsite> {
        let mut ranked = Vec::with_capacity(analyses.len());

        for analysis in analyses {
            ranked.push(self.rank_one(query, analysis).await);
        }

        ranked.sort_by_key(|site| site.importance);
        ranked
    }

    async fn rank_one(&self, query: &str, analysis: &AnalysisResult) -> RankedWebsite {
        let mut site = RankedWebsite {
            title: analysis.title.clone(),
            url: analysis.url.clone(),
            summary: analysis.summary.clone(),
            importance: Importance::Unknown,
            relevance: analysis.relevance_rating,
            next_actions: analysis.next_actions.clone(),
            error: analysis.error.clone(),
        };

        if analysis.is_error() {
            return site;
        }

        let prompt = importance_prompt(query, analysis);
        match self.chain.run(&self.invoker, &prompt).await {
            Ok(success) => {
                let (importance, actions) = parse_importance(&success.text);
                site.importance = importance;
                if !actions.is_empty() {
                    site.next_actions = actions;
                }
                log::info!("🏅 {} → {}", site.url, importance);
            }
            Err(e) => {
                log::warn!("⚠️ Importância de {} não avaliada: {}", site.url, e);
                site.error = Some(e.to_string());
            }
        }

        site
    }
}
