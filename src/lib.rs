//! # Research Pipeline
//!
//! Pipeline de assistente de pesquisa: a partir de um objetivo, gera
//! variantes de busca, agrega e deduplica resultados, ranqueia por
//! relevância com um modelo de linguagem, lê as melhores páginas e
//! extrai achados estruturados (resumo, relevância, contatos, próximas
//! ações) num relatório único.
//!
//! ## Fluxo
//!
//! ```text
//! ResearchOrchestrator
//!   ├── expand_queries ──────────────► ModelInvoker (cadeia de expansão)
//!   ├── SearchAggregator
//!   │     ├── SearchProvider (fan-out limitado)
//!   │     └── RelevanceRanker ───────► ModelInvoker (cadeia de ranking)
//!   ├── select_urls (top-K)
//!   ├── ContentFetcher + ContentAnalyzer ─► ModelInvoker (análise + endereços)
//!   └── WebsiteRanker (opcional) ────► ModelInvoker (cadeia de importância)
//! ```
//!
//! ## Cadeias de fallback
//!
//! Toda chamada a modelo passa por uma [`llm::FallbackChain`]: backends em
//! ordem, o primeiro sucesso encerra a cadeia e, se todos falham, o erro
//! carrega o motivo da última falha. Nomes fora do registro falham antes
//! de qualquer chamada de rede.
//!
//! ## Exemplo de Uso
//!
//! ```rust,ignore
//! use research_pipeline::prelude::*;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = load_research_config();
//!     let orchestrator = ResearchOrchestrator::new(
//!         config.clone(),
//!         Arc::new(HttpLlmClient::new(&config)),
//!         Arc::new(GoogleSearchClient::from_config(&config)?),
//!         Arc::new(HttpFetcher::new(&config)),
//!     );
//!     let report = orchestrator.research(&ResearchRequest::new("Mieterverein Berlin")).await;
//!     println!("{} resultados", report.total_results);
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Tipos compartilhados: resultados de busca, ranking, análise e relatório.
pub mod types;

/// Configuração explícita do pipeline (credenciais, cadeias, limites).
pub mod config;

/// Invocação de modelos por nome, registro de backends e cadeia de fallback.
///
/// - [`llm::ModelInvoker`]: valida o nome e chama o transporte
/// - [`llm::FallbackChain`]: tenta backends em ordem
/// - [`llm::HttpLlmClient`]: transporte HTTP para as três famílias de protocolo
/// - [`llm::MockLlmClient`]: respostas programadas para testes
pub mod llm;

/// Parser de saída estruturada (seções rotuladas, batch de ratings, listas).
pub mod parser;

/// Prompts enviados aos modelos.
pub mod prompts;

/// Provedores de busca (Google Custom Search, mock).
pub mod search;

/// Leitura de páginas (HTTP + Readability, mock).
pub mod fetcher;

/// Ranking de relevância em batch.
pub mod ranker;

/// Agregação concorrente de buscas com deduplicação.
pub mod aggregator;

/// Análise de páginas e extração de contatos.
pub mod analyzer;

/// Ranking de importância dos sites analisados.
pub mod importance;

/// Orquestração das etapas de uma pesquisa.
pub mod orchestrator;

/// Utilitários de texto e tempo.
pub mod utils;

// Re-exports principais
pub use config::{load_research_config, ResearchConfig};
pub use orchestrator::{ResearchOrchestrator, ResearchRequest};
pub use types::*;

/// Versão da biblioteca.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude com imports comuns para uso rápido.
///
/// ```rust,ignore
/// use research_pipeline::prelude::*;
/// ```
pub mod prelude {
    pub use crate::aggregator::{AggregationOutcome, SearchAggregator};
    pub use crate::analyzer::ContentAnalyzer;
    pub use crate::config::{load_research_config, ResearchConfig};
    pub use crate::fetcher::{ContentFetcher, HttpFetcher, MockFetcher};
    pub use crate::importance::WebsiteRanker;
    pub use crate::llm::{
        FallbackChain, HttpLlmClient, LlmClient, LlmError, MockLlmClient, ModelInvoker,
    };
    pub use crate::orchestrator::{
        ProgressCallback, ResearchOrchestrator, ResearchProgress, ResearchRequest, ResearchStage,
    };
    pub use crate::ranker::{RankingOutcome, RelevanceRanker};
    pub use crate::search::{GoogleSearchClient, MockSearchProvider, RawSearchHit, SearchProvider};
    pub use crate::types::*;
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
