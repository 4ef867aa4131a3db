// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ORQUESTRADOR DE PESQUISA
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Estágios de uma execução:
//
//   ExpandQueries → Aggregate → SelectUrls → AnalyzeEach → [RankWebsites] → Assemble
//
// Só a busca roda em paralelo (dentro do agregador). Falhas parciais
// ficam nos resultados; o erro de topo só é definido quando a execução
// não tem como prosseguir.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use futures::FutureExt;
use std::collections::HashSet;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::aggregator::SearchAggregator;
use crate::analyzer::{panic_message, ContentAnalyzer};
use crate::config::ResearchConfig;
use crate::fetcher::ContentFetcher;
use crate::importance::WebsiteRanker;
use crate::llm::{FallbackChain, LlmClient, ModelInvoker};
use crate::parser::extract_quoted;
use crate::prompts::query_expansion_prompt;
use crate::ranker::RelevanceRanker;
use crate::search::SearchProvider;
use crate::types::{AnalysisResult, RankedResult, ResearchReport};
use crate::utils::{normalize_query, StageTimer, StageTimings};

/// Erro de topo quando a busca não trouxe nada
pub const NO_RESULTS_ERROR: &str = "No relevant search results found";

/// Pedido de pesquisa
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchRequest {
    /// Objetivo (guia prompts e ranking)
    pub objective: String,
    /// Query inicial; padrão = objetivo
    pub initial_query: Option<String>,
}

impl ResearchRequest {
    /// Pedido cuja query inicial é o próprio objetivo
    pub fn new(objective: impl Into<String>) -> Self {
        Self {
            objective: objective.into(),
            initial_query: None,
        }
    }

    /// Define a query inicial (ignorada se em branco)
    pub fn with_initial_query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.initial_query = Some(query).filter(|q| !q.trim().is_empty());
        self
    }

    /// Query inicial efetiva
    pub fn initial_query(&self) -> &str {
        self.initial_query.as_deref().unwrap_or(&self.objective).trim()
    }
}

/// Estágio de uma execução
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchStage {
    /// Geração das variantes de busca
    ExpandQueries,
    /// Busca, deduplicação e ranking
    Aggregate,
    /// Escolha das top-K URLs
    SelectUrls,
    /// Leitura e análise de cada URL
    AnalyzeEach,
    /// Ranking de importância (opcional)
    RankWebsites,
    /// Montagem do relatório
    Assemble,
}

impl ResearchStage {
    /// Nome curto (usado nos tempos por estágio)
    pub fn name(&self) -> &'static str {
        match self {
            Self::ExpandQueries => "expand_queries",
            Self::Aggregate => "aggregate",
            Self::SelectUrls => "select_urls",
            Self::AnalyzeEach => "analyze_each",
            Self::RankWebsites => "rank_websites",
            Self::Assemble => "assemble",
        }
    }
}

impl fmt::Display for ResearchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Eventos de progresso
#[derive(Debug, Clone, PartialEq)]
pub enum ResearchProgress {
    /// Entrou num estágio
    Stage(ResearchStage),
    /// Queries que serão buscadas
    Queries(Vec<String>),
    /// Resultados da agregação
    Results {
        /// Distintos antes do ranking
        unique: usize,
        /// Na lista ranqueada final
        ranked: usize,
    },
    /// Analisando uma URL
    Analyzing {
        /// Posição (1-indexada)
        index: usize,
        /// URLs selecionadas
        total: usize,
        /// URL em análise
        url: String,
    },
    /// URL pulada
    Skipped {
        /// URL pulada
        url: String,
        /// Erro de leitura ou mensagem do panic
        reason: String,
    },
    /// Aviso não fatal
    Warning(String),
    /// Execução terminou
    Finished {
        /// Sem erro de topo
        success: bool,
        /// Duração total
        elapsed_ms: u128,
    },
}

/// Tipo do callback de progresso
pub type ProgressCallback = Arc<dyn Fn(ResearchProgress) + Send + Sync>;

/// Orquestrador do pipeline
pub struct ResearchOrchestrator {
    config: ResearchConfig,
    invoker: Arc<ModelInvoker>,
    expansion_chain: FallbackChain,
    aggregator: SearchAggregator,
    analyzer: ContentAnalyzer,
    website_ranker: WebsiteRanker,
    fetcher: Arc<dyn ContentFetcher>,
    progress_callback: Option<ProgressCallback>,
}

impl ResearchOrchestrator {
    /// Monta o pipeline a partir da configuração e dos colaboradores de I/O
    pub fn new(
        config: ResearchConfig,
        llm: Arc<dyn LlmClient>,
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn ContentFetcher>,
    ) -> Self {
        let invoker = Arc::new(ModelInvoker::new(llm));

        let ranker = RelevanceRanker::new(
            invoker.clone(),
            FallbackChain::new(config.backends.ranking.clone()),
        );
        let aggregator = SearchAggregator::new(
            search,
            ranker,
            config.limits.results_per_query,
            config.limits.max_concurrent_searches,
        );
        let analyzer = ContentAnalyzer::new(invoker.clone(), &config);
        let website_ranker = WebsiteRanker::new(
            invoker.clone(),
            FallbackChain::new(config.backends.importance.clone()),
        );

        Self {
            expansion_chain: FallbackChain::new(config.backends.expansion.clone()),
            config,
            invoker,
            aggregator,
            analyzer,
            website_ranker,
            fetcher,
            progress_callback: None,
        }
    }

    /// Define o callback de progresso
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn emit(&self, event: ResearchProgress) {
        if let Some(cb) = &self.progress_callback {
            cb(event);
        }
    }

    /// Gera as queries da execução.
    ///
    /// A query inicial vem sempre primeiro; as variantes são as substrings
    /// entre aspas da resposta. Falha do modelo → só a query inicial.
    pub async fn expand_queries(&self, request: &ResearchRequest) -> Vec<String> {
        let initial = request.initial_query().to_string();
        let mut queries = vec![initial.clone()];
        let mut seen: HashSet<String> = HashSet::from([normalize_query(&initial)]);

        let prompt = query_expansion_prompt(
            &request.objective,
            &initial,
            self.config.limits.query_variants,
            &self.config.query_language,
        );

        match self.expansion_chain.run(&self.invoker, &prompt).await {
            Ok(success) => {
                let candidates = extract_quoted(&success.text);
                if candidates.is_empty() {
                    log::warn!("⚠️ Expansão sem queries entre aspas, usando só a inicial");
                }
                for candidate in candidates.into_iter().take(self.config.limits.query_variants) {
                    if seen.insert(normalize_query(&candidate)) {
                        queries.push(candidate);
                    }
                }
            }
            Err(e) => {
                log::warn!("⚠️ Expansão de queries falhou: {}", e);
                self.emit(ResearchProgress::Warning(format!("query expansion failed: {}", e)));
            }
        }

        log::info!("🧭 Queries: {:?}", queries);
        queries
    }

    /// Top-K URLs da lista ranqueada (sem chamada ao modelo)
    pub fn select_urls(&self, results: &[RankedResult]) -> Vec<String> {
        results
            .iter()
            .take(self.config.limits.urls_to_analyze)
            .map(|r| r.url().to_string())
            .collect()
    }

    /// Lê e analisa uma URL. `None` quando a leitura falha ou entra em panic.
    async fn analyze_url(&self, url: &str, objective: &str) -> Option<AnalysisResult> {
        let attempt = AssertUnwindSafe(async {
            let mut page = self.fetcher.fetch(url).await;
            if let Some(error) = page.error.take() {
                return Err(error);
            }
            page.url = url.to_string();
            Ok(self.analyzer.analyze(&page, objective).await)
        });

        match attempt.catch_unwind().await {
            Ok(Ok(analysis)) => Some(analysis),
            Ok(Err(error)) => {
                log::warn!("⚠️ Pulando {}: {}", url, error);
                self.emit(ResearchProgress::Skipped {
                    url: url.to_string(),
                    reason: error,
                });
                None
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log::error!("💥 Pulando {} após panic: {}", url, message);
                self.emit(ResearchProgress::Skipped {
                    url: url.to_string(),
                    reason: message,
                });
                None
            }
        }
    }

    /// Executa a pesquisa completa
    pub async fn research(&self, request: &ResearchRequest) -> ResearchReport {
        let start = Instant::now();
        let run_id = Uuid::new_v4();
        let mut timings = StageTimings::new();

        log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        log::info!("🔬 Pesquisa {} | objetivo: {}", run_id, request.objective);
        log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        // 1. Expansão
        self.emit(ResearchProgress::Stage(ResearchStage::ExpandQueries));
        let timer = StageTimer::start(ResearchStage::ExpandQueries.name());
        let queries = self.expand_queries(request).await;
        timer.stop_into(&mut timings);
        self.emit(ResearchProgress::Queries(queries.clone()));

        let mut report = ResearchReport::empty(run_id, request.objective.clone(), queries.clone());

        // 2. Busca + ranking
        self.emit(ResearchProgress::Stage(ResearchStage::Aggregate));
        let timer = StageTimer::start(ResearchStage::Aggregate.name());
        let aggregation = self
            .aggregator
            .aggregate(
                &search_queries(&queries, &request.objective),
                &request.objective,
                self.config.limits.max_ranked_results,
            )
            .await;
        timer.stop_into(&mut timings);

        if let Some(error) = &aggregation.ranking_error {
            self.emit(ResearchProgress::Warning(format!("ranking failed: {}", error)));
        }
        self.emit(ResearchProgress::Results {
            unique: aggregation.unique_results,
            ranked: aggregation.results.len(),
        });

        if aggregation.results.is_empty() {
            log::warn!("⚠️ {}", NO_RESULTS_ERROR);
            report.error = Some(NO_RESULTS_ERROR.to_string());
            return self.finish(report, timings, start);
        }

        report.total_results = aggregation.results.len();
        report.all_ranked_results = aggregation.results;

        // 3. Seleção
        self.emit(ResearchProgress::Stage(ResearchStage::SelectUrls));
        let urls = self.select_urls(&report.all_ranked_results);
        log::info!("🎯 {} URLs selecionadas para análise", urls.len());

        // 4. Análise sequencial
        self.emit(ResearchProgress::Stage(ResearchStage::AnalyzeEach));
        let timer = StageTimer::start(ResearchStage::AnalyzeEach.name());
        for (i, url) in urls.iter().enumerate() {
            self.emit(ResearchProgress::Analyzing {
                index: i + 1,
                total: urls.len(),
                url: url.clone(),
            });
            if let Some(analysis) = self.analyze_url(url, &request.objective).await {
                report.analyzed_results.push(analysis);
            }
        }
        timer.stop_into(&mut timings);

        // 5. Importância (opcional)
        if self.config.rank_websites && !report.analyzed_results.is_empty() {
            self.emit(ResearchProgress::Stage(ResearchStage::RankWebsites));
            let timer = StageTimer::start(ResearchStage::RankWebsites.name());
            report.ranked_websites = self
                .website_ranker
                .rank_websites(&request.objective, &report.analyzed_results)
                .await;
            timer.stop_into(&mut timings);
        }

        self.finish(report, timings, start)
    }

    fn finish(&self, mut report: ResearchReport, timings: StageTimings, start: Instant) -> ResearchReport {
        self.emit(ResearchProgress::Stage(ResearchStage::Assemble));

        report.elapsed_ms = start.elapsed().as_millis();
        report.stage_timings = timings;

        log::info!(
            "🏁 Pesquisa {} concluída em {}ms | {} ranqueados, {} analisados | {}",
            report.run_id,
            report.elapsed_ms,
            report.total_results,
            report.analyzed_results.len(),
            report.stage_timings.summary()
        );

        self.emit(ResearchProgress::Finished {
            success: report.is_success(),
            elapsed_ms: report.elapsed_ms,
        });

        report
    }
}

/// Queries efetivamente buscadas: as da execução e, se ainda não estiver
/// entre elas, o próprio objetivo (que não entra em `queries_used`)
fn search_queries(queries: &[String], objective: &str) -> Vec<String> {
    let mut searched = queries.to_vec();
    let objective = objective.trim();

    let already_searched = queries
        .iter()
        .any(|q| normalize_query(q) == normalize_query(objective));
    if !objective.is_empty() && !already_searched {
        searched.push(objective.to_string());
    }

    searched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::MockFetcher;
    use crate::llm::MockLlmClient;
    use crate::search::MockSearchProvider;

    fn orchestrator(llm: MockLlmClient) -> (ResearchOrchestrator, Arc<MockLlmClient>) {
        let llm = Arc::new(llm);
        let orchestrator = ResearchOrchestrator::new(
            ResearchConfig::default(),
            llm.clone(),
            Arc::new(MockSearchProvider::new()),
            Arc::new(MockFetcher::new()),
        );
        (orchestrator, llm)
    }

    #[test]
    fn test_request_initial_query_defaults_to_objective() {
        let request = ResearchRequest::new("tenant help Berlin");
        assert_eq!(request.initial_query(), "tenant help Berlin");

        let request = request.with_initial_query("   ");
        assert_eq!(request.initial_query(), "tenant help Berlin");

        let request = ResearchRequest::new("objective").with_initial_query("Mieterverein");
        assert_eq!(request.initial_query(), "Mieterverein");
    }

    #[tokio::test]
    async fn test_expansion_without_quotes_keeps_only_initial() {
        let (orchestrator, _) = orchestrator(
            MockLlmClient::new().respond("gemini-2.0-flash-exp", "Here are some ideas without quotes."),
        );
        let queries = orchestrator.expand_queries(&ResearchRequest::new("Mieterverein Berlin")).await;
        assert_eq!(queries, vec!["Mieterverein Berlin"]);
    }

    #[tokio::test]
    async fn test_expansion_dedups_and_caps() {
        let reply = "\"Mieterverein Berlin\"\n\"Mieterberatung Berlin\"\n\"Mietrecht Hilfe\"\n\"Mieterschutz\"\n\"Wohnungsamt\"\n\"Extra\"";
        let (orchestrator, _) = orchestrator(MockLlmClient::new().respond("gemini-2.0-flash-exp", reply));

        let queries = orchestrator.expand_queries(&ResearchRequest::new("mieterverein  berlin")).await;
        assert_eq!(queries[0], "mieterverein  berlin");
        assert!(!queries.contains(&"Mieterverein Berlin".to_string()));
        assert_eq!(queries.len(), 4);
    }

    #[test]
    fn test_objective_is_searched_when_initial_differs() {
        let queries = vec!["Mieterverein".to_string(), "Mieterberatung".to_string()];
        assert_eq!(
            search_queries(&queries, "Hilfe für Mieter"),
            vec!["Mieterverein", "Mieterberatung", "Hilfe für Mieter"]
        );
        assert_eq!(search_queries(&queries, " mieterverein "), queries);
        assert_eq!(search_queries(&queries, "  "), queries);
    }

    #[tokio::test]
    async fn test_expansion_failure_falls_back_to_initial() {
        let (orchestrator, _) = orchestrator(MockLlmClient::new().fail("gemini-2.0-flash-exp", "down"));
        let request = ResearchRequest::new("objective").with_initial_query("initial");
        assert_eq!(orchestrator.expand_queries(&request).await, vec!["initial"]);
    }
}
