// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ANALISADOR DE CONTEÚDO
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Produz um `AnalysisResult` para uma página já lida:
// 1. Leitura falhou → variante de erro, nenhuma chamada ao modelo
// 2. Prompt de análise na cadeia de análise → seções do contrato v1
// 3. Contatos por regex sobre o texto completo
// 4. Endereços pelo modelo sobre um prefixo do texto
//
// `analyze` é total: falhas viram dados, panics viram variante de erro.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

mod contact;

pub use contact::{extract_contacts, parse_addresses};

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::config::ResearchConfig;
use crate::llm::{FallbackChain, ModelInvoker};
use crate::parser::{
    parse_bullet_list, parse_sections, ANALYSIS_CONTRACT, NEXT_ACTIONS, RELEVANCE,
    RELEVANCE_EXPLANATION, SUMMARY,
};
use crate::prompts::{address_prompt, page_analysis_prompt};
use crate::types::{AnalysisResult, FetchedContent, RelevanceTier};

/// Explicação usada quando a página não pôde ser lida
pub const FETCH_ERROR_EXPLANATION: &str = "Error accessing content";

/// Explicação usada quando a análise entrou em panic
pub const PANIC_EXPLANATION: &str = "Error analyzing content";

/// Máximo de próximas ações mantidas
pub const MAX_NEXT_ACTIONS: usize = 5;

/// Analisador de páginas
pub struct ContentAnalyzer {
    invoker: Arc<ModelInvoker>,
    analysis_chain: FallbackChain,
    address_chain: FallbackChain,
    analysis_text_chars: usize,
    address_text_chars: usize,
}

impl ContentAnalyzer {
    /// Cria o analisador com as cadeias e limites da configuração
    pub fn new(invoker: Arc<ModelInvoker>, config: &ResearchConfig) -> Self {
        Self {
            invoker,
            analysis_chain: FallbackChain::new(config.backends.analysis.clone()),
            address_chain: FallbackChain::new(config.backends.address.clone()),
            analysis_text_chars: config.limits.analysis_text_chars,
            address_text_chars: config.limits.address_text_chars,
        }
    }

    /// Analisa uma página. Nunca falha nem propaga panic.
    pub async fn analyze(&self, page: &FetchedContent, query: &str) -> AnalysisResult {
        match AssertUnwindSafe(self.analyze_page(page, query))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log::error!("💥 Análise de {} entrou em panic: {}", page.url, message);
                AnalysisResult::failed(&page.url, &page.title, PANIC_EXPLANATION, message)
            }
        }
    }

    async fn analyze_page(&self, page: &FetchedContent, query: &str) -> AnalysisResult {
        if let Some(error) = &page.error {
            log::warn!("⚠️ Página {} sem conteúdo: {}", page.url, error);
            return AnalysisResult::failed(&page.url, &page.title, FETCH_ERROR_EXPLANATION, error);
        }

        log::info!("🔬 Analisando: {} ({} chars)", page.url, page.text.len());

        let prompt = page_analysis_prompt(query, &page.title, &page.text, self.analysis_text_chars);
        let analysis = self.analysis_chain.run(&self.invoker, &prompt).await;

        let mut contact_info = extract_contacts(&page.text);
        contact_info.addresses = self.extract_addresses(&page.text).await;

        match analysis {
            Ok(success) => {
                let sections = parse_sections(&success.text, &ANALYSIS_CONTRACT);
                if sections.found_count() == 0 {
                    log::warn!(
                        "⚠️ Resposta de {} sem nenhuma seção reconhecida ({})",
                        success.backend,
                        page.url
                    );
                }

                let relevance = sections.get(RELEVANCE);
                let relevance_rating = if relevance.is_empty() {
                    RelevanceTier::NotRelevant
                } else {
                    RelevanceTier::from_rating(relevance.lines().next().unwrap_or(relevance))
                };

                let next_actions = parse_bullet_list(sections.get(NEXT_ACTIONS))
                    .into_iter()
                    .take(MAX_NEXT_ACTIONS)
                    .collect();

                log::info!("✅ {} → {} (via {})", page.url, relevance_rating, success.backend);

                AnalysisResult {
                    url: page.url.clone(),
                    title: page.title.clone(),
                    summary: sections.get(SUMMARY).to_string(),
                    relevance_rating,
                    relevance_explanation: sections.get(RELEVANCE_EXPLANATION).to_string(),
                    contact_info,
                    next_actions,
                    error: None,
                }
            }
            Err(e) => {
                log::error!("❌ Análise de {} falhou: {}", page.url, e);
                AnalysisResult {
                    url: page.url.clone(),
                    title: page.title.clone(),
                    summary: String::new(),
                    relevance_rating: RelevanceTier::NotRelevant,
                    relevance_explanation: format!("Error: {}", e),
                    contact_info,
                    next_actions: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Endereços pelo modelo; falha da cadeia vira lista vazia
    async fn extract_addresses(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let prompt = address_prompt(text, self.address_text_chars);
        match self.address_chain.run(&self.invoker, &prompt).await {
            Ok(success) => parse_addresses(&success.text),
            Err(e) => {
                log::warn!("⚠️ Extração de endereços falhou: {}", e);
                Vec::new()
            }
        }
    }
}

/// Texto de um payload de panic
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic: unknown payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    const ANALYSIS_REPLY: &str = "SUMMARY:\nBerlin tenants association offering legal advice.\n\nRELEVANCE:\nVery relevant\n\nRELEVANCE EXPLANATION:\nOfficial contact point.\n\nNEXT ACTIONS:\n- Call the hotline\n- Visit office\n- Book a consultation\n- Join the association\n- Read the FAQ\n- Download brochure\n";

    fn page(text: &str) -> FetchedContent {
        FetchedContent {
            url: "https://mieterverein.de/".into(),
            title: "Berliner Mieterverein".into(),
            text: text.into(),
            links: Vec::new(),
            error: None,
        }
    }

    fn analyzer(mock: MockLlmClient) -> (ContentAnalyzer, Arc<MockLlmClient>) {
        let mock = Arc::new(mock);
        let invoker = Arc::new(ModelInvoker::new(mock.clone()));
        (ContentAnalyzer::new(invoker, &ResearchConfig::default()), mock)
    }

    #[tokio::test]
    async fn test_analyze_success() {
        let (analyzer, _) = analyzer(
            MockLlmClient::new()
                .respond_when("Extract physical addresses", "Spichernstraße 1, 10777 Berlin")
                .respond_when("Analyze this webpage", ANALYSIS_REPLY),
        );

        let result = analyzer
            .analyze(&page("Kontakt: info@mieterverein.de"), "Mieterverein Berlin")
            .await;

        assert!(result.error.is_none());
        assert_eq!(result.summary, "Berlin tenants association offering legal advice.");
        assert_eq!(result.relevance_rating, RelevanceTier::VeryRelevant);
        assert_eq!(result.relevance_explanation, "Official contact point.");
        assert_eq!(result.next_actions.len(), MAX_NEXT_ACTIONS);
        assert_eq!(result.next_actions[0], "Call the hotline");
        assert_eq!(result.contact_info.emails, vec!["info@mieterverein.de"]);
        assert_eq!(result.contact_info.addresses, vec!["Spichernstraße 1, 10777 Berlin"]);
    }

    #[tokio::test]
    async fn test_fetch_error_makes_no_model_call() {
        let (analyzer, mock) = analyzer(MockLlmClient::new().with_default_reply(ANALYSIS_REPLY));

        let failed = FetchedContent::failed("https://down.de/", "Failed to fetch URL: timeout");
        let result = analyzer.analyze(&failed, "q").await;

        assert_eq!(result.relevance_explanation, FETCH_ERROR_EXPLANATION);
        assert_eq!(result.relevance_rating, RelevanceTier::NotRelevant);
        assert_eq!(result.error.as_deref(), Some("Failed to fetch URL: timeout"));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_all_backends_fail_keeps_contacts() {
        let (analyzer, _) = analyzer(
            MockLlmClient::new()
                .respond_when("Extract physical addresses", "None found")
                .fail_when("Analyze this webpage", "quota exceeded"),
        );

        let result = analyzer
            .analyze(&page("Mail: hilfe@mieter.de, Tel 030-226-2600"), "q")
            .await;

        assert!(result.is_error());
        assert!(result.error.as_deref().unwrap_or("").contains("quota exceeded"));
        assert!(result.relevance_explanation.starts_with("Error: "));
        assert_eq!(result.relevance_rating, RelevanceTier::NotRelevant);
        assert_eq!(result.contact_info.emails, vec!["hilfe@mieter.de"]);
        assert_eq!(result.contact_info.phones, vec!["030-226-2600"]);
        assert!(result.contact_info.addresses.is_empty());
    }

    #[tokio::test]
    async fn test_missing_relevance_is_not_relevant() {
        let (analyzer, _) = analyzer(
            MockLlmClient::new()
                .fail_when("Extract physical addresses", "down")
                .respond_when("Analyze this webpage", "SUMMARY: Only a summary."),
        );

        let result = analyzer.analyze(&page("text"), "q").await;
        assert!(result.error.is_none());
        assert_eq!(result.summary, "Only a summary.");
        assert_eq!(result.relevance_rating, RelevanceTier::NotRelevant);
        assert!(result.next_actions.is_empty());
        assert!(result.contact_info.addresses.is_empty());
    }

    #[tokio::test]
    async fn test_panic_becomes_error_variant() {
        let (analyzer, _) = analyzer(MockLlmClient::new().panic_when("Analyze this webpage"));

        let result = analyzer.analyze(&page("text"), "q").await;
        assert_eq!(result.relevance_explanation, PANIC_EXPLANATION);
        assert!(result.error.as_deref().unwrap_or("").starts_with("panic:"));
        assert!(result.contact_info.is_empty());
        assert!(result.next_actions.is_empty());
    }

    #[tokio::test]
    async fn test_unrecognized_rating_maps_to_not_relevant() {
        let (analyzer, _) = analyzer(
            MockLlmClient::new()
                .respond_when("Extract physical addresses", "None found")
                .respond_when("Analyze this webpage", "SUMMARY: s\nRELEVANCE: highly pertinent\n"),
        );

        let result = analyzer.analyze(&page("text"), "q").await;
        assert_eq!(result.relevance_rating, RelevanceTier::NotRelevant);
    }
}
