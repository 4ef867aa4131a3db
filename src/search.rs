// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PROVEDOR DE BUSCA
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Trait e implementações para busca web.
// - `GoogleSearchClient`: Google Custom Search JSON API
// - `MockSearchProvider`: respostas programadas para testes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::config::ResearchConfig;

/// Erros do provedor de busca
#[derive(Debug, Clone, thiserror::Error)]
pub enum SearchError {
    /// Erro retornado pela API
    #[error("Search API error: {0}")]
    ApiError(String),

    /// HTTP 429
    #[error("Rate limit exceeded")]
    RateLimitError,

    /// Falha de rede / timeout
    #[error("Network error: {0}")]
    NetworkError(String),

    /// JSON fora do formato esperado
    #[error("Invalid search response: {0}")]
    ParseError(String),

    /// Variável de ambiente ausente
    #[error("Missing search credential: {0}")]
    MissingCredential(&'static str),
}

/// Registro bruto retornado pelo provedor (antes da normalização)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSearchHit {
    /// Título da página
    pub title: Option<String>,
    /// URL (hits sem URL são descartados na agregação)
    pub url: Option<String>,
    /// Trecho exibido pelo buscador
    pub snippet: Option<String>,
    /// Data de publicação, quando o provedor informa
    pub date: Option<String>,
}

impl RawSearchHit {
    /// Atalho para hits completos (usado pelos testes e pelo mock)
    pub fn new(title: &str, url: &str, snippet: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            url: Some(url.to_string()),
            snippet: Some(snippet.to_string()),
            date: None,
        }
    }

    /// Define a data de publicação
    pub fn with_date(mut self, date: &str) -> Self {
        self.date = Some(date.to_string());
        self
    }
}

/// Trait principal para provedores de busca
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Executa uma busca, retornando até `max_results` registros
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<RawSearchHit>, SearchError>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GOOGLE CUSTOM SEARCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const GOOGLE_CSE_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// A API retorna no máximo 10 itens por página
const GOOGLE_PAGE_SIZE: usize = 10;

/// Cliente da Google Custom Search JSON API
pub struct GoogleSearchClient {
    api_key: String,
    engine_id: String,
    endpoint: String,
    client: reqwest::Client,
}

impl GoogleSearchClient {
    /// Cria o cliente com chave e engine id explícitos
    pub fn new(api_key: String, engine_id: String) -> Self {
        Self {
            api_key,
            engine_id,
            endpoint: GOOGLE_CSE_ENDPOINT.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Cria o cliente a partir da configuração
    pub fn from_config(config: &ResearchConfig) -> Result<Self, SearchError> {
        let api_key = config
            .credentials
            .google_search_key
            .clone()
            .ok_or(SearchError::MissingCredential("GOOGLE_API_KEY"))?;
        let engine_id = config
            .credentials
            .google_search_engine_id
            .clone()
            .ok_or(SearchError::MissingCredential("GOOGLE_CSE_ID"))?;

        let client = reqwest::Client::builder()
            .timeout(config.search_timeout)
            .build()
            .unwrap_or_default();

        Ok(Self {
            client,
            ..Self::new(api_key, engine_id)
        })
    }

    async fn fetch_page(&self, query: &str, start: usize, num: usize) -> Result<Vec<RawSearchHit>, SearchError> {
        let num = num.to_string();
        let start = start.to_string();

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
                ("start", start.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SearchError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(SearchError::RateLimitError);
        }

        let text = response
            .text()
            .await
            .map_err(|e| SearchError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            let snippet: String = text.chars().take(300).collect();
            return Err(SearchError::ApiError(format!("HTTP {}: {}", status, snippet)));
        }

        let json: Value = serde_json::from_str(&text).map_err(|e| SearchError::ParseError(e.to_string()))?;
        Ok(parse_google_items(&json))
    }
}

#[async_trait]
impl SearchProvider for GoogleSearchClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<RawSearchHit>, SearchError> {
        let mut hits = Vec::new();
        let mut start = 1;

        while hits.len() < max_results {
            let num = (max_results - hits.len()).min(GOOGLE_PAGE_SIZE);
            let page = self.fetch_page(query, start, num).await?;
            let received = page.len();
            hits.extend(page);

            // Página incompleta = fim dos resultados
            if received < num {
                break;
            }
            start += received;
        }

        hits.truncate(max_results);
        log::info!("🔍 Google: '{}' → {} resultados", query, hits.len());
        Ok(hits)
    }
}

/// Converte o JSON da Custom Search em registros brutos.
///
/// A data vem de `pagemap.metatags[0]["article:published_time"]`.
pub fn parse_google_items(json: &Value) -> Vec<RawSearchHit> {
    let Some(items) = json["items"].as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .map(|item| RawSearchHit {
            title: item["title"].as_str().map(String::from),
            url: item["link"].as_str().map(String::from),
            snippet: item["snippet"].as_str().map(String::from),
            date: item["pagemap"]["metatags"][0]["article:published_time"]
                .as_str()
                .map(String::from),
        })
        .collect()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO MOCK PARA TESTES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Provedor mock: resultados ou falha programados por query
#[derive(Debug, Default)]
pub struct MockSearchProvider {
    results: HashMap<String, Vec<RawSearchHit>>,
    failures: HashMap<String, String>,
    default_hits: Vec<RawSearchHit>,
    calls: Mutex<Vec<String>>,
}

impl MockSearchProvider {
    /// Provedor sem respostas programadas
    pub fn new() -> Self {
        Self::default()
    }

    /// Resultados para uma query exata
    pub fn with_results(mut self, query: &str, hits: Vec<RawSearchHit>) -> Self {
        self.results.insert(query.to_string(), hits);
        self
    }

    /// Falha para uma query exata
    pub fn with_failure(mut self, query: &str, message: &str) -> Self {
        self.failures.insert(query.to_string(), message.to_string());
        self
    }

    /// Resultados para qualquer query não programada
    pub fn with_default_results(mut self, hits: Vec<RawSearchHit>) -> Self {
        self.default_hits = hits;
        self
    }

    /// Queries recebidas, em ordem de chegada
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl SearchProvider for MockSearchProvider {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<RawSearchHit>, SearchError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(query.to_string());

        if let Some(message) = self.failures.get(query) {
            return Err(SearchError::ApiError(message.clone()));
        }

        let hits = self.results.get(query).unwrap_or(&self.default_hits);
        Ok(hits.iter().take(max_results).cloned().collect())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// UTILITÁRIOS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Normaliza uma URL para comparação/deduplicação.
///
/// URLs absolutas válidas passam pelo parser (host em minúsculas, path
/// vazio vira `/`) e perdem o fragmento. O resto é apenas aparado.
/// Retorna `None` para URL vazia.
pub fn normalize_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    match url::Url::parse(trimmed) {
        Ok(mut parsed) if parsed.has_host() => {
            parsed.set_fragment(None);
            Some(parsed.to_string())
        }
        _ => Some(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("  https://Example.COM/page#section "),
            Some("https://example.com/page".into())
        );
        assert_eq!(normalize_url("https://example.com"), Some("https://example.com/".into()));
        assert_eq!(normalize_url("not a url"), Some("not a url".into()));
        assert_eq!(normalize_url("   "), None);
    }

    #[test]
    fn test_parse_google_items() {
        let payload = json!({
            "items": [
                {
                    "title": "Mieterverein Berlin",
                    "link": "https://mieterverein.de/",
                    "snippet": "Beratung für Mieter",
                    "pagemap": {"metatags": [{"article:published_time": "2024-05-01"}]}
                },
                {"link": "https://example.de/no-title"}
            ]
        });

        let hits = parse_google_items(&payload);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].date.as_deref(), Some("2024-05-01"));
        assert_eq!(hits[1].title, None);
        assert_eq!(hits[1].url.as_deref(), Some("https://example.de/no-title"));

        assert!(parse_google_items(&json!({"searchInformation": {}})).is_empty());
    }

    #[test]
    fn test_from_config_requires_credentials() {
        let config = ResearchConfig::default();
        assert!(matches!(
            GoogleSearchClient::from_config(&config),
            Err(SearchError::MissingCredential("GOOGLE_API_KEY"))
        ));
    }

    #[tokio::test]
    async fn test_mock_search() {
        let provider = MockSearchProvider::new()
            .with_results("a", vec![RawSearchHit::new("A", "https://a.de/", "x")])
            .with_failure("b", "quota");

        assert_eq!(provider.search("a", 10).await.unwrap().len(), 1);
        assert!(provider.search("b", 10).await.is_err());
        assert!(provider.search("c", 10).await.unwrap().is_empty());
        assert_eq!(provider.calls(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    #[ignore = "requer GOOGLE_API_KEY e GOOGLE_CSE_ID"]
    async fn test_google_search_live() {
        let _ = dotenvy::dotenv();
        let config = crate::config::load_research_config();
        let client = GoogleSearchClient::from_config(&config).unwrap();
        let hits = client.search("Mieterverein Berlin", 5).await.unwrap();
        assert!(hits.len() <= 5);
    }
}
