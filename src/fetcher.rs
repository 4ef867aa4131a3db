// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LEITURA DE PÁGINAS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Baixa uma URL e extrai título, texto principal e links.
// - Texto principal: Mozilla Readability, com fallback para html2text
// - Título e links: parser HTML (scraper), entidades decodificadas
// - Links: âncoras com texto, resolvidas contra a URL da página
// - Falhas nunca propagam: viram `FetchedContent { error: Some(..) }`
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::config::ResearchConfig;
use crate::types::{FetchedContent, PageLink, MAX_PAGE_LINKS};
use crate::utils::{clean_text, limit_words};

/// User-Agent de navegador (alguns sites bloqueiam clientes sem UA)
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Erros de leitura de página
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// Esquema diferente de http/https ou sem host
    #[error("Invalid URL provided")]
    InvalidUrl,

    /// Falha de rede / timeout
    #[error("Failed to fetch URL: {0}")]
    Network(String),

    /// Status HTTP fora de 2xx
    #[error("Failed to fetch URL: HTTP {0}")]
    Status(u16),
}

/// Trait principal para leitura de páginas
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Lê a página. Nunca falha: erros vão em `FetchedContent::error`.
    async fn fetch(&self, url: &str) -> FetchedContent;
}

/// Valida uma URL antes de qualquer requisição (esquema http/https + host)
pub fn validate_url(raw: &str) -> Result<url::Url, FetchError> {
    let parsed = url::Url::parse(raw.trim()).map_err(|_| FetchError::InvalidUrl)?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(parsed),
        _ => Err(FetchError::InvalidUrl),
    }
}

/// Leitor HTTP real
pub struct HttpFetcher {
    client: reqwest::Client,
    max_words: usize,
}

impl HttpFetcher {
    /// Cria o leitor a partir da configuração (timeout + limite de palavras)
    pub fn new(config: &ResearchConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(config.fetch_timeout)
                .user_agent(BROWSER_USER_AGENT)
                .build()
                .unwrap_or_default(),
            max_words: config.limits.max_page_words,
        }
    }

    async fn download(&self, url: &url::Url) -> Result<String, FetchError> {
        log::info!("📥 Baixando página: {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchedContent {
        let parsed = match validate_url(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("⚠️ URL inválida: {}", url);
                return FetchedContent::failed(url, e.to_string());
            }
        };

        match self.download(&parsed).await {
            Ok(html) => extract_page(url, &parsed, &html, self.max_words),
            Err(e) => {
                log::warn!("⚠️ Falha ao ler {}: {}", url, e);
                FetchedContent::failed(url, e.to_string())
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// EXTRAÇÃO
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Extrai título, texto e links de um HTML já baixado
pub fn extract_page(url: &str, base: &url::Url, html: &str, max_words: usize) -> FetchedContent {
    let (text, readability_title) = extract_main_text(html, base);

    let document = Html::parse_document(html);
    let title = extract_title(&document)
        .or(readability_title)
        .unwrap_or_default();

    let text = limit_words(&text, max_words);
    let links = extract_links(&document, base);

    log::debug!(
        "📖 {} → {} palavras, {} links | título: {}",
        url,
        crate::utils::word_count(&text),
        links.len(),
        title
    );

    FetchedContent {
        url: url.to_string(),
        title,
        text,
        links,
        error: None,
    }
}

/// Texto principal via Readability; html2text quando ele falha ou não acha nada
fn extract_main_text(html: &str, base: &url::Url) -> (String, Option<String>) {
    use readability::extractor;

    match extractor::extract(&mut html.as_bytes(), base) {
        Ok(product) if !product.text.trim().is_empty() => {
            let title = Some(clean_text(&product.title)).filter(|t| !t.is_empty());
            (clean_text(&product.text), title)
        }
        Ok(_) => (html_to_text(html), None),
        Err(e) => {
            log::warn!("⚠️ Readability falhou: {}, usando fallback html2text", e);
            (html_to_text(html), None)
        }
    }
}

fn html_to_text(html: &str) -> String {
    clean_text(&html2text::from_read(html.as_bytes(), 120))
}

/// Texto de um elemento, entidades já decodificadas pelo parser
fn element_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<String>())
}

fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

/// Links com texto âncora não vazio, absolutos, distintos, até [`MAX_PAGE_LINKS`]
fn extract_links(document: &Html, base: &url::Url) -> Vec<PageLink> {
    let selector = match Selector::parse("a[href]") {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for anchor in document.select(&selector) {
        if links.len() >= MAX_PAGE_LINKS {
            break;
        }

        let text = element_text(anchor);
        if text.is_empty() {
            continue;
        }

        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Ok(mut resolved) = base.join(href.trim()) else {
            continue;
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }
        resolved.set_fragment(None);

        let url = resolved.to_string();
        if seen.insert(url.clone()) {
            links.push(PageLink { text, url });
        }
    }

    links
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO MOCK PARA TESTES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Leitor mock: páginas programadas por URL
#[derive(Debug, Default)]
pub struct MockFetcher {
    pages: HashMap<String, FetchedContent>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    /// Leitor sem páginas programadas
    pub fn new() -> Self {
        Self::default()
    }

    /// Página com título e texto
    pub fn with_page(mut self, url: &str, title: &str, text: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            FetchedContent {
                url: url.to_string(),
                title: title.to_string(),
                text: text.to_string(),
                links: Vec::new(),
                error: None,
            },
        );
        self
    }

    /// Página cuja leitura falha
    pub fn with_error(mut self, url: &str, error: &str) -> Self {
        self.pages
            .insert(url.to_string(), FetchedContent::failed(url, error));
        self
    }

    /// URLs lidas, em ordem
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl ContentFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> FetchedContent {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());

        self.pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| FetchedContent::failed(url, "Failed to fetch URL: not mocked"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title>Mieterverein &amp; Beratung</title></head>
<body>
<nav><a href="/kontakt">Kontakt</a> <a href="https://twitter.com/mieter#x">Twitter</a></nav>
<article><h1>Beratung</h1><p>Wir helfen Mietern in Berlin seit 1888 bei allen Fragen rund um das Mietrecht.</p></article>
<a href="mailto:info@mieterverein.de">Mail</a>
<a href="/leer"><img src="x.png"></a>
<a href="/kontakt">Kontakt</a>
</body></html>"#;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://example.com/page").is_ok());
        assert!(validate_url("http://example.com").is_ok());
        assert!(matches!(validate_url("ftp://example.com"), Err(FetchError::InvalidUrl)));
        assert!(matches!(validate_url("not a url"), Err(FetchError::InvalidUrl)));
        assert!(matches!(validate_url(""), Err(FetchError::InvalidUrl)));
        assert_eq!(FetchError::InvalidUrl.to_string(), "Invalid URL provided");
    }

    #[test]
    fn test_extract_page() {
        let base = url::Url::parse("https://mieterverein.de/start").unwrap();
        let page = extract_page("https://mieterverein.de/start", &base, PAGE, 10_000);

        assert_eq!(page.title, "Mieterverein & Beratung");
        assert!(page.text.contains("Mietrecht"));
        assert!(page.error.is_none());

        let urls: Vec<_> = page.links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["https://mieterverein.de/kontakt", "https://twitter.com/mieter"]);
        assert_eq!(page.links[0].text, "Kontakt");
    }

    #[test]
    fn test_extract_page_decodes_entities() {
        let html = r#"<html><head><title>Mieterverein M&uuml;nchen &#8211; Beratung</title></head>
<body><p>Beratung f&uuml;r Mieter.</p><a href="/k">Stra&szlig;e &#223;</a></body></html>"#;
        let base = url::Url::parse("https://mieterverein-muenchen.de/").unwrap();
        let page = extract_page("https://mieterverein-muenchen.de/", &base, html, 10_000);

        assert_eq!(page.title, "Mieterverein München – Beratung");
        assert_eq!(page.links.len(), 1);
        assert_eq!(page.links[0].text, "Straße ß");
        assert_eq!(page.links[0].url, "https://mieterverein-muenchen.de/k");
    }

    #[test]
    fn test_extract_page_word_cap() {
        let html = format!("<html><body><p>{}</p></body></html>", "wort ".repeat(50));
        let base = url::Url::parse("https://example.com/").unwrap();
        let page = extract_page("https://example.com/", &base, &html, 10);
        assert!(crate::utils::word_count(&page.text) <= 10);
    }

    #[test]
    fn test_links_are_capped() {
        let anchors: String = (0..25)
            .map(|i| format!("<a href=\"/p{}\">Link {}</a>", i, i))
            .collect();
        let base = url::Url::parse("https://example.com/").unwrap();
        let links = extract_links(&Html::parse_document(&anchors), &base);
        assert_eq!(links.len(), MAX_PAGE_LINKS);
        assert_eq!(links[0].url, "https://example.com/p0");
    }

    #[tokio::test]
    async fn test_invalid_url_makes_no_request() {
        let fetcher = HttpFetcher::new(&ResearchConfig::default());
        let content = fetcher.fetch("javascript:alert(1)").await;
        assert_eq!(content.error.as_deref(), Some("Invalid URL provided"));
        assert!(content.text.is_empty());
    }

    #[tokio::test]
    async fn test_mock_fetcher() {
        let fetcher = MockFetcher::new()
            .with_page("https://a.de/", "A", "text")
            .with_error("https://b.de/", "Failed to fetch URL: timeout");

        assert!(fetcher.fetch("https://a.de/").await.error.is_none());
        assert!(fetcher.fetch("https://b.de/").await.error.is_some());
        assert!(fetcher.fetch("https://c.de/").await.error.is_some());
        assert_eq!(fetcher.calls().len(), 3);
    }
}
