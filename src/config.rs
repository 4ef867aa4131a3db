// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CONFIGURAÇÃO DA PESQUISA
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Configuração explícita passada a cada componente na construção.
// Nenhum componente lê variáveis de ambiente por conta própria: apenas
// `load_research_config` faz isso (o binário carrega o .env antes).
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::fmt;
use std::time::Duration;

use crate::llm::CredentialKind;

/// Chaves de API dos provedores.
///
/// O `Debug` mascara os valores para não vazar chaves em logs.
#[derive(Clone, Default)]
pub struct Credentials {
    /// `CEREBRAS_API_KEY`
    pub cerebras: Option<String>,
    /// `GEMINI_API_KEY`
    pub gemini: Option<String>,
    /// `DEEPSEEK_API_KEY`
    pub deepseek: Option<String>,
    /// `OPENAI_API_KEY`
    pub openai: Option<String>,
    /// `GOOGLE_API_KEY` (Custom Search)
    pub google_search_key: Option<String>,
    /// `GOOGLE_CSE_ID` (Custom Search engine id)
    pub google_search_engine_id: Option<String>,
}

impl Credentials {
    /// Retorna a chave exigida por um backend de modelo
    pub fn for_kind(&self, kind: CredentialKind) -> Option<&str> {
        let value = match kind {
            CredentialKind::Cerebras => &self.cerebras,
            CredentialKind::Gemini => &self.gemini,
            CredentialKind::DeepSeek => &self.deepseek,
            CredentialKind::OpenAi => &self.openai,
        };
        value.as_deref().filter(|v| !v.trim().is_empty())
    }

    /// Verifica se as credenciais de busca estão presentes
    pub fn has_search(&self) -> bool {
        self.google_search_key.is_some() && self.google_search_engine_id.is_some()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn mask(value: &Option<String>) -> &'static str {
            if value.is_some() {
                "***"
            } else {
                "<unset>"
            }
        }

        f.debug_struct("Credentials")
            .field("cerebras", &mask(&self.cerebras))
            .field("gemini", &mask(&self.gemini))
            .field("deepseek", &mask(&self.deepseek))
            .field("openai", &mask(&self.openai))
            .field("google_search_key", &mask(&self.google_search_key))
            .field("google_search_engine_id", &mask(&self.google_search_engine_id))
            .finish()
    }
}

/// Cadeias de fallback (ordem = preferência) por operação
#[derive(Debug, Clone)]
pub struct BackendChains {
    /// Ranking em batch dos resultados de busca
    pub ranking: Vec<String>,
    /// Análise de página
    pub analysis: Vec<String>,
    /// Expansão de queries
    pub expansion: Vec<String>,
    /// Extração de endereços
    pub address: Vec<String>,
    /// Ranking de importância dos sites analisados
    pub importance: Vec<String>,
}

impl Default for BackendChains {
    fn default() -> Self {
        Self {
            ranking: names(&[
                "deepseek-reasoner",
                "gemini-2.0-flash-exp",
                "llama-3.3-70b",
                "deepseek-chat",
                "gpt-4o-mini",
            ]),
            analysis: names(&[
                "gemini-2.0-flash-exp",
                "llama-3.3-70b",
                "deepseek-chat",
                "gpt-4o-mini",
            ]),
            expansion: names(&["gemini-2.0-flash-exp"]),
            address: names(&["gemini-2.0-flash-exp"]),
            importance: names(&["gemini-2.0-flash-exp", "gpt-4o-mini"]),
        }
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Limites de custo/tamanho do pipeline
#[derive(Debug, Clone)]
pub struct PipelineLimits {
    /// Resultados pedidos ao provedor por query
    pub results_per_query: usize,
    /// Buscas simultâneas numa agregação
    pub max_concurrent_searches: usize,
    /// Truncamento opcional da lista ranqueada
    pub max_ranked_results: Option<usize>,
    /// URLs analisadas em detalhe (top-K)
    pub urls_to_analyze: usize,
    /// Variantes pedidas na expansão de queries
    pub query_variants: usize,
    /// Caracteres do texto da página enviados na análise
    pub analysis_text_chars: usize,
    /// Prefixo do texto enviado na extração de endereços
    pub address_text_chars: usize,
    /// Palavras máximas extraídas de uma página
    pub max_page_words: usize,
}

impl Default for PipelineLimits {
    fn default() -> Self {
        Self {
            results_per_query: 10,
            max_concurrent_searches: 6,
            max_ranked_results: None,
            urls_to_analyze: 3,
            query_variants: 4,
            analysis_text_chars: 60_000,
            address_text_chars: 2_000,
            max_page_words: 10_000,
        }
    }
}

/// Parâmetros de geração enviados aos modelos
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Temperatura
    pub temperature: f32,
    /// Máximo de tokens (família completion)
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1000,
        }
    }
}

/// Configuração completa do pipeline de pesquisa
#[derive(Debug, Clone)]
pub struct ResearchConfig {
    /// Chaves de API
    pub credentials: Credentials,
    /// Cadeias de fallback
    pub backends: BackendChains,
    /// Limites
    pub limits: PipelineLimits,
    /// Parâmetros de geração
    pub generation: GenerationConfig,
    /// Idioma alvo das queries expandidas
    pub query_language: String,
    /// Se deve ranquear os sites analisados por importância
    pub rank_websites: bool,
    /// Timeout das chamadas aos modelos
    pub llm_timeout: Duration,
    /// Timeout das buscas
    pub search_timeout: Duration,
    /// Timeout da leitura de páginas
    pub fetch_timeout: Duration,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            backends: BackendChains::default(),
            limits: PipelineLimits::default(),
            generation: GenerationConfig::default(),
            query_language: "German".to_string(),
            rank_websites: false,
            llm_timeout: Duration::from_secs(60),
            search_timeout: Duration::from_secs(20),
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

impl ResearchConfig {
    /// Cria configuração padrão
    pub fn new() -> Self {
        Self::default()
    }
}

/// Lê uma variável de ambiente não vazia
fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Lê uma lista separada por vírgulas
fn env_list(key: &str) -> Option<Vec<String>> {
    let list: Vec<String> = env_string(key)?
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if list.is_empty() {
        None
    } else {
        Some(list)
    }
}

/// Lê um inteiro positivo
fn env_positive(key: &str) -> Option<usize> {
    let raw = env_string(key)?;
    match raw.parse::<usize>() {
        Ok(value) if value > 0 => Some(value),
        _ => {
            log::warn!("⚠️ {}={} inválido, mantendo padrão", key, raw);
            None
        }
    }
}

/// Lê um booleano ("1", "true", "yes", "on")
fn env_flag(key: &str) -> Option<bool> {
    env_string(key).map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

/// Carrega a configuração a partir das variáveis de ambiente.
///
/// Variáveis suportadas:
/// - Chaves: `CEREBRAS_API_KEY`, `GEMINI_API_KEY`, `DEEPSEEK_API_KEY`,
///   `OPENAI_API_KEY`, `GOOGLE_API_KEY`, `GOOGLE_CSE_ID`
/// - Cadeias (listas separadas por vírgula): `RANKING_BACKENDS`,
///   `ANALYSIS_BACKENDS`, `EXPANSION_BACKENDS`, `ADDRESS_BACKENDS`,
///   `IMPORTANCE_BACKENDS`
/// - Limites: `RESEARCH_RESULTS_PER_QUERY`, `RESEARCH_MAX_CONCURRENT_SEARCHES`,
///   `RESEARCH_URLS_TO_ANALYZE`, `RESEARCH_QUERY_VARIANTS`, `RESEARCH_MAX_RESULTS`
/// - Outros: `RESEARCH_QUERY_LANGUAGE`, `RESEARCH_RANK_WEBSITES`
///
/// Valores inválidos são ignorados (mantém o padrão).
///
/// # Exemplo
///
/// ```rust,ignore
/// // .env
/// RANKING_BACKENDS=gpt-4o-mini,deepseek-chat
/// RESEARCH_URLS_TO_ANALYZE=5
///
/// let config = load_research_config();
/// assert_eq!(config.limits.urls_to_analyze, 5);
/// ```
pub fn load_research_config() -> ResearchConfig {
    let mut config = ResearchConfig::default();

    config.credentials = Credentials {
        cerebras: env_string("CEREBRAS_API_KEY"),
        gemini: env_string("GEMINI_API_KEY"),
        deepseek: env_string("DEEPSEEK_API_KEY"),
        openai: env_string("OPENAI_API_KEY"),
        google_search_key: env_string("GOOGLE_API_KEY"),
        google_search_engine_id: env_string("GOOGLE_CSE_ID"),
    };

    let chains = [
        ("RANKING_BACKENDS", &mut config.backends.ranking),
        ("ANALYSIS_BACKENDS", &mut config.backends.analysis),
        ("EXPANSION_BACKENDS", &mut config.backends.expansion),
        ("ADDRESS_BACKENDS", &mut config.backends.address),
        ("IMPORTANCE_BACKENDS", &mut config.backends.importance),
    ];
    for (key, chain) in chains {
        if let Some(list) = env_list(key) {
            log::info!("📦 {}={}", key, list.join(","));
            *chain = list;
        }
    }

    if let Some(value) = env_positive("RESEARCH_RESULTS_PER_QUERY") {
        config.limits.results_per_query = value;
        log::info!("📦 RESEARCH_RESULTS_PER_QUERY={}", value);
    }

    if let Some(value) = env_positive("RESEARCH_MAX_CONCURRENT_SEARCHES") {
        config.limits.max_concurrent_searches = value;
        log::info!("📦 RESEARCH_MAX_CONCURRENT_SEARCHES={}", value);
    }

    if let Some(value) = env_positive("RESEARCH_URLS_TO_ANALYZE") {
        config.limits.urls_to_analyze = value;
        log::info!("📦 RESEARCH_URLS_TO_ANALYZE={}", value);
    }

    if let Some(value) = env_positive("RESEARCH_QUERY_VARIANTS") {
        config.limits.query_variants = value;
        log::info!("📦 RESEARCH_QUERY_VARIANTS={}", value);
    }

    if let Some(value) = env_positive("RESEARCH_MAX_RESULTS") {
        config.limits.max_ranked_results = Some(value);
        log::info!("📦 RESEARCH_MAX_RESULTS={}", value);
    }

    if let Some(language) = env_string("RESEARCH_QUERY_LANGUAGE") {
        log::info!("📦 RESEARCH_QUERY_LANGUAGE={}", language);
        config.query_language = language;
    }

    if let Some(flag) = env_flag("RESEARCH_RANK_WEBSITES") {
        config.rank_websites = flag;
        log::info!("📦 RESEARCH_RANK_WEBSITES={}", flag);
    }

    log::info!(
        "🔧 Cadeias: ranking={:?} | análise={:?}",
        config.backends.ranking,
        config.backends.analysis
    );

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ResearchConfig::default();
        assert_eq!(config.limits.urls_to_analyze, 3);
        assert_eq!(config.limits.address_text_chars, 2_000);
        assert_eq!(config.limits.query_variants, 4);
        assert!(config.limits.max_ranked_results.is_none());
        assert_eq!(config.backends.ranking.first().map(String::as_str), Some("deepseek-reasoner"));
        assert_eq!(config.backends.analysis.first().map(String::as_str), Some("gemini-2.0-flash-exp"));
        assert!(!config.rank_websites);
    }

    #[test]
    fn test_credentials_for_kind() {
        let credentials = Credentials {
            openai: Some("sk-test".into()),
            gemini: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(credentials.for_kind(CredentialKind::OpenAi), Some("sk-test"));
        assert_eq!(credentials.for_kind(CredentialKind::Gemini), None);
        assert_eq!(credentials.for_kind(CredentialKind::DeepSeek), None);
        assert!(!credentials.has_search());
    }

    #[test]
    fn test_credentials_debug_is_masked() {
        let credentials = Credentials {
            openai: Some("sk-secret-value".into()),
            ..Default::default()
        };
        let debug = format!("{:?}", credentials);
        assert!(!debug.contains("sk-secret-value"));
        assert!(debug.contains("***"));
        assert!(debug.contains("<unset>"));
    }
}
