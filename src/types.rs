// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TIPOS COMPARTILHADOS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::utils::StageTimings;

/// Tipo de URL (alias para String)
pub type Url = String;

/// Limite de itens por lista de contato
pub const MAX_CONTACT_ITEMS: usize = 5;

/// Limite de links retornados por página
pub const MAX_PAGE_LINKS: usize = 10;

/// Categoria de relevância atribuída a um resultado.
///
/// Enumeração fechada. A ordem das variantes é a ordem de apresentação
/// (`Ord` deriva dela): muito relevante primeiro, não relevante por último.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceTier {
    /// "Very relevant"
    VeryRelevant,
    /// "Relevant"
    Relevant,
    /// "Somewhat relevant"
    SomewhatRelevant,
    /// "Not relevant" (também o destino de rótulos não reconhecidos)
    NotRelevant,
}

impl RelevanceTier {
    /// Todas as categorias, na ordem de apresentação
    pub const ALL: [RelevanceTier; 4] = [
        Self::VeryRelevant,
        Self::Relevant,
        Self::SomewhatRelevant,
        Self::NotRelevant,
    ];

    /// Converte o texto de rating do modelo para uma categoria.
    ///
    /// Case-insensitive e tolerante a pontuação/markdown ao redor
    /// (`**Very relevant**.`). Qualquer texto presente mas não reconhecido
    /// vira `NotRelevant`.
    pub fn from_rating(rating: &str) -> Self {
        let normalized = rating
            .trim()
            .trim_matches(|c: char| c == '*' || c == '"' || c == '\'' || c == '.' || c == '[' || c == ']')
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        match normalized.as_str() {
            "very relevant" => Self::VeryRelevant,
            "relevant" => Self::Relevant,
            "somewhat relevant" => Self::SomewhatRelevant,
            _ => Self::NotRelevant,
        }
    }

    /// Rótulo usado nos prompts e na saída de texto
    pub fn label(&self) -> &'static str {
        match self {
            Self::VeryRelevant => "Very relevant",
            Self::Relevant => "relevant",
            Self::SomewhatRelevant => "somewhat relevant",
            Self::NotRelevant => "not relevant",
        }
    }
}

impl Default for RelevanceTier {
    fn default() -> Self {
        Self::NotRelevant
    }
}

impl fmt::Display for RelevanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Resultado de busca normalizado.
///
/// Identidade = `url` (forma absoluta normalizada). Imutável depois de criado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// URL normalizada
    pub url: Url,
    /// Título (vazio se o provedor não informou)
    pub title: String,
    /// Snippet (vazio se o provedor não informou)
    pub snippet: String,
    /// Data de publicação, quando conhecida
    pub publication_date: Option<String>,
}

impl SearchResult {
    /// Score heurístico usado apenas para ordenar dentro de uma categoria.
    ///
    /// +1.0 com data, +0.5 com título, + min(len(snippet)/1000, 1.0).
    pub fn rank_score(&self) -> f64 {
        let mut score = 0.0;

        if self.publication_date.is_some() {
            score += 1.0;
        }

        if !self.title.trim().is_empty() {
            score += 0.5;
        }

        let snippet_len = self.snippet.chars().count() as f64;
        score += (snippet_len / 1000.0).min(1.0);

        score
    }
}

/// Resultado ranqueado pelo modelo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    /// Resultado original
    #[serde(flatten)]
    pub result: SearchResult,
    /// Categoria atribuída
    pub relevance_tier: RelevanceTier,
    /// Explicação do modelo
    pub relevance_explanation: String,
    /// Score heurístico (não vem do modelo)
    pub rank_score: f64,
}

impl RankedResult {
    /// Cria um resultado ranqueado, calculando o score heurístico
    pub fn new(result: SearchResult, tier: RelevanceTier, explanation: impl Into<String>) -> Self {
        let rank_score = result.rank_score();
        Self {
            result,
            relevance_tier: tier,
            relevance_explanation: explanation.into(),
            rank_score,
        }
    }

    /// URL do resultado
    pub fn url(&self) -> &str {
        &self.result.url
    }

    /// Título do resultado
    pub fn title(&self) -> &str {
        &self.result.title
    }
}

/// Informações de contato encontradas numa página
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    /// E-mails distintos, ordem de aparição
    pub emails: Vec<String>,
    /// Telefones distintos, ordem de aparição
    pub phones: Vec<String>,
    /// Perfis em redes sociais
    pub social_media: Vec<String>,
    /// Endereços postais (extraídos pelo modelo)
    pub addresses: Vec<String>,
}

impl ContactInfo {
    /// Verifica se nenhum contato foi encontrado
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
            && self.phones.is_empty()
            && self.social_media.is_empty()
            && self.addresses.is_empty()
    }
}

/// Link encontrado numa página
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLink {
    /// Texto âncora
    pub text: String,
    /// URL absoluta
    pub url: Url,
}

/// Conteúdo retornado pelo fetcher
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchedContent {
    /// URL requisitada
    pub url: Url,
    /// Título da página
    pub title: String,
    /// Texto extraído
    pub text: String,
    /// Até [`MAX_PAGE_LINKS`] links
    pub links: Vec<PageLink>,
    /// Erro de leitura, se houve
    pub error: Option<String>,
}

impl FetchedContent {
    /// Cria um conteúdo de falha
    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Análise estruturada de uma página.
///
/// Construída uma única vez pelo analisador. Em falhas internas é
/// retornada a variante de erro (campo `error` preenchido).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// URL analisada
    pub url: Url,
    /// Título da página
    pub title: String,
    /// Resumo gerado
    pub summary: String,
    /// Rating de relevância
    pub relevance_rating: RelevanceTier,
    /// Explicação do rating
    pub relevance_explanation: String,
    /// Contatos encontrados
    pub contact_info: ContactInfo,
    /// Próximas ações sugeridas
    pub next_actions: Vec<String>,
    /// Erro, se a análise falhou
    pub error: Option<String>,
}

impl AnalysisResult {
    /// Variante de erro com valores padrão seguros
    pub fn failed(
        url: impl Into<String>,
        title: impl Into<String>,
        explanation: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            summary: String::new(),
            relevance_rating: RelevanceTier::NotRelevant,
            relevance_explanation: explanation.into(),
            contact_info: ContactInfo::default(),
            next_actions: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// Verifica se a análise falhou
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Importância de um site já analisado
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    /// "very important"
    VeryImportant,
    /// "important"
    Important,
    /// "somewhat important"
    SomewhatImportant,
    /// "not important"
    NotImportant,
    /// Avaliação falhou
    Unknown,
}

impl Importance {
    /// Converte texto do modelo; não reconhecido vira `NotImportant`
    pub fn from_label(label: &str) -> Self {
        let normalized = label
            .trim()
            .trim_matches(|c: char| c == '*' || c == '"' || c == '.')
            .to_lowercase();

        match normalized.as_str() {
            "very important" => Self::VeryImportant,
            "important" => Self::Important,
            "somewhat important" => Self::SomewhatImportant,
            _ => Self::NotImportant,
        }
    }

    /// Rótulo legível
    pub fn label(&self) -> &'static str {
        match self {
            Self::VeryImportant => "very important",
            Self::Important => "important",
            Self::SomewhatImportant => "somewhat important",
            Self::NotImportant => "not important",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Importance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Site analisado e ranqueado por importância
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedWebsite {
    /// Título
    pub title: String,
    /// URL
    pub url: Url,
    /// Resumo da análise
    pub summary: String,
    /// Importância avaliada
    pub importance: Importance,
    /// Relevância vinda da análise
    pub relevance: RelevanceTier,
    /// Próximas ações
    pub next_actions: Vec<String>,
    /// Erro, se a avaliação falhou
    pub error: Option<String>,
}

/// Relatório final de uma execução de pesquisa
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchReport {
    /// ID da execução
    pub run_id: Uuid,
    /// Objetivo de pesquisa
    pub objective: String,
    /// Todos os resultados ranqueados (já achatados por categoria)
    pub all_ranked_results: Vec<RankedResult>,
    /// Análises das páginas selecionadas
    pub analyzed_results: Vec<AnalysisResult>,
    /// Sites ranqueados por importância (opcional)
    pub ranked_websites: Vec<RankedWebsite>,
    /// Total de resultados ranqueados
    pub total_results: usize,
    /// Queries usadas (distintas, ordem de inserção)
    pub queries_used: Vec<String>,
    /// Erro de topo (apenas quando a execução não pôde prosseguir)
    pub error: Option<String>,
    /// Tempo total em ms
    pub elapsed_ms: u128,
    /// Tempo por estágio
    pub stage_timings: StageTimings,
    /// Momento de geração
    pub generated_at: DateTime<Utc>,
}

impl ResearchReport {
    /// Relatório vazio para uma execução
    pub fn empty(run_id: Uuid, objective: impl Into<String>, queries_used: Vec<String>) -> Self {
        Self {
            run_id,
            objective: objective.into(),
            all_ranked_results: Vec::new(),
            analyzed_results: Vec::new(),
            ranked_websites: Vec::new(),
            total_results: 0,
            queries_used,
            error: None,
            elapsed_ms: 0,
            stage_timings: StageTimings::default(),
            generated_at: Utc::now(),
        }
    }

    /// Verifica se a execução terminou com sucesso
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(title: &str, snippet: &str, date: Option<&str>) -> SearchResult {
        SearchResult {
            url: "https://example.com/".into(),
            title: title.into(),
            snippet: snippet.into(),
            publication_date: date.map(String::from),
        }
    }

    #[test]
    fn test_tier_from_rating() {
        assert_eq!(RelevanceTier::from_rating("Very relevant"), RelevanceTier::VeryRelevant);
        assert_eq!(RelevanceTier::from_rating("  RELEVANT "), RelevanceTier::Relevant);
        assert_eq!(RelevanceTier::from_rating("**Somewhat relevant**."), RelevanceTier::SomewhatRelevant);
        assert_eq!(RelevanceTier::from_rating("not relevant"), RelevanceTier::NotRelevant);
        assert_eq!(RelevanceTier::from_rating("kind of useful"), RelevanceTier::NotRelevant);
    }

    #[test]
    fn test_tier_order() {
        assert!(RelevanceTier::VeryRelevant < RelevanceTier::Relevant);
        assert!(RelevanceTier::SomewhatRelevant < RelevanceTier::NotRelevant);
        assert_eq!(RelevanceTier::default(), RelevanceTier::NotRelevant);
    }

    #[test]
    fn test_rank_score_components() {
        assert_eq!(result("", "", None).rank_score(), 0.0);
        assert_eq!(result("Title", "", None).rank_score(), 0.5);
        assert_eq!(result("Title", "", Some("2024-01-01")).rank_score(), 1.5);

        let long_snippet = "x".repeat(5000);
        assert_eq!(result("", &long_snippet, None).rank_score(), 1.0);

        let short_snippet = "x".repeat(250);
        assert!((result("", &short_snippet, None).rank_score() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_importance_from_label() {
        assert_eq!(Importance::from_label("Very important"), Importance::VeryImportant);
        assert_eq!(Importance::from_label("important"), Importance::Important);
        assert_eq!(Importance::from_label("meh"), Importance::NotImportant);
        assert!(Importance::NotImportant < Importance::Unknown);
    }

    #[test]
    fn test_failed_analysis_defaults() {
        let analysis = AnalysisResult::failed("https://a.com", "", "Error accessing content", "timeout");
        assert!(analysis.is_error());
        assert!(analysis.summary.is_empty());
        assert!(analysis.next_actions.is_empty());
        assert!(analysis.contact_info.is_empty());
        assert_eq!(analysis.relevance_rating, RelevanceTier::NotRelevant);
    }
}
