//! # Prompts
//!
//! Construção dos prompts enviados aos modelos. Cada prompt define o
//! formato de saída que o [`crate::parser`] espera.
//!
//! - [`query_expansion_prompt`] - variantes de busca entre aspas
//! - [`ranking_prompt`] - batch `N. RATING / EXPLANATION`
//! - [`page_analysis_prompt`] - contrato `SUMMARY / RELEVANCE / ...`
//! - [`address_prompt`] - um endereço por linha ou `None found`
//! - [`importance_prompt`] - `Importance:` + ações

use crate::types::{AnalysisResult, RelevanceTier, SearchResult};
use crate::utils::truncate_chars;

/// Sentinela usado pelo modelo quando não há endereços
pub const NO_ADDRESSES_SENTINEL: &str = "None found";

fn tier_labels() -> String {
    RelevanceTier::ALL
        .iter()
        .map(|t| t.label())
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// EXPANSÃO DE QUERIES
// ============================================================================

/// Pede `count` variantes de busca no idioma `language`, uma por linha entre aspas
pub fn query_expansion_prompt(objective: &str, initial_query: &str, count: usize, language: &str) -> String {
    format!(
        r#"You are a research assistant helping to find information on the web.

RESEARCH OBJECTIVE: {objective}
INITIAL QUERY: {initial_query}

Generate {count} additional search queries that will help find relevant information. The queries should:
1. Cover different aspects of the research objective
2. Use different phrasings and synonyms
3. Be specific enough to find relevant results
4. Be in {language}

Format each query in quotes, one per line."#
    )
}

// ============================================================================
// RANKING EM BATCH
// ============================================================================

/// Prompt de ranking: lista numerada (1-indexada) dos resultados
pub fn ranking_prompt(query: &str, results: &[SearchResult]) -> String {
    let mut listing = String::new();
    for (i, result) in results.iter().enumerate() {
        listing.push_str(&format!(
            "{}. TITLE: {}\nSNIPPET: {}\nURL: {}\n\n",
            i + 1,
            result.title,
            result.snippet,
            result.url
        ));
    }

    format!(
        r#"You are evaluating search results for relevance to a research query.

RESEARCH QUERY: {query}

Rate each result as exactly one of: {labels}.
Give a brief explanation (max 50 words) for each rating.

Use exactly this format for every result:
[NUMBER]. RATING: [your rating]
EXPLANATION: [your explanation]

SEARCH RESULTS:
{listing}"#,
        labels = tier_labels(),
        listing = listing.trim_end()
    )
}

// ============================================================================
// ANÁLISE DE PÁGINA
// ============================================================================

/// Prompt de análise de uma página, com o texto limitado a `max_chars`
pub fn page_analysis_prompt(query: &str, title: &str, text: &str, max_chars: usize) -> String {
    format!(
        r#"Analyze this webpage content in relation to the research query.

RESEARCH QUERY: {query}
PAGE TITLE: {title}

CONTENT:
{content}

Respond using exactly these sections:

SUMMARY:
[A concise summary of the relevant information, max 200 words]

RELEVANCE:
[The rating MUST be exactly one of: {labels}]

RELEVANCE EXPLANATION:
[Why this rating, max 100 words]

NEXT ACTIONS:
- [action]
(at most 5 concrete follow-up actions)"#,
        content = truncate_chars(text, max_chars),
        labels = tier_labels()
    )
}

/// Prompt de extração de endereços sobre o prefixo do texto
pub fn address_prompt(text: &str, prefix_chars: usize) -> String {
    format!(
        "Extract physical addresses from this text. Return only the addresses, one per line. \
If no addresses are found, return '{sentinel}'.\n\nTEXT:\n{text}",
        sentinel = NO_ADDRESSES_SENTINEL,
        text = truncate_chars(text, prefix_chars)
    )
}

// ============================================================================
// IMPORTÂNCIA DE SITES
// ============================================================================

/// Prompt de importância de um site já analisado
pub fn importance_prompt(query: &str, analysis: &AnalysisResult) -> String {
    format!(
        r#"Evaluate how important this website is for the research query.

RESEARCH QUERY: {query}

WEBSITE: {title}
URL: {url}
SUMMARY: {summary}
RELEVANCE: {relevance}

Respond in this format:
Importance: [very important, important, somewhat important, or not important]
Next actions:
- [action]"#,
        title = analysis.title,
        url = analysis.url,
        summary = analysis.summary,
        relevance = analysis.relevance_rating.label()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(url: &str, title: &str) -> SearchResult {
        SearchResult {
            url: url.into(),
            title: title.into(),
            snippet: "snippet".into(),
            publication_date: None,
        }
    }

    #[test]
    fn test_ranking_prompt_is_one_indexed() {
        let prompt = ranking_prompt("mieterverein", &[result("https://a.de/", "A"), result("https://b.de/", "B")]);
        assert!(prompt.contains("RESEARCH QUERY: mieterverein"));
        assert!(prompt.contains("1. TITLE: A"));
        assert!(prompt.contains("2. TITLE: B\nSNIPPET: snippet\nURL: https://b.de/"));
        assert!(!prompt.contains("0. TITLE"));
        assert!(prompt.contains("Very relevant, relevant, somewhat relevant, not relevant"));
    }

    #[test]
    fn test_expansion_prompt_mentions_language_and_count() {
        let prompt = query_expansion_prompt("tenant help Berlin", "Mieterverein Berlin", 4, "German");
        assert!(prompt.contains("Generate 4 additional search queries"));
        assert!(prompt.contains("Be in German"));
        assert!(prompt.contains("INITIAL QUERY: Mieterverein Berlin"));
    }

    #[test]
    fn test_analysis_prompt_caps_content() {
        let text = "x".repeat(500);
        let prompt = page_analysis_prompt("q", "Title", &text, 100);
        assert!(prompt.contains(&"x".repeat(100)));
        assert!(!prompt.contains(&"x".repeat(101)));
        assert!(prompt.contains("RELEVANCE EXPLANATION:"));
    }

    #[test]
    fn test_address_prompt_uses_prefix() {
        let text = format!("{}TAIL", "a".repeat(2000));
        let prompt = address_prompt(&text, 2000);
        assert!(!prompt.contains("TAIL"));
        assert!(prompt.contains("None found"));
    }
}
