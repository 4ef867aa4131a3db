//! # Parser de Saída Estruturada
//!
//! Extrai seções rotuladas do texto livre dos modelos.
//!
//! ## Contratos
//!
//! - [`ANALYSIS_CONTRACT`] (v1): `SUMMARY / RELEVANCE / RELEVANCE EXPLANATION / NEXT ACTIONS`
//! - Batch de ranking: `<N>. RATING: ...` seguido de `EXPLANATION: ...`, 1-indexado
//!
//! ## Regras de cabeçalho
//!
//! Um cabeçalho é reconhecido no início da linha, sem diferenciar
//! maiúsculas, tolerando ênfase markdown (`**`, `#`) e seguido de `:`.
//! Rótulos mais longos têm prioridade (`RELEVANCE EXPLANATION` antes de
//! `RELEVANCE`). O texto na mesma linha do cabeçalho faz parte da seção.
//!
//! Nenhuma função deste módulo falha: entrada ilegível produz valores
//! vazios, e quem chama decide como sinalizar o erro.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Contrato de seções: rótulos esperados numa ordem fixa
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionContract {
    /// Nome do contrato
    pub name: &'static str,
    /// Versão (incrementa quando os rótulos mudam)
    pub version: u32,
    /// Rótulos, na ordem em que o prompt os pede
    pub labels: &'static [&'static str],
}

/// Rótulo do resumo
pub const SUMMARY: &str = "SUMMARY";
/// Rótulo do rating
pub const RELEVANCE: &str = "RELEVANCE";
/// Rótulo da explicação
pub const RELEVANCE_EXPLANATION: &str = "RELEVANCE EXPLANATION";
/// Rótulo das próximas ações
pub const NEXT_ACTIONS: &str = "NEXT ACTIONS";

/// Contrato da análise de página
pub const ANALYSIS_CONTRACT: SectionContract = SectionContract {
    name: "page-analysis",
    version: 1,
    labels: &[SUMMARY, RELEVANCE, RELEVANCE_EXPLANATION, NEXT_ACTIONS],
};

/// Seções extraídas de uma resposta
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSections {
    values: Vec<(&'static str, String)>,
    found: Vec<&'static str>,
}

impl ParsedSections {
    /// Texto da seção (vazio se ausente)
    pub fn get(&self, label: &str) -> &str {
        self.values
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    /// Verifica se o cabeçalho apareceu na resposta
    pub fn has(&self, label: &str) -> bool {
        self.found.iter().any(|l| *l == label)
    }

    /// Quantos cabeçalhos do contrato foram encontrados
    pub fn found_count(&self) -> usize {
        self.found.len()
    }
}

/// Tenta reconhecer `line` como cabeçalho de `label`.
///
/// Retorna o texto que vem depois do `:` na mesma linha.
fn match_header<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let stripped = line.trim_start().trim_start_matches(|c: char| c == '#' || c == '*' || c.is_whitespace());

    let head = stripped.get(..label.len())?;
    if !head.eq_ignore_ascii_case(label) {
        return None;
    }

    let rest = stripped[label.len()..].trim_start_matches(|c: char| c == '*' || c == ' ');
    let rest = rest.strip_prefix(':')?;
    Some(rest.trim_start_matches('*').trim())
}

/// Extrai as seções de `text` segundo o contrato.
///
/// Máquina de estados por linha: um cabeçalho muda a seção corrente e as
/// linhas seguintes são acumuladas nela até o próximo cabeçalho.
/// Seções ausentes ficam vazias.
pub fn parse_sections(text: &str, contract: &SectionContract) -> ParsedSections {
    let mut labels: Vec<&'static str> = contract.labels.to_vec();
    labels.sort_by(|a, b| b.len().cmp(&a.len()));

    let mut values: Vec<(&'static str, String)> =
        contract.labels.iter().map(|l| (*l, String::new())).collect();
    let mut found: Vec<&'static str> = Vec::new();
    let mut current: Option<usize> = None;

    for line in text.lines() {
        let header = labels
            .iter()
            .find_map(|label| match_header(line, label).map(|rest| (*label, rest)));

        match header {
            Some((label, rest)) => {
                let index = values.iter().position(|(l, _)| *l == label);
                if !found.contains(&label) {
                    found.push(label);
                }
                current = index;
                if let (Some(i), false) = (index, rest.is_empty()) {
                    push_line(&mut values[i].1, rest);
                }
            }
            None => {
                if let Some(i) = current {
                    push_line(&mut values[i].1, line);
                }
            }
        }
    }

    for (_, value) in values.iter_mut() {
        *value = value.trim().to_string();
    }

    ParsedSections { values, found }
}

fn push_line(target: &mut String, line: &str) {
    if !target.is_empty() {
        target.push('\n');
    }
    target.push_str(line.trim_end());
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// BATCH DE RANKING
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

static RATING_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*[#*\s]*(\d+)\s*[.)]\s*\**\s*RATING\s*\**\s*:\s*(.*)$").unwrap()
});

static EXPLANATION_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*[-*\s]*EXPLANATION\s*\**\s*:\s*(.*)$").unwrap());

static NUMBERED_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\d+\s*[.)]").unwrap());

/// Rating de um item do batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingEntry {
    /// Índice 0-based no lote de entrada
    pub index: usize,
    /// Texto do rating como veio do modelo
    pub rating: String,
    /// Explicação (vazia se ausente)
    pub explanation: String,
}

struct PendingEntry {
    number: usize,
    rating: String,
    explanation: String,
    in_explanation: bool,
}

/// Extrai os ratings de uma resposta de ranking em batch.
///
/// `item_count` é o tamanho do lote enviado. Números fora de `1..=item_count`
/// são descartados; índices repetidos mantêm a primeira ocorrência.
/// O resultado vem ordenado pelo índice de entrada.
pub fn parse_rating_batch(text: &str, item_count: usize) -> Vec<RatingEntry> {
    let mut pending: Vec<PendingEntry> = Vec::new();
    let mut current: Option<PendingEntry> = None;

    for line in text.lines() {
        if let Some(caps) = RATING_LINE.captures(line) {
            if let Some(done) = current.take() {
                pending.push(done);
            }
            let number = caps[1].parse::<usize>().unwrap_or(0);
            current = Some(PendingEntry {
                number,
                rating: clean_rating(&caps[2]),
                explanation: String::new(),
                in_explanation: false,
            });
            continue;
        }

        if let Some(caps) = EXPLANATION_LINE.captures(line) {
            if let Some(entry) = current.as_mut() {
                entry.in_explanation = true;
                entry.explanation = clean_rating(&caps[1]);
            }
            continue;
        }

        if NUMBERED_LINE.is_match(line) {
            if let Some(done) = current.take() {
                pending.push(done);
            }
            continue;
        }

        if let Some(entry) = current.as_mut() {
            if entry.in_explanation && !line.trim().is_empty() {
                push_line(&mut entry.explanation, line.trim());
            }
        }
    }

    if let Some(done) = current.take() {
        pending.push(done);
    }

    let mut seen = HashSet::new();
    let mut entries: Vec<RatingEntry> = pending
        .into_iter()
        .filter(|e| {
            let in_range = e.number >= 1 && e.number <= item_count;
            if !in_range {
                log::debug!("🔎 Rating para item {} fora do lote ({} itens), descartado", e.number, item_count);
            }
            in_range && !e.rating.is_empty() && seen.insert(e.number)
        })
        .map(|e| RatingEntry {
            index: e.number - 1,
            rating: e.rating,
            explanation: e.explanation,
        })
        .collect();

    entries.sort_by_key(|e| e.index);
    entries
}

fn clean_rating(raw: &str) -> String {
    raw.trim().trim_matches('*').trim().to_string()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LISTAS E CITAÇÕES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

static BULLET_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-*•·]+|\d+\s*[.)])\s*").unwrap());

static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#"["“]([^"“”\n]*)["”]"#).unwrap());

/// Remove marcador de lista do início da linha (`-`, `*`, `•`, `1.`, `1)`)
pub fn strip_bullet(line: &str) -> &str {
    let trimmed = line.trim();
    match BULLET_PREFIX.find(trimmed) {
        Some(m) => trimmed[m.end()..].trim(),
        None => trimmed,
    }
}

/// Quebra em linhas, remove marcadores e descarta linhas vazias
pub fn parse_bullet_list(text: &str) -> Vec<String> {
    text.lines()
        .map(strip_bullet)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Extrai substrings entre aspas (distintas, ordem de aparição)
pub fn extract_quoted(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    QUOTED
        .captures_iter(text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|q| !q.is_empty() && seen.insert(q.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANALYSIS_FIXTURE: &str = "SUMMARY:\nThe page describes the Berlin tenants association.\nIt lists offices.\n\nRELEVANCE:\nVery relevant\n\nRELEVANCE EXPLANATION:\nDirectly answers the query.\n\nNEXT ACTIONS:\n- Call the office\n- Email the board\n";

    #[test]
    fn test_parse_analysis_sections() {
        let parsed = parse_sections(ANALYSIS_FIXTURE, &ANALYSIS_CONTRACT);
        assert_eq!(
            parsed.get(SUMMARY),
            "The page describes the Berlin tenants association.\nIt lists offices."
        );
        assert_eq!(parsed.get(RELEVANCE), "Very relevant");
        assert_eq!(parsed.get(RELEVANCE_EXPLANATION), "Directly answers the query.");
        assert_eq!(parsed.get(NEXT_ACTIONS), "- Call the office\n- Email the board");
        assert_eq!(parsed.found_count(), 4);
    }

    #[test]
    fn test_parse_sections_inline_and_markdown() {
        let text = "**SUMMARY:** short text\n## Relevance: relevant\n**Relevance Explanation**: because\n";
        let parsed = parse_sections(text, &ANALYSIS_CONTRACT);
        assert_eq!(parsed.get(SUMMARY), "short text");
        assert_eq!(parsed.get(RELEVANCE), "relevant");
        assert_eq!(parsed.get(RELEVANCE_EXPLANATION), "because");
        assert_eq!(parsed.get(NEXT_ACTIONS), "");
        assert!(!parsed.has(NEXT_ACTIONS));
    }

    #[test]
    fn test_parse_sections_missing_trailing() {
        let parsed = parse_sections("SUMMARY:\nOnly a summary", &ANALYSIS_CONTRACT);
        assert_eq!(parsed.get(SUMMARY), "Only a summary");
        assert_eq!(parsed.get(RELEVANCE), "");
        assert_eq!(parsed.found_count(), 1);
    }

    #[test]
    fn test_parse_sections_garbage() {
        let parsed = parse_sections("I cannot help with that.", &ANALYSIS_CONTRACT);
        assert_eq!(parsed.found_count(), 0);
        assert_eq!(parsed.get(SUMMARY), "");
    }

    #[test]
    fn test_relevance_prefix_is_not_confused() {
        let parsed = parse_sections("RELEVANCE EXPLANATION: only this", &ANALYSIS_CONTRACT);
        assert_eq!(parsed.get(RELEVANCE), "");
        assert_eq!(parsed.get(RELEVANCE_EXPLANATION), "only this");

        let parsed = parse_sections("RELEVANCE without colon\nmore", &ANALYSIS_CONTRACT);
        assert_eq!(parsed.found_count(), 0);
    }

    #[test]
    fn test_parse_rating_batch() {
        let text = "1. RATING: Very relevant\nEXPLANATION: Official source.\n2. RATING: not relevant\nEXPLANATION: Spam page\nwith a second line.\n";
        let entries = parse_rating_batch(text, 2);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].index, 0);
        assert_eq!(entries[0].rating, "Very relevant");
        assert_eq!(entries[0].explanation, "Official source.");
        assert_eq!(entries[1].explanation, "Spam page\nwith a second line.");
    }

    #[test]
    fn test_parse_rating_batch_out_of_range_and_duplicates() {
        let text = "0. RATING: relevant\nEXPLANATION: zero\n3. RATING: relevant\nEXPLANATION: too far\n2. RATING: relevant\nEXPLANATION: first\n2. RATING: not relevant\nEXPLANATION: second\n";
        let entries = parse_rating_batch(text, 2);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].index, 1);
        assert_eq!(entries[0].explanation, "first");
    }

    #[test]
    fn test_parse_rating_batch_sorted_and_markdown() {
        let text = "**2. RATING:** relevant\n**EXPLANATION:** b\n\n1) RATING: **Somewhat relevant**\n   EXPLANATION: a";
        let entries = parse_rating_batch(text, 5);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].index, 0);
        assert_eq!(entries[0].rating, "Somewhat relevant");
        assert_eq!(entries[1].index, 1);
        assert_eq!(entries[1].explanation, "b");
    }

    #[test]
    fn test_parse_rating_batch_unparseable() {
        assert!(parse_rating_batch("Sorry, I can't rate these.", 3).is_empty());
        assert!(parse_rating_batch("", 0).is_empty());
    }

    #[test]
    fn test_bullet_list() {
        let actions = parse_bullet_list("- Call the office\n\n* Visit website\n• Send email\n1. Follow up\n   \n");
        assert_eq!(actions, vec!["Call the office", "Visit website", "Send email", "Follow up"]);
    }

    #[test]
    fn test_extract_quoted() {
        let text = "Here are the queries:\n\"Mieterverein Berlin Kontakt\"\n\"Mietrecht Beratung Berlin\"\n\"\"\n“Mieterverein Berlin Kontakt”";
        assert_eq!(
            extract_quoted(text),
            vec!["Mieterverein Berlin Kontakt", "Mietrecht Beratung Berlin"]
        );
        assert!(extract_quoted("no quotes here").is_empty());
    }
}
