// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// EXTRAÇÃO DE CONTATOS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// E-mails, telefones e perfis sociais por regex (determinístico).
// Endereços dependem do modelo e ficam em `ContentAnalyzer`.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::parser::strip_bullet;
use crate::prompts::NO_ADDRESSES_SENTINEL;
use crate::types::{ContactInfo, MAX_CONTACT_ITEMS};

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap());

static PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap()
});

static SOCIAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:https?://)?(?:www\.)?(?:facebook|twitter|linkedin|instagram)\.com/[\w.-]+").unwrap()
});

/// Matches distintos, ordem de aparição, no máximo [`MAX_CONTACT_ITEMS`]
fn distinct_matches(pattern: &Regex, text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    pattern
        .find_iter(text)
        .map(|m| m.as_str().trim().trim_end_matches('.').to_string())
        .filter(|m| seen.insert(m.clone()))
        .take(MAX_CONTACT_ITEMS)
        .collect()
}

/// Extrai e-mails, telefones e redes sociais do texto completo.
///
/// `addresses` fica vazio.
pub fn extract_contacts(text: &str) -> ContactInfo {
    ContactInfo {
        emails: distinct_matches(&EMAIL, text),
        phones: distinct_matches(&PHONE, text),
        social_media: distinct_matches(&SOCIAL, text),
        addresses: Vec::new(),
    }
}

/// Converte a resposta do modelo de endereços em lista.
///
/// Linhas aparadas, marcadores removidos, sentinela "None found" descartado.
pub fn parse_addresses(response: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    response
        .lines()
        .map(strip_bullet)
        .filter(|line| !line.is_empty() && !is_sentinel(line))
        .map(String::from)
        .filter(|line| seen.insert(line.clone()))
        .take(MAX_CONTACT_ITEMS)
        .collect()
}

fn is_sentinel(line: &str) -> bool {
    line.trim_matches(|c: char| c == '\'' || c == '"' || c == '.')
        .eq_ignore_ascii_case(NO_ADDRESSES_SENTINEL)
}
