// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// REGISTRO DE BACKENDS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Registro estático e fechado dos modelos que o pipeline sabe invocar.
// Cada entrada declara provedor, família de protocolo, endpoint, modelo
// e a credencial exigida.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::fmt;

/// Família de protocolo de um backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolFamily {
    /// Endpoint de completion (`prompt` → `choices[0].text`)
    Completion,
    /// Endpoint de chat (`messages` → `choices[0].message.content`)
    ChatMessages,
    /// API `generateContent` do Gemini
    GenerateContent,
}

/// Credencial exigida por um backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    /// `CEREBRAS_API_KEY`
    Cerebras,
    /// `GEMINI_API_KEY`
    Gemini,
    /// `DEEPSEEK_API_KEY`
    DeepSeek,
    /// `OPENAI_API_KEY`
    OpenAi,
}

impl CredentialKind {
    /// Nome da variável de ambiente correspondente
    pub fn env_var(&self) -> &'static str {
        match self {
            Self::Cerebras => "CEREBRAS_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
            Self::DeepSeek => "DEEPSEEK_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }
}

/// Configuração de um backend nomeado
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSpec {
    /// Nome usado nas cadeias de fallback
    pub name: &'static str,
    /// Provedor (para logs)
    pub provider: &'static str,
    /// Família de protocolo
    pub protocol: ProtocolFamily,
    /// Endpoint base
    pub endpoint: &'static str,
    /// Identificador do modelo no provedor
    pub model: &'static str,
    /// Credencial exigida
    pub credential: CredentialKind,
}

impl fmt::Display for BackendSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.provider)
    }
}

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Backends conhecidos
pub const BACKENDS: &[BackendSpec] = &[
    BackendSpec {
        name: "llama-3.3-70b",
        provider: "cerebras",
        protocol: ProtocolFamily::Completion,
        endpoint: "https://api.cerebras.ai/v1/completions",
        model: "llama-3.3-70b",
        credential: CredentialKind::Cerebras,
    },
    BackendSpec {
        name: "gemini-2.0-flash-exp",
        provider: "gemini",
        protocol: ProtocolFamily::GenerateContent,
        endpoint: GEMINI_BASE_URL,
        model: "gemini-2.0-flash-exp",
        credential: CredentialKind::Gemini,
    },
    BackendSpec {
        name: "gemini-exp-1206",
        provider: "gemini",
        protocol: ProtocolFamily::GenerateContent,
        endpoint: GEMINI_BASE_URL,
        model: "gemini-exp-1206",
        credential: CredentialKind::Gemini,
    },
    BackendSpec {
        name: "deepseek-chat",
        provider: "deepseek",
        protocol: ProtocolFamily::ChatMessages,
        endpoint: "https://api.deepseek.com/v1/chat/completions",
        model: "deepseek-chat",
        credential: CredentialKind::DeepSeek,
    },
    BackendSpec {
        name: "deepseek-reasoner",
        provider: "deepseek",
        protocol: ProtocolFamily::ChatMessages,
        endpoint: "https://api.deepseek.com/v1/chat/completions",
        model: "deepseek-reasoner",
        credential: CredentialKind::DeepSeek,
    },
    BackendSpec {
        name: "gpt-4o-mini",
        provider: "openai",
        protocol: ProtocolFamily::ChatMessages,
        endpoint: "https://api.openai.com/v1/chat/completions",
        model: "gpt-4o-mini",
        credential: CredentialKind::OpenAi,
    },
];

/// Registro fechado de backends
#[derive(Debug, Clone, Copy)]
pub struct BackendRegistry {
    backends: &'static [BackendSpec],
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self { backends: BACKENDS }
    }
}

impl BackendRegistry {
    /// Registro padrão com todos os backends conhecidos
    pub fn new() -> Self {
        Self::default()
    }

    /// Busca um backend pelo nome (exato)
    pub fn get(&self, name: &str) -> Option<&'static BackendSpec> {
        self.backends.iter().find(|b| b.name == name)
    }

    /// Verifica se o nome está registrado
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Nomes registrados
    pub fn names(&self) -> impl Iterator<Item = &'static str> {
        self.backends.iter().map(|b| b.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup() {
        let registry = BackendRegistry::new();
        let spec = registry.get("deepseek-chat").unwrap();
        assert_eq!(spec.protocol, ProtocolFamily::ChatMessages);
        assert_eq!(spec.credential, CredentialKind::DeepSeek);

        assert!(registry.contains("llama-3.3-70b"));
        assert!(!registry.contains("gpt-4-mini"));
        assert!(!registry.contains("DEEPSEEK-CHAT"));
    }

    #[test]
    fn test_registry_names_are_unique() {
        let registry = BackendRegistry::new();
        let names: Vec<_> = registry.names().collect();
        let mut deduped = names.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(names.len(), deduped.len());
        assert_eq!(names.len(), 6);
    }
}
