// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CLIENTE LLM
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Invocação de modelos de linguagem por nome de backend.
// - `LlmClient`: transporte (HTTP real ou mock)
// - `ModelInvoker`: valida o nome no registro antes de qualquer chamada
// - `FallbackChain`: tenta backends em ordem até um responder
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

mod fallback;
mod http;
mod registry;

pub use fallback::{ChainSuccess, FallbackChain};
pub use http::HttpLlmClient;
pub use registry::{BackendRegistry, BackendSpec, CredentialKind, ProtocolFamily, BACKENDS};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Erros do cliente LLM
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    /// Nome ausente do registro (rejeitado antes de qualquer chamada de rede)
    #[error("Unknown model: {0}")]
    UnknownBackend(String),

    /// Credencial do provedor não configurada
    #[error("Missing credential {env_var} for model {backend}")]
    MissingCredential {
        /// Backend solicitado
        backend: String,
        /// Variável de ambiente esperada
        env_var: &'static str,
    },

    /// Erro retornado pela API
    #[error("API error: {0}")]
    ApiError(String),

    /// HTTP 429
    #[error("Rate limit exceeded")]
    RateLimitError,

    /// Falha de rede / timeout
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Payload do provedor em formato inesperado
    #[error("Invalid response format: {0}")]
    ParseError(String),

    /// O modelo respondeu texto vazio
    #[error("Empty response from model {0}")]
    EmptyResponse(String),

    /// Todos os backends da cadeia falharam
    #[error("All models failed. Last error: {last}")]
    AllBackendsExhausted {
        /// Backends tentados
        attempts: usize,
        /// Motivo da última falha
        last: String,
    },
}

/// Transporte para modelos de linguagem.
///
/// Uma chamada de rede por invocação, sem retry e sem cache.
/// Retry entre backends é responsabilidade de quem chama ([`FallbackChain`]).
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Envia o prompt ao backend e retorna o texto bruto
    async fn complete(&self, backend: &BackendSpec, prompt: &str) -> Result<String, LlmError>;
}

/// Invocador de modelos por nome
///
/// # Exemplo
///
/// ```rust,ignore
/// let invoker = ModelInvoker::new(Arc::new(HttpLlmClient::new(&config)));
/// let text = invoker.invoke("gpt-4o-mini", "What is the capital of France?").await?;
/// ```
pub struct ModelInvoker {
    registry: BackendRegistry,
    client: Arc<dyn LlmClient>,
}

impl ModelInvoker {
    /// Cria um invocador com o registro padrão
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            registry: BackendRegistry::default(),
            client,
        }
    }

    /// Invoca um backend pelo nome.
    ///
    /// Nomes fora do registro falham com [`LlmError::UnknownBackend`]
    /// sem tocar o transporte.
    pub async fn invoke(&self, backend_name: &str, prompt: &str) -> Result<String, LlmError> {
        let spec = self
            .registry
            .get(backend_name)
            .ok_or_else(|| LlmError::UnknownBackend(backend_name.to_string()))?;

        log::debug!("🤖 Invocando {} | prompt: {} chars", spec, prompt.len());

        self.client.complete(spec, prompt).await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO MOCK PARA TESTES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Resposta programada do mock
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Responde com o texto
    Text(String),
    /// Falha com erro de API
    Fail(String),
    /// Entra em panic (para testar totalidade)
    Panic(String),
}

#[derive(Debug, Clone)]
struct MockRule {
    backend: Option<String>,
    prompt_contains: Option<String>,
    reply: MockReply,
}

impl MockRule {
    fn matches(&self, backend: &str, prompt: &str) -> bool {
        self.backend.as_deref().map_or(true, |b| b == backend)
            && self
                .prompt_contains
                .as_deref()
                .map_or(true, |needle| prompt.contains(needle))
    }
}

/// Chamada registrada pelo mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    /// Backend chamado
    pub backend: String,
    /// Prompt enviado
    pub prompt: String,
}

/// Cliente mock para testes.
///
/// Regras são avaliadas na ordem em que foram adicionadas; a primeira
/// que casar decide a resposta. Sem regra, falha com `ApiError`.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    rules: Vec<MockRule>,
    default_reply: Option<MockReply>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockLlmClient {
    /// Cria um mock sem regras
    pub fn new() -> Self {
        Self::default()
    }

    fn rule(mut self, backend: Option<&str>, needle: Option<&str>, reply: MockReply) -> Self {
        self.rules.push(MockRule {
            backend: backend.map(String::from),
            prompt_contains: needle.map(String::from),
            reply,
        });
        self
    }

    /// Responde `text` para qualquer prompt enviado a `backend`
    pub fn respond(self, backend: &str, text: &str) -> Self {
        self.rule(Some(backend), None, MockReply::Text(text.into()))
    }

    /// Falha para qualquer prompt enviado a `backend`
    pub fn fail(self, backend: &str, message: &str) -> Self {
        self.rule(Some(backend), None, MockReply::Fail(message.into()))
    }

    /// Responde `text` (qualquer backend) quando o prompt contém `needle`
    pub fn respond_when(self, needle: &str, text: &str) -> Self {
        self.rule(None, Some(needle), MockReply::Text(text.into()))
    }

    /// Falha (qualquer backend) quando o prompt contém `needle`
    pub fn fail_when(self, needle: &str, message: &str) -> Self {
        self.rule(None, Some(needle), MockReply::Fail(message.into()))
    }

    /// Panic (qualquer backend) quando o prompt contém `needle`
    pub fn panic_when(self, needle: &str) -> Self {
        self.rule(None, Some(needle), MockReply::Panic(format!("mock panic on '{}'", needle)))
    }

    /// Resposta usada quando nenhuma regra casa
    pub fn with_default_reply(mut self, text: &str) -> Self {
        self.default_reply = Some(MockReply::Text(text.into()));
        self
    }

    /// Chamadas recebidas, em ordem
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Número de chamadas por backend
    pub fn calls_by_backend(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for call in self.calls() {
            *counts.entry(call.backend).or_insert(0) += 1;
        }
        counts
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, backend: &BackendSpec, prompt: &str) -> Result<String, LlmError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(MockCall {
                backend: backend.name.to_string(),
                prompt: prompt.to_string(),
            });

        let reply = self
            .rules
            .iter()
            .find(|rule| rule.matches(backend.name, prompt))
            .map(|rule| rule.reply.clone())
            .or_else(|| self.default_reply.clone());

        match reply {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Fail(message)) => Err(LlmError::ApiError(message)),
            Some(MockReply::Panic(message)) => panic!("{}", message),
            None => Err(LlmError::ApiError(format!(
                "no mock response for {}",
                backend.name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_backend_is_rejected_before_transport() {
        let mock = Arc::new(MockLlmClient::new().with_default_reply("ok"));
        let invoker = ModelInvoker::new(mock.clone());

        let err = invoker.invoke("gpt-4-mini", "hello").await.unwrap_err();
        assert!(matches!(err, LlmError::UnknownBackend(ref name) if name == "gpt-4-mini"));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invoke_known_backend() {
        let mock = Arc::new(MockLlmClient::new().respond("gpt-4o-mini", "Paris"));
        let invoker = ModelInvoker::new(mock.clone());

        let text = invoker.invoke("gpt-4o-mini", "capital of France?").await.unwrap();
        assert_eq!(text, "Paris");
        assert_eq!(mock.calls().len(), 1);
        assert_eq!(mock.calls()[0].backend, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_mock_rule_order() {
        let mock = MockLlmClient::new()
            .respond_when("addresses", "None found")
            .respond("gemini-2.0-flash-exp", "generic");
        let spec = BackendRegistry::new().get("gemini-2.0-flash-exp").unwrap();

        assert_eq!(mock.complete(spec, "Extract addresses").await.unwrap(), "None found");
        assert_eq!(mock.complete(spec, "Summarize").await.unwrap(), "generic");
        assert_eq!(mock.calls_by_backend().get("gemini-2.0-flash-exp"), Some(&2));
    }
}
