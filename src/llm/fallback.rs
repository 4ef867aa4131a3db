// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CADEIA DE FALLBACK
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Tenta backends em ordem. O primeiro sucesso encerra a cadeia; se todos
// falham, o erro carrega o motivo da última falha.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use super::{LlmError, ModelInvoker};

/// Resposta bem sucedida de uma cadeia
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSuccess {
    /// Backend que respondeu
    pub backend: String,
    /// Texto bruto
    pub text: String,
    /// Backends tentados (incluindo o que respondeu)
    pub attempts: usize,
}

/// Lista ordenada de backends candidatos
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FallbackChain {
    backends: Vec<String>,
}

impl FallbackChain {
    /// Cria uma cadeia a partir dos nomes (ordem = preferência)
    pub fn new<I, S>(backends: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            backends: backends.into_iter().map(Into::into).collect(),
        }
    }

    /// Executa o prompt na cadeia.
    ///
    /// Texto em branco conta como falha daquele backend.
    /// Nenhuma chamada é feita depois do primeiro sucesso.
    pub async fn run(&self, invoker: &ModelInvoker, prompt: &str) -> Result<ChainSuccess, LlmError> {
        let mut last_error: Option<LlmError> = None;

        for (i, backend) in self.backends.iter().enumerate() {
            log::info!("🤖 Tentando modelo: {}", backend);

            match invoker.invoke(backend, prompt).await {
                Ok(text) if !text.trim().is_empty() => {
                    return Ok(ChainSuccess {
                        backend: backend.clone(),
                        text,
                        attempts: i + 1,
                    });
                }
                Ok(_) => {
                    log::warn!("⚠️ {} retornou resposta vazia, tentando próximo modelo", backend);
                    last_error = Some(LlmError::EmptyResponse(backend.clone()));
                }
                Err(e) => {
                    log::warn!("⚠️ {} falhou ({}), tentando próximo modelo", backend, e);
                    last_error = Some(e);
                }
            }
        }

        let last = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "empty fallback chain".to_string());

        log::error!("❌ Todos os modelos falharam. Último erro: {}", last);

        Err(LlmError::AllBackendsExhausted {
            attempts: self.backends.len(),
            last,
        })
    }
}
