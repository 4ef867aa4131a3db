// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TRANSPORTE HTTP PARA MODELOS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Uma implementação por família de protocolo:
// - Completion (Cerebras): `prompt` → `choices[0].text`
// - Chat (DeepSeek, OpenAI): `messages` → `choices[0].message.content`
// - generateContent (Gemini): `contents` → `candidates[0].content.parts[].text`
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::{BackendSpec, LlmClient, LlmError, ProtocolFamily};
use crate::config::{Credentials, GenerationConfig, ResearchConfig};

/// Cliente HTTP real para os backends do registro
pub struct HttpLlmClient {
    client: reqwest::Client,
    credentials: Credentials,
    generation: GenerationConfig,
}

impl HttpLlmClient {
    /// Cria o cliente a partir da configuração (credenciais + timeout)
    pub fn new(config: &ResearchConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(config.llm_timeout)
                .build()
                .unwrap_or_default(),
            credentials: config.credentials.clone(),
            generation: config.generation.clone(),
        }
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        request: reqwest::RequestBuilder,
        body: &B,
    ) -> Result<Value, LlmError> {
        let response = request
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(LlmError::RateLimitError);
        }

        let text = response
            .text()
            .await
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            let snippet: String = text.chars().take(300).collect();
            return Err(LlmError::ApiError(format!("HTTP {}: {}", status, snippet)));
        }

        serde_json::from_str(&text).map_err(|e| LlmError::ParseError(format!("invalid JSON: {}", e)))
    }

    async fn call_completion(&self, spec: &BackendSpec, key: &str, prompt: &str) -> Result<String, LlmError> {
        #[derive(Serialize)]
        struct CompletionRequest<'a> {
            model: &'a str,
            prompt: &'a str,
            max_tokens: u32,
            temperature: f32,
        }

        let body = CompletionRequest {
            model: spec.model,
            prompt,
            max_tokens: self.generation.max_tokens,
            temperature: self.generation.temperature,
        };

        let request = self
            .client
            .post(spec.endpoint)
            .header("Authorization", format!("Bearer {}", key));

        let json = self.post_json(request, &body).await?;
        extract_completion_text(&json)
    }

    async fn call_chat(&self, spec: &BackendSpec, key: &str, prompt: &str) -> Result<String, LlmError> {
        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<ChatMessage<'a>>,
            temperature: f32,
        }

        #[derive(Serialize)]
        struct ChatMessage<'a> {
            role: &'a str,
            content: &'a str,
        }

        let body = ChatRequest {
            model: spec.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.generation.temperature,
        };

        let request = self
            .client
            .post(spec.endpoint)
            .header("Authorization", format!("Bearer {}", key));

        let json = self.post_json(request, &body).await?;
        extract_chat_text(&json)
    }

    async fn call_gemini(&self, spec: &BackendSpec, key: &str, prompt: &str) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": {
                "temperature": self.generation.temperature
            }
        });

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            spec.endpoint,
            urlencoding::encode(spec.model),
            urlencoding::encode(key)
        );

        let json = self.post_json(self.client.post(url), &body).await?;
        extract_gemini_text(&json)
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, backend: &BackendSpec, prompt: &str) -> Result<String, LlmError> {
        let key = self
            .credentials
            .for_kind(backend.credential)
            .ok_or_else(|| LlmError::MissingCredential {
                backend: backend.name.to_string(),
                env_var: backend.credential.env_var(),
            })?;

        let start = std::time::Instant::now();

        let result = match backend.protocol {
            ProtocolFamily::Completion => self.call_completion(backend, key, prompt).await,
            ProtocolFamily::ChatMessages => self.call_chat(backend, key, prompt).await,
            ProtocolFamily::GenerateContent => self.call_gemini(backend, key, prompt).await,
        };

        log::debug!(
            "🤖 {} respondeu em {}ms (ok={})",
            backend,
            start.elapsed().as_millis(),
            result.is_ok()
        );

        result
    }
}

/// Extrai o texto de uma resposta da família completion
pub fn extract_completion_text(json: &Value) -> Result<String, LlmError> {
    json["choices"][0]["text"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| LlmError::ParseError("missing choices[0].text".into()))
}

/// Extrai o texto de uma resposta da família chat
pub fn extract_chat_text(json: &Value) -> Result<String, LlmError> {
    json["choices"][0]["message"]["content"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| LlmError::ParseError("missing choices[0].message.content".into()))
}

/// Extrai o texto de uma resposta `generateContent` (concatena as parts)
pub fn extract_gemini_text(json: &Value) -> Result<String, LlmError> {
    let parts = json["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| {
            let reason = json["promptFeedback"]["blockReason"]
                .as_str()
                .unwrap_or("missing candidates[0].content.parts");
            LlmError::ParseError(reason.to_string())
        })?;

    Ok(parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect::<Vec<_>>()
        .join(""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::BackendRegistry;
    use serde_json::json;

    #[test]
    fn test_extract_completion_text() {
        let payload = json!({"choices": [{"text": "Paris"}]});
        assert_eq!(extract_completion_text(&payload).unwrap(), "Paris");
        assert!(extract_completion_text(&json!({})).is_err());
    }

    #[test]
    fn test_extract_chat_text() {
        let payload = json!({"choices": [{"message": {"role": "assistant", "content": "Berlin"}}]});
        assert_eq!(extract_chat_text(&payload).unwrap(), "Berlin");
        assert!(matches!(
            extract_chat_text(&json!({"choices": []})),
            Err(LlmError::ParseError(_))
        ));
    }

    #[test]
    fn test_extract_gemini_text() {
        let payload = json!({
            "candidates": [{"content": {"parts": [{"text": "Hello "}, {"text": "world"}]}}]
        });
        assert_eq!(extract_gemini_text(&payload).unwrap(), "Hello world");

        let blocked = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        match extract_gemini_text(&blocked) {
            Err(LlmError::ParseError(reason)) => assert_eq!(reason, "SAFETY"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_credential_fails_without_network() {
        let client = HttpLlmClient::new(&ResearchConfig::default());
        let spec = BackendRegistry::new().get("gpt-4o-mini").unwrap();

        match client.complete(spec, "hello").await {
            Err(LlmError::MissingCredential { env_var, .. }) => assert_eq!(env_var, "OPENAI_API_KEY"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
