//! HTTP similarity service for hosted model providers.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::SimilarityServiceConfig;
use crate::errors::ExternalServiceError;
use crate::matcher::semantic::SimilarityService;

const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Provider {
    Anthropic,
    OpenAi,
}

pub struct HttpSimilarityService {
    provider: Provider,
    provider_name: String,
    model: String,
    url: String,
    api_key: String,
    timeout_seconds: u64,
    client: Client,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ConfidenceReply {
    confidence: f64,
}

impl HttpSimilarityService {
    /// Build a client from config, reading the credential from the
    /// configured environment variable.
    pub fn from_config(config: &SimilarityServiceConfig) -> Result<Self, ExternalServiceError> {
        let api_key = std::env::var(&config.credential_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ExternalServiceError::MissingCredential(config.credential_env.clone()))?;
        Self::with_key(config, api_key)
    }

    pub fn with_key(
        config: &SimilarityServiceConfig,
        api_key: String,
    ) -> Result<Self, ExternalServiceError> {
        let provider = match config.provider.as_str() {
            "anthropic" => Provider::Anthropic,
            "openai" => Provider::OpenAi,
            other => {
                return Err(ExternalServiceError::Http(format!(
                    "unsupported provider '{other}'"
                )))
            }
        };
        let url = config.endpoint.clone().unwrap_or_else(|| {
            match provider {
                Provider::Anthropic => ANTHROPIC_URL,
                Provider::OpenAi => OPENAI_URL,
            }
            .to_string()
        });
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent("stdmerge")
            .build()
            .map_err(|e| ExternalServiceError::Http(e.to_string()))?;
        Ok(Self {
            provider,
            provider_name: config.provider.clone(),
            model: config.model.clone(),
            url,
            api_key,
            timeout_seconds: config.timeout_seconds,
            client,
        })
    }

    fn request_body(&self, prompt: &str) -> Value {
        let messages = [ChatMessage {
            role: "user",
            content: prompt,
        }];
        match self.provider {
            Provider::Anthropic => serde_json::json!({
                "model": self.model,
                "max_tokens": 64,
                "messages": messages,
            }),
            Provider::OpenAi => serde_json::json!({
                "model": self.model,
                "temperature": 0,
                "messages": messages,
            }),
        }
    }

    fn reply_text(&self, body: &Value) -> Option<String> {
        let text = match self.provider {
            Provider::Anthropic => body.pointer("/content/0/text"),
            Provider::OpenAi => body.pointer("/choices/0/message/content"),
        };
        text.and_then(Value::as_str).map(str::to_string)
    }
}

/// Prompt asking for a single JSON confidence value.
pub fn build_prompt(fragments: &[String]) -> String {
    let mut prompt = String::from(
        "You compare functions from different standard libraries. Decide whether \
         all of the following functions implement the same operation.\n\n",
    );
    for (i, fragment) in fragments.iter().enumerate() {
        prompt.push_str(&format!("Function {}:\n{}\n\n", i + 1, fragment.trim()));
    }
    prompt.push_str(
        "Return ONLY a JSON object of the form {\"confidence\": <number between 0 and 1>}.",
    );
    prompt
}

/// Pull the JSON object out of a reply that may be wrapped in prose or a
/// fenced block.
pub fn extract_json(text: &str) -> &str {
    let text = text.trim();
    if let Some(start) = text.find("```") {
        let content_start = start + 3;
        if let Some(newline) = text[content_start..].find('\n') {
            let body_start = content_start + newline + 1;
            if let Some(end) = text[body_start..].find("```") {
                return text[body_start..body_start + end].trim();
            }
        }
    }
    if let (Some(first), Some(last)) = (text.find('{'), text.rfind('}')) {
        if first < last {
            return text[first..=last].trim();
        }
    }
    text
}

/// Parse `{"confidence": x}` from a model reply.
pub fn parse_confidence(reply: &str) -> Result<f64, ExternalServiceError> {
    let parsed: ConfidenceReply = serde_json::from_str(extract_json(reply))
        .map_err(|e| ExternalServiceError::InvalidResponse(format!("{e}: {reply}")))?;
    if !parsed.confidence.is_finite() {
        return Err(ExternalServiceError::InvalidResponse(
            "confidence is not a finite number".to_string(),
        ));
    }
    Ok(parsed.confidence.clamp(0.0, 1.0))
}

impl SimilarityService for HttpSimilarityService {
    fn provider(&self) -> &str {
        &self.provider_name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn similarity(&self, fragments: &[String]) -> Result<f64, ExternalServiceError> {
        let prompt = build_prompt(fragments);
        let request = self.client.post(&self.url).json(&self.request_body(&prompt));
        let request = match self.provider {
            Provider::Anthropic => request
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION),
            Provider::OpenAi => request.bearer_auth(&self.api_key),
        };

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                ExternalServiceError::Timeout(self.timeout_seconds)
            } else {
                ExternalServiceError::Http(e.to_string())
            }
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExternalServiceError::Http(format!(
                "{} returned status {status}",
                self.url
            )));
        }
        let body: Value = response
            .json()
            .map_err(|e| ExternalServiceError::InvalidResponse(e.to_string()))?;
        let text = self.reply_text(&body).ok_or_else(|| {
            ExternalServiceError::InvalidResponse("reply has no text content".to_string())
        })?;
        parse_confidence(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_variants() {
        assert_eq!(extract_json("{\"confidence\": 1}"), "{\"confidence\": 1}");
        assert_eq!(
            extract_json("Sure:\n```json\n{\"confidence\": 0.5}\n```"),
            "{\"confidence\": 0.5}"
        );
        assert_eq!(
            extract_json("Answer: {\"confidence\": 0.2} done"),
            "{\"confidence\": 0.2}"
        );
    }

    #[test]
    fn test_parse_confidence_clamps_and_rejects() {
        assert_eq!(parse_confidence("{\"confidence\": 0.85}").unwrap(), 0.85);
        assert_eq!(parse_confidence("{\"confidence\": 3}").unwrap(), 1.0);
        assert!(parse_confidence("no idea").is_err());
    }

    #[test]
    fn test_prompt_lists_every_fragment() {
        let prompt = build_prompt(&["add(a, b)".into(), "Add(a int, b int)".into()]);
        assert!(prompt.contains("Function 1:\nadd(a, b)"));
        assert!(prompt.contains("Function 2:\nAdd(a int, b int)"));
    }

    #[test]
    fn test_missing_credential() {
        let config = SimilarityServiceConfig {
            credential_env: "STDMERGE_TEST_UNSET_CREDENTIAL".into(),
            ..Default::default()
        };
        match HttpSimilarityService::from_config(&config) {
            Err(ExternalServiceError::MissingCredential(var)) => {
                assert_eq!(var, "STDMERGE_TEST_UNSET_CREDENTIAL")
            }
            other => panic!("unexpected {:?}", other.err()),
        }
    }

    #[test]
    fn test_unreachable_endpoint_is_http_error() {
        let config = SimilarityServiceConfig {
            provider: "openai".into(),
            endpoint: Some("http://127.0.0.1:9/v1/chat/completions".into()),
            timeout_seconds: 2,
            ..Default::default()
        };
        let service = HttpSimilarityService::with_key(&config, "key".into()).unwrap();
        let err = service.similarity(&["a".into()]).unwrap_err();
        assert!(matches!(
            err,
            ExternalServiceError::Http(_) | ExternalServiceError::Timeout(_)
        ));
    }
}
