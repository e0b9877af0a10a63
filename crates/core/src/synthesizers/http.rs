use crate::error::SynthesisError;
use crate::traits::{ModelLoader, TextGenerator};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

const WARMUP_PROMPT: &str = "ping";

pub const ENDPOINT_ENV: &str = "QUIZ_MODEL_ENDPOINT";
pub const API_KEY_ENV: &str = "QUIZ_MODEL_API_KEY";

/// Connection settings for a hosted text-generation endpoint that accepts
/// `{"inputs", "parameters"}` and answers with `generated_text`.
#[derive(Debug, Clone)]
pub struct HttpModelConfig {
    pub endpoint: Url,
    pub api_key: Option<String>,
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub request_timeout: Duration,
}

impl HttpModelConfig {
    pub fn new(endpoint: &str) -> Result<Self, SynthesisError> {
        Ok(Self {
            endpoint: Url::parse(endpoint.trim())?,
            api_key: None,
            max_new_tokens: 256,
            temperature: 0.7,
            request_timeout: Duration::from_secs(60),
        })
    }

    /// Reads `QUIZ_MODEL_ENDPOINT` and `QUIZ_MODEL_API_KEY`. Returns `None`
    /// when no endpoint is configured.
    pub fn from_env() -> Option<Result<Self, SynthesisError>> {
        let endpoint = non_empty_env(ENDPOINT_ENV)?;
        Some(Self::new(&endpoint).map(Self::with_env_api_key))
    }

    /// Takes the bearer token from `QUIZ_MODEL_API_KEY`, if set.
    pub fn with_env_api_key(self) -> Self {
        self.with_api_key(non_empty_env(API_KEY_ENV))
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.and_then(|key| {
            let key = key.trim().to_string();
            if key.is_empty() {
                None
            } else {
                Some(key)
            }
        });
        self
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|value| {
        let value = value.trim().to_string();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
}

#[derive(Debug, Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
    temperature: f32,
    do_sample: bool,
    return_full_text: bool,
}

pub struct HttpTextGenerator {
    client: Client,
    config: HttpModelConfig,
}

impl HttpTextGenerator {
    pub fn new(config: HttpModelConfig) -> Result<Self, SynthesisError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { client, config })
    }

    async fn request(&self, prompt: &str, max_new_tokens: u32) -> Result<String, SynthesisError> {
        let payload = GenerationRequest {
            inputs: prompt,
            parameters: GenerationParameters {
                max_new_tokens,
                temperature: self.config.temperature,
                do_sample: true,
                return_full_text: false,
            },
        };

        let mut request = self
            .client
            .post(self.config.endpoint.clone())
            .header("content-type", "application/json")
            .json(&payload);

        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SynthesisError::BackendResponse(format!(
                "generation request to {} returned {}",
                self.config.endpoint,
                response.status()
            )));
        }

        let parsed: Value = response.json().await?;
        generated_text(&parsed).ok_or_else(|| {
            SynthesisError::BackendResponse("response has no generated_text".to_string())
        })
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, SynthesisError> {
        self.request(prompt, self.config.max_new_tokens).await
    }
}

/// Accepts both the list form `[{"generated_text": ..}]` and the object form.
fn generated_text(payload: &Value) -> Option<String> {
    payload
        .pointer("/0/generated_text")
        .or_else(|| payload.pointer("/generated_text"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Loads the endpoint by sending a one-token warm-up request; hosted models
/// answer with an error status until they are ready to serve.
pub struct HttpModelLoader {
    config: HttpModelConfig,
}

impl HttpModelLoader {
    pub fn new(config: HttpModelConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ModelLoader for HttpModelLoader {
    type Model = HttpTextGenerator;

    async fn load(&self) -> Result<HttpTextGenerator, SynthesisError> {
        let generator = HttpTextGenerator::new(self.config.clone())?;
        generator
            .request(WARMUP_PROMPT, 1)
            .await
            .map_err(|error| SynthesisError::ModelUnavailable(error.to_string()))?;
        tracing::info!(
            endpoint = %self.config.endpoint,
            "text generation endpoint answered warm-up"
        );
        Ok(generator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn generated_text_accepts_list_and_object_payloads() {
        let listed = json!([{ "generated_text": "first" }]);
        let object = json!({ "generated_text": "second" });
        let other = json!({ "error": "loading" });

        assert_eq!(generated_text(&listed).as_deref(), Some("first"));
        assert_eq!(generated_text(&object).as_deref(), Some("second"));
        assert_eq!(generated_text(&other), None);
    }

    #[test]
    fn config_rejects_invalid_endpoints() {
        assert!(HttpModelConfig::new("not a url").is_err());
        let config = HttpModelConfig::new(" http://localhost:8080/generate ").expect("valid url");
        assert_eq!(config.endpoint.path(), "/generate");
    }

    #[test]
    fn blank_api_keys_are_ignored() {
        let config = HttpModelConfig::new("http://localhost:8080")
            .expect("valid url")
            .with_api_key(Some("   ".to_string()));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn request_body_matches_the_inference_schema() {
        let payload = GenerationRequest {
            inputs: "prompt",
            parameters: GenerationParameters {
                max_new_tokens: 8,
                temperature: 0.5,
                do_sample: true,
                return_full_text: false,
            },
        };
        let value = serde_json::to_value(&payload).expect("serializable");
        assert_eq!(value["inputs"], "prompt");
        assert_eq!(value["parameters"]["max_new_tokens"], 8);
        assert_eq!(value["parameters"]["return_full_text"], false);
    }

    #[test]
    fn config_is_read_from_the_environment() {
        std::env::remove_var(ENDPOINT_ENV);
        std::env::remove_var(API_KEY_ENV);
        assert!(HttpModelConfig::from_env().is_none());

        std::env::set_var(ENDPOINT_ENV, "  ");
        assert!(HttpModelConfig::from_env().is_none());

        std::env::set_var(ENDPOINT_ENV, "http://localhost:8080/generate");
        std::env::set_var(API_KEY_ENV, " secret ");
        let config = HttpModelConfig::from_env()
            .expect("endpoint configured")
            .expect("valid url");
        assert_eq!(config.endpoint.path(), "/generate");
        assert_eq!(config.api_key.as_deref(), Some("secret"));

        std::env::set_var(ENDPOINT_ENV, "not a url");
        assert!(matches!(HttpModelConfig::from_env(), Some(Err(_))));

        std::env::remove_var(ENDPOINT_ENV);
        std::env::remove_var(API_KEY_ENV);
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails_to_load() {
        let mut config = HttpModelConfig::new("http://127.0.0.1:9/generate").expect("valid url");
        config.request_timeout = Duration::from_millis(500);
        let result = HttpModelLoader::new(config).load().await;
        assert!(matches!(result, Err(SynthesisError::ModelUnavailable(_))));
    }
}
