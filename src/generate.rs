//! Client for the text-generation collaborator.
//!
//! The wire contract is narrow: POST `{ "prompt": ... }`, receive
//! `{ "text": ... }` on success or a non-2xx status with `{ "message": ... }`.
//! There is no partial-token streaming; the whole reply arrives at once and
//! the reveal animation happens client-side.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Failure modes of one generation call. Neither is fatal; both surface as
/// an inline error bubble and leave conversation state otherwise unchanged.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The collaborator answered with a non-success status.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    /// The request never produced a usable response.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Seam between the conversation controller and whatever produces replies.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: String,
}

/// HTTP implementation speaking to the configured endpoint.
pub struct HttpGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpGenerator {
    pub fn new(endpoint: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
        }
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&GenerateRequest { prompt });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorResponse>().await {
                Ok(body) if !body.message.is_empty() => body.message,
                _ => status
                    .canonical_reason()
                    .unwrap_or("request rejected")
                    .to_string(),
            };
            warn!(status = status.as_u16(), %message, "generation request rejected");
            return Err(GenerateError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateResponse = response.json().await?;
        Ok(body.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_matches_wire_contract() {
        let json = serde_json::to_string(&GenerateRequest { prompt: "Hello" })
            .expect("serialize request");
        assert_eq!(json, r#"{"prompt":"Hello"}"#);
    }

    #[test]
    fn response_text_defaults_to_empty() {
        let parsed: GenerateResponse = serde_json::from_str("{}").expect("parse empty object");
        assert_eq!(parsed.text, "");

        let parsed: GenerateResponse =
            serde_json::from_str(r#"{"text":"hi"}"#).expect("parse reply");
        assert_eq!(parsed.text, "hi");
    }

    #[test]
    fn error_body_parses_message() {
        let parsed: ErrorResponse =
            serde_json::from_str(r#"{"message":"Internal Server Error"}"#).expect("parse error");
        assert_eq!(parsed.message, "Internal Server Error");
    }

    #[test]
    fn api_error_displays_status_and_message() {
        let err = GenerateError::Api {
            status: 500,
            message: "Internal Server Error".into(),
        };
        assert_eq!(err.to_string(), "API error 500: Internal Server Error");
    }
}
