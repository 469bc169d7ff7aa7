//! Thin blocking wrapper around a remote chat-completions endpoint. One
//! request per call, no retries; the transport's own timeout defaults apply.

use log::{debug, info};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::json;
use thiserror::Error;

use crate::config::Settings;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("text generation request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("text generation API returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("text generation response contained no text")]
    MissingText,
}

pub struct GenerationClient {
    http: reqwest::blocking::Client,
    settings: Settings,
}

impl GenerationClient {
    pub fn new(settings: Settings) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            settings,
        }
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Issues exactly one synchronous generation call and returns the raw
    /// response text. A present-but-empty text is returned as `Ok("")`; the
    /// downstream sanitize/execute/classify chain turns it into a friendly
    /// message.
    pub fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );
        let body = json!({
            "model": self.settings.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
        });

        info!(
            "Requesting generation from model '{}' ({} prompt chars)",
            self.settings.model,
            prompt.len()
        );
        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", self.settings.api_key))
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let payload: serde_json::Value = response.json()?;
        let text = payload
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or(GenerationError::MissingText)?;
        debug!("Raw model response ({} chars)", text.len());
        Ok(text.to_string())
    }
}
