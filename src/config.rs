//! Environment-derived configuration for the text-generation capability.
//! Loaded once at process start and passed by reference into the agents; no
//! hidden global state.

use std::env;

use anyhow::{Result, bail};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl Settings {
    /// Reads `OPENAI_API_KEY` (required), `OPENAI_MODEL`, and
    /// `OPENAI_BASE_URL` from the environment, honoring a `.env` file if one
    /// is present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let Ok(api_key) = env::var("OPENAI_API_KEY") else {
            bail!("OPENAI_API_KEY is not set. Set it in your environment or .env file.");
        };
        if api_key.trim().is_empty() {
            bail!("OPENAI_API_KEY is empty. Set it in your environment or .env file.");
        }
        let model = env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let base_url =
            env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self {
            api_key,
            model,
            base_url,
        })
    }
}
