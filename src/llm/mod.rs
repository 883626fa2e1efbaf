pub mod openai;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("API error: {0}")]
    Api(String),
    #[error("response had no text")]
    Empty,
}

/// A synchronous text-generation backend.
pub trait Generator {
    fn generate(&self, system: &str, user: &str) -> Result<String, GenerateError>;
}
