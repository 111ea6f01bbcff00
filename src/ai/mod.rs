pub mod fallback;
pub mod gemini;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("AI API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("could not parse the analysis results from the AI")]
    EmptyResponse,
}
