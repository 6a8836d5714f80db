use thiserror::Error;

use super::exception::Exception;

#[derive(Error, Debug)]
pub enum UsageError {
    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Invalid next page link: {0}")]
    InvalidNextPage(String),

    #[error("Client configuration error: {0}")]
    ConfigError(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Twilio exception: {0}")]
    Exception(Exception),
}

impl UsageError {
    /// The provider-reported exception, if this error came from a non-200 response.
    pub fn exception(&self) -> Option<&Exception> {
        match self {
            UsageError::Exception(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_exception(&self) -> bool {
        self.exception().is_some()
    }
}

pub type Result<T> = std::result::Result<T, UsageError>;
