use thiserror::Error;

/// Failure of a single remote task-store call. Nothing is retried.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("failed to parse response body: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("remote returned HTTP {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("base URL {0} cannot take a path; use an http or https URL")]
    CannotBeABase(String),
}

impl StoreError {
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Parse(_) => "parse",
            Self::Remote { .. } => "remote",
            Self::InvalidUrl(_) | Self::CannotBeABase(_) => "invalid_url",
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
