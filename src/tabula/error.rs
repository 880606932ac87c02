use thiserror::Error;

#[derive(Error, Debug)]
pub enum TabulaError {
    #[error("Unknown scope: {0}")]
    UnknownScope(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Permission denied: {0}")]
    Forbidden(String),

    #[error("Invalid or expired security token")]
    InvalidToken,

    #[error("Api Error: {0}")]
    Api(String),
}

impl TabulaError {
    /// Stable machine-readable code used in structured failure responses.
    pub fn code(&self) -> &'static str {
        match self {
            TabulaError::UnknownScope(_) => "unknown_scope",
            TabulaError::Io(_) => "io",
            TabulaError::Serialization(_) => "serialization",
            TabulaError::Csv(_) => "csv",
            TabulaError::Store(_) => "store",
            TabulaError::Unauthorized => "unauthorized",
            TabulaError::Forbidden(_) => "forbidden",
            TabulaError::InvalidToken => "invalid_token",
            TabulaError::Api(_) => "api",
        }
    }
}

pub type Result<T> = std::result::Result<T, TabulaError>;
