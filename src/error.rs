use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("catalog rejected the API key")]
    InvalidApiKey,

    #[error("catalog returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("request cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Transport failures that mean the catalog is unreachable rather than
    /// misbehaving.
    pub fn is_offline(&self) -> bool {
        match self {
            AppError::Http(err) => err.is_connect() || err.is_timeout(),
            _ => false,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
