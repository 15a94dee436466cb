use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Carries the driver name exactly as requested.
    #[error("Driver not supported: {0}")]
    UnsupportedDriver(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Requested driver name when this is an `UnsupportedDriver` error
    #[must_use]
    pub fn unsupported_driver(&self) -> Option<&str> {
        match self {
            Self::UnsupportedDriver(name) => Some(name),
            _ => None,
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidInput(format!("Invalid URL: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
