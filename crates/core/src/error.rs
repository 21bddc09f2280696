use serde_json::Value;
use thiserror::Error;

/// Every failure the client surfaces.
///
/// The first four variants are the call-time taxonomy: local setup problems,
/// remote rejections, transport failures and malformed caller input. The rest
/// come from loading configuration files or from a successful response whose
/// envelope doesn't have the expected shape.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid local setup, detected before any network call
    #[error("{0}")]
    Configuration(String),

    /// The API answered with a non-2xx status
    #[error("{message}")]
    Api {
        message: String,
        status: u16,
        /// Raw parsed payload, including the server's own `errors` array
        body: Value,
    },

    /// Transport failure after the retry budget was spent
    #[error("{0}")]
    Network(String),

    /// Caller passed something that can't be turned into a request
    #[error("{0}")]
    InvalidArgument(String),

    #[error("Configuration file error: {0}")]
    ConfigFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl Error {
    /// HTTP status of an API rejection
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw response body of an API rejection
    pub fn body(&self) -> Option<&Value> {
        match self {
            Error::Api { body, .. } => Some(body),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::ConfigFile(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::ConfigFile(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
