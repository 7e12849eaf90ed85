use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("http {status} from {url}")]
    HttpStatus { url: String, status: StatusCode },

    #[error("invalid json from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected payload from {url}: expected {expected}")]
    UnexpectedShape { url: String, expected: &'static str },

    #[error("database error while trying to {context}: {source}")]
    Persistence {
        context: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

impl IngestError {
    /// 4xx responses mean the upstream has nothing published for the request yet.
    pub fn is_client_error(&self) -> bool {
        matches!(self, IngestError::HttpStatus { status, .. } if status.is_client_error())
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;

pub(crate) trait PersistContext<T> {
    fn persist(self, context: &'static str) -> Result<T>;
}

impl<T> PersistContext<T> for std::result::Result<T, rusqlite::Error> {
    fn persist(self, context: &'static str) -> Result<T> {
        self.map_err(|source| IngestError::Persistence { context, source })
    }
}
