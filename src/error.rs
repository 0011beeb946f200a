use thiserror::Error;

/// Failures talking to the contest backend, either variant.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Credentials rejected. Retrying without operator intervention is pointless.
    #[error("Authentication failed (HTTP 401) while contacting {url}. Check credentials in the netrc file or BALLOON_API_USER/BALLOON_API_PASSWORD")]
    Authentication { url: String },

    #[error("HTTP {status} from {method} {url}: {body}")]
    Status {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Malformed source data: {0}")]
    Malformed(String),
}

impl SourceError {
    /// Fatal errors stop the dispatch loop; everything else is retried next poll.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SourceError::Authentication { .. })
    }
}

/// Failures writing a ticket to the print sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("could not open printer {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("printer write failed: {0}")]
    Write(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Status server error: {0}")]
    Server(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
