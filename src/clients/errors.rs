use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unauthorized access to the Genius API, check ACCESS_TOKEN")]
    AuthError,

    #[error("Genius API rate limit reached, too many requests")]
    RateLimitError,

    #[error("Genius API returned unexpected status {0}")]
    HttpStatusError(u16),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timed out: {0}")]
    TimeoutError(String),

    #[error("Malformed response, body is not JSON: {0}")]
    MalformedResponseError(#[source] serde_json::Error),

    #[error("Unexpected response shape: {0}")]
    SchemaError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// Whether a caller-configured retry policy may try the same request again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::RateLimitError | Error::TimeoutError(_) | Error::NetworkError(_)
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::TimeoutError(err.to_string())
        } else {
            Error::NetworkError(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
