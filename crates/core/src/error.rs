use thiserror::Error;

/// Error kinds the core produces. Handlers in `otell-ingest` map these to HTTP
/// status codes at the boundary; nothing below this layer knows about HTTP.
#[derive(Debug, Error)]
pub enum OtellError {
    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("backend unavailable: {0}")]
    Backend(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, OtellError>;
