/// Errors raised while fetching from a vendor metrics endpoint.
///
/// A fetch failure is always local to one source for one cycle: the
/// collector records it and keeps going with the other adapters.
///
/// # Examples
///
/// ```rust
/// use dialmon_source::error::FetchError;
///
/// let err = FetchError::Http { status: 503, body: "unavailable".to_string() };
/// assert!(err.to_string().contains("503"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Non-2xx status code from the vendor endpoint.
    #[error("vendor endpoint returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// An underlying HTTP transport error from `reqwest`.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The fetch did not complete within its timeout.
    #[error("fetch timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The response body could not be parsed into the expected vendor shape.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The configured source kind has no registered adapter.
    #[error("unsupported source kind: {0}")]
    UnsupportedSource(String),
}

/// Convenience type alias so callers can write `error::Result<T>`.
pub type Result<T> = std::result::Result<T, FetchError>;
