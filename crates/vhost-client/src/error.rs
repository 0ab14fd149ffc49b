use thiserror::Error;

/// Failures observed by [`crate::GatewayClient`]. Distinguishes transport
/// failures from the server answering with a non-2xx status.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status code: {0}")]
    UnexpectedStatus(reqwest::StatusCode),
    #[error("vhost not found")]
    NotFound,
    #[error("invalid base url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
