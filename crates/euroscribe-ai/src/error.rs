use thiserror::Error;

/// A single failed request to the model endpoint.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("endpoint returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The endpoint stayed unavailable through every backoff attempt.
///
/// Callers treat this as a failed extraction attempt, never as a fatal error.
#[derive(Debug, Error)]
#[error("model endpoint failed after {attempts} attempt(s): {source}")]
pub struct TransportError {
    pub attempts: u32,
    pub source: ClientError,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("worker task failed: {0}")]
    WorkerPanicked(#[from] tokio::task::JoinError),
    #[error("result channel closed after {received} of {expected} reports")]
    Incomplete { expected: usize, received: usize },
}
