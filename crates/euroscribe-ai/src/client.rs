//! Model client seam between the escalation controller and the endpoint.

use async_trait::async_trait;
use euroscribe_core::{ReplyMeta, Strategy};

use crate::error::TransportError;

/// Raw model text plus normalised metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelReply {
    pub text: String,
    pub meta: ReplyMeta,
}

/// Issues one logical extraction request for a report.
///
/// Implementations own transport retries; a returned [`TransportError`] means
/// backoff is already exhausted.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn query(&self, report: &str, strategy: Strategy) -> Result<ModelReply, TransportError>;
}
