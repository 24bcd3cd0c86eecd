//! Model-facing half of the pipeline: the Ollama client with transport backoff,
//! per-report retry escalation, and the bounded dispatcher.

pub mod backoff;
pub mod client;
pub mod dispatch;
pub mod error;
pub mod escalation;
pub mod ollama;

#[cfg(test)]
pub(crate) mod testing;

pub use backoff::Backoff;
pub use client::{ModelClient, ModelReply};
pub use dispatch::{DispatchStats, Dispatcher};
pub use error::{ClientError, DispatchError, TransportError};
pub use escalation::{Escalation, EscalationState};
pub use ollama::{FormatMode, OllamaClient, OllamaConfig};
