//! Retry escalation for a single report.
//!
//! Attempt 0 queries the model unconstrained. Every later attempt attaches the
//! compiled schema. The loop stops at the first conformant reply or after
//! `max_attempts` attempts.

use euroscribe_core::{
    AttemptOutcome, AttemptRecord, ItemOutcome, ReplyMeta, ReportItem, Strategy, strip_reasoning,
    validate,
};
use tracing::{debug, warn};

use crate::client::ModelClient;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationState {
    Attempt(u32),
    Accepted { attempt: u32 },
    Exhausted,
}

impl EscalationState {
    pub const INITIAL: Self = Self::Attempt(0);

    /// Next state after the current attempt resolved. Terminal states are fixed points.
    pub fn transition(self, succeeded: bool, max_attempts: u32) -> Self {
        match self {
            Self::Attempt(n) if succeeded => Self::Accepted { attempt: n },
            Self::Attempt(n) if n + 1 < max_attempts.max(1) => Self::Attempt(n + 1),
            Self::Attempt(_) => Self::Exhausted,
            terminal => terminal,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Attempt(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Escalation {
    max_attempts: u32,
}

impl Default for Escalation {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl Escalation {
    /// `max_attempts` is clamped to at least 1.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// One query, sanitize, validate cycle. Never fails: transport errors
    /// become a failed attempt.
    pub async fn attempt(
        &self,
        client: &dyn ModelClient,
        item: &ReportItem,
        attempt: u32,
    ) -> AttemptRecord {
        let strategy = Strategy::for_attempt(attempt);
        match client.query(&item.text, strategy).await {
            Ok(reply) => {
                let clean_output = strip_reasoning(&reply.text);
                let outcome = AttemptOutcome::from(validate(&clean_output));
                AttemptRecord {
                    attempt,
                    strategy,
                    raw_output: reply.text,
                    clean_output,
                    meta: reply.meta,
                    outcome,
                }
            }
            Err(e) => {
                warn!(report = item.index, attempt, error = %e, "model endpoint unavailable");
                let raw_output = format!("<<HTTP failure: {e}>>");
                AttemptRecord {
                    attempt,
                    strategy,
                    clean_output: raw_output.clone(),
                    raw_output,
                    meta: ReplyMeta::default(),
                    outcome: AttemptOutcome::Transport {
                        error: e.to_string(),
                    },
                }
            }
        }
    }

    /// Drive one report to a terminal state.
    pub async fn run(&self, client: &dyn ModelClient, item: &ReportItem) -> ItemOutcome {
        let mut state = EscalationState::INITIAL;
        let mut attempts = Vec::new();

        while let EscalationState::Attempt(n) = state {
            let record = self.attempt(client, item, n).await;
            let succeeded = record.outcome.is_valid();
            if !succeeded {
                debug!(
                    report = item.index,
                    attempt = n,
                    strategy = record.strategy.as_str(),
                    outcome = outcome_label(&record.outcome),
                    "attempt rejected"
                );
            }
            attempts.push(record);
            state = state.transition(succeeded, self.max_attempts);
        }

        match state {
            EscalationState::Accepted { attempt } => {
                debug!(report = item.index, attempt, "accepted");
            }
            _ => {
                warn!(
                    report = item.index,
                    attempts = attempts.len(),
                    "no schema-valid output, attempts exhausted"
                );
            }
        }

        ItemOutcome {
            index: item.index,
            attempts,
        }
    }
}

fn outcome_label(outcome: &AttemptOutcome) -> &'static str {
    match outcome {
        AttemptOutcome::Transport { .. } => "transport",
        AttemptOutcome::Parse { .. } => "parse",
        AttemptOutcome::Schema { .. } => "schema",
        AttemptOutcome::Valid { .. } => "valid",
    }
}
