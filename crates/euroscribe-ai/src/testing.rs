//! Scripted model clients for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use euroscribe_core::{ReplyMeta, Strategy};

use crate::client::{ModelClient, ModelReply};
use crate::error::{ClientError, TransportError};

pub(crate) const VALID: &str = r#"{"case_number":1,"date_of_birth":"12.03.1948","date_of_surgery":"02.05.2019","sex":"male",
"chronic_lung_disease":false,"extracardiac_arteriopathy":true,"poor_mobility":false,
"previous_cardiac_surgery":false,"active_endocarditis":false,"critical_preoperative_state":false,
"dialysis":false,"diabetes_on_insulin":false,"ccs_angina_class_4":false,"recent_mi":false,
"thoracic_aorta_surgery":false,"creatinine":97.0,"weight":81.0,"lv_function":"moderate",
"pulmonary_hypertension":"No","nyha_class":"2","urgency":"elective",
"major_procedure_weight":"isolated CABG"}"#;

pub(crate) fn bad_sex() -> String {
    VALID.replace("\"male\"", "\"unknown\"")
}

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Text(String),
    Down,
}

impl Reply {
    pub(crate) fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }
}

/// Replies per report body, in order. The last reply repeats once the
/// script runs out.
#[derive(Default)]
pub(crate) struct ScriptedClient {
    scripts: HashMap<String, Vec<Reply>>,
    cursors: Mutex<HashMap<String, usize>>,
    calls: Mutex<Vec<(String, Strategy)>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn script(mut self, report: &str, replies: Vec<Reply>) -> Self {
        self.scripts.insert(report.to_string(), replies);
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> Vec<(String, Strategy)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn strategies_for(&self, report: &str) -> Vec<Strategy> {
        self.calls()
            .into_iter()
            .filter(|(r, _)| r == report)
            .map(|(_, s)| s)
            .collect()
    }

    /// Highest number of concurrent in-flight queries observed.
    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn next_reply(&self, report: &str) -> Reply {
        let Some(script) = self.scripts.get(report).filter(|s| !s.is_empty()) else {
            panic!("no script for report {report:?}");
        };
        let mut cursors = self.cursors.lock().unwrap();
        let cursor = cursors.entry(report.to_string()).or_insert(0);
        let reply = script[(*cursor).min(script.len() - 1)].clone();
        *cursor += 1;
        reply
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    async fn query(&self, report: &str, strategy: Strategy) -> Result<ModelReply, TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push((report.to_string(), strategy));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.next_reply(report) {
            Reply::Text(text) => Ok(ModelReply {
                text,
                meta: ReplyMeta {
                    prompt_tokens: Some(500),
                    completion_tokens: Some(100),
                    latency_s: Some(1.25),
                },
            }),
            Reply::Down => Err(TransportError {
                attempts: 4,
                source: ClientError::Server {
                    status: 503,
                    body: "unavailable".into(),
                },
            }),
        }
    }
}

/// Panics on every query.
pub(crate) struct PanickingClient;

#[async_trait]
impl ModelClient for PanickingClient {
    async fn query(&self, report: &str, _strategy: Strategy) -> Result<ModelReply, TransportError> {
        panic!("model client blew up on {report:?}");
    }
}
