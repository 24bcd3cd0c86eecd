//! HTTP client for a locally hosted Ollama `/api/generate` endpoint.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use euroscribe_core::{EUROSCORE2, PromptTemplate, ReplyMeta, Strategy};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::backoff::Backoff;
use crate::client::{ModelClient, ModelReply};
use crate::error::{ClientError, TransportError};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_NUM_CTX: u32 = 8000;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Non-creative decoding for every request.
pub const TEMPERATURE: f32 = 0.0;

/// How the schema constraint is attached to a constrained request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FormatMode {
    /// `"format": "json"` plus the descriptor under `"schema"`.
    #[default]
    JsonFlag,
    /// The descriptor itself as `"format"`.
    Schema,
}

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub num_ctx: u32,
    pub timeout: Duration,
    pub backoff: Backoff,
    pub format_mode: FormatMode,
}

impl OllamaConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            num_ctx: DEFAULT_NUM_CTX,
            timeout: DEFAULT_TIMEOUT,
            backoff: Backoff::default(),
            format_mode: FormatMode::default(),
        }
    }
}

/// Ollama generate client bound to one model and one prompt template.
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    num_ctx: u32,
    backoff: Backoff,
    format_mode: FormatMode,
    prompt: PromptTemplate,
    schema: Value,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: String,
    options: GenerateOptions,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema: Option<&'a Value>,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_ctx: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    total_duration: Option<Value>,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

impl OllamaClient {
    /// Create a client for the given endpoint.
    ///
    /// `base_url` should be like `http://localhost:11434` (no trailing slash).
    /// Proxy environment variables are ignored: the endpoint is local.
    pub fn new(config: OllamaConfig, prompt: PromptTemplate) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .no_proxy()
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model,
            num_ctx: config.num_ctx,
            backoff: config.backoff,
            format_mode: config.format_mode,
            prompt,
            schema: EUROSCORE2.to_json_schema(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, report: &str, strategy: Strategy) -> GenerateRequest<'_> {
        let (format, schema) = match (strategy, self.format_mode) {
            (Strategy::Unconstrained, _) => (None, None),
            (Strategy::Constrained, FormatMode::JsonFlag) => {
                (Some(Value::from("json")), Some(&self.schema))
            }
            (Strategy::Constrained, FormatMode::Schema) => (Some(self.schema.clone()), None),
        };

        GenerateRequest {
            model: &self.model,
            system: self.prompt.system(),
            prompt: self.prompt.render(report),
            options: GenerateOptions {
                temperature: TEMPERATURE,
                num_ctx: self.num_ctx,
            },
            stream: false,
            format,
            schema,
        }
    }

    async fn post_once(&self, body: &GenerateRequest<'_>) -> Result<ModelReply, ClientError> {
        let url = format!("{}/api/generate", self.base_url);
        let started = Instant::now();

        let resp = self.client.post(&url).json(body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let text = resp.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&text)?;
        let latency_s = normalize_duration(parsed.total_duration.as_ref(), started.elapsed());

        Ok(ModelReply {
            text: parsed.response,
            meta: ReplyMeta {
                prompt_tokens: parsed.prompt_eval_count,
                completion_tokens: parsed.eval_count,
                latency_s: Some(latency_s),
            },
        })
    }
}

#[async_trait]
impl ModelClient for OllamaClient {
    async fn query(&self, report: &str, strategy: Strategy) -> Result<ModelReply, TransportError> {
        let body = self.request_body(report, strategy);
        debug!(model = %self.model, strategy = strategy.as_str(), "posting generate request");
        self.backoff.retry(|_| self.post_once(&body)).await
    }
}

/// Seconds. Integer durations are nanoseconds; floats are already seconds;
/// absent or null falls back to measured wall-clock time.
fn normalize_duration(reported: Option<&Value>, elapsed: Duration) -> f64 {
    match reported {
        Some(Value::Number(n)) => {
            if let Some(ns) = n.as_u64() {
                ns as f64 / 1_000_000_000.0
            } else if let Some(ns) = n.as_i64() {
                ns as f64 / 1_000_000_000.0
            } else {
                n.as_f64().unwrap_or_else(|| elapsed.as_secs_f64())
            }
        }
        _ => elapsed.as_secs_f64(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::post;
    use serde_json::json;

    #[derive(Default)]
    struct Endpoint {
        failures: usize,
        calls: AtomicUsize,
        bodies: Mutex<Vec<Value>>,
    }

    async fn generate(State(ep): State<Arc<Endpoint>>, axum::Json(body): axum::Json<Value>) -> Response {
        let n = ep.calls.fetch_add(1, Ordering::SeqCst);
        ep.bodies.lock().unwrap().push(body);
        if n < ep.failures {
            return (StatusCode::SERVICE_UNAVAILABLE, "model is loading").into_response();
        }
        axum::Json(json!({
            "model": "test",
            "response": "<think>hm</think>{\"ok\": true}",
            "done": true,
            "total_duration": 2_500_000_000u64,
            "prompt_eval_count": 812,
            "eval_count": 64
        }))
        .into_response()
    }

    async fn spawn_endpoint(ep: Arc<Endpoint>) -> String {
        let app = Router::new()
            .route("/api/generate", post(generate))
            .with_state(ep);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn config(base_url: &str) -> OllamaConfig {
        let mut config = OllamaConfig::new(base_url, "medllm:8b");
        config.backoff = Backoff {
            max_attempts: 4,
            initial: Duration::from_millis(1),
            max: Duration::from_millis(4),
        };
        config.timeout = Duration::from_secs(5);
        config
    }

    fn prompt() -> PromptTemplate {
        PromptTemplate::new("You extract EuroSCORE II fields.", "Report:\n{REPORT}").unwrap()
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = OllamaClient::new(config("http://localhost:11434/"), prompt()).unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.model(), "medllm:8b");
    }

    #[test]
    fn unconstrained_body_has_no_format_hint() {
        let client = OllamaClient::new(config(DEFAULT_BASE_URL), prompt()).unwrap();
        let body = serde_json::to_value(client.request_body("71y male", Strategy::Unconstrained)).unwrap();
        assert_eq!(body["model"], "medllm:8b");
        assert_eq!(body["system"], "You extract EuroSCORE II fields.");
        assert_eq!(body["prompt"], "Report:\n71y male");
        assert_eq!(body["options"]["temperature"], 0.0);
        assert_eq!(body["options"]["num_ctx"], 8000);
        assert_eq!(body["stream"], false);
        assert!(body.get("format").is_none());
        assert!(body.get("schema").is_none());
    }

    #[test]
    fn constrained_body_carries_compiled_schema() {
        let client = OllamaClient::new(config(DEFAULT_BASE_URL), prompt()).unwrap();
        let body = serde_json::to_value(client.request_body("x", Strategy::Constrained)).unwrap();
        assert_eq!(body["format"], "json");
        assert_eq!(body["schema"], EUROSCORE2.to_json_schema());
    }

    #[test]
    fn schema_format_mode_puts_descriptor_in_format() {
        let mut cfg = config(DEFAULT_BASE_URL);
        cfg.format_mode = FormatMode::Schema;
        let client = OllamaClient::new(cfg, prompt()).unwrap();
        let body = serde_json::to_value(client.request_body("x", Strategy::Constrained)).unwrap();
        assert_eq!(body["format"], EUROSCORE2.to_json_schema());
        assert!(body.get("schema").is_none());
    }

    #[test]
    fn duration_normalisation() {
        let elapsed = Duration::from_millis(1500);
        assert_eq!(normalize_duration(Some(&json!(3_000_000_000u64)), elapsed), 3.0);
        assert_eq!(normalize_duration(Some(&json!(0.75)), elapsed), 0.75);
        assert_eq!(normalize_duration(None, elapsed), 1.5);
        assert_eq!(normalize_duration(Some(&Value::Null), elapsed), 1.5);
    }

    #[tokio::test]
    async fn query_returns_text_and_metadata() {
        let ep = Arc::new(Endpoint::default());
        let url = spawn_endpoint(ep.clone()).await;
        let client = OllamaClient::new(config(&url), prompt()).unwrap();

        let reply = client.query("71y male", Strategy::Constrained).await.unwrap();
        assert_eq!(reply.text, "<think>hm</think>{\"ok\": true}");
        assert_eq!(reply.meta.prompt_tokens, Some(812));
        assert_eq!(reply.meta.completion_tokens, Some(64));
        assert_eq!(reply.meta.latency_s, Some(2.5));

        let bodies = ep.bodies.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["format"], "json");
    }

    #[tokio::test]
    async fn query_retries_server_errors() {
        let ep = Arc::new(Endpoint {
            failures: 2,
            ..Default::default()
        });
        let url = spawn_endpoint(ep.clone()).await;
        let client = OllamaClient::new(config(&url), prompt()).unwrap();

        let reply = client.query("x", Strategy::Unconstrained).await.unwrap();
        assert!(reply.text.contains("ok"));
        assert_eq!(ep.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn query_gives_up_after_backoff() {
        let ep = Arc::new(Endpoint {
            failures: usize::MAX,
            ..Default::default()
        });
        let url = spawn_endpoint(ep.clone()).await;
        let client = OllamaClient::new(config(&url), prompt()).unwrap();

        let err = client.query("x", Strategy::Unconstrained).await.unwrap_err();
        assert_eq!(err.attempts, 4);
        assert!(matches!(err.source, ClientError::Server { status: 503, .. }));
        assert_eq!(ep.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = OllamaClient::new(config(&format!("http://{addr}")), prompt()).unwrap();
        let err = client.query("x", Strategy::Unconstrained).await.unwrap_err();
        assert_eq!(err.attempts, 4);
        assert!(matches!(err.source, ClientError::Http(_)));
    }
}
