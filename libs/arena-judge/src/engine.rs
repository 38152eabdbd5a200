/// Execution Gateway - Client for the hosted judge
///
/// **Core Responsibility:**
/// Turn an ordered list of test-case executions into one remote batch and
/// hand back one correlation token per execution, in the same order.
///
/// **Critical Architectural Boundary:**
/// - Gateway knows the Judge0 wire format (base64 payloads, batch endpoints)
/// - Gateway does NOT poll, score, or persist anything
/// - Poller and Evaluator only ever see decoded `CaseResult`s
///
/// Swapping Judge0 for another provider means another `ExecutionGateway`
/// impl; nothing above this module changes.

use arena_common::{Config, ExecutionStatus, Language};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::JudgeError;

/// One test-case execution to send in a batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem {
    pub language: Language,
    pub source_code: String,
    pub stdin: String,
    pub expected_output: String,
}

/// Decoded result of one execution
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseResult {
    pub token: String,
    #[serde(rename = "statusId")]
    pub status: ExecutionStatus,
    pub description: String,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    /// Seconds
    pub time: Option<f64>,
    /// Kilobytes
    pub memory: Option<u64>,
}

/// Remote execution service
///
/// Implementations must guarantee:
/// 1. `submit_batch` makes a single outbound call and returns either one
///    token per item, in item order, or an error (never a partial list)
/// 2. `fetch_batch` reports transport failures as `Err` and an unusable
///    response body as `Ok(None)`; both are retried by the poller
#[async_trait]
pub trait ExecutionGateway: Send + Sync {
    async fn submit_batch(&self, items: &[BatchItem]) -> Result<Vec<String>, JudgeError>;

    async fn fetch_batch(&self, tokens: &[String])
        -> Result<Option<Vec<CaseResult>>, JudgeError>;
}

#[derive(Debug, Serialize)]
struct BatchRequest {
    submissions: Vec<EncodedSubmission>,
}

#[derive(Debug, Serialize, PartialEq)]
struct EncodedSubmission {
    language_id: u32,
    source_code: String,
    stdin: String,
    expected_output: String,
}

#[derive(Debug, Deserialize)]
struct TokenEntry {
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    submissions: Option<Vec<Option<RawSubmission>>>,
}

#[derive(Debug, Deserialize)]
struct RawStatus {
    id: u32,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct RawSubmission {
    token: String,
    status: Option<RawStatus>,
    stdout: Option<String>,
    stderr: Option<String>,
    compile_output: Option<String>,
    time: Option<serde_json::Value>,
    memory: Option<u64>,
}

fn encode_batch(items: &[BatchItem]) -> BatchRequest {
    BatchRequest {
        submissions: items
            .iter()
            .map(|item| EncodedSubmission {
                language_id: item.language.judge0_id(),
                source_code: STANDARD.encode(&item.source_code),
                stdin: STANDARD.encode(&item.stdin),
                expected_output: STANDARD.encode(&item.expected_output),
            })
            .collect(),
    }
}

/// All tokens or none: a short list or an entry without a token fails the batch.
fn collect_tokens(entries: Vec<TokenEntry>, expected: usize) -> Result<Vec<String>, JudgeError> {
    if entries.len() != expected {
        return Err(JudgeError::GatewayUnavailable(format!(
            "expected {} tokens, received {}",
            expected,
            entries.len()
        )));
    }
    entries
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| {
            entry.token.filter(|t| !t.is_empty()).ok_or_else(|| {
                JudgeError::GatewayUnavailable(format!("batch entry {} was rejected", idx))
            })
        })
        .collect()
}

/// Judge0 may wrap base64 output across lines.
fn decode_field(field: Option<String>) -> Option<String> {
    let raw = field?;
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    match STANDARD.decode(compact.as_bytes()) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(_) => Some(raw),
    }
}

fn parse_time(value: Option<serde_json::Value>) -> Option<f64> {
    match value? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn decode_submission(raw: RawSubmission) -> CaseResult {
    let (status, description) = match raw.status {
        Some(status) => (ExecutionStatus::from_id(status.id), status.description),
        None => (ExecutionStatus::Queued, String::new()),
    };
    CaseResult {
        token: raw.token,
        status,
        description,
        stdout: decode_field(raw.stdout),
        stderr: decode_field(raw.stderr),
        compile_output: decode_field(raw.compile_output),
        time: parse_time(raw.time),
        memory: raw.memory,
    }
}

/// `None` when the body carries no list or contains a null entry.
fn decode_batch(response: BatchResponse) -> Option<Vec<CaseResult>> {
    response
        .submissions?
        .into_iter()
        .map(|entry| entry.map(decode_submission))
        .collect()
}

/// Judge0 over HTTP, optionally through RapidAPI
pub struct Judge0Gateway {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    host: String,
}

impl Judge0Gateway {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        host: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, JudgeError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
            host: host.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, JudgeError> {
        Self::new(
            config.judge0_url.clone(),
            config.judge0_api_key.clone(),
            config.judge0_host.clone(),
            config.judge0_timeout(),
        )
    }

    fn batch_url(&self) -> String {
        format!("{}/submissions/batch", self.base_url)
    }

    fn with_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request
                .header("x-rapidapi-key", key)
                .header("x-rapidapi-host", &self.host),
            None => request,
        }
    }
}

#[async_trait]
impl ExecutionGateway for Judge0Gateway {
    async fn submit_batch(&self, items: &[BatchItem]) -> Result<Vec<String>, JudgeError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let request = self
            .client
            .post(self.batch_url())
            .query(&[("base64_encoded", "true")])
            .json(&encode_batch(items));

        let response = self
            .with_auth(request)
            .send()
            .await?
            .error_for_status()?;
        let entries: Vec<TokenEntry> = response.json().await?;

        let tokens = collect_tokens(entries, items.len())?;
        tracing::debug!(count = tokens.len(), "Batch accepted by judge");
        Ok(tokens)
    }

    async fn fetch_batch(
        &self,
        tokens: &[String],
    ) -> Result<Option<Vec<CaseResult>>, JudgeError> {
        let request = self.client.get(self.batch_url()).query(&[
            ("tokens", tokens.join(",").as_str()),
            ("base64_encoded", "true"),
            ("fields", "*"),
        ]);

        let response = self
            .with_auth(request)
            .send()
            .await?
            .error_for_status()?;

        match response.json::<BatchResponse>().await {
            Ok(body) => Ok(decode_batch(body)),
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable batch response from judge");
                Ok(None)
            }
        }
    }
}
