//! Scripted gateway for tests: no network, deterministic statuses.

use arena_common::{ExecutionStatus, Language};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use crate::engine::{BatchItem, CaseResult, ExecutionGateway};
use crate::error::JudgeError;

pub fn case(token: &str, status_id: u32) -> CaseResult {
    let status = ExecutionStatus::from_id(status_id);
    let description = match status {
        ExecutionStatus::Queued => "In Queue",
        ExecutionStatus::Running => "Processing",
        ExecutionStatus::Accepted => "Accepted",
        ExecutionStatus::RuntimeError => "Runtime Error",
        ExecutionStatus::CompileError => "Compilation Error",
        ExecutionStatus::Other(_) => "Wrong Answer",
    };
    CaseResult {
        token: token.to_string(),
        status,
        description: description.to_string(),
        stdout: Some("out".to_string()),
        stderr: (status == ExecutionStatus::RuntimeError).then(|| "boom".to_string()),
        compile_output: (status == ExecutionStatus::CompileError)
            .then(|| "expected ';'".to_string()),
        time: Some(0.1),
        memory: Some(1024),
    }
}

#[derive(Default)]
pub struct ScriptedGateway {
    submits: AtomicU32,
    fetches: AtomicU32,
    failing_submit: bool,
    failing_fetches: u32,
    malformed_fetches: u32,
    pending_polls: u32,
    reversed: bool,
    next_statuses: Mutex<Vec<u32>>,
    language_status: HashMap<Language, u32>,
    statuses: Mutex<HashMap<String, u32>>,
    batches: Mutex<Vec<Vec<BatchItem>>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// First `n` fetches answer with every case still running
    pub fn with_pending_polls(mut self, n: u32) -> Self {
        self.pending_polls = n;
        self
    }

    pub fn with_failing_fetches(mut self, n: u32) -> Self {
        self.failing_fetches = n;
        self
    }

    pub fn with_malformed_fetches(mut self, n: u32) -> Self {
        self.malformed_fetches = n;
        self
    }

    pub fn with_failing_submit(mut self) -> Self {
        self.failing_submit = true;
        self
    }

    /// Every item in this language gets `status_id`
    pub fn with_language_status(mut self, language: Language, status_id: u32) -> Self {
        self.language_status.insert(language, status_id);
        self
    }

    /// Answer fetches in reverse token order
    pub fn reversed(mut self) -> Self {
        self.reversed = true;
        self
    }

    /// Statuses, by position, for the items of the next batch (default: accepted)
    pub fn script(&self, status_ids: &[u32]) {
        *self.next_statuses.lock().unwrap() = status_ids.to_vec();
    }

    /// Register tokens directly, bypassing `submit_batch`
    pub fn register(&self, status_ids: &[u32]) -> Vec<String> {
        let mut statuses = self.statuses.lock().unwrap();
        let base = statuses.len();
        status_ids
            .iter()
            .enumerate()
            .map(|(idx, id)| {
                let token = format!("tok-{}", base + idx);
                statuses.insert(token.clone(), *id);
                token
            })
            .collect()
    }

    pub fn submits(&self) -> u32 {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn batches(&self) -> Vec<Vec<BatchItem>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutionGateway for ScriptedGateway {
    async fn submit_batch(&self, items: &[BatchItem]) -> Result<Vec<String>, JudgeError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        self.batches.lock().unwrap().push(items.to_vec());
        if self.failing_submit {
            return Err(JudgeError::GatewayUnavailable("connection refused".into()));
        }

        let script = std::mem::take(&mut *self.next_statuses.lock().unwrap());
        let ids: Vec<u32> = items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                self.language_status
                    .get(&item.language)
                    .copied()
                    .or_else(|| script.get(idx).copied())
                    .unwrap_or(3)
            })
            .collect();
        Ok(self.register(&ids))
    }

    async fn fetch_batch(
        &self,
        tokens: &[String],
    ) -> Result<Option<Vec<CaseResult>>, JudgeError> {
        let n = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.failing_fetches {
            return Err(JudgeError::GatewayUnavailable("timed out".into()));
        }
        if n <= self.failing_fetches + self.malformed_fetches {
            return Ok(None);
        }
        let still_running = n <= self.failing_fetches + self.malformed_fetches + self.pending_polls;

        let statuses = self.statuses.lock().unwrap();
        let mut results: Vec<CaseResult> = tokens
            .iter()
            .map(|token| {
                let id = if still_running {
                    2
                } else {
                    statuses.get(token).copied().unwrap_or(3)
                };
                case(token, id)
            })
            .collect();
        if self.reversed {
            results.reverse();
        }
        Ok(Some(results))
    }
}
