//! Bounded polling of batch results.

use arena_common::Config;
use std::collections::HashMap;
use std::time::Duration;

use crate::engine::{CaseResult, ExecutionGateway};
use crate::error::JudgeError;

/// How long to keep asking the judge before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.poll_interval(),
            max_attempts: config.poll_max_attempts.max(1),
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 60,
        }
    }
}

/// Arrange results in token order. `None` if any token has no result.
pub fn order_by_tokens(tokens: &[String], results: Vec<CaseResult>) -> Option<Vec<CaseResult>> {
    let mut by_token: HashMap<String, CaseResult> = results
        .into_iter()
        .map(|result| (result.token.clone(), result))
        .collect();
    tokens.iter().map(|token| by_token.remove(token)).collect()
}

/// Block until every token has a terminal result, or the policy runs out.
///
/// Fetch failures and malformed responses are retried like non-terminal
/// results. The returned list is in the order of `tokens`.
pub async fn wait_for_results(
    gateway: &dyn ExecutionGateway,
    tokens: &[String],
    policy: &PollPolicy,
) -> Result<Vec<CaseResult>, JudgeError> {
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let max_attempts = policy.max_attempts.max(1);
    for attempt in 1..=max_attempts {
        match gateway.fetch_batch(tokens).await {
            Ok(Some(results)) => match order_by_tokens(tokens, results) {
                Some(ordered) => {
                    let pending = ordered.iter().filter(|r| !r.status.is_terminal()).count();
                    if pending == 0 {
                        tracing::debug!(attempt, cases = ordered.len(), "All cases terminal");
                        return Ok(ordered);
                    }
                    tracing::debug!(attempt, pending, "Cases still queued or running");
                }
                None => {
                    tracing::warn!(attempt, "Judge response is missing some tokens");
                }
            },
            Ok(None) => {
                tracing::warn!(attempt, "Malformed batch response from judge");
            }
            Err(e) => {
                tracing::warn!(attempt, error = %e, "Failed to fetch batch results");
            }
        }

        if attempt < max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    tracing::error!(attempts = max_attempts, "Gave up waiting for judge results");
    Err(JudgeError::GatewayTimeout {
        attempts: max_attempts,
    })
}
