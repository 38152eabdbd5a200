/// Verdict Evaluator - reduces per-case results to one outcome
///
/// **Reduction Rules:**
/// - `Accepted` iff every case is accepted
/// - otherwise `Error` if any case hit a runtime or compile error
/// - otherwise `Wrong`
/// - runtime = sum of time over accepted cases
/// - memory = max of memory over accepted cases
///
/// Pure function: knows nothing about HTTP, Judge0 or storage.

use arena_common::{ExecutionStatus, SubmissionOutcome, SubmissionStatus};
use serde::Serialize;

use crate::engine::CaseResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub status: SubmissionStatus,
    pub passed_test_cases: u32,
    pub total_test_cases: u32,
    pub runtime: f64,
    pub memory: u64,
    pub error_message: Option<String>,
}

impl Verdict {
    pub fn accepted(&self) -> bool {
        self.status == SubmissionStatus::Accepted
    }

    pub fn to_outcome(&self) -> SubmissionOutcome {
        SubmissionOutcome {
            status: self.status,
            test_cases_passed: self.passed_test_cases,
            runtime: self.runtime,
            memory: self.memory,
            error_message: self.error_message.clone(),
        }
    }
}

fn failure_message(result: &CaseResult) -> String {
    [&result.stderr, &result.compile_output]
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
        .cloned()
        .or_else(|| Some(result.description.clone()).filter(|d| !d.is_empty()))
        .unwrap_or_else(|| "Unknown error".to_string())
}

pub fn evaluate(results: &[CaseResult]) -> Verdict {
    let total = results.len() as u32;
    if results.is_empty() {
        return Verdict {
            status: SubmissionStatus::Error,
            passed_test_cases: 0,
            total_test_cases: 0,
            runtime: 0.0,
            memory: 0,
            error_message: Some("No test results returned".to_string()),
        };
    }

    let mut passed = 0u32;
    let mut runtime = 0.0f64;
    let mut memory = 0u64;
    let mut any_error = false;
    let mut error_message = None;

    for result in results {
        if result.status == ExecutionStatus::Accepted {
            passed += 1;
            runtime += result.time.unwrap_or(0.0);
            memory = memory.max(result.memory.unwrap_or(0));
            continue;
        }

        any_error |= result.status.is_error();
        if error_message.is_none() {
            error_message = Some(failure_message(result));
        }
    }

    let status = if passed == total {
        SubmissionStatus::Accepted
    } else if any_error {
        SubmissionStatus::Error
    } else {
        SubmissionStatus::Wrong
    };

    Verdict {
        status,
        passed_test_cases: passed,
        total_test_cases: total,
        runtime,
        memory,
        error_message,
    }
}
