/// Submission Orchestrator - High-Level Flow
///
/// **Responsibility:**
/// Resolve a problem's test cases, send them through the gateway, wait for
/// the poller, reduce with the evaluator, and record the outcome.
///
/// **Flow:**
/// 1. Validate input and load the problem (no writes, no network)
/// 2. Submit only: write a `pending` submission
/// 3. Dispatch one batch, poll until every case is terminal
/// 4. Submit only: finalize the submission, record the solve on acceptance
///
/// Every failure after step 2 still finalizes the submission as `error`.

use arena_common::{
    ExecutionStatus, Language, Problem, Store, Submission, SubmissionOutcome, SubmissionStatus,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::engine::{BatchItem, CaseResult, ExecutionGateway};
use crate::error::JudgeError;
use crate::evaluator;
use crate::poller::{self, PollPolicy};

/// Result of running code against the visible cases. Nothing is stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub language: Language,
    pub success: bool,
    pub test_cases: Vec<CaseResult>,
    pub passed_test_cases: u32,
    pub total_test_cases: u32,
    pub runtime: f64,
    pub memory: u64,
    pub error_message: Option<String>,
}

/// Graded result of a submission against the hidden cases.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReport {
    pub submission_id: Uuid,
    pub language: Language,
    pub accepted: bool,
    pub status: SubmissionStatus,
    pub total_test_cases: u32,
    pub passed_test_cases: u32,
    pub runtime: f64,
    pub memory: u64,
    pub error_message: Option<String>,
}

/// One (stdin, expected output) pair to execute
struct CaseInput {
    stdin: String,
    expected_output: String,
}

pub struct Orchestrator {
    gateway: Arc<dyn ExecutionGateway>,
    store: Arc<dyn Store>,
    policy: PollPolicy,
}

impl Orchestrator {
    pub fn new(
        gateway: Arc<dyn ExecutionGateway>,
        store: Arc<dyn Store>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            gateway,
            store,
            policy,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Run `code` against the problem's visible test cases.
    pub async fn run(
        &self,
        problem_id: Uuid,
        code: &str,
        language: &str,
    ) -> Result<RunReport, JudgeError> {
        require_code(code)?;
        let problem = self.load_problem(problem_id).await?;
        if problem.visible_test_cases.is_empty() {
            return Err(JudgeError::Validation(
                "No visible test cases found for this problem".to_string(),
            ));
        }
        let language = parse_language(language)?;

        let cases = problem
            .visible_test_cases
            .iter()
            .map(|tc| CaseInput {
                stdin: tc.stdin(),
                expected_output: tc.output.clone(),
            })
            .collect::<Vec<_>>();

        tracing::info!(
            problem_id = %problem_id,
            language = %language,
            cases = cases.len(),
            "Running visible test cases"
        );

        let results = self.judge(language, code, &cases).await?;
        let verdict = evaluator::evaluate(&results);

        Ok(RunReport {
            language,
            success: verdict.accepted(),
            passed_test_cases: verdict.passed_test_cases,
            total_test_cases: verdict.total_test_cases,
            runtime: verdict.runtime,
            memory: verdict.memory,
            error_message: verdict.error_message,
            test_cases: results,
        })
    }

    /// Grade `code` against the hidden test cases and record the outcome.
    pub async fn submit(
        &self,
        user_id: Uuid,
        problem_id: Uuid,
        code: &str,
        language: &str,
    ) -> Result<SubmitReport, JudgeError> {
        require_code(code)?;
        let problem = self.load_problem(problem_id).await?;
        if problem.hidden_test_cases.is_empty() {
            return Err(JudgeError::Validation(
                "No hidden test cases found for this problem".to_string(),
            ));
        }
        let language = parse_language(language)?;

        let cases = problem
            .hidden_test_cases
            .iter()
            .map(|tc| CaseInput {
                stdin: tc.input.clone(),
                expected_output: tc.output.clone(),
            })
            .collect::<Vec<_>>();

        let pending = Submission::pending(
            user_id,
            problem_id,
            code.to_string(),
            language,
            cases.len() as u32,
        );
        self.store.create_submission(&pending).await?;

        tracing::info!(
            submission_id = %pending.id,
            user_id = %user_id,
            problem_id = %problem_id,
            language = %language,
            cases = cases.len(),
            "Submission pending"
        );

        let verdict = match self.judge(language, code, &cases).await {
            Ok(results) => evaluator::evaluate(&results),
            Err(e) => {
                tracing::error!(
                    submission_id = %pending.id,
                    error = %e,
                    "Judging failed; marking submission as error"
                );
                if let Err(store_err) = self
                    .store
                    .finalize_submission(pending.id, &SubmissionOutcome::failed(e.to_string()))
                    .await
                {
                    tracing::error!(
                        submission_id = %pending.id,
                        error = %store_err,
                        "Failed to record judging failure; submission left pending"
                    );
                }
                return Err(e);
            }
        };

        let stored = self
            .store
            .finalize_submission(pending.id, &verdict.to_outcome())
            .await?;

        if verdict.accepted() {
            let newly_solved = self.store.add_solved_problem(user_id, problem_id).await?;
            tracing::info!(
                user_id = %user_id,
                problem_id = %problem_id,
                newly_solved,
                "Problem accepted"
            );
        }

        tracing::info!(
            submission_id = %stored.id,
            status = %stored.status,
            passed = stored.test_cases_passed,
            total = stored.test_cases_total,
            "Submission judged"
        );

        Ok(report_for(&stored))
    }

    /// Check that every reference solution passes every visible test case.
    ///
    /// Problems are only written once this holds, so "run" never has to
    /// second-guess a stored problem.
    pub async fn verify_reference_solutions(&self, problem: &Problem) -> Result<(), JudgeError> {
        problem
            .validate()
            .map_err(|e| JudgeError::Validation(e.to_string()))?;

        let cases = problem
            .visible_test_cases
            .iter()
            .map(|tc| CaseInput {
                stdin: tc.stdin(),
                expected_output: tc.output.clone(),
            })
            .collect::<Vec<_>>();

        for reference in &problem.reference_solution {
            let results = self
                .judge(reference.language, &reference.complete_code, &cases)
                .await?;

            if let Some((idx, failed)) = results
                .iter()
                .enumerate()
                .find(|(_, r)| r.status != ExecutionStatus::Accepted)
            {
                tracing::warn!(
                    language = %reference.language,
                    case = idx + 1,
                    status = failed.status.id(),
                    "Reference solution failed"
                );
                return Err(JudgeError::Validation(format!(
                    "reference solution for {} failed visible case {}: {}",
                    reference.language,
                    idx + 1,
                    failed.description
                )));
            }
            tracing::debug!(language = %reference.language, "Reference solution verified");
        }
        Ok(())
    }

    async fn load_problem(&self, problem_id: Uuid) -> Result<Problem, JudgeError> {
        self.store
            .get_problem(problem_id)
            .await?
            .ok_or_else(|| JudgeError::NotFound(format!("problem {}", problem_id)))
    }

    /// Dispatch one batch and wait for every case to finish.
    async fn judge(
        &self,
        language: Language,
        code: &str,
        cases: &[CaseInput],
    ) -> Result<Vec<CaseResult>, JudgeError> {
        let items: Vec<BatchItem> = cases
            .iter()
            .map(|case| BatchItem {
                language,
                source_code: code.to_string(),
                stdin: case.stdin.clone(),
                expected_output: case.expected_output.clone(),
            })
            .collect();

        let tokens = self.gateway.submit_batch(&items).await?;
        poller::wait_for_results(self.gateway.as_ref(), &tokens, &self.policy).await
    }
}

fn require_code(code: &str) -> Result<(), JudgeError> {
    if code.trim().is_empty() {
        return Err(JudgeError::Validation("Some fields are missing".to_string()));
    }
    Ok(())
}

fn parse_language(language: &str) -> Result<Language, JudgeError> {
    if language.trim().is_empty() {
        return Err(JudgeError::Validation("Some fields are missing".to_string()));
    }
    Language::from_str(language)
        .ok_or_else(|| JudgeError::UnsupportedLanguage(language.to_string()))
}

fn report_for(stored: &Submission) -> SubmitReport {
    SubmitReport {
        submission_id: stored.id,
        language: stored.language,
        accepted: stored.status == SubmissionStatus::Accepted,
        status: stored.status,
        total_test_cases: stored.test_cases_total,
        passed_test_cases: stored.test_cases_passed,
        runtime: stored.runtime,
        memory: stored.memory,
        error_message: stored.error_message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedGateway;
    use arena_common::types::{
        Difficulty, HiddenTestCase, ReferenceSolution, StarterCode, Tag, VisibleTestCase,
    };
    use arena_common::{MemoryStore, User};
    use std::time::Duration;

    fn problem(visible: usize, hidden: usize) -> Problem {
        Problem {
            id: Uuid::new_v4(),
            title: "Reverse String".to_string(),
            description: "Reverse the input".to_string(),
            difficulty: Difficulty::Easy,
            tag: Tag::Array,
            visible_test_cases: (0..visible)
                .map(|i| VisibleTestCase {
                    input: format!("v{}", i),
                    output: format!("{}v", i),
                    explanation: None,
                    image: None,
                    target: (i == 0).then(|| "t".to_string()),
                })
                .collect(),
            hidden_test_cases: (0..hidden)
                .map(|i| HiddenTestCase {
                    input: format!("h{}", i),
                    output: format!("{}h", i),
                })
                .collect(),
            start_code: Language::all_variants()
                .iter()
                .map(|l| StarterCode {
                    language: *l,
                    initial_code: String::new(),
                })
                .collect(),
            reference_solution: Language::all_variants()
                .iter()
                .map(|l| ReferenceSolution {
                    language: *l,
                    complete_code: format!("{} reference", l),
                })
                .collect(),
            problem_creator: Uuid::new_v4(),
        }
    }

    struct Harness {
        gateway: Arc<ScriptedGateway>,
        store: Arc<MemoryStore>,
        orchestrator: Orchestrator,
        user: User,
        problem: Problem,
    }

    /// Problems are seeded without write-time validation so tests can model
    /// legacy documents with empty test-case lists.
    async fn harness(gateway: ScriptedGateway, problem: Problem) -> Harness {
        let gateway = Arc::new(gateway);
        let store = Arc::new(MemoryStore::new());
        let user = User::new("Meera", "meera@example.com");
        store.put_user(&user).await.unwrap();
        store.seed_problem(problem.clone()).await;

        let orchestrator = Orchestrator::new(
            gateway.clone(),
            store.clone(),
            PollPolicy {
                interval: Duration::from_millis(1),
                max_attempts: 5,
            },
        );
        Harness {
            gateway,
            store,
            orchestrator,
            user,
            problem,
        }
    }

    #[tokio::test]
    async fn test_submit_accepted_records_solve() {
        let h = harness(ScriptedGateway::new().with_pending_polls(1), problem(2, 3)).await;

        let report = h
            .orchestrator
            .submit(h.user.id, h.problem.id, "print(reverse)", "cpp")
            .await
            .unwrap();

        assert!(report.accepted);
        assert_eq!(report.language, Language::Cpp);
        assert_eq!(report.status, SubmissionStatus::Accepted);
        assert_eq!(report.total_test_cases, 3);
        assert_eq!(report.passed_test_cases, 3);
        assert_eq!(report.memory, 1024);

        let stored = h.store.get_submission(report.submission_id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubmissionStatus::Accepted);
        assert_eq!(stored.language, Language::Cpp);

        let user = h.store.get_user(h.user.id).await.unwrap().unwrap();
        assert!(user.problem_solved.contains(&h.problem.id));
    }

    #[tokio::test]
    async fn test_submit_dispatches_hidden_cases_in_order() {
        let h = harness(ScriptedGateway::new(), problem(1, 3)).await;

        h.orchestrator
            .submit(h.user.id, h.problem.id, "code", "java")
            .await
            .unwrap();

        let batches = h.gateway.batches();
        assert_eq!(batches.len(), 1);
        let stdins: Vec<&str> = batches[0].iter().map(|i| i.stdin.as_str()).collect();
        assert_eq!(stdins, vec!["h0", "h1", "h2"]);
        assert!(batches[0].iter().all(|i| i.language == Language::Java));
        assert_eq!(batches[0][2].expected_output, "2h");
    }

    #[tokio::test]
    async fn test_resubmitting_accepted_solution_solves_once() {
        let h = harness(ScriptedGateway::new(), problem(1, 2)).await;

        let first = h
            .orchestrator
            .submit(h.user.id, h.problem.id, "code", "javascript")
            .await
            .unwrap();
        let second = h
            .orchestrator
            .submit(h.user.id, h.problem.id, "code", "javascript")
            .await
            .unwrap();

        assert_ne!(first.submission_id, second.submission_id);
        assert_eq!(h.store.submission_count().await, 2);

        let user = h.store.get_user(h.user.id).await.unwrap().unwrap();
        assert_eq!(user.problem_solved.len(), 1);

        let history = h
            .store
            .submissions_for(h.user.id, h.problem.id)
            .await
            .unwrap();
        assert_eq!(history[0].id, second.submission_id);
    }

    #[tokio::test]
    async fn test_submit_runtime_error_verdict() {
        let h = harness(ScriptedGateway::new(), problem(1, 3)).await;
        h.gateway.script(&[3, 3, 4]);

        let report = h
            .orchestrator
            .submit(h.user.id, h.problem.id, "code", "c++")
            .await
            .unwrap();

        assert!(!report.accepted);
        assert_eq!(report.status, SubmissionStatus::Error);
        assert_eq!(report.passed_test_cases, 2);
        assert_eq!(report.error_message.as_deref(), Some("boom"));

        let user = h.store.get_user(h.user.id).await.unwrap().unwrap();
        assert!(user.problem_solved.is_empty());
    }

    #[tokio::test]
    async fn test_submit_wrong_answer_verdict() {
        let h = harness(ScriptedGateway::new(), problem(1, 2)).await;
        h.gateway.script(&[5, 3]);

        let report = h
            .orchestrator
            .submit(h.user.id, h.problem.id, "code", "java")
            .await
            .unwrap();

        assert_eq!(report.status, SubmissionStatus::Wrong);
        assert_eq!(report.passed_test_cases, 1);
        assert!(report.passed_test_cases <= report.total_test_cases);
    }

    #[tokio::test]
    async fn test_unsupported_language_never_dispatches() {
        let h = harness(ScriptedGateway::new(), problem(2, 2)).await;

        let err = h
            .orchestrator
            .submit(h.user.id, h.problem.id, "print(1)", "python")
            .await
            .unwrap_err();

        assert!(matches!(err, JudgeError::UnsupportedLanguage(ref l) if l == "python"));
        assert_eq!(h.gateway.submits(), 0);
        assert_eq!(h.store.submission_count().await, 0);

        let run_err = h
            .orchestrator
            .run(h.problem.id, "print(1)", "python")
            .await
            .unwrap_err();
        assert!(matches!(run_err, JudgeError::UnsupportedLanguage(_)));
        assert_eq!(h.gateway.submits(), 0);
    }

    #[tokio::test]
    async fn test_missing_fields_are_validation_errors() {
        let h = harness(ScriptedGateway::new(), problem(1, 1)).await;

        let err = h
            .orchestrator
            .submit(h.user.id, h.problem.id, "  ", "java")
            .await
            .unwrap_err();
        assert!(matches!(err, JudgeError::Validation(_)));

        let err = h.orchestrator.run(h.problem.id, "code", "").await.unwrap_err();
        assert!(matches!(err, JudgeError::Validation(_)));
        assert_eq!(h.gateway.submits(), 0);
    }

    #[tokio::test]
    async fn test_unknown_problem_is_not_found() {
        let h = harness(ScriptedGateway::new(), problem(1, 1)).await;

        let err = h
            .orchestrator
            .submit(h.user.id, Uuid::new_v4(), "code", "java")
            .await
            .unwrap_err();

        assert!(matches!(err, JudgeError::NotFound(_)));
        assert!(err.is_client_error());
        assert_eq!(h.store.submission_count().await, 0);
    }

    #[tokio::test]
    async fn test_run_without_visible_cases_never_dispatches() {
        let h = harness(ScriptedGateway::new(), problem(0, 2)).await;

        let err = h.orchestrator.run(h.problem.id, "code", "java").await.unwrap_err();

        assert!(matches!(err, JudgeError::Validation(ref m) if m.contains("visible")));
        assert_eq!(h.gateway.submits(), 0);
    }

    #[tokio::test]
    async fn test_submit_without_hidden_cases_writes_nothing() {
        let h = harness(ScriptedGateway::new(), problem(2, 0)).await;

        let err = h
            .orchestrator
            .submit(h.user.id, h.problem.id, "code", "java")
            .await
            .unwrap_err();

        assert!(matches!(err, JudgeError::Validation(ref m) if m.contains("hidden")));
        assert_eq!(h.gateway.submits(), 0);
        assert_eq!(h.store.submission_count().await, 0);
    }

    #[tokio::test]
    async fn test_run_reports_each_visible_case() {
        let h = harness(ScriptedGateway::new(), problem(3, 1)).await;
        h.gateway.script(&[3, 5, 3]);

        let report = h
            .orchestrator
            .run(h.problem.id, "code", "javascript")
            .await
            .unwrap();

        assert!(!report.success);
        assert_eq!(report.language, Language::JavaScript);
        assert_eq!(report.test_cases.len(), 3);
        assert_eq!(report.passed_test_cases, 2);
        assert_eq!(report.test_cases[1].status.id(), 5);

        let batch = &h.gateway.batches()[0];
        assert_eq!(batch[0].stdin, "v0\nt");
        assert_eq!(batch[1].stdin, "v1");

        assert_eq!(h.store.submission_count().await, 0);
        let user = h.store.get_user(h.user.id).await.unwrap().unwrap();
        assert!(user.problem_solved.is_empty());
    }

    #[tokio::test]
    async fn test_gateway_failure_marks_submission_error() {
        let h = harness(ScriptedGateway::new().with_failing_submit(), problem(1, 2)).await;

        let err = h
            .orchestrator
            .submit(h.user.id, h.problem.id, "code", "java")
            .await
            .unwrap_err();
        assert!(matches!(err, JudgeError::GatewayUnavailable(_)));

        let history = h
            .store
            .submissions_for(h.user.id, h.problem.id)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, SubmissionStatus::Error);
        assert_eq!(history[0].test_cases_total, 2);
        assert!(history[0]
            .error_message
            .as_deref()
            .unwrap()
            .contains("connection refused"));
    }

    #[tokio::test]
    async fn test_poll_timeout_marks_submission_error() {
        let h = harness(ScriptedGateway::new().with_pending_polls(100), problem(1, 1)).await;

        let err = h
            .orchestrator
            .submit(h.user.id, h.problem.id, "code", "java")
            .await
            .unwrap_err();
        assert!(matches!(err, JudgeError::GatewayTimeout { attempts: 5 }));

        let history = h
            .store
            .submissions_for(h.user.id, h.problem.id)
            .await
            .unwrap();
        assert_eq!(history[0].status, SubmissionStatus::Error);
        assert_eq!(history[0].test_cases_passed, 0);
    }

    #[tokio::test]
    async fn test_verify_reference_solutions_passes() {
        let h = harness(ScriptedGateway::new(), problem(2, 1)).await;

        h.orchestrator
            .verify_reference_solutions(&h.problem)
            .await
            .unwrap();

        let batches = h.gateway.batches();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[1][0].source_code, "java reference");
    }

    #[tokio::test]
    async fn test_verify_reference_solutions_rejects_failing_language() {
        let gateway = ScriptedGateway::new().with_language_status(Language::Java, 4);
        let h = harness(gateway, problem(2, 1)).await;

        let err = h
            .orchestrator
            .verify_reference_solutions(&h.problem)
            .await
            .unwrap_err();

        match err {
            JudgeError::Validation(msg) => {
                assert!(msg.contains("java"));
                assert!(msg.contains("Runtime Error"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_verify_rejects_invalid_document_without_dispatch() {
        let mut invalid = problem(1, 1);
        invalid.start_code.pop();
        let h = harness(ScriptedGateway::new(), invalid).await;

        let err = h
            .orchestrator
            .verify_reference_solutions(&h.problem)
            .await
            .unwrap_err();
        assert!(matches!(err, JudgeError::Validation(_)));
        assert_eq!(h.gateway.submits(), 0);
    }
}
