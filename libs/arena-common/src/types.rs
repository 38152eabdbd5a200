use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Languages a solution may be written in.
/// The judge only knows these three; anything else is rejected before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "c++", alias = "cpp")]
    Cpp,
    #[serde(rename = "java")]
    Java,
    #[serde(rename = "javascript")]
    JavaScript,
}

impl Language {
    /// Single source of truth for the supported languages.
    pub fn all_variants() -> &'static [Language] {
        &[Language::Cpp, Language::Java, Language::JavaScript]
    }

    /// Parse a language from user input (case-insensitive, `cpp` is an alias of `c++`)
    pub fn from_str(s: &str) -> Option<Language> {
        match s.trim().to_lowercase().as_str() {
            "c++" | "cpp" => Some(Language::Cpp),
            "java" => Some(Language::Java),
            "javascript" => Some(Language::JavaScript),
            _ => None,
        }
    }

    /// Judge0 execution-environment id for this language.
    pub fn judge0_id(&self) -> u32 {
        match self {
            Language::Cpp => 54,
            Language::Java => 62,
            Language::JavaScript => 63,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Cpp => write!(f, "c++"),
            Language::Java => write!(f, "java"),
            Language::JavaScript => write!(f, "javascript"),
        }
    }
}

/// Execution status reported by the judge for a single test case.
///
/// Provider ids map through a fixed table; ids outside it are kept as `Other`
/// and treated as terminal failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum ExecutionStatus {
    Queued,
    Running,
    Accepted,
    RuntimeError,
    CompileError,
    Other(u32),
}

impl ExecutionStatus {
    pub fn from_id(id: u32) -> Self {
        match id {
            1 => ExecutionStatus::Queued,
            2 => ExecutionStatus::Running,
            3 => ExecutionStatus::Accepted,
            4 => ExecutionStatus::RuntimeError,
            6 => ExecutionStatus::CompileError,
            other => ExecutionStatus::Other(other),
        }
    }

    pub fn id(&self) -> u32 {
        match self {
            ExecutionStatus::Queued => 1,
            ExecutionStatus::Running => 2,
            ExecutionStatus::Accepted => 3,
            ExecutionStatus::RuntimeError => 4,
            ExecutionStatus::CompileError => 6,
            ExecutionStatus::Other(id) => *id,
        }
    }

    /// A terminal status will not change on further polling.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionStatus::Queued | ExecutionStatus::Running)
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::RuntimeError | ExecutionStatus::CompileError
        )
    }
}

impl From<u32> for ExecutionStatus {
    fn from(id: u32) -> Self {
        ExecutionStatus::from_id(id)
    }
}

impl From<ExecutionStatus> for u32 {
    fn from(status: ExecutionStatus) -> Self {
        status.id()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tag {
    Array,
    LinkedList,
    Graph,
    Tree,
    Dp,
}

/// Test case shown to the user; used by "run".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibleTestCase {
    pub input: String,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl VisibleTestCase {
    /// Program stdin: the target, when present, follows the input on its own line.
    pub fn stdin(&self) -> String {
        match &self.target {
            Some(target) => format!("{}\n{}", self.input, target),
            None => self.input.clone(),
        }
    }
}

/// Test case graded on "submit"; never shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiddenTestCase {
    pub input: String,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarterCode {
    pub language: Language,
    pub initial_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceSolution {
    pub language: Language,
    pub complete_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub tag: Tag,
    pub visible_test_cases: Vec<VisibleTestCase>,
    pub hidden_test_cases: Vec<HiddenTestCase>,
    pub start_code: Vec<StarterCode>,
    pub reference_solution: Vec<ReferenceSolution>,
    pub problem_creator: Uuid,
}

/// Reasons a problem document is refused at write time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProblemError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("problem has no visible test cases")]
    NoVisibleTestCases,
    #[error("problem has no hidden test cases")]
    NoHiddenTestCases,
    #[error("{kind} is missing an entry for {language}")]
    MissingLanguage {
        kind: &'static str,
        language: Language,
    },
    #[error("{kind} has more than one entry for {language}")]
    DuplicateLanguage {
        kind: &'static str,
        language: Language,
    },
}

impl Problem {
    /// Check the document invariants: non-empty text, both test-case lists
    /// populated, and exactly one starter and reference entry per language.
    pub fn validate(&self) -> Result<(), ProblemError> {
        if self.title.trim().is_empty() {
            return Err(ProblemError::EmptyField("title"));
        }
        if self.description.trim().is_empty() {
            return Err(ProblemError::EmptyField("description"));
        }
        if self.visible_test_cases.is_empty() {
            return Err(ProblemError::NoVisibleTestCases);
        }
        if self.hidden_test_cases.is_empty() {
            return Err(ProblemError::NoHiddenTestCases);
        }

        let starter: Vec<Language> = self.start_code.iter().map(|s| s.language).collect();
        check_one_per_language("startCode", &starter)?;

        let reference: Vec<Language> =
            self.reference_solution.iter().map(|r| r.language).collect();
        check_one_per_language("referenceSolution", &reference)?;

        Ok(())
    }

    pub fn summary(&self) -> ProblemSummary {
        ProblemSummary {
            id: self.id,
            title: self.title.clone(),
            difficulty: self.difficulty,
            tag: self.tag,
        }
    }
}

fn check_one_per_language(kind: &'static str, entries: &[Language]) -> Result<(), ProblemError> {
    for language in Language::all_variants() {
        match entries.iter().filter(|l| *l == language).count() {
            0 => {
                return Err(ProblemError::MissingLanguage {
                    kind,
                    language: *language,
                })
            }
            1 => {}
            _ => {
                return Err(ProblemError::DuplicateLanguage {
                    kind,
                    language: *language,
                })
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemSummary {
    pub id: Uuid,
    pub title: String,
    pub difficulty: Difficulty,
    pub tag: Tag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub email_id: String,
    #[serde(default)]
    pub role: Role,
    /// Set semantics: a problem id appears at most once.
    #[serde(default)]
    pub problem_solved: BTreeSet<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(first_name: impl Into<String>, email_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name: first_name.into(),
            last_name: None,
            email_id: email_id.into().trim().to_lowercase(),
            role: Role::User,
            problem_solved: BTreeSet::new(),
            password_hash: None,
            google_id: None,
            created_at: Utc::now(),
        }
    }
}

/// Submission lifecycle: `Pending` until judged, then one terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Accepted,
    Wrong,
    Error,
}

impl SubmissionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SubmissionStatus::Pending)
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionStatus::Pending => write!(f, "pending"),
            SubmissionStatus::Accepted => write!(f, "accepted"),
            SubmissionStatus::Wrong => write!(f, "wrong"),
            SubmissionStatus::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,
    pub user_id: Uuid,
    pub problem_id: Uuid,
    pub code: String,
    pub language: Language,
    pub status: SubmissionStatus,
    pub test_cases_passed: u32,
    pub test_cases_total: u32,
    /// Seconds, summed over accepted cases.
    pub runtime: f64,
    /// Kilobytes, max over accepted cases.
    pub memory: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Terminal fields written onto a pending submission once judging ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub status: SubmissionStatus,
    pub test_cases_passed: u32,
    pub runtime: f64,
    pub memory: u64,
    pub error_message: Option<String>,
}

impl SubmissionOutcome {
    /// Outcome for a submission whose judging could not complete.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: SubmissionStatus::Error,
            test_cases_passed: 0,
            runtime: 0.0,
            memory: 0,
            error_message: Some(message.into()),
        }
    }
}

impl Submission {
    pub fn pending(
        user_id: Uuid,
        problem_id: Uuid,
        code: String,
        language: Language,
        test_cases_total: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            problem_id,
            code,
            language,
            status: SubmissionStatus::Pending,
            test_cases_passed: 0,
            test_cases_total,
            runtime: 0.0,
            memory: 0,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a terminal outcome. Returns `false` (and changes nothing) when the
    /// submission is already terminal, so repeating a finalize is harmless.
    pub fn finalize(&mut self, outcome: &SubmissionOutcome) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = outcome.status;
        self.test_cases_passed = outcome.test_cases_passed.min(self.test_cases_total);
        self.runtime = outcome.runtime;
        self.memory = outcome.memory;
        self.error_message = outcome.error_message.clone();
        self.updated_at = Utc::now();
        true
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_serialization() {
        let json = serde_json::to_string(&Language::Cpp).unwrap();
        assert_eq!(json, "\"c++\"");

        let alias: Language = serde_json::from_str("\"cpp\"").unwrap();
        assert_eq!(alias, Language::Cpp);

        let js: Language = serde_json::from_str("\"javascript\"").unwrap();
        assert_eq!(js, Language::JavaScript);
    }

    #[test]
    fn test_language_from_str() {
        assert_eq!(Language::from_str("c++"), Some(Language::Cpp));
        assert_eq!(Language::from_str("CPP"), Some(Language::Cpp));
        assert_eq!(Language::from_str("Java"), Some(Language::Java));
        assert_eq!(Language::from_str("javascript"), Some(Language::JavaScript));

        assert_eq!(Language::from_str("python"), None);
        assert_eq!(Language::from_str(""), None);
    }

    #[test]
    fn test_judge0_ids() {
        assert_eq!(Language::Cpp.judge0_id(), 54);
        assert_eq!(Language::Java.judge0_id(), 62);
        assert_eq!(Language::JavaScript.judge0_id(), 63);
    }

    #[test]
    fn test_execution_status_mapping() {
        assert_eq!(ExecutionStatus::from_id(1), ExecutionStatus::Queued);
        assert_eq!(ExecutionStatus::from_id(2), ExecutionStatus::Running);
        assert_eq!(ExecutionStatus::from_id(3), ExecutionStatus::Accepted);
        assert_eq!(ExecutionStatus::from_id(4), ExecutionStatus::RuntimeError);
        assert_eq!(ExecutionStatus::from_id(6), ExecutionStatus::CompileError);
        assert_eq!(ExecutionStatus::from_id(5), ExecutionStatus::Other(5));

        for id in 1..=14 {
            assert_eq!(ExecutionStatus::from_id(id).id(), id);
        }
    }

    #[test]
    fn test_execution_status_terminal() {
        assert!(!ExecutionStatus::Queued.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!(ExecutionStatus::Accepted.is_terminal());
        assert!(ExecutionStatus::RuntimeError.is_terminal());
        assert!(ExecutionStatus::Other(13).is_terminal());

        assert!(ExecutionStatus::CompileError.is_error());
        assert!(!ExecutionStatus::Other(5).is_error());
    }

    #[test]
    fn test_execution_status_serializes_as_id() {
        let json = serde_json::to_string(&ExecutionStatus::Accepted).unwrap();
        assert_eq!(json, "3");
        let parsed: ExecutionStatus = serde_json::from_str("11").unwrap();
        assert_eq!(parsed, ExecutionStatus::Other(11));
    }

    #[test]
    fn test_visible_stdin_appends_target() {
        let mut case = VisibleTestCase {
            input: "1 2 3".to_string(),
            output: "0 1".to_string(),
            explanation: None,
            image: None,
            target: None,
        };
        assert_eq!(case.stdin(), "1 2 3");

        case.target = Some("3".to_string());
        assert_eq!(case.stdin(), "1 2 3\n3");
    }

    #[test]
    fn test_problem_validation() {
        assert_eq!(fixtures::problem(2, 3).validate(), Ok(()));

        assert_eq!(
            fixtures::problem(0, 3).validate(),
            Err(ProblemError::NoVisibleTestCases)
        );
        assert_eq!(
            fixtures::problem(1, 0).validate(),
            Err(ProblemError::NoHiddenTestCases)
        );

        let mut missing = fixtures::problem(1, 1);
        missing.start_code.retain(|s| s.language != Language::Java);
        assert_eq!(
            missing.validate(),
            Err(ProblemError::MissingLanguage {
                kind: "startCode",
                language: Language::Java
            })
        );

        let mut duplicate = fixtures::problem(1, 1);
        duplicate.reference_solution.push(ReferenceSolution {
            language: Language::Cpp,
            complete_code: "again".to_string(),
        });
        assert_eq!(
            duplicate.validate(),
            Err(ProblemError::DuplicateLanguage {
                kind: "referenceSolution",
                language: Language::Cpp
            })
        );
    }

    #[test]
    fn test_problem_json_uses_canonical_field_names() {
        let problem = fixtures::problem(1, 1);
        let value = serde_json::to_value(&problem).unwrap();
        assert!(value.get("visibleTestCases").is_some());
        assert!(value.get("hiddenTestCases").is_some());
        assert_eq!(value["tag"], "array");
        assert_eq!(value["startCode"][0]["language"], "c++");
    }

    #[test]
    fn test_submission_finalize_once() {
        let mut submission =
            Submission::pending(Uuid::new_v4(), Uuid::new_v4(), "code".into(), Language::Java, 3);
        assert_eq!(submission.status, SubmissionStatus::Pending);

        let accepted = SubmissionOutcome {
            status: SubmissionStatus::Accepted,
            test_cases_passed: 3,
            runtime: 0.12,
            memory: 2048,
            error_message: None,
        };
        assert!(submission.finalize(&accepted));
        assert_eq!(submission.status, SubmissionStatus::Accepted);

        assert!(!submission.finalize(&SubmissionOutcome::failed("late")));
        assert_eq!(submission.status, SubmissionStatus::Accepted);
        assert_eq!(submission.error_message, None);
    }

    #[test]
    fn test_finalize_caps_passed_at_total() {
        let mut submission =
            Submission::pending(Uuid::new_v4(), Uuid::new_v4(), "code".into(), Language::Cpp, 2);
        submission.finalize(&SubmissionOutcome {
            status: SubmissionStatus::Accepted,
            test_cases_passed: 5,
            runtime: 0.0,
            memory: 0,
            error_message: None,
        });
        assert_eq!(submission.test_cases_passed, 2);
    }

    #[test]
    fn test_user_email_normalized() {
        let user = User::new("Asha", "  Asha@Example.COM ");
        assert_eq!(user.email_id, "asha@example.com");
        assert_eq!(user.role, Role::User);
        assert!(user.problem_solved.is_empty());
    }
}
