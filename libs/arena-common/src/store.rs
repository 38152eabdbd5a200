//! Persistent store seam.
//!
//! The judge core only needs simple keyed reads and writes; no transaction
//! spans "create pending" and "finalize". `RedisStore` (see `redis.rs`) backs
//! production, `MemoryStore` backs tests and local dry runs.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::types::{Problem, ProblemError, ProblemSummary, Submission, SubmissionOutcome, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
    #[error("corrupt record: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid problem: {0}")]
    InvalidProblem(#[from] ProblemError),
    #[error("user {0} not found")]
    UserNotFound(Uuid),
    #[error("submission {0} not found")]
    SubmissionNotFound(Uuid),
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn get_problem(&self, id: Uuid) -> Result<Option<Problem>, StoreError>;

    /// Validates the document before writing; invalid problems never reach storage.
    async fn put_problem(&self, problem: &Problem) -> Result<(), StoreError>;

    async fn list_problems(&self) -> Result<Vec<ProblemSummary>, StoreError>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn put_user(&self, user: &User) -> Result<(), StoreError>;

    /// Idempotent set insert. Returns `true` only when the id was not yet present.
    async fn add_solved_problem(&self, user_id: Uuid, problem_id: Uuid)
        -> Result<bool, StoreError>;

    async fn create_submission(&self, submission: &Submission) -> Result<(), StoreError>;

    /// Write the terminal outcome of a pending submission. Finalizing an
    /// already-terminal submission leaves it untouched.
    async fn finalize_submission(
        &self,
        id: Uuid,
        outcome: &SubmissionOutcome,
    ) -> Result<Submission, StoreError>;

    async fn get_submission(&self, id: Uuid) -> Result<Option<Submission>, StoreError>;

    /// Submissions of one user for one problem, newest first.
    async fn submissions_for(
        &self,
        user_id: Uuid,
        problem_id: Uuid,
    ) -> Result<Vec<Submission>, StoreError>;
}

#[derive(Default)]
struct Tables {
    problems: HashMap<Uuid, Problem>,
    users: HashMap<Uuid, User>,
    submissions: HashMap<Uuid, Submission>,
    history: HashMap<(Uuid, Uuid), Vec<Uuid>>,
}

/// In-process store with the same semantics as the Redis one.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a problem without write-time validation, the way documents
    /// written before validation existed may still sit in storage.
    pub async fn seed_problem(&self, problem: Problem) {
        self.tables.write().await.problems.insert(problem.id, problem);
    }

    /// Number of stored submissions, across all users.
    pub async fn submission_count(&self) -> usize {
        self.tables.read().await.submissions.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_problem(&self, id: Uuid) -> Result<Option<Problem>, StoreError> {
        Ok(self.tables.read().await.problems.get(&id).cloned())
    }

    async fn put_problem(&self, problem: &Problem) -> Result<(), StoreError> {
        problem.validate()?;
        self.tables
            .write()
            .await
            .problems
            .insert(problem.id, problem.clone());
        Ok(())
    }

    async fn list_problems(&self) -> Result<Vec<ProblemSummary>, StoreError> {
        let tables = self.tables.read().await;
        let mut summaries: Vec<ProblemSummary> =
            tables.problems.values().map(Problem::summary).collect();
        summaries.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(summaries)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn put_user(&self, user: &User) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let merged = match tables.users.get(&user.id) {
            Some(existing) => {
                let mut merged = user.clone();
                merged
                    .problem_solved
                    .extend(existing.problem_solved.iter().copied());
                merged
            }
            None => user.clone(),
        };
        tables.users.insert(user.id, merged);
        Ok(())
    }

    async fn add_solved_problem(
        &self,
        user_id: Uuid,
        problem_id: Uuid,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or(StoreError::UserNotFound(user_id))?;
        Ok(user.problem_solved.insert(problem_id))
    }

    async fn create_submission(&self, submission: &Submission) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables
            .submissions
            .insert(submission.id, submission.clone());
        tables
            .history
            .entry((submission.user_id, submission.problem_id))
            .or_default()
            .insert(0, submission.id);
        Ok(())
    }

    async fn finalize_submission(
        &self,
        id: Uuid,
        outcome: &SubmissionOutcome,
    ) -> Result<Submission, StoreError> {
        let mut tables = self.tables.write().await;
        let submission = tables
            .submissions
            .get_mut(&id)
            .ok_or(StoreError::SubmissionNotFound(id))?;
        submission.finalize(outcome);
        Ok(submission.clone())
    }

    async fn get_submission(&self, id: Uuid) -> Result<Option<Submission>, StoreError> {
        Ok(self.tables.read().await.submissions.get(&id).cloned())
    }

    async fn submissions_for(
        &self,
        user_id: Uuid,
        problem_id: Uuid,
    ) -> Result<Vec<Submission>, StoreError> {
        let tables = self.tables.read().await;
        let ids = match tables.history.get(&(user_id, problem_id)) {
            Some(ids) => ids,
            None => return Ok(Vec::new()),
        };
        Ok(ids
            .iter()
            .filter_map(|id| tables.submissions.get(id).cloned())
            .collect())
    }
}

/// Problem summaries for a set of solved ids, skipping problems that no longer exist.
pub async fn solved_summaries(
    store: &dyn Store,
    solved: &BTreeSet<Uuid>,
) -> Result<Vec<ProblemSummary>, StoreError> {
    let mut summaries = Vec::with_capacity(solved.len());
    for id in solved {
        if let Some(problem) = store.get_problem(*id).await? {
            summaries.push(problem.summary());
        }
    }
    Ok(summaries)
}
