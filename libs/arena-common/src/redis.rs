//! Redis key layout and the Redis-backed store.
//!
//! Keys are deterministic so the API and the CLI always agree on where a
//! record lives. Records are JSON strings; set-valued fields live in Redis sets.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use uuid::Uuid;

use crate::store::{Store, StoreError};
use crate::types::{Problem, ProblemSummary, Submission, SubmissionOutcome, User};

pub const PROBLEM_PREFIX: &str = "arena:problem";
pub const PROBLEM_INDEX: &str = "arena:problems";
pub const USER_PREFIX: &str = "arena:user";
pub const SUBMISSION_PREFIX: &str = "arena:submission";
pub const HISTORY_PREFIX: &str = "arena:submissions";

pub fn problem_key(id: &Uuid) -> String {
    format!("{}:{}", PROBLEM_PREFIX, id)
}

pub fn user_key(id: &Uuid) -> String {
    format!("{}:{}", USER_PREFIX, id)
}

/// Set of problem ids the user has solved
pub fn solved_key(user_id: &Uuid) -> String {
    format!("{}:{}:solved", USER_PREFIX, user_id)
}

pub fn submission_key(id: &Uuid) -> String {
    format!("{}:{}", SUBMISSION_PREFIX, id)
}

/// List of submission ids for one (user, problem) pair, newest at the head
pub fn history_key(user_id: &Uuid, problem_id: &Uuid) -> String {
    format!("{}:{}:{}", HISTORY_PREFIX, user_id, problem_id)
}

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn))
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn get_problem(&self, id: Uuid) -> Result<Option<Problem>, StoreError> {
        self.read_json(&problem_key(&id)).await
    }

    async fn put_problem(&self, problem: &Problem) -> Result<(), StoreError> {
        problem.validate()?;
        let json = serde_json::to_string(problem)?;
        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .set(problem_key(&problem.id), json)
            .ignore()
            .sadd(PROBLEM_INDEX, problem.id.to_string())
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn list_problems(&self) -> Result<Vec<ProblemSummary>, StoreError> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn.smembers(PROBLEM_INDEX).await?;

        let mut summaries = Vec::with_capacity(ids.len());
        for id in ids {
            let Ok(id) = Uuid::parse_str(&id) else {
                tracing::warn!(id = %id, "Skipping malformed problem id in index");
                continue;
            };
            if let Some(problem) = self.get_problem(id).await? {
                summaries.push(problem.summary());
            }
        }
        summaries.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(summaries)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let Some(mut user) = self.read_json::<User>(&user_key(&id)).await? else {
            return Ok(None);
        };

        let mut conn = self.conn.clone();
        let solved: Vec<String> = conn.smembers(solved_key(&id)).await?;
        user.problem_solved = solved
            .iter()
            .filter_map(|s| Uuid::parse_str(s).ok())
            .collect();
        Ok(Some(user))
    }

    async fn put_user(&self, user: &User) -> Result<(), StoreError> {
        let mut record = user.clone();
        let solved: Vec<String> = std::mem::take(&mut record.problem_solved)
            .iter()
            .map(Uuid::to_string)
            .collect();
        let json = serde_json::to_string(&record)?;

        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic().set(user_key(&user.id), json).ignore();
        if !solved.is_empty() {
            pipe.sadd(solved_key(&user.id), solved).ignore();
        }
        pipe.query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }

    async fn add_solved_problem(
        &self,
        user_id: Uuid,
        problem_id: Uuid,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(user_key(&user_id)).await?;
        if !exists {
            return Err(StoreError::UserNotFound(user_id));
        }
        let added: i64 = conn
            .sadd(solved_key(&user_id), problem_id.to_string())
            .await?;
        Ok(added > 0)
    }

    async fn create_submission(&self, submission: &Submission) -> Result<(), StoreError> {
        let json = serde_json::to_string(submission)?;
        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .set(submission_key(&submission.id), json)
            .ignore()
            .lpush(
                history_key(&submission.user_id, &submission.problem_id),
                submission.id.to_string(),
            )
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn finalize_submission(
        &self,
        id: Uuid,
        outcome: &SubmissionOutcome,
    ) -> Result<Submission, StoreError> {
        let mut submission = self
            .get_submission(id)
            .await?
            .ok_or(StoreError::SubmissionNotFound(id))?;

        if submission.finalize(outcome) {
            let json = serde_json::to_string(&submission)?;
            let mut conn = self.conn.clone();
            conn.set::<_, _, ()>(submission_key(&id), json).await?;
        }
        Ok(submission)
    }

    async fn get_submission(&self, id: Uuid) -> Result<Option<Submission>, StoreError> {
        self.read_json(&submission_key(&id)).await
    }

    async fn submissions_for(
        &self,
        user_id: Uuid,
        problem_id: Uuid,
    ) -> Result<Vec<Submission>, StoreError> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn
            .lrange(history_key(&user_id, &problem_id), 0, -1)
            .await?;

        let mut submissions = Vec::with_capacity(ids.len());
        for id in ids.iter().filter_map(|s| Uuid::parse_str(s).ok()) {
            if let Some(submission) = self.get_submission(id).await? {
                submissions.push(submission);
            }
        }
        Ok(submissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_key_deterministic() {
        let id = Uuid::new_v4();
        assert_eq!(problem_key(&id), problem_key(&id));
        assert!(problem_key(&id).starts_with("arena:problem:"));
    }

    #[test]
    fn test_solved_key_is_scoped_to_user() {
        let id = Uuid::new_v4();
        let key = solved_key(&id);
        assert!(key.starts_with("arena:user:"));
        assert!(key.ends_with(":solved"));
        assert!(key.contains(&id.to_string()));
        assert_ne!(key, user_key(&id));
    }

    #[test]
    fn test_history_key_format() {
        let user = Uuid::new_v4();
        let problem = Uuid::new_v4();
        assert_eq!(
            history_key(&user, &problem),
            format!("arena:submissions:{}:{}", user, problem)
        );
        assert_ne!(history_key(&user, &problem), history_key(&problem, &user));
    }

    #[test]
    fn test_submission_key_format() {
        let id = Uuid::new_v4();
        assert_eq!(submission_key(&id), format!("arena:submission:{}", id));
    }
}
