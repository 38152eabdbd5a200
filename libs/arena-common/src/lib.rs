pub mod types;
pub mod redis;
pub mod config;
pub mod store;

// Re-export commonly used types for convenience
pub use types::{
    ExecutionStatus, Language, Problem, Submission, SubmissionOutcome, SubmissionStatus, User,
};
pub use config::Config;
pub use store::{MemoryStore, Store, StoreError};
pub use crate::redis::RedisStore;
