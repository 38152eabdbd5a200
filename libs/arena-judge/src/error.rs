use arena_common::StoreError;
use thiserror::Error;

/// Everything that can stop a run or submit from producing a verdict.
///
/// A failing test case is not an error: it is reported through the verdict.
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("{0}")]
    Validation(String),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("execution service unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("execution service did not finish judging after {attempts} polls")]
    GatewayTimeout { attempts: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl JudgeError {
    /// Stable label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            JudgeError::Validation(_) => "validation",
            JudgeError::UnsupportedLanguage(_) => "unsupported_language",
            JudgeError::NotFound(_) => "not_found",
            JudgeError::GatewayUnavailable(_) => "gateway_unavailable",
            JudgeError::GatewayTimeout { .. } => "gateway_timeout",
            JudgeError::Store(_) => "store",
        }
    }

    /// Errors the caller can fix by changing the request
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            JudgeError::Validation(_) | JudgeError::UnsupportedLanguage(_) | JudgeError::NotFound(_)
        )
    }
}

impl From<reqwest::Error> for JudgeError {
    fn from(err: reqwest::Error) -> Self {
        JudgeError::GatewayUnavailable(err.to_string())
    }
}
