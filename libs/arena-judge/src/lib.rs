pub mod engine;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod poller;

#[cfg(test)]
mod testing;

pub use engine::{BatchItem, CaseResult, ExecutionGateway, Judge0Gateway};
pub use error::JudgeError;
pub use evaluator::{evaluate, Verdict};
pub use executor::{Orchestrator, RunReport, SubmitReport};
pub use poller::{wait_for_results, PollPolicy};
