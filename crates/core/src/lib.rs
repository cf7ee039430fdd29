//! Shared data model for the forensic analysis pipeline.
//!
//! Everything that crosses a crate boundary lives here: the task input handed
//! to every analyzer, the step results they produce, the aggregated context
//! fed to the final call, and the debate records produced by the judge system.

pub mod domain;
pub mod error;

pub use domain::debate::{
    validate_score, Decision, DebateRound, JudgeDecision, Verdict, JUDGE_INVALID_JSON_EXPLANATION,
};
pub use domain::evidence::{AggregatedContext, StepResult};
pub use domain::task::TaskInput;
pub use error::CoreError;
