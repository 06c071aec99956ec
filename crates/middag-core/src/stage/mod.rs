//! Stage executors: one per pipeline stage.
//!
//! Every executor follows the same sequence: check its required input
//! (skip when structurally absent), compose a prompt from the current
//! state, call the text generator, sanitize and validate the reply,
//! enforce its stage-specific invariants, and merge the result into the
//! state. Executors return a [`StageOutcome`] and never propagate errors;
//! a failed stage leaves the state it was handed untouched.

pub mod assignment;
pub mod consolidation;
pub mod discovery;
pub mod prompts;
pub mod sourcing;

pub use assignment::run_meal_assignment;
pub use consolidation::run_list_consolidation;
pub use discovery::run_deal_discovery;
pub use sourcing::run_ingredient_sourcing;

use crate::state::{StageName, StageOutcome};

/// Record a stage as skipped for lack of input. Not an error.
pub(crate) fn skipped(stage: StageName, reason: impl Into<String>) -> StageOutcome {
    let reason = reason.into();
    tracing::info!(stage = %stage, reason = %reason, "stage skipped");
    StageOutcome::Skipped { stage, reason }
}

/// Record a stage as errored. The pipeline keeps going.
pub(crate) fn errored(stage: StageName, detail: impl Into<String>) -> StageOutcome {
    let detail = detail.into();
    tracing::warn!(stage = %stage, detail = %detail, "stage errored");
    StageOutcome::Errored { stage, detail }
}
