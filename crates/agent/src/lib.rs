//! The plan-execute-observe reasoning loop for Stepwise.
//!
//! A run follows a **Plan → Execute → Observe** cycle:
//!
//! 1. **Plan**: the model turns the request into at most three steps
//! 2. **Round**: for the current step, the model may request tools
//! 3. **Observe**: each tool result is summarized into an observation
//! 4. **Advance** to the next step, or ask for the final answer
//!
//! Progress is a lazy stream of [`ProgressEvent`]s; the run stops after the
//! final answer or at the round budget.

pub mod loop_runner;
pub mod plan;
pub mod prompt;
pub mod stream_event;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use loop_runner::{DEFAULT_MAX_ROUNDS, ProgressStream, ReasoningLoop};
pub use plan::{StepIndexOutOfRange, StepPlan};
pub use prompt::build_planning_prompt;
pub use stream_event::ProgressEvent;
