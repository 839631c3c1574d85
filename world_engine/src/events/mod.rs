//! Conditional events, their outcomes and the trigger scheduler.

mod event;
mod outcome;
mod registry;

pub use event::{ConditionalEvent, FiringPolicy, Severity};
pub use outcome::{FiringCause, TriggerHistory, TriggerOutcome};
pub use registry::{EventRegistry, DEFAULT_MAX_CASCADE_DEPTH};
