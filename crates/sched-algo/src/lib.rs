pub mod carry;
pub mod cip;
pub mod diag;
pub mod extract;
pub mod model;
pub mod orchestrate;
pub mod rate;
pub mod solve;

pub use carry::{derive_initial_states, AvailableFromMode};
pub use diag::{Auditor, BoundsAuditor, CapacityReporter, Finding, Reporter, ScheduleOutputs, Severity};
pub use extract::{extract_cip_windows, extract_produced_vs_bounds, extract_schedule};
pub use model::{build_and_solve, ModelOutput, ModelStatus};
pub use orchestrate::{run_two_phase, TwoPhaseOutcome};
pub use rate::{is_capable, resolve_rate};
pub use solve::{AccumulatingSink, NullSink, ProgressSink, SolverConfig};
