pub mod health;
pub mod state_machine;
pub mod thresholds;

pub use health::{HealthReport, HealthReporter, HealthStatus};
pub use state_machine::{AlertStateMachine, AlertTransition};
pub use thresholds::{Metric, Severity, Threshold, Thresholds};
