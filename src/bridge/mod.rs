//! Bridge orchestration: connection supervision, command handling and the
//! publish façade used by the periodic temperature job.

pub mod commands;
pub mod publisher;
pub mod supervisor;

pub use commands::CommandHandler;
pub use publisher::{BridgePublisher, TelemetryPublisher};
pub use supervisor::{ConnectionSupervisor, LivenessDecision, SupervisorError, SupervisorSettings};
