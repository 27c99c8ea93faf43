//! Ledger transaction engine.
//!
//! The engine turns stored transaction requests into confirmed ledger
//! transactions:
//! - Address reservations, the only mutual-exclusion primitive
//! - Workflow dispatch from request type to output builder
//! - The execution state machine (reserve, build, sign, submit, track)
//! - The retry sweep and the trigger queue feeding the dispatcher
//! - Configuration, metrics and shutdown plumbing for the daemon

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod reservation;
pub mod retry;
pub mod shutdown;
pub mod trigger;
pub mod workflow;

pub use config::{EngineConfig, NetworkConfig};
pub use context::{NetworkContext, Networks};
pub use engine::Engine;
pub use error::{EngineError, ErrorClass};
pub use executor::{Executor, Outcome, CORRELATION_TAG, DEFAULT_MAX_RETRY};
pub use metrics::EngineMetrics;
pub use reservation::ReservationManager;
pub use retry::RetryScheduler;
pub use shutdown::{ShutdownController, ShutdownSignal};
pub use trigger::{handle, Dispatcher, Trigger, TriggerQueue, TriggerReason};
pub use workflow::{BuildContext, OutputBuilder, TransactionPlan, WorkflowRegistry};
