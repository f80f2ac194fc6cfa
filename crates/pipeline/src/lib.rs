//! Job orchestration: scheduler, stage executor, cancellation, cleanup.
//!
//! The scheduler admits job ids into a bounded FIFO queue served by a fixed
//! worker pool; each worker drives its job through the stage sequence via
//! the executor. Cancellation is cooperative (flag + token), and cleanup
//! keeps the artifact tree bounded.

pub mod cancel;
pub mod cleanup;
pub mod executor;
pub mod scheduler;

pub use cancel::{CancelRegistry, CancellationController};
pub use executor::PipelineExecutor;
pub use scheduler::Scheduler;
