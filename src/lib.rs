//! # service-supervisor
//!
//! `service-supervisor` runs one external program as a long-lived service.
//! It relaunches the program when it fails, gives up after a fixed number of
//! consecutive failures, and stops cleanly when the host asks it to.
//!
//! ## Quick example
//!
//! ```rust,no_run
//! use service_supervisor::{ServiceBuilder, ServiceState};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let handle = ServiceBuilder::new("node")
//!         .with_working_dir("/srv/app")
//!         .with_args(["index.js"])
//!         .build()
//!         .run();
//!
//!     handle.start().await?;
//!     assert_eq!(handle.state(), ServiceState::Running);
//!
//!     tokio::signal::ctrl_c().await?;
//!     handle.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## How it fits together
//!
//! * [`ShutdownSignal`] is the write-once latch that asks the retry loop to stop.
//! * [`ChildRunner`] launches the program once and reports a [`ChildExitOutcome`].
//!   [`ProcessRunner`] is the real implementation.
//! * [`ProcessSupervisor`] relaunches until exit code 0, the signal, or the failure threshold.
//! * [`ServiceLifecycle`] owns the [`ServiceState`] and reports every transition,
//!   with a [`StatusCode`], to a [`StatusReporter`].
//!
//! | ServiceHandle method   | Purpose                                                   |
//! | ---------------------- | --------------------------------------------------------- |
//! | `start().await`        | `StartPending` then `Running`, or `Stopped` on bad config |
//! | `stop().await`         | `StopPending` then `Stopped`, aborting after the timeout  |
//! | `state()`              | Current `ServiceState`                                    |
//! | `wait_for_state(s)`    | Wait until the service reaches `s`                        |
//! | `shutdown().await`     | Stop if needed and end the lifecycle                      |

pub use child::{
    ChildCommand, ChildExitOutcome, ChildFailure, ChildRunner, LaunchError, ProcessRunner,
    MAX_STDERR_BYTES,
};
pub use error::ServiceError;
pub use lifecycle::{
    builder::{ServiceBuilder, DEFAULT_START_WAIT_HINT, DEFAULT_STOP_TIMEOUT},
    handle::{ServiceHandle, ServiceHandleError},
    ServiceLifecycle, ServiceState, ServiceStatus, StatusCode,
};
pub use report::{LogEntry, Severity, StatusReporter, TracingReporter};
pub use signal::ShutdownSignal;
pub use supervisor::{
    ProcessSupervisor, SupervisorOutcome, DEFAULT_MAX_FAILURES, DEFAULT_SERVICE_NAME,
};

mod child;
mod error;
mod lifecycle;
mod report;
mod signal;
mod supervisor;
