use std::{sync::Arc, time::Duration};

use crate::{
    child::{ChildCommand, ChildFailure, ChildRunner, ProcessRunner},
    report::{LogEntry, Severity, StatusReporter, TracingReporter},
    ServiceError, ShutdownSignal,
};

/// Consecutive failures tolerated before the supervisor gives up.
pub const DEFAULT_MAX_FAILURES: u32 = 6;
pub const DEFAULT_SERVICE_NAME: &str = "service-supervisor";
const MAX_BACKOFF_EXPONENT: u32 = 5;

/// How a supervision run ended.
#[derive(Debug, Clone)]
pub enum SupervisorOutcome {
    /// The child exited with code 0.
    Completed { attempts: u32 },
    /// The shutdown signal was observed before the next launch.
    Cancelled { attempts: u32 },
    /// The failure threshold was reached.
    Failed {
        failures: u32,
        last_failure: ChildFailure,
    },
}

impl SupervisorOutcome {
    pub fn is_clean(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Number of times the child was launched (or a launch was attempted).
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Completed { attempts } | Self::Cancelled { attempts } => *attempts,
            Self::Failed { failures, .. } => *failures,
        }
    }
}

/// Keeps one child process alive by relaunching it after failures.
///
/// A run ends when the child exits cleanly, when the shutdown signal is seen
/// before a launch, or when `max_failures` consecutive launches have failed.
/// The failure counter lives for a single [`ProcessSupervisor::run`] call.
#[derive(Clone)]
pub struct ProcessSupervisor {
    command: ChildCommand,
    runner: Arc<dyn ChildRunner>,
    reporter: Arc<dyn StatusReporter>,
    service_name: String,
    max_failures: u32,
    restart_backoff: Option<Duration>,
}

impl ProcessSupervisor {
    pub fn new(command: ChildCommand) -> Self {
        Self {
            command,
            runner: Arc::new(ProcessRunner),
            reporter: Arc::new(TracingReporter),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            max_failures: DEFAULT_MAX_FAILURES,
            restart_backoff: None,
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn ChildRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn StatusReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn with_max_failures(mut self, max_failures: u32) -> Self {
        self.max_failures = max_failures;
        self
    }

    /// Waits `base * 2^min(failures - 1, 5)` before each relaunch. Off by default.
    pub fn with_restart_backoff(mut self, base: Duration) -> Self {
        self.restart_backoff = Some(base);
        self
    }

    pub fn command(&self) -> &ChildCommand {
        &self.command
    }

    pub fn max_failures(&self) -> u32 {
        self.max_failures
    }

    pub(crate) async fn validate(&self) -> Result<(), ServiceError> {
        if self.max_failures == 0 {
            return Err(ServiceError::InvalidConfig {
                message: "failure threshold must be at least 1".to_string(),
                os_code: None,
            });
        }
        self.command.validate().await
    }

    /// Runs the retry loop until it ends on its own or `signal` is observed.
    ///
    /// The signal is polled before every launch, so no child is started after
    /// it has been set. A child already running is left to exit on its own.
    pub async fn run(&self, signal: &ShutdownSignal) -> SupervisorOutcome {
        let mut failures = 0u32;
        let mut attempts = 0u32;

        loop {
            if signal.is_set() {
                tracing::debug!(attempts, "shutdown observed, not relaunching");
                return SupervisorOutcome::Cancelled { attempts };
            }

            attempts = attempts.saturating_add(1);
            let outcome = self.runner.run(&self.command).await;

            let failure = match outcome.into_result() {
                Ok(()) => {
                    self.log(Severity::Information, "child process exited cleanly");
                    return SupervisorOutcome::Completed { attempts };
                }
                Err(failure) => failure,
            };

            failures = failures.saturating_add(1);
            self.log(
                Severity::Warning,
                format!(
                    "child process failed ({failures}/{}): {failure}",
                    self.max_failures
                ),
            );
            if failures >= self.max_failures {
                return SupervisorOutcome::Failed {
                    failures,
                    last_failure: failure,
                };
            }

            if let Some(delay) = self.restart_delay(failures) {
                tokio::select! {
                    _ = signal.cancelled() => {}
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    fn restart_delay(&self, failures: u32) -> Option<Duration> {
        let base = self.restart_backoff?;
        let exponent = failures.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
        Some(base.saturating_mul(2u32.saturating_pow(exponent)))
    }

    fn log(&self, severity: Severity, message: impl Into<String>) {
        self.reporter
            .log(&LogEntry::new(&self.service_name, message, severity));
    }
}
