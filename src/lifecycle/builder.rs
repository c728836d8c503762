use std::{ffi::OsString, path::PathBuf, sync::Arc, time::Duration};

use tokio::sync::watch;

use crate::{
    child::{ChildCommand, ChildRunner},
    lifecycle::{ServiceLifecycle, ServiceState},
    report::{StatusReporter, TracingReporter},
    supervisor::{ProcessSupervisor, DEFAULT_MAX_FAILURES, DEFAULT_SERVICE_NAME},
};

pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_millis(3000);
pub const DEFAULT_START_WAIT_HINT: Duration = Duration::from_millis(2000);

/// Builds a `ServiceLifecycle` around one child command.
///
/// Defaults: 6 tolerated failures, 3 s stop timeout, 2 s start wait-hint,
/// immediate restarts, real processes, diagnostics sent to `tracing`.
pub struct ServiceBuilder {
    command: ChildCommand,
    service_name: String,
    max_failures: u32,
    restart_backoff: Option<Duration>,
    stop_timeout: Duration,
    start_wait_hint: Duration,
    runner: Option<Arc<dyn ChildRunner>>,
    reporter: Arc<dyn StatusReporter>,
}

impl ServiceBuilder {
    /// Creates a builder for the executable at `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self::from_command(ChildCommand::new(program))
    }

    pub fn from_command(command: ChildCommand) -> Self {
        Self {
            command,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            max_failures: DEFAULT_MAX_FAILURES,
            restart_backoff: None,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            start_wait_hint: DEFAULT_START_WAIT_HINT,
            runner: None,
            reporter: Arc::new(TracingReporter),
        }
    }

    /// Sets the working directory of the child.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.command = self.command.current_dir(dir);
        self
    }

    /// Appends literal arguments for the child.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.command = self.command.args(args);
        self
    }

    /// Sets the name attached to every log entry.
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Sets how many consecutive failures stop the service.
    pub fn with_max_failures(mut self, max_failures: u32) -> Self {
        self.max_failures = max_failures;
        self
    }

    /// Enables capped exponential backoff between relaunches.
    pub fn with_restart_backoff(mut self, base: Duration) -> Self {
        self.restart_backoff = Some(base);
        self
    }

    /// Sets how long `stop` waits for the supervision task before aborting it.
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn with_start_wait_hint(mut self, wait_hint: Duration) -> Self {
        self.start_wait_hint = wait_hint;
        self
    }

    /// Replaces the process runner, mostly useful in tests.
    pub fn with_runner(mut self, runner: impl ChildRunner) -> Self {
        self.runner = Some(Arc::new(runner));
        self
    }

    pub fn with_reporter(mut self, reporter: impl StatusReporter) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    /// Constructs the `ServiceLifecycle`. Nothing is validated or spawned until `start`.
    pub fn build(self) -> ServiceLifecycle {
        let mut supervisor = ProcessSupervisor::new(self.command)
            .with_reporter(self.reporter.clone())
            .with_service_name(self.service_name.clone())
            .with_max_failures(self.max_failures);
        if let Some(runner) = self.runner {
            supervisor = supervisor.with_runner(runner);
        }
        if let Some(base) = self.restart_backoff {
            supervisor = supervisor.with_restart_backoff(base);
        }
        let (state_tx, _) = watch::channel(ServiceState::Stopped);

        ServiceLifecycle {
            supervisor,
            reporter: self.reporter,
            service_name: self.service_name,
            stop_timeout: self.stop_timeout,
            start_wait_hint: self.start_wait_hint,
            state_tx,
            active: None,
        }
    }
}
