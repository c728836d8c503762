use async_trait::async_trait;
use service_supervisor::{
    ChildCommand, ChildExitOutcome, ChildRunner, LaunchError, LogEntry, ProcessSupervisor, ServiceBuilder,
    ServiceState, ServiceStatus, Severity, ShutdownSignal, StatusReporter,
};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Builder wired to a scripted runner and a recording reporter.
#[allow(unused)]
pub fn scripted_service(runner: &ScriptedRunner, reporter: &RecordingReporter) -> ServiceBuilder {
    ServiceBuilder::new("scripted-child")
        .with_service_name("test-service")
        .with_runner(runner.clone())
        .with_reporter(reporter.clone())
}

#[allow(unused)]
pub fn scripted_supervisor(
    runner: impl ChildRunner,
    reporter: &RecordingReporter,
) -> ProcessSupervisor {
    ProcessSupervisor::new(ChildCommand::new("scripted-child"))
        .with_runner(Arc::new(runner))
        .with_reporter(Arc::new(reporter.clone()))
}

/// Exits with the scripted code for each attempt; the last code repeats.
#[allow(unused)]
#[derive(Clone)]
pub struct ScriptedRunner {
    exit_codes: Arc<Vec<i32>>,
    launch_fails: bool,
    run_duration: Duration,
    calls: Arc<AtomicUsize>,
}

#[allow(unused)]
impl ScriptedRunner {
    pub fn always(code: i32) -> Self {
        Self::sequence(&[code])
    }

    pub fn sequence(codes: &[i32]) -> Self {
        Self {
            exit_codes: Arc::new(codes.to_vec()),
            launch_fails: false,
            run_duration: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every attempt fails to spawn, as a missing executable would.
    pub fn failing_to_launch() -> Self {
        Self {
            launch_fails: true,
            ..Self::always(0)
        }
    }

    pub fn with_run_duration(mut self, duration: Duration) -> Self {
        self.run_duration = duration;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChildRunner for ScriptedRunner {
    async fn run(&self, command: &ChildCommand) -> ChildExitOutcome {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.launch_fails {
            let err = io::Error::from(io::ErrorKind::NotFound);
            return ChildExitOutcome::launch_failed(LaunchError::from_io(command.program(), &err));
        }
        if !self.run_duration.is_zero() {
            tokio::time::sleep(self.run_duration).await;
        }
        let code = self
            .exit_codes
            .get(attempt)
            .or(self.exit_codes.last())
            .copied()
            .unwrap_or(0);
        let stderr = if code == 0 { "" } else { "scripted failure" };
        ChildExitOutcome::exited(Some(code), stderr)
    }
}

/// Fails every time and sets the shutdown signal during the given attempt.
#[allow(unused)]
#[derive(Clone)]
pub struct SignallingRunner {
    pub signal: ShutdownSignal,
    pub signal_on_attempt: usize,
    pub calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ChildRunner for SignallingRunner {
    async fn run(&self, _command: &ChildCommand) -> ChildExitOutcome {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt == self.signal_on_attempt {
            self.signal.signal();
        }
        ChildExitOutcome::exited(Some(1), "")
    }
}

/// Never finishes on its own. Records when its in-flight run is dropped.
#[allow(unused)]
#[derive(Clone, Default)]
pub struct StuckRunner {
    pub calls: Arc<AtomicUsize>,
    pub dropped: Arc<AtomicBool>,
}

#[allow(unused)]
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChildRunner for StuckRunner {
    async fn run(&self, _command: &ChildCommand) -> ChildExitOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _flag = DropFlag(self.dropped.clone());
        std::future::pending::<()>().await;
        ChildExitOutcome::exited(Some(0), "")
    }
}

/// Blocks its worker thread without yielding, then exits cleanly.
#[allow(unused)]
#[derive(Clone)]
pub struct BlockingRunner {
    pub block_for: Duration,
}

#[async_trait]
impl ChildRunner for BlockingRunner {
    async fn run(&self, _command: &ChildCommand) -> ChildExitOutcome {
        std::thread::sleep(self.block_for);
        ChildExitOutcome::exited(Some(0), "")
    }
}

#[allow(unused)]
#[derive(Clone, Default)]
pub struct RecordingReporter {
    statuses: Arc<Mutex<Vec<ServiceStatus>>>,
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

#[allow(unused)]
impl RecordingReporter {
    pub fn statuses(&self) -> Vec<ServiceStatus> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn states(&self) -> Vec<ServiceState> {
        self.statuses().iter().map(|status| status.state).collect()
    }

    pub fn last_status(&self) -> Option<ServiceStatus> {
        self.statuses().last().copied()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.severity == severity)
            .count()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|entry| entry.message.clone())
            .collect()
    }
}

impl StatusReporter for RecordingReporter {
    fn report_status(&self, status: &ServiceStatus) {
        self.statuses.lock().unwrap().push(*status);
    }

    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}
