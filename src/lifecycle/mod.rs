pub(crate) mod builder;
pub(crate) mod handle;
mod status;

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, watch},
    task::{JoinError, JoinHandle},
};

pub use status::{ServiceState, ServiceStatus, StatusCode};

use crate::{
    lifecycle::handle::{ServiceHandle, ServiceMessage},
    report::{LogEntry, Severity, StatusReporter},
    supervisor::{ProcessSupervisor, SupervisorOutcome},
    ServiceError, ShutdownSignal,
};

/// The supervision task of the current run and the latch that stops it.
struct ActiveRun {
    signal: ShutdownSignal,
    join_handle: JoinHandle<SupervisorOutcome>,
}

/// Drives a service through `Stopped -> StartPending -> Running -> StopPending -> Stopped`.
///
/// The lifecycle runs as its own task and is the only writer of the service
/// state. The supervision loop never touches that state: its outcome comes back
/// through the join handle of the task it runs in, and a run that ends on its
/// own (clean exit or too many failures) moves the service straight to `Stopped`.
pub struct ServiceLifecycle {
    supervisor: ProcessSupervisor,
    reporter: Arc<dyn StatusReporter>,
    service_name: String,
    stop_timeout: Duration,
    start_wait_hint: Duration,
    state_tx: watch::Sender<ServiceState>,
    active: Option<ActiveRun>,
}

impl ServiceLifecycle {
    /// Spawns the lifecycle onto the current tokio runtime and returns a handle to control it.
    ///
    /// The service stays `Stopped` until [`ServiceHandle::start`] is called.
    pub fn run(self) -> ServiceHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ServiceHandle::new(tx, self.state_tx.subscribe());
        tokio::spawn(self.serve(rx));
        handle
    }

    pub fn state(&self) -> ServiceState {
        *self.state_tx.borrow()
    }

    async fn serve(mut self, mut rx: mpsc::UnboundedReceiver<ServiceMessage>) {
        loop {
            tokio::select! {
                message = rx.recv() => {
                    match message {
                        Some(ServiceMessage::Start(reply)) => {
                            let result = self.start().await;
                            let _ = reply.send(result);
                        }
                        Some(ServiceMessage::Stop(reply)) => {
                            let result = self.stop().await;
                            let _ = reply.send(result);
                        }
                        Some(ServiceMessage::Shutdown(reply)) => {
                            let result = self.stop_if_active().await;
                            let _ = reply.send(result);
                            break;
                        }
                        None => {
                            let _ = self.stop_if_active().await;
                            break;
                        }
                    }
                }
                joined = join_active(&mut self.active) => {
                    self.active = None;
                    self.handle_supervisor_exit(joined);
                }
            }
        }
        tracing::debug!(service = %self.service_name, "lifecycle exited");
    }

    async fn start(&mut self) -> Result<(), ServiceError> {
        let current = self.state();
        if !current.is_stopped() {
            return Err(ServiceError::AlreadyRunning(current));
        }

        self.log(Severity::Information, "starting service");
        self.transition(
            ServiceState::StartPending,
            StatusCode::Success,
            self.start_wait_hint,
        );

        if let Err(err) = self.supervisor.validate().await {
            self.log(Severity::Error, format!("failed to start service: {err}"));
            self.transition(ServiceState::Stopped, err.status_code(), Duration::ZERO);
            return Err(err);
        }

        let signal = ShutdownSignal::new();
        let task_signal = signal.clone();
        let supervisor = self.supervisor.clone();
        let join_handle = tokio::spawn(async move { supervisor.run(&task_signal).await });
        self.active = Some(ActiveRun {
            signal,
            join_handle,
        });

        self.transition(ServiceState::Running, StatusCode::Success, Duration::ZERO);
        Ok(())
    }

    /// Signals the supervision task and waits for it, aborting it after `stop_timeout`.
    ///
    /// Always ends in `Stopped` within `stop_timeout`. An aborted task is dropped
    /// by the runtime at its next yield point, killing the in-flight child with
    /// it; anything else the child held is not cleaned up.
    async fn stop(&mut self) -> Result<(), ServiceError> {
        let Some(mut run) = self.active.take() else {
            return Err(ServiceError::NotActive);
        };

        self.log(Severity::Information, "stopping service");
        self.transition(
            ServiceState::StopPending,
            StatusCode::Success,
            self.stop_timeout,
        );
        run.signal.signal();

        let joined = tokio::time::timeout(self.stop_timeout, &mut run.join_handle).await;
        let (code, result) = match joined {
            Ok(Ok(SupervisorOutcome::Failed {
                failures,
                last_failure,
            })) => {
                self.log(
                    Severity::Error,
                    format!("child failed {failures} times while stopping: {last_failure}"),
                );
                (StatusCode::AppInitFailure, Ok(()))
            }
            Ok(Ok(outcome)) => {
                tracing::debug!(attempts = outcome.attempts(), "supervisor stopped");
                (StatusCode::Success, Ok(()))
            }
            Ok(Err(err)) => {
                let err = ServiceError::InternalFault(join_error_message(&err));
                self.log(Severity::Error, format!("error while stopping: {err}"));
                (err.status_code(), Err(err))
            }
            Err(_) => {
                // Not awaited: a runner that never yields would hold the stop past its deadline.
                run.join_handle.abort();
                let err = ServiceError::ShutdownTimeout {
                    timeout: self.stop_timeout,
                };
                self.log(Severity::Warning, format!("{err}"));
                (err.status_code(), Err(err))
            }
        };

        self.transition(ServiceState::Stopped, code, Duration::ZERO);
        result
    }

    async fn stop_if_active(&mut self) -> Result<(), ServiceError> {
        if self.active.is_none() {
            return Ok(());
        }
        self.stop().await
    }

    /// The supervision task finished without a stop request.
    fn handle_supervisor_exit(&self, joined: Result<SupervisorOutcome, JoinError>) {
        let code = match joined {
            Ok(SupervisorOutcome::Failed {
                failures,
                last_failure,
            }) => {
                self.log(
                    Severity::Error,
                    format!("child failed {failures} times, stopping service: {last_failure}"),
                );
                StatusCode::AppInitFailure
            }
            Ok(outcome) => {
                self.log(
                    Severity::Information,
                    format!(
                        "supervision ended after {} attempt(s), stopping service",
                        outcome.attempts()
                    ),
                );
                StatusCode::Success
            }
            Err(err) => {
                self.log(
                    Severity::Error,
                    format!("supervision task failed: {}", join_error_message(&err)),
                );
                StatusCode::ExceptionInService
            }
        };
        self.transition(ServiceState::Stopped, code, Duration::ZERO);
    }

    /// Reports `next` to the host, then publishes it to handle subscribers.
    fn transition(&self, next: ServiceState, code: StatusCode, wait_hint: Duration) {
        let current = self.state();
        if !current.can_transition_to(next) {
            tracing::warn!(from = %current, to = %next, "unexpected service transition");
        }

        let status = ServiceStatus {
            state: next,
            code,
            wait_hint,
        };
        self.reporter.report_status(&status);
        let severity = if code.is_success() {
            Severity::Information
        } else {
            Severity::Error
        };
        self.log(severity, format!("{current} -> {next} ({code})"));
        self.state_tx.send_replace(next);
    }

    fn log(&self, severity: Severity, message: impl Into<String>) {
        self.reporter
            .log(&LogEntry::new(&self.service_name, message, severity));
    }
}

/// Waits on the active supervision task, or forever when there is none.
async fn join_active(active: &mut Option<ActiveRun>) -> Result<SupervisorOutcome, JoinError> {
    match active {
        Some(run) => (&mut run.join_handle).await,
        None => std::future::pending().await,
    }
}

fn join_error_message(err: &JoinError) -> String {
    if err.is_panic() {
        "supervision task panicked".to_string()
    } else {
        err.to_string()
    }
}
