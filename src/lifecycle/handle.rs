use tokio::sync::{mpsc, oneshot, watch};

use crate::{lifecycle::ServiceState, ServiceError};

pub(crate) type Reply = oneshot::Sender<Result<(), ServiceError>>;

/// Requests sent from a `ServiceHandle` to the lifecycle actor.
pub(crate) enum ServiceMessage {
    Start(Reply),
    Stop(Reply),
    /// Stop if active, then end the lifecycle actor.
    Shutdown(Reply),
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceHandleError {
    #[error("the service lifecycle is no longer running")]
    Closed,
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl<T> From<mpsc::error::SendError<T>> for ServiceHandleError {
    fn from(_: mpsc::error::SendError<T>) -> Self {
        Self::Closed
    }
}

/// Host-side control of a running `ServiceLifecycle`.
///
/// Cloning is cheap. When every clone is dropped the lifecycle stops the
/// service and exits.
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    tx: mpsc::UnboundedSender<ServiceMessage>,
    state_rx: watch::Receiver<ServiceState>,
}

impl ServiceHandle {
    pub(crate) fn new(
        tx: mpsc::UnboundedSender<ServiceMessage>,
        state_rx: watch::Receiver<ServiceState>,
    ) -> Self {
        Self { tx, state_rx }
    }

    /// Starts the supervision loop. Returns once the service reports `Running`,
    /// or with the error that made it report `Stopped` instead.
    pub async fn start(&self) -> Result<(), ServiceHandleError> {
        self.request(ServiceMessage::Start).await
    }

    /// Stops the service. The service is `Stopped` when this returns, even on error.
    pub async fn stop(&self) -> Result<(), ServiceHandleError> {
        self.request(ServiceMessage::Stop).await
    }

    /// Stops the service if it is active and ends the lifecycle.
    pub async fn shutdown(&self) -> Result<(), ServiceHandleError> {
        self.request(ServiceMessage::Shutdown).await
    }

    pub fn state(&self) -> ServiceState {
        *self.state_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ServiceState> {
        self.state_rx.clone()
    }

    /// Waits until the service reaches `state`.
    pub async fn wait_for_state(&self, state: ServiceState) -> Result<(), ServiceHandleError> {
        let mut rx = self.state_rx.clone();
        rx.wait_for(|current| *current == state)
            .await
            .map(|_| ())
            .map_err(|_| ServiceHandleError::Closed)
    }

    /// Waits for the lifecycle actor to exit.
    pub async fn wait(&self) {
        self.tx.closed().await;
    }

    async fn request(
        &self,
        message: impl FnOnce(Reply) -> ServiceMessage,
    ) -> Result<(), ServiceHandleError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx.send(message(reply_tx))?;
        let result = reply_rx.await.map_err(|_| ServiceHandleError::Closed)?;
        Ok(result?)
    }
}
