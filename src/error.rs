use std::time::Duration;

use crate::{
    child::{ChildFailure, LaunchError},
    lifecycle::{ServiceState, StatusCode},
};

/// Errors surfaced by the service lifecycle and its supervision loop.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ServiceError {
    /// The child executable could not be spawned.
    #[error(transparent)]
    LaunchFailure(#[from] LaunchError),

    /// The child ran and exited unsuccessfully.
    #[error("child process failed: {0}")]
    ChildRuntimeFailure(String),

    /// The supervision task did not finish within the stop timeout and was aborted.
    #[error("supervision task did not stop within {timeout:?} and was aborted")]
    ShutdownTimeout { timeout: Duration },

    /// Something unexpected went wrong inside the lifecycle itself.
    #[error("internal fault: {0}")]
    InternalFault(String),

    /// The supervisor configuration was rejected at start.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        message: String,
        os_code: Option<i32>,
    },

    #[error("service cannot start while {0}")]
    AlreadyRunning(ServiceState),

    #[error("service is not active")]
    NotActive,
}

impl ServiceError {
    /// The OS error code captured where the failure happened, if any.
    pub fn os_code(&self) -> Option<i32> {
        match self {
            Self::LaunchFailure(err) => err.os_code(),
            Self::InvalidConfig { os_code, .. } => *os_code,
            _ => None,
        }
    }

    /// Maps the error onto the host-visible status taxonomy.
    pub fn status_code(&self) -> StatusCode {
        if let Some(code) = self.os_code() {
            return StatusCode::Native(code);
        }
        match self {
            Self::LaunchFailure(_) | Self::InvalidConfig { .. } => StatusCode::AppInitFailure,
            Self::ChildRuntimeFailure(_) => StatusCode::ServiceSpecificError,
            Self::ShutdownTimeout { .. } => StatusCode::ProcessAborted,
            Self::InternalFault(_) => StatusCode::ExceptionInService,
            Self::AlreadyRunning(_) => StatusCode::ServiceSpecificError,
            Self::NotActive => StatusCode::ServiceNotActive,
        }
    }
}

impl From<ChildFailure> for ServiceError {
    fn from(failure: ChildFailure) -> Self {
        match failure {
            ChildFailure::Launch(err) => Self::LaunchFailure(err),
            exit @ ChildFailure::Exit { .. } => Self::ChildRuntimeFailure(exit.to_string()),
        }
    }
}
