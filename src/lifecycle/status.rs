use std::{fmt, time::Duration};

/// Host-visible service state. Only the lifecycle actor changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceState {
    Stopped,
    StartPending,
    Running,
    StopPending,
}

impl ServiceState {
    /// Whether the lifecycle may move from `self` to `next`.
    ///
    /// `Running -> Stopped` is the self-stop path taken when the supervisor
    /// finishes on its own; `StartPending -> Stopped` is a failed start.
    pub fn can_transition_to(self, next: ServiceState) -> bool {
        use ServiceState::*;
        matches!(
            (self, next),
            (Stopped, StartPending)
                | (StartPending, Running)
                | (StartPending, Stopped)
                | (Running, StopPending)
                | (Running, Stopped)
                | (StopPending, Stopped)
        )
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::StartPending => write!(f, "start pending"),
            Self::Running => write!(f, "running"),
            Self::StopPending => write!(f, "stop pending"),
        }
    }
}

/// Exit status attached to every reported transition.
///
/// Values follow the Win32 service error codes so existing service tooling
/// can tell a bad configuration from a crash loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Success,
    AppInitFailure,
    FatalAppExit,
    ServiceNotActive,
    ExceptionInService,
    ServiceSpecificError,
    ProcessAborted,
    /// An error code reported by the OS at the point of failure.
    Native(i32),
}

impl StatusCode {
    pub fn code(&self) -> i32 {
        match self {
            Self::Success => 0,
            Self::AppInitFailure => 575,
            Self::FatalAppExit => 713,
            Self::ServiceNotActive => 1062,
            Self::ExceptionInService => 1064,
            Self::ServiceSpecificError => 1066,
            Self::ProcessAborted => 1067,
            Self::Native(code) => *code,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Success,
            575 => Self::AppInitFailure,
            713 => Self::FatalAppExit,
            1062 => Self::ServiceNotActive,
            1064 => Self::ExceptionInService,
            1066 => Self::ServiceSpecificError,
            1067 => Self::ProcessAborted,
            other => Self::Native(other),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code() == 0
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::AppInitFailure => write!(f, "app init failure (575)"),
            Self::FatalAppExit => write!(f, "fatal app exit (713)"),
            Self::ServiceNotActive => write!(f, "service not active (1062)"),
            Self::ExceptionInService => write!(f, "exception in service (1064)"),
            Self::ServiceSpecificError => write!(f, "service specific error (1066)"),
            Self::ProcessAborted => write!(f, "process aborted (1067)"),
            Self::Native(code) => write!(f, "os error {code}"),
        }
    }
}

/// One status report pushed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceStatus {
    pub state: ServiceState,
    pub code: StatusCode,
    /// How long the host should wait before expecting the next report.
    pub wait_hint: Duration,
}
