mod process;

use std::{
    ffi::OsString,
    fmt, io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;

pub use process::{ProcessRunner, MAX_STDERR_BYTES};

use crate::ServiceError;

/// The executable the service keeps alive, with its working directory and arguments.
///
/// Arguments are passed to the OS as a literal vector; nothing is interpreted by a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildCommand {
    program: PathBuf,
    working_dir: Option<PathBuf>,
    args: Vec<OsString>,
}

impl ChildCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            working_dir: None,
            args: Vec::new(),
        }
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Checks what can be checked before anything is spawned.
    ///
    /// A missing program binary is deliberately not checked here: it is a
    /// launch failure handled by the retry loop.
    pub(crate) async fn validate(&self) -> Result<(), ServiceError> {
        if self.program.as_os_str().is_empty() {
            return Err(ServiceError::InvalidConfig {
                message: "program path is empty".to_string(),
                os_code: None,
            });
        }
        if let Some(dir) = &self.working_dir {
            let metadata =
                tokio::fs::metadata(dir)
                    .await
                    .map_err(|e| ServiceError::InvalidConfig {
                        message: format!("working directory {}: {e}", dir.display()),
                        os_code: e.raw_os_error(),
                    })?;
            if !metadata.is_dir() {
                return Err(ServiceError::InvalidConfig {
                    message: format!("working directory {} is not a directory", dir.display()),
                    os_code: None,
                });
            }
        }
        Ok(())
    }
}

/// Why a child process could not be spawned.
#[derive(Debug, Clone, thiserror::Error)]
#[error("failed to launch {program}: {message}")]
pub struct LaunchError {
    program: String,
    kind: io::ErrorKind,
    message: String,
    os_code: Option<i32>,
}

impl LaunchError {
    pub fn from_io(program: &Path, err: &io::Error) -> Self {
        Self {
            program: program.display().to_string(),
            kind: err.kind(),
            message: err.to_string(),
            os_code: err.raw_os_error(),
        }
    }

    pub fn kind(&self) -> io::ErrorKind {
        self.kind
    }

    pub fn os_code(&self) -> Option<i32> {
        self.os_code
    }
}

/// What one invocation of the child produced.
#[derive(Debug, Clone)]
pub struct ChildExitOutcome {
    /// `None` when the child never ran or was killed by a signal.
    pub exit_code: Option<i32>,
    pub stderr: String,
    pub launch_error: Option<LaunchError>,
}

impl ChildExitOutcome {
    pub fn exited(exit_code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stderr: stderr.into(),
            launch_error: None,
        }
    }

    pub fn launch_failed(err: LaunchError) -> Self {
        Self {
            exit_code: None,
            stderr: String::new(),
            launch_error: Some(err),
        }
    }

    pub fn is_success(&self) -> bool {
        self.launch_error.is_none() && self.exit_code == Some(0)
    }

    /// Consumes the outcome, keeping only what the supervisor needs to decide.
    pub fn into_result(self) -> Result<(), ChildFailure> {
        if let Some(err) = self.launch_error {
            return Err(ChildFailure::Launch(err));
        }
        match self.exit_code {
            Some(0) => Ok(()),
            code => Err(ChildFailure::Exit {
                code,
                stderr: self.stderr,
            }),
        }
    }
}

/// A single unsuccessful child invocation.
#[derive(Debug, Clone)]
pub enum ChildFailure {
    Launch(LaunchError),
    Exit { code: Option<i32>, stderr: String },
}

impl fmt::Display for ChildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Launch(err) => write!(f, "{err}"),
            Self::Exit { code, stderr } => {
                match code {
                    Some(code) => write!(f, "exited with code {code}")?,
                    None => write!(f, "terminated without an exit code")?,
                }
                let stderr = stderr.trim();
                if !stderr.is_empty() {
                    write!(f, ": {stderr}")?;
                }
                Ok(())
            }
        }
    }
}

/// Runs one child process to completion.
///
/// Implementations must not leave the process running or unreaped once the
/// returned future completes or is dropped.
#[async_trait]
pub trait ChildRunner: Send + Sync + 'static {
    async fn run(&self, command: &ChildCommand) -> ChildExitOutcome;
}
