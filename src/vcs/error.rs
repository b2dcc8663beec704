// ABOUTME: Version-control error types with SNAFU pattern.
// ABOUTME: Every failed git invocation carries its command line and combined output.

use std::path::PathBuf;

use snafu::Snafu;

/// Failure of a version-control operation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum VcsError {
    #[snafu(display("failed to run `{command}`: {source}"))]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[snafu(display("`{command}` exited with {status}: {output}"))]
    CommandFailed {
        command: String,
        status: String,
        output: String,
    },

    #[snafu(display("`{command}` was cancelled"))]
    Cancelled { command: String },

    #[snafu(display("push failed after {attempts} attempt(s): {source}"))]
    PushExhausted {
        attempts: u32,
        source: Box<VcsError>,
    },

    #[snafu(display(
        "remote branch is at {actual}, expected {expected}; refusing to overwrite it"
    ))]
    RemoteMoved { expected: String, actual: String },

    #[snafu(display("I/O error on {}: {source}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VcsErrorKind {
    /// A git command could not be started or exited unsuccessfully.
    CommandFailed,
    /// The caller's cancellation signal fired.
    Cancelled,
    /// The remote branch advanced unexpectedly.
    RemoteMoved,
    /// Local filesystem failure around the working copy.
    Io,
}

impl VcsError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> VcsErrorKind {
        match self {
            VcsError::Spawn { .. } | VcsError::CommandFailed { .. } => VcsErrorKind::CommandFailed,
            VcsError::Cancelled { .. } => VcsErrorKind::Cancelled,
            VcsError::PushExhausted { source, .. } => source.kind(),
            VcsError::RemoteMoved { .. } => VcsErrorKind::RemoteMoved,
            VcsError::Io { .. } => VcsErrorKind::Io,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind() == VcsErrorKind::Cancelled
    }

    /// Combined command output, if this error came from a git invocation.
    pub fn command_output(&self) -> Option<&str> {
        match self {
            VcsError::CommandFailed { output, .. } => Some(output),
            VcsError::PushExhausted { source, .. } => source.command_output(),
            _ => None,
        }
    }
}
