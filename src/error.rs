// Error taxonomy for the whole pipeline. Components return these values
// instead of terminating the process; `main` is the only place that turns
// them into printed messages and an exit status.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which network call an HTTP failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ClientSetup,
    Register,
    Upload,
    Inference,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ClientSetup => "client setup",
            Stage::Register => "asset registration",
            Stage::Upload => "asset upload",
            Stage::Inference => "inference",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum FlorenceError {
    #[error("expected 3 arguments, got {given}")]
    Usage { given: usize },

    #[error("API_KEY not set. Please export {var}=<Your API Key> as environment variable.")]
    MissingCredential { var: &'static str },

    #[error("{var} contains characters that are not allowed in an HTTP header")]
    MalformedCredential { var: &'static str },

    #[error("task_id should within [0, {max}]")]
    InvalidTaskId { given: String, max: usize },

    #[error("{}: {reason}", path.display())]
    InvalidImage { path: PathBuf, reason: String },

    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage} request failed: {source}")]
    Transport {
        stage: Stage,
        #[source]
        source: reqwest::Error,
    },

    #[error("{stage} failed: {status} - {body}")]
    HttpStatus {
        stage: Stage,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("response is not a valid zip archive: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl FlorenceError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FlorenceError::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Input and configuration problems are reported on stdout as plain
    /// instructions; everything else is a failure reported on stderr.
    pub fn is_user_input(&self) -> bool {
        matches!(
            self,
            FlorenceError::Usage { .. }
                | FlorenceError::MissingCredential { .. }
                | FlorenceError::InvalidTaskId { .. }
        )
    }

    /// True for failures that happened on the wire, whether the request
    /// never completed or the server answered with a failure status.
    #[cfg(test)]
    pub(crate) fn is_transport(&self) -> bool {
        matches!(
            self,
            FlorenceError::Transport { .. } | FlorenceError::HttpStatus { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FlorenceError>;
