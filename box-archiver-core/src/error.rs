//! Error taxonomy shared by every step of the archive-and-sync pipeline.
//!
//! Every variant is terminal for the current run. Nothing in this crate
//! catches one of these to retry or downgrade it; the CLI prints the
//! `Display` text and exits non-zero.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The period identifier was not of the form `YYYY-MM`.
    #[error("invalid period {input:?}: expected YYYY-MM (e.g. 2024-05)")]
    InvalidPeriodFormat { input: String },

    /// The config path handed to the CLI does not exist.
    #[error("no such config file found: {}", .path.display())]
    ConfigNotFound { path: PathBuf },

    /// Nothing in the working directory matched `{prefix}-*`.
    #[error("no target files matching {pattern}")]
    NoMatch { pattern: String },

    /// `{prefix}.zip` is already present; it is never overwritten.
    #[error("archive file {} already exists", .path.display())]
    ArchiveExists { path: PathBuf },

    /// Moving the selection into the staging directory stopped partway.
    /// Entries in `moved` are already inside `staging_dir`; `failed` and
    /// `remaining` are still at their original location.
    #[error(
        "move into {} stopped at {}: {source} ({} moved, {} not attempted)",
        .staging_dir.display(),
        .failed.display(),
        .moved.len(),
        .remaining.len()
    )]
    PartialMove {
        staging_dir: PathBuf,
        moved: Vec<PathBuf>,
        failed: PathBuf,
        remaining: Vec<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    RemoteApi(#[from] RemoteApiError),

    #[error("{context} {}: {source}", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write archive {}: {source}", .path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

impl Error {
    pub fn io(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            context,
            path: path.into(),
            source,
        }
    }
}

/// A failed call against the remote object store.
///
/// `status` is `None` when the request never produced an HTTP response
/// (connection refused, TLS failure, malformed response body).
#[derive(Debug, Clone, Serialize)]
pub struct RemoteApiError {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
    pub context: Option<serde_json::Value>,
}

impl RemoteApiError {
    pub fn transport(message: impl Into<String>) -> Self {
        RemoteApiError {
            status: None,
            code: None,
            message: message.into(),
            context: None,
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        RemoteApiError {
            status: Some(status),
            code: None,
            message: message.into(),
            context: None,
        }
    }
}

impl fmt::Display for RemoteApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "remote API error (status {status}")?,
            None => write!(f, "remote API error (no response")?,
        }
        if let Some(code) = &self.code {
            write!(f, ", code {code}")?;
        }
        write!(f, "): {}", self.message)?;
        if let Some(context) = &self.context {
            write!(f, "; context: {context}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RemoteApiError {}
