//! Failure taxonomy for descriptor-anchored mount operations.
//!
//! Kernel error codes are preserved in the `errno` fields as
//! [`std::io::Error`] values built from the raw OS error, so callers can
//! tell a missing file from a permission failure or a busy target.

use std::io;
use std::os::fd::RawFd;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while mounting at a descriptor-anchored target.
#[derive(Debug, Error)]
pub enum MountError {
    /// The anchor descriptor could not be inspected.
    #[error("cannot stat anchor descriptor {fd}: {errno}")]
    BadDescriptor {
        /// Raw descriptor value, for diagnostics.
        fd: RawFd,
        /// Error reported by `fstat(2)`.
        errno: io::Error,
    },

    /// The anchor descriptor does not denote a directory.
    ///
    /// Detected before any worker state exists; passing a directory handle
    /// makes the call recoverable.
    #[error("anchor descriptor {fd} does not denote a directory")]
    NotADirectory {
        /// Raw descriptor value, for diagnostics.
        fd: RawFd,
    },

    /// The mount target is an absolute path.
    ///
    /// An absolute target would bypass the anchor directory entirely, so
    /// it is rejected before anything else happens.
    #[error("mount target {target:?} is not relative to the anchor")]
    NotRelative {
        /// Offending target path.
        target: PathBuf,
    },

    /// The mount source does not exist.
    #[error("mount source {source:?} not found: {errno}")]
    SourceNotFound {
        /// Source path of the mount request.
        source: PathBuf,
        /// Error reported by `mount(2)`.
        #[source]
        errno: io::Error,
    },

    /// The kernel rejected the mount request.
    #[error("mount of {source:?} onto {target:?} failed: {errno}")]
    MountFailed {
        /// Source path of the mount request.
        source: PathBuf,
        /// Target path, relative to the anchor directory.
        target: PathBuf,
        /// Error reported by `mount(2)`.
        #[source]
        errno: io::Error,
    },

    /// Preparing the worker thread's private working directory failed.
    ///
    /// Raised before the mount is attempted; no state leaks out of the
    /// worker.
    #[error("mount worker could not {stage}: {errno}")]
    WorkdirSetup {
        /// The preparation step that failed.
        stage: &'static str,
        /// Underlying kernel error.
        errno: io::Error,
    },

    /// The worker thread could not restore its saved working directory.
    ///
    /// Fatal to the call. Swallowing it would hand whatever runs on that
    /// thread next an arbitrary working directory.
    #[error("mount worker could not restore its working directory: {errno}")]
    WorkdirRestore {
        /// Underlying kernel error.
        errno: io::Error,
    },

    /// The dedicated worker thread could not be spawned.
    #[error("cannot spawn mount worker thread: {source}")]
    WorkerSpawn {
        /// Error returned by the thread spawn.
        source: io::Error,
    },

    /// The worker thread terminated without producing a result.
    #[error("mount worker thread panicked")]
    WorkerPanicked,
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, MountError>;
