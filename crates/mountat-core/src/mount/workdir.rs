//! Thread-confined working directory handling for mount workers.
//!
//! Every thread in a Linux process normally shares one filesystem context,
//! so a plain `chdir(2)` on a worker would be visible process-wide. A
//! worker therefore detaches its context with `unshare(CLONE_FS)` before
//! touching the working directory; from that point its directory changes
//! stay private to it and die with it.

use std::os::fd::{AsFd, BorrowedFd, OwnedFd};

use mountat_common::error::{MountError, Result};
use nix::fcntl::{self, OFlag};
use nix::sched::{self, CloneFlags};
use nix::sys::stat::Mode;
use nix::unistd;

/// Working-directory state of a worker whose filesystem context has been
/// detached from the rest of the process.
///
/// Holds an `O_PATH` descriptor for the directory that was current at
/// capture time, so the worker can return there on every exit path.
#[derive(Debug)]
pub(crate) struct DetachedWorkdir {
    saved: OwnedFd,
}

impl DetachedWorkdir {
    /// Detaches the calling thread's filesystem context and captures its
    /// current working directory.
    ///
    /// Must run on a thread dedicated to a single mount operation; after
    /// this call the thread's working directory can diverge from the rest
    /// of the process.
    ///
    /// # Errors
    ///
    /// Returns [`MountError::WorkdirSetup`] if `unshare(2)` or the capture
    /// of the current directory fails. Nothing has been mutated in either
    /// case.
    pub(crate) fn detach() -> Result<Self> {
        sched::unshare(CloneFlags::CLONE_FS).map_err(|errno| MountError::WorkdirSetup {
            stage: "detach its filesystem context",
            errno: errno.into(),
        })?;

        let saved = fcntl::open(
            ".",
            OFlag::O_PATH | OFlag::O_DIRECTORY | OFlag::O_CLOEXEC,
            Mode::empty(),
        )
        .map_err(|errno| MountError::WorkdirSetup {
            stage: "save its working directory",
            errno: errno.into(),
        })?;

        Ok(Self { saved })
    }

    /// Changes this worker's working directory to the directory denoted by
    /// `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`MountError::WorkdirSetup`] if `fchdir(2)` fails; the
    /// working directory is unchanged then.
    pub(crate) fn enter(&self, dir: BorrowedFd<'_>) -> Result<()> {
        unistd::fchdir(dir).map_err(|errno| MountError::WorkdirSetup {
            stage: "enter the anchor directory",
            errno: errno.into(),
        })
    }

    /// Restores the working directory captured by [`DetachedWorkdir::detach`].
    ///
    /// # Errors
    ///
    /// Returns [`MountError::WorkdirRestore`] if `fchdir(2)` back to the
    /// saved directory fails. Callers must treat that as fatal to the
    /// operation rather than ignore it.
    pub(crate) fn restore(self) -> Result<()> {
        unistd::fchdir(self.saved.as_fd()).map_err(|errno| MountError::WorkdirRestore {
            errno: errno.into(),
        })
    }
}
