//! Mounting onto targets resolved against an open directory descriptor.
//!
//! The target path of [`mount_at`] is interpreted strictly relative to the
//! directory a caller-supplied descriptor denotes. The descriptor is
//! borrowed read-only and never closed; its lifecycle stays with the
//! caller. Because the kernel resolves the target starting at the
//! directory the descriptor already denotes, renaming or symlink-swapping
//! the directory's path name between capture and mount cannot redirect the
//! mount.

mod workdir;

use std::os::fd::{AsFd, AsRawFd, BorrowedFd};
use std::path::{Path, PathBuf};
use std::thread;

use mountat_common::error::{MountError, Result};
use nix::errno::Errno;
use nix::mount::MsFlags;
use nix::sys::stat::{self, SFlag};

use workdir::DetachedWorkdir;

/// A mount request, applied verbatim by the kernel.
///
/// No option parsing or flag interpretation happens here; the fields are
/// handed to `mount(2)` as-is.
#[derive(Debug, Clone)]
pub struct MountRequest {
    /// Mount source: a device node, a directory, or a nominal name such as
    /// `tmpfs`.
    pub source: PathBuf,
    /// Filesystem type, as listed in `/proc/filesystems`.
    pub fstype: String,
    /// Mount behavior flags.
    pub flags: MsFlags,
    /// Filesystem-specific option string, if any.
    pub data: Option<String>,
}

/// Mounts `request` onto `target`, resolved relative to the directory
/// denoted by `dir`.
///
/// The calling thread's working directory is never touched and nothing is
/// observable process-wide: the mount runs on a dedicated worker thread
/// that detaches its filesystem context before changing directory, and the
/// worker restores its saved directory on every exit path. Concurrent
/// calls are independent; each gets its own worker and no lock is shared.
///
/// There are no retries. Every failure is deterministic for the given
/// inputs and retrying would not change the outcome.
///
/// # Errors
///
/// Returns [`MountError::NotADirectory`] if `dir` does not denote a
/// directory and [`MountError::NotRelative`] if `target` is absolute, both
/// detected before any worker state exists. A missing source surfaces as
/// [`MountError::SourceNotFound`]; any other kernel rejection as
/// [`MountError::MountFailed`], errno preserved. Worker bookkeeping
/// failures surface as [`MountError::WorkdirSetup`],
/// [`MountError::WorkdirRestore`] (fatal: the worker could not put its
/// working directory back), [`MountError::WorkerSpawn`], or
/// [`MountError::WorkerPanicked`].
pub fn mount_at<Fd: AsFd>(dir: Fd, target: impl AsRef<Path>, request: &MountRequest) -> Result<()> {
    let dir = dir.as_fd();
    let target = target.as_ref();

    ensure_directory(dir)?;
    ensure_relative(target)?;

    tracing::debug!(
        fd = dir.as_raw_fd(),
        target = %target.display(),
        source = %request.source.display(),
        fstype = %request.fstype,
        "mounting at descriptor-anchored target"
    );

    thread::scope(|scope| -> Result<()> {
        let worker = thread::Builder::new()
            .name("mountat-worker".into())
            .spawn_scoped(scope, || mount_pinned(dir, target, request))
            .map_err(|source| MountError::WorkerSpawn { source })?;
        worker.join().map_err(|_| MountError::WorkerPanicked)?
    })?;

    tracing::info!(
        target = %target.display(),
        source = %request.source.display(),
        "mounted at descriptor-anchored target"
    );
    Ok(())
}

/// Bind-mounts `source` onto `target`, resolved relative to the directory
/// denoted by `dir`.
///
/// A read-only bind takes two kernel calls: `MS_RDONLY` is ignored while a
/// bind mount is created and only honored on remount.
///
/// # Errors
///
/// Same failure surface as [`mount_at`].
pub fn bind_mount_at<Fd: AsFd>(
    dir: Fd,
    target: impl AsRef<Path>,
    source: &Path,
    readonly: bool,
) -> Result<()> {
    let dir = dir.as_fd();
    let target = target.as_ref();

    mount_at(
        dir,
        target,
        &MountRequest {
            source: source.to_path_buf(),
            fstype: "none".into(),
            flags: MsFlags::MS_BIND,
            data: None,
        },
    )?;

    if readonly {
        mount_at(
            dir,
            target,
            &MountRequest {
                source: source.to_path_buf(),
                fstype: "none".into(),
                flags: MsFlags::MS_BIND | MsFlags::MS_REMOUNT | MsFlags::MS_RDONLY,
                data: None,
            },
        )?;
    }

    Ok(())
}

/// Fails fast when the anchor is not a directory, before any worker state
/// or working-directory bookkeeping exists.
fn ensure_directory(dir: BorrowedFd<'_>) -> Result<()> {
    let st = stat::fstat(dir).map_err(|errno| MountError::BadDescriptor {
        fd: dir.as_raw_fd(),
        errno: errno.into(),
    })?;

    if st.st_mode & SFlag::S_IFMT.bits() == SFlag::S_IFDIR.bits() {
        Ok(())
    } else {
        Err(MountError::NotADirectory {
            fd: dir.as_raw_fd(),
        })
    }
}

/// An absolute target would make the kernel ignore the anchor directory.
fn ensure_relative(target: &Path) -> Result<()> {
    if target.is_absolute() {
        return Err(MountError::NotRelative {
            target: target.to_path_buf(),
        });
    }
    Ok(())
}

/// Body of the dedicated worker thread.
///
/// Sequence: detach the filesystem context, save the working directory,
/// enter the anchor, mount with a plain relative target, restore. The
/// restore runs regardless of the mount outcome, and a restore failure
/// outranks a mount failure: it is the only signal that the worker's state
/// could not be put back.
fn mount_pinned(dir: BorrowedFd<'_>, target: &Path, request: &MountRequest) -> Result<()> {
    let workdir = DetachedWorkdir::detach()?;

    let mounted = workdir
        .enter(dir)
        .and_then(|()| perform_mount(target, request));
    let restored = workdir.restore();

    restored.and(mounted)
}

/// Issues `mount(2)` with the already-relative target and classifies the
/// errno on failure.
fn perform_mount(target: &Path, request: &MountRequest) -> Result<()> {
    nix::mount::mount(
        Some(request.source.as_path()),
        target,
        Some(request.fstype.as_str()),
        request.flags,
        request.data.as_deref(),
    )
    .map_err(|errno| classify_mount_errno(errno, target, request))
}

/// ENOENT means the source path did not resolve. The kernel reports the
/// same errno for a missing relative target, which therefore surfaces
/// under the same kind.
fn classify_mount_errno(errno: Errno, target: &Path, request: &MountRequest) -> MountError {
    match errno {
        Errno::ENOENT => MountError::SourceNotFound {
            source: request.source.clone(),
            errno: errno.into(),
        },
        other => MountError::MountFailed {
            source: request.source.clone(),
            target: target.to_path_buf(),
            errno: other.into(),
        },
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use std::fs::File;

    use super::{MountError, MountRequest, MsFlags, mount_at};

    fn tmpfs_request() -> MountRequest {
        MountRequest {
            source: "tmpfs".into(),
            fstype: "tmpfs".into(),
            flags: MsFlags::empty(),
            data: None,
        }
    }

    #[test]
    fn absolute_target_is_rejected_before_any_mutation() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let handle = File::open(dir.path()).expect("failed to open tempdir");

        let before = std::env::current_dir().expect("failed to read cwd");
        let err = mount_at(&handle, "/absolute/target", &tmpfs_request())
            .expect_err("absolute target must be rejected");

        assert!(matches!(err, MountError::NotRelative { .. }));
        assert_eq!(std::env::current_dir().expect("failed to read cwd"), before);
    }
}
