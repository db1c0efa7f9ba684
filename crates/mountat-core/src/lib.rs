//! # mountat-core
//!
//! Race-free mount targeting for Linux.
//!
//! Resolving a mount target by path name at mount time is open to a
//! time-of-check-to-time-of-use race: between validating the target and
//! the `mount(2)` call, a path component can be swapped so that the same
//! name resolves somewhere else. This crate closes that window by
//! resolving the target relative to an already-open directory descriptor,
//! which denotes a fixed directory no matter how the namespace is renamed
//! around it.
//!
//! The primitive is invisible to the rest of the process: the working
//! directory change it needs internally happens on a dedicated worker
//! thread whose filesystem context is detached first, so no other thread
//! ever observes it.

#[cfg(target_os = "linux")]
pub mod mount;
