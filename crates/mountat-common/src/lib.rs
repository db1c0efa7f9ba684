//! # mountat-common
//!
//! Shared error definitions for the mountat workspace.
//!
//! This crate is the leaf of the dependency graph: it depends on no other
//! internal crate and provides the failure taxonomy that the mount
//! primitive and its callers agree on.

pub mod error;
