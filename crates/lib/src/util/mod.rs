//! Shared utilities.
//!
//! Filesystem helpers used across the crate, plus test doubles for the
//! process/network collaborators.

pub mod fs;

#[cfg(test)]
pub mod testutil;
