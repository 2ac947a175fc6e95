//! Common test utilities for integration tests.
//!
//! Each integration test file compiles as a separate crate, so not every
//! helper is used everywhere.

#![allow(dead_code)]
#![allow(unused_imports)]
#![allow(unused_macros)]

pub mod test_repo;

pub use test_repo::TestRepo;

/// Whether a usable `git` binary is on the PATH.
pub fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Return early from a test when git is not installed.
macro_rules! skip_if_no_git {
    () => {
        if !common::git_available() {
            eprintln!("git not found on PATH, skipping");
            return;
        }
    };
}
