// ABOUTME: Library root for pagepush - exposes the publish pipeline and its parts.
// ABOUTME: The main binary is in main.rs.

pub mod cleanup;
pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod lock;
pub mod output;
pub mod retry;
pub mod types;
pub mod vcs;
