// ABOUTME: Library root for provisio - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod cancel;
pub mod config;
pub mod error;
pub mod install;
pub mod output;
pub mod progress;
pub mod ssh;
