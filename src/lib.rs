// ABOUTME: Library root for rigger - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod diagnostics;
pub mod env;
pub mod error;
pub mod layout;
pub mod log;
pub mod output;
pub mod permission;
pub mod runner;
pub mod script;
pub mod service;
pub mod target;
pub mod types;
pub mod workspace;
