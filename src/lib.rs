// Library target shared by the binary, integration tests and benchmarks.
// The terminal front end (event pump and widgets) lives with the binary in main.rs.

pub mod app;
pub mod config;
pub mod content;
pub mod engine;
pub mod error;
pub mod session;
pub mod store;
