//! Common Test Utilities
//!
//! Shared fixtures and mock builders used across test modules.


pub use fixtures::*;
