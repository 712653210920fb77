//! EC2 workflows and helpers
//!
//! This module provides higher-level operations that compose provider calls.
//! For simple lookups, call the provider traits directly.

pub mod dump;
pub mod workflows;

pub use dump::*;
pub use workflows::*;
