//! Configuration and profile management for ec2ctl
//!
// Allow nested config module - this is intentional for the config subsystem

#![allow(clippy::module_inception)]
//!
//! Profiles select an AWS region, an optional named AWS shared-config
//! profile, and the waiting / retry behaviour of mutating operations.
//! Credentials are never stored here; they come from the AWS default
//! provider chain.
//!
//! # Features
//!
//! - Multiple named profiles (one per account / region combination)
//! - Environment variable expansion in config files
//! - Platform-specific config file locations

pub mod config;
pub mod error;
pub mod resilience;

// Re-export main types for convenience
pub use config::{Config, Profile, WaitConfig};
pub use error::{ConfigError, Result};
pub use resilience::RetryConfig;
