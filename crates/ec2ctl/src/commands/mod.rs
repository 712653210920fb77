//! Command implementations, one module per command group

pub mod instance;
pub mod key_pair;
pub mod network;
pub mod profile;
pub mod shell;
pub mod template;
pub mod utils;
pub mod wait;
