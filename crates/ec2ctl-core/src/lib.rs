//! # ec2ctl-core
//!
//! Shared engine behind the `ec2ctl` CLI: profile configuration, a
//! provider abstraction over EC2, and the command executor that runs every
//! mutating operation as dry run, then real call, then optional polling
//! until the instance reaches its target state.
//!
//! ## Layers
//!
//! - [`provider`]: capability traits ([`InstanceApi`], [`KeyPairApi`],
//!   [`LaunchTemplateApi`], [`NetworkApi`])
//! - [`aws`]: [`AwsEc2`], the `aws-sdk-ec2` implementation
//! - [`validation`]: the shared dry-run check and bounded retry
//! - [`executor`]: [`CommandExecutor`] for start / stop / reboot / terminate
//! - [`ec2`]: launch, template, key pair workflows and JSON dumps
//! - [`config`]: TOML profiles
//!
//! ## Example
//!
//! ```rust,ignore
//! use ec2ctl_core::{AwsEc2, ClientSettings, CommandExecutor, OperationKind, OperationRequest, ResourceId};
//!
//! let provider = AwsEc2::connect(&ClientSettings::default()).await;
//! let executor = CommandExecutor::new(provider);
//!
//! let request = OperationRequest::new(ResourceId::new("i-0abc")?, OperationKind::Start).wait(true);
//! let outcome = executor.try_execute(&request).await?;
//! println!("{} after {} polls", outcome.target_state, outcome.polls);
//! ```

pub mod aws;
pub mod config;
pub mod ec2;
pub mod error;
pub mod executor;
pub mod models;
pub mod progress;
pub mod provider;
pub mod types;
pub mod validation;

pub use aws::{AwsEc2, ClientSettings, DEFAULT_REGION};
pub use config::{Config, ConfigError, Profile, RetryConfig, WaitConfig};
pub use error::{CoreError, ExecutorError, ProviderError, Result};
pub use executor::{CommandExecutor, PollReport, WaitSettings};
pub use progress::{ProgressCallback, ProgressEvent};
pub use provider::{
    Ec2Provider, InstanceApi, KeyPairApi, LaunchTemplateApi, NetworkApi, ProviderResult,
};
pub use types::{
    InstanceLifecycle, OperationKind, OperationOutcome, OperationParams, OperationRequest,
    ResourceId, ResourceState, StatusCheck, TargetState,
};
pub use validation::{Attempted, RetryPolicy, validate_then_apply};
