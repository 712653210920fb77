//! Unified error handling for ec2ctl-core
//!
//! Three layers:
//!
//! - [`ProviderError`] is what a provider call returns: the EC2 error code
//!   (if the service produced one), its message, and whether the failure is
//!   transient.
//! - [`ExecutorError`] is the taxonomy surfaced by the command executor and
//!   the validated workflows.
//! - [`CoreError`] wraps everything else the library can fail with.
//!
//! # Example
//!
//! ```rust
//! use ec2ctl_core::ProviderError;
//!
//! let err = ProviderError::service("UnauthorizedOperation", "You are not authorized");
//! assert!(err.is_permission_denied());
//! assert!(!err.is_transient());
//!
//! let err = ProviderError::service("DryRunOperation", "Request would have succeeded");
//! assert!(err.is_dry_run_success());
//! ```

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigError;
use crate::types::{ResourceId, TargetState};

/// Error code EC2 returns when a dry run would have succeeded
pub const DRY_RUN_OPERATION: &str = "DryRunOperation";

const PERMISSION_CODES: &[&str] = &["UnauthorizedOperation", "AuthFailure", "Blocked"];

const TRANSIENT_CODES: &[&str] = &[
    "RequestLimitExceeded",
    "Throttling",
    "ThrottlingException",
    "ServiceUnavailable",
    "Unavailable",
    "InternalError",
    "InternalFailure",
    "InsufficientInstanceCapacity",
];

/// Failure reported by a single provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    /// EC2 error code, absent for transport failures
    pub code: Option<String>,
    pub message: String,
    /// Set by the provider for failures known to be temporary (timeouts, dispatch)
    pub transient: bool,
}

impl ProviderError {
    /// An error returned by the EC2 service
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
            transient: false,
        }
    }

    /// A connection, timeout, or dispatch failure
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            transient: true,
        }
    }

    /// A failure that is neither a service error nor a transport error
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            transient: false,
        }
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// The dry run would have succeeded
    #[must_use]
    pub fn is_dry_run_success(&self) -> bool {
        self.code() == Some(DRY_RUN_OPERATION)
    }

    /// The caller lacks permission for the action
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        match self.code() {
            Some(code) => PERMISSION_CODES.contains(&code) || code.starts_with("AccessDenied"),
            None => false,
        }
    }

    /// The resource does not exist (`InvalidInstanceID.NotFound` and friends)
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.code().is_some_and(|code| code.ends_with(".NotFound"))
    }

    /// Worth retrying: throttling, service-side failures, transport errors
    #[must_use]
    pub fn is_transient(&self) -> bool {
        if self.transient {
            return true;
        }
        match self.code() {
            Some(code) => TRANSIENT_CODES.contains(&code) || code.starts_with("RequestTimeout"),
            None => false,
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}: {}", code, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Errors surfaced by the command executor and validated workflows
#[derive(Error, Debug, Clone)]
pub enum ExecutorError {
    /// The dry run was rejected for lack of permission; the real call was never issued
    #[error("Permission denied for {action} on {resource}: {message}")]
    PermissionDenied {
        action: String,
        resource: String,
        message: String,
    },

    /// The provider rejected the call, or the retry budget ran out
    #[error("{action} failed for {resource}: {source}")]
    Provider {
        action: String,
        resource: String,
        #[source]
        source: ProviderError,
    },

    /// The resource did not reach the target state within the poll budget
    #[error(
        "Timed out after {polls} polls ({timeout:?}) waiting for {resource} to become {expected} (last observed: {last_observed})"
    )]
    PollTimeout {
        resource: ResourceId,
        expected: TargetState,
        last_observed: String,
        polls: u32,
        timeout: Duration,
    },

    /// The observed state can never transition to the target state
    #[error("{resource} can no longer become {expected}: it is {observed}")]
    StateUnreachable {
        resource: ResourceId,
        expected: TargetState,
        observed: String,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ExecutorError {
    pub fn provider(
        action: impl Into<String>,
        resource: impl Into<String>,
        source: ProviderError,
    ) -> Self {
        Self::Provider {
            action: action.into(),
            resource: resource.into(),
            source,
        }
    }

    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, ExecutorError::PermissionDenied { .. })
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecutorError::PollTimeout { .. })
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ExecutorError::Provider { source, .. } if source.is_not_found())
    }

    /// Returns true if running the same request again could succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            ExecutorError::Provider { source, .. } => source.is_transient(),
            ExecutorError::PollTimeout { .. } => true,
            _ => false,
        }
    }
}

/// Core error type for everything outside the executor
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Validation error (bad ids, counts, template names)
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true if this is a "not found" error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            CoreError::Executor(e) => e.is_not_found(),
            CoreError::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Returns true if this is an authorization error
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, CoreError::Executor(e) if e.is_permission_denied())
    }

    /// Returns true if this is a timeout error
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, CoreError::Executor(e) if e.is_timeout())
    }

    /// Returns true if this is a bad request error
    #[must_use]
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            CoreError::Validation(_) | CoreError::Executor(ExecutorError::InvalidRequest(_))
        )
    }

    /// Returns true if this error is potentially retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Executor(e) if e.is_retryable())
    }
}
