//! Error types for ec2ctl
//!
//! Core errors are mapped onto a small set of user-facing variants, each of
//! which knows what to suggest next.

use colored::Colorize;
use ec2ctl_core::{ConfigError, CoreError, ExecutorError};
use thiserror::Error;

/// Cargo-style diagnostic formatter for CLI errors.
///
/// Produces structured output like:
/// ```text
/// error: UnauthorizedOperation: You are not authorized to perform this operation.
///
///   tip: check the IAM policy attached to your credentials
/// ```
pub struct CliDiagnostic {
    message: String,
    detail: Option<String>,
    tips: Vec<(String, Vec<String>)>,
}

impl CliDiagnostic {
    pub fn error(message: &str) -> Self {
        Self {
            message: message.to_string(),
            detail: None,
            tips: Vec::new(),
        }
    }

    /// Add a detail line below the error message.
    pub fn detail(mut self, text: &str) -> Self {
        self.detail = Some(text.to_string());
        self
    }

    /// Add a tip with optional example commands.
    pub fn tip(mut self, description: &str, commands: &[&str]) -> Self {
        self.tips.push((
            description.to_string(),
            commands.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    pub fn print(&self) {
        eprint!("{}{}", "error".red().bold(), ": ".bold());
        eprintln!("{}", self.message);

        if let Some(detail) = &self.detail {
            eprintln!("  {}", detail);
        }

        for (description, commands) in &self.tips {
            eprintln!();
            eprint!("  {}{}", "tip".yellow().bold(), ": ".bold());
            eprintln!("{}", description);
            for cmd in commands {
                eprintln!("      {}", cmd);
            }
        }
    }
}

/// Main error type for the ec2ctl application
#[derive(Error, Debug)]
pub enum Ec2CtlError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("AWS error: {message}")]
    Aws { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Timeout: {message}")]
    Timeout { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("File error for '{path}': {message}")]
    FileError { path: String, message: String },

    #[error("Output formatting error: {message}")]
    OutputError { message: String },

    #[error("{failed} of {total} operations failed")]
    OperationsFailed { failed: usize, total: usize },
}

/// Result type for ec2ctl operations
pub type Result<T> = std::result::Result<T, Ec2CtlError>;

impl Ec2CtlError {
    /// Get helpful suggestions for resolving this error
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Ec2CtlError::ProfileNotFound { name } => vec![
                "List available profiles: ec2ctl profile list".to_string(),
                format!("Create profile '{}': ec2ctl profile set {} --region <region>", name, name),
            ],
            Ec2CtlError::PermissionDenied { .. } => vec![
                "Check the IAM policy attached to your credentials".to_string(),
                "Confirm which AWS profile is in use: ec2ctl profile show <profile>".to_string(),
            ],
            Ec2CtlError::Aws { message } if message.contains("credentials") => vec![
                "Configure credentials with 'aws configure' or AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY".to_string(),
                "Point the profile at a named AWS profile: ec2ctl profile set <name> --aws-profile <aws-profile>".to_string(),
            ],
            Ec2CtlError::Aws { message } if message.contains("dispatch failure") => vec![
                "Check network connectivity".to_string(),
                "Verify the region and endpoint: ec2ctl profile show <profile>".to_string(),
            ],
            Ec2CtlError::NotFound { .. } => vec![
                "List instance ids: ec2ctl instance ids".to_string(),
                "Check that you are using the right region: --region <region>".to_string(),
            ],
            Ec2CtlError::Timeout { .. } => vec![
                "Raise the limit: --wait-timeout <seconds>".to_string(),
                "Check the current state: ec2ctl instance status <id>".to_string(),
            ],
            Ec2CtlError::InvalidInput { .. } => vec![
                "Check the command syntax: ec2ctl <command> --help".to_string(),
            ],
            Ec2CtlError::FileError { path, .. } => vec![
                format!("Check the path and permissions of {}", path),
                "Choose another directory: --output-dir <dir>".to_string(),
            ],
            Ec2CtlError::OperationsFailed { .. } => vec![
                "Re-run with -v to see each failure".to_string(),
            ],
            _ => vec![],
        }
    }

    /// Print a cargo-style diagnostic to stderr using colored formatting.
    pub fn print_diagnostic(&self) {
        let mut diag = CliDiagnostic::error(&self.to_string());
        if let Ec2CtlError::OperationsFailed { .. } = self {
            diag = diag.detail("per-instance results are listed above");
        }

        for suggestion in self.suggestions() {
            diag = diag.tip(&suggestion, &[]);
        }

        diag.print();
    }
}

impl From<ExecutorError> for Ec2CtlError {
    fn from(err: ExecutorError) -> Self {
        match &err {
            ExecutorError::PermissionDenied { .. } => Ec2CtlError::PermissionDenied {
                message: err.to_string(),
            },
            ExecutorError::PollTimeout { .. } => Ec2CtlError::Timeout {
                message: err.to_string(),
            },
            ExecutorError::InvalidRequest(message) => Ec2CtlError::InvalidInput {
                message: message.clone(),
            },
            _ if err.is_not_found() => Ec2CtlError::NotFound {
                message: err.to_string(),
            },
            _ => Ec2CtlError::Aws {
                message: err.to_string(),
            },
        }
    }
}

impl From<CoreError> for Ec2CtlError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Executor(e) => Ec2CtlError::from(e),
            CoreError::Config(e) => Ec2CtlError::from(e),
            CoreError::Io { path, source } => Ec2CtlError::FileError {
                path,
                message: source.to_string(),
            },
            CoreError::Serialize(e) => Ec2CtlError::OutputError {
                message: e.to_string(),
            },
            CoreError::Validation(message) if message.ends_with("not found") => {
                Ec2CtlError::NotFound { message }
            }
            CoreError::Validation(message) => Ec2CtlError::InvalidInput { message },
        }
    }
}

impl From<ConfigError> for Ec2CtlError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ProfileNotFound { name } => Ec2CtlError::ProfileNotFound { name },
            other => Ec2CtlError::Config(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Ec2CtlError {
    fn from(err: serde_json::Error) -> Self {
        Ec2CtlError::OutputError {
            message: format!("JSON error: {}", err),
        }
    }
}

impl From<std::io::Error> for Ec2CtlError {
    fn from(err: std::io::Error) -> Self {
        Ec2CtlError::OutputError {
            message: format!("IO error: {}", err),
        }
    }
}

impl From<dialoguer::Error> for Ec2CtlError {
    fn from(err: dialoguer::Error) -> Self {
        Ec2CtlError::InvalidInput {
            message: format!("prompt failed: {}", err),
        }
    }
}

impl From<anyhow::Error> for Ec2CtlError {
    fn from(err: anyhow::Error) -> Self {
        Ec2CtlError::OutputError {
            message: format!("{:#}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ec2ctl_core::{ProviderError, ResourceId, TargetState};
    use std::time::Duration;

    fn instance() -> ResourceId {
        ResourceId::new("i-0abc").unwrap()
    }

    #[test]
    fn test_permission_denied_maps_to_permission_variant() {
        let err = Ec2CtlError::from(ExecutorError::PermissionDenied {
            action: "StopInstances".to_string(),
            resource: "i-0abc".to_string(),
            message: "not authorized".to_string(),
        });
        assert!(matches!(err, Ec2CtlError::PermissionDenied { .. }));
        assert!(!err.suggestions().is_empty());
    }

    #[test]
    fn test_poll_timeout_maps_to_timeout() {
        let err = Ec2CtlError::from(ExecutorError::PollTimeout {
            resource: instance(),
            expected: TargetState::Running,
            last_observed: "pending".to_string(),
            polls: 40,
            timeout: Duration::from_secs(600),
        });
        assert!(matches!(err, Ec2CtlError::Timeout { .. }));
        assert!(err.suggestions().iter().any(|s| s.contains("--wait-timeout")));
    }

    #[test]
    fn test_not_found_provider_error() {
        let err = Ec2CtlError::from(ExecutorError::provider(
            "StartInstances",
            "i-0abc",
            ProviderError::service("InvalidInstanceID.NotFound", "does not exist"),
        ));
        assert!(matches!(err, Ec2CtlError::NotFound { .. }));
    }

    #[test]
    fn test_throttling_maps_to_aws() {
        let err = Ec2CtlError::from(ExecutorError::provider(
            "StartInstances",
            "i-0abc",
            ProviderError::service("RequestLimitExceeded", "slow down"),
        ));
        assert!(matches!(err, Ec2CtlError::Aws { .. }));
    }

    #[test]
    fn test_core_validation_errors() {
        let missing = Ec2CtlError::from(CoreError::Validation("instance i-9 not found".to_string()));
        assert!(matches!(missing, Ec2CtlError::NotFound { .. }));

        let bad = Ec2CtlError::from(CoreError::Validation("min count must be at least 1".to_string()));
        assert!(matches!(bad, Ec2CtlError::InvalidInput { .. }));
    }

    #[test]
    fn test_profile_not_found_keeps_name() {
        let err = Ec2CtlError::from(ConfigError::ProfileNotFound {
            name: "prod".to_string(),
        });
        match &err {
            Ec2CtlError::ProfileNotFound { name } => assert_eq!(name, "prod"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(err.suggestions()[1].contains("ec2ctl profile set prod"));
    }
}
