//! Shared types for instance operations
//!
//! An [`OperationRequest`] names one instance and one [`OperationKind`].
//! Each kind maps to exactly one [`TargetState`], and a [`ResourceState`]
//! observed from the provider either reaches that target, can still reach
//! it, or can never reach it.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{ExecutorError, ProviderError};

/// Opaque identifier of a cloud resource (an instance id for operations)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Result<Self, ExecutorError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ExecutorError::InvalidRequest(
                "resource id must not be empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ResourceId {
    type Err = ExecutorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Mutating instance operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Start,
    Stop,
    Reboot,
    Terminate,
}

impl OperationKind {
    pub const ALL: [OperationKind; 4] = [
        OperationKind::Start,
        OperationKind::Stop,
        OperationKind::Reboot,
        OperationKind::Terminate,
    ];

    /// The state an instance must reach for this operation to be complete
    pub fn target_state(self) -> TargetState {
        match self {
            OperationKind::Start => TargetState::Running,
            OperationKind::Stop => TargetState::Stopped,
            OperationKind::Reboot => TargetState::StatusOk,
            OperationKind::Terminate => TargetState::Terminated,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Start => "start",
            OperationKind::Stop => "stop",
            OperationKind::Reboot => "reboot",
            OperationKind::Terminate => "terminate",
        }
    }

    /// Present participle for progress messages
    pub fn verb(self) -> &'static str {
        match self {
            OperationKind::Start => "Starting",
            OperationKind::Stop => "Stopping",
            OperationKind::Reboot => "Rebooting",
            OperationKind::Terminate => "Terminating",
        }
    }

    /// EC2 API action name
    pub fn api_name(self) -> &'static str {
        match self {
            OperationKind::Start => "StartInstances",
            OperationKind::Stop => "StopInstances",
            OperationKind::Reboot => "RebootInstances",
            OperationKind::Terminate => "TerminateInstances",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = ExecutorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "start" => Ok(OperationKind::Start),
            "stop" => Ok(OperationKind::Stop),
            "reboot" => Ok(OperationKind::Reboot),
            "terminate" => Ok(OperationKind::Terminate),
            other => Err(ExecutorError::InvalidRequest(format!(
                "unknown operation '{other}'"
            ))),
        }
    }
}

/// Terminal state an operation waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetState {
    Running,
    Stopped,
    StatusOk,
    Terminated,
}

impl TargetState {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetState::Running => "running",
            TargetState::Stopped => "stopped",
            TargetState::StatusOk => "status-ok",
            TargetState::Terminated => "terminated",
        }
    }

    /// The observation satisfies this target
    pub fn is_reached(self, state: &ResourceState) -> bool {
        use InstanceLifecycle as L;

        match self {
            TargetState::Running => state.lifecycle == Some(L::Running),
            TargetState::Stopped => state.lifecycle == Some(L::Stopped),
            TargetState::StatusOk => {
                state.lifecycle == Some(L::Running) && state.status_check == Some(StatusCheck::Ok)
            }
            TargetState::Terminated => {
                state.is_gone() || state.lifecycle == Some(L::Terminated)
            }
        }
    }

    /// The observation can never transition into this target
    pub fn is_unreachable(self, state: &ResourceState) -> bool {
        use InstanceLifecycle as L;

        if self == TargetState::Terminated {
            return false;
        }
        // A fresh launch may not be visible yet; only a stop target gives up on it
        let Some(lifecycle) = &state.lifecycle else {
            return self == TargetState::Stopped;
        };
        match self {
            TargetState::Running => {
                matches!(lifecycle, L::Stopping | L::ShuttingDown | L::Terminated)
            }
            TargetState::Stopped => {
                matches!(lifecycle, L::Pending | L::ShuttingDown | L::Terminated)
            }
            TargetState::StatusOk => matches!(lifecycle, L::ShuttingDown | L::Terminated),
            TargetState::Terminated => false,
        }
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// EC2 instance lifecycle state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceLifecycle {
    Pending,
    Running,
    ShuttingDown,
    Terminated,
    Stopping,
    Stopped,
    Other(String),
}

impl InstanceLifecycle {
    pub fn from_name(name: &str) -> Self {
        match name {
            "pending" => Self::Pending,
            "running" => Self::Running,
            "shutting-down" => Self::ShuttingDown,
            "terminated" => Self::Terminated,
            "stopping" => Self::Stopping,
            "stopped" => Self::Stopped,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::ShuttingDown => "shutting-down",
            Self::Terminated => "terminated",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Other(other) => other,
        }
    }
}

impl fmt::Display for InstanceLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instance status check summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusCheck {
    Ok,
    Impaired,
    Initializing,
    InsufficientData,
    NotApplicable,
    Other(String),
}

impl StatusCheck {
    pub fn from_name(name: &str) -> Self {
        match name {
            "ok" => Self::Ok,
            "impaired" => Self::Impaired,
            "initializing" => Self::Initializing,
            "insufficient-data" => Self::InsufficientData,
            "not-applicable" => Self::NotApplicable,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Ok => "ok",
            Self::Impaired => "impaired",
            Self::Initializing => "initializing",
            Self::InsufficientData => "insufficient-data",
            Self::NotApplicable => "not-applicable",
            Self::Other(other) => other,
        }
    }
}

impl fmt::Display for StatusCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observation of an instance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceState {
    /// `None` when the provider no longer knows the instance
    pub lifecycle: Option<InstanceLifecycle>,
    pub status_check: Option<StatusCheck>,
}

impl ResourceState {
    pub fn new(lifecycle: InstanceLifecycle) -> Self {
        Self {
            lifecycle: Some(lifecycle),
            status_check: None,
        }
    }

    pub fn with_status(mut self, status: StatusCheck) -> Self {
        self.status_check = Some(status);
        self
    }

    pub fn gone() -> Self {
        Self::default()
    }

    pub fn is_gone(&self) -> bool {
        self.lifecycle.is_none()
    }

    /// Short human-readable form, e.g. `running (status: initializing)`
    pub fn describe(&self) -> String {
        match (&self.lifecycle, &self.status_check) {
            (None, _) => "not found".to_string(),
            (Some(lifecycle), None) => lifecycle.to_string(),
            (Some(lifecycle), Some(status)) => format!("{lifecycle} (status: {status})"),
        }
    }
}

/// Per-invocation options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationParams {
    /// Block until the target state is reached
    pub wait: bool,
    /// Forced stop; ignored by other operations
    pub force: bool,
}

/// A single mutating operation against one instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRequest {
    pub resource_id: ResourceId,
    pub kind: OperationKind,
    #[serde(default)]
    pub params: OperationParams,
}

impl OperationRequest {
    pub fn new(resource_id: ResourceId, kind: OperationKind) -> Self {
        Self {
            resource_id,
            kind,
            params: OperationParams::default(),
        }
    }

    pub fn wait(mut self, wait: bool) -> Self {
        self.params.wait = wait;
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.params.force = force;
        self
    }

    pub fn target_state(&self) -> TargetState {
        self.kind.target_state()
    }
}

/// Result of running one [`OperationRequest`] through the executor
#[derive(Debug, Clone, Serialize)]
pub struct OperationOutcome {
    pub resource_id: ResourceId,
    pub kind: OperationKind,
    pub target_state: TargetState,
    pub succeeded: bool,
    /// Only set when waiting was requested and the target was observed
    pub terminal_state_reached: bool,
    /// Last observed state, when polling ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_state: Option<String>,
    /// Real-call attempts, retries included
    pub attempts: u32,
    pub polls: u32,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_error"
    )]
    pub error: Option<ExecutorError>,
}

impl OperationOutcome {
    pub(crate) fn pending(request: &OperationRequest) -> Self {
        Self {
            resource_id: request.resource_id.clone(),
            kind: request.kind,
            target_state: request.target_state(),
            succeeded: false,
            terminal_state_reached: false,
            final_state: None,
            attempts: 0,
            polls: 0,
            error: None,
        }
    }

    /// Convert into a `Result`, discarding the counters on failure
    pub fn into_result(self) -> Result<Self, ExecutorError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }

    /// The provider error behind a failed outcome, if any
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match &self.error {
            Some(ExecutorError::Provider { source, .. }) => Some(source),
            _ => None,
        }
    }
}

fn serialize_error<S>(error: &Option<ExecutorError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match error {
        Some(err) => serializer.serialize_str(&err.to_string()),
        None => serializer.serialize_none(),
    }
}
