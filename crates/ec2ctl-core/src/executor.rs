//! Command executor: dry run, real call, then poll for the target state
//!
//! ```rust,ignore
//! use ec2ctl_core::{CommandExecutor, OperationKind, OperationRequest, ResourceId};
//!
//! let executor = CommandExecutor::new(provider)
//!     .with_wait(WaitSettings::from(&profile.wait))
//!     .with_retry(RetryPolicy::from(&profile.retry));
//!
//! let request = OperationRequest::new(ResourceId::new("i-0abc")?, OperationKind::Stop).wait(true);
//! let outcome = executor.execute(&request).await;
//! assert!(outcome.terminal_state_reached);
//! ```

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::WaitConfig;
use crate::error::ExecutorError;
use crate::progress::{ProgressCallback, ProgressEvent, emit};
use crate::provider::InstanceApi;
use crate::types::{OperationOutcome, OperationRequest, ResourceId, ResourceState, TargetState};
use crate::validation::{RetryPolicy, validate_then_apply, with_retry};

const STATE_QUERY: &str = "DescribeInstanceStatus";

/// Fixed-interval polling budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl WaitSettings {
    /// A zero interval falls back to the default polling interval
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        let interval = if interval.is_zero() {
            WaitConfig::default().interval()
        } else {
            interval
        };
        Self { interval, timeout }
    }

    /// `max(1, timeout / interval)`
    pub fn max_polls(&self) -> u32 {
        let interval = self.interval.as_millis().max(1);
        let polls = self.timeout.as_millis() / interval;
        u32::try_from(polls).unwrap_or(u32::MAX).max(1)
    }
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self::from(&WaitConfig::default())
    }
}

impl From<&WaitConfig> for WaitSettings {
    fn from(config: &WaitConfig) -> Self {
        Self::new(config.interval(), config.timeout())
    }
}

/// What polling observed before it stopped
#[derive(Debug)]
pub struct PollReport {
    pub polls: u32,
    pub last: Option<ResourceState>,
    pub result: Result<(), ExecutorError>,
}

/// Runs [`OperationRequest`]s against an [`InstanceApi`], one at a time
pub struct CommandExecutor<P> {
    provider: P,
    retry: RetryPolicy,
    wait: WaitSettings,
    on_progress: Option<ProgressCallback>,
}

impl<P: InstanceApi> CommandExecutor<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            retry: RetryPolicy::default(),
            wait: WaitSettings::default(),
            on_progress: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_wait(mut self, wait: WaitSettings) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn wait_settings(&self) -> WaitSettings {
        self.wait
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Run one operation to completion; every failure is reported in the outcome
    #[tracing::instrument(skip_all, fields(kind = %request.kind, resource = %request.resource_id))]
    pub async fn execute(&self, request: &OperationRequest) -> OperationOutcome {
        let mut outcome = OperationOutcome::pending(request);
        let id = &request.resource_id;
        let action = request.kind.api_name();

        info!("{} {}", request.kind.verb(), id);

        let applied = validate_then_apply(action, id.as_str(), &self.retry, |dry_run| {
            self.provider.instance_action(request, dry_run)
        })
        .await;
        outcome.attempts = applied.attempts;

        if applied.attempts > 0 {
            emit(
                &self.on_progress,
                ProgressEvent::Validated {
                    resource: id.clone(),
                    kind: request.kind,
                },
            );
        }

        if let Err(err) = applied.value {
            return self.fail(outcome, err);
        }

        emit(
            &self.on_progress,
            ProgressEvent::Submitted {
                resource: id.clone(),
                kind: request.kind,
                attempts: applied.attempts,
            },
        );

        if !request.params.wait {
            outcome.succeeded = true;
            return outcome;
        }

        let report = self.poll_until(id, request.target_state()).await;
        outcome.polls = report.polls;
        outcome.final_state = report.last.as_ref().map(ResourceState::describe);

        match report.result {
            Ok(()) => {
                outcome.succeeded = true;
                outcome.terminal_state_reached = true;
                outcome
            }
            Err(err) => self.fail(outcome, err),
        }
    }

    /// Like [`execute`](Self::execute), but failures come back as `Err`
    pub async fn try_execute(
        &self,
        request: &OperationRequest,
    ) -> Result<OperationOutcome, ExecutorError> {
        self.execute(request).await.into_result()
    }

    /// Poll until `id` reaches `target`, without issuing any mutating call
    pub async fn wait_for(
        &self,
        id: &ResourceId,
        target: TargetState,
    ) -> Result<ResourceState, ExecutorError> {
        let report = self.poll_until(id, target).await;
        report.result?;
        Ok(report.last.unwrap_or_default())
    }

    /// Poll at a fixed interval, at most `max_polls` times
    pub async fn poll_until(&self, id: &ResourceId, target: TargetState) -> PollReport {
        let max_polls = self.wait.max_polls();
        let start = Instant::now();
        let mut last: Option<ResourceState> = None;

        for poll in 1..=max_polls {
            let observed =
                with_retry(&self.retry, STATE_QUERY, || self.provider.resource_state(id)).await;
            let state = match observed.value {
                Ok(state) => state,
                Err(err) => {
                    return PollReport {
                        polls: poll,
                        last,
                        result: Err(ExecutorError::provider(STATE_QUERY, id.as_str(), err)),
                    };
                }
            };

            debug!(poll, max_polls, observed = %state.describe(), expected = %target, "Polled state");
            emit(
                &self.on_progress,
                ProgressEvent::Polling {
                    resource: id.clone(),
                    expected: target,
                    observed: state.describe(),
                    poll,
                    max_polls,
                    elapsed: start.elapsed(),
                },
            );

            if target.is_reached(&state) {
                info!(polls = poll, "{} is {}", id, target);
                emit(
                    &self.on_progress,
                    ProgressEvent::Reached {
                        resource: id.clone(),
                        state: target,
                        polls: poll,
                    },
                );
                return PollReport {
                    polls: poll,
                    last: Some(state),
                    result: Ok(()),
                };
            }

            if target.is_unreachable(&state) {
                let observed = state.describe();
                return PollReport {
                    polls: poll,
                    last: Some(state),
                    result: Err(ExecutorError::StateUnreachable {
                        resource: id.clone(),
                        expected: target,
                        observed,
                    }),
                };
            }

            last = Some(state);
            if poll < max_polls {
                tokio::time::sleep(self.wait.interval).await;
            }
        }

        let last_observed = last
            .as_ref()
            .map(ResourceState::describe)
            .unwrap_or_else(|| "unknown".to_string());
        PollReport {
            polls: max_polls,
            last,
            result: Err(ExecutorError::PollTimeout {
                resource: id.clone(),
                expected: target,
                last_observed,
                polls: max_polls,
                timeout: self.wait.timeout,
            }),
        }
    }

    fn fail(&self, mut outcome: OperationOutcome, err: ExecutorError) -> OperationOutcome {
        warn!(error = %err, "Operation failed");
        emit(
            &self.on_progress,
            ProgressEvent::Failed {
                resource: outcome.resource_id.clone(),
                error: err.to_string(),
            },
        );
        outcome.error = Some(err);
        outcome
    }
}
