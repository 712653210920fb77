//! Execute-with-validation and bounded retry
//!
//! Every mutating EC2 call goes through [`validate_then_apply`]: the call is
//! first issued as a dry run, and only when EC2 answers that it would have
//! succeeded is the real call issued. The real call is then retried on
//! transient failures according to a [`RetryPolicy`].

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::error::{ExecutorError, ProviderError};
use crate::provider::ProviderResult;

/// Bounded retry with capped doubling backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    /// A single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    pub fn new(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            max_backoff: max_backoff.max(initial_backoff),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the given failed attempt (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        if !config.enabled {
            return Self::none();
        }
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.backoff_ms),
            Duration::from_millis(config.max_backoff_ms),
        )
    }
}

/// A value together with the number of attempts it took
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: u32,
}

impl<T, E> Attempted<Result<T, E>> {
    /// Move the attempt count inside the `Ok` side
    pub fn into_result(self) -> Result<Attempted<T>, E> {
        let attempts = self.attempts;
        self.value.map(|value| Attempted { value, attempts })
    }
}

/// Run `call` until it succeeds, fails non-transiently, or the policy runs out
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    action: &str,
    mut call: F,
) -> Attempted<ProviderResult<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<T>>,
{
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => {
                return Attempted {
                    value: Ok(value),
                    attempts: attempt,
                };
            }
            Err(err) if err.is_transient() && attempt < policy.max_attempts() => {
                let delay = policy.backoff_for(attempt);
                warn!(
                    action,
                    attempt,
                    max_attempts = policy.max_attempts(),
                    error = %err,
                    "Transient failure, retrying in {:?}",
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                return Attempted {
                    value: Err(err),
                    attempts: attempt,
                };
            }
        }
    }
}

/// Interpret the result of a dry-run call
///
/// `DryRunOperation` (or a plain success) means the real call may proceed.
/// A permission denial becomes [`ExecutorError::PermissionDenied`]; any other
/// failure becomes [`ExecutorError::Provider`].
pub fn check_dry_run<T>(
    action: &str,
    resource: &str,
    result: ProviderResult<T>,
) -> Result<(), ExecutorError> {
    match result {
        Ok(_) => {
            debug!(action, resource, "Dry run returned success without the dry-run signal");
            Ok(())
        }
        Err(err) if err.is_dry_run_success() => {
            debug!(action, resource, "Dry run passed");
            Ok(())
        }
        Err(err) if err.is_permission_denied() => Err(ExecutorError::PermissionDenied {
            action: action.to_string(),
            resource: resource.to_string(),
            message: err.message,
        }),
        Err(err) => Err(ExecutorError::provider(action, resource, err)),
    }
}

/// Dry run, then the real call under the retry policy
///
/// `call(true)` must issue the validate-only form of the call and
/// `call(false)` the real one. The real call is never issued when the dry run
/// fails. `attempts` counts real-call attempts only.
pub async fn validate_then_apply<T, F, Fut>(
    action: &str,
    resource: &str,
    policy: &RetryPolicy,
    mut call: F,
) -> Attempted<Result<T, ExecutorError>>
where
    F: FnMut(bool) -> Fut,
    Fut: Future<Output = ProviderResult<T>>,
{
    if let Err(err) = check_dry_run(action, resource, call(true).await) {
        return Attempted {
            value: Err(err),
            attempts: 0,
        };
    }

    let applied = with_retry(policy, action, || call(false)).await;
    Attempted {
        value: applied
            .value
            .map_err(|err: ProviderError| ExecutorError::provider(action, resource, err)),
        attempts: applied.attempts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    /// Replays canned results and records every dry-run flag it sees
    struct Script {
        results: Mutex<Vec<ProviderResult<&'static str>>>,
        calls: Mutex<Vec<bool>>,
    }

    impl Script {
        fn new(mut results: Vec<ProviderResult<&'static str>>) -> Self {
            results.reverse();
            Self {
                results: Mutex::new(results),
                calls: Mutex::new(Vec::new()),
            }
        }

        async fn call(&self, dry_run: bool) -> ProviderResult<&'static str> {
            self.calls.lock().unwrap().push(dry_run);
            self.results
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Ok("default"))
        }

        fn calls(&self) -> Vec<bool> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn dry_ok() -> ProviderResult<&'static str> {
        Err(ProviderError::service("DryRunOperation", "would succeed"))
    }

    fn throttled() -> ProviderResult<&'static str> {
        Err(ProviderError::service("RequestLimitExceeded", "slow down"))
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100), Duration::from_millis(350));
        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(350));
        assert_eq!(policy.backoff_for(30), Duration::from_millis(350));
    }

    #[test]
    fn test_policy_from_config() {
        let policy = RetryPolicy::from(&RetryConfig::default());
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.backoff_for(1), Duration::from_millis(200));

        let disabled = RetryConfig {
            enabled: false,
            ..Default::default()
        };
        assert_eq!(RetryPolicy::from(&disabled), RetryPolicy::none());

        let zero = RetryConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(RetryPolicy::from(&zero).max_attempts(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_signal_proceeds_to_real_call() {
        let script = Script::new(vec![dry_ok(), Ok("done")]);
        let applied = validate_then_apply("StartInstances", "i-1", &fast(3), |dry| script.call(dry))
            .await
            .into_result()
            .unwrap();

        assert_eq!(applied.value, "done");
        assert_eq!(applied.attempts, 1);
        assert_eq!(script.calls(), vec![true, false]);
    }

    #[tokio::test]
    async fn test_plain_dry_run_success_also_proceeds() {
        let script = Script::new(vec![Ok("validated"), Ok("done")]);
        let applied = validate_then_apply("StopInstances", "i-1", &fast(1), |dry| script.call(dry))
            .await
            .into_result()
            .unwrap();
        assert_eq!(applied.value, "done");
    }

    #[tokio::test]
    async fn test_permission_denied_skips_real_call() {
        let script = Script::new(vec![Err(ProviderError::service(
            "UnauthorizedOperation",
            "You are not authorized to perform this operation.",
        ))]);
        let applied =
            validate_then_apply("TerminateInstances", "i-1", &fast(3), |dry| script.call(dry)).await;

        assert_eq!(applied.attempts, 0);
        let err = applied.value.unwrap_err();
        assert!(err.is_permission_denied());
        assert_eq!(script.calls(), vec![true]);
    }

    #[tokio::test]
    async fn test_other_dry_run_failure_skips_real_call() {
        let script = Script::new(vec![Err(ProviderError::service(
            "InvalidInstanceID.Malformed",
            "Invalid id",
        ))]);
        let applied =
            validate_then_apply("StartInstances", "i-bad", &fast(3), |dry| script.call(dry)).await;

        let err = applied.value.unwrap_err();
        assert!(matches!(err, ExecutorError::Provider { .. }));
        assert_eq!(script.calls(), vec![true]);
    }

    #[tokio::test]
    async fn test_transient_real_call_retried_until_success() {
        let script = Script::new(vec![dry_ok(), throttled(), throttled(), Ok("done")]);
        let applied = validate_then_apply("StartInstances", "i-1", &fast(3), |dry| script.call(dry))
            .await
            .into_result()
            .unwrap();

        assert_eq!(applied.attempts, 3);
        assert_eq!(script.calls(), vec![true, false, false, false]);
    }

    #[tokio::test]
    async fn test_retry_budget_exhausted() {
        let script = Script::new(vec![dry_ok(), throttled(), throttled(), throttled()]);
        let applied =
            validate_then_apply("StartInstances", "i-1", &fast(2), |dry| script.call(dry)).await;

        assert_eq!(applied.attempts, 2);
        assert!(applied.value.unwrap_err().is_retryable());
        assert_eq!(script.calls(), vec![true, false, false]);
    }

    #[tokio::test]
    async fn test_non_transient_failure_not_retried() {
        let script = Script::new(vec![
            dry_ok(),
            Err(ProviderError::service("IncorrectInstanceState", "cannot stop")),
        ]);
        let applied =
            validate_then_apply("StopInstances", "i-1", &fast(5), |dry| script.call(dry)).await;

        assert_eq!(applied.attempts, 1);
        assert!(applied.value.is_err());
    }

    #[tokio::test]
    async fn test_with_retry_retries_transport_errors() {
        let script = Script::new(vec![Err(ProviderError::transport("connection reset")), Ok("ok")]);
        let attempted = with_retry(&fast(3), "DescribeInstanceStatus", || script.call(false)).await;
        assert_eq!(attempted.attempts, 2);
        assert_eq!(attempted.value.unwrap(), "ok");
    }
}
