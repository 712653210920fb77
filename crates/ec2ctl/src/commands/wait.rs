//! Spinner output for operations that poll instance state
//!
//! The core executor reports progress through a callback; this turns the
//! events into spinner messages on stderr.

use std::time::Duration;

use ec2ctl_core::{ProgressCallback, ProgressEvent};
use indicatif::{ProgressBar, ProgressStyle};

/// A spinner, or nothing when output is structured or stderr is not a terminal
pub fn spinner(enabled: bool, message: &str) -> Option<ProgressBar> {
    if !enabled {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message(message.to_string());
    Some(pb)
}

/// Callback that mirrors executor events on `pb`
pub fn progress_callback(pb: &ProgressBar) -> ProgressCallback {
    let pb = pb.clone();
    Box::new(move |event: ProgressEvent| pb.set_message(describe_event(&event)))
}

/// One-line description of a progress event
pub fn describe_event(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::Validated { resource, kind } => {
            format!("{}: dry run for {} passed", resource, kind.api_name())
        }
        ProgressEvent::Submitted { resource, kind, .. } => {
            format!("{} {}", kind.verb(), resource)
        }
        ProgressEvent::Polling {
            resource,
            expected,
            observed,
            poll,
            max_polls,
            ..
        } => format!(
            "{}: {} (waiting for {}, poll {}/{})",
            resource,
            format_state(observed),
            expected,
            poll,
            max_polls
        ),
        ProgressEvent::Reached { resource, state, .. } => {
            format!("{}: {}", resource, format_state(state.as_str()))
        }
        ProgressEvent::Failed { resource, error } => format!("{} failed: {}", resource, error),
    }
}

/// Prefix a state with an icon
fn format_state(state: &str) -> String {
    let lifecycle = state.split_whitespace().next().unwrap_or(state);
    match lifecycle {
        "running" | "status-ok" | "stopped" | "terminated" => format!("\u{2713} {}", state),
        "pending" | "stopping" | "shutting-down" => format!("\u{21bb} {}", state),
        "not" => format!("\u{2298} {}", state),
        _ => state.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ec2ctl_core::{OperationKind, ResourceId, TargetState};

    fn instance() -> ResourceId {
        ResourceId::new("i-0abc").unwrap()
    }

    #[test]
    fn test_format_state_icons() {
        assert!(format_state("running").starts_with('\u{2713}'));
        assert!(format_state("stopping").starts_with('\u{21bb}'));
        assert!(format_state("running (status: initializing)").contains("initializing"));
        assert_eq!(format_state("rebooting"), "rebooting");
    }

    #[test]
    fn test_polling_event_shows_budget() {
        let message = describe_event(&ProgressEvent::Polling {
            resource: instance(),
            expected: TargetState::Stopped,
            observed: "stopping".to_string(),
            poll: 3,
            max_polls: 40,
            elapsed: Duration::from_secs(30),
        });
        assert!(message.contains("i-0abc"));
        assert!(message.contains("poll 3/40"));
        assert!(message.contains("stopped"));
    }

    #[test]
    fn test_submitted_event_uses_verb() {
        let message = describe_event(&ProgressEvent::Submitted {
            resource: instance(),
            kind: OperationKind::Reboot,
            attempts: 1,
        });
        assert_eq!(message, "Rebooting i-0abc");
    }

    #[test]
    fn test_disabled_spinner() {
        assert!(spinner(false, "waiting").is_none());
    }
}
