//! Shared helpers for command implementations

use colored::Colorize;
use ec2ctl_core::{ExecutorError, ProviderError, ResourceId};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::{Ec2CtlError, Result as CliResult};
use crate::output::print_output;

/// Print a result in the selected format, applying the query
pub fn print_result<T: Serialize>(
    data: T,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    print_output(data, output_format.resolve(query), query)?;
    Ok(())
}

/// Map a failed provider query to a CLI error
pub fn aws_error(
    action: &'static str,
    resource: impl Into<String>,
) -> impl FnOnce(ProviderError) -> Ec2CtlError {
    let resource = resource.into();
    move |err| Ec2CtlError::from(ExecutorError::provider(action, resource, err))
}

pub fn parse_ids(ids: &[String]) -> CliResult<Vec<ResourceId>> {
    ids.iter()
        .map(|id| ResourceId::new(id.as_str()).map_err(Ec2CtlError::from))
        .collect()
}

/// Ask before doing something that cannot be undone
pub fn confirm_action(message: &str) -> CliResult<bool> {
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(format!("Are you sure you want to {}?", message))
        .default(false)
        .interact()?;
    Ok(confirmed)
}

pub fn success_mark() -> String {
    "\u{2713}".green().to_string()
}

pub fn failure_mark() -> String {
    "\u{2717}".red().to_string()
}

/// Print a progress note to stderr so stdout stays parseable
pub fn note(message: impl std::fmt::Display) {
    eprintln!("{}", message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ids_trims_and_rejects_empty() {
        let ids = parse_ids(&["i-1".to_string(), " i-2 ".to_string()]).unwrap();
        assert_eq!(ids[1].as_str(), "i-2");

        let err = parse_ids(&["i-1".to_string(), "  ".to_string()]).unwrap_err();
        assert!(matches!(err, Ec2CtlError::InvalidInput { .. }));
    }

    #[test]
    fn test_aws_error_keeps_action_and_code() {
        let err = aws_error("DeleteKeyPair", "deploy")(ProviderError::service(
            "InvalidKeyPair.NotFound",
            "The key pair 'deploy' does not exist",
        ));
        assert!(matches!(err, Ec2CtlError::NotFound { .. }));
        assert!(err.to_string().contains("DeleteKeyPair"));
    }
}
