//! Profile management command implementations

use colored::Colorize;
use ec2ctl_core::Profile;
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::{OutputFormat, ProfileCommands, ProfileSetArgs};
use crate::commands::utils::{confirm_action, print_result};
use crate::connection::ConnectionManager;
use crate::error::{Ec2CtlError, Result as CliResult};

/// Handle profile management commands
pub async fn handle_profile_command(
    profile_cmd: &ProfileCommands,
    conn_mgr: &ConnectionManager,
    region: Option<&str>,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    use ProfileCommands::*;

    match profile_cmd {
        List => handle_list(conn_mgr, output_format, query),
        Path => handle_path(conn_mgr, output_format),
        Show { name } => handle_show(conn_mgr, name, output_format, query),
        Set(args) => handle_set(conn_mgr, args, region),
        Remove { name, yes } => handle_remove(conn_mgr, name, *yes),
        Default { name } => handle_default(conn_mgr, name),
        Validate => handle_validate(conn_mgr, output_format),
    }
}

#[derive(Debug, Serialize)]
struct ProfileListEntry<'a> {
    name: &'a str,
    is_default: bool,
    region: Option<&'a str>,
    aws_profile: Option<&'a str>,
    endpoint_url: Option<&'a str>,
}

fn handle_list(
    conn_mgr: &ConnectionManager,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    let profiles = conn_mgr.config.list_profiles();
    debug!("Found {} profiles", profiles.len());

    if profiles.is_empty() && !output_format.is_structured() {
        println!("No profiles configured.");
        println!("Create one with: ec2ctl profile set <name> --region <region>");
        return Ok(());
    }

    let default = conn_mgr.config.default_profile.as_deref();
    let entries: Vec<ProfileListEntry> = profiles
        .iter()
        .map(|(name, profile)| ProfileListEntry {
            name,
            is_default: default == Some(name.as_str()),
            region: profile.region.as_deref(),
            aws_profile: profile.aws_profile.as_deref(),
            endpoint_url: profile.endpoint_url.as_deref(),
        })
        .collect();

    print_result(&entries, output_format, query)
}

fn handle_path(conn_mgr: &ConnectionManager, output_format: OutputFormat) -> CliResult<()> {
    let config_path = conn_mgr.config_file()?;

    if output_format.is_structured() {
        let data = serde_json::json!({ "config_path": config_path.display().to_string() });
        print_result(data, output_format, None)
    } else {
        println!("{}", config_path.display());
        Ok(())
    }
}

fn handle_show(
    conn_mgr: &ConnectionManager,
    name: &str,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    let profile = conn_mgr
        .config
        .profiles
        .get(name)
        .ok_or_else(|| Ec2CtlError::ProfileNotFound { name: name.into() })?;

    let mut data = serde_json::to_value(profile)?;
    if let Some(obj) = data.as_object_mut() {
        obj.insert("name".to_string(), name.into());
        obj.insert(
            "is_default".to_string(),
            (conn_mgr.config.default_profile.as_deref() == Some(name)).into(),
        );
    }
    print_result(data, output_format, query)
}

/// Merge the given flags into a new or existing profile
fn apply_set_args(mut profile: Profile, args: &ProfileSetArgs, region: Option<&str>) -> Profile {
    if let Some(region) = region {
        profile.region = Some(region.to_string());
    }
    if let Some(aws_profile) = &args.aws_profile {
        profile.aws_profile = Some(aws_profile.clone());
    }
    if let Some(endpoint_url) = &args.endpoint_url {
        profile.endpoint_url = Some(endpoint_url.clone());
    }
    if let Some(output_dir) = &args.output_dir {
        profile.output_dir = Some(output_dir.clone());
    }
    if let Some(interval) = args.wait_interval {
        profile.wait.interval_secs = interval;
    }
    if let Some(timeout) = args.wait_timeout {
        profile.wait.timeout_secs = timeout;
    }
    if let Some(attempts) = args.retry_attempts {
        profile.retry.enabled = true;
        profile.retry.max_attempts = attempts;
    }
    if args.no_retry {
        profile.retry.enabled = false;
    }
    for (name, id) in &args.images {
        profile.images.insert(name.clone(), id.clone());
    }
    profile
}

fn handle_set(
    conn_mgr: &ConnectionManager,
    args: &ProfileSetArgs,
    region: Option<&str>,
) -> CliResult<()> {
    let mut config = conn_mgr.config.clone();
    let existing = config.profiles.get(&args.name).cloned();
    let is_new = existing.is_none();

    let profile = apply_set_args(existing.unwrap_or_default(), args, region);
    profile.validate(&args.name)?;

    config.set_profile(args.name.clone(), profile);
    if args.default || config.default_profile.is_none() {
        config.default_profile = Some(args.name.clone());
    }
    conn_mgr.save_config(&config)?;

    info!("Saved profile '{}'", args.name);
    if is_new {
        println!("Profile '{}' created successfully.", args.name);
    } else {
        println!("Profile '{}' updated successfully.", args.name);
    }
    if config.default_profile.as_deref() == Some(args.name.as_str()) {
        println!("Profile '{}' is the default profile.", args.name);
    }
    Ok(())
}

fn handle_remove(conn_mgr: &ConnectionManager, name: &str, yes: bool) -> CliResult<()> {
    debug!("Removing profile: {}", name);

    if !conn_mgr.config.profiles.contains_key(name) {
        return Err(Ec2CtlError::ProfileNotFound { name: name.into() });
    }

    let is_default = conn_mgr.config.default_profile.as_deref() == Some(name);
    if is_default {
        println!("Warning: '{}' is the default profile.", name);
    }

    if !yes && !confirm_action(&format!("remove profile '{}'", name))? {
        println!("Profile removal cancelled.");
        return Ok(());
    }

    let mut config = conn_mgr.config.clone();
    config.remove_profile(name);
    conn_mgr.save_config(&config)?;

    if is_default {
        println!("Default profile cleared.");
    }
    println!("Profile '{}' removed successfully.", name);
    Ok(())
}

fn handle_default(conn_mgr: &ConnectionManager, name: &str) -> CliResult<()> {
    if !conn_mgr.config.profiles.contains_key(name) {
        return Err(Ec2CtlError::ProfileNotFound { name: name.into() });
    }

    let mut config = conn_mgr.config.clone();
    config.default_profile = Some(name.to_string());
    conn_mgr.save_config(&config)?;

    println!("Default profile set to '{}'.", name);
    Ok(())
}

#[derive(Debug, Serialize)]
struct ValidationOutput {
    config_path: String,
    config_exists: bool,
    profile_count: usize,
    profiles: Vec<ProfileValidation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_profile: Option<DefaultValidation>,
    overall_valid: bool,
}

#[derive(Debug, Serialize)]
struct ProfileValidation {
    name: String,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct DefaultValidation {
    name: String,
    valid: bool,
}

fn handle_validate(conn_mgr: &ConnectionManager, output_format: OutputFormat) -> CliResult<()> {
    let config_path = conn_mgr.config_file()?;
    let config_exists = config_path.exists();

    let profiles: Vec<ProfileValidation> = conn_mgr
        .config
        .list_profiles()
        .into_iter()
        .map(|(name, profile)| {
            let error = profile.validate(name).err().map(|e| e.to_string());
            ProfileValidation {
                name: name.clone(),
                valid: error.is_none(),
                error,
            }
        })
        .collect();

    let default_profile = conn_mgr
        .config
        .default_profile
        .as_ref()
        .map(|name| DefaultValidation {
            name: name.clone(),
            valid: conn_mgr.config.profiles.contains_key(name),
        });

    let overall_valid = config_exists
        && profiles.iter().all(|p| p.valid)
        && default_profile.as_ref().is_none_or(|d| d.valid);

    let result = ValidationOutput {
        config_path: config_path.display().to_string(),
        config_exists,
        profile_count: profiles.len(),
        profiles,
        default_profile,
        overall_valid,
    };

    if output_format.is_structured() {
        print_result(&result, output_format, None)
    } else {
        print_validation_human(&result);
        Ok(())
    }
}

fn print_validation_human(result: &ValidationOutput) {
    println!("Configuration file: {}", result.config_path);

    if !result.config_exists {
        println!("{} Configuration file does not exist", "x".red());
        println!("\nTry:");
        println!("  Create a profile: ec2ctl profile set <name> --region <region>");
        return;
    }

    println!("{} Configuration file exists and is readable", "ok".green());
    println!("{} Found {} profile(s)", "ok".green(), result.profile_count);
    println!();

    for p in &result.profiles {
        match &p.error {
            None => println!("Profile '{}': {}", p.name, "ok".green()),
            Some(error) => println!("Profile '{}': {} {}", p.name, "x".red(), error),
        }
    }

    if let Some(default) = &result.default_profile {
        println!();
        if default.valid {
            println!("{} Default profile: {}", "ok".green(), default.name);
        } else {
            println!(
                "{} Default profile '{}' does not exist",
                "x".red(),
                default.name
            );
        }
    }

    println!();
    if result.overall_valid {
        println!("{} Configuration is valid", "ok".green());
    } else {
        println!("{} Configuration has problems", "x".red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_args(name: &str) -> ProfileSetArgs {
        ProfileSetArgs {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_apply_keeps_unset_fields() {
        let existing = Profile {
            region: Some("us-west-2".to_string()),
            aws_profile: Some("work".to_string()),
            ..Default::default()
        };
        let mut args = set_args("work");
        args.wait_timeout = Some(900);

        let profile = apply_set_args(existing, &args, None);
        assert_eq!(profile.region.as_deref(), Some("us-west-2"));
        assert_eq!(profile.aws_profile.as_deref(), Some("work"));
        assert_eq!(profile.wait.timeout_secs, 900);
        assert_eq!(profile.wait.interval_secs, 15);
    }

    #[test]
    fn test_apply_region_and_images() {
        let mut args = set_args("seoul");
        args.images = vec![("Amazon Linux 2023".to_string(), "ami-0aaa".to_string())];

        let profile = apply_set_args(Profile::default(), &args, Some("ap-northeast-2"));
        assert_eq!(profile.region.as_deref(), Some("ap-northeast-2"));
        assert_eq!(profile.images["Amazon Linux 2023"], "ami-0aaa");
    }

    #[test]
    fn test_apply_retry_flags() {
        let mut args = set_args("strict");
        args.no_retry = true;
        assert!(!apply_set_args(Profile::default(), &args, None).retry.enabled);

        let mut args = set_args("patient");
        args.retry_attempts = Some(5);
        let profile = apply_set_args(Profile::default(), &args, None);
        assert!(profile.retry.enabled);
        assert_eq!(profile.retry.max_attempts, 5);
    }
}
