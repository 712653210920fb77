//! Launch template command implementations, including the interactive wizard

use std::collections::BTreeMap;

use dialoguer::{Confirm, Input, Select};
use ec2ctl_core::ec2::{self, COMMON_INSTANCE_TYPES};
use ec2ctl_core::models::{LaunchTemplateSpec, ShutdownBehavior, TemplateFilter};
use ec2ctl_core::{KeyPairApi, LaunchTemplateApi, NetworkApi, ResourceId};
use serde_json::json;
use tracing::debug;

use crate::cli::{OutputFormat, TemplateCommands, TemplateCreateArgs};
use crate::commands::utils::{aws_error, note, print_result, success_mark};
use crate::connection::{ConnectionManager, Ec2Session};
use crate::error::{Ec2CtlError, Result as CliResult};
use crate::output::{self, print_output};

const MANUAL_IMAGE: &str = "Enter an AMI id";
const NO_KEY_PAIR: &str = "(no key pair)";

pub async fn handle_template_command(
    cmd: &TemplateCommands,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    let session = conn_mgr.connect(profile_name).await?;

    match cmd {
        TemplateCommands::Create(args) => {
            let spec = if args.interactive {
                match run_wizard(&session).await? {
                    Some(spec) => spec,
                    None => {
                        note("Template creation cancelled.");
                        return Ok(());
                    }
                }
            } else {
                spec_from_args(args)?
            };

            let created =
                ec2::create_launch_template(&session.provider, &spec, &session.retry_policy())
                    .await?;
            if output_format.is_structured() || query.is_some() {
                return print_result(&created, output_format, query);
            }
            println!(
                "{} Created launch template '{}' ({})",
                success_mark(),
                created.launch_template_name,
                created.launch_template_id
            );
            Ok(())
        }
        TemplateCommands::Delete { name } => {
            let deleted =
                ec2::delete_launch_template(&session.provider, name, &session.retry_policy())
                    .await?;
            if output_format.is_structured() || query.is_some() {
                return print_result(&deleted, output_format, query);
            }
            println!(
                "{} Deleted launch template '{}' ({})",
                success_mark(),
                deleted.launch_template_name,
                deleted.launch_template_id
            );
            Ok(())
        }
        TemplateCommands::List { names, ids } => {
            let filter = TemplateFilter::from_lists(names.clone(), ids.clone());
            let templates = session
                .provider
                .describe_launch_templates(&filter)
                .await
                .map_err(aws_error("DescribeLaunchTemplates", "launch templates"))?;
            print_result(&templates, output_format, query)
        }
        TemplateCommands::Data { instance_id } => {
            let id = ResourceId::new(instance_id.as_str())?;
            let data = session
                .provider
                .launch_template_data(&id)
                .await
                .map_err(aws_error("GetLaunchTemplateData", instance_id.as_str()))?;
            print_result(&data, output_format, query)
        }
    }
}

/// Build a template spec from command-line flags
fn spec_from_args(args: &TemplateCreateArgs) -> CliResult<LaunchTemplateSpec> {
    let name = args
        .name
        .as_deref()
        .map(|name| name.trim().to_string())
        .ok_or_else(|| Ec2CtlError::InvalidInput {
            message: "a template name is required without --interactive".to_string(),
        })?;
    let image_id = args.image_id.clone().ok_or_else(|| Ec2CtlError::InvalidInput {
        message: "--image-id is required without --interactive".to_string(),
    })?;
    let shutdown_behavior: ShutdownBehavior = args.shutdown_behavior.parse()?;

    let spec = LaunchTemplateSpec {
        name,
        version_description: args.description.clone(),
        image_id,
        instance_type: args.instance_type.clone(),
        key_name: args.key_name.clone(),
        security_group_ids: args.security_group_ids.clone(),
        associate_public_ip: args.public_ip,
        availability_zone: args.availability_zone.clone(),
        shutdown_behavior,
        tags: args.tags.iter().cloned().collect(),
    };
    spec.validate()?;
    Ok(spec)
}

/// Labels for the AMI menu: profile images, then manual entry
fn image_choices(images: &BTreeMap<String, String>) -> Vec<String> {
    images
        .iter()
        .map(|(name, id)| format!("{} ({})", name, id))
        .chain(std::iter::once(MANUAL_IMAGE.to_string()))
        .collect()
}

fn validate_template_name(name: &str) -> Result<(), String> {
    let name = name.trim();
    if name.len() < 3 || name.len() > 128 {
        return Err("must be 3 to 128 characters".to_string());
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '(' | ')' | '.' | '-' | '/' | '_'))
    {
        return Err("may only contain letters, digits, and ( ) . - / _".to_string());
    }
    Ok(())
}

/// Ask for every setting; `None` when the user declines at the end
async fn run_wizard(session: &Ec2Session) -> CliResult<Option<LaunchTemplateSpec>> {
    let provider = &session.provider;

    let name: String = Input::new()
        .with_prompt("Template name")
        .validate_with(|input: &String| validate_template_name(input))
        .interact_text()?;
    let name = name.trim().to_string();

    let type_index = Select::new()
        .with_prompt("Instance type")
        .items(COMMON_INSTANCE_TYPES)
        .default(0)
        .interact()?;
    let instance_type = COMMON_INSTANCE_TYPES[type_index].to_string();

    let images: Vec<(&String, &String)> = session.profile.images.iter().collect();
    let image_index = Select::new()
        .with_prompt("Machine image")
        .items(&image_choices(&session.profile.images)[..])
        .default(0)
        .interact()?;
    let image_id = match images.get(image_index) {
        Some((_, id)) => (*id).clone(),
        None => Input::new()
            .with_prompt("AMI id")
            .validate_with(|input: &String| {
                if input.starts_with("ami-") {
                    Ok(())
                } else {
                    Err("must start with ami-")
                }
            })
            .interact_text()?,
    };

    let associate_public_ip = Confirm::new()
        .with_prompt("Associate a public IP address?")
        .default(true)
        .interact()?;

    let groups = provider
        .describe_security_groups()
        .await
        .map_err(aws_error("DescribeSecurityGroups", "security groups"))?;
    let security_group_ids = if groups.is_empty() {
        note("No security groups found; the VPC default applies.");
        Vec::new()
    } else {
        let labels: Vec<String> = groups
            .iter()
            .map(|g| format!("{} ({})", g.group_name, g.group_id))
            .collect();
        let index = Select::new()
            .with_prompt("Security group")
            .items(&labels[..])
            .default(0)
            .interact()?;
        vec![groups[index].group_id.clone()]
    };

    let zones = provider
        .describe_availability_zones()
        .await
        .map_err(aws_error("DescribeAvailabilityZones", session.region()))?;
    let availability_zone = if zones.is_empty() {
        None
    } else {
        let labels: Vec<&str> = zones.iter().map(|z| z.zone_name.as_str()).collect();
        let index = Select::new()
            .with_prompt("Availability zone")
            .items(&labels[..])
            .default(0)
            .interact()?;
        Some(zones[index].zone_name.clone())
    };

    let keys = provider
        .describe_key_pairs()
        .await
        .map_err(aws_error("DescribeKeyPairs", "all key pairs"))?;
    let mut key_labels: Vec<&str> = keys.iter().map(|k| k.key_name.as_str()).collect();
    key_labels.push(NO_KEY_PAIR);
    let key_index = Select::new()
        .with_prompt("Key pair")
        .items(&key_labels[..])
        .default(0)
        .interact()?;
    let key_name = keys.get(key_index).map(|k| k.key_name.clone());

    let behaviors = [ShutdownBehavior::Stop, ShutdownBehavior::Terminate];
    let behavior_index = Select::new()
        .with_prompt("On OS shutdown")
        .items(&behaviors[..])
        .default(0)
        .interact()?;

    let mut tags = BTreeMap::new();
    if Confirm::new()
        .with_prompt("Add a tag?")
        .default(false)
        .interact()?
    {
        let key: String = Input::new().with_prompt("Tag key").interact_text()?;
        let value: String = Input::new()
            .with_prompt("Tag value")
            .allow_empty(true)
            .interact_text()?;
        tags.insert(key, value);
    }

    let spec = LaunchTemplateSpec {
        name,
        version_description: None,
        image_id,
        instance_type,
        key_name,
        security_group_ids,
        associate_public_ip,
        availability_zone,
        shutdown_behavior: behaviors[behavior_index],
        tags,
    };
    debug!(?spec, "Wizard finished");

    println!();
    print_output(
        json!({
            "name": spec.name,
            "image_id": spec.image_id,
            "instance_type": spec.instance_type,
            "key_name": spec.key_name,
            "security_group_ids": spec.security_group_ids,
            "associate_public_ip": spec.associate_public_ip,
            "availability_zone": spec.availability_zone,
            "shutdown_behavior": spec.shutdown_behavior.as_str(),
            "tags": spec.tags,
        }),
        output::OutputFormat::Table,
        None,
    )?;

    let create = Confirm::new()
        .with_prompt("Create this launch template?")
        .default(true)
        .interact()?;
    Ok(create.then_some(spec))
}
