//! EC2 workflows - multi-step operations
//!
//! These compose provider calls with validation, the dry-run check, and
//! local file output.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::ec2::dump::dump_resources;
use crate::error::{CoreError, ExecutorError, ProviderError, Result};
use crate::executor::CommandExecutor;
use crate::models::{
    CreatedKeyPair, InstanceStatusSummary, InstanceSummary, LaunchRequest, LaunchTemplateSpec,
    LaunchTemplateSummary,
};
use crate::provider::{InstanceApi, KeyPairApi, LaunchTemplateApi};
use crate::types::{OperationOutcome, OperationRequest, ResourceId, TargetState};
use crate::validation::{Attempted, RetryPolicy, validate_then_apply};

/// Instance types offered by the interactive template wizard
pub const COMMON_INSTANCE_TYPES: &[&str] = &[
    "t2.micro",
    "t2.small",
    "t2.medium",
    "t3.nano",
    "t3.micro",
    "t3.small",
    "t3.medium",
    "t3.large",
    "m5.large",
    "m5.xlarge",
    "c5.large",
    "r5.large",
];

fn query_failed(action: &'static str, resource: &str) -> impl FnOnce(ProviderError) -> CoreError {
    let resource = resource.to_string();
    move |err| ExecutorError::provider(action, resource, err).into()
}

/// Ids of every instance in the region
pub async fn instance_ids<P: InstanceApi>(provider: &P) -> Result<Vec<String>> {
    let instances = provider
        .describe_instances(&[])
        .await
        .map_err(query_failed("DescribeInstances", "all instances"))?;
    Ok(instances.into_iter().map(|i| i.instance_id).collect())
}

/// Describe every instance, or only `id`
pub async fn describe_instances<P: InstanceApi>(
    provider: &P,
    id: Option<&ResourceId>,
) -> Result<Vec<InstanceSummary>> {
    match id {
        Some(id) => Ok(vec![find_instance(provider, id).await?]),
        None => provider
            .describe_instances(&[])
            .await
            .map_err(query_failed("DescribeInstances", "all instances")),
    }
}

/// Describe one instance, failing if it does not exist
pub async fn find_instance<P: InstanceApi>(provider: &P, id: &ResourceId) -> Result<InstanceSummary> {
    let mut instances = provider
        .describe_instances(&[id.to_string()])
        .await
        .map_err(query_failed("DescribeInstances", id.as_str()))?;
    if instances.is_empty() {
        return Err(CoreError::Validation(format!("instance {id} not found")));
    }
    Ok(instances.swap_remove(0))
}

/// Current state and status checks of one instance
pub async fn instance_status<P: InstanceApi>(
    provider: &P,
    id: &ResourceId,
) -> Result<InstanceStatusSummary> {
    provider
        .instance_statuses(&[id.to_string()])
        .await
        .map_err(query_failed("DescribeInstanceStatus", id.as_str()))?
        .into_iter()
        .next()
        .ok_or_else(|| CoreError::Validation(format!("instance {id} not found")))
}

/// Idempotency token shared by every attempt of one create call
fn client_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Launch instances from a template, after a dry run
pub async fn launch_instances<P: InstanceApi>(
    provider: &P,
    request: &LaunchRequest,
    retry: &RetryPolicy,
) -> Result<Attempted<Vec<InstanceSummary>>> {
    request.validate()?;

    let token = client_token();
    let launched = validate_then_apply("RunInstances", &request.template_name, retry, |dry_run| {
        provider.run_instances(request, &token, dry_run)
    })
    .await
    .into_result()?;

    info!(
        template = %request.template_name,
        count = launched.value.len(),
        "Launched instances"
    );
    Ok(launched)
}

/// Instances from one launch, after saving and optional waiting
#[derive(Debug)]
pub struct LaunchedInstances {
    pub instances: Vec<InstanceSummary>,
    pub attempts: u32,
    pub dumps: Vec<PathBuf>,
    /// Instances that did not reach `running`
    pub wait_failures: Vec<ExecutorError>,
}

/// Launch, save each instance as `<id>.json`, then optionally wait for `running`
///
/// The dumps are written before any waiting starts, so every launched id is
/// on disk even when a wait fails. Each instance is waited for in turn and a
/// failure does not stop the rest. After waiting the instances are described
/// again and the dumps rewritten with the addresses assigned at start.
pub async fn launch_and_save<P: InstanceApi>(
    executor: &CommandExecutor<P>,
    request: &LaunchRequest,
    dir: &Path,
    region: &str,
    wait: bool,
) -> Result<LaunchedInstances> {
    let provider = executor.provider();
    let launched = launch_instances(provider, request, &executor.retry_policy()).await?;
    let mut instances = launched.value;
    let mut dumps = save_instances(dir, region, &instances)?;

    let mut wait_failures = Vec::new();
    if !wait {
        return Ok(LaunchedInstances {
            instances,
            attempts: launched.attempts,
            dumps,
            wait_failures,
        });
    }

    for instance in &instances {
        let id = ResourceId::new(instance.instance_id.as_str())?;
        if let Err(err) = executor.wait_for(&id, TargetState::Running).await {
            warn!(instance = %id, error = %err, "Launched instance did not reach running");
            wait_failures.push(err);
        }
    }

    let ids: Vec<String> = instances.iter().map(|i| i.instance_id.clone()).collect();
    match provider.describe_instances(&ids).await {
        Ok(refreshed) if !refreshed.is_empty() => {
            instances = refreshed;
            dumps = save_instances(dir, region, &instances)?;
        }
        Ok(_) => debug!("No launched instances left to describe"),
        Err(err) => warn!(error = %err, "Could not refresh launched instances"),
    }

    Ok(LaunchedInstances {
        instances,
        attempts: launched.attempts,
        dumps,
        wait_failures,
    })
}

fn save_instances(dir: &Path, region: &str, instances: &[InstanceSummary]) -> Result<Vec<PathBuf>> {
    instances
        .iter()
        .map(|instance| {
            dump_resources(dir, Some(instance.instance_id.as_str()), region, instance)
        })
        .collect()
}

/// Create a launch template, after a dry run
pub async fn create_launch_template<P: LaunchTemplateApi>(
    provider: &P,
    spec: &LaunchTemplateSpec,
    retry: &RetryPolicy,
) -> Result<LaunchTemplateSummary> {
    spec.validate()?;

    let token = client_token();
    let created = validate_then_apply("CreateLaunchTemplate", &spec.name, retry, |dry_run| {
        provider.create_launch_template(spec, &token, dry_run)
    })
    .await
    .into_result()?;

    info!(
        template = %spec.name,
        id = %created.value.launch_template_id,
        "Created launch template"
    );
    Ok(created.value)
}

/// Delete a launch template by name, after a dry run
pub async fn delete_launch_template<P: LaunchTemplateApi>(
    provider: &P,
    name: &str,
    retry: &RetryPolicy,
) -> Result<LaunchTemplateSummary> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation(
            "launch template name must not be empty".to_string(),
        ));
    }

    let deleted = validate_then_apply("DeleteLaunchTemplate", name, retry, |dry_run| {
        provider.delete_launch_template(name, dry_run)
    })
    .await
    .into_result()?;

    info!(template = %name, "Deleted launch template");
    Ok(deleted.value)
}

/// A created key pair and where its private key was written
#[derive(Debug)]
pub struct SavedKeyPair {
    pub key: CreatedKeyPair,
    pub path: PathBuf,
}

/// Path of the private key file for `name` inside `dir`
pub fn key_file_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.pem"))
}

/// Create a key pair and write its private key to `<dir>/<name>.pem`
///
/// An existing file is never overwritten; the check happens before the key
/// pair is created. If writing still fails, the new key pair is deleted again.
pub async fn create_key_pair_file<P: KeyPairApi>(
    provider: &P,
    name: &str,
    dir: &Path,
) -> Result<SavedKeyPair> {
    if name.trim().is_empty() || name.contains(['/', '\\']) {
        return Err(CoreError::Validation(format!(
            "invalid key pair name '{name}'"
        )));
    }

    let path = key_file_path(dir, name);
    if path.exists() {
        return Err(CoreError::Validation(format!(
            "{} already exists",
            path.display()
        )));
    }

    let key = provider
        .create_key_pair(name)
        .await
        .map_err(query_failed("CreateKeyPair", name))?;

    if let Err(err) = write_private_key(&path, &key.key_material) {
        // The material exists nowhere else, so the key pair is useless.
        match provider.delete_key_pair(&key.key_name).await {
            Ok(()) => info!(key = %key.key_name, "Deleted key pair after failed write"),
            Err(delete_err) => warn!(
                key = %key.key_name,
                error = %delete_err,
                "Could not delete key pair after failed write"
            ),
        }
        return Err(err);
    }
    info!(key = %key.key_name, path = %path.display(), "Saved private key");

    Ok(SavedKeyPair { key, path })
}

fn write_private_key(path: &Path, material: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| CoreError::io(parent.display().to_string(), e))?;
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .map_err(|e| CoreError::io(path.display().to_string(), e))?;
    file.write_all(material.as_bytes())
        .map_err(|e| CoreError::io(path.display().to_string(), e))?;
    Ok(())
}

/// Run operations one after another, each to completion
pub async fn run_operations<P: InstanceApi>(
    executor: &CommandExecutor<P>,
    requests: &[OperationRequest],
) -> Vec<OperationOutcome> {
    let mut outcomes = Vec::with_capacity(requests.len());
    for request in requests {
        outcomes.push(executor.execute(request).await);
    }
    outcomes
}
