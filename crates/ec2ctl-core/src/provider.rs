//! Capability traits a cloud provider implements
//!
//! Every mutating call takes a `dry_run` flag. With `dry_run = true` a
//! provider must only check permissions and report the outcome; EC2 does this
//! by answering with the `DryRunOperation` error code when the call would
//! have succeeded.
//!
//! Creating calls also take a client token. Every attempt of one logical
//! operation, dry run included, carries the same token so EC2 can recognise
//! a resent request instead of creating a second resource.
//!
//! [`AwsEc2`](crate::aws::AwsEc2) implements all four traits. Tests implement
//! only the ones they need.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::models::{
    CreatedKeyPair, InstanceStatusSummary, InstanceSummary, KeyPairInfo, LaunchRequest,
    LaunchTemplateSpec, LaunchTemplateSummary, SecurityGroupSummary, SubnetSummary, TemplateData,
    TemplateFilter, VpcSummary, ZoneSummary,
};
use crate::types::{OperationRequest, ResourceId, ResourceState};

/// Result type for a single provider call
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Instance lifecycle operations and queries
#[async_trait]
pub trait InstanceApi: Send + Sync {
    /// Start, stop, reboot, or terminate one instance
    async fn instance_action(&self, request: &OperationRequest, dry_run: bool)
    -> ProviderResult<()>;

    /// Current lifecycle state and status check of one instance.
    ///
    /// An instance the provider no longer knows is reported as
    /// [`ResourceState::gone`], not as an error.
    async fn resource_state(&self, id: &ResourceId) -> ProviderResult<ResourceState>;

    /// Describe the given instances, or every instance when `ids` is empty
    async fn describe_instances(&self, ids: &[String]) -> ProviderResult<Vec<InstanceSummary>>;

    /// State and status checks, or those of every instance when `ids` is empty
    async fn instance_statuses(&self, ids: &[String])
    -> ProviderResult<Vec<InstanceStatusSummary>>;

    /// Launch instances from a launch template
    async fn run_instances(
        &self,
        launch: &LaunchRequest,
        client_token: &str,
        dry_run: bool,
    ) -> ProviderResult<Vec<InstanceSummary>>;
}

/// Key pair management
#[async_trait]
pub trait KeyPairApi: Send + Sync {
    async fn create_key_pair(&self, name: &str) -> ProviderResult<CreatedKeyPair>;

    async fn delete_key_pair(&self, name: &str) -> ProviderResult<()>;

    async fn describe_key_pairs(&self) -> ProviderResult<Vec<KeyPairInfo>>;
}

/// Launch template management
#[async_trait]
pub trait LaunchTemplateApi: Send + Sync {
    async fn create_launch_template(
        &self,
        spec: &LaunchTemplateSpec,
        client_token: &str,
        dry_run: bool,
    ) -> ProviderResult<LaunchTemplateSummary>;

    async fn delete_launch_template(
        &self,
        name: &str,
        dry_run: bool,
    ) -> ProviderResult<LaunchTemplateSummary>;

    async fn describe_launch_templates(
        &self,
        filter: &TemplateFilter,
    ) -> ProviderResult<Vec<LaunchTemplateSummary>>;

    /// Launch parameters of a running instance, usable as template data
    async fn launch_template_data(&self, instance_id: &ResourceId) -> ProviderResult<TemplateData>;
}

/// Read-only network lookups
#[async_trait]
pub trait NetworkApi: Send + Sync {
    async fn describe_vpcs(&self) -> ProviderResult<Vec<VpcSummary>>;

    async fn describe_subnets(&self) -> ProviderResult<Vec<SubnetSummary>>;

    async fn describe_security_groups(&self) -> ProviderResult<Vec<SecurityGroupSummary>>;

    async fn describe_availability_zones(&self) -> ProviderResult<Vec<ZoneSummary>>;
}

/// Everything the CLI needs from one provider
pub trait Ec2Provider: InstanceApi + KeyPairApi + LaunchTemplateApi + NetworkApi {}

impl<T> Ec2Provider for T where T: InstanceApi + KeyPairApi + LaunchTemplateApi + NetworkApi {}
