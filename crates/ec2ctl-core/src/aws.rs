//! EC2 provider backed by `aws-sdk-ec2`
//!
//! Credentials come from the AWS default provider chain. SDK-level retries
//! are disabled: [`RetryPolicy`](crate::validation::RetryPolicy) is the only
//! retry layer.

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ec2::Client;
use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ec2::primitives::{DateTime, DateTimeFormat};
use aws_sdk_ec2::types as ec2;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use crate::config::Profile;
use crate::error::ProviderError;
use crate::models::{
    CreatedKeyPair, InstanceStatusSummary, InstanceSummary, KeyPairInfo, LaunchRequest,
    LaunchTemplateSpec, LaunchTemplateSummary, SecurityGroupSummary, SubnetSummary, TemplateData,
    TemplateFilter, VpcSummary, ZoneSummary,
};
use crate::provider::{InstanceApi, KeyPairApi, LaunchTemplateApi, NetworkApi, ProviderResult};
use crate::types::{
    InstanceLifecycle, OperationKind, OperationRequest, ResourceId, ResourceState, StatusCheck,
};

/// Region used when neither flags, profile, nor the AWS config chain name one
pub const DEFAULT_REGION: &str = "ap-northeast-2";

/// How to build the SDK client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientSettings {
    pub region: Option<String>,
    pub aws_profile: Option<String>,
    pub endpoint_url: Option<String>,
}

impl ClientSettings {
    /// Profile values, with an explicit region taking precedence
    pub fn from_profile(profile: &Profile, region_override: Option<String>) -> Self {
        Self {
            region: region_override.or_else(|| profile.region.clone()),
            aws_profile: profile.aws_profile.clone(),
            endpoint_url: profile.endpoint_url.clone(),
        }
    }
}

/// [`InstanceApi`], [`KeyPairApi`], [`LaunchTemplateApi`] and [`NetworkApi`] over EC2
#[derive(Debug, Clone)]
pub struct AwsEc2 {
    client: Client,
    region: String,
}

impl AwsEc2 {
    /// Resolve region and credentials, then build the client
    pub async fn connect(settings: &ClientSettings) -> Self {
        let region = RegionProviderChain::first_try(settings.region.clone().map(Region::new))
            .or_default_provider()
            .or_else(Region::new(DEFAULT_REGION));

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(region)
            .retry_config(RetryConfig::disabled());
        if let Some(profile) = &settings.aws_profile {
            loader = loader.profile_name(profile);
        }
        if let Some(url) = &settings.endpoint_url {
            loader = loader.endpoint_url(url);
        }

        let sdk_config = loader.load().await;
        let region = sdk_config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        debug!(%region, profile = ?settings.aws_profile, "Built EC2 client");

        Self {
            client: Client::new(&sdk_config),
            region,
        }
    }

    /// Wrap an already configured client
    pub fn from_client(client: Client) -> Self {
        let region = client
            .config()
            .region()
            .map(|r| r.to_string())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        Self { client, region }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Map an SDK failure onto a [`ProviderError`]
fn provider_error<E, R>(err: SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    if let Some(service) = err.as_service_error()
        && let Some(code) = service.code()
    {
        return ProviderError::service(code, service.message().unwrap_or(code));
    }

    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
            ProviderError::transport(DisplayErrorContext(&err).to_string())
        }
        _ => ProviderError::other(DisplayErrorContext(&err).to_string()),
    }
}

fn format_time(time: Option<&DateTime>) -> Option<String> {
    time.and_then(|t| t.fmt(DateTimeFormat::DateTime).ok())
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

fn tag_map(tags: &[ec2::Tag]) -> BTreeMap<String, String> {
    tags.iter()
        .filter_map(|tag| {
            Some((
                tag.key()?.to_string(),
                tag.value().unwrap_or_default().to_string(),
            ))
        })
        .collect()
}

fn instance_summary(instance: &ec2::Instance) -> InstanceSummary {
    let tags = tag_map(instance.tags());
    InstanceSummary {
        instance_id: instance.instance_id().unwrap_or_default().to_string(),
        name: tags.get("Name").cloned(),
        instance_type: instance.instance_type().map(|t| t.as_str().to_string()),
        state: instance
            .state()
            .and_then(|s| s.name())
            .map(|n| n.as_str().to_string()),
        image_id: non_empty(instance.image_id()),
        key_name: non_empty(instance.key_name()),
        availability_zone: instance
            .placement()
            .and_then(|p| non_empty(p.availability_zone())),
        private_ip: non_empty(instance.private_ip_address()),
        public_ip: non_empty(instance.public_ip_address()),
        public_dns: non_empty(instance.public_dns_name()),
        vpc_id: non_empty(instance.vpc_id()),
        subnet_id: non_empty(instance.subnet_id()),
        launch_time: format_time(instance.launch_time()),
        tags,
    }
}

fn template_summary(template: &ec2::LaunchTemplate) -> LaunchTemplateSummary {
    LaunchTemplateSummary {
        launch_template_id: template.launch_template_id().unwrap_or_default().to_string(),
        launch_template_name: template
            .launch_template_name()
            .unwrap_or_default()
            .to_string(),
        default_version: template.default_version_number(),
        latest_version: template.latest_version_number(),
        created_by: non_empty(template.created_by()),
        create_time: format_time(template.create_time()),
    }
}

fn template_request_data(spec: &LaunchTemplateSpec) -> ec2::RequestLaunchTemplateData {
    let mut interface = ec2::LaunchTemplateInstanceNetworkInterfaceSpecificationRequest::builder()
        .device_index(0)
        .associate_public_ip_address(spec.associate_public_ip)
        .delete_on_termination(true);
    if !spec.security_group_ids.is_empty() {
        interface = interface.set_groups(Some(spec.security_group_ids.clone()));
    }

    let mut data = ec2::RequestLaunchTemplateData::builder()
        .image_id(&spec.image_id)
        .instance_type(ec2::InstanceType::from(spec.instance_type.as_str()))
        .network_interfaces(interface.build())
        .disable_api_termination(false)
        .instance_initiated_shutdown_behavior(ec2::ShutdownBehavior::from(
            spec.shutdown_behavior.as_str(),
        ));

    if let Some(key_name) = &spec.key_name {
        data = data.key_name(key_name);
    }
    if let Some(zone) = &spec.availability_zone {
        data = data.placement(
            ec2::LaunchTemplatePlacementRequest::builder()
                .availability_zone(zone)
                .tenancy(ec2::Tenancy::Default)
                .build(),
        );
    }
    if !spec.tags.is_empty() {
        let tags = spec
            .tags
            .iter()
            .map(|(key, value)| ec2::Tag::builder().key(key).value(value).build())
            .collect();
        data = data.tag_specifications(
            ec2::LaunchTemplateTagSpecificationRequest::builder()
                .resource_type(ec2::ResourceType::Instance)
                .set_tags(Some(tags))
                .build(),
        );
    }

    data.build()
}

fn template_data(data: &ec2::ResponseLaunchTemplateData) -> TemplateData {
    let mut security_group_ids: Vec<String> = data.security_group_ids().to_vec();
    for interface in data.network_interfaces() {
        for group in interface.groups() {
            if !security_group_ids.contains(group) {
                security_group_ids.push(group.clone());
            }
        }
    }

    let tags = data
        .tag_specifications()
        .iter()
        .flat_map(|spec| tag_map(spec.tags()))
        .collect();

    TemplateData {
        image_id: non_empty(data.image_id()),
        instance_type: data.instance_type().map(|t| t.as_str().to_string()),
        key_name: non_empty(data.key_name()),
        security_group_ids,
        availability_zone: data
            .placement()
            .and_then(|p| non_empty(p.availability_zone())),
        shutdown_behavior: data
            .instance_initiated_shutdown_behavior()
            .map(|b| b.as_str().to_string()),
        disable_api_termination: data.disable_api_termination(),
        tags,
    }
}

#[async_trait]
impl InstanceApi for AwsEc2 {
    #[instrument(skip(self, request), fields(kind = %request.kind, resource = %request.resource_id))]
    async fn instance_action(
        &self,
        request: &OperationRequest,
        dry_run: bool,
    ) -> ProviderResult<()> {
        let id = request.resource_id.as_str();
        match request.kind {
            OperationKind::Start => self
                .client
                .start_instances()
                .instance_ids(id)
                .dry_run(dry_run)
                .send()
                .await
                .map(|_| ())
                .map_err(provider_error),
            OperationKind::Stop => self
                .client
                .stop_instances()
                .instance_ids(id)
                .force(request.params.force)
                .dry_run(dry_run)
                .send()
                .await
                .map(|_| ())
                .map_err(provider_error),
            OperationKind::Reboot => self
                .client
                .reboot_instances()
                .instance_ids(id)
                .dry_run(dry_run)
                .send()
                .await
                .map(|_| ())
                .map_err(provider_error),
            OperationKind::Terminate => self
                .client
                .terminate_instances()
                .instance_ids(id)
                .dry_run(dry_run)
                .send()
                .await
                .map(|_| ())
                .map_err(provider_error),
        }
    }

    async fn resource_state(&self, id: &ResourceId) -> ProviderResult<ResourceState> {
        let output = match self
            .client
            .describe_instance_status()
            .instance_ids(id.as_str())
            .include_all_instances(true)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                let err = provider_error(err);
                if err.is_not_found() {
                    return Ok(ResourceState::gone());
                }
                return Err(err);
            }
        };

        let Some(status) = output.instance_statuses().first() else {
            return Ok(ResourceState::gone());
        };

        Ok(ResourceState {
            lifecycle: status
                .instance_state()
                .and_then(|s| s.name())
                .map(|n| InstanceLifecycle::from_name(n.as_str())),
            status_check: status
                .instance_status()
                .and_then(|s| s.status())
                .map(|s| StatusCheck::from_name(s.as_str())),
        })
    }

    async fn describe_instances(&self, ids: &[String]) -> ProviderResult<Vec<InstanceSummary>> {
        let mut request = self.client.describe_instances();
        if !ids.is_empty() {
            request = request.set_instance_ids(Some(ids.to_vec()));
        }

        let mut pages = request.into_paginator().send();
        let mut instances = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(provider_error)?;
            for reservation in page.reservations() {
                instances.extend(reservation.instances().iter().map(instance_summary));
            }
        }
        Ok(instances)
    }

    async fn instance_statuses(
        &self,
        ids: &[String],
    ) -> ProviderResult<Vec<InstanceStatusSummary>> {
        let mut request = self
            .client
            .describe_instance_status()
            .include_all_instances(true);
        if !ids.is_empty() {
            request = request.set_instance_ids(Some(ids.to_vec()));
        }

        let mut pages = request.into_paginator().send();
        let mut statuses = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(provider_error)?;
            statuses.extend(
                page.instance_statuses()
                    .iter()
                    .map(|status| InstanceStatusSummary {
                        instance_id: status.instance_id().unwrap_or_default().to_string(),
                        state: status
                            .instance_state()
                            .and_then(|s| s.name())
                            .map(|n| n.as_str().to_string())
                            .unwrap_or_default(),
                        instance_status: status
                            .instance_status()
                            .and_then(|s| s.status())
                            .map(|s| s.as_str().to_string()),
                        system_status: status
                            .system_status()
                            .and_then(|s| s.status())
                            .map(|s| s.as_str().to_string()),
                        availability_zone: non_empty(status.availability_zone()),
                    }),
            );
        }
        Ok(statuses)
    }

    #[instrument(skip(self, launch), fields(template = %launch.template_name))]
    async fn run_instances(
        &self,
        launch: &LaunchRequest,
        client_token: &str,
        dry_run: bool,
    ) -> ProviderResult<Vec<InstanceSummary>> {
        let mut template =
            ec2::LaunchTemplateSpecification::builder().launch_template_name(&launch.template_name);
        if let Some(version) = &launch.template_version {
            template = template.version(version);
        }

        let output = self
            .client
            .run_instances()
            .launch_template(template.build())
            .min_count(launch.min_count)
            .max_count(launch.max_count)
            .client_token(client_token)
            .dry_run(dry_run)
            .send()
            .await
            .map_err(provider_error)?;

        Ok(output.instances().iter().map(instance_summary).collect())
    }
}

#[async_trait]
impl KeyPairApi for AwsEc2 {
    async fn create_key_pair(&self, name: &str) -> ProviderResult<CreatedKeyPair> {
        let output = self
            .client
            .create_key_pair()
            .key_name(name)
            .send()
            .await
            .map_err(provider_error)?;

        let key_material = output
            .key_material()
            .ok_or_else(|| ProviderError::other("CreateKeyPair returned no key material"))?
            .to_string();

        Ok(CreatedKeyPair {
            key_name: output.key_name().unwrap_or(name).to_string(),
            key_pair_id: non_empty(output.key_pair_id()),
            fingerprint: non_empty(output.key_fingerprint()),
            key_material,
        })
    }

    async fn delete_key_pair(&self, name: &str) -> ProviderResult<()> {
        self.client
            .delete_key_pair()
            .key_name(name)
            .send()
            .await
            .map_err(provider_error)?;
        Ok(())
    }

    async fn describe_key_pairs(&self) -> ProviderResult<Vec<KeyPairInfo>> {
        let output = self
            .client
            .describe_key_pairs()
            .send()
            .await
            .map_err(provider_error)?;

        Ok(output
            .key_pairs()
            .iter()
            .map(|key| KeyPairInfo {
                key_name: key.key_name().unwrap_or_default().to_string(),
                key_pair_id: non_empty(key.key_pair_id()),
                fingerprint: non_empty(key.key_fingerprint()),
                key_type: key.key_type().map(|t| t.as_str().to_string()),
                create_time: format_time(key.create_time()),
            })
            .collect())
    }
}

#[async_trait]
impl LaunchTemplateApi for AwsEc2 {
    #[instrument(skip(self, spec), fields(template = %spec.name))]
    async fn create_launch_template(
        &self,
        spec: &LaunchTemplateSpec,
        client_token: &str,
        dry_run: bool,
    ) -> ProviderResult<LaunchTemplateSummary> {
        let output = self
            .client
            .create_launch_template()
            .launch_template_name(&spec.name)
            .set_version_description(spec.version_description.clone())
            .launch_template_data(template_request_data(spec))
            .client_token(client_token)
            .dry_run(dry_run)
            .send()
            .await
            .map_err(provider_error)?;

        output
            .launch_template()
            .map(template_summary)
            .ok_or_else(|| ProviderError::other("CreateLaunchTemplate returned no launch template"))
    }

    async fn delete_launch_template(
        &self,
        name: &str,
        dry_run: bool,
    ) -> ProviderResult<LaunchTemplateSummary> {
        let output = self
            .client
            .delete_launch_template()
            .launch_template_name(name)
            .dry_run(dry_run)
            .send()
            .await
            .map_err(provider_error)?;

        output
            .launch_template()
            .map(template_summary)
            .ok_or_else(|| ProviderError::other("DeleteLaunchTemplate returned no launch template"))
    }

    async fn describe_launch_templates(
        &self,
        filter: &TemplateFilter,
    ) -> ProviderResult<Vec<LaunchTemplateSummary>> {
        let mut request = self.client.describe_launch_templates();
        match filter {
            TemplateFilter::All => {}
            TemplateFilter::Names(names) => {
                request = request.set_launch_template_names(Some(names.clone()));
            }
            TemplateFilter::Ids(ids) => {
                request = request.set_launch_template_ids(Some(ids.clone()));
            }
        }

        let mut pages = request.into_paginator().send();
        let mut templates = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(provider_error)?;
            templates.extend(page.launch_templates().iter().map(template_summary));
        }
        Ok(templates)
    }

    async fn launch_template_data(&self, instance_id: &ResourceId) -> ProviderResult<TemplateData> {
        let output = self
            .client
            .get_launch_template_data()
            .instance_id(instance_id.as_str())
            .send()
            .await
            .map_err(provider_error)?;

        Ok(output
            .launch_template_data()
            .map(template_data)
            .unwrap_or_default())
    }
}

#[async_trait]
impl NetworkApi for AwsEc2 {
    async fn describe_vpcs(&self) -> ProviderResult<Vec<VpcSummary>> {
        let mut pages = self.client.describe_vpcs().into_paginator().send();
        let mut vpcs = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(provider_error)?;
            vpcs.extend(page.vpcs().iter().map(|vpc| VpcSummary {
                vpc_id: vpc.vpc_id().unwrap_or_default().to_string(),
                name: tag_map(vpc.tags()).remove("Name"),
                cidr_block: non_empty(vpc.cidr_block()),
                state: vpc.state().map(|s| s.as_str().to_string()),
                is_default: vpc.is_default().unwrap_or(false),
            }));
        }
        Ok(vpcs)
    }

    async fn describe_subnets(&self) -> ProviderResult<Vec<SubnetSummary>> {
        let mut pages = self.client.describe_subnets().into_paginator().send();
        let mut subnets = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(provider_error)?;
            subnets.extend(page.subnets().iter().map(|subnet| SubnetSummary {
                subnet_id: subnet.subnet_id().unwrap_or_default().to_string(),
                vpc_id: non_empty(subnet.vpc_id()),
                cidr_block: non_empty(subnet.cidr_block()),
                availability_zone: non_empty(subnet.availability_zone()),
                available_ip_count: subnet.available_ip_address_count(),
                map_public_ip_on_launch: subnet.map_public_ip_on_launch().unwrap_or(false),
            }));
        }
        Ok(subnets)
    }

    async fn describe_security_groups(&self) -> ProviderResult<Vec<SecurityGroupSummary>> {
        let mut pages = self.client.describe_security_groups().into_paginator().send();
        let mut groups = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(provider_error)?;
            groups.extend(
                page.security_groups()
                    .iter()
                    .map(|group| SecurityGroupSummary {
                        group_id: group.group_id().unwrap_or_default().to_string(),
                        group_name: group.group_name().unwrap_or_default().to_string(),
                        description: non_empty(group.description()),
                        vpc_id: non_empty(group.vpc_id()),
                    }),
            );
        }
        Ok(groups)
    }

    async fn describe_availability_zones(&self) -> ProviderResult<Vec<ZoneSummary>> {
        let output = self
            .client
            .describe_availability_zones()
            .send()
            .await
            .map_err(provider_error)?;

        Ok(output
            .availability_zones()
            .iter()
            .map(|zone| ZoneSummary {
                zone_name: zone.zone_name().unwrap_or_default().to_string(),
                zone_id: non_empty(zone.zone_id()),
                state: zone.state().map(|s| s.as_str().to_string()),
                region_name: non_empty(zone.region_name()),
            })
            .collect())
    }
}
