//! Provider-neutral views of EC2 resources
//!
//! These are what the provider traits return and what the CLI prints or
//! dumps to JSON. They carry only the fields ec2ctl shows; the AWS provider
//! maps SDK types into them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// One EC2 instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceSummary {
    pub instance_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_dns: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_time: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

/// Current state and status checks of one instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceStatusSummary {
    pub instance_id: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
}

/// A key pair as listed by EC2
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyPairInfo {
    pub key_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_pair_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
}

/// A freshly created key pair, including its private key
///
/// The private key is returned exactly once by EC2. It is never serialized
/// and never shown by `Debug`.
#[derive(Clone, Serialize)]
pub struct CreatedKeyPair {
    pub key_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_pair_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(skip)]
    pub key_material: String,
}

impl fmt::Debug for CreatedKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreatedKeyPair")
            .field("key_name", &self.key_name)
            .field("key_pair_id", &self.key_pair_id)
            .field("fingerprint", &self.fingerprint)
            .field("key_material", &"<redacted>")
            .finish()
    }
}

/// Launch instances from a launch template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchRequest {
    pub template_name: String,
    /// Template version; `$Default` when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_version: Option<String>,
    pub min_count: i32,
    pub max_count: i32,
}

impl LaunchRequest {
    pub fn new(template_name: impl Into<String>) -> Self {
        Self {
            template_name: template_name.into(),
            template_version: None,
            min_count: 1,
            max_count: 1,
        }
    }

    pub fn counts(mut self, min_count: i32, max_count: i32) -> Self {
        self.min_count = min_count;
        self.max_count = max_count;
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.template_version = Some(version.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.template_name.trim().is_empty() {
            return Err(CoreError::Validation(
                "launch template name must not be empty".to_string(),
            ));
        }
        if self.min_count < 1 {
            return Err(CoreError::Validation(format!(
                "min count must be at least 1, got {}",
                self.min_count
            )));
        }
        if self.max_count < self.min_count {
            return Err(CoreError::Validation(format!(
                "max count ({}) must not be smaller than min count ({})",
                self.max_count, self.min_count
            )));
        }
        Ok(())
    }
}

/// What an instance does when the OS shuts down
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownBehavior {
    #[default]
    Stop,
    Terminate,
}

impl ShutdownBehavior {
    pub fn as_str(self) -> &'static str {
        match self {
            ShutdownBehavior::Stop => "stop",
            ShutdownBehavior::Terminate => "terminate",
        }
    }
}

impl fmt::Display for ShutdownBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShutdownBehavior {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "stop" => Ok(ShutdownBehavior::Stop),
            "terminate" => Ok(ShutdownBehavior::Terminate),
            other => Err(CoreError::Validation(format!(
                "shutdown behavior must be 'stop' or 'terminate', got '{other}'"
            ))),
        }
    }
}

/// Input for creating a launch template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchTemplateSpec {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_description: Option<String>,
    pub image_id: String,
    pub instance_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    #[serde(default)]
    pub security_group_ids: Vec<String>,
    #[serde(default)]
    pub associate_public_ip: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    #[serde(default)]
    pub shutdown_behavior: ShutdownBehavior,
    /// Instance tags applied at launch
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl LaunchTemplateSpec {
    pub fn validate(&self) -> Result<()> {
        let name = self.name.as_str();
        if name.len() < 3 || name.len() > 128 {
            return Err(CoreError::Validation(format!(
                "launch template name must be 3 to 128 characters, got '{}'",
                self.name
            )));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '(' | ')' | '.' | '-' | '/' | '_'))
        {
            return Err(CoreError::Validation(format!(
                "launch template name '{}' may only contain letters, digits, and ( ) . - / _",
                self.name
            )));
        }
        if !self.image_id.starts_with("ami-") {
            return Err(CoreError::Validation(format!(
                "image id must start with 'ami-', got '{}'",
                self.image_id
            )));
        }
        if self.instance_type.trim().is_empty() {
            return Err(CoreError::Validation(
                "instance type must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// A launch template as listed by EC2
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaunchTemplateSummary {
    pub launch_template_id: String,
    pub launch_template_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_version: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
}

/// Which launch templates to describe
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TemplateFilter {
    #[default]
    All,
    Names(Vec<String>),
    Ids(Vec<String>),
}

impl TemplateFilter {
    /// Names take precedence over ids; nothing given means all
    pub fn from_lists(names: Vec<String>, ids: Vec<String>) -> Self {
        if !names.is_empty() {
            TemplateFilter::Names(names)
        } else if !ids.is_empty() {
            TemplateFilter::Ids(ids)
        } else {
            TemplateFilter::All
        }
    }
}

/// Launch parameters extracted from a running instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security_group_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shutdown_behavior: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_api_termination: Option<bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VpcSummary {
    pub vpc_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidr_block: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub is_default: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubnetSummary {
    pub subnet_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidr_block: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_ip_count: Option<i32>,
    pub map_public_ip_on_launch: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityGroupSummary {
    pub group_id: String,
    pub group_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneSummary {
    pub zone_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_name: Option<String>,
}
