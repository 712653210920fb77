//! Configuration management for ec2ctl
//!
//! Handles configuration loading from files and environment variables.
//! Configuration is stored in TOML format with support for multiple named profiles.

#[cfg(target_os = "macos")]
use directories::BaseDirs;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::{ConfigError, Result};
use super::resilience::RetryConfig;

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    /// Profile used when `--profile` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    /// Map of profile name -> profile configuration
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

/// Individual profile configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Profile {
    /// AWS region, e.g. `ap-northeast-2`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Named profile from the AWS shared config / credentials files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_profile: Option<String>,
    /// Endpoint override (LocalStack and similar emulators)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
    /// Directory that receives JSON dumps and key material
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    /// State polling settings
    #[serde(default)]
    pub wait: WaitConfig,
    /// Retry budget for mutating calls and state queries
    #[serde(default)]
    pub retry: RetryConfig,
    /// Named machine images offered by the template wizard (name -> AMI id)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub images: BTreeMap<String, String>,
}

/// Fixed-interval polling settings used when waiting for a target state
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    /// Seconds between two state queries
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Seconds after which waiting gives up
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl WaitConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// Same cadence as the EC2 instance waiters: 15s apart, 40 attempts.
fn default_interval_secs() -> u64 {
    15
}

fn default_timeout_secs() -> u64 {
    600
}

impl Profile {
    /// Check values that serde cannot reject on its own
    pub fn validate(&self, name: &str) -> Result<()> {
        let invalid = |field: &str, reason: &str| ConfigError::InvalidValue {
            profile: name.to_string(),
            field: field.to_string(),
            reason: reason.to_string(),
        };

        if self.wait.interval_secs == 0 {
            return Err(invalid("wait.interval_secs", "must be greater than zero"));
        }
        if self.wait.timeout_secs < self.wait.interval_secs {
            return Err(invalid(
                "wait.timeout_secs",
                "must be at least one polling interval",
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", "must be at least 1"));
        }
        if self.retry.max_backoff_ms < self.retry.backoff_ms {
            return Err(invalid(
                "retry.max_backoff_ms",
                "must not be smaller than retry.backoff_ms",
            ));
        }
        if let Some(url) = &self.endpoint_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(invalid("endpoint_url", "must start with http:// or https://"));
        }
        if let Some(region) = &self.region
            && region.trim().is_empty()
        {
            return Err(invalid("region", "must not be empty"));
        }
        if let Some((name, _)) = self.images.iter().find(|(_, id)| !id.starts_with("ami-")) {
            return Err(invalid(
                format!("images.{name}").as_str(),
                "image id must start with ami-",
            ));
        }
        Ok(())
    }

    /// Directory for JSON dumps, defaulting to the working directory
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .as_deref()
            .map(|dir| PathBuf::from(shellexpand::tilde(dir).as_ref()))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

impl Config {
    /// Resolve which profile name applies.
    ///
    /// Resolution order:
    /// 1. `explicit_profile`, which must exist
    /// 2. `default_profile`, which must exist
    /// 3. The first profile sorted by name
    /// 4. `None`: built-in defaults apply
    pub fn resolve_profile_name(&self, explicit_profile: Option<&str>) -> Result<Option<String>> {
        if let Some(name) = explicit_profile.or(self.default_profile.as_deref()) {
            if !self.profiles.contains_key(name) {
                return Err(ConfigError::ProfileNotFound {
                    name: name.to_string(),
                });
            }
            return Ok(Some(name.to_string()));
        }

        Ok(self.list_profiles().first().map(|(name, _)| name.to_string()))
    }

    /// Resolve the profile settings, falling back to built-in defaults
    pub fn resolve_profile(&self, explicit_profile: Option<&str>) -> Result<(Option<String>, Profile)> {
        match self.resolve_profile_name(explicit_profile)? {
            Some(name) => {
                let profile = self.profiles.get(&name).cloned().unwrap_or_default();
                Ok((Some(name), profile))
            }
            None => Ok((None, Profile::default())),
        }
    }

    /// Load configuration from the standard location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::LoadError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        // Expand environment variables in the config content
        let expanded_content = Self::expand_env_vars(&content);

        let config: Config = toml::from_str(&expanded_content)?;

        Ok(config)
    }

    /// Save configuration to the standard location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::SaveError {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self)?;

        fs::write(config_path, content).map_err(|e| ConfigError::SaveError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        Ok(())
    }

    /// Set or update a profile
    pub fn set_profile(&mut self, name: String, profile: Profile) {
        self.profiles.insert(name, profile);
    }

    /// Remove a profile by name, clearing the default if it pointed there
    pub fn remove_profile(&mut self, name: &str) -> Option<Profile> {
        if self.default_profile.as_deref() == Some(name) {
            self.default_profile = None;
        }
        self.profiles.remove(name)
    }

    /// List all profiles sorted by name
    pub fn list_profiles(&self) -> Vec<(&String, &Profile)> {
        let mut profiles: Vec<_> = self.profiles.iter().collect();
        profiles.sort_by_key(|(name, _)| *name);
        profiles
    }

    /// Get the path to the configuration file
    ///
    /// On macOS, this supports both the standard macOS path and Linux-style ~/.config path:
    /// 1. Check ~/.config/ec2ctl/config.toml (Linux-style, preferred for consistency)
    /// 2. Fall back to ~/Library/Application Support/com.ec2ctl.ec2ctl/config.toml
    ///
    /// On Linux: ~/.config/ec2ctl/config.toml
    /// On Windows: %APPDATA%\ec2ctl\ec2ctl\config.toml
    pub fn config_path() -> Result<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            if let Some(base_dirs) = BaseDirs::new() {
                let linux_style_path = base_dirs
                    .home_dir()
                    .join(".config")
                    .join("ec2ctl")
                    .join("config.toml");

                if linux_style_path.exists()
                    || linux_style_path
                        .parent()
                        .map(|p| p.exists())
                        .unwrap_or(false)
                {
                    return Ok(linux_style_path);
                }
            }
        }

        let proj_dirs =
            ProjectDirs::from("com", "ec2ctl", "ec2ctl").ok_or(ConfigError::ConfigDirError)?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Expand environment variables in configuration content
    ///
    /// Supports ${VAR} and ${VAR:-default}. Unset variables without a default
    /// are left as-is so unused profiles never fail to load.
    ///
    /// Example:
    /// ```toml
    /// region = "${AWS_REGION:-ap-northeast-2}"
    /// ```
    fn expand_env_vars(content: &str) -> String {
        let expanded =
            shellexpand::env_with_context_no_errors(content, |var| std::env::var(var).ok());
        expanded.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_in(region: &str) -> Profile {
        Profile {
            region: Some(region.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.set_profile("seoul".to_string(), profile_in("ap-northeast-2"));
        config.default_profile = Some("seoul".to_string());

        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(config.default_profile, deserialized.default_profile);
        assert_eq!(deserialized.profiles["seoul"], profile_in("ap-northeast-2"));
    }

    #[test]
    fn test_profile_defaults_when_tables_omitted() {
        let config: Config = toml::from_str(
            r#"
[profiles.dev]
region = "us-east-1"
"#,
        )
        .unwrap();

        let dev = &config.profiles["dev"];
        assert_eq!(dev.wait, WaitConfig::default());
        assert_eq!(dev.retry, RetryConfig::default());
        assert_eq!(dev.output_dir(), PathBuf::from("."));
    }

    #[test]
    #[serial_test::serial]
    fn test_env_var_expansion_with_defaults() {
        unsafe {
            std::env::remove_var("EC2CTL_TEST_MISSING_REGION");
        }

        let content = r#"
[profiles.test]
region = "${EC2CTL_TEST_MISSING_REGION:-eu-west-1}"
"#;

        let expanded = Config::expand_env_vars(content);
        assert!(expanded.contains("eu-west-1"));
    }

    #[test]
    #[serial_test::serial]
    fn test_env_var_expansion() {
        unsafe {
            std::env::set_var("EC2CTL_TEST_AWS_PROFILE", "ops-admin");
        }

        let content = r#"
[profiles.test]
aws_profile = "${EC2CTL_TEST_AWS_PROFILE}"
"#;
        let expanded = Config::expand_env_vars(content);
        assert!(expanded.contains("ops-admin"));

        unsafe {
            std::env::remove_var("EC2CTL_TEST_AWS_PROFILE");
        }
    }

    #[test]
    fn test_explicit_profile_wins() {
        let mut config = Config::default();
        config.set_profile("a".to_string(), profile_in("us-east-1"));
        config.set_profile("b".to_string(), profile_in("eu-west-1"));
        config.default_profile = Some("a".to_string());

        assert_eq!(
            config.resolve_profile_name(Some("b")).unwrap(),
            Some("b".to_string())
        );
        assert_eq!(
            config.resolve_profile_name(None).unwrap(),
            Some("a".to_string())
        );
    }

    #[test]
    fn test_first_profile_alphabetically_without_default() {
        let mut config = Config::default();
        config.set_profile("zeta".to_string(), profile_in("us-east-1"));
        config.set_profile("alpha".to_string(), profile_in("eu-west-1"));

        let (name, profile) = config.resolve_profile(None).unwrap();
        assert_eq!(name.as_deref(), Some("alpha"));
        assert_eq!(profile.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn test_no_profiles_falls_back_to_defaults() {
        let config = Config::default();
        let (name, profile) = config.resolve_profile(None).unwrap();
        assert!(name.is_none());
        assert_eq!(profile, Profile::default());
    }

    #[test]
    fn test_unknown_profile_errors() {
        let config = Config::default();
        let err = config.resolve_profile_name(Some("missing")).unwrap_err();
        assert!(matches!(err, ConfigError::ProfileNotFound { ref name } if name == "missing"));
    }

    #[test]
    fn test_dangling_default_profile_errors() {
        let config = Config {
            default_profile: Some("gone".to_string()),
            ..Default::default()
        };
        assert!(config.resolve_profile_name(None).is_err());
    }

    #[test]
    fn test_remove_profile_clears_default() {
        let mut config = Config::default();
        config.set_profile("prod".to_string(), profile_in("us-east-1"));
        config.default_profile = Some("prod".to_string());

        assert!(config.remove_profile("prod").is_some());
        assert!(config.default_profile.is_none());
        assert!(config.remove_profile("prod").is_none());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let profile = Profile {
            wait: WaitConfig {
                interval_secs: 0,
                timeout_secs: 60,
            },
            ..Default::default()
        };
        let err = profile.validate("p").unwrap_err();
        assert!(err.to_string().contains("wait.interval_secs"));
    }

    #[test]
    fn test_validate_rejects_bad_endpoint() {
        let profile = Profile {
            endpoint_url: Some("localhost:4566".to_string()),
            ..Default::default()
        };
        assert!(profile.validate("local").is_err());

        let profile = Profile {
            endpoint_url: Some("http://localhost:4566".to_string()),
            ..Default::default()
        };
        assert!(profile.validate("local").is_ok());
    }

    #[test]
    fn test_images_table() {
        let config: Config = toml::from_str(
            r#"
[profiles.seoul.images]
"Amazon Linux 2023" = "ami-0abcdef1234567890"
"#,
        )
        .unwrap();
        let profile = &config.profiles["seoul"];
        assert_eq!(profile.images["Amazon Linux 2023"], "ami-0abcdef1234567890");
        assert!(profile.validate("seoul").is_ok());

        let mut bad = profile.clone();
        bad.images.insert("broken".to_string(), "img-1".to_string());
        let err = bad.validate("seoul").unwrap_err();
        assert!(err.to_string().contains("images.broken"));
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(Profile::default().validate("default").is_ok());
    }
}
