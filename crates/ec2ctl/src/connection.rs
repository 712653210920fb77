//! Connection management: profile resolution and EC2 client construction

use std::path::{Path, PathBuf};
use std::time::Duration;

use ec2ctl_core::{
    AwsEc2, ClientSettings, CommandExecutor, Config, ProgressCallback, Profile, RetryPolicy,
    WaitSettings,
};
use tracing::{debug, info};

use crate::cli::WaitArgs;
use crate::error::Result as CliResult;

/// Resolves profiles and creates EC2 clients
#[derive(Clone)]
pub struct ConnectionManager {
    pub config: Config,
    pub config_path: Option<PathBuf>,
    /// `--region`, which wins over the profile
    pub region: Option<String>,
}

impl ConnectionManager {
    pub fn with_config_path(config: Config, config_path: Option<PathBuf>) -> Self {
        Self {
            config,
            config_path,
            region: None,
        }
    }

    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    /// Where the configuration lives: `--config-file` or the default location
    pub fn config_file(&self) -> CliResult<PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Config::config_path()?),
        }
    }

    /// Save `config` to the file this manager was loaded from
    pub fn save_config(&self, config: &Config) -> CliResult<()> {
        match &self.config_path {
            Some(path) => config.save_to_path(path)?,
            None => config.save()?,
        }
        Ok(())
    }

    /// Resolve the profile and build a client for it
    pub async fn connect(&self, profile_name: Option<&str>) -> CliResult<Ec2Session> {
        let (profile_name, profile) = self.config.resolve_profile(profile_name)?;
        match &profile_name {
            Some(name) => {
                profile.validate(name)?;
                info!("Using profile: {}", name);
            }
            None => debug!("No profile configured, using built-in defaults"),
        }

        let settings = ClientSettings::from_profile(&profile, self.region.clone());
        let provider = AwsEc2::connect(&settings).await;
        debug!(region = provider.region(), "EC2 client ready");

        Ok(Ec2Session {
            provider,
            profile_name,
            profile,
        })
    }
}

/// A connected client plus the profile it was built from
pub struct Ec2Session {
    pub provider: AwsEc2,
    pub profile_name: Option<String>,
    pub profile: Profile,
}

impl Ec2Session {
    pub fn region(&self) -> &str {
        self.provider.region()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.profile.retry)
    }

    /// Profile polling settings with command-line overrides applied
    pub fn wait_settings(&self, args: &WaitArgs) -> WaitSettings {
        wait_settings(&self.profile, args)
    }

    /// `override_dir`, or the profile's output directory
    pub fn output_dir(&self, override_dir: Option<&Path>) -> PathBuf {
        override_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.profile.output_dir())
    }

    /// An executor over this session's client
    pub fn executor(
        &self,
        args: &WaitArgs,
        on_progress: Option<ProgressCallback>,
    ) -> CommandExecutor<AwsEc2> {
        let executor = CommandExecutor::new(self.provider.clone())
            .with_retry(self.retry_policy())
            .with_wait(self.wait_settings(args));
        match on_progress {
            Some(callback) => executor.with_progress(callback),
            None => executor,
        }
    }
}

fn wait_settings(profile: &Profile, args: &WaitArgs) -> WaitSettings {
    let interval = args
        .wait_interval
        .map(Duration::from_secs)
        .unwrap_or_else(|| profile.wait.interval());
    let timeout = args
        .wait_timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| profile.wait.timeout());
    WaitSettings::new(interval, timeout)
}
