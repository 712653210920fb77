//! CLI structure and command definitions

use clap::{Parser, Subcommand};

pub mod ec2;

pub use ec2::*;

/// EC2 instance control from the command line
#[derive(Parser, Debug)]
#[command(name = "ec2ctl")]
#[command(version, about = "EC2 instance control: validated operations with state polling")]
#[command(long_about = "
EC2 instance control: validated operations with state polling

Every mutating call is dry-run first; the real call only follows when the
dry run says it would succeed. With --wait, ec2ctl then polls the instance
until it reaches the target state.

EXAMPLES:
    # Set up a profile
    ec2ctl profile set seoul --region ap-northeast-2 --aws-profile default

    # List instances
    ec2ctl instance list

    # Start an instance and wait until it is running
    ec2ctl instance start i-0123456789abcdef0 --wait

    # Filter output with JMESPath
    ec2ctl instance list -o json -q '[?state==`running`].instance_id'

    # Create a launch template interactively
    ec2ctl template create --interactive

For more help on a specific command, run:
    ec2ctl <command> --help
")]
pub struct Cli {
    /// Profile to use for this command
    #[arg(long, short, global = true, env = "EC2CTL_PROFILE")]
    pub profile: Option<String>,

    /// Path to alternate configuration file
    #[arg(long, global = true, env = "EC2CTL_CONFIG_FILE")]
    pub config_file: Option<String>,

    /// AWS region, overriding the profile and environment
    #[arg(long, short = 'r', global = true)]
    pub region: Option<String>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value = "auto")]
    pub output: OutputFormat,

    /// JMESPath query to filter output
    #[arg(long, short = 'q', global = true)]
    pub query: Option<String>,

    /// Enable verbose logging
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Tables for people, JSON when a query is given
    Auto,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Human-readable table format
    Table,
}

impl OutputFormat {
    /// Concrete format for structured results
    pub fn resolve(self, query: Option<&str>) -> crate::output::OutputFormat {
        match self {
            OutputFormat::Json => crate::output::OutputFormat::Json,
            OutputFormat::Yaml => crate::output::OutputFormat::Yaml,
            OutputFormat::Table => crate::output::OutputFormat::Table,
            OutputFormat::Auto if query.is_some() => crate::output::OutputFormat::Json,
            OutputFormat::Auto => crate::output::OutputFormat::Table,
        }
    }

    pub fn is_structured(self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::Yaml)
    }
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Instance listing, state changes and launches
    #[command(subcommand, visible_alias = "i")]
    #[command(after_help = "EXAMPLES:
    # List every instance and save the listing to all_instances.json
    ec2ctl instance list --all --save

    # Show one instance and save it to <id>.json
    ec2ctl instance list i-0123456789abcdef0 --save

    # Stop two instances, one after the other, waiting for each
    ec2ctl instance stop i-0aaa i-0bbb --wait

    # Reboot and wait for status checks to pass
    ec2ctl instance reboot i-0123456789abcdef0 --wait --wait-timeout 900

    # Launch from a launch template
    ec2ctl instance launch --template web --wait
")]
    Instance(InstanceCommands),

    /// Key pair management
    #[command(subcommand, name = "key-pair", visible_alias = "key", visible_alias = "kp")]
    KeyPair(KeyPairCommands),

    /// Launch template management
    #[command(subcommand, visible_alias = "lt")]
    Template(TemplateCommands),

    /// VPCs, subnets, security groups and availability zones
    #[command(subcommand, visible_alias = "net")]
    Network(NetworkCommands),

    /// Profile management
    #[command(subcommand, visible_alias = "prof", visible_alias = "pr")]
    #[command(after_help = "EXAMPLES:
    # Create a profile that uses a named AWS profile
    ec2ctl profile set seoul --region ap-northeast-2 --aws-profile work

    # Point a profile at a local EC2 emulator
    ec2ctl profile set local --region us-east-1 --endpoint-url http://localhost:4566

    # List all profiles
    ec2ctl profile list

    # Make a profile the default
    ec2ctl profile default seoul

    # Validate configuration
    ec2ctl profile validate
")]
    Profile(ProfileCommands),

    /// Interactive menu: pick an instance and an operation
    #[command(name = "shell", visible_alias = "menu")]
    Interactive,

    /// Version information
    #[command(visible_alias = "ver")]
    Version,

    /// Generate shell completions
    #[command(visible_alias = "comp")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion generation
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell", alias = "power-shell")]
    PowerShell,
    Elvish,
}

/// Profile management commands
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// List all configured profiles
    #[command(visible_alias = "ls")]
    List,

    /// Show the path to the configuration file
    Path,

    /// Show details of a specific profile
    #[command(visible_alias = "get")]
    Show {
        /// Profile name to show
        name: String,
    },

    /// Set or create a profile
    #[command(visible_alias = "add", visible_alias = "create")]
    #[command(after_help = "EXAMPLES:
    # Region and named AWS credentials profile
    ec2ctl profile set prod --region eu-central-1 --aws-profile prod-admin

    # Slower polling for large fleets
    ec2ctl profile set batch --wait-interval 30 --wait-timeout 1800

    # Disable client-side retries
    ec2ctl profile set strict --no-retry

    # Offer an AMI in the template wizard
    ec2ctl profile set seoul --image 'Amazon Linux 2023=ami-0c9c942bd7bf113a2'
")]
    Set(ProfileSetArgs),

    /// Remove a profile
    #[command(visible_alias = "rm", visible_alias = "delete")]
    Remove {
        /// Profile name to remove
        name: String,

        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },

    /// Set the default profile
    #[command(name = "default", visible_alias = "use")]
    Default {
        /// Profile name to use when --profile is not given
        name: String,
    },

    /// Validate configuration file and profiles
    #[command(visible_alias = "check")]
    Validate,
}

/// Arguments for `profile set`
///
/// Only the flags given are changed on an existing profile. The region
/// comes from the global `--region` flag.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ProfileSetArgs {
    /// Profile name
    pub name: String,

    /// Named profile from the AWS shared config and credentials files
    #[arg(long)]
    pub aws_profile: Option<String>,

    /// Custom EC2 endpoint (http or https)
    #[arg(long)]
    pub endpoint_url: Option<String>,

    /// Directory for JSON dumps and private key files
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Seconds between state polls
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub wait_interval: Option<u64>,

    /// Seconds before waiting gives up
    #[arg(long)]
    pub wait_timeout: Option<u64>,

    /// Attempts per real call or state query, including the first
    #[arg(long)]
    pub retry_attempts: Option<u32>,

    /// Disable client-side retries
    #[arg(long, conflicts_with = "retry_attempts")]
    pub no_retry: bool,

    /// AMI offered by the template wizard, as NAME=AMI_ID (repeatable)
    #[arg(long = "image", value_name = "NAME=AMI_ID", value_parser = parse_key_value)]
    pub images: Vec<(String, String)>,

    /// Make this the default profile
    #[arg(long)]
    pub default: bool,
}

/// Parse `KEY=VALUE`
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}
