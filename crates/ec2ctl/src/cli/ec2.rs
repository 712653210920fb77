//! EC2 resource commands

use clap::{Args, Subcommand};
use std::path::PathBuf;

use super::parse_key_value;

/// Polling options shared by every operation that can wait
#[derive(Args, Debug, Clone, Default)]
pub struct WaitArgs {
    /// Poll until the instance reaches the target state
    #[arg(long)]
    pub wait: bool,

    /// Maximum time to wait in seconds (profile default: 600)
    #[arg(long, requires = "wait", value_parser = clap::value_parser!(u64).range(1..))]
    pub wait_timeout: Option<u64>,

    /// Polling interval in seconds (profile default: 15)
    #[arg(long, requires = "wait", value_parser = clap::value_parser!(u64).range(1..))]
    pub wait_interval: Option<u64>,
}

/// Instance ids plus polling options
#[derive(Args, Debug, Clone)]
pub struct InstanceTarget {
    /// Instance ids, handled one after another
    #[arg(required = true, num_args = 1..)]
    pub ids: Vec<String>,

    #[command(flatten)]
    pub wait: WaitArgs,
}

#[derive(Subcommand, Debug)]
pub enum InstanceCommands {
    /// Describe instances
    #[command(visible_alias = "ls")]
    List {
        /// Instance id; every instance when omitted
        #[arg(conflicts_with = "all")]
        id: Option<String>,

        /// Describe every instance
        #[arg(long)]
        all: bool,

        /// Also write the result to <id>.json or all_instances.json
        #[arg(long)]
        save: bool,

        /// Directory for the saved file (profile default: current directory)
        #[arg(long, requires = "save")]
        output_dir: Option<PathBuf>,
    },

    /// List instance ids
    Ids,

    /// Show lifecycle state and status checks
    Status {
        /// Instance id
        id: String,
    },

    /// Start stopped instances
    Start {
        #[command(flatten)]
        target: InstanceTarget,
    },

    /// Stop running instances
    Stop {
        #[command(flatten)]
        target: InstanceTarget,

        /// Force the stop without a clean OS shutdown
        #[arg(long)]
        force: bool,
    },

    /// Reboot instances; --wait polls until status checks pass
    Reboot {
        #[command(flatten)]
        target: InstanceTarget,
    },

    /// Terminate instances
    Terminate {
        #[command(flatten)]
        target: InstanceTarget,

        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },

    /// Launch instances from a launch template
    #[command(visible_alias = "run")]
    Launch {
        /// Launch template name
        #[arg(long, short)]
        template: String,

        /// Template version (default: the template's default version)
        #[arg(long, value_name = "VERSION")]
        template_version: Option<String>,

        /// Minimum number of instances
        #[arg(long, default_value_t = 1)]
        min: i32,

        /// Maximum number of instances
        #[arg(long, default_value_t = 1)]
        max: i32,

        #[command(flatten)]
        wait: WaitArgs,

        /// Directory for the <id>.json dumps (profile default: current directory)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum KeyPairCommands {
    /// Create a key pair and save its private key to <NAME>.pem
    #[command(visible_alias = "new")]
    Create {
        /// Key pair name
        name: String,

        /// Directory for the .pem file (profile default: current directory)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Delete a key pair
    #[command(visible_alias = "rm")]
    Delete {
        /// Key pair name
        name: String,
    },

    /// List key pairs
    #[command(visible_alias = "ls")]
    List,
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommands {
    /// Create a launch template
    #[command(after_help = "EXAMPLES:
    # From flags
    ec2ctl template create web --image-id ami-0c9c942bd7bf113a2 \\
        --instance-type t3.micro --key-name deploy \\
        --security-group-id sg-0123 --public-ip --tag Name=web

    # Step by step
    ec2ctl template create --interactive
")]
    Create(TemplateCreateArgs),

    /// Delete a launch template by name
    #[command(visible_alias = "rm")]
    Delete {
        /// Launch template name
        name: String,
    },

    /// List launch templates
    #[command(visible_alias = "ls")]
    List {
        /// Only these template names (repeatable)
        #[arg(long = "name")]
        names: Vec<String>,

        /// Only these template ids (repeatable)
        #[arg(long = "id", conflicts_with = "names")]
        ids: Vec<String>,
    },

    /// Show the launch parameters of an existing instance
    Data {
        /// Instance id
        instance_id: String,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct TemplateCreateArgs {
    /// Launch template name
    #[arg(required_unless_present = "interactive")]
    pub name: Option<String>,

    /// Prompt for every setting
    #[arg(long, short)]
    pub interactive: bool,

    /// AMI id
    #[arg(long, required_unless_present = "interactive")]
    pub image_id: Option<String>,

    /// Instance type
    #[arg(long, default_value = "t3.micro")]
    pub instance_type: String,

    /// Key pair name
    #[arg(long)]
    pub key_name: Option<String>,

    /// Security group id (repeatable)
    #[arg(long = "security-group-id")]
    pub security_group_ids: Vec<String>,

    /// Associate a public IPv4 address
    #[arg(long)]
    pub public_ip: bool,

    /// Availability zone
    #[arg(long)]
    pub availability_zone: Option<String>,

    /// Behaviour on OS shutdown: stop or terminate
    #[arg(long, default_value = "stop")]
    pub shutdown_behavior: String,

    /// Instance tag as KEY=VALUE (repeatable)
    #[arg(long = "tag", value_parser = parse_key_value)]
    pub tags: Vec<(String, String)>,

    /// Description of the first version
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum NetworkCommands {
    /// List VPCs
    Vpcs,
    /// List subnets
    Subnets,
    /// List security groups
    #[command(visible_alias = "sg")]
    SecurityGroups,
    /// List availability zones
    #[command(visible_alias = "az")]
    Zones,
}
