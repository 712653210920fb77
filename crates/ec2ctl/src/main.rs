use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::{generate, shells};
use ec2ctl_core::Config;
use tracing::{debug, error, info, trace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod connection;
mod error;
mod output;

use cli::{Cli, Commands, InstanceCommands};
use connection::ConnectionManager;
use error::Ec2CtlError;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level
    init_tracing(cli.verbose);

    // Load configuration from specified path or default location
    let (config, config_path) = if let Some(config_file) = &cli.config_file {
        let path = std::path::PathBuf::from(config_file);
        debug!("Loading config from explicit path: {:?}", path);
        let config = Config::load_from_path(&path)?;
        (config, Some(path))
    } else {
        debug!("Loading config from default location");
        (Config::load()?, None)
    };
    let conn_mgr =
        ConnectionManager::with_config_path(config, config_path).with_region(cli.region.clone());

    if let Err(e) = execute_command(&cli, &conn_mgr).await {
        e.print_diagnostic();
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    // RUST_LOG wins over the verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "ec2ctl=warn,ec2ctl_core=warn,aws_config=warn,aws_sdk_ec2=warn",
            1 => "ec2ctl=info,ec2ctl_core=info,aws_config=warn,aws_sdk_ec2=warn",
            2 => "ec2ctl=debug,ec2ctl_core=debug,aws_config=info,aws_sdk_ec2=info",
            _ => "ec2ctl=trace,ec2ctl_core=trace,aws_config=debug,aws_sdk_ec2=debug",
        };
        tracing_subscriber::EnvFilter::new(level)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .init();

    debug!("Tracing initialized with verbosity level: {}", verbose);
}

async fn execute_command(cli: &Cli, conn_mgr: &ConnectionManager) -> Result<(), Ec2CtlError> {
    trace!("Executing command: {:?}", cli.command);
    info!("Command: {}", format_command(&cli.command));

    let profile = cli.profile.as_deref();
    let query = cli.query.as_deref();

    let start = std::time::Instant::now();
    let result = match &cli.command {
        Commands::Version => {
            debug!("Showing version information");
            if cli.output.is_structured() {
                let output_data = serde_json::json!({
                    "version": env!("CARGO_PKG_VERSION"),
                    "name": env!("CARGO_PKG_NAME"),
                });
                output::print_output(&output_data, cli.output.resolve(None), None)
                    .map_err(Ec2CtlError::from)
            } else {
                println!("ec2ctl {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
        Commands::Completions { shell } => {
            debug!("Generating completions for {:?}", shell);
            generate_completions(*shell);
            Ok(())
        }
        Commands::Profile(profile_cmd) => {
            commands::profile::handle_profile_command(
                profile_cmd,
                conn_mgr,
                cli.region.as_deref(),
                cli.output,
                query,
            )
            .await
        }
        Commands::Instance(cmd) => {
            commands::instance::handle_instance_command(cmd, conn_mgr, profile, cli.output, query)
                .await
        }
        Commands::KeyPair(cmd) => {
            commands::key_pair::handle_key_pair_command(cmd, conn_mgr, profile, cli.output, query)
                .await
        }
        Commands::Template(cmd) => {
            commands::template::handle_template_command(cmd, conn_mgr, profile, cli.output, query)
                .await
        }
        Commands::Network(cmd) => {
            commands::network::handle_network_command(cmd, conn_mgr, profile, cli.output, query)
                .await
        }
        Commands::Interactive => commands::shell::handle_shell(conn_mgr, profile).await,
    };

    let duration = start.elapsed();
    match &result {
        Ok(_) => info!("Command completed successfully in {:?}", duration),
        Err(e) => error!("Command failed after {:?}: {}", duration, e),
    }

    result
}

/// Generate shell completions
fn generate_completions(shell: cli::Shell) {
    let mut cmd = cli::Cli::command();
    let name = cmd.get_name().to_string();

    match shell {
        cli::Shell::Bash => generate(shells::Bash, &mut cmd, name, &mut std::io::stdout()),
        cli::Shell::Zsh => generate(shells::Zsh, &mut cmd, name, &mut std::io::stdout()),
        cli::Shell::Fish => generate(shells::Fish, &mut cmd, name, &mut std::io::stdout()),
        cli::Shell::PowerShell => {
            generate(shells::PowerShell, &mut cmd, name, &mut std::io::stdout())
        }
        cli::Shell::Elvish => generate(shells::Elvish, &mut cmd, name, &mut std::io::stdout()),
    }
}

/// Format command for human-readable logging
fn format_command(command: &Commands) -> String {
    match command {
        Commands::Version => "version".to_string(),
        Commands::Completions { shell } => format!("completions {:?}", shell),
        Commands::Interactive => "shell".to_string(),
        Commands::Profile(cmd) => {
            use cli::ProfileCommands::*;
            match cmd {
                List => "profile list".to_string(),
                Path => "profile path".to_string(),
                Show { name } => format!("profile show {}", name),
                Set(args) => format!("profile set {}", args.name),
                Remove { name, .. } => format!("profile remove {}", name),
                Default { name } => format!("profile default {}", name),
                Validate => "profile validate".to_string(),
            }
        }
        Commands::Instance(cmd) => match cmd {
            InstanceCommands::List { id, .. } => match id {
                Some(id) => format!("instance list {}", id),
                None => "instance list".to_string(),
            },
            InstanceCommands::Ids => "instance ids".to_string(),
            InstanceCommands::Status { id } => format!("instance status {}", id),
            InstanceCommands::Start { target } => format!("instance start {}", target.ids.join(" ")),
            InstanceCommands::Stop { target, .. } => {
                format!("instance stop {}", target.ids.join(" "))
            }
            InstanceCommands::Reboot { target } => {
                format!("instance reboot {}", target.ids.join(" "))
            }
            InstanceCommands::Terminate { target, .. } => {
                format!("instance terminate {}", target.ids.join(" "))
            }
            InstanceCommands::Launch { template, .. } => {
                format!("instance launch --template {}", template)
            }
        },
        Commands::KeyPair(cmd) => format!("key-pair {:?}", cmd),
        Commands::Template(cli::TemplateCommands::Create(args)) => {
            format!("template create {:?}", args.name)
        }
        Commands::Template(cmd) => format!("template {:?}", cmd),
        Commands::Network(cmd) => format!("network {:?}", cmd),
    }
}
