//! Key pair command implementations

use ec2ctl_core::KeyPairApi;
use ec2ctl_core::ec2::create_key_pair_file;
use serde_json::json;

use crate::cli::{KeyPairCommands, OutputFormat};
use crate::commands::utils::{aws_error, print_result, success_mark};
use crate::connection::ConnectionManager;
use crate::error::Result as CliResult;

pub async fn handle_key_pair_command(
    cmd: &KeyPairCommands,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    let session = conn_mgr.connect(profile_name).await?;

    match cmd {
        KeyPairCommands::Create { name, output_dir } => {
            let dir = session.output_dir(output_dir.as_deref());
            let saved = create_key_pair_file(&session.provider, name, &dir).await?;

            if output_format.is_structured() || query.is_some() {
                let data = json!({
                    "key_name": saved.key.key_name,
                    "key_pair_id": saved.key.key_pair_id,
                    "fingerprint": saved.key.fingerprint,
                    "private_key_file": saved.path.display().to_string(),
                });
                return print_result(data, output_format, query);
            }

            println!(
                "{} Created key pair '{}'",
                success_mark(),
                saved.key.key_name
            );
            if let Some(fingerprint) = &saved.key.fingerprint {
                println!("  Fingerprint: {}", fingerprint);
            }
            println!("  Private key: {}", saved.path.display());
            Ok(())
        }
        KeyPairCommands::Delete { name } => {
            session
                .provider
                .delete_key_pair(name)
                .await
                .map_err(aws_error("DeleteKeyPair", name.as_str()))?;

            if output_format.is_structured() || query.is_some() {
                return print_result(json!({ "deleted": name }), output_format, query);
            }
            println!("{} Deleted key pair '{}'", success_mark(), name);
            Ok(())
        }
        KeyPairCommands::List => {
            let keys = session
                .provider
                .describe_key_pairs()
                .await
                .map_err(aws_error("DescribeKeyPairs", "all key pairs"))?;
            print_result(&keys, output_format, query)
        }
    }
}
