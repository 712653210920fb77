//! Read-only network listings

use ec2ctl_core::NetworkApi;

use crate::cli::{NetworkCommands, OutputFormat};
use crate::commands::utils::{aws_error, print_result};
use crate::connection::ConnectionManager;
use crate::error::Result as CliResult;

pub async fn handle_network_command(
    cmd: &NetworkCommands,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    let session = conn_mgr.connect(profile_name).await?;
    let provider = &session.provider;
    let region = session.region().to_string();

    match cmd {
        NetworkCommands::Vpcs => {
            let vpcs = provider
                .describe_vpcs()
                .await
                .map_err(aws_error("DescribeVpcs", region))?;
            print_result(&vpcs, output_format, query)
        }
        NetworkCommands::Subnets => {
            let subnets = provider
                .describe_subnets()
                .await
                .map_err(aws_error("DescribeSubnets", region))?;
            print_result(&subnets, output_format, query)
        }
        NetworkCommands::SecurityGroups => {
            let groups = provider
                .describe_security_groups()
                .await
                .map_err(aws_error("DescribeSecurityGroups", region))?;
            print_result(&groups, output_format, query)
        }
        NetworkCommands::Zones => {
            let zones = provider
                .describe_availability_zones()
                .await
                .map_err(aws_error("DescribeAvailabilityZones", region))?;
            print_result(&zones, output_format, query)
        }
    }
}
