//! Instance command implementations

use std::path::Path;

use colored::Colorize;
use ec2ctl_core::ec2::{self, dump_resources};
use ec2ctl_core::{
    ExecutorError, LaunchRequest, OperationKind, OperationOutcome, OperationRequest, ResourceId,
    models::InstanceSummary,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::{InstanceCommands, InstanceTarget, OutputFormat, WaitArgs};
use crate::commands::utils::{
    confirm_action, failure_mark, note, parse_ids, print_result, success_mark,
};
use crate::commands::wait::{progress_callback, spinner};
use crate::connection::{ConnectionManager, Ec2Session};
use crate::error::{Ec2CtlError, Result as CliResult};

/// Compact row for table output
#[derive(Debug, Serialize)]
pub(crate) struct InstanceRow<'a> {
    instance_id: &'a str,
    name: Option<&'a str>,
    state: Option<&'a str>,
    instance_type: Option<&'a str>,
    availability_zone: Option<&'a str>,
    public_ip: Option<&'a str>,
    private_ip: Option<&'a str>,
}

impl<'a> From<&'a InstanceSummary> for InstanceRow<'a> {
    fn from(i: &'a InstanceSummary) -> Self {
        Self {
            instance_id: &i.instance_id,
            name: i.name.as_deref(),
            state: i.state.as_deref(),
            instance_type: i.instance_type.as_deref(),
            availability_zone: i.availability_zone.as_deref(),
            public_ip: i.public_ip.as_deref(),
            private_ip: i.private_ip.as_deref(),
        }
    }
}

pub async fn handle_instance_command(
    cmd: &InstanceCommands,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    let session = conn_mgr.connect(profile_name).await?;

    match cmd {
        InstanceCommands::List {
            id,
            all: _,
            save,
            output_dir,
        } => {
            let id = id.as_deref().map(ResourceId::new).transpose()?;
            handle_list(
                &session,
                id.as_ref(),
                save.then(|| session.output_dir(output_dir.as_deref())),
                output_format,
                query,
            )
            .await
        }
        InstanceCommands::Ids => handle_ids(&session, output_format, query).await,
        InstanceCommands::Status { id } => {
            let id = ResourceId::new(id.as_str())?;
            let status = ec2::instance_status(&session.provider, &id).await?;
            print_result(&status, output_format, query)
        }
        InstanceCommands::Start { target } => {
            run_operation(&session, OperationKind::Start, target, false, output_format, query)
                .await
        }
        InstanceCommands::Stop { target, force } => {
            run_operation(&session, OperationKind::Stop, target, *force, output_format, query)
                .await
        }
        InstanceCommands::Reboot { target } => {
            run_operation(&session, OperationKind::Reboot, target, false, output_format, query)
                .await
        }
        InstanceCommands::Terminate { target, yes } => {
            if !*yes && !confirm_action(&format!("terminate {}", target.ids.join(", ")))? {
                note("Termination cancelled.");
                return Ok(());
            }
            run_operation(&session, OperationKind::Terminate, target, false, output_format, query)
                .await
        }
        InstanceCommands::Launch {
            template,
            template_version,
            min,
            max,
            wait,
            output_dir,
        } => {
            let mut request = LaunchRequest::new(template.as_str()).counts(*min, *max);
            if let Some(version) = template_version {
                request = request.version(version.as_str());
            }
            let dir = session.output_dir(output_dir.as_deref());
            handle_launch(&session, &request, wait, &dir, output_format, query).await
        }
    }
}

async fn handle_list(
    session: &Ec2Session,
    id: Option<&ResourceId>,
    save_to: Option<std::path::PathBuf>,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    let instances = ec2::describe_instances(&session.provider, id).await?;
    debug!("Found {} instances", instances.len());

    if let Some(dir) = save_to {
        let path = dump_resources(
            &dir,
            id.map(ResourceId::as_str),
            session.region(),
            &instances,
        )?;
        note(format!("Saved to {}", path.display()));
    }

    if output_format.is_structured() || query.is_some() {
        print_result(&instances, output_format, query)
    } else {
        let rows: Vec<InstanceRow> = instances.iter().map(InstanceRow::from).collect();
        print_result(&rows, output_format, None)
    }
}

async fn handle_ids(
    session: &Ec2Session,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    let ids = ec2::instance_ids(&session.provider).await?;
    if output_format.is_structured() || query.is_some() {
        return print_result(&ids, output_format, query);
    }
    for id in ids {
        println!("{}", id);
    }
    Ok(())
}

/// Build one request per id and run them in order
async fn run_operation(
    session: &Ec2Session,
    kind: OperationKind,
    target: &InstanceTarget,
    force: bool,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    let requests: Vec<OperationRequest> = parse_ids(&target.ids)?
        .into_iter()
        .map(|id| OperationRequest::new(id, kind).wait(target.wait.wait).force(force))
        .collect();

    let interactive = !output_format.is_structured();
    let pb = spinner(interactive, &format!("{} {}", kind.verb(), target.ids.join(", ")));
    let executor = session.executor(&target.wait, pb.as_ref().map(progress_callback));

    let outcomes = ec2::run_operations(&executor, &requests).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    report_outcomes(outcomes, output_format, query)
}

/// Print every outcome, then fail if any operation failed
fn report_outcomes(
    outcomes: Vec<OperationOutcome>,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    if output_format.is_structured() || query.is_some() {
        print_result(&outcomes, output_format, query)?;
    } else {
        for outcome in &outcomes {
            println!("{}", outcome_line(outcome));
        }
    }

    let total = outcomes.len();
    let mut failures: Vec<_> = outcomes.into_iter().filter_map(|o| o.error).collect();
    match failures.len() {
        0 => Ok(()),
        1 if total == 1 => Err(Ec2CtlError::from(failures.remove(0))),
        failed => Err(Ec2CtlError::OperationsFailed { failed, total }),
    }
}

pub(crate) fn outcome_line(outcome: &OperationOutcome) -> String {
    match (&outcome.error, outcome.terminal_state_reached) {
        (Some(err), _) => format!("{} {}: {}", failure_mark(), outcome.resource_id, err),
        (None, true) => format!(
            "{} {} is {} ({} polls)",
            success_mark(),
            outcome.resource_id,
            outcome.target_state.as_str().bold(),
            outcome.polls
        ),
        (None, false) => format!(
            "{} {} accepted for {} (target: {})",
            success_mark(),
            outcome.kind.api_name(),
            outcome.resource_id,
            outcome.target_state
        ),
    }
}

async fn handle_launch(
    session: &Ec2Session,
    request: &LaunchRequest,
    wait: &WaitArgs,
    dir: &Path,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    let interactive = wait.wait && !output_format.is_structured();
    let pb = spinner(interactive, "Launching instances");
    let executor = session.executor(wait, pb.as_ref().map(progress_callback));
    let launched =
        ec2::launch_and_save(&executor, request, dir, session.region(), wait.wait).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    let launched = launched?;

    info!(
        "Launched {} instances after {} attempts",
        launched.instances.len(),
        launched.attempts
    );
    for path in &launched.dumps {
        debug!(path = %path.display(), "Saved launched instance");
    }

    if output_format.is_structured() || query.is_some() {
        print_result(&launched.instances, output_format, query)?;
    } else {
        for instance in &launched.instances {
            println!("{}", launch_report(instance));
        }
        for err in &launched.wait_failures {
            println!("{} {}", failure_mark(), err);
        }
    }

    wait_result(launched.wait_failures, launched.instances.len())
}

/// One failed wait keeps its own error; several are counted
fn wait_result(mut failures: Vec<ExecutorError>, total: usize) -> CliResult<()> {
    match failures.len() {
        0 => Ok(()),
        1 if total == 1 => Err(Ec2CtlError::from(failures.remove(0))),
        failed => Err(Ec2CtlError::OperationsFailed { failed, total }),
    }
}

fn launch_report(instance: &InstanceSummary) -> String {
    let field = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
    format!(
        "Instance ID: {}\nPublic DNS Name: {}\nPublic IP Address: {}\nKey Name: {}\n",
        instance.instance_id,
        field(&instance.public_dns),
        field(&instance.public_ip),
        field(&instance.key_name),
    )
}
