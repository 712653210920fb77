//! Interactive menu over the instance operations

use std::fmt;

use dialoguer::Select;
use ec2ctl_core::ec2;
use ec2ctl_core::models::InstanceSummary;
use ec2ctl_core::{OperationKind, OperationRequest, ResourceId};
use tracing::debug;

use crate::cli::{OutputFormat, WaitArgs};
use crate::commands::instance::{InstanceRow, outcome_line};
use crate::commands::utils::{confirm_action, note, print_result};
use crate::commands::wait::{progress_callback, spinner};
use crate::connection::{ConnectionManager, Ec2Session};
use crate::error::Result as CliResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuAction {
    List,
    Status,
    Operate(OperationKind),
    Quit,
}

const MENU: [MenuAction; 7] = [
    MenuAction::List,
    MenuAction::Status,
    MenuAction::Operate(OperationKind::Start),
    MenuAction::Operate(OperationKind::Stop),
    MenuAction::Operate(OperationKind::Reboot),
    MenuAction::Operate(OperationKind::Terminate),
    MenuAction::Quit,
];

impl fmt::Display for MenuAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuAction::List => write!(f, "List instances"),
            MenuAction::Status => write!(f, "Show instance status"),
            MenuAction::Operate(kind) => write!(f, "{} an instance", capitalize(kind.as_str())),
            MenuAction::Quit => write!(f, "Quit"),
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Menu label for one instance
fn instance_label(instance: &InstanceSummary) -> String {
    format!(
        "{}  {}  [{}]",
        instance.instance_id,
        instance.name.as_deref().unwrap_or("-"),
        instance.state.as_deref().unwrap_or("unknown")
    )
}

pub async fn handle_shell(
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
) -> CliResult<()> {
    let session = conn_mgr.connect(profile_name).await?;
    println!(
        "Connected to {} ({})",
        session.region(),
        session.profile_name.as_deref().unwrap_or("default settings")
    );

    loop {
        let index = Select::new()
            .with_prompt("What would you like to do?")
            .items(&MENU[..])
            .default(0)
            .interact()?;

        let action = MENU[index];
        debug!(?action, "Menu selection");

        // An operation failure is reported and the menu comes back.
        let result = match action {
            MenuAction::List => list_instances(&session).await,
            MenuAction::Status => show_status(&session).await,
            MenuAction::Operate(kind) => operate(&session, kind).await,
            MenuAction::Quit => return Ok(()),
        };
        if let Err(err) = result {
            err.print_diagnostic();
        }
        println!();
    }
}

async fn list_instances(session: &Ec2Session) -> CliResult<()> {
    let instances = ec2::describe_instances(&session.provider, None).await?;
    let rows: Vec<InstanceRow> = instances.iter().map(InstanceRow::from).collect();
    print_result(&rows, OutputFormat::Table, None)
}

/// Let the user choose an instance; `None` when they go back
async fn pick_instance(session: &Ec2Session) -> CliResult<Option<ResourceId>> {
    let instances = ec2::describe_instances(&session.provider, None).await?;
    if instances.is_empty() {
        note("No instances found.");
        return Ok(None);
    }

    let mut labels: Vec<String> = instances.iter().map(instance_label).collect();
    labels.push("(back)".to_string());

    let index = Select::new()
        .with_prompt("Instance")
        .items(&labels[..])
        .default(0)
        .interact()?;

    match instances.get(index) {
        Some(instance) => Ok(Some(ResourceId::new(instance.instance_id.as_str())?)),
        None => Ok(None),
    }
}

async fn show_status(session: &Ec2Session) -> CliResult<()> {
    let Some(id) = pick_instance(session).await? else {
        return Ok(());
    };
    let status = ec2::instance_status(&session.provider, &id).await?;
    print_result(&status, OutputFormat::Table, None)
}

async fn operate(session: &Ec2Session, kind: OperationKind) -> CliResult<()> {
    let Some(id) = pick_instance(session).await? else {
        return Ok(());
    };

    if kind == OperationKind::Terminate && !confirm_action(&format!("terminate {}", id))? {
        note("Termination cancelled.");
        return Ok(());
    }

    let wait = WaitArgs {
        wait: true,
        ..Default::default()
    };
    let pb = spinner(true, &format!("{} {}", kind.verb(), id));
    let executor = session.executor(&wait, pb.as_ref().map(progress_callback));

    let request = OperationRequest::new(id, kind).wait(true);
    let outcome = executor.execute(&request).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    println!("{}", outcome_line(&outcome));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_labels() {
        let labels: Vec<String> = MENU.iter().map(ToString::to_string).collect();
        assert_eq!(labels[0], "List instances");
        assert_eq!(labels[2], "Start an instance");
        assert_eq!(labels[5], "Terminate an instance");
        assert_eq!(labels.last().map(String::as_str), Some("Quit"));
    }

    #[test]
    fn test_instance_label_fills_gaps() {
        let instance = InstanceSummary {
            instance_id: "i-0abc".to_string(),
            name: Some("web".to_string()),
            ..Default::default()
        };
        assert_eq!(instance_label(&instance), "i-0abc  web  [unknown]");
    }
}
