use super::paths;
use super::vps::{ServerStatus, Vm, vm_status};
use crate::engine::{ActionChain, FormValues, SessionContext, Step, StepRequest, StepResponse};
use crate::output::{self, OutputFormatter};
use crate::{PanelError, Result};
use serde::Serialize;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PowerCommand {
    Boot,
    Reboot,
    Shutdown,
    Stop,
}

impl PowerCommand {
    /// Value of the `command` query parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boot => "Boot",
            Self::Reboot => "Reboot",
            Self::Shutdown => "Shutdown",
            Self::Stop => "Stop",
        }
    }

    /// Boot is only accepted by a stopped VPS; everything else needs it running.
    pub fn check_status(self, status: ServerStatus) -> Result<()> {
        match (self, status) {
            (Self::Boot, ServerStatus::Offline) => Ok(()),
            (Self::Boot, _) => Err(PanelError::InvalidArgument(format!(
                r#"Could not send "{}" command. VPS is already running."#,
                self
            ))),
            (_, ServerStatus::Running) => Ok(()),
            _ => Err(PanelError::InvalidArgument(format!(
                r#"Could not send "{}" command. VPS might be offline."#,
                self
            ))),
        }
    }
}

impl std::fmt::Display for PowerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PowerCommand {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "boot" => Ok(Self::Boot),
            "reboot" => Ok(Self::Reboot),
            "shutdown" => Ok(Self::Shutdown),
            "stop" => Ok(Self::Stop),
            _ => Err(PanelError::InvalidArgument(format!(r#"Undefined command "{}"."#, s))),
        }
    }
}

pub fn power_step(session: &SessionContext, id: &str, command: PowerCommand) -> Result<Step> {
    let url = session.endpoint(paths::VPS_COMMAND)?;
    let id = id.to_string();

    Ok(Step::raw(
        move |_: &FormValues| -> Result<StepRequest> {
            let mut query = FormValues::new();
            query
                .add("command", command.as_str())
                .add("evid", &id)
                .add("_", chrono::Utc::now().timestamp().to_string());
            Ok(StepRequest::get(url.clone()).with_query(&query))
        },
        |resp: &StepResponse| -> Result<()> { resp.ensure_ok() },
    ))
}

#[derive(Debug, Serialize)]
pub struct PowerResult {
    pub id: String,
    pub label: String,
    pub command: PowerCommand,
    pub sent: bool,
}

impl PowerResult {
    pub fn skipped(vm: &Vm, command: PowerCommand) -> Self {
        Self {
            id: vm.id.clone(),
            label: vm.label.clone(),
            command,
            sent: false,
        }
    }
}

impl OutputFormatter for PowerResult {
    fn format_text(&self) -> String {
        if self.sent {
            output::text::success(&format!(
                r#""{}" command was sent to VPS (id={})."#,
                self.command, self.id
            ))
        } else {
            output::text::info(&format!(r#""{}" command was not sent"#, self.command))
        }
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

/// Checks the current status against the command. Called before prompting
/// so an impossible command never asks for confirmation.
pub async fn check_power(session: &mut SessionContext, vm: &Vm, command: PowerCommand) -> Result<()> {
    let status = vm_status(session, &vm.id).await?;
    command.check_status(status)
}

pub async fn handle_power(
    session: &mut SessionContext,
    vm: &Vm,
    command: PowerCommand,
) -> Result<PowerResult> {
    let mut chain = ActionChain::new();
    chain.add_step(power_step(session, &vm.id, command)?)?;
    chain.run(session).await?;

    tracing::info!(id = %vm.id, %command, "Power command sent");
    Ok(PowerResult {
        id: vm.id.clone(),
        label: vm.label.clone(),
        command,
        sent: true,
    })
}
