use super::stat::vm_detail;
use super::vps::Vm;
use crate::output::{self, OutputFormatter};
use crate::engine::SessionContext;
use crate::{PanelError, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::process::Command;

pub fn resolve_program(program: &str) -> Result<PathBuf> {
    which::which(program).map_err(|e| {
        PanelError::Configuration(format!("ssh client {:?} not found on PATH: {}", program, e))
    })
}

/// `user@host` followed by the caller's extra arguments, untouched.
pub fn ssh_args(user: &str, host: &str, extra: &[String]) -> Vec<String> {
    std::iter::once(format!("{}@{}", user, host))
        .chain(extra.iter().cloned())
        .collect()
}

#[derive(Debug, Serialize)]
pub struct SshResult {
    pub id: String,
    pub host: String,
    pub skipped: bool,
    pub exit_code: Option<i32>,
}

impl OutputFormatter for SshResult {
    fn format_text(&self) -> String {
        if self.skipped {
            return output::text::warning(&format!(
                "ID={}. Windows plan is not supported ssh connect.",
                self.id
            ));
        }
        match self.exit_code {
            Some(0) => String::new(),
            Some(code) => output::text::warning(&format!("ssh exited with status {}", code)),
            None => output::text::warning("ssh was terminated by a signal"),
        }
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

/// Looks up the VPS address on its console page and hands the terminal to
/// the system ssh client until it exits.
pub async fn handle_ssh(
    session: &mut SessionContext,
    vm: &Vm,
    user: &str,
    program: &str,
    extra: &[String],
) -> Result<SshResult> {
    if vm.is_windows() {
        tracing::info!(id = %vm.id, "Skipping ssh for Windows plan");
        return Ok(SshResult {
            id: vm.id.clone(),
            host: String::new(),
            skipped: true,
            exit_code: None,
        });
    }

    let program = resolve_program(program)?;
    let host = vm_detail(session, &vm.id).await?.ipv4;
    if host.is_empty() {
        return Err(PanelError::ResponseParse(format!(
            "no IPv4 address on the console page of VPS {}",
            vm.id
        )));
    }

    let args = ssh_args(user, &host, extra);
    tracing::debug!(program = %program.display(), ?args, "Starting ssh");

    let status = tokio::task::spawn_blocking(move || Command::new(program).args(args).status())
        .await
        .map_err(std::io::Error::other)??;

    Ok(SshResult {
        id: vm.id.clone(),
        host,
        skipped: false,
        exit_code: status.code(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssh_args() {
        let extra = vec!["-p".to_string(), "2222".to_string()];
        assert_eq!(
            ssh_args("root", "192.0.2.10", &extra),
            vec!["root@192.0.2.10", "-p", "2222"]
        );
        assert_eq!(ssh_args("admin", "h", &[]), vec!["admin@h"]);
    }

    #[test]
    fn test_resolve_missing_program() {
        let err = resolve_program("definitely-not-an-ssh-client-7f3a").unwrap_err();
        assert!(matches!(err, PanelError::Configuration(_)));
    }

    #[test]
    fn test_skipped_output() {
        let result = SshResult {
            id: "1".into(),
            host: String::new(),
            skipped: true,
            exit_code: None,
        };
        assert!(result.format_text().contains("Windows plan"));
    }
}
