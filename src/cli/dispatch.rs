use super::{Cli, commands::Command};
use crate::{
    PanelError, Result,
    config::Config,
    engine::{SessionContext, run_protected},
    handlers::{
        self,
        add::AddOrder,
        auth::{Credentials, PanelAuthenticator},
        power::PowerResult,
        remove::RemoveResult,
        vps::Vm,
    },
    output::{self, OutputFormatter},
    state::{AccountState, AccountStore},
    utils,
};
use serde::Serialize;
use std::sync::Arc;

struct Context<'a> {
    config: &'a Config,
    state: &'a AccountState,
    json: bool,
}

impl Context<'_> {
    fn print<T: OutputFormatter>(&self, data: &T) -> Result<()> {
        output::print_output(data, self.json, self.config.output.json_pretty)
    }
}

#[derive(Debug, Serialize)]
struct VersionInfo {
    name: &'static str,
    version: &'static str,
}

impl OutputFormatter for VersionInfo {
    fn format_text(&self) -> String {
        format!("{} {}", self.name, self.version)
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

pub async fn dispatch(mut cli: Cli, config: Arc<Config>) -> Result<()> {
    let command = match cli.command.take() {
        Some(cmd) => cmd,
        None => {
            eprintln!("No command provided. Use --help for usage.");
            std::process::exit(1);
        }
    };

    let store = AccountStore::default_location()?;
    let mut state = store.read();

    if !command.skips_session_recovery() {
        return run_with_session(command, &cli, &config, &store, &mut state).await;
    }

    match command {
        Command::Version => {
            let info = VersionInfo {
                name: env!("CARGO_PKG_NAME"),
                version: env!("CARGO_PKG_VERSION"),
            };
            output::print_output(&info, cli.json, config.output.json_pretty)
        }
        Command::Logout => {
            let result = handlers::auth::handle_logout(&store)?;
            output::print_output(&result, cli.json, config.output.json_pretty)
        }
        Command::Login { account, password } => {
            let mut session = SessionContext::new(config.session_options()?)?;
            handle_login_command(account, password, &mut session, &mut state, &store, &cli, &config).await
        }
        other => Err(PanelError::InvalidArgument(format!(
            "{:?} needs a panel session",
            other
        ))),
    }
}

/// Restores the stored session, recovers it if needed, runs the command and
/// writes the session id back whether or not the command succeeded.
async fn run_with_session(
    command: Command,
    cli: &Cli,
    config: &Config,
    store: &AccountStore,
    state: &mut AccountState,
) -> Result<()> {
    let mut session = SessionContext::new(config.session_options()?)?;
    if !state.session_id.is_empty() {
        tracing::debug!("Resuming stored session");
        session.seed_session_id(&state.session_id);
    }

    let auth = PanelAuthenticator::new(Credentials::new(&state.account, &state.password));
    let ctx = Context {
        config,
        state,
        json: cli.json,
    };
    let result = run_protected(&mut session, &auth, async |session| {
        execute(command, session, &ctx).await
    })
    .await;

    persist_session(store, state, &session)?;
    result
}

async fn handle_login_command(
    account: Option<String>,
    password: Option<String>,
    session: &mut SessionContext,
    state: &mut AccountState,
    store: &AccountStore,
    cli: &Cli,
    config: &Config,
) -> Result<()> {
    let account = match account {
        Some(a) => a,
        None => utils::prompt_stdin("Enter your ConoHa account ID: ")?,
    };
    let password = match password {
        Some(p) => p,
        None => utils::password_stdin("Enter your ConoHa password: ")?,
    };

    let credentials = Credentials::new(account, password);
    if !credentials.is_complete() {
        return Err(PanelError::InvalidArgument(
            "account ID and password are required".into(),
        ));
    }

    let result = handlers::auth::handle_login(session, &credentials).await?;
    if !result.logged_in {
        return Err(PanelError::Authentication(
            "Login failed. Enter correct ConoHa account ID and password.".into(),
        ));
    }

    state.account = credentials.account;
    state.password = credentials.password;
    persist_session(store, state, session)?;

    output::print_output(&result, cli.json, config.output.json_pretty)
}

/// Stores the current session id next to the credentials so the next run can
/// skip the login chain.
fn persist_session(store: &AccountStore, state: &mut AccountState, session: &SessionContext) -> Result<()> {
    if !state.has_credentials() {
        return Ok(());
    }

    let session_id = session.session_id();
    if session_id == state.session_id && store.path().exists() {
        return Ok(());
    }

    state.session_id = session_id;
    tracing::debug!(path = %store.path().display(), "Saving account state");
    store.write(state)
}

async fn resolve_vm(session: &mut SessionContext, id: Option<String>) -> Result<Vm> {
    match id {
        Some(id) => handlers::vps::find_vm(session, &id).await,
        None => {
            let vms = handlers::vps::list_vms(session, false).await?;
            utils::select_vm_stdin(vms)
        }
    }
}

async fn execute(command: Command, session: &mut SessionContext, ctx: &Context<'_>) -> Result<()> {
    match command {
        Command::List {
            id_only,
            with_status,
        } => {
            let result = handlers::vps::handle_list(session, with_status, id_only).await?;
            ctx.print(&result)
        }

        Command::Stat { id } => {
            let vm = resolve_vm(session, id).await?;
            let result = handlers::stat::handle_stat(session, vm).await?;
            ctx.print(&result)
        }

        Command::Add {
            plan_type,
            plan,
            template,
            root_password,
        } => {
            let order = AddOrder {
                plan_type,
                plan_gb: plan,
                template,
                root_password: root_password.unwrap_or_default(),
            };
            order.validate()?;
            let result = handlers::add::handle_add(session, &order).await?;
            ctx.print(&result)
        }

        Command::Remove { id, force } => {
            let vm = resolve_vm(session, id).await?;
            if !force
                && !utils::confirm_stdin(&format!("Remove VPS[Label={}]. Are you sure?", vm.label))?
            {
                return ctx.print(&RemoveResult::skipped(&vm));
            }
            let result = handlers::remove::handle_remove(session, &vm).await?;
            ctx.print(&result)
        }

        Command::Label { id, label } => {
            handlers::label::validate_label(&label)?;
            let vm = resolve_vm(session, id).await?;
            let result = handlers::label::handle_label(session, &vm.id, &label).await?;
            ctx.print(&result)
        }

        Command::Power { id, command, force } => {
            let vm = resolve_vm(session, id).await?;
            handlers::power::check_power(session, &vm, command).await?;
            if !force
                && !utils::confirm_stdin(&format!(
                    r#"Send "{}" command to VPS(Label={}). Are you sure?"#,
                    command, vm.label
                ))?
            {
                return ctx.print(&PowerResult::skipped(&vm, command));
            }
            let result = handlers::power::handle_power(session, &vm, command).await?;
            ctx.print(&result)
        }

        Command::SshKey { file, sshkey_no } => {
            let path = file.unwrap_or_else(|| {
                handlers::ssh_key::default_key_path(&ctx.state.account, sshkey_no)
            });
            let result = handlers::ssh_key::handle_ssh_key(session, sshkey_no, &path).await?;
            ctx.print(&result)
        }

        Command::Ssh { id, user, args } => {
            let vm = resolve_vm(session, id).await?;
            let user = user.unwrap_or_else(|| ctx.config.ssh.user.clone());
            let result =
                handlers::ssh::handle_ssh(session, &vm, &user, &ctx.config.ssh.program, &args)
                    .await?;
            if ctx.json || result.exit_code != Some(0) {
                ctx.print(&result)?;
            }
            Ok(())
        }

        other => Err(PanelError::InvalidArgument(format!(
            "{:?} runs without a panel session",
            other
        ))),
    }
}
