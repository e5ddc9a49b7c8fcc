use crate::handlers::add::{PlanType, Template};
use crate::handlers::power::PowerCommand;
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    #[command(about = "Log in to the control panel and store the account")]
    Login {
        #[arg(short, long, help = "ConoHa account ID (prompted when omitted)")]
        account: Option<String>,
        #[arg(short, long, help = "Password (prompted when omitted)")]
        password: Option<String>,
    },

    #[command(about = "Forget the stored account and session")]
    Logout,

    #[command(about = "List VPS")]
    List {
        #[arg(short, long, help = "Show VPS-ID only")]
        id_only: bool,
        #[arg(
            short = 's',
            long = "verbose-status",
            help = "Include the server status (one request per VPS)"
        )]
        with_status: bool,
    },

    #[command(about = "Show VPS details")]
    Stat {
        #[arg(help = "VPS-ID (selected from a menu when omitted)")]
        id: Option<String>,
    },

    #[command(about = "Add a VPS")]
    Add {
        #[arg(short = 't', long = "type", default_value = "basic", help = "Plan type: basic, windows")]
        plan_type: PlanType,
        #[arg(short, long, help = "Memory size in GB: 1, 2, 4, 8, 16")]
        plan: u32,
        #[arg(short = 'i', long = "image", help = "Template: centos, wordpress, windows2012, windows2008")]
        template: Template,
        #[arg(short = 'P', long = "password", help = "Root password (basic plans only)")]
        root_password: Option<String>,
    },

    #[command(about = "Remove a VPS")]
    Remove {
        #[arg(help = "VPS-ID (selected from a menu when omitted)")]
        id: Option<String>,
        #[arg(short, long, help = "Remove without confirmation")]
        force: bool,
    },

    #[command(about = "Change a VPS label")]
    Label {
        #[arg(help = "VPS-ID (selected from a menu when omitted)")]
        id: Option<String>,
        #[arg(short, long, help = "New label (20 characters or less)")]
        label: String,
    },

    #[command(about = "Send a power command to a VPS")]
    Power {
        #[arg(help = "VPS-ID (selected from a menu when omitted)")]
        id: Option<String>,
        #[arg(short, long, help = "boot, reboot, shutdown, stop")]
        command: PowerCommand,
        #[arg(short, long = "force-send", help = "Send without confirmation")]
        force: bool,
    },

    #[command(name = "ssh-key", about = "Download an SSH private key")]
    SshKey {
        #[arg(short, long, help = "Destination file (default conoha-{account}-{n}.key)")]
        file: Option<PathBuf>,
        #[arg(short, long = "sshkey-no", default_value_t = 1, help = "Key number, 1-based")]
        sshkey_no: usize,
    },

    #[command(about = "Log in to a VPS with the system ssh client")]
    Ssh {
        #[arg(help = "VPS-ID (selected from a menu when omitted)")]
        id: Option<String>,
        #[arg(short, long, help = "SSH user (default from config, usually root)")]
        user: Option<String>,
        #[arg(last = true, help = "Arguments passed to ssh after --")]
        args: Vec<String>,
    },

    #[command(about = "Print version")]
    Version,
}

impl Command {
    /// Commands that run without first restoring a logged-in session.
    pub fn skips_session_recovery(&self) -> bool {
        matches!(self, Self::Login { .. } | Self::Logout | Self::Version)
    }
}
