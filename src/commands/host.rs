use clap::{Args, Subcommand};
use serde::Serialize;

use pairci::defaults;
use pairci::host::{self, Host, Platform};
use pairci::ssh::{is_local_host, SshClient};

use super::{pass_fail, CmdResult};

#[derive(Args)]
pub struct HostArgs {
    #[command(subcommand)]
    command: HostCommand,
}

#[derive(Subcommand)]
enum HostCommand {
    /// List configured hosts
    List,
    /// Show how a host name resolves
    Show {
        /// Host name
        name: String,
        /// Platform to assume when the host has no config file
        #[arg(long)]
        windows: bool,
    },
    /// Run `hostname` on a host to confirm it is reachable non-interactively
    Check {
        /// Host name
        name: String,
        #[arg(long)]
        windows: bool,
    },
}

#[derive(Default, Serialize)]
pub struct HostOutput {
    command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<Host>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hosts: Option<Vec<Host>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    local: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    check: Option<HostCheck>,
}

#[derive(Serialize)]
pub struct HostCheck {
    reachable: bool,
    exit_code: i32,
    hostname: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    stderr: String,
}

fn platform(windows: bool) -> Platform {
    if windows {
        Platform::Windows
    } else {
        Platform::Linux
    }
}

pub fn run(args: HostArgs) -> CmdResult<HostOutput> {
    match args.command {
        HostCommand::List => Ok((
            HostOutput {
                command: "host.list".to_string(),
                hosts: Some(host::list()?),
                ..Default::default()
            },
            0,
        )),
        HostCommand::Show { name, windows } => {
            let resolved = host::resolve(&name, platform(windows))?;
            let destination = resolved.destination();
            let local = is_local_host(resolved.address.as_deref().unwrap_or(&resolved.name));

            Ok((
                HostOutput {
                    command: "host.show".to_string(),
                    host: Some(resolved),
                    destination: Some(destination),
                    local: Some(local),
                    ..Default::default()
                },
                0,
            ))
        }
        HostCommand::Check { name, windows } => {
            let resolved = host::resolve(&name, platform(windows))?;
            let client = SshClient::from_host(&resolved, &defaults::load_defaults())?;
            let output = client.execute("hostname");
            let check = HostCheck {
                reachable: output.success,
                exit_code: output.exit_code,
                hostname: output.stdout.trim().to_string(),
                stderr: output.stderr.trim().to_string(),
            };
            let exit_code = pass_fail(check.reachable);

            Ok((
                HostOutput {
                    command: "host.check".to_string(),
                    destination: Some(resolved.destination()),
                    host: Some(resolved),
                    check: Some(check),
                    ..Default::default()
                },
                exit_code,
            ))
        }
    }
}
