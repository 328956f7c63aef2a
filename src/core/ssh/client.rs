use crate::defaults::Defaults;
use crate::error::{Error, RemoteSpawnFailedDetails, Result};
use crate::host::{Host, Platform};
use crate::ssh::RemoteProcess;
use crate::utils::shell;
use std::process::{Command, Stdio};

pub struct SshClient {
    pub host: String,
    pub destination: String,
    pub port: u16,
    pub identity_file: Option<String>,
    pub platform: Platform,
    pub windows_shell: String,
    pub connect_timeout: u32,
    /// When true, all commands run locally instead of over SSH.
    /// Set automatically when the host is localhost/127.0.0.1/::1.
    pub is_local: bool,
}

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

impl SshClient {
    pub fn from_host(host: &Host, defaults: &Defaults) -> Result<Self> {
        let identity_file = match &host.identity_file {
            Some(path) if !path.is_empty() => {
                let expanded = shellexpand::tilde(path).to_string();
                if !std::path::Path::new(&expanded).exists() {
                    return Err(Error::ssh_identity_file_not_found(
                        host.name.clone(),
                        expanded,
                    ));
                }
                Some(expanded)
            }
            _ => None,
        };

        let address = host.address.as_deref().unwrap_or(&host.name);
        let is_local = is_local_host(address);
        if is_local {
            log_status!("ssh", "Host '{}' is localhost, using local execution", host.name);
        }

        Ok(Self {
            host: host.name.clone(),
            destination: host.destination(),
            port: host.port,
            identity_file,
            platform: host.platform(),
            windows_shell: defaults.windows_shell.clone(),
            connect_timeout: defaults.ssh_connect_timeout,
            is_local,
        })
    }

    fn build_ssh_args(&self, command: &str, force_tty: bool) -> Vec<String> {
        let mut args = Vec::new();

        // A remote pty ties the remote command to the connection: it gets SIGHUP when ssh dies.
        if force_tty {
            args.push("-tt".to_string());
        }

        if let Some(identity_file) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity_file.clone());
        }

        if self.port != 22 {
            args.push("-p".to_string());
            args.push(self.port.to_string());
        }

        // Jobs run unattended: never prompt, and drop stalled connections.
        args.extend([
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout),
            "-o".to_string(),
            "ServerAliveInterval=15".to_string(),
            "-o".to_string(),
            "ServerAliveCountMax=3".to_string(),
        ]);

        args.push(self.destination.clone());
        args.push(command.to_string());

        args
    }

    /// The command line the remote login shell receives for `script`.
    pub fn remote_command(&self, script: &str) -> String {
        match self.platform {
            Platform::Linux => script.to_string(),
            Platform::Windows => format!(
                "{} -NoProfile -NonInteractive -Command {}",
                self.windows_shell,
                shell::quote_powershell_command(script)
            ),
        }
    }

    fn command_for(&self, script: &str, force_tty: bool) -> (String, Command) {
        if self.is_local {
            let program = match self.platform {
                Platform::Linux => "sh".to_string(),
                Platform::Windows => self.windows_shell.clone(),
            };
            let mut cmd = Command::new(&program);
            match self.platform {
                Platform::Linux => {
                    cmd.args(["-c", script]);
                }
                Platform::Windows => {
                    cmd.args(["-NoProfile", "-NonInteractive", "-Command", script]);
                }
            }
            return (program, cmd);
        }

        let mut cmd = Command::new("ssh");
        cmd.args(self.build_ssh_args(&self.remote_command(script), force_tty));
        ("ssh".to_string(), cmd)
    }

    /// Start `script` on the host without waiting for it.
    ///
    /// The child leads its own process group so a timeout can stop everything it started.
    /// Linux jobs over ssh get a remote pty, which merges remote stderr into stdout.
    pub fn spawn(&self, script: &str) -> Result<RemoteProcess> {
        let (program, mut cmd) = self.command_for(script, self.platform == Platform::Linux);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let child = cmd.spawn().map_err(|e| {
            Error::remote_spawn_failed(RemoteSpawnFailedDetails {
                host: self.host.clone(),
                program,
                error: e.to_string(),
            })
        })?;

        RemoteProcess::new(&self.host, child)
    }

    /// Run `script` to completion, retrying transient connection failures.
    pub fn execute(&self, script: &str) -> CommandOutput {
        self.execute_with_retry(script, 3)
    }

    fn execute_with_retry(&self, script: &str, max_attempts: u32) -> CommandOutput {
        let backoff_secs = [0, 2, 5];

        for attempt in 0..max_attempts {
            let result = self.execute_once(script);

            // Only retry on transient connection errors, not command failures
            if result.success || attempt + 1 >= max_attempts || !is_transient_ssh_error(&result) {
                return result;
            }

            let delay = backoff_secs.get(attempt as usize + 1).copied().unwrap_or(5);
            log_status!(
                "ssh",
                "Connection to {} failed (attempt {}/{}), retrying in {}s...",
                self.host,
                attempt + 1,
                max_attempts,
                delay
            );
            std::thread::sleep(std::time::Duration::from_secs(delay));
        }

        CommandOutput {
            stdout: String::new(),
            stderr: "SSH retry exhausted".to_string(),
            success: false,
            exit_code: -1,
        }
    }

    fn execute_once(&self, script: &str) -> CommandOutput {
        let (program, mut cmd) = self.command_for(script, false);
        cmd.stdin(Stdio::null());

        match cmd.output() {
            Ok(out) => CommandOutput {
                stdout: String::from_utf8_lossy(&out.stdout).to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).to_string(),
                success: out.status.success(),
                exit_code: out.status.code().unwrap_or(-1),
            },
            Err(e) => CommandOutput {
                stdout: String::new(),
                stderr: format!("{} error: {}", program, e),
                success: false,
                exit_code: -1,
            },
        }
    }
}

/// Check if a host address refers to the local machine.
pub fn is_local_host(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

/// Check if an SSH failure is a transient connection error worth retrying.
fn is_transient_ssh_error(output: &CommandOutput) -> bool {
    let stderr = output.stderr.to_lowercase();
    // SSH exit code 255 = connection error (not a remote command failure)
    let is_connection_exit = output.exit_code == 255;

    let transient_patterns = [
        "connection refused",
        "connection reset",
        "connection timed out",
        "no route to host",
        "network is unreachable",
        "temporary failure in name resolution",
        "could not resolve hostname",
        "broken pipe",
        "ssh_exchange_identification",
        "connection closed by remote host",
    ];

    is_connection_exit || transient_patterns.iter().any(|p| stderr.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(platform: Platform) -> SshClient {
        let mut host = Host::named("node8", platform);
        host.user = Some("ci".to_string());
        host.port = 2222;
        SshClient::from_host(&host, &Defaults::default()).unwrap()
    }

    #[test]
    fn ssh_args_are_non_interactive() {
        let args = client(Platform::Linux).build_ssh_args("uptime", false);
        assert_eq!(&args[0..2], ["-p", "2222"]);
        assert!(!args.contains(&"-tt".to_string()));
        assert!(args.contains(&"BatchMode=yes".to_string()));
        assert!(args.contains(&"ConnectTimeout=10".to_string()));
        assert_eq!(args[args.len() - 2], "ci@node8");
        assert_eq!(args[args.len() - 1], "uptime");
    }

    #[test]
    fn spawned_jobs_force_a_remote_tty() {
        let args = client(Platform::Linux).build_ssh_args("make test", true);
        assert_eq!(args[0], "-tt");
        assert_eq!(args[args.len() - 1], "make test");
    }

    #[test]
    fn windows_scripts_run_through_powershell() {
        let cmd = client(Platform::Windows).remote_command("cd \"C:\\repo\" && nmake");
        assert_eq!(
            cmd,
            "pwsh -NoProfile -NonInteractive -Command \"cd \\\"C:\\repo\\\" && nmake\""
        );
    }

    #[test]
    fn linux_scripts_pass_through() {
        assert_eq!(client(Platform::Linux).remote_command("make all"), "make all");
    }

    #[test]
    fn missing_identity_file_is_rejected() {
        let mut host = Host::named("node7", Platform::Linux);
        host.identity_file = Some("/nonexistent/pairci_test_key".to_string());
        let err = SshClient::from_host(&host, &Defaults::default()).err().unwrap();
        assert_eq!(err.code.as_str(), "ssh.identity_file_not_found");
    }

    #[test]
    fn localhost_is_local() {
        assert!(is_local_host("localhost"));
        assert!(is_local_host("127.0.0.1"));
        assert!(is_local_host("::1"));
        assert!(!is_local_host("node8"));
    }

    #[test]
    fn transient_errors_are_detected() {
        let output = CommandOutput {
            stdout: String::new(),
            stderr: "ssh: connect to host node8 port 22: Connection refused".to_string(),
            success: false,
            exit_code: 255,
        };
        assert!(is_transient_ssh_error(&output));

        let failed_command = CommandOutput {
            stdout: String::new(),
            stderr: "make: *** [all] Error 2".to_string(),
            success: false,
            exit_code: 2,
        };
        assert!(!is_transient_ssh_error(&failed_command));
    }

    #[cfg(unix)]
    #[test]
    fn local_execute_captures_output() {
        let host = Host::named("localhost", Platform::Linux);
        let client = SshClient::from_host(&host, &Defaults::default()).unwrap();
        let output = client.execute("echo hello && echo oops >&2");
        assert!(output.success);
        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(output.stderr.trim(), "oops");
    }
}
