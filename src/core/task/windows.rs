//! Tasks for Windows hosts. Scripts are PowerShell 7 (`&&` chains on success).

use super::{debug_flag, Task};
use crate::host::Host;
use crate::shell::{quote_powershell_expandable, quote_powershell_literal};

pub struct CheckoutOnWindows {
    pub host: Host,
    pub repository: String,
    pub branch: String,
}

impl CheckoutOnWindows {
    pub fn new(host: &Host, repository: &str, branch: &str) -> Self {
        Self {
            host: host.clone(),
            repository: repository.to_string(),
            branch: branch.to_string(),
        }
    }
}

impl Task for CheckoutOnWindows {
    fn host(&self) -> &Host {
        &self.host
    }

    fn script(&self) -> String {
        let branch = quote_powershell_literal(&self.branch);
        format!(
            "cd {} && git fetch origin && git checkout {} && git pull origin {}",
            quote_powershell_literal(&self.repository),
            branch,
            branch
        )
    }
}

pub struct CompileOnWindows {
    pub host: Host,
    pub repository: String,
    pub target: String,
    pub is_debug: bool,
}

impl CompileOnWindows {
    pub fn new(host: &Host, repository: &str, target: &str, is_debug: bool) -> Self {
        Self {
            host: host.clone(),
            repository: repository.to_string(),
            target: target.to_string(),
            is_debug,
        }
    }
}

impl Task for CompileOnWindows {
    fn host(&self) -> &Host {
        &self.host
    }

    fn script(&self) -> String {
        format!(
            "cd {} && nmake /E {} {}",
            quote_powershell_literal(&self.repository),
            self.target,
            debug_flag(self.is_debug)
        )
    }
}

pub struct RunOnWindows {
    pub host: Host,
    pub repository: String,
    pub target: String,
    pub is_debug: bool,
    /// Windows sessions already run elevated; kept for parity with Linux.
    pub is_sudo: bool,
    pub config_path: String,
}

impl RunOnWindows {
    pub fn new(
        host: &Host,
        repository: &str,
        target: &str,
        is_debug: bool,
        is_sudo: bool,
        config_path: &str,
    ) -> Self {
        Self {
            host: host.clone(),
            repository: repository.to_string(),
            target: target.to_string(),
            is_debug,
            is_sudo,
            config_path: config_path.to_string(),
        }
    }
}

impl Task for RunOnWindows {
    fn host(&self) -> &Host {
        &self.host
    }

    fn script(&self) -> String {
        format!(
            "$env:CONFIG_PATH={}; cd {} && nmake /E {} {}",
            quote_powershell_expandable(&self.config_path),
            quote_powershell_literal(&self.repository),
            self.target,
            debug_flag(self.is_debug)
        )
    }
}

pub struct CleanupOnWindows {
    pub host: Host,
    pub repository: String,
    pub is_sudo: bool,
    pub default_branch: String,
}

impl CleanupOnWindows {
    pub fn new(host: &Host, repository: &str, is_sudo: bool, default_branch: &str) -> Self {
        Self {
            host: host.clone(),
            repository: repository.to_string(),
            is_sudo,
            default_branch: default_branch.to_string(),
        }
    }
}

impl Task for CleanupOnWindows {
    fn host(&self) -> &Host {
        &self.host
    }

    fn script(&self) -> String {
        // Every step after cd runs even if the previous one failed; a missing
        // repository stops the script before git touches another tree.
        format!(
            "cd {} -ErrorAction Stop; nmake clean; git checkout {}; git clean -fdx; git remote prune origin",
            quote_powershell_literal(&self.repository),
            quote_powershell_literal(&self.default_branch)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Platform;

    fn host() -> Host {
        Host::named("winsrv", Platform::Windows)
    }

    #[test]
    fn checkout_script() {
        let task = CheckoutOnWindows::new(&host(), "C:\\demikernel", "feature/x");
        assert_eq!(
            task.script(),
            "cd 'C:\\demikernel' && git fetch origin && git checkout 'feature/x' && git pull origin 'feature/x'"
        );
        assert_eq!(task.host().name, "winsrv");
    }

    #[test]
    fn compile_script_release() {
        let task = CompileOnWindows::new(&host(), "C:\\demikernel", "all LIBOS=catnap", false);
        assert_eq!(
            task.script(),
            "cd 'C:\\demikernel' && nmake /E all LIBOS=catnap DEBUG=no"
        );
    }

    #[test]
    fn run_script_sets_config_path() {
        let task = RunOnWindows::new(
            &host(),
            "C:\\demikernel",
            "test-unit-rust LIBOS=catnap",
            true,
            true,
            "$HOME/config.yaml",
        );
        assert_eq!(
            task.script(),
            "$env:CONFIG_PATH=\"$HOME/config.yaml\"; cd 'C:\\demikernel' && nmake /E test-unit-rust LIBOS=catnap DEBUG=yes"
        );
    }

    #[test]
    fn cleanup_script_returns_to_default_branch() {
        let task = CleanupOnWindows::new(&host(), "C:\\demikernel", false, "dev");
        let script = task.script();
        assert!(script.starts_with("cd 'C:\\demikernel' -ErrorAction Stop; nmake clean;"));
        assert!(script.contains("git checkout 'dev';"));
        assert!(script.contains("git clean -fdx"));
    }
}
