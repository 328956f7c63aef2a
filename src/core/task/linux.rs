use super::{debug_flag, Task};
use crate::host::Host;
use crate::shell::{quote_arg, quote_expandable, quote_home_path};

fn sudo_prefix(is_sudo: bool) -> &'static str {
    if is_sudo {
        "sudo -E "
    } else {
        ""
    }
}

pub struct CheckoutOnLinux {
    pub host: Host,
    pub repository: String,
    pub branch: String,
}

impl CheckoutOnLinux {
    pub fn new(host: &Host, repository: &str, branch: &str) -> Self {
        Self {
            host: host.clone(),
            repository: repository.to_string(),
            branch: branch.to_string(),
        }
    }
}

impl Task for CheckoutOnLinux {
    fn host(&self) -> &Host {
        &self.host
    }

    fn script(&self) -> String {
        let branch = quote_arg(&self.branch);
        format!(
            "cd {} && git fetch origin && git checkout {} && git pull origin {}",
            quote_home_path(&self.repository),
            branch,
            branch
        )
    }
}

pub struct CompileOnLinux {
    pub host: Host,
    pub repository: String,
    pub target: String,
    pub is_debug: bool,
}

impl CompileOnLinux {
    pub fn new(host: &Host, repository: &str, target: &str, is_debug: bool) -> Self {
        Self {
            host: host.clone(),
            repository: repository.to_string(),
            target: target.to_string(),
            is_debug,
        }
    }
}

impl Task for CompileOnLinux {
    fn host(&self) -> &Host {
        &self.host
    }

    fn script(&self) -> String {
        format!(
            "cd {} && make {} {}",
            quote_home_path(&self.repository),
            self.target,
            debug_flag(self.is_debug)
        )
    }
}

pub struct RunOnLinux {
    pub host: Host,
    pub repository: String,
    pub target: String,
    pub is_debug: bool,
    pub is_sudo: bool,
    pub config_path: String,
}

impl RunOnLinux {
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

impl Task for RunOnLinux {
    fn host(&self) -> &Host {
        &self.host
    }

    fn script(&self) -> String {
        format!(
            "cd {} && {}make CONFIG_PATH={} {} {}",
            quote_home_path(&self.repository),
            sudo_prefix(self.is_sudo),
            quote_expandable(&self.config_path),
            debug_flag(self.is_debug),
            self.target
        )
    }
}

pub struct CleanupOnLinux {
    pub host: Host,
    pub repository: String,
    pub is_sudo: bool,
    pub default_branch: String,
}

impl CleanupOnLinux {
    pub fn new(host: &Host, repository: &str, is_sudo: bool, default_branch: &str) -> Self {
        Self {
            host: host.clone(),
            repository: repository.to_string(),
            is_sudo,
            default_branch: default_branch.to_string(),
        }
    }
}

impl Task for CleanupOnLinux {
    fn host(&self) -> &Host {
        &self.host
    }

    fn script(&self) -> String {
        // Build artifacts may be root-owned after sudo test runs.
        format!(
            "cd {} && {{ {}make clean; git checkout {}; {}git clean -fdx; git remote prune origin; }}",
            quote_home_path(&self.repository),
            sudo_prefix(self.is_sudo),
            quote_arg(&self.default_branch),
            sudo_prefix(self.is_sudo)
        )
    }
}
