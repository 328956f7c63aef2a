//! Remote task objects.
//!
//! A task knows which host it targets and the script to run there. Executing a
//! task starts the script and hands back the running process; waiting and
//! reporting belong to the job layer.

pub mod linux;
pub mod windows;

use crate::defaults::Defaults;
use crate::error::Result;
use crate::host::Host;
use crate::ssh::{RemoteProcess, SshClient};

pub use linux::{CheckoutOnLinux, CleanupOnLinux, CompileOnLinux, RunOnLinux};
pub use windows::{CheckoutOnWindows, CleanupOnWindows, CompileOnWindows, RunOnWindows};

pub trait Task {
    fn host(&self) -> &Host;

    /// Script text for the host's shell.
    fn script(&self) -> String;

    fn execute(&self, defaults: &Defaults) -> Result<RemoteProcess> {
        let client = SshClient::from_host(self.host(), defaults)?;
        let script = self.script();
        log_status!("task", "{}: {}", self.host().name, script);
        client.spawn(&script)
    }
}

/// `DEBUG=yes|no` switch understood by both Makefile flavors.
pub(crate) fn debug_flag(is_debug: bool) -> &'static str {
    if is_debug {
        "DEBUG=yes"
    } else {
        "DEBUG=no"
    }
}
