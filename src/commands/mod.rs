use clap::Args;
use std::path::Path;
use std::time::Duration;

pub type CmdResult<T> = pairci::Result<(T, i32)>;

/// Options shared by every command that drives the host pair.
#[derive(Args, Debug, Clone)]
pub struct PairArgs {
    /// Server host name (or host config name)
    #[arg(long)]
    pub server: String,

    /// Client host name (or host config name)
    #[arg(long)]
    pub client: String,

    /// Location of the target repository on the remote hosts.
    /// A leading `~/` or `$HOME/` refers to the remote home; nothing else is expanded.
    #[arg(long)]
    pub repository: String,

    /// Kill any remote process still running after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl PairArgs {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}

/// Exit code for a command that ran to completion.
pub(crate) fn pass_fail(passed: bool) -> i32 {
    if passed {
        0
    } else {
        1
    }
}

pub(crate) fn ensure_dir(path: &Path) -> pairci::Result<()> {
    std::fs::create_dir_all(path).map_err(|e| {
        pairci::Error::internal_io(e.to_string(), Some(format!("create {}", path.display())))
    })
}

pub mod config;
pub mod host;
pub mod job;
pub mod run;
pub mod tests;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args))
    };
}

pub(crate) fn run_json(command: crate::Commands) -> (pairci::Result<serde_json::Value>, i32) {
    crate::tty::status("pairci is working...");

    match command {
        crate::Commands::Run(args) => dispatch!(args, run),
        crate::Commands::Job(args) => dispatch!(args, job),
        crate::Commands::Tests(args) => dispatch!(args, tests),
        crate::Commands::Config(args) => dispatch!(args, config),
        crate::Commands::Host(args) => dispatch!(args, host),
    }
}
