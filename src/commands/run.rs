use clap::Args;
use std::path::PathBuf;

use pairci::pipeline::{self, PipelineOptions, PipelineResult};

use super::{pass_fail, CmdResult, PairArgs};

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pair: PairArgs,

    /// Target branch on the remote hosts
    #[arg(long)]
    branch: String,

    /// Target libos (catnapw runs catnap on Windows hosts)
    #[arg(long)]
    libos: String,

    /// Build in debug mode
    #[arg(long)]
    debug: bool,

    /// Seconds between starting the server and the client in paired tests
    #[arg(long, default_value_t = 1.0)]
    delay: f64,

    /// The repository lives on NFS shared by both hosts
    #[arg(long)]
    enable_nfs: bool,

    /// Run unit tests (and integration tests where the libos has them)
    #[arg(long)]
    test_unit: bool,

    /// Run system tests: a test name from the CI map, or "all"
    #[arg(long, value_name = "NAME")]
    test_system: Option<String>,

    /// Server address used by paired tests
    #[arg(long)]
    server_addr: Option<String>,

    /// Client address used by paired tests
    #[arg(long)]
    client_addr: Option<String>,

    /// Config file path on the remote hosts
    #[arg(long, default_value = "$HOME/config.yaml")]
    config_path: String,

    /// Directory that receives the log directory of this run
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// CI map file (default: the ci_map_path setting)
    #[arg(long)]
    ci_map: Option<PathBuf>,
}

impl RunArgs {
    fn into_options(self) -> PipelineOptions {
        let timeout = self.pair.timeout();
        PipelineOptions {
            server: self.pair.server,
            client: self.pair.client,
            repository: self.pair.repository,
            branch: self.branch,
            libos: self.libos,
            is_debug: self.debug,
            delay: self.delay,
            enable_nfs: self.enable_nfs,
            test_unit: self.test_unit,
            test_system: self.test_system,
            server_addr: self.server_addr,
            client_addr: self.client_addr,
            config_path: self.config_path,
            output_dir: self.output_dir,
            ci_map: self.ci_map,
            timeout,
        }
    }
}

pub fn run(args: RunArgs) -> CmdResult<PipelineResult> {
    let result = pipeline::run_pipeline(&args.into_options())?;
    let exit_code = pass_fail(result.passed);
    Ok((result, exit_code))
}
