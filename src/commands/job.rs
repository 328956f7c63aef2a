use clap::{Args, Subcommand};
use std::path::PathBuf;

use pairci::defaults;
use pairci::host::{self, Host, Platform};
use pairci::job::{linux, windows, JobContext, JobReport};

use super::{ensure_dir, pass_fail, CmdResult, PairArgs};

#[derive(Args)]
pub struct JobArgs {
    #[command(subcommand)]
    command: JobCommand,
}

#[derive(Args, Debug, Clone)]
struct TargetArgs {
    #[command(flatten)]
    pair: PairArgs,

    /// The hosts run Windows
    #[arg(long)]
    windows: bool,

    /// Directory for the job's stdout/stderr logs
    #[arg(long, default_value = ".")]
    log_dir: PathBuf,
}

#[derive(Args, Debug, Clone)]
struct BuildArgs {
    /// Target libos
    #[arg(long)]
    libos: String,

    /// Build in debug mode
    #[arg(long)]
    debug: bool,
}

#[derive(Args, Debug, Clone)]
struct RunOptions {
    /// Run make with sudo (Linux only)
    #[arg(long)]
    sudo: bool,

    /// Config file path on the remote hosts
    #[arg(long, default_value = "$HOME/config.yaml")]
    config_path: String,
}

#[derive(Subcommand)]
enum JobCommand {
    /// Check out a branch on both hosts
    Checkout {
        #[command(flatten)]
        target: TargetArgs,
        #[arg(long)]
        branch: String,
        /// Only the server touches the shared repository
        #[arg(long)]
        enable_nfs: bool,
    },
    /// Build the libos on both hosts
    Compile {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        build: BuildArgs,
        #[arg(long)]
        enable_nfs: bool,
    },
    /// Run unit tests on the server
    TestUnit {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        build: BuildArgs,
        #[command(flatten)]
        run: RunOptions,
    },
    /// Run the TCP integration test, or the pipe test with --pipe-mode
    TestIntegration {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        build: BuildArgs,
        #[command(flatten)]
        run: RunOptions,
        #[arg(long)]
        server_addr: String,
        #[arg(long)]
        client_addr: String,
        /// Pipe test run mode (Linux only), e.g. push-wait
        #[arg(long)]
        pipe_mode: Option<String>,
        #[arg(long, default_value_t = 1.0)]
        delay: f64,
    },
    /// Run one system test with explicit arguments
    TestSystem {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        build: BuildArgs,
        #[command(flatten)]
        run: RunOptions,
        /// Test name passed to make
        #[arg(long)]
        test: String,
        /// Name used for job names and logs (default: the test name)
        #[arg(long)]
        alias: Option<String>,
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        server_args: String,
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        client_args: String,
        /// Only the server has to succeed
        #[arg(long)]
        server_only: bool,
        #[arg(long, default_value_t = 1.0)]
        delay: f64,
    },
    /// Clean the repository and return to the default branch
    Cleanup {
        #[command(flatten)]
        target: TargetArgs,
        #[arg(long)]
        sudo: bool,
        #[arg(long)]
        enable_nfs: bool,
    },
}

struct Pair {
    server: Host,
    client: Host,
    repository: String,
    ctx: JobContext,
    windows: bool,
}

fn prepare(target: &TargetArgs) -> pairci::Result<Pair> {
    let platform = if target.windows {
        Platform::Windows
    } else {
        Platform::Linux
    };
    let server = host::resolve(&target.pair.server, platform)?;
    let client = host::resolve(&target.pair.client, platform)?;
    ensure_dir(&target.log_dir)?;

    Ok(Pair {
        server,
        client,
        repository: target.pair.repository.clone(),
        ctx: JobContext::new(
            target.log_dir.clone(),
            target.pair.timeout(),
            defaults::load_defaults(),
        ),
        windows: target.windows,
    })
}

fn validate_delay(delay: f64) -> pairci::Result<()> {
    if !delay.is_finite() || delay < 0.0 {
        return Err(pairci::Error::validation_invalid_argument(
            "delay",
            "Delay must be a non-negative number of seconds",
            Some(delay.to_string()),
            None,
        ));
    }
    Ok(())
}

pub fn run(args: JobArgs) -> CmdResult<JobReport> {
    let report = match args.command {
        JobCommand::Checkout {
            target,
            branch,
            enable_nfs,
        } => {
            let p = prepare(&target)?;
            if p.windows {
                windows::job_checkout_windows(
                    &p.repository, &branch, &p.server, &p.client, enable_nfs, &p.ctx,
                )?
            } else {
                linux::job_checkout(&p.repository, &branch, &p.server, &p.client, enable_nfs, &p.ctx)?
            }
        }
        JobCommand::Compile {
            target,
            build,
            enable_nfs,
        } => {
            let p = prepare(&target)?;
            if p.windows {
                windows::job_compile_windows(
                    &p.repository, &build.libos, build.debug, &p.server, &p.client, enable_nfs,
                    &p.ctx,
                )?
            } else {
                linux::job_compile(
                    &p.repository, &build.libos, build.debug, &p.server, &p.client, enable_nfs,
                    &p.ctx,
                )?
            }
        }
        JobCommand::TestUnit { target, build, run } => {
            let p = prepare(&target)?;
            if p.windows {
                windows::job_test_unit_rust_windows(
                    &p.repository, &build.libos, build.debug, &p.server, &p.client, run.sudo,
                    &run.config_path, &p.ctx,
                )?
            } else {
                linux::job_test_unit_rust(
                    &p.repository, &build.libos, build.debug, &p.server, &p.client, run.sudo,
                    &run.config_path, &p.ctx,
                )?
            }
        }
        JobCommand::TestIntegration {
            target,
            build,
            run,
            server_addr,
            client_addr,
            pipe_mode,
            delay,
        } => {
            validate_delay(delay)?;
            let p = prepare(&target)?;
            match (p.windows, pipe_mode) {
                (true, Some(_)) => {
                    return Err(pairci::Error::validation_invalid_argument(
                        "pipe_mode",
                        "The pipe integration test only runs on Linux hosts",
                        None,
                        None,
                    ))
                }
                (true, None) => windows::job_test_integration_tcp_rust_windows(
                    &p.repository, &build.libos, build.debug, &p.server, &p.client, &server_addr,
                    &client_addr, run.sudo, &run.config_path, &p.ctx,
                )?,
                (false, Some(mode)) => linux::job_test_integration_pipe_rust(
                    &p.repository, &build.libos, build.debug, &mode, &p.server, &p.client,
                    &server_addr, delay, run.sudo, &run.config_path, &p.ctx,
                )?,
                (false, None) => linux::job_test_integration_tcp_rust(
                    &p.repository, &build.libos, build.debug, &p.server, &p.client, &server_addr,
                    &client_addr, run.sudo, &run.config_path, &p.ctx,
                )?,
            }
        }
        JobCommand::TestSystem {
            target,
            build,
            run,
            test,
            alias,
            server_args,
            client_args,
            server_only,
            delay,
        } => {
            validate_delay(delay)?;
            let p = prepare(&target)?;
            let alias = alias.unwrap_or_else(|| test.clone());
            let system_test = if p.windows {
                windows::job_test_system_rust_windows
            } else {
                linux::job_test_system_rust
            };
            system_test(
                &alias, &test, &p.repository, &build.libos, build.debug, &p.server, &p.client,
                &server_args, &client_args, run.sudo, !server_only, delay, &run.config_path,
                &p.ctx,
            )?
        }
        JobCommand::Cleanup {
            target,
            sudo,
            enable_nfs,
        } => {
            let p = prepare(&target)?;
            if p.windows {
                windows::job_cleanup_windows(&p.repository, &p.server, &p.client, sudo, enable_nfs, &p.ctx)?
            } else {
                linux::job_cleanup(&p.repository, &p.server, &p.client, sudo, enable_nfs, &p.ctx)?
            }
        }
    };

    let exit_code = pass_fail(report.passed);
    Ok((report, exit_code))
}
