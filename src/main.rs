use clap::{Parser, Subcommand};

mod commands;
mod output;
mod tty;

use commands::{config, host, job, run, tests};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "pairci")]
#[command(version = VERSION)]
#[command(about = "Run the regression pipeline of a network library on a pair of remote hosts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: checkout, compile, tests, cleanup
    Run(run::RunArgs),
    /// Run a single job against the host pair
    Job(job::JobArgs),
    /// List system tests from the CI map
    Tests(tests::TestsArgs),
    /// Manage global pairci configuration
    Config(config::ConfigArgs),
    /// Inspect host configurations
    Host(host::HostArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let (json_result, exit_code) = commands::run_json(cli.command);

    if let Err(err) = output::print_result(json_result) {
        eprintln!("pairci: {}", err);
        return std::process::ExitCode::from(1);
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    fn run_cli(args: &[&str]) -> (pairci::Result<serde_json::Value>, i32) {
        let cli = Cli::try_parse_from(args).unwrap();
        commands::run_json(cli.command)
    }

    #[test]
    fn tests_command_maps_windows_libos_to_catnap() {
        let map = concat!(env!("CARGO_MANIFEST_DIR"), "/tools/ci/config/ci_map.yaml");
        let (result, code) = run_cli(&["pairci", "tests", "--libos", "catnapw", "--ci-map", map]);

        assert_eq!(code, 0);
        let data = result.unwrap();
        assert_eq!(data["command"], "tests.list");
        assert_eq!(data["libos"], "catnap");
        assert_eq!(data["tests"][0]["name"], "tcp_echo");
    }

    #[test]
    fn unknown_libos_maps_to_not_found_exit_code() {
        let map = concat!(env!("CARGO_MANIFEST_DIR"), "/tools/ci/config/ci_map.yaml");
        let (result, code) = run_cli(&["pairci", "tests", "--libos", "catnop", "--ci-map", map]);

        assert_eq!(code, 4);
        assert_eq!(result.unwrap_err().code.as_str(), "ci_map.libos_not_found");
    }

    #[test]
    fn exit_codes_fit_in_a_byte() {
        assert_eq!(exit_code_to_u8(-1), 0);
        assert_eq!(exit_code_to_u8(20), 20);
        assert_eq!(exit_code_to_u8(300), 255);
    }
}
