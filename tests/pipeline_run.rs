#![cfg(unix)]

//! Full pipeline runs on localhost against a throwaway git repository whose
//! Makefile echoes the make variables it receives.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use pairci::defaults::Defaults;
use pairci::pipeline::{run_pipeline_with, PipelineOptions, PipelineResult};

const MAKEFILE: &str = "\
all:
\t@echo \"build libos=$(LIBOS) debug=$(DEBUG)\"
\t@test \"$(LIBOS)\" != catpowder

test-unit-rust:
\t@echo \"unit libos=$(LIBOS) debug=$(DEBUG) config=$(CONFIG_PATH)\"

test-integration-rust:
\t@echo \"integration $(TEST_INTEGRATION) libos=$(LIBOS) args=$(ARGS)\"

test-system-rust:
\t@echo \"system test=$(TEST) libos=$(LIBOS) args=$(ARGS)\"
\t@if [ \"$(TEST)\" = hang ]; then sleep 30; fi

clean:
\t@echo clean

.PHONY: all test-unit-rust test-integration-rust test-system-rust clean
";

const CI_MAP: &str = r#"
catnip:
  tcp_ping_pong:
    server_args: "--server {{server_ip}}:12345"
    client_args: "--client {{server_ip}}:12345"
    skip_debug: true
  udp_echo:
    test: udp-echo
    server_args: "--server {{server_ip}}:12345"
    client_args: "--client {{client_ip}}:23456 {{server_ip}}:12345"
"#;

const HANG_TEST: &str = r#"  hang:
    server_args: "--server {{server_ip}}:12345"
    client_args: "--client {{server_ip}}:12345"
"#;

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(["-c", "user.name=ci", "-c", "user.email=ci@localhost"])
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap();
    assert!(status.success(), "git {:?} failed in {}", args, dir.display());
}

struct Workspace {
    root: tempfile::TempDir,
}

impl Workspace {
    /// Bare origin with a `dev` branch, and a clone of it as the repository under test.
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let path = root.path();

        git(path, &["init", "-q", "--bare", "origin.git"]);

        let seed = path.join("seed");
        fs::create_dir(&seed).unwrap();
        git(&seed, &["init", "-q"]);
        git(&seed, &["checkout", "-q", "-b", "dev"]);
        fs::write(seed.join("Makefile"), MAKEFILE).unwrap();
        git(&seed, &["add", "Makefile"]);
        git(&seed, &["commit", "-q", "-m", "stub build"]);
        git(&seed, &["remote", "add", "origin", "../origin.git"]);
        git(&seed, &["push", "-q", "origin", "dev"]);

        git(path, &["clone", "-q", "--branch", "dev", "origin.git", "repo"]);
        fs::create_dir(path.join("logs")).unwrap();
        fs::write(path.join("ci_map.yaml"), CI_MAP).unwrap();

        Self { root }
    }

    fn repository(&self) -> PathBuf {
        self.root.path().join("repo")
    }

    fn options(&self, libos: &str) -> PipelineOptions {
        PipelineOptions {
            server: "localhost".to_string(),
            client: "localhost".to_string(),
            repository: self.repository().display().to_string(),
            branch: "dev".to_string(),
            libos: libos.to_string(),
            is_debug: false,
            delay: 0.0,
            enable_nfs: false,
            test_unit: false,
            test_system: None,
            server_addr: Some("127.0.0.1".to_string()),
            client_addr: Some("127.0.0.2".to_string()),
            config_path: "/tmp/pairci-config.yaml".to_string(),
            output_dir: self.root.path().join("logs"),
            ci_map: Some(self.root.path().join("ci_map.yaml")),
            timeout: Some(Duration::from_secs(60)),
        }
    }
}

/// No libos needs sudo, so make runs as the test user.
fn defaults() -> Defaults {
    Defaults {
        sudo_libos: Vec::new(),
        ..Defaults::default()
    }
}

fn step_names(result: &PipelineResult) -> Vec<&str> {
    result.steps.iter().map(|s| s.name.as_str()).collect()
}

fn job_log(result: &PipelineResult, job: &str) -> String {
    fs::read_to_string(Path::new(&result.log_directory).join(format!("{}.stdout.txt", job)))
        .unwrap()
}

#[test]
fn debug_run_skips_debug_only_system_tests() {
    let ws = Workspace::new();
    let mut opts = ws.options("catnip");
    opts.is_debug = true;
    opts.test_unit = true;
    opts.test_system = Some("all".to_string());

    let result = run_pipeline_with(&opts, defaults()).unwrap();

    assert_eq!(
        step_names(&result),
        vec!["checkout", "compile", "unit_tests", "udp_echo", "cleanup"]
    );
    assert!(result.passed);
    assert_eq!(result.skipped, vec!["tcp_ping_pong"]);
    assert_eq!(result.profile, "debug");
    assert_eq!(result.steps[1].report.name, "compile-debug");

    let unit = &result.steps[2].report;
    assert_eq!(unit.jobs.len(), 1);
    assert_eq!(unit.jobs[0].name, "unit-test-server-localhost");
    assert_eq!(
        job_log(&result, "unit-test-server-localhost").trim(),
        "unit libos=catnip debug=yes config=/tmp/pairci-config.yaml"
    );

    let system = &result.steps[3].report;
    let names: Vec<&str> = system.jobs.iter().map(|j| j.name.as_str()).collect();
    assert_eq!(names, vec!["udp_echo-server-localhost", "udp_echo-client-localhost"]);
    assert_eq!(
        job_log(&result, "udp_echo-server-localhost").trim(),
        "system test=udp-echo libos=catnip args=--server 127.0.0.1:12345"
    );
    assert_eq!(
        job_log(&result, "udp_echo-client-localhost").trim(),
        "system test=udp-echo libos=catnip args=--client 127.0.0.2:23456 127.0.0.1:12345"
    );

    assert!(Path::new(&result.log_directory).ends_with("catnip-dev-debug"));
    assert!(Path::new(&result.log_directory).join("summary.json").exists());
}

#[test]
fn release_run_keeps_debug_only_tests() {
    let ws = Workspace::new();
    let mut opts = ws.options("catnip");
    opts.test_system = Some("tcp_ping_pong".to_string());

    let result = run_pipeline_with(&opts, defaults()).unwrap();

    assert_eq!(
        step_names(&result),
        vec!["checkout", "compile", "tcp_ping_pong", "cleanup"]
    );
    assert!(result.skipped.is_empty());
    assert_eq!(
        job_log(&result, "tcp_ping_pong-server-localhost").trim(),
        "system test=tcp_ping_pong libos=catnip args=--server 127.0.0.1:12345"
    );
}

#[test]
fn catnap_unit_run_adds_tcp_integration() {
    let ws = Workspace::new();
    let mut opts = ws.options("catnap");
    opts.test_unit = true;

    let result = run_pipeline_with(&opts, defaults()).unwrap();

    assert_eq!(
        step_names(&result),
        vec!["checkout", "compile", "unit_tests", "integration_tests", "cleanup"]
    );
    assert!(result.passed);

    let integration = &result.steps[3].report;
    assert_eq!(integration.jobs[0].name, "integration-test-server-localhost");
    assert_eq!(integration.jobs[1].name, "integration-test-client-localhost");
    assert_eq!(
        job_log(&result, "integration-test-server-localhost").trim(),
        "integration tcp-test libos=catnap args=--local-address 127.0.0.1:12345 --remote-address 127.0.0.2:23456"
    );
    assert_eq!(
        job_log(&result, "integration-test-client-localhost").trim(),
        "integration tcp-test libos=catnap args=--local-address 127.0.0.2:23456 --remote-address 127.0.0.1:12345"
    );
}

#[test]
fn catmem_unit_run_records_every_pipe_mode() {
    let ws = Workspace::new();
    let mut opts = ws.options("catmem");
    opts.test_unit = true;

    let result = run_pipeline_with(&opts, defaults()).unwrap();

    assert_eq!(
        step_names(&result),
        vec![
            "checkout",
            "compile",
            "unit_tests",
            "integration_tests-standalone",
            "integration_tests-push-wait",
            "integration_tests-pop-wait",
            "integration_tests-push-wait-async",
            "integration_tests-pop-wait-async",
            "cleanup",
        ]
    );
    assert!(result.passed);
    assert_eq!(
        job_log(&result, "integration-test-push-wait-client-localhost").trim(),
        "integration pipe-test libos=catmem args=--peer client --pipe-name 127.0.0.1:12345 --run-mode push-wait"
    );
}

#[test]
fn failed_compile_skips_tests() {
    let ws = Workspace::new();
    let mut opts = ws.options("catpowder");
    opts.test_unit = true;
    opts.test_system = Some("all".to_string());

    let result = run_pipeline_with(&opts, defaults()).unwrap();

    assert_eq!(step_names(&result), vec!["checkout", "compile", "cleanup"]);
    assert!(result.steps[0].passed);
    assert!(!result.steps[1].passed);
    assert!(result.steps[2].passed);
    assert!(!result.passed);
}

#[test]
fn hung_system_test_is_killed_at_the_timeout() {
    let ws = Workspace::new();
    let mut opts = ws.options("catnip");
    fs::write(ws.root.path().join("ci_map.yaml"), format!("{}{}", CI_MAP, HANG_TEST)).unwrap();
    opts.test_system = Some("hang".to_string());
    opts.timeout = Some(Duration::from_secs(3));

    let started = Instant::now();
    let result = run_pipeline_with(&opts, defaults()).unwrap();

    assert!(started.elapsed() < Duration::from_secs(25));
    assert_eq!(step_names(&result), vec!["checkout", "compile", "hang", "cleanup"]);
    assert!(!result.passed);

    let hang = &result.steps[2].report;
    assert!(!hang.passed);
    assert!(hang.jobs.iter().all(|j| j.timed_out && j.exit_code.is_none()));
    assert!(result.steps[3].passed);
}
