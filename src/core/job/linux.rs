//! Jobs for a Linux host pair.

use super::windows::tcp_integration_args;
use super::{job_name, stagger, wait_and_report, JobContext, JobReport, JobSet};
use crate::error::Result;
use crate::host::{Host, Role};
use crate::task::{CheckoutOnLinux, CleanupOnLinux, CompileOnLinux, RunOnLinux};

/// Run modes exercised by the pipe integration test, in pipeline order.
pub const PIPE_RUN_MODES: [&str; 5] = [
    "standalone",
    "push-wait",
    "pop-wait",
    "push-wait-async",
    "pop-wait-async",
];

pub fn job_checkout(
    repository: &str,
    branch: &str,
    server: &Host,
    client: &Host,
    enable_nfs: bool,
    ctx: &JobContext,
) -> Result<JobReport> {
    let test_name = "checkout";
    let mut jobs = JobSet::new();

    jobs.launch(
        job_name(test_name, Role::Server, server),
        &CheckoutOnLinux::new(server, repository, branch),
        &ctx.defaults,
    )?;

    if !enable_nfs {
        jobs.launch(
            job_name(test_name, Role::Client, client),
            &CheckoutOnLinux::new(client, repository, branch),
            &ctx.defaults,
        )?;
    }

    wait_and_report(test_name, ctx, jobs, true)
}

pub fn job_compile(
    repository: &str,
    libos: &str,
    is_debug: bool,
    server: &Host,
    client: &Host,
    enable_nfs: bool,
    ctx: &JobContext,
) -> Result<JobReport> {
    let test_name = format!("compile-{}", if is_debug { "debug" } else { "release" });
    let target = format!("all LIBOS={}", libos);
    let mut jobs = JobSet::new();

    jobs.launch(
        job_name(&test_name, Role::Server, server),
        &CompileOnLinux::new(server, repository, &target, is_debug),
        &ctx.defaults,
    )?;

    if !enable_nfs {
        jobs.launch(
            job_name(&test_name, Role::Client, client),
            &CompileOnLinux::new(client, repository, &target, is_debug),
            &ctx.defaults,
        )?;
    }

    wait_and_report(&test_name, ctx, jobs, true)
}

#[allow(clippy::too_many_arguments)]
pub fn job_test_system_rust(
    test_alias: &str,
    test_name: &str,
    repo: &str,
    libos: &str,
    is_debug: bool,
    server: &Host,
    client: &Host,
    server_args: &str,
    client_args: &str,
    is_sudo: bool,
    all_pass: bool,
    delay: f64,
    config_path: &str,
    ctx: &JobContext,
) -> Result<JobReport> {
    let server_cmd = format!(
        "test-system-rust LIBOS={} TEST={} ARGS='{}'",
        libos, test_name, server_args
    );
    let client_cmd = format!(
        "test-system-rust LIBOS={} TEST={} ARGS='{}'",
        libos, test_name, client_args
    );
    let mut jobs = JobSet::new();

    jobs.launch(
        job_name(test_alias, Role::Server, server),
        &RunOnLinux::new(server, repo, &server_cmd, is_debug, is_sudo, config_path),
        &ctx.defaults,
    )?;
    stagger(delay);
    jobs.launch(
        job_name(test_alias, Role::Client, client),
        &RunOnLinux::new(client, repo, &client_cmd, is_debug, is_sudo, config_path),
        &ctx.defaults,
    )?;

    wait_and_report(test_alias, ctx, jobs, all_pass)
}

#[allow(clippy::too_many_arguments)]
pub fn job_test_unit_rust(
    repo: &str,
    libos: &str,
    is_debug: bool,
    server: &Host,
    _client: &Host,
    is_sudo: bool,
    config_path: &str,
    ctx: &JobContext,
) -> Result<JobReport> {
    let server_cmd = format!("test-unit-rust LIBOS={}", libos);
    let test_name = "unit-test";
    let mut jobs = JobSet::new();

    // Unit tests need a single endpoint, so they never run on the client.
    jobs.launch(
        job_name(test_name, Role::Server, server),
        &RunOnLinux::new(server, repo, &server_cmd, is_debug, is_sudo, config_path),
        &ctx.defaults,
    )?;

    wait_and_report(test_name, ctx, jobs, true)
}

#[allow(clippy::too_many_arguments)]
pub fn job_test_integration_tcp_rust(
    repo: &str,
    libos: &str,
    is_debug: bool,
    server: &Host,
    client: &Host,
    server_addr: &str,
    client_addr: &str,
    is_sudo: bool,
    config_path: &str,
    ctx: &JobContext,
) -> Result<JobReport> {
    let (server_args, client_args) =
        tcp_integration_args(server_addr, client_addr, &ctx.defaults);
    let server_cmd = format!(
        "test-integration-rust TEST_INTEGRATION=tcp-test LIBOS={} ARGS='{}'",
        libos, server_args
    );
    let client_cmd = format!(
        "test-integration-rust TEST_INTEGRATION=tcp-test LIBOS={} ARGS='{}'",
        libos, client_args
    );
    let test_name = "integration-test";
    let mut jobs = JobSet::new();

    jobs.launch(
        job_name(test_name, Role::Server, server),
        &RunOnLinux::new(server, repo, &server_cmd, is_debug, is_sudo, config_path),
        &ctx.defaults,
    )?;
    jobs.launch(
        job_name(test_name, Role::Client, client),
        &RunOnLinux::new(client, repo, &client_cmd, is_debug, is_sudo, config_path),
        &ctx.defaults,
    )?;

    wait_and_report(test_name, ctx, jobs, true)
}

/// Server and client arguments of the pipe integration test for `run_mode`.
pub(crate) fn pipe_integration_args(server_addr: &str, port: u16, run_mode: &str) -> (String, String) {
    let pipe_name = format!("{}:{}", server_addr, port);
    (
        format!("--peer server --pipe-name {} --run-mode {}", pipe_name, run_mode),
        format!("--peer client --pipe-name {} --run-mode {}", pipe_name, run_mode),
    )
}

#[allow(clippy::too_many_arguments)]
pub fn job_test_integration_pipe_rust(
    repo: &str,
    libos: &str,
    is_debug: bool,
    run_mode: &str,
    server: &Host,
    client: &Host,
    server_addr: &str,
    delay: f64,
    is_sudo: bool,
    config_path: &str,
    ctx: &JobContext,
) -> Result<JobReport> {
    let (server_args, client_args) =
        pipe_integration_args(server_addr, ctx.defaults.server_port, run_mode);
    let server_cmd = format!(
        "test-integration-rust TEST_INTEGRATION=pipe-test LIBOS={} ARGS='{}'",
        libos, server_args
    );
    let client_cmd = format!(
        "test-integration-rust TEST_INTEGRATION=pipe-test LIBOS={} ARGS='{}'",
        libos, client_args
    );
    let test_name = format!("integration-test-{}", run_mode);
    let mut jobs = JobSet::new();

    jobs.launch(
        job_name(&test_name, Role::Server, server),
        &RunOnLinux::new(server, repo, &server_cmd, is_debug, is_sudo, config_path),
        &ctx.defaults,
    )?;
    stagger(delay);
    jobs.launch(
        job_name(&test_name, Role::Client, client),
        &RunOnLinux::new(client, repo, &client_cmd, is_debug, is_sudo, config_path),
        &ctx.defaults,
    )?;

    wait_and_report(&test_name, ctx, jobs, true)
}

pub fn job_cleanup(
    repository: &str,
    server: &Host,
    client: &Host,
    is_sudo: bool,
    enable_nfs: bool,
    ctx: &JobContext,
) -> Result<JobReport> {
    let test_name = "cleanup";
    let default_branch = ctx.defaults.default_branch.as_str();
    let mut jobs = JobSet::new();

    jobs.launch(
        job_name(test_name, Role::Server, server),
        &CleanupOnLinux::new(server, repository, is_sudo, default_branch),
        &ctx.defaults,
    )?;

    if !enable_nfs {
        jobs.launch(
            job_name(test_name, Role::Client, client),
            &CleanupOnLinux::new(client, repository, is_sudo, default_branch),
            &ctx.defaults,
        )?;
    }

    wait_and_report(test_name, ctx, jobs, true)
}
