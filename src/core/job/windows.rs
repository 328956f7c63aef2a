//! Jobs for a Windows host pair.

use super::{job_name, stagger, wait_and_report, JobContext, JobReport, JobSet};
use crate::defaults::Defaults;
use crate::error::Result;
use crate::host::{Host, Role};
use crate::ssh::RemoteProcess;
use crate::task::{CheckoutOnWindows, CleanupOnWindows, CompileOnWindows, RunOnWindows, Task};

// ============================================================================
// Remote Commands
// ============================================================================

/// Executes a make target on a remote Windows host.
pub fn remote_run_windows(
    host: &Host,
    repository: &str,
    is_debug: bool,
    target: &str,
    is_sudo: bool,
    config_path: &str,
    defaults: &Defaults,
) -> Result<RemoteProcess> {
    RunOnWindows::new(host, repository, target, is_debug, is_sudo, config_path).execute(defaults)
}

// ============================================================================
// Generic Jobs
// ============================================================================

pub fn job_checkout_windows(
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
        &CheckoutOnWindows::new(server, repository, branch),
        &ctx.defaults,
    )?;

    if !enable_nfs {
        jobs.launch(
            job_name(test_name, Role::Client, client),
            &CheckoutOnWindows::new(client, repository, branch),
            &ctx.defaults,
        )?;
    }

    wait_and_report(test_name, ctx, jobs, true)
}

pub fn job_compile_windows(
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
        &CompileOnWindows::new(server, repository, &target, is_debug),
        &ctx.defaults,
    )?;

    if !enable_nfs {
        jobs.launch(
            job_name(&test_name, Role::Client, client),
            &CompileOnWindows::new(client, repository, &target, is_debug),
            &ctx.defaults,
        )?;
    }

    wait_and_report(&test_name, ctx, jobs, true)
}

#[allow(clippy::too_many_arguments)]
pub fn job_test_system_rust_windows(
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
        &RunOnWindows::new(server, repo, &server_cmd, is_debug, is_sudo, config_path),
        &ctx.defaults,
    )?;
    stagger(delay);
    jobs.launch(
        job_name(test_alias, Role::Client, client),
        &RunOnWindows::new(client, repo, &client_cmd, is_debug, is_sudo, config_path),
        &ctx.defaults,
    )?;

    wait_and_report(test_alias, ctx, jobs, all_pass)
}

#[allow(clippy::too_many_arguments)]
pub fn job_test_unit_rust_windows(
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
    let process = remote_run_windows(
        server,
        repo,
        is_debug,
        &server_cmd,
        is_sudo,
        config_path,
        &ctx.defaults,
    )?;
    jobs.insert(job_name(test_name, Role::Server, server), process);

    wait_and_report(test_name, ctx, jobs, true)
}

#[allow(clippy::too_many_arguments)]
pub fn job_test_integration_tcp_rust_windows(
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
        &RunOnWindows::new(server, repo, &server_cmd, is_debug, is_sudo, config_path),
        &ctx.defaults,
    )?;
    jobs.launch(
        job_name(test_name, Role::Client, client),
        &RunOnWindows::new(client, repo, &client_cmd, is_debug, is_sudo, config_path),
        &ctx.defaults,
    )?;

    wait_and_report(test_name, ctx, jobs, true)
}

pub fn job_cleanup_windows(
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
        &CleanupOnWindows::new(server, repository, is_sudo, default_branch),
        &ctx.defaults,
    )?;

    if !enable_nfs {
        jobs.launch(
            job_name(test_name, Role::Client, client),
            &CleanupOnWindows::new(client, repository, is_sudo, default_branch),
            &ctx.defaults,
        )?;
    }

    wait_and_report(test_name, ctx, jobs, true)
}

/// Mirrored local/remote address arguments for the TCP integration test.
pub(crate) fn tcp_integration_args(
    server_addr: &str,
    client_addr: &str,
    defaults: &Defaults,
) -> (String, String) {
    let server_args = format!(
        "--local-address {}:{} --remote-address {}:{}",
        server_addr, defaults.server_port, client_addr, defaults.client_port
    );
    let client_args = format!(
        "--local-address {}:{} --remote-address {}:{}",
        client_addr, defaults.client_port, server_addr, defaults.server_port
    );
    (server_args, client_args)
}
