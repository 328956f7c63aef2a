//! The regression pipeline for one libos on a host pair.
//!
//! Steps run in a fixed order: checkout, compile, unit and integration
//! tests, system tests, cleanup. A step only runs when the steps it builds on
//! passed; cleanup always runs.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::ci_map::{CiMap, SystemTest, SystemTestTarget, TemplateContext};
use crate::defaults::{self, Defaults};
use crate::error::{Error, Result};
use crate::host::{self, Host, Platform};
use crate::job::{linux, windows, JobContext, JobReport};
use crate::report;

/// Libos name that selects the Windows build of catnap.
pub const WINDOWS_LIBOS: &str = "catnapw";

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub server: String,
    pub client: String,
    pub repository: String,
    pub branch: String,
    pub libos: String,
    pub is_debug: bool,
    pub delay: f64,
    pub enable_nfs: bool,
    pub test_unit: bool,
    /// A test name from the CI map, or `"all"`.
    pub test_system: Option<String>,
    pub server_addr: Option<String>,
    pub client_addr: Option<String>,
    pub config_path: String,
    pub output_dir: PathBuf,
    pub ci_map: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepStatus {
    pub name: String,
    pub passed: bool,
    pub report: JobReport,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub log_directory: String,
    pub libos: String,
    pub platform: Platform,
    pub branch: String,
    pub profile: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    pub steps: Vec<StepStatus>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
    pub passed: bool,
    pub started_at: String,
    pub finished_at: String,
}

pub fn profile(is_debug: bool) -> &'static str {
    if is_debug {
        "debug"
    } else {
        "release"
    }
}

/// Host platform and the libos name passed to make.
pub fn select_flavor(libos: &str) -> (Platform, &str) {
    if libos == WINDOWS_LIBOS {
        (Platform::Windows, "catnap")
    } else {
        (Platform::Linux, libos)
    }
}

/// `<libos>-<branch>-<debug|release>` with path separators flattened.
pub fn log_directory_name(libos: &str, branch: &str, is_debug: bool) -> String {
    format!("{}-{}-{}", libos, branch, profile(is_debug)).replace('/', "_")
}

/// Create a fresh log directory, keeping the previous run as `<dir>.old`.
pub fn prepare_log_directory(output_dir: &Path, name: &str) -> Result<PathBuf> {
    let log_directory = output_dir.join(name);

    if log_directory.is_dir() {
        let old = output_dir.join(format!("{}.old", name));
        if old.is_dir() {
            fs::remove_dir_all(&old).map_err(|e| {
                Error::internal_io(e.to_string(), Some(format!("remove {}", old.display())))
            })?;
        }
        fs::rename(&log_directory, &old).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("move {}", log_directory.display())))
        })?;
        log_status!("pipeline", "Previous logs moved to {}", old.display());
    }

    fs::create_dir_all(&log_directory).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("create {}", log_directory.display())))
    })?;

    Ok(log_directory)
}

fn needs_tcp_integration(platform: Platform, libos: &str) -> bool {
    platform == Platform::Linux && matches!(libos, "catnap" | "catloop")
}

fn needs_pipe_integration(platform: Platform, libos: &str) -> bool {
    platform == Platform::Linux && libos == "catmem"
}

/// Reject option combinations that would fail halfway through a run.
pub fn validate(options: &PipelineOptions) -> Result<()> {
    let mut missing = Vec::new();
    for (flag, value) in [
        ("--server", &options.server),
        ("--client", &options.client),
        ("--repository", &options.repository),
        ("--branch", &options.branch),
        ("--libos", &options.libos),
    ] {
        if value.trim().is_empty() {
            missing.push(flag.to_string());
        }
    }

    let (platform, libos) = select_flavor(&options.libos);
    let needs_addresses = options.test_system.is_some()
        || (options.test_unit
            && (needs_tcp_integration(platform, libos) || needs_pipe_integration(platform, libos)));
    if needs_addresses {
        if options.server_addr.as_deref().map_or(true, str::is_empty) {
            missing.push("--server-addr".to_string());
        }
        if options.client_addr.as_deref().map_or(true, str::is_empty) {
            missing.push("--client-addr".to_string());
        }
    }

    if !missing.is_empty() {
        return Err(Error::validation_missing_argument(missing));
    }

    if !options.delay.is_finite() || options.delay < 0.0 {
        return Err(Error::validation_invalid_argument(
            "delay",
            "Delay must be a non-negative number of seconds",
            Some(options.delay.to_string()),
            None,
        ));
    }

    if let Some(test) = &options.test_system {
        if test.trim().is_empty() {
            return Err(Error::validation_invalid_argument(
                "test_system",
                "Expected a test name or 'all'",
                None,
                None,
            ));
        }
    }

    Ok(())
}

struct Run<'a> {
    options: &'a PipelineOptions,
    platform: Platform,
    libos: &'a str,
    is_sudo: bool,
    server: Host,
    client: Host,
    ctx: JobContext,
    steps: Vec<StepStatus>,
    skipped: Vec<String>,
}

impl Run<'_> {
    fn record(&mut self, step: &str, report: JobReport) -> bool {
        let passed = report.passed;
        self.steps.push(StepStatus {
            name: step.to_string(),
            passed,
            report,
        });
        passed
    }

    fn checkout(&mut self) -> Result<bool> {
        let o = self.options;
        let report = match self.platform {
            Platform::Windows => windows::job_checkout_windows(
                &o.repository, &o.branch, &self.server, &self.client, o.enable_nfs, &self.ctx,
            )?,
            Platform::Linux => linux::job_checkout(
                &o.repository, &o.branch, &self.server, &self.client, o.enable_nfs, &self.ctx,
            )?,
        };
        Ok(self.record("checkout", report))
    }

    fn compile(&mut self) -> Result<bool> {
        let o = self.options;
        let report = match self.platform {
            Platform::Windows => windows::job_compile_windows(
                &o.repository, self.libos, o.is_debug, &self.server, &self.client, o.enable_nfs,
                &self.ctx,
            )?,
            Platform::Linux => linux::job_compile(
                &o.repository, self.libos, o.is_debug, &self.server, &self.client, o.enable_nfs,
                &self.ctx,
            )?,
        };
        Ok(self.record("compile", report))
    }

    fn unit_tests(&mut self) -> Result<()> {
        let o = self.options;
        let server_addr = o.server_addr.as_deref().unwrap_or_default();
        let client_addr = o.client_addr.as_deref().unwrap_or_default();

        let report = match self.platform {
            Platform::Windows => windows::job_test_unit_rust_windows(
                &o.repository, self.libos, o.is_debug, &self.server, &self.client, self.is_sudo,
                &o.config_path, &self.ctx,
            )?,
            Platform::Linux => linux::job_test_unit_rust(
                &o.repository, self.libos, o.is_debug, &self.server, &self.client, self.is_sudo,
                &o.config_path, &self.ctx,
            )?,
        };
        self.record("unit_tests", report);

        if needs_tcp_integration(self.platform, self.libos) {
            let report = linux::job_test_integration_tcp_rust(
                &o.repository, self.libos, o.is_debug, &self.server, &self.client, server_addr,
                client_addr, self.is_sudo, &o.config_path, &self.ctx,
            )?;
            self.record("integration_tests", report);
        } else if needs_pipe_integration(self.platform, self.libos) {
            for mode in linux::PIPE_RUN_MODES {
                let report = linux::job_test_integration_pipe_rust(
                    &o.repository, self.libos, o.is_debug, mode, &self.server, &self.client,
                    server_addr, o.delay, self.is_sudo, &o.config_path, &self.ctx,
                )?;
                self.record(&format!("integration_tests-{}", mode), report);
            }
        }
        // TCP integration tests stay disabled on Windows until they pass there upstream.

        Ok(())
    }

    fn system_tests(&mut self, selection: &str, defaults: &Defaults) -> Result<()> {
        let o = self.options;
        let map_path = o
            .ci_map
            .clone()
            .unwrap_or_else(|| PathBuf::from(&defaults.ci_map_path));
        let ci_map = CiMap::load(&map_path)?;
        let tests = ci_map.get_test_details(self.libos, selection)?;

        let (server, client) = (self.server.clone(), self.client.clone());
        let vars = TemplateContext {
            libos: self.libos,
            server_name: &server.name,
            server_ip: o.server_addr.as_deref().unwrap_or_default(),
            client_name: &client.name,
            client_ip: o.client_addr.as_deref().unwrap_or_default(),
        };
        let target = SystemTestTarget {
            repository: &o.repository,
            libos: self.libos,
            is_debug: o.is_debug,
            server: &server,
            client: &client,
            is_sudo: self.is_sudo,
            delay: o.delay,
            config_path: &o.config_path,
        };

        for (alias, details) in &tests {
            let test = SystemTest::new(alias, details, &vars)?;
            if self.platform == Platform::Linux && o.is_debug && test.skip_debug {
                log_status!("pipeline", "Skipping {} in debug build", test.alias);
                self.skipped.push(test.alias);
                continue;
            }
            let report = test.execute(&target, &self.ctx)?;
            self.record(&test.alias, report);
        }

        Ok(())
    }

    fn cleanup(&mut self) -> Result<bool> {
        let o = self.options;
        let report = match self.platform {
            Platform::Windows => windows::job_cleanup_windows(
                &o.repository, &self.server, &self.client, self.is_sudo, o.enable_nfs, &self.ctx,
            )?,
            Platform::Linux => linux::job_cleanup(
                &o.repository, &self.server, &self.client, self.is_sudo, o.enable_nfs, &self.ctx,
            )?,
        };
        Ok(self.record("cleanup", report))
    }
}

/// Run the whole pipeline and write `summary.json` into the log directory.
pub fn run_pipeline(options: &PipelineOptions) -> Result<PipelineResult> {
    let defaults = defaults::load_defaults();
    run_pipeline_with(options, defaults)
}

pub fn run_pipeline_with(options: &PipelineOptions, defaults: Defaults) -> Result<PipelineResult> {
    validate(options)?;
    let started_at = report::timestamp();

    let is_sudo = defaults.requires_sudo(&options.libos);
    let (platform, libos) = select_flavor(&options.libos);
    let server = host::resolve(&options.server, platform)?;
    let client = host::resolve(&options.client, platform)?;

    let name = log_directory_name(&options.libos, &options.branch, options.is_debug);
    let log_directory = prepare_log_directory(&options.output_dir, &name)?;
    log_status!(
        "pipeline",
        "{} on {} ({}), logs in {}",
        libos,
        platform.as_str(),
        profile(options.is_debug),
        log_directory.display()
    );

    let mut run = Run {
        options,
        platform,
        libos,
        is_sudo,
        server,
        client,
        ctx: JobContext::new(log_directory.clone(), options.timeout, defaults.clone()),
        steps: Vec::new(),
        skipped: Vec::new(),
    };

    let tests = run_steps(&mut run, &defaults);
    let cleaned = run.cleanup();

    // A failure to launch a test is reported only after cleanup has run.
    tests?;
    cleaned?;

    let passed = run.steps.iter().all(|s| s.passed);
    let result = PipelineResult {
        log_directory: log_directory.display().to_string(),
        libos: libos.to_string(),
        platform,
        branch: options.branch.clone(),
        profile: profile(options.is_debug).to_string(),
        commit: report::local_commit(),
        steps: run.steps,
        skipped: run.skipped,
        passed,
        started_at,
        finished_at: report::timestamp(),
    };

    report::write_summary(&log_directory, &result)?;
    log_status!(
        "pipeline",
        "[{}] {}",
        if passed { "PASSED" } else { "FAILED" },
        name
    );

    Ok(result)
}

fn run_steps(run: &mut Run<'_>, defaults: &Defaults) -> Result<()> {
    let built = run.checkout()? && run.compile()?;
    if !built {
        return Ok(());
    }

    if run.options.test_unit {
        run.unit_tests()?;
    }

    if let Some(selection) = run.options.test_system.as_deref() {
        run.system_tests(selection, defaults)?;
    }

    Ok(())
}
