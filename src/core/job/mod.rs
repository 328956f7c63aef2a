//! Jobs: launch a task on one or both hosts, wait for every process, and
//! report a single pass/fail for the test.

pub mod linux;
pub mod windows;

use crate::defaults::Defaults;
use crate::error::{Error, Result};
use crate::host::{Host, Role};
use crate::io::{self, FileKind};
use crate::ssh::RemoteProcess;
use crate::task::Task;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Shared settings for every job of a pipeline run.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub log_directory: PathBuf,
    pub timeout: Option<Duration>,
    pub defaults: Defaults,
}

impl JobContext {
    pub fn new(log_directory: impl Into<PathBuf>, timeout: Option<Duration>, defaults: Defaults) -> Self {
        Self {
            log_directory: log_directory.into(),
            timeout,
            defaults,
        }
    }
}

/// `"{test_name}-{role}-{host}"`, e.g. `checkout-server-node8`.
pub fn job_name(test_name: &str, role: Role, host: &Host) -> String {
    format!("{}-{}-{}", test_name, role, host.name)
}

/// Running processes keyed by job name, in launch order.
#[derive(Default)]
pub struct JobSet {
    entries: Vec<(String, RemoteProcess)>,
}

impl JobSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: String, process: RemoteProcess) {
        if let Some(pos) = self.entries.iter().position(|(n, _)| *n == name) {
            let (_, previous) = self.entries.remove(pos);
            previous.kill();
        }
        self.entries.push((name, process));
    }

    /// Execute `task` and record it under `name`. On failure every job
    /// already started is killed so no process outlives the job.
    pub fn launch(&mut self, name: String, task: &dyn Task, defaults: &Defaults) -> Result<()> {
        match task.execute(defaults) {
            Ok(process) => {
                log_status!("job", "Started {} (pid {})", name, process.id());
                self.insert(name, process);
                Ok(())
            }
            Err(err) => {
                self.kill_all();
                Err(err)
            }
        }
    }

    pub fn kill_all(&mut self) {
        for (name, process) in self.entries.drain(..) {
            log_status!("job", "Killing {}", name);
            process.kill();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutcome {
    pub name: String,
    pub host: String,
    pub exit_code: Option<i32>,
    pub success: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub timed_out: bool,
    pub stdout_log: String,
    pub stderr_log: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub name: String,
    pub passed: bool,
    pub all_pass: bool,
    pub jobs: Vec<JobOutcome>,
}

fn log_path(log_directory: &Path, job: &str, stream: &str) -> PathBuf {
    log_directory.join(format!("{}.{}.txt", job, stream))
}

/// Wait for every job in launch order and write its output to log files.
pub fn wait_jobs(
    log_directory: &Path,
    jobs: JobSet,
    timeout: Option<Duration>,
) -> Result<Vec<JobOutcome>> {
    let mut outcomes = Vec::with_capacity(jobs.len());
    let mut pending = jobs.entries.into_iter();

    while let Some((name, process)) = pending.next() {
        let host = process.host().to_string();
        let output = match process.wait(timeout) {
            Ok(output) => output,
            Err(err) => {
                pending.for_each(|(_, p)| p.kill());
                return Err(err);
            }
        };

        if output.timed_out {
            log_status!("job", "{} timed out and was killed", name);
        }

        let stdout_log = log_path(log_directory, &name, "stdout");
        let stderr_log = log_path(log_directory, &name, "stderr");
        let written = io::write_file(&stdout_log, &output.stdout, FileKind::JobLog)
            .and_then(|_| io::write_file(&stderr_log, &output.stderr, FileKind::JobLog));
        if let Err(err) = written {
            pending.for_each(|(_, p)| p.kill());
            return Err(err);
        }

        outcomes.push(JobOutcome {
            name,
            host,
            exit_code: output.exit_code,
            success: output.success,
            timed_out: output.timed_out,
            stdout_log: stdout_log.display().to_string(),
            stderr_log: stderr_log.display().to_string(),
        });
    }

    Ok(outcomes)
}

/// Wait for `jobs` and decide whether `test_name` passed.
///
/// With `all_pass` every job must succeed; otherwise only the first job
/// (always the server) counts.
pub fn wait_and_report(
    test_name: &str,
    ctx: &JobContext,
    jobs: JobSet,
    all_pass: bool,
) -> Result<JobReport> {
    if jobs.is_empty() {
        return Err(Error::validation_invalid_argument(
            "jobs",
            format!("No jobs were started for '{}'", test_name),
            None,
            None,
        ));
    }

    let outcomes = wait_jobs(&ctx.log_directory, jobs, ctx.timeout)?;
    let passed = if all_pass {
        outcomes.iter().all(|o| o.success)
    } else {
        outcomes.first().map(|o| o.success).unwrap_or(false)
    };

    log_status!(
        "job",
        "[{}] {}",
        if passed { "PASSED" } else { "FAILED" },
        test_name
    );

    Ok(JobReport {
        name: test_name.to_string(),
        passed,
        all_pass,
        jobs: outcomes,
    })
}

/// Sleep between launching the server and the client.
pub(crate) fn stagger(delay: f64) {
    if delay > 0.0 && delay.is_finite() {
        std::thread::sleep(Duration::from_secs_f64(delay));
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::host::Platform;

    struct Script {
        host: Host,
        script: String,
    }

    impl Task for Script {
        fn host(&self) -> &Host {
            &self.host
        }

        fn script(&self) -> String {
            self.script.clone()
        }
    }

    fn local(script: &str) -> Script {
        Script {
            host: Host::named("localhost", Platform::Linux),
            script: script.to_string(),
        }
    }

    fn context(dir: &Path) -> JobContext {
        JobContext::new(dir, Some(Duration::from_secs(20)), Defaults::default())
    }

    fn launch_pair(server: &str, client: &str) -> JobSet {
        let defaults = Defaults::default();
        let mut jobs = JobSet::new();
        jobs.launch("t-server-localhost".into(), &local(server), &defaults)
            .unwrap();
        jobs.launch("t-client-localhost".into(), &local(client), &defaults)
            .unwrap();
        jobs
    }

    #[test]
    fn job_name_format() {
        let host = Host::named("node8", Platform::Linux);
        assert_eq!(job_name("checkout", Role::Server, &host), "checkout-server-node8");
        assert_eq!(job_name("compile-debug", Role::Client, &host), "compile-debug-client-node8");
    }

    #[test]
    fn all_pass_requires_every_job() {
        let dir = tempfile::tempdir().unwrap();
        let report = wait_and_report("t", &context(dir.path()), launch_pair("true", "exit 1"), true)
            .unwrap();
        assert!(!report.passed);
        assert_eq!(report.jobs.len(), 2);
        assert!(report.jobs[0].success);
        assert_eq!(report.jobs[1].exit_code, Some(1));
    }

    #[test]
    fn server_only_when_not_all_pass() {
        let dir = tempfile::tempdir().unwrap();
        let report = wait_and_report("t", &context(dir.path()), launch_pair("true", "exit 1"), false)
            .unwrap();
        assert!(report.passed);

        let report = wait_and_report("t", &context(dir.path()), launch_pair("exit 2", "true"), false)
            .unwrap();
        assert!(!report.passed);
    }

    #[test]
    fn logs_are_written_per_job() {
        let dir = tempfile::tempdir().unwrap();
        let report = wait_and_report(
            "t",
            &context(dir.path()),
            launch_pair("echo served; echo warn >&2", "echo connected"),
            true,
        )
        .unwrap();
        assert!(report.passed);

        let server_out = std::fs::read_to_string(dir.path().join("t-server-localhost.stdout.txt")).unwrap();
        let server_err = std::fs::read_to_string(dir.path().join("t-server-localhost.stderr.txt")).unwrap();
        let client_out = std::fs::read_to_string(dir.path().join("t-client-localhost.stdout.txt")).unwrap();
        assert_eq!(server_out, "served\n");
        assert_eq!(server_err, "warn\n");
        assert_eq!(client_out, "connected\n");
    }

    #[test]
    fn timed_out_job_fails_the_test() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = JobContext::new(dir.path(), Some(Duration::from_millis(300)), Defaults::default());
        let mut jobs = JobSet::new();
        jobs.launch("slow-server-localhost".into(), &local("exec sleep 30"), &ctx.defaults)
            .unwrap();
        let report = wait_and_report("slow", &ctx, jobs, true).unwrap();
        assert!(!report.passed);
        assert!(report.jobs[0].timed_out);
    }

    #[test]
    fn empty_job_set_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = wait_and_report("none", &context(dir.path()), JobSet::new(), true).unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_argument");
    }

    #[test]
    fn names_keep_launch_order() {
        let jobs = launch_pair("true", "true");
        assert_eq!(jobs.names(), vec!["t-server-localhost", "t-client-localhost"]);
        let dir = tempfile::tempdir().unwrap();
        wait_jobs(dir.path(), jobs, None).unwrap();
    }
}
