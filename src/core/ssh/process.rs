//! A started remote command whose output is drained in the background.

use crate::error::{Error, Result};
use std::io::Read;
use std::process::Child;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct RemoteProcess {
    host: String,
    child: Child,
    stdout: JoinHandle<String>,
    stderr: JoinHandle<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// None when the process was killed by a signal or by the timeout.
    pub exit_code: Option<i32>,
    pub success: bool,
    pub timed_out: bool,
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

impl RemoteProcess {
    pub(crate) fn new(host: &str, mut child: Child) -> Result<Self> {
        let stdout = child.stdout.take().ok_or_else(|| {
            Error::internal_unexpected(format!("stdout of process on {} was not piped", host))
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            Error::internal_unexpected(format!("stderr of process on {} was not piped", host))
        })?;

        Ok(Self {
            host: host.to_string(),
            stdout: drain(stdout),
            stderr: drain(stderr),
            child,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Stop the process without collecting its output.
    pub fn kill(mut self) {
        self.terminate();
        let _ = self.child.wait();
    }

    /// Kill the child and, on unix, the process group it leads.
    /// Must run before the child is reaped so the group id is still ours.
    fn terminate(&mut self) {
        #[cfg(unix)]
        {
            if let Ok(pgid) = libc::pid_t::try_from(self.child.id()) {
                // SAFETY: killpg only sends a signal; pgid is our unreaped child's group.
                unsafe {
                    libc::killpg(pgid, libc::SIGKILL);
                }
            }
        }
        let _ = self.child.kill();
    }

    /// Wait for exit; past `timeout` the process is killed and reported as timed out.
    pub fn wait(mut self, timeout: Option<Duration>) -> Result<ProcessOutput> {
        let context = format!("wait for process on {}", self.host);
        let mut timed_out = false;

        let status = match timeout {
            None => self
                .child
                .wait()
                .map_err(|e| Error::internal_io(e.to_string(), Some(context.clone())))?,
            Some(limit) => {
                let deadline = Instant::now() + limit;
                loop {
                    if let Some(status) = self
                        .child
                        .try_wait()
                        .map_err(|e| Error::internal_io(e.to_string(), Some(context.clone())))?
                    {
                        break status;
                    }
                    if Instant::now() >= deadline {
                        timed_out = true;
                        self.terminate();
                        break self
                            .child
                            .wait()
                            .map_err(|e| Error::internal_io(e.to_string(), Some(context.clone())))?;
                    }
                    thread::sleep(POLL_INTERVAL);
                }
            }
        };

        let stdout = self
            .stdout
            .join()
            .map_err(|_| Error::internal_unexpected(format!("stdout reader for {} panicked", self.host)))?;
        let stderr = self
            .stderr
            .join()
            .map_err(|_| Error::internal_unexpected(format!("stderr reader for {} panicked", self.host)))?;

        Ok(ProcessOutput {
            stdout,
            stderr,
            exit_code: if timed_out { None } else { status.code() },
            success: !timed_out && status.success(),
            timed_out,
        })
    }
}
