mod client;
mod process;

pub use client::{is_local_host, CommandOutput, SshClient};
pub use process::{ProcessOutput, RemoteProcess};
