use crate::error::{Error, Result};
use crate::io::{self, FileKind};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Linux,
    Windows,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Windows => "windows",
        }
    }
}

/// Which end of the pair a job runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Server,
    Client,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Server => write!(f, "server"),
            Role::Client => write!(f, "client"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Host {
    #[serde(skip_deserializing, default)]
    pub name: String,
    /// SSH destination; defaults to the host name so ssh_config aliases work.
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub identity_file: Option<String>,
    #[serde(default)]
    pub platform: Option<Platform>,
}

fn default_port() -> u16 {
    22
}

impl Host {
    /// A host with no config file: the name is the SSH destination.
    pub fn named(name: &str, platform: Platform) -> Self {
        Self {
            name: name.to_string(),
            address: None,
            user: None,
            port: default_port(),
            identity_file: None,
            platform: Some(platform),
        }
    }

    pub fn destination(&self) -> String {
        let address = self.address.as_deref().unwrap_or(&self.name);
        match &self.user {
            Some(user) if !user.is_empty() => format!("{}@{}", user, address),
            _ => address.to_string(),
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform.unwrap_or_default()
    }
}

/// Load a host config by name; an absent file yields a default host on `platform`.
///
/// A platform recorded in the host file wins over the pipeline flavor.
pub fn resolve(name: &str, platform: Platform) -> Result<Host> {
    if name.trim().is_empty() {
        return Err(Error::validation_invalid_argument(
            "host",
            "Host name cannot be empty",
            None,
            None,
        ));
    }

    let path = paths::host(name)?;
    if !path.exists() {
        return Ok(Host::named(name, platform));
    }

    let content = io::read_file(&path, FileKind::HostConfig)?;
    let mut host = parse(&content, &path.display().to_string())?;
    host.name = name.to_string();
    if host.platform.is_none() {
        host.platform = Some(platform);
    }
    Ok(host)
}

pub(crate) fn parse(content: &str, source: &str) -> Result<Host> {
    serde_json::from_str(content).map_err(|e| Error::config_invalid_json(source, e))
}

/// List every configured host file.
pub fn list() -> Result<Vec<Host>> {
    let dir = paths::hosts()?;
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(&dir).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("read {}", dir.display())))
    })?;

    let mut hosts = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let content = io::read_file(&path, FileKind::HostConfig)?;
        let mut host = parse(&content, &path.display().to_string())?;
        host.name = name.to_string();
        hosts.push(host);
    }

    hosts.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(hosts)
}
