use serde::{Deserialize, Serialize};
use std::fs;

use crate::io::{self, FileKind};
use crate::paths;

/// Root configuration structure for pairci.json
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PairciConfig {
    #[serde(default)]
    pub defaults: Defaults,
}

/// All configurable defaults that can be overridden via pairci.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    /// Branch every host is returned to during cleanup.
    #[serde(default = "default_branch")]
    pub default_branch: String,

    #[serde(default = "default_ci_map_path")]
    pub ci_map_path: String,

    #[serde(default = "default_server_port")]
    pub server_port: u16,

    #[serde(default = "default_client_port")]
    pub client_port: u16,

    /// Libos flavors whose tests need root on Linux hosts.
    #[serde(default = "default_sudo_libos")]
    pub sudo_libos: Vec<String>,

    #[serde(default = "default_windows_shell")]
    pub windows_shell: String,

    #[serde(default = "default_ssh_connect_timeout")]
    pub ssh_connect_timeout: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            default_branch: default_branch(),
            ci_map_path: default_ci_map_path(),
            server_port: default_server_port(),
            client_port: default_client_port(),
            sudo_libos: default_sudo_libos(),
            windows_shell: default_windows_shell(),
            ssh_connect_timeout: default_ssh_connect_timeout(),
        }
    }
}

impl Defaults {
    pub fn requires_sudo(&self, libos: &str) -> bool {
        self.sudo_libos.iter().any(|l| l == libos)
    }
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_branch() -> String {
    "dev".to_string()
}

fn default_ci_map_path() -> String {
    "tools/ci/config/ci_map.yaml".to_string()
}

fn default_server_port() -> u16 {
    12345
}

fn default_client_port() -> u16 {
    23456
}

fn default_sudo_libos() -> Vec<String> {
    vec![
        "catnip".to_string(),
        "catpowder".to_string(),
        "catloop".to_string(),
    ]
}

fn default_windows_shell() -> String {
    "pwsh".to_string()
}

fn default_ssh_connect_timeout() -> u32 {
    10
}

// =============================================================================
// Loading functions
// =============================================================================

/// Load defaults, merging file config with built-in defaults.
/// If pairci.json is missing or invalid, silently returns built-in defaults.
pub fn load_defaults() -> Defaults {
    load_config().defaults
}

/// Load the full pairci.json config, falling back to defaults on any error.
pub fn load_config() -> PairciConfig {
    load_config_from_file().unwrap_or_default()
}

fn load_config_from_file() -> crate::Result<PairciConfig> {
    let path = paths::pairci_json()?;

    if !path.exists() {
        return Err(crate::Error::internal_unexpected("pairci.json not found"));
    }

    let content = io::read_file(&path, FileKind::Settings)?;

    serde_json::from_str(&content)
        .map_err(|e| crate::Error::config_invalid_json(path.display().to_string(), e))
}

/// Save config to pairci.json file (creates if missing).
pub fn save_config(config: &PairciConfig) -> crate::Result<()> {
    let path = paths::pairci_json()?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            crate::Error::internal_io(e.to_string(), Some(format!("create {}", parent.display())))
        })?;
    }

    let content = serde_json::to_string_pretty(config).map_err(|e| {
        crate::Error::internal_json(e.to_string(), Some("serialize pairci.json".to_string()))
    })?;

    io::write_file(&path, &content, FileKind::Settings)
}

/// Delete pairci.json file (reset to defaults)
pub fn reset_config() -> crate::Result<bool> {
    let path = paths::pairci_json()?;

    if path.exists() {
        fs::remove_file(&path).map_err(|e| {
            crate::Error::internal_io(e.to_string(), Some(format!("delete {}", path.display())))
        })?;
        Ok(true)
    } else {
        Ok(false)
    }
}

pub fn config_exists() -> bool {
    paths::pairci_json().map(|p| p.exists()).unwrap_or(false)
}

/// Get the path to pairci.json (for display purposes)
pub fn config_path() -> crate::Result<String> {
    Ok(paths::pairci_json()?.display().to_string())
}
