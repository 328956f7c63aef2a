use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

/// Base pairci config directory (~/.config/pairci/ on Unix, %APPDATA%\pairci on Windows)
pub fn pairci() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        let appdata = env::var("APPDATA").map_err(|_| {
            Error::internal_unexpected(
                "APPDATA environment variable not set on Windows".to_string(),
            )
        })?;
        Ok(PathBuf::from(appdata).join("pairci"))
    }

    #[cfg(not(windows))]
    {
        let home = env::var("HOME").map_err(|_| {
            Error::internal_unexpected(
                "HOME environment variable not set on Unix-like system".to_string(),
            )
        })?;
        Ok(PathBuf::from(home).join(".config").join("pairci"))
    }
}

/// Global pairci.json config file path
pub fn pairci_json() -> Result<PathBuf> {
    Ok(pairci()?.join("pairci.json"))
}

/// Hosts directory
pub fn hosts() -> Result<PathBuf> {
    Ok(pairci()?.join("hosts"))
}

/// Host config file path
pub fn host(name: &str) -> Result<PathBuf> {
    Ok(hosts()?.join(format!("{}.json", name)))
}
