//! System test map: which system tests run for each libos, and with which
//! arguments.
//!
//! ```yaml
//! catnap:
//!   tcp_echo:
//!     server_args: "--peer server --address {{server_ip}}:12345"
//!     client_args: "--peer client --address {{server_ip}}:12345"
//!   tcp_ping_pong:
//!     test: tcp-ping-pong
//!     skip_debug: true
//! ```
//!
//! Sections and tests keep file order; `"all"` runs them top to bottom.

use crate::error::{Error, Result};
use crate::host::{Host, Platform};
use crate::io::{self, FileKind};
use crate::job::{self, JobContext, JobReport};
use crate::utils::suggest::closest_match;
use crate::utils::template::{self, TemplateVars};
use serde::{Deserialize, Serialize};
use serde_yml::Value;
use std::path::Path;

/// Selects every test of a libos in [`CiMap::get_test_details`].
pub const ALL_TESTS: &str = "all";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestDetails {
    /// `TEST=` value passed to make; defaults to the map key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
    #[serde(default)]
    pub server_args: String,
    #[serde(default)]
    pub client_args: String,
    #[serde(default = "default_all_pass")]
    pub all_pass: bool,
    /// Skip this test in debug builds on Linux.
    #[serde(default)]
    pub skip_debug: bool,
}

fn default_all_pass() -> bool {
    true
}

#[derive(Debug, Clone)]
pub struct CiMap {
    source: String,
    sections: Vec<(String, Vec<(String, TestDetails)>)>,
}

impl CiMap {
    pub fn load(path: &Path) -> Result<Self> {
        let content = io::read_file(path, FileKind::CiMap)?;
        Self::parse(&content, &path.display().to_string())
    }

    pub fn parse(content: &str, source: &str) -> Result<Self> {
        let root: Value =
            serde_yml::from_str(content).map_err(|e| Error::config_invalid_yaml(source, e))?;

        let mapping = match root {
            Value::Mapping(mapping) => mapping,
            Value::Null => Default::default(),
            _ => {
                return Err(Error::config_invalid_value(
                    "ci_map",
                    Some(source.to_string()),
                    "Top level must map libos names to tests",
                ))
            }
        };

        let mut sections = Vec::new();
        for (libos, tests) in mapping {
            let libos = key_name(&libos, source)?;
            let tests = match tests {
                Value::Mapping(tests) => tests,
                Value::Null => Default::default(),
                _ => {
                    return Err(Error::config_invalid_value(
                        format!("ci_map.{}", libos),
                        Some(source.to_string()),
                        "Each libos must map test names to test details",
                    ))
                }
            };

            let mut entries = Vec::new();
            for (name, details) in tests {
                let name = key_name(&name, source)?;
                let details: TestDetails = match details {
                    Value::Null => serde_yml::from_str::<TestDetails>("{}"),
                    other => serde_yml::from_value::<TestDetails>(other),
                }
                .map_err(|e| Error::config_invalid_yaml(source, e))?;
                entries.push((name, details));
            }
            sections.push((libos, entries));
        }

        Ok(Self {
            source: source.to_string(),
            sections,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn libos_names(&self) -> Vec<String> {
        self.sections.iter().map(|(libos, _)| libos.clone()).collect()
    }

    /// Tests for `libos`: every one of them for `"all"`, otherwise just `test_name`.
    pub fn get_test_details(
        &self,
        libos: &str,
        test_name: &str,
    ) -> Result<Vec<(String, TestDetails)>> {
        let Some((_, tests)) = self.sections.iter().find(|(name, _)| name == libos) else {
            let available = self.libos_names();
            let mut err = Error::ci_map_libos_not_found(libos, available.clone());
            if let Some((suggestion, _)) = closest_match(libos, &available) {
                err = err.with_hint(format!("Did you mean '{}'?", suggestion));
            }
            return Err(err);
        };

        if test_name == ALL_TESTS {
            return Ok(tests.clone());
        }

        match tests.iter().find(|(name, _)| name == test_name) {
            Some(entry) => Ok(vec![entry.clone()]),
            None => {
                let available: Vec<String> = tests.iter().map(|(name, _)| name.clone()).collect();
                let mut err = Error::ci_map_test_not_found(libos, test_name, available.clone());
                if let Some((suggestion, _)) = closest_match(test_name, &available) {
                    err = err.with_hint(format!("Did you mean '{}'?", suggestion));
                }
                Err(err)
            }
        }
    }
}

fn key_name(key: &Value, source: &str) -> Result<String> {
    key.as_str().map(str::to_string).ok_or_else(|| {
        Error::config_invalid_value(
            "ci_map",
            Some(source.to_string()),
            "Libos and test names must be strings",
        )
    })
}

/// Values substituted into argument templates.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    pub libos: &'a str,
    pub server_name: &'a str,
    pub server_ip: &'a str,
    pub client_name: &'a str,
    pub client_ip: &'a str,
}

impl TemplateContext<'_> {
    fn render(&self, field: &str, alias: &str, args: &str) -> Result<String> {
        let rendered = template::render(
            args,
            &[
                (TemplateVars::LIBOS, self.libos),
                (TemplateVars::SERVER_NAME, self.server_name),
                (TemplateVars::SERVER_IP, self.server_ip),
                (TemplateVars::CLIENT_NAME, self.client_name),
                (TemplateVars::CLIENT_IP, self.client_ip),
            ],
        );

        let leftover = template::unresolved(&rendered);
        if !leftover.is_empty() {
            return Err(Error::config_invalid_value(
                format!("{}.{}", alias, field),
                Some(args.to_string()),
                format!("Unknown placeholder(s): {}", leftover.join(", ")),
            ));
        }
        Ok(rendered)
    }
}

/// Where and how a system test runs.
#[derive(Debug, Clone, Copy)]
pub struct SystemTestTarget<'a> {
    pub repository: &'a str,
    pub libos: &'a str,
    pub is_debug: bool,
    pub server: &'a Host,
    pub client: &'a Host,
    pub is_sudo: bool,
    pub delay: f64,
    pub config_path: &'a str,
}

/// A system test with its arguments rendered for a concrete host pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemTest {
    pub alias: String,
    pub test_name: String,
    pub server_args: String,
    pub client_args: String,
    pub all_pass: bool,
    pub skip_debug: bool,
}

impl SystemTest {
    pub fn new(alias: &str, details: &TestDetails, vars: &TemplateContext<'_>) -> Result<Self> {
        Ok(Self {
            alias: alias.to_string(),
            test_name: details.test.clone().unwrap_or_else(|| alias.to_string()),
            server_args: vars.render("server_args", alias, &details.server_args)?,
            client_args: vars.render("client_args", alias, &details.client_args)?,
            all_pass: details.all_pass,
            skip_debug: details.skip_debug,
        })
    }

    /// Run the test on the pair, using the server's platform.
    pub fn execute(&self, target: &SystemTestTarget<'_>, ctx: &JobContext) -> Result<JobReport> {
        let run = match target.server.platform() {
            Platform::Windows => job::windows::job_test_system_rust_windows,
            Platform::Linux => job::linux::job_test_system_rust,
        };

        run(
            &self.alias,
            &self.test_name,
            target.repository,
            target.libos,
            target.is_debug,
            target.server,
            target.client,
            &self.server_args,
            &self.client_args,
            target.is_sudo,
            self.all_pass,
            target.delay,
            target.config_path,
            ctx,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP: &str = r#"
catnap:
  tcp_echo:
    server_args: "--peer server --address {{server_ip}}:12345"
    client_args: "--peer client --address {{server_ip}}:12345 --libos {{libos}}"
  udp_push_pop:
    all_pass: false
  tcp_ping_pong:
    test: tcp-ping-pong
    skip_debug: true
catmem:
catnapw:
  tcp_echo:
"#;

    fn vars() -> TemplateContext<'static> {
        TemplateContext {
            libos: "catnap",
            server_name: "node8",
            server_ip: "10.0.1.8",
            client_name: "node7",
            client_ip: "10.0.1.7",
        }
    }

    #[test]
    fn all_keeps_file_order() {
        let map = CiMap::parse(MAP, "ci_map.yaml").unwrap();
        let names: Vec<String> = map
            .get_test_details("catnap", ALL_TESTS)
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["tcp_echo", "udp_push_pop", "tcp_ping_pong"]);
        assert_eq!(map.libos_names(), vec!["catnap", "catmem", "catnapw"]);
    }

    #[test]
    fn details_defaults() {
        let map = CiMap::parse(MAP, "ci_map.yaml").unwrap();
        let (_, details) = &map.get_test_details("catnap", "udp_push_pop").unwrap()[0];
        assert!(!details.all_pass);
        assert!(!details.skip_debug);
        assert_eq!(details.server_args, "");

        let (_, details) = &map.get_test_details("catnapw", "tcp_echo").unwrap()[0];
        assert!(details.all_pass);
        assert!(map.get_test_details("catmem", ALL_TESTS).unwrap().is_empty());
    }

    #[test]
    fn unknown_test_suggests_closest() {
        let map = CiMap::parse(MAP, "ci_map.yaml").unwrap();
        let err = map.get_test_details("catnap", "tcp_ecko").unwrap_err();
        assert_eq!(err.code.as_str(), "ci_map.test_not_found");
        assert!(err.hints.iter().any(|h| h.message == "Did you mean 'tcp_echo'?"));
        assert_eq!(err.details["available"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn unknown_libos() {
        let map = CiMap::parse(MAP, "ci_map.yaml").unwrap();
        let err = map.get_test_details("catnop", ALL_TESTS).unwrap_err();
        assert_eq!(err.code.as_str(), "ci_map.libos_not_found");
        assert!(err.hints.iter().any(|h| h.message.contains("'catnap'")));
    }

    #[test]
    fn invalid_yaml_is_reported() {
        let err = CiMap::parse("catnap: [unterminated", "bad.yaml").unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_yaml");

        let err = CiMap::parse("- catnap\n- catnip\n", "list.yaml").unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
    }

    #[test]
    fn system_test_renders_arguments() {
        let map = CiMap::parse(MAP, "ci_map.yaml").unwrap();
        let (alias, details) = &map.get_test_details("catnap", "tcp_echo").unwrap()[0];
        let test = SystemTest::new(alias, details, &vars()).unwrap();
        assert_eq!(test.test_name, "tcp_echo");
        assert_eq!(test.server_args, "--peer server --address 10.0.1.8:12345");
        assert_eq!(
            test.client_args,
            "--peer client --address 10.0.1.8:12345 --libos catnap"
        );
    }

    #[test]
    fn system_test_name_override() {
        let map = CiMap::parse(MAP, "ci_map.yaml").unwrap();
        let (alias, details) = &map.get_test_details("catnap", "tcp_ping_pong").unwrap()[0];
        let test = SystemTest::new(alias, details, &vars()).unwrap();
        assert_eq!(test.alias, "tcp_ping_pong");
        assert_eq!(test.test_name, "tcp-ping-pong");
        assert!(test.skip_debug);
    }

    #[test]
    fn unknown_placeholder_is_rejected() {
        let details = TestDetails {
            test: None,
            server_args: "--address {{sever_ip}}".to_string(),
            client_args: String::new(),
            all_pass: true,
            skip_debug: false,
        };
        let err = SystemTest::new("tcp_echo", &details, &vars()).unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
        assert_eq!(err.details["key"], "tcp_echo.server_args");
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ci_map.yaml");
        std::fs::write(&path, MAP).unwrap();
        let map = CiMap::load(&path).unwrap();
        assert_eq!(map.source(), path.display().to_string());
    }
}
