use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use pairci::ci_map::{CiMap, TestDetails, ALL_TESTS};
use pairci::defaults;
use pairci::pipeline::select_flavor;

use super::CmdResult;

#[derive(Args)]
pub struct TestsArgs {
    /// Libos whose system tests to list
    #[arg(long)]
    libos: String,

    /// CI map file (default: the ci_map_path setting)
    #[arg(long)]
    ci_map: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct TestsOutput {
    command: String,
    ci_map: String,
    libos: String,
    tests: Vec<TestEntry>,
}

#[derive(Debug, Serialize)]
pub struct TestEntry {
    name: String,
    #[serde(flatten)]
    details: TestDetails,
}

pub fn run(args: TestsArgs) -> CmdResult<TestsOutput> {
    let path = args
        .ci_map
        .unwrap_or_else(|| PathBuf::from(defaults::load_defaults().ci_map_path));
    let ci_map = CiMap::load(&path)?;

    // The Windows pipeline looks tests up under the libos it builds.
    let (_, libos) = select_flavor(&args.libos);
    let tests = ci_map
        .get_test_details(libos, ALL_TESTS)?
        .into_iter()
        .map(|(name, details)| TestEntry { name, details })
        .collect();

    Ok((
        TestsOutput {
            command: "tests.list".to_string(),
            ci_map: ci_map.source().to_string(),
            libos: libos.to_string(),
            tests,
        },
        0,
    ))
}
