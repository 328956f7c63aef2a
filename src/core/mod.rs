// Public modules
pub mod ci_map;
pub mod defaults;
pub mod error;
pub mod host;
pub mod job;
pub mod pipeline;
pub mod report;
pub mod ssh;
pub mod task;

// Internal modules - not part of public API
pub(crate) mod paths;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
