//! Generic utility primitives with zero domain knowledge.
//!
//! - `command` - Local command execution
//! - `io` - File I/O with consistent error handling
//! - `shell` - Shell escaping and quoting (sh and PowerShell)
//! - `suggest` - "Did you mean" matching for unknown names
//! - `template` - String template rendering

pub mod command;
pub mod io;
pub mod shell;
pub mod suggest;
pub(crate) mod template;
