//! Application plumbing: command-line arguments and logging setup.

pub mod cli;
pub mod logging;
