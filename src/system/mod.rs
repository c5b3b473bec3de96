//! External process plumbing shared by the UPS and host adapters.

pub mod executor;
pub mod parser;

pub use executor::{CommandError, CommandRunner};
