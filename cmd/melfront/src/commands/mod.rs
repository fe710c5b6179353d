//! CLI commands module.

mod config;
mod extract;
mod shape;
mod util;

pub use config::ConfigCommand;
pub use extract::ExtractCommand;
pub use shape::ShapeCommand;

pub(crate) use util::*;
