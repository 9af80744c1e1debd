//! CLI commands

pub mod config;
pub mod group;
pub mod send;

pub use config::ConfigCommand;
pub use group::GroupCommand;
pub use send::SendCommand;
