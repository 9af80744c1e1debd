//! ncgroups CLI
//!
//! Command-line access to apply-groups on a NETCONF device: read a group,
//! replace or delete it, merge loose configuration, commit, or send a raw RPC.

pub mod commands;
pub mod settings;


pub use settings::ConnectionArgs;
