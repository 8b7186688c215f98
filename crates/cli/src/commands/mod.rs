//! Subcommand implementations

pub mod predict;
pub mod remote;
pub mod simulate;
pub mod status;
