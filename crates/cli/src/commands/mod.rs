//! CLI subcommand implementations

pub mod pipeline;
