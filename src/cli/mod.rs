//! CLI module for memory-gateway - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
