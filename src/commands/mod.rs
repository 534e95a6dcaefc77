// commands/mod.rs
// One module per CLI subcommand

pub mod config;
pub mod discography;
pub mod reconcile;
pub mod replacements;
pub mod scan;
pub mod tags;
