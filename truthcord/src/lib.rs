//! # truthcord
//!
//! Binary-side crate: command line, configuration loading and the HTTP
//! implementations of the collaborator traits defined in `truthcord-core`.

pub mod azure;
pub mod cli;
pub mod discord;
pub mod load_config;
pub mod media;
pub mod truthsocial;

pub use cli::{run, Cli, Commands};
