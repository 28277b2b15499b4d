//! # CLI layer
//!
//! This is **one possible front end** for `vx-engine` — not the engine
//! itself. It owns argument parsing ([`setup`]) and dispatch/output
//! formatting ([`commands`]); every other concern lives in the engine
//! crate and is reached only through [`vx_engine::api::Engine`].

mod commands;
pub mod setup;

use clap::Parser;
use vx_engine::error::Result;

pub fn run() -> Result<()> {
    let cli = setup::Cli::parse();
    commands::run(cli)
}
