// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod auth_cmd;
mod car_cmd;
mod config_cmd;

pub(super) use self::{
    auth_cmd::AuthCommands,
    car_cmd::{DagSizeCommand, RootsCommand},
    config_cmd::ConfigCommands,
};
use crate::cli_shared::cli::CliOpts;
use clap::Parser;

/// CLI structure generated when interacting with the gateway binary
#[derive(Parser)]
#[command(name = env!("CARGO_PKG_NAME"), author = env!("CARGO_PKG_AUTHORS"), version = env!("CARGO_PKG_VERSION"), about = env!("CARGO_PKG_DESCRIPTION"))]
pub struct Cli {
    #[command(flatten)]
    pub opts: CliOpts,
    #[command(subcommand)]
    pub cmd: Subcommand,
}

#[derive(clap::Subcommand, Debug)]
pub enum Subcommand {
    /// Run the HTTP service
    Serve,

    /// Compute the size of the DAG stored in a CAR file
    DagSize(DagSizeCommand),

    /// List the roots declared by a CAR file
    Roots(RootsCommand),

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Manage API keys
    #[command(subcommand)]
    Auth(AuthCommands),
}
