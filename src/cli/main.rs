// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::ffi::OsString;

use crate::cli::subcommands::{Cli, Subcommand};
use crate::cli_shared::{logger, read_config};
use crate::daemon;
use anyhow::Context as _;
use clap::Parser;
use tracing::info;

pub fn main<ArgT>(args: impl IntoIterator<Item = ArgT>) -> anyhow::Result<()>
where
    ArgT: Into<OsString> + Clone,
{
    // Capture Cli inputs
    let Cli { opts, cmd } = Cli::parse_from(args);
    let (config_path, config) = read_config(opts.config.as_ref())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    let stdout = &mut std::io::stdout();
    match cmd {
        Subcommand::Serve => {
            let _guards = logger::setup_logger(&opts);
            if let Some(path) = config_path {
                info!("using configuration from {}", path.to_path_buf().display());
            }
            runtime.block_on(daemon::start(config, daemon::shutdown_signal()))
        }
        Subcommand::DagSize(cmd) => {
            logger::setup_minimal_logger();
            cmd.run(stdout)
        }
        Subcommand::Roots(cmd) => {
            logger::setup_minimal_logger();
            cmd.run(stdout)
        }
        Subcommand::Config(cmd) => cmd.run(&config, stdout),
        Subcommand::Auth(cmd) => {
            logger::setup_minimal_logger();
            runtime.block_on(cmd.run(&config, stdout))
        }
    }
}
