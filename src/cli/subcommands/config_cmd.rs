// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::cli_shared::cli::Config;
use anyhow::Context as _;
use std::io::Write;

#[derive(Debug, clap::Subcommand)]
pub enum ConfigCommands {
    /// Dump the effective configuration as TOML, defaults included
    Dump,
}

impl ConfigCommands {
    pub fn run(self, config: &Config, sink: &mut impl Write) -> anyhow::Result<()> {
        match self {
            Self::Dump => writeln!(
                sink,
                "{}",
                toml::to_string(config).context("could not serialize the configuration")?
            )
            .context("failed to write the configuration"),
        }
    }
}
