// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod config;

pub use config::*;

use crate::utils::misc::LoggingColor;
use std::path::PathBuf;

/// Environment variable consulted when `--config` is not given.
pub const CONFIG_PATH_ENV: &str = "CAR_GATEWAY_CONFIG_PATH";

/// Options shared by every subcommand.
#[derive(Default, Debug, clap::Args)]
pub struct CliOpts {
    /// A TOML file containing relevant configurations
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Also write logs to hourly rotated files in this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,
    /// Enable or disable colored logging in `stdout`
    #[arg(long, global = true, default_value = "auto")]
    pub color: LoggingColor,
}

/// Where the configuration file was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigPath {
    Cli(PathBuf),
    Env(PathBuf),
}

impl ConfigPath {
    pub fn to_path_buf(&self) -> &PathBuf {
        match self {
            ConfigPath::Cli(path) | ConfigPath::Env(path) => path,
        }
    }
}

pub fn find_config_path(config: Option<&PathBuf>) -> Option<ConfigPath> {
    if let Some(path) = config {
        return Some(ConfigPath::Cli(path.clone()));
    }
    std::env::var_os(CONFIG_PATH_ENV)
        .filter(|path| !path.is_empty())
        .map(|path| ConfigPath::Env(PathBuf::from(path)))
}
