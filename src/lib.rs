// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod auth;
mod cli;
mod cli_shared;
mod cluster;
mod daemon;
mod db;
mod gateway;
mod health;
mod ingest;
mod ipld;
mod metrics;
mod server;
mod tasks;
#[cfg(test)]
mod test_utils;
mod utils;

/// These items are semver-exempt, and exist for car-gateway author use only
// We want to have doctests, but don't want our internals to be public because:
// - We don't want to be concerned with library compat
//   (We want our cargo semver to be _for the command line_).
// - We don't want to mistakenly export items which we never actually use.
#[doc(hidden)]
pub mod doctest_private {
    pub use crate::utils::io::read_toml;
}

pub use cli::main::main as car_gateway_main;
pub use db::car::PlainCar;
pub use ipld::{CodecRegistry, DagError, DagSizeWalker, Traversal, dag_size_of_car};
pub use utils::db::car_stream::{CarBlock, encode_car_v1};
pub use utils::io::count_bytes;
