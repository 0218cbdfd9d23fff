// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub mod db;
pub mod flume;
pub mod io;
pub mod misc;
pub mod net;
#[cfg(feature = "sqlite")]
pub mod sqlite;
