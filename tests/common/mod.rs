// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::path::PathBuf;

use assert_cmd::{Command, cargo::cargo_bin_cmd};
use car_gateway::{CarBlock, encode_car_v1};
use cid::Cid;
use ipld_core::ipld::Ipld;
use tempfile::TempDir;

const IPLD_RAW: u64 = 0x55;
const DAG_CBOR: u64 = 0x71;

pub fn cli() -> Command {
    cargo_bin_cmd!("car-gateway")
}

pub fn raw_block(data: &[u8]) -> CarBlock {
    CarBlock::new_sha256(IPLD_RAW, data.to_vec())
}

pub fn cbor_block(links: &[Cid]) -> CarBlock {
    let value = Ipld::List(links.iter().copied().map(Ipld::Link).collect());
    CarBlock::new_sha256(DAG_CBOR, serde_ipld_dagcbor::to_vec(&value).unwrap())
}

/// Writes a CAR rooted at `blocks[0]` into a fresh temporary directory.
pub fn write_car(blocks: &[CarBlock]) -> (PathBuf, TempDir) {
    let temp_dir = tempfile::tempdir().expect("couldn't create temp dir");
    let path = temp_dir.path().join("test.car");
    let car = encode_car_v1(nunny::vec![blocks[0].cid], blocks).unwrap();
    std::fs::write(&path, car).unwrap();
    (path, temp_dir)
}

pub fn create_tmp_config(contents: &str) -> (PathBuf, TempDir) {
    let temp_dir = tempfile::tempdir().expect("couldn't create temp dir");
    let config_file = temp_dir.path().join("config.toml");
    std::fs::write(&config_file, contents).expect("couldn't write config");
    (config_file, temp_dir)
}
