// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub mod common;

use crate::common::{cbor_block, cli, create_tmp_config, raw_block, write_car};
use car_gateway::CarBlock;
use assert_cmd::Command;
use predicates::prelude::*;

const CONFIG_PATH_ENV: &str = "CAR_GATEWAY_CONFIG_PATH";

fn dumped_config(cmd: &mut Command) -> toml::Table {
    let output = cmd.arg("config").arg("dump").assert().success();
    let stdout = std::str::from_utf8(&output.get_output().stdout).unwrap();
    toml::from_str(stdout).expect("Invalid configuration!")
}

#[test]
fn test_config_dump_produces_valid_toml() {
    let config = dumped_config(cli().env_remove(CONFIG_PATH_ENV));
    for section in ["server", "gateway", "cluster", "cache", "ingest", "auth", "store"] {
        assert!(config.contains_key(section), "missing [{section}]");
    }
    assert_eq!(config["cache"]["ttl"].as_integer(), Some(31_536_000));
    assert_eq!(
        config["cache"]["max_entry_bytes"].as_integer(),
        Some(32 * 1024 * 1024)
    );
    assert_eq!(config["ingest"]["traversal"].as_str(), Some("per-path"));
    assert_eq!(config["ingest"]["max_depth"].as_integer(), Some(100_000));
}

#[test]
fn test_config_parameter() {
    let (path, _dir) = create_tmp_config("[cache]\ncapacity = 3\n");
    let config = dumped_config(cli().env_remove(CONFIG_PATH_ENV).arg("--config").arg(&path));
    assert_eq!(config["cache"]["capacity"].as_integer(), Some(3));
    assert_eq!(
        config["gateway"]["url"].as_str(),
        Some("http://127.0.0.1:5001/")
    );
}

#[test]
fn test_config_env() {
    let (path, _dir) = create_tmp_config("[server]\nlisten_address = \"0.0.0.0:8080\"\n");
    let config = dumped_config(cli().env(CONFIG_PATH_ENV, &path));
    assert_eq!(
        config["server"]["listen_address"].as_str(),
        Some("0.0.0.0:8080")
    );
}

#[test]
fn test_invalid_config_fails() {
    let (path, _dir) = create_tmp_config("[ingest]\ntraversal = \"sideways\"\n");
    cli()
        .arg("--config")
        .arg(&path)
        .arg("config")
        .arg("dump")
        .assert()
        .failure();
}

#[test]
fn test_dag_size() {
    let leaf = raw_block(b"hello world");
    let root = cbor_block(&[leaf.cid]);
    let expected = root.data.len() + leaf.data.len();
    let (path, _dir) = write_car(&[root, leaf]);

    cli()
        .arg("dag-size")
        .arg(&path)
        .arg("--verify")
        .assert()
        .success()
        .stdout(format!("{expected}\n"));
}

#[test]
fn test_dag_size_traversals() {
    let leaf = raw_block(b"shared");
    let root = cbor_block(&[leaf.cid, leaf.cid]);
    let root_len = root.data.len();
    let (path, _dir) = write_car(&[root, leaf]);

    cli()
        .arg("dag-size")
        .arg(&path)
        .assert()
        .success()
        .stdout(format!("{}\n", root_len + 12));
    cli()
        .arg("dag-size")
        .arg(&path)
        .arg("--traversal")
        .arg("unique")
        .assert()
        .success()
        .stdout(format!("{}\n", root_len + 6));
}

#[test]
fn test_dag_size_of_incomplete_dag_fails() {
    let absent = raw_block(b"not in the archive");
    let root = cbor_block(&[absent.cid]);
    let (path, _dir) = write_car(&[root]);

    cli()
        .arg("dag-size")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains(absent.cid.to_string()));
}

#[test]
fn test_dag_size_of_cyclic_archive_fails() {
    // a forged CID whose block links back to itself
    let fake = cbor_block(&[]).cid;
    let looping = CarBlock {
        cid: fake,
        data: cbor_block(&[fake]).data,
    };
    let (path, _dir) = write_car(&[looping]);

    cli()
        .arg("dag-size")
        .arg(&path)
        .arg("--max-depth")
        .arg("32")
        .assert()
        .failure()
        .stderr(predicate::str::contains("deeper than 32 links"));
}

#[test]
fn test_roots() {
    let a = raw_block(b"a");
    let b = raw_block(b"b");
    let (path, _dir) = write_car(&[a.clone(), b]);

    cli()
        .arg("roots")
        .arg(&path)
        .assert()
        .success()
        .stdout(format!("{}\n", a.cid));
}

#[test]
fn test_roots_of_garbage_fails() {
    let (path, _dir) = create_tmp_config("not a car");
    cli().arg("roots").arg(&path).assert().failure();
}

#[test]
fn test_serve_requires_secret() {
    let (path, _dir) = create_tmp_config("[server]\nlisten_address = \"127.0.0.1:0\"\n");
    cli()
        .arg("--config")
        .arg(&path)
        .arg("serve")
        .assert()
        .failure()
        .stderr(predicate::str::contains("[auth]"));
}
