// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::db::car::PlainCar;
use crate::ipld::{CodecRegistry, DEFAULT_MAX_DEPTH, DagSizeWalker, Traversal};
use anyhow::Context as _;
use cid::Cid;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, clap::Args)]
pub struct DagSizeCommand {
    /// A CARv1 file
    car: PathBuf,
    /// Root of the DAG. Defaults to the first root declared by the CAR
    #[arg(long)]
    root: Option<Cid>,
    /// Whether blocks shared by several paths are counted once per path, or
    /// only once
    #[arg(long, value_enum, default_value_t)]
    traversal: Traversal,
    /// Links followed from the root before giving up on a cyclic archive
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,
    /// Check that every block matches its CID before walking
    #[arg(long)]
    verify: bool,
}

impl DagSizeCommand {
    pub fn run(self, out: &mut impl Write) -> anyhow::Result<()> {
        let car = read_car(&self.car)?;
        if self.verify {
            car.verify()?;
        }
        let root = match self.root {
            Some(root) => root,
            None => *car.roots().first().context("the CAR declares no root")?,
        };
        let codecs = CodecRegistry::default();
        let size = DagSizeWalker::new(&car, &codecs)
            .traversal(self.traversal)
            .max_depth(self.max_depth)
            .compute_size(root)?;
        writeln!(out, "{size}")?;
        Ok(())
    }
}

#[derive(Debug, clap::Args)]
pub struct RootsCommand {
    /// A CARv1 file
    car: PathBuf,
}

impl RootsCommand {
    pub fn run(self, out: &mut impl Write) -> anyhow::Result<()> {
        let car = read_car(&self.car)?;
        info!(
            blocks = car.len(),
            bytes = car.total_block_bytes(),
            "read {}",
            self.car.display()
        );
        for root in car.roots() {
            writeln!(out, "{root}")?;
        }
        Ok(())
    }
}

fn read_car(path: &PathBuf) -> anyhow::Result<PlainCar> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(PlainCar::from_bytes(bytes)?)
}
