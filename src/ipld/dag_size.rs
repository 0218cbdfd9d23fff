// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Stored size of a DAG.
//!
//! The size of a DAG is the sum of the raw byte lengths of every block
//! reachable from its root. How shared sub-DAGs are counted depends on the
//! [`Traversal`].

use super::{CodecRegistry, DagError};
use crate::db::car::PlainCar;
use cid::Cid;
use serde::{Deserialize, Serialize};

// Grow the stack on the heap once less than this is left.
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROWTH: usize = 4 << 20;

/// Links followed from the root before a walk gives up.
pub const DEFAULT_MAX_DEPTH: usize = 100_000;

#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Traversal {
    /// Recurse into every link. A block reachable through `n` paths is counted
    /// `n` times. A cyclic graph fails once it exceeds the maximum depth.
    #[default]
    PerPath,
    /// Count each distinct block once.
    Unique,
}

#[derive(Clone, Copy)]
pub struct DagSizeWalker<'a> {
    car: &'a PlainCar,
    codecs: &'a CodecRegistry,
    traversal: Traversal,
    max_depth: usize,
}

impl<'a> DagSizeWalker<'a> {
    pub fn new(car: &'a PlainCar, codecs: &'a CodecRegistry) -> Self {
        Self {
            car,
            codecs,
            traversal: Traversal::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn traversal(mut self, traversal: Traversal) -> Self {
        self.traversal = traversal;
        self
    }

    #[tracing::instrument(level = "debug", skip(self), fields(traversal = %self.traversal))]
    pub fn compute_size(&self, root: Cid) -> Result<u64, DagError> {
        match self.traversal {
            Traversal::PerPath => self.per_path(root, 0),
            Traversal::Unique => self.unique(root, 0, &mut ahash::HashSet::default()),
        }
    }

    fn per_path(&self, cid: Cid, depth: usize) -> Result<u64, DagError> {
        let (size, links) = self.load(cid, depth)?;
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
            links.into_iter().try_fold(size, |total, link| {
                Ok(total.saturating_add(self.per_path(link, depth + 1)?))
            })
        })
    }

    fn unique(
        &self,
        cid: Cid,
        depth: usize,
        seen: &mut ahash::HashSet<Cid>,
    ) -> Result<u64, DagError> {
        if !seen.insert(cid) {
            return Ok(0);
        }
        let (size, links) = self.load(cid, depth)?;
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
            links.into_iter().try_fold(size, |total, link| {
                Ok(total.saturating_add(self.unique(link, depth + 1, seen)?))
            })
        })
    }

    /// Raw length and outbound links of a block.
    fn load(&self, cid: Cid, depth: usize) -> Result<(u64, Vec<Cid>), DagError> {
        if depth > self.max_depth {
            return Err(DagError::TooDeep(self.max_depth));
        }
        let data = self.car.get(&cid).ok_or(DagError::MissingBlock(cid))?;
        let decoded = self.codecs.decode(&cid, &data)?;
        Ok((data.len() as u64, decoded.links))
    }
}

/// Parses a CARv1 buffer and computes the size of the DAG under its first
/// declared root.
pub fn dag_size_of_car(
    bytes: impl Into<bytes::Bytes>,
    codecs: &CodecRegistry,
    traversal: Traversal,
    max_depth: usize,
) -> Result<u64, DagError> {
    let car = PlainCar::from_bytes(bytes)?;
    let root = *car
        .roots()
        .first()
        .ok_or_else(|| DagError::MalformedArchive("no roots".into()))?;
    DagSizeWalker::new(&car, codecs)
        .traversal(traversal)
        .max_depth(max_depth)
        .compute_size(root)
}
