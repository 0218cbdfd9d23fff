// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! # Varint frames
//!
//! CARs are made of concatenations of _varint frames_. Each varint frame is a
//! concatenation of the _body length_ as an
//! [varint](https://docs.rs/integer-encoding/4.0.0/integer_encoding/trait.VarInt.html),
//! and the _frame body_ itself.
//!
//! ```text
//!        varint frame
//! │◄───────────────────────►│
//! │                         │
//! ├───────────┬─────────────┤
//! │varint:    │             │
//! │body length│frame body   │
//! └───────────┼─────────────┤
//!             │             │
//! frame body ►│◄───────────►│
//!     offset     =body length
//! ```
//!
//! # CARv1 layout
//!
//! The first varint frame is a _header frame_, where the frame body is a
//! [`CarV1Header`] encoded using [`ipld_dagcbor`](serde_ipld_dagcbor).
//!
//! Subsequent varint frames are _block frames_, where the frame body is a
//! concatenation of a [`Cid`] and the _block data_ addressed by that CID.
//!
//! ```text
//! block frame ►│
//! body offset  │
//!              │  =body length
//!              │◄────────────►│
//!  ┌───────────┼───┬──────────┤
//!  │body length│cid│block data│
//!  └───────────┴───┼──────────┤
//!                  │◄────────►│
//!                  │  =block data length
//!      block data  │
//!          offset ►│
//! ```

use crate::ipld::DagError;
use crate::utils::db::car_stream::{CarBlock, CarV1Header};
use bytes::Bytes;
use cid::Cid;
use integer_encoding::VarInt as _;
use std::ops::Range;
use tracing::debug;

/// An in-memory CARv1 archive with random access to its blocks.
///
/// On creation, [`PlainCar`] builds an index of the [`Cid`]s in the buffer and
/// the location of their data. Block lookups hand out cheap slices of the
/// original buffer; nothing is copied.
#[derive(Debug, Clone)]
pub struct PlainCar {
    bytes: Bytes,
    roots: Vec<Cid>,
    index: ahash::HashMap<Cid, BlockDataLocation>,
}

/// If you take `length` bytes from `offset` you get the data that corresponds
/// to a [`Cid`] (but NOT the [`Cid`] itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BlockDataLocation {
    offset: usize,
    length: usize,
}

impl BlockDataLocation {
    fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.length
    }
}

impl PlainCar {
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Result<Self, DagError> {
        let bytes: Bytes = bytes.into();

        let (header_body, mut cursor) =
            read_frame(&bytes, 0)?.ok_or_else(|| malformed("missing header frame"))?;
        let header: CarV1Header = serde_ipld_dagcbor::from_slice(&bytes[header_body.clone()])
            .map_err(|e| malformed(format!("invalid header: {e}")))?;
        if header.version != 1 {
            return Err(malformed(format!(
                "unsupported CAR version {}",
                header.version
            )));
        }
        let roots = header.roots.iter().copied().collect();

        let mut index = ahash::HashMap::default();
        while let Some((body, next)) = read_frame(&bytes, cursor)? {
            let (cid, location) = read_block_location(&bytes, body)?;
            index.entry(cid).or_insert(location);
            cursor = next;
        }

        match index.len() {
            0 => Err(malformed("CARv1 files must contain at least one block")),
            num_blocks => {
                debug!(num_blocks, "indexed CAR");
                Ok(Self {
                    bytes,
                    roots,
                    index,
                })
            }
        }
    }

    /// Declared roots, in header order.
    pub fn roots(&self) -> &[Cid] {
        &self.roots
    }

    /// Returns the data of a block, or [`None`] if the archive does not hold it.
    pub fn get(&self, cid: &Cid) -> Option<Bytes> {
        self.index
            .get(cid)
            .map(|location| self.bytes.slice(location.range()))
    }

    pub fn contains(&self, cid: &Cid) -> bool {
        self.index.contains_key(cid)
    }

    /// Number of distinct blocks.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// In an arbitrary order
    pub fn cids(&self) -> impl Iterator<Item = &Cid> {
        self.index.keys()
    }

    /// Sum of the data lengths of the distinct blocks, excluding framing and
    /// [`Cid`]s.
    pub fn total_block_bytes(&self) -> u64 {
        self.index
            .values()
            .map(|location| location.length as u64)
            .sum()
    }

    /// Checks that every block hashes to its [`Cid`].
    pub fn verify(&self) -> anyhow::Result<()> {
        for (cid, location) in &self.index {
            CarBlock {
                cid: *cid,
                data: self.bytes[location.range()].to_vec(),
            }
            .validate()?;
        }
        Ok(())
    }
}

fn malformed(reason: impl Into<String>) -> DagError {
    DagError::MalformedArchive(reason.into())
}

/// Returns the range of the frame body starting at `offset`, and the offset of
/// the following frame.
///
/// [`Ok(None)`] on EOF
fn read_frame(bytes: &[u8], offset: usize) -> Result<Option<(Range<usize>, usize)>, DagError> {
    if offset == bytes.len() {
        return Ok(None);
    }
    let (body_length, prefix_length) =
        u64::decode_var(&bytes[offset..]).ok_or_else(|| malformed("invalid varint"))?;
    let body_start = offset + prefix_length;
    let body_end = usize::try_from(body_length)
        .ok()
        .and_then(|len| body_start.checked_add(len))
        .filter(|end| *end <= bytes.len())
        .ok_or_else(|| malformed(format!("truncated frame at offset {offset}")))?;
    Ok(Some((body_start..body_end, body_end)))
}

/// ```text
///        ├───┬──────────┤
///        │cid│block data│
///        └───┴──────────┘
/// ```
fn read_block_location(
    bytes: &[u8],
    body: Range<usize>,
) -> Result<(Cid, BlockDataLocation), DagError> {
    let mut frame = &bytes[body.clone()];
    let cid = Cid::read_bytes(&mut frame)
        .map_err(|e| malformed(format!("invalid CID at offset {}: {e}", body.start)))?;
    let length = frame.len();
    Ok((
        cid,
        BlockDataLocation {
            offset: body.end - length,
            length,
        },
    ))
}
