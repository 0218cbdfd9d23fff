// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub mod codec;
pub mod dag_pb;
pub mod dag_size;
mod errors;

pub use ipld_core::ipld::Ipld;

pub use self::codec::{Codec, CodecRegistry, Decoded};
pub use self::dag_size::{DEFAULT_MAX_DEPTH, DagSizeWalker, Traversal, dag_size_of_car};
pub use self::errors::{DagError, DecodeError};

/// Multicodec code of raw binary blocks.
pub const IPLD_RAW: u64 = 0x55;
/// Multicodec code of `MerkleDAG` protobuf blocks.
pub const DAG_PB: u64 = 0x70;
/// Multicodec code of `DAG_CBOR` blocks.
pub const DAG_CBOR: u64 = 0x71;
