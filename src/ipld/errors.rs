// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use thiserror::Error;

/// Failures while reading an archive or walking the DAG it holds.
#[derive(Debug, Error)]
pub enum DagError {
    #[error("malformed archive: {0}")]
    MalformedArchive(String),
    #[error("missing block for {0}")]
    MissingBlock(Cid),
    #[error("DAG is deeper than {0} links, the archive is likely cyclic")]
    TooDeep(usize),
    #[error("missing decoder for codec {0:#x}")]
    UnsupportedCodec(u64),
    #[error("failed to decode block {cid}: {source}")]
    Decode {
        cid: Cid,
        #[source]
        source: DecodeError,
    },
}

/// Failures of a single codec.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid DAG-CBOR: {0}")]
    Cbor(String),
    #[error("invalid protobuf: {0}")]
    Protobuf(#[from] quick_protobuf::Error),
    #[error("invalid link: {0}")]
    Cid(#[from] cid::Error),
    #[error("{0}")]
    Invalid(String),
}
