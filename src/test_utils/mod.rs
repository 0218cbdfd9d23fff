// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Block and archive builders shared by unit tests.

use crate::ipld::dag_pb::{PbLink, PbNode};
use crate::ipld::{DAG_CBOR, DAG_PB, IPLD_RAW, Ipld};
use crate::utils::db::car_stream::{CarBlock, encode_car_v1};
use cid::Cid;
use cid::multihash::Multihash;
use nunny::vec as nonempty;

const IDENTITY: u64 = 0x00;

/// A raw block of `len` bytes, all equal to `len as u8`.
pub fn raw_leaf(len: usize) -> CarBlock {
    CarBlock::new_sha256(IPLD_RAW, vec![len as u8; len])
}

/// A `DAG-CBOR` list of links.
pub fn cbor_node(links: &[Cid]) -> CarBlock {
    let value = Ipld::List(links.iter().copied().map(Ipld::Link).collect());
    CarBlock::new_sha256(DAG_CBOR, serde_ipld_dagcbor::to_vec(&value).unwrap())
}

pub fn pb_node(links: &[Cid], data: &[u8]) -> CarBlock {
    let hashes = links.iter().map(Cid::to_bytes).collect::<Vec<_>>();
    let node = PbNode {
        links: hashes
            .iter()
            .map(|hash| PbLink {
                hash: Some(hash),
                name: Some(""),
                tsize: None,
            })
            .collect(),
        data: Some(data),
    };
    CarBlock::new_sha256(DAG_PB, node.encode().unwrap())
}

/// Addresses `data` with an identity multihash, which keeps CIDs short
/// enough to build blocks of an exact size.
pub fn identity_block(codec: u64, data: Vec<u8>) -> CarBlock {
    let cid = Cid::new_v1(codec, Multihash::wrap(IDENTITY, &data).unwrap());
    CarBlock { cid, data }
}

/// A three block chain, root first, of 30, 20 and 10 bytes.
pub fn sized_chain() -> [CarBlock; 3] {
    let leaf = identity_block(IPLD_RAW, vec![1; 10]);
    // [link, 0]
    let middle = identity_block(
        DAG_CBOR,
        serde_ipld_dagcbor::to_vec(&Ipld::List(vec![Ipld::Link(leaf.cid), Ipld::Integer(0)]))
            .unwrap(),
    );
    // [link]
    let root = identity_block(
        DAG_CBOR,
        serde_ipld_dagcbor::to_vec(&Ipld::List(vec![Ipld::Link(middle.cid)])).unwrap(),
    );
    assert_eq!(
        [root.data.len(), middle.data.len(), leaf.data.len()],
        [30, 20, 10]
    );
    [root, middle, leaf]
}

/// A CAR holding [`sized_chain`], and its DAG size.
pub fn tree_car() -> (Vec<u8>, u64) {
    let blocks = sized_chain();
    let car = encode_car_v1(nonempty![blocks[0].cid], &blocks).unwrap();
    (car, 60)
}
