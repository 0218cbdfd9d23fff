// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::dag_pb::PbNode;
use super::{DAG_CBOR, DAG_PB, DagError, DecodeError, IPLD_RAW, Ipld};
use cid::Cid;
use std::collections::HashMap;
use std::sync::Arc;

/// A block decoded into the IPLD data model, together with its outbound links.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub value: Ipld,
    pub links: Vec<Cid>,
}

/// Decoder for one multicodec.
pub trait Codec: Send + Sync {
    /// Multicodec code this decoder handles.
    fn code(&self) -> u64;

    fn name(&self) -> &'static str;

    fn decode(&self, bytes: &[u8]) -> Result<Decoded, DecodeError>;
}

pub struct Raw;

impl Codec for Raw {
    fn code(&self) -> u64 {
        IPLD_RAW
    }

    fn name(&self) -> &'static str {
        "raw"
    }

    fn decode(&self, bytes: &[u8]) -> Result<Decoded, DecodeError> {
        Ok(Decoded {
            value: Ipld::Bytes(bytes.to_vec()),
            links: vec![],
        })
    }
}

pub struct DagPb;

impl Codec for DagPb {
    fn code(&self) -> u64 {
        DAG_PB
    }

    fn name(&self) -> &'static str {
        "dag-pb"
    }

    fn decode(&self, bytes: &[u8]) -> Result<Decoded, DecodeError> {
        let node = PbNode::decode(bytes)?;
        Ok(Decoded {
            links: node.links()?,
            value: node.to_ipld()?,
        })
    }
}

pub struct DagCbor;

impl Codec for DagCbor {
    fn code(&self) -> u64 {
        DAG_CBOR
    }

    fn name(&self) -> &'static str {
        "dag-cbor"
    }

    fn decode(&self, bytes: &[u8]) -> Result<Decoded, DecodeError> {
        let value: Ipld =
            serde_ipld_dagcbor::from_slice(bytes).map_err(|e| DecodeError::Cbor(e.to_string()))?;
        Ok(Decoded {
            links: collect_links(&value),
            value,
        })
    }
}

/// Every [`Ipld::Link`] reachable in `ipld`, in depth-first order.
pub fn collect_links(ipld: &Ipld) -> Vec<Cid> {
    let mut links = vec![];
    let mut stack = vec![ipld];
    while let Some(ipld) = stack.pop() {
        match ipld {
            Ipld::Link(cid) => links.push(*cid),
            Ipld::List(list) => stack.extend(list.iter().rev()),
            Ipld::Map(map) => stack.extend(map.values().rev()),
            _ => {}
        }
    }
    links
}

/// Maps multicodec codes to their decoders.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Clone)]
pub struct CodecRegistry {
    codecs: HashMap<u64, Arc<dyn Codec>>,
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut codecs = self
            .codecs
            .values()
            .map(|c| (c.code(), c.name()))
            .collect::<Vec<_>>();
        codecs.sort_unstable();
        f.debug_struct("CodecRegistry")
            .field("codecs", &codecs)
            .finish()
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::builder()
            .register(Raw)
            .register(DagPb)
            .register(DagCbor)
            .build()
    }
}

impl CodecRegistry {
    pub fn builder() -> CodecRegistryBuilder {
        CodecRegistryBuilder::default()
    }

    pub fn get(&self, code: u64) -> Option<&Arc<dyn Codec>> {
        self.codecs.get(&code)
    }

    pub fn decode(&self, cid: &Cid, bytes: &[u8]) -> Result<Decoded, DagError> {
        let codec = self
            .get(cid.codec())
            .ok_or(DagError::UnsupportedCodec(cid.codec()))?;
        codec
            .decode(bytes)
            .map_err(|source| DagError::Decode { cid: *cid, source })
    }
}

#[derive(Default)]
pub struct CodecRegistryBuilder {
    codecs: HashMap<u64, Arc<dyn Codec>>,
}

impl CodecRegistryBuilder {
    /// Registers `codec`, replacing any earlier decoder for the same code.
    pub fn register(mut self, codec: impl Codec + 'static) -> Self {
        self.codecs.insert(codec.code(), Arc::new(codec));
        self
    }

    pub fn build(self) -> CodecRegistry {
        CodecRegistry {
            codecs: self.codecs,
        }
    }
}
