// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! `MerkleDAG` protobuf nodes.
//!
//! ```protobuf
//! message PBLink {
//!   optional bytes Hash = 1;
//!   optional string Name = 2;
//!   optional uint64 Tsize = 3;
//! }
//!
//! message PBNode {
//!   repeated PBLink Links = 2;
//!   optional bytes Data = 1;
//! }
//! ```
//!
//! See <https://ipld.io/specs/codecs/dag-pb/spec/>

use super::{DecodeError, Ipld};
use cid::Cid;
use quick_protobuf::sizeofs::{sizeof_len, sizeof_varint};
use quick_protobuf::{BytesReader, MessageRead, MessageWrite, Writer, WriterBackend};
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PbLink<'a> {
    pub hash: Option<&'a [u8]>,
    pub name: Option<&'a str>,
    pub tsize: Option<u64>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PbNode<'a> {
    pub links: Vec<PbLink<'a>>,
    pub data: Option<&'a [u8]>,
}

impl<'a> MessageRead<'a> for PbLink<'a> {
    fn from_reader(r: &mut BytesReader, bytes: &'a [u8]) -> quick_protobuf::Result<Self> {
        let mut msg = Self::default();
        while !r.is_eof() {
            match r.next_tag(bytes)? {
                10 => msg.hash = Some(r.read_bytes(bytes)?),
                18 => msg.name = Some(r.read_string(bytes)?),
                24 => msg.tsize = Some(r.read_uint64(bytes)?),
                t => r.read_unknown(bytes, t)?,
            }
        }
        Ok(msg)
    }
}

impl<'a> MessageRead<'a> for PbNode<'a> {
    fn from_reader(r: &mut BytesReader, bytes: &'a [u8]) -> quick_protobuf::Result<Self> {
        let mut msg = Self::default();
        while !r.is_eof() {
            match r.next_tag(bytes)? {
                10 => msg.data = Some(r.read_bytes(bytes)?),
                18 => msg.links.push(r.read_message::<PbLink>(bytes)?),
                t => r.read_unknown(bytes, t)?,
            }
        }
        Ok(msg)
    }
}

impl MessageWrite for PbLink<'_> {
    fn get_size(&self) -> usize {
        self.hash.map_or(0, |h| 1 + sizeof_len(h.len()))
            + self.name.map_or(0, |n| 1 + sizeof_len(n.len()))
            + self.tsize.map_or(0, |t| 1 + sizeof_varint(t))
    }

    fn write_message<W: WriterBackend>(&self, w: &mut Writer<W>) -> quick_protobuf::Result<()> {
        if let Some(hash) = self.hash {
            w.write_with_tag(10, |w| w.write_bytes(hash))?;
        }
        if let Some(name) = self.name {
            w.write_with_tag(18, |w| w.write_string(name))?;
        }
        if let Some(tsize) = self.tsize {
            w.write_with_tag(24, |w| w.write_uint64(tsize))?;
        }
        Ok(())
    }
}

impl MessageWrite for PbNode<'_> {
    fn get_size(&self) -> usize {
        self.links
            .iter()
            .map(|link| 1 + sizeof_len(link.get_size()))
            .sum::<usize>()
            + self.data.map_or(0, |d| 1 + sizeof_len(d.len()))
    }

    // Links are written before Data, as the canonical form requires.
    fn write_message<W: WriterBackend>(&self, w: &mut Writer<W>) -> quick_protobuf::Result<()> {
        for link in &self.links {
            w.write_with_tag(18, |w| w.write_message(link))?;
        }
        if let Some(data) = self.data {
            w.write_with_tag(10, |w| w.write_bytes(data))?;
        }
        Ok(())
    }
}

impl<'a> PbNode<'a> {
    pub fn decode(bytes: &'a [u8]) -> Result<Self, DecodeError> {
        let mut reader = BytesReader::from_bytes(bytes);
        Ok(Self::from_reader(&mut reader, bytes)?)
    }

    pub fn encode(&self) -> Result<Vec<u8>, DecodeError> {
        let mut buffer = Vec::with_capacity(self.get_size());
        let mut writer = Writer::new(&mut buffer);
        MessageWrite::write_message(self, &mut writer)?;
        Ok(buffer)
    }

    /// Child CIDs, in link order.
    pub fn links(&self) -> Result<Vec<Cid>, DecodeError> {
        self.links.iter().map(PbLink::cid).collect()
    }

    /// The IPLD data model form of the node:
    /// `{ Data?: Bytes, Links: [{ Hash: Link, Name?: String, Tsize?: Int }] }`.
    pub fn to_ipld(&self) -> Result<Ipld, DecodeError> {
        let links = self
            .links
            .iter()
            .map(|link| {
                let mut map = BTreeMap::new();
                map.insert("Hash".to_string(), Ipld::Link(link.cid()?));
                if let Some(name) = link.name {
                    map.insert("Name".to_string(), Ipld::String(name.to_string()));
                }
                if let Some(tsize) = link.tsize {
                    map.insert("Tsize".to_string(), Ipld::Integer(i128::from(tsize)));
                }
                Ok(Ipld::Map(map))
            })
            .collect::<Result<Vec<_>, DecodeError>>()?;

        let mut node = BTreeMap::new();
        node.insert("Links".to_string(), Ipld::List(links));
        if let Some(data) = self.data {
            node.insert("Data".to_string(), Ipld::Bytes(data.to_vec()));
        }
        Ok(Ipld::Map(node))
    }
}

impl PbLink<'_> {
    pub fn cid(&self) -> Result<Cid, DecodeError> {
        let hash = self
            .hash
            .ok_or_else(|| DecodeError::Invalid("PBLink without Hash".into()))?;
        Ok(Cid::try_from(hash)?)
    }
}
