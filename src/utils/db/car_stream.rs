// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT
use bytes::{BufMut as _, BytesMut};
use cid::Cid;
use integer_encoding::VarInt as _;
use multihash_codetable::{Code, MultihashDigest as _};
use nunny::Vec as NonEmpty;
use serde::{Deserialize, Serialize};
use std::io;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CarV1Header {
    // The roots array must contain one or more CIDs,
    // each of which should be present somewhere in the remainder of the CAR.
    // See <https://ipld.io/specs/transport/car/carv1/#constraints>
    pub roots: NonEmpty<Cid>,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CarBlock {
    pub cid: Cid,
    pub data: Vec<u8>,
}

impl CarBlock {
    /// Hashes `data` with SHA2-256 and addresses it as a CIDv1 of `codec`.
    pub fn new_sha256(codec: u64, data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        let cid = Cid::new_v1(codec, Code::Sha2_256.digest(&data));
        CarBlock { cid, data }
    }

    // Write a varint frame containing the cid and the data
    pub fn write(&self, mut writer: &mut impl io::Write) -> io::Result<()> {
        let frame_length = self.cid.encoded_len() + self.data.len();
        writer.write_all(&frame_length.encode_var_vec())?;
        #[allow(clippy::needless_borrows_for_generic_args)]
        self.cid
            .write_bytes(&mut writer)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writer.write_all(&self.data)?;
        Ok(())
    }

    pub fn valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let actual = {
            let code = Code::try_from(self.cid.hash().code())?;
            Cid::new_v1(self.cid.codec(), code.digest(&self.data))
        };
        anyhow::ensure!(
            actual.hash() == self.cid.hash(),
            "CID/Block mismatch for block {}, actual: {actual}",
            self.cid
        );
        Ok(())
    }
}

/// Encodes a complete CARv1 archive: a header frame followed by one frame per
/// block, in the order given.
pub fn encode_car_v1<'a>(
    roots: NonEmpty<Cid>,
    blocks: impl IntoIterator<Item = &'a CarBlock>,
) -> io::Result<Vec<u8>> {
    let header = CarV1Header { roots, version: 1 };
    let header_bytes = serde_ipld_dagcbor::to_vec(&header)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let mut writer = BytesMut::new().writer();
    io::Write::write_all(&mut writer, &header_bytes.len().encode_var_vec())?;
    io::Write::write_all(&mut writer, &header_bytes)?;
    for block in blocks {
        block.write(&mut writer)?;
    }
    Ok(writer.into_inner().to_vec())
}
