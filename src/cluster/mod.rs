// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Pinning cluster access.
//!
//! [`ClusterClient`] speaks the IPFS Cluster REST API. The rest of the crate
//! only sees the [`PinningCluster`] trait.

mod client;

pub use self::client::{ClusterAuth, ClusterClient};

use async_trait::async_trait;
use bytes::Bytes;
use cid::Cid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("cluster request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected cluster response: {0}")]
    InvalidResponse(String),
    #[error(transparent)]
    Cid(#[from] cid::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddOptions {
    /// Sent as `meta-<key>=<value>`.
    pub metadata: BTreeMap<String, String>,
    /// Add on the receiving peer only, and let the other peers replicate
    /// asynchronously.
    pub local: bool,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
pub enum PinStatus {
    Queued,
    Pinning,
    Pinned,
    PinError,
}

impl PinStatus {
    /// Maps an IPFS Cluster tracker status. Anything unknown is an error.
    pub fn from_tracker(status: &str) -> Self {
        match status {
            "pinned" => Self::Pinned,
            "pinning" => Self::Pinning,
            "pin_queued" | "queued" => Self::Queued,
            _ => Self::PinError,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerPinInfo {
    pub peer_name: String,
    pub status: PinStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinStatusReport {
    pub cid: Cid,
    /// Keyed by peer ID.
    pub peer_map: BTreeMap<String, PeerPinInfo>,
}

#[async_trait]
pub trait PinningCluster: Send + Sync {
    /// Adds a CAR and returns the CID of its root.
    async fn add(&self, car: Bytes, options: AddOptions) -> Result<Cid, ClusterError>;

    async fn status(&self, cid: &Cid) -> Result<PinStatusReport, ClusterError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr as _;

    #[test]
    fn tracker_status_mapping() {
        assert_eq!(PinStatus::from_tracker("pinned"), PinStatus::Pinned);
        assert_eq!(PinStatus::from_tracker("pinning"), PinStatus::Pinning);
        assert_eq!(PinStatus::from_tracker("pin_queued"), PinStatus::Queued);
        assert_eq!(PinStatus::from_tracker("queued"), PinStatus::Queued);
        for other in ["pin_error", "unpinned", "remote", "cluster_error", ""] {
            assert_eq!(PinStatus::from_tracker(other), PinStatus::PinError);
        }
    }

    #[test]
    fn stored_names() {
        assert_eq!(PinStatus::PinError.to_string(), "PinError");
        assert_eq!(PinStatus::from_str("Pinning").unwrap(), PinStatus::Pinning);
        let name: &'static str = PinStatus::Queued.into();
        assert_eq!(name, "Queued");
    }
}
