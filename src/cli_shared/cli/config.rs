// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::cluster::ClusterAuth;
use crate::gateway::DEFAULT_MAX_ENTRY_BYTES;
use crate::ingest::IngestConfig;
use serde::{Deserialize, Serialize};
use serde_with::{DurationSeconds, serde_as};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};
use url::Url;

pub const DEFAULT_LISTEN_PORT: u16 = 3000;
pub const DEFAULT_ISSUER: &str = "car-gateway";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP bind, e.g. 127.0.0.1:3000
    pub listen_address: SocketAddr,
    /// Larger `POST /car` bodies are rejected
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_LISTEN_PORT),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// The IPFS HTTP API that CARs are exported from.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(default)]
pub struct GatewayConfig {
    pub url: Url,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: Url::parse("http://127.0.0.1:5001").expect("infallible"),
        }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(default)]
pub struct ClusterConfig {
    pub url: Url,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<ClusterAuth>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            url: Url::parse("http://127.0.0.1:9094").expect("infallible"),
            auth: None,
        }
    }
}

#[serde_as]
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached responses
    pub capacity: usize,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub ttl: Duration,
    /// Responses larger than this are streamed through without being cached
    pub max_entry_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            // a year, matching the `max-age` handed to clients
            ttl: Duration::from_secs(31_536_000),
            max_entry_bytes: DEFAULT_MAX_ENTRY_BYTES,
        }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret of the API keys. `serve` refuses to start without one.
    pub secret: String,
    pub issuer: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: DEFAULT_ISSUER.into(),
        }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Lost on restart
    #[default]
    Memory,
    Sqlite(PathBuf),
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Default)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Default, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    pub cluster: ClusterConfig,
    pub cache: CacheConfig,
    pub ingest: IngestConfig,
    pub auth: AuthConfig,
    pub store: StoreConfig,
}
