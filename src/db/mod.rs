// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Users, API tokens, uploads and their pins.

pub mod car;
mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryDB;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDB;

use crate::cluster::PinStatus;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cid::Cid;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Id = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    /// Identity provider subject, e.g. a DID.
    pub issuer: String,
    pub name: String,
}

/// An API key. The secret is the signed token itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub id: Id,
    pub user: Id,
    pub name: String,
    pub secret: String,
}

/// A DAG, shared by every upload of the same root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub id: Id,
    pub cid: Cid,
    pub dag_size: Option<u64>,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upload {
    pub id: Id,
    pub user: Id,
    pub auth_token: Option<Id>,
    pub content: Content,
    pub name: String,
    pub created: DateTime<Utc>,
}

/// Where, and how far along, a DAG is pinned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinRecord {
    pub peer_id: String,
    pub peer_name: String,
    pub status: PinStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pin {
    pub content: Id,
    #[serde(flatten)]
    pub record: PinRecord,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportCar {
    pub user: Id,
    pub auth_token: Option<Id>,
    pub cid: Cid,
    pub name: String,
    pub pins: Vec<PinRecord>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user not found")]
    UserNotFound(Id),
    #[error("content {0} not found")]
    ContentNotFound(Id),
    #[error("user with issuer {0} already exists")]
    DuplicateUser(String),
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    Sqlite(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Records an upload of `car.cid` by `car.user`.
    ///
    /// Content is keyed by CID, uploads by `(user, content)` and pins by
    /// `(content, peer_id)`: importing the same CAR twice returns the first
    /// upload and only refreshes pin statuses.
    async fn import_car(&self, car: ImportCar) -> Result<Upload, StoreError>;

    async fn update_dag_size(&self, content: Id, dag_size: u64) -> Result<(), StoreError>;

    async fn get_content(&self, cid: &Cid) -> Result<Option<Content>, StoreError>;

    async fn pins_for(&self, content: Id) -> Result<Vec<Pin>, StoreError>;

    async fn create_user(&self, issuer: &str, name: &str) -> Result<User, StoreError>;

    async fn find_user_by_issuer(&self, issuer: &str) -> Result<Option<User>, StoreError>;

    async fn create_auth_token(
        &self,
        user: Id,
        name: &str,
        secret: &str,
    ) -> Result<AuthToken, StoreError>;

    /// The token of `user` whose secret is `secret`, if any.
    async fn find_auth_token(
        &self,
        user: Id,
        secret: &str,
    ) -> Result<Option<AuthToken>, StoreError>;
}
