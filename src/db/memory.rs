// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{
    AuthToken, Content, Id, ImportCar, Pin, StoreError, Upload, UploadStore, User,
};
use ahash::HashMap;
use async_trait::async_trait;
use chrono::Utc;
use cid::Cid;
use parking_lot::RwLock;

#[derive(Debug, Default)]
pub struct MemoryDB {
    tables: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    next_id: Id,
    users: HashMap<Id, User>,
    auth_tokens: HashMap<Id, AuthToken>,
    contents: HashMap<Id, Content>,
    content_by_cid: HashMap<Cid, Id>,
    uploads: HashMap<(Id, Id), UploadRow>,
    pins: HashMap<(Id, String), Pin>,
}

#[derive(Debug, Clone)]
struct UploadRow {
    id: Id,
    auth_token: Option<Id>,
    name: String,
    created: chrono::DateTime<Utc>,
}

impl Tables {
    fn next_id(&mut self) -> Id {
        self.next_id += 1;
        self.next_id
    }
}

#[async_trait]
impl UploadStore for MemoryDB {
    async fn import_car(&self, car: ImportCar) -> Result<Upload, StoreError> {
        let mut tables = self.tables.write();
        if !tables.users.contains_key(&car.user) {
            return Err(StoreError::UserNotFound(car.user));
        }
        let now = Utc::now();

        let content_id = match tables.content_by_cid.get(&car.cid) {
            Some(id) => *id,
            None => {
                let id = tables.next_id();
                tables.contents.insert(
                    id,
                    Content {
                        id,
                        cid: car.cid,
                        dag_size: None,
                        created: now,
                    },
                );
                tables.content_by_cid.insert(car.cid, id);
                id
            }
        };

        let row = match tables.uploads.get(&(car.user, content_id)) {
            Some(row) => row.clone(),
            None => {
                let row = UploadRow {
                    id: tables.next_id(),
                    auth_token: car.auth_token,
                    name: car.name,
                    created: now,
                };
                tables.uploads.insert((car.user, content_id), row.clone());
                row
            }
        };

        for record in car.pins {
            tables.pins.insert(
                (content_id, record.peer_id.clone()),
                Pin {
                    content: content_id,
                    record,
                    updated: now,
                },
            );
        }

        let content = tables
            .contents
            .get(&content_id)
            .cloned()
            .ok_or(StoreError::ContentNotFound(content_id))?;
        Ok(Upload {
            id: row.id,
            user: car.user,
            auth_token: row.auth_token,
            content,
            name: row.name,
            created: row.created,
        })
    }

    async fn update_dag_size(&self, content: Id, dag_size: u64) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let content = tables
            .contents
            .get_mut(&content)
            .ok_or(StoreError::ContentNotFound(content))?;
        content.dag_size = Some(dag_size);
        Ok(())
    }

    async fn get_content(&self, cid: &Cid) -> Result<Option<Content>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .content_by_cid
            .get(cid)
            .and_then(|id| tables.contents.get(id))
            .cloned())
    }

    async fn pins_for(&self, content: Id) -> Result<Vec<Pin>, StoreError> {
        Ok(self
            .tables
            .read()
            .pins
            .values()
            .filter(|pin| pin.content == content)
            .cloned()
            .collect())
    }

    async fn create_user(&self, issuer: &str, name: &str) -> Result<User, StoreError> {
        let mut tables = self.tables.write();
        if tables.users.values().any(|user| user.issuer == issuer) {
            return Err(StoreError::DuplicateUser(issuer.into()));
        }
        let user = User {
            id: tables.next_id(),
            issuer: issuer.into(),
            name: name.into(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_issuer(&self, issuer: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .tables
            .read()
            .users
            .values()
            .find(|user| user.issuer == issuer)
            .cloned())
    }

    async fn create_auth_token(
        &self,
        user: Id,
        name: &str,
        secret: &str,
    ) -> Result<AuthToken, StoreError> {
        let mut tables = self.tables.write();
        if !tables.users.contains_key(&user) {
            return Err(StoreError::UserNotFound(user));
        }
        let token = AuthToken {
            id: tables.next_id(),
            user,
            name: name.into(),
            secret: secret.into(),
        };
        tables.auth_tokens.insert(token.id, token.clone());
        Ok(token)
    }

    async fn find_auth_token(
        &self,
        user: Id,
        secret: &str,
    ) -> Result<Option<AuthToken>, StoreError> {
        Ok(self
            .tables
            .read()
            .auth_tokens
            .values()
            .find(|token| token.user == user && token.secret == secret)
            .cloned())
    }
}
