// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{
    AuthToken, Content, Id, ImportCar, Pin, PinRecord, StoreError, Upload, UploadStore, User,
};
use crate::utils::sqlite::{self, SqliteQuery};
use anyhow::Context as _;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cid::Cid;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row as _, SqlitePool};
use std::path::Path;

const SCHEMA_VERSION: u64 = 1;

fn ddls() -> Vec<SqliteQuery<'static>> {
    vec![
        sqlx::query(
            "CREATE TABLE user (
                id INTEGER PRIMARY KEY,
                issuer TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL
            )",
        ),
        sqlx::query(
            "CREATE TABLE auth_token (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES user(id),
                name TEXT NOT NULL,
                secret TEXT NOT NULL
            )",
        ),
        sqlx::query("CREATE INDEX auth_token_user_secret ON auth_token (user_id, secret)"),
        sqlx::query(
            "CREATE TABLE content (
                id INTEGER PRIMARY KEY,
                cid TEXT NOT NULL UNIQUE,
                dag_size INTEGER,
                created TEXT NOT NULL
            )",
        ),
        sqlx::query(
            "CREATE TABLE upload (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES user(id),
                auth_token_id INTEGER REFERENCES auth_token(id),
                content_id INTEGER NOT NULL REFERENCES content(id),
                name TEXT NOT NULL,
                created TEXT NOT NULL,
                UNIQUE (user_id, content_id)
            )",
        ),
        sqlx::query(
            "CREATE TABLE pin (
                content_id INTEGER NOT NULL REFERENCES content(id),
                peer_id TEXT NOT NULL,
                peer_name TEXT NOT NULL,
                status TEXT NOT NULL,
                updated TEXT NOT NULL,
                PRIMARY KEY (content_id, peer_id)
            )",
        ),
    ]
}

pub struct SqliteDB {
    pool: SqlitePool,
}

impl SqliteDB {
    pub async fn new(pool: SqlitePool) -> anyhow::Result<Self> {
        sqlite::init_db(&pool, "uploads", SCHEMA_VERSION, ddls()).await?;
        Ok(Self { pool })
    }

    pub async fn open(path: &Path) -> anyhow::Result<Self> {
        Self::new(sqlite::open_file(path).await?).await
    }

    pub async fn open_memory() -> anyhow::Result<Self> {
        Self::new(sqlite::open_memory().await?).await
    }
}

fn to_sql_size(size: u64) -> Result<i64, StoreError> {
    Ok(i64::try_from(size).context("DAG size does not fit in SQLite")?)
}

fn parse_time(text: &str) -> Result<DateTime<Utc>, StoreError> {
    Ok(DateTime::parse_from_rfc3339(text)
        .with_context(|| format!("invalid timestamp {text}"))?
        .with_timezone(&Utc))
}

fn content_from_row(row: &SqliteRow) -> Result<Content, StoreError> {
    let cid: String = row.try_get("cid")?;
    let dag_size: Option<i64> = row.try_get("dag_size")?;
    let created: String = row.try_get("created")?;
    Ok(Content {
        id: row.try_get("id")?,
        cid: cid.parse().context("invalid stored CID")?,
        dag_size: dag_size
            .map(u64::try_from)
            .transpose()
            .context("negative DAG size")?,
        created: parse_time(&created)?,
    })
}

fn pin_from_row(row: &SqliteRow) -> Result<Pin, StoreError> {
    let status: String = row.try_get("status")?;
    let updated: String = row.try_get("updated")?;
    Ok(Pin {
        content: row.try_get("content_id")?,
        record: PinRecord {
            peer_id: row.try_get("peer_id")?,
            peer_name: row.try_get("peer_name")?,
            status: status
                .parse()
                .with_context(|| format!("invalid pin status {status}"))?,
        },
        updated: parse_time(&updated)?,
    })
}

#[async_trait]
impl UploadStore for SqliteDB {
    async fn import_car(&self, car: ImportCar) -> Result<Upload, StoreError> {
        let now = Utc::now();
        let now_text = now.to_rfc3339();
        let mut tx = self.pool.begin().await?;

        if sqlx::query("SELECT id FROM user WHERE id = ?")
            .bind(car.user)
            .fetch_optional(tx.as_mut())
            .await?
            .is_none()
        {
            return Err(StoreError::UserNotFound(car.user));
        }

        sqlx::query("INSERT OR IGNORE INTO content (cid, dag_size, created) VALUES (?, NULL, ?)")
            .bind(car.cid.to_string())
            .bind(&now_text)
            .execute(tx.as_mut())
            .await?;
        let content = content_from_row(
            &sqlx::query("SELECT id, cid, dag_size, created FROM content WHERE cid = ?")
                .bind(car.cid.to_string())
                .fetch_one(tx.as_mut())
                .await?,
        )?;

        sqlx::query(
            "INSERT OR IGNORE INTO upload (user_id, auth_token_id, content_id, name, created)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(car.user)
        .bind(car.auth_token)
        .bind(content.id)
        .bind(&car.name)
        .bind(&now_text)
        .execute(tx.as_mut())
        .await?;
        let upload = sqlx::query(
            "SELECT id, auth_token_id, name, created FROM upload
             WHERE user_id = ? AND content_id = ?",
        )
        .bind(car.user)
        .bind(content.id)
        .fetch_one(tx.as_mut())
        .await?;

        for pin in &car.pins {
            let status: &'static str = pin.status.into();
            sqlx::query(
                "INSERT INTO pin (content_id, peer_id, peer_name, status, updated)
                 VALUES (?, ?, ?, ?, ?)
                 ON CONFLICT (content_id, peer_id) DO UPDATE SET
                    peer_name = excluded.peer_name,
                    status = excluded.status,
                    updated = excluded.updated",
            )
            .bind(content.id)
            .bind(&pin.peer_id)
            .bind(&pin.peer_name)
            .bind(status)
            .bind(&now_text)
            .execute(tx.as_mut())
            .await?;
        }
        tx.commit().await?;

        let created: String = upload.try_get("created")?;
        Ok(Upload {
            id: upload.try_get("id")?,
            user: car.user,
            auth_token: upload.try_get("auth_token_id")?,
            content,
            name: upload.try_get("name")?,
            created: parse_time(&created)?,
        })
    }

    async fn update_dag_size(&self, content: Id, dag_size: u64) -> Result<(), StoreError> {
        let updated = sqlx::query("UPDATE content SET dag_size = ? WHERE id = ?")
            .bind(to_sql_size(dag_size)?)
            .bind(content)
            .execute(&self.pool)
            .await?;
        match updated.rows_affected() {
            0 => Err(StoreError::ContentNotFound(content)),
            _ => Ok(()),
        }
    }

    async fn get_content(&self, cid: &Cid) -> Result<Option<Content>, StoreError> {
        sqlx::query("SELECT id, cid, dag_size, created FROM content WHERE cid = ?")
            .bind(cid.to_string())
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(content_from_row)
            .transpose()
    }

    async fn pins_for(&self, content: Id) -> Result<Vec<Pin>, StoreError> {
        sqlx::query(
            "SELECT content_id, peer_id, peer_name, status, updated FROM pin
             WHERE content_id = ? ORDER BY peer_id",
        )
        .bind(content)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(pin_from_row)
        .collect()
    }

    async fn create_user(&self, issuer: &str, name: &str) -> Result<User, StoreError> {
        let inserted = sqlx::query("INSERT OR IGNORE INTO user (issuer, name) VALUES (?, ?)")
            .bind(issuer)
            .bind(name)
            .execute(&self.pool)
            .await?;
        if inserted.rows_affected() == 0 {
            return Err(StoreError::DuplicateUser(issuer.into()));
        }
        Ok(User {
            id: inserted.last_insert_rowid(),
            issuer: issuer.into(),
            name: name.into(),
        })
    }

    async fn find_user_by_issuer(&self, issuer: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query("SELECT id, issuer, name FROM user WHERE issuer = ?")
            .bind(issuer)
            .fetch_optional(&self.pool)
            .await?;
        Ok(match row {
            Some(row) => Some(User {
                id: row.try_get("id")?,
                issuer: row.try_get("issuer")?,
                name: row.try_get("name")?,
            }),
            None => None,
        })
    }

    async fn create_auth_token(
        &self,
        user: Id,
        name: &str,
        secret: &str,
    ) -> Result<AuthToken, StoreError> {
        let inserted = sqlx::query(
            "INSERT INTO auth_token (user_id, name, secret)
             SELECT id, ?, ? FROM user WHERE id = ?",
        )
        .bind(name)
        .bind(secret)
        .bind(user)
        .execute(&self.pool)
        .await?;
        if inserted.rows_affected() == 0 {
            return Err(StoreError::UserNotFound(user));
        }
        Ok(AuthToken {
            id: inserted.last_insert_rowid(),
            user,
            name: name.into(),
            secret: secret.into(),
        })
    }

    async fn find_auth_token(
        &self,
        user: Id,
        secret: &str,
    ) -> Result<Option<AuthToken>, StoreError> {
        let row = sqlx::query(
            "SELECT id, user_id, name, secret FROM auth_token WHERE user_id = ? AND secret = ?",
        )
        .bind(user)
        .bind(secret)
        .fetch_optional(&self.pool)
        .await?;
        Ok(match row {
            Some(row) => Some(AuthToken {
                id: row.try_get("id")?,
                user: row.try_get("user_id")?,
                name: row.try_get("name")?,
                secret: row.try_get("secret")?,
            }),
            None => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store_tests::store_test_suite;

    store_test_suite!(SqliteDB::open_memory().await.unwrap());

    #[tokio::test]
    async fn survives_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("uploads.db");
        let db = SqliteDB::open(&path).await.unwrap();
        let user = db.create_user("did:key:alice", "alice").await.unwrap();
        db.pool.close().await;

        let db = SqliteDB::open(&path).await.unwrap();
        assert_eq!(
            db.find_user_by_issuer("did:key:alice").await.unwrap(),
            Some(user)
        );
    }
}
