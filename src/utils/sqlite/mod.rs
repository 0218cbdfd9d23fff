// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use anyhow::Context as _;
use sqlx::{
    SqlitePool,
    query::Query,
    sqlite::{
        SqliteArguments, SqliteAutoVacuum, SqliteConnectOptions, SqliteJournalMode,
        SqlitePoolOptions, SqliteSynchronous,
    },
};
use std::path::Path;
use std::str::FromStr as _;
use std::time::Instant;

pub type SqliteQuery<'q> = Query<'q, sqlx::Sqlite, SqliteArguments<'q>>;

/// Opens or creates a database at the specified path
pub async fn open_file(file: &Path) -> anyhow::Result<SqlitePool> {
    if let Some(dir) = file.parent()
        && !dir.as_os_str().is_empty()
        && !dir.is_dir()
    {
        std::fs::create_dir_all(dir)?;
    }
    let options = SqliteConnectOptions::new()
        .filename(file)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);
    Ok(open(options, SqlitePoolOptions::new()).await?)
}

/// Opens a fresh, private in-memory database.
///
/// The pool holds a single connection that is never reaped: the database
/// disappears with its last connection.
pub async fn open_memory() -> sqlx::Result<SqlitePool> {
    open(
        SqliteConnectOptions::from_str("sqlite::memory:")?,
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None),
    )
    .await
}

pub async fn open(
    options: SqliteConnectOptions,
    pool: SqlitePoolOptions,
) -> sqlx::Result<SqlitePool> {
    let options = options
        .synchronous(SqliteSynchronous::Normal)
        .pragma("temp_store", "memory")
        .auto_vacuum(SqliteAutoVacuum::None)
        .foreign_keys(true)
        .read_only(false);
    pool.connect_with(options).await
}

/// Creates the tables of a new database, or checks the schema version of an
/// existing one.
///
/// `ddls` are only run on a database without a `_meta` table, and must leave
/// it at `schema_version`. A database at a newer version is rejected.
pub async fn init_db<'q>(
    db: &SqlitePool,
    name: &str,
    schema_version: u64,
    ddls: impl IntoIterator<Item = SqliteQuery<'q>>,
) -> anyhow::Result<()> {
    let exists = sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name='_meta';")
        .fetch_optional(db)
        .await
        .map_err(|e| anyhow::anyhow!("error looking for {name} database _meta table: {e}"))?
        .is_some();

    if !exists {
        let now = Instant::now();
        let mut tx = db.begin().await?;
        sqlx::query("CREATE TABLE IF NOT EXISTS _meta (version UINT64 NOT NULL UNIQUE)")
            .execute(tx.as_mut())
            .await?;
        sqlx::query("INSERT OR IGNORE INTO _meta (version) VALUES (?)")
            .bind(i64::try_from(schema_version)?)
            .execute(tx.as_mut())
            .await?;
        for ddl in ddls {
            ddl.execute(tx.as_mut()).await?;
        }
        tx.commit().await?;
        tracing::info!(
            "Created {name} database at version {schema_version} in {}",
            humantime::format_duration(now.elapsed())
        );
    }

    let found_version: i64 = sqlx::query_scalar("SELECT max(version) FROM _meta")
        .fetch_optional(db)
        .await?
        .with_context(|| format!("invalid {name} database version: no version found"))?;
    anyhow::ensure!(
        u64::try_from(found_version).is_ok_and(|v| v > 0 && v <= schema_version),
        "invalid {name} database version: found {found_version}, supported up to {schema_version}"
    );
    Ok(())
}
