/*
 * vSMTP mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/
//! Persisted mapping between the `Message-ID` of the mails sent through the
//! cloud provider and the identifier the provider assigned to them.

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
//
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]

use anyhow::Context;
use mailrelay_common::MessageIdStore;
use rusqlite::OptionalExtension;

const MIGRATION: &str = r"
CREATE TABLE IF NOT EXISTS aws_message_id_map (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    message_id TEXT NOT NULL UNIQUE,
    aws_message_id TEXT NOT NULL UNIQUE
);
CREATE INDEX IF NOT EXISTS aws_message_id_map_message_id ON aws_message_id_map (message_id);
CREATE INDEX IF NOT EXISTS aws_message_id_map_aws_message_id ON aws_message_id_map (aws_message_id);
";

/// A r2d2 connection manager for sqlite.
#[derive(Clone, Debug)]
pub struct ConnectionManager {
    path: std::path::PathBuf,
    busy_timeout: std::time::Duration,
}

impl r2d2::ManageConnection for ConnectionManager {
    type Connection = rusqlite::Connection;
    type Error = rusqlite::Error;

    fn connect(&self) -> Result<rusqlite::Connection, rusqlite::Error> {
        let conn = rusqlite::Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }

    fn is_valid(&self, conn: &mut rusqlite::Connection) -> Result<(), rusqlite::Error> {
        conn.query_row("SELECT 1", [], |_| Ok(()))
    }

    fn has_broken(&self, conn: &mut rusqlite::Connection) -> bool {
        self.is_valid(conn).is_err()
    }
}

/// [`MessageIdStore`] in a sqlite database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: r2d2::Pool<ConnectionManager>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` with a pool of `connections`.
    ///
    /// # Errors
    ///
    /// * the parent directory cannot be created
    /// * the database cannot be opened or migrated
    pub fn open(
        path: &std::path::Path,
        connections: u32,
        timeout: std::time::Duration,
    ) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create database directory {parent:?}"))?;
        }

        let pool = r2d2::Pool::builder()
            .max_size(connections)
            .connection_timeout(timeout)
            .build(ConnectionManager {
                path: path.to_path_buf(),
                busy_timeout: timeout,
            })
            .with_context(|| format!("cannot open database {path:?}"))?;

        pool.get()?
            .execute_batch(MIGRATION)
            .context("failed to migrate the database")?;

        tracing::info!(?path, "Message id store ready.");
        Ok(Self { pool })
    }

    async fn with_connection<T, F>(&self, f: F) -> anyhow::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&conn).context("failed to execute query on sqlite database")
        })
        .await?
    }
}

#[async_trait::async_trait]
impl MessageIdStore for SqliteStore {
    async fn translated(&self, original: &str) -> anyhow::Result<Option<String>> {
        let original = original.to_owned();
        self.with_connection(move |conn| {
            conn.query_row(
                "SELECT aws_message_id FROM aws_message_id_map WHERE message_id = ?1",
                [original],
                |row| row.get(0),
            )
            .optional()
        })
        .await
    }

    async fn original(&self, translated: &str) -> anyhow::Result<Option<String>> {
        let translated = translated.to_owned();
        self.with_connection(move |conn| {
            conn.query_row(
                "SELECT message_id FROM aws_message_id_map WHERE aws_message_id = ?1",
                [translated],
                |row| row.get(0),
            )
            .optional()
        })
        .await
    }

    async fn record(&self, original: &str, translated: &str) -> anyhow::Result<()> {
        let (original, translated) = (original.to_owned(), translated.to_owned());
        let inserted = self
            .with_connection(move |conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO aws_message_id_map (message_id, aws_message_id) VALUES (?1, ?2)",
                    [original, translated],
                )
            })
            .await?;

        if inserted == 0 {
            tracing::warn!("Message id pair not recorded, one of the ids is already known.");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteStore;
    use mailrelay_common::MessageIdStore;
    use pretty_assertions::assert_eq;

    fn open(dir: &tempfile::TempDir) -> SqliteStore {
        SqliteStore::open(
            &dir.path().join("data").join("db.sqlite"),
            4,
            std::time::Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn both_directions() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir);

        assert_eq!(store.translated("orig@x.com").await.unwrap(), None);

        store.record("orig@x.com", "prov@ses").await.unwrap();
        assert_eq!(
            store.translated("orig@x.com").await.unwrap().as_deref(),
            Some("prov@ses")
        );
        assert_eq!(
            store.original("prov@ses").await.unwrap().as_deref(),
            Some("orig@x.com")
        );
    }

    #[tokio::test]
    async fn duplicates_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir);

        store.record("orig@x.com", "prov@ses").await.unwrap();
        store.record("orig@x.com", "other@ses").await.unwrap();
        store.record("another@x.com", "prov@ses").await.unwrap();

        assert_eq!(
            store.translated("orig@x.com").await.unwrap().as_deref(),
            Some("prov@ses")
        );
        assert_eq!(store.translated("another@x.com").await.unwrap(), None);
    }

    #[tokio::test]
    async fn reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        open(&dir).record("orig@x.com", "prov@ses").await.unwrap();

        assert_eq!(
            open(&dir).original("prov@ses").await.unwrap().as_deref(),
            Some("orig@x.com")
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir);

        let tasks = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .record(&format!("orig-{i}@x.com"), &format!("prov-{i}@ses"))
                        .await
                })
            })
            .collect::<Vec<_>>();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        for i in 0..16 {
            assert_eq!(
                store.translated(&format!("orig-{i}@x.com")).await.unwrap(),
                Some(format!("prov-{i}@ses"))
            );
        }
    }
}
