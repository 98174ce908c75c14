//! SQLite-backed record store.
//!
//! One `records` table keyed by `(kind, identifier)`. Columns mirror the
//! canonical fields for ad-hoc queries; `payload` holds the full record as JSON.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;
use std::time::Duration;

use super::{RecordSink, UPSERT_BATCH_SIZE};
use crate::normalize::{NormalizedRecord, RecordKind};

/// Handle to the record database, by default `~/.local/state/bidradar/records.db`.
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: Pool<Sqlite>,
}

impl SqliteRecordStore {
    pub async fn open_default() -> Result<Self> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("bidradar")?;
        let state_dir = xdg_dirs.get_state_home().join("bidradar");
        Self::open_at(state_dir.join("records.db")).await
    }

    /// Open (or create) the database at `path`, creating parent dirs.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Concurrent CLI runs share the file; wait on the lock instead of failing.
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("open record store: {}", path.display()))?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// In-memory database (single connection so every query sees the same data).
    pub async fn open_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                kind TEXT NOT NULL,
                identifier TEXT NOT NULL,
                occurred_at TEXT,
                deadline TEXT,
                amount REAL,
                count INTEGER,
                rate REAL,
                title TEXT,
                agency TEXT,
                category TEXT,
                region TEXT,
                source_tag TEXT NOT NULL,
                collected_at TEXT NOT NULL,
                payload TEXT NOT NULL,
                PRIMARY KEY (kind, identifier)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn count(&self, kind: RecordKind) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM records WHERE kind = ?1")
            .bind(kind.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    pub async fn get(&self, kind: RecordKind, identifier: &str) -> Result<Option<NormalizedRecord>> {
        let row = sqlx::query("SELECT payload FROM records WHERE kind = ?1 AND identifier = ?2")
            .bind(kind.as_str())
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| decode_payload(r.get("payload"))).transpose()
    }

    /// Most recently collected records first.
    pub async fn list(&self, kind: RecordKind, limit: u32) -> Result<Vec<NormalizedRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT payload FROM records
            WHERE kind = ?1
            ORDER BY collected_at DESC, identifier ASC
            LIMIT ?2
            "#,
        )
        .bind(kind.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(|r| decode_payload(r.get("payload"))).collect()
    }
}

fn decode_payload(payload: String) -> Result<NormalizedRecord> {
    serde_json::from_str(&payload).context("decode stored record")
}

#[async_trait]
impl RecordSink for SqliteRecordStore {
    async fn upsert(&self, kind: RecordKind, records: &[NormalizedRecord]) -> Result<usize> {
        let mut written = 0;
        for chunk in records.chunks(UPSERT_BATCH_SIZE) {
            let mut tx = self.pool.begin().await?;
            for r in chunk {
                let payload = serde_json::to_string(r)?;
                sqlx::query(
                    r#"
                    INSERT INTO records (
                        kind, identifier, occurred_at, deadline, amount, count, rate,
                        title, agency, category, region, source_tag, collected_at, payload
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                    ON CONFLICT(kind, identifier) DO UPDATE SET
                        occurred_at = excluded.occurred_at,
                        deadline = excluded.deadline,
                        amount = excluded.amount,
                        count = excluded.count,
                        rate = excluded.rate,
                        title = excluded.title,
                        agency = excluded.agency,
                        category = excluded.category,
                        region = excluded.region,
                        source_tag = excluded.source_tag,
                        collected_at = excluded.collected_at,
                        payload = excluded.payload
                    "#,
                )
                .bind(kind.as_str())
                .bind(&r.identifier)
                .bind(r.occurred_at.map(|d| d.to_string()))
                .bind(r.deadline.map(|d| d.to_string()))
                .bind(r.amount)
                .bind(r.count)
                .bind(r.rate)
                .bind(r.title.as_deref())
                .bind(r.agency.as_deref())
                .bind(r.category.map(|c| c.as_str()))
                .bind(r.region.as_deref())
                .bind(r.source_tag.as_str())
                .bind(r.collected_at.to_rfc3339())
                .bind(payload)
                .execute(&mut *tx)
                .await?;
            }
            tx.commit().await?;
            written += chunk.len();
            tracing::debug!(kind = kind.as_str(), chunk = chunk.len(), written, "upserted chunk");
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{Category, SourceTag};
    use chrono::{NaiveDate, Utc};

    fn rec(id: &str, amount: Option<f64>) -> NormalizedRecord {
        NormalizedRecord {
            identifier: id.to_string(),
            occurred_at: NaiveDate::from_ymd_opt(2024, 2, 1).and_then(|d| d.and_hms_opt(0, 0, 0)),
            deadline: None,
            amount,
            count: Some(4),
            rate: None,
            title: Some("정보화 사업".to_string()),
            agency: Some("서울특별시청".to_string()),
            category: Some(Category::Software),
            region: Some("서울".to_string()),
            source_tag: SourceTag::LiveApi,
            collected_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn open_at_accepts_paths_with_uri_characters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("my dir").join("#1?&.db");
        let store = SqliteRecordStore::open_at(&path).await.unwrap();
        let mut r = rec("D", Some(3.0));
        r.deadline = NaiveDate::from_ymd_opt(2024, 2, 15).and_then(|d| d.and_hms_opt(0, 0, 0));
        store.upsert(RecordKind::Bid, &[r.clone()]).await.unwrap();
        assert!(path.exists());
        let back = store.get(RecordKind::Bid, "D").await.unwrap().unwrap();
        assert_eq!(back.deadline, r.deadline);
    }

    #[tokio::test]
    async fn upsert_inserts_then_updates() {
        let store = SqliteRecordStore::open_memory().await.unwrap();
        let n = store
            .upsert(RecordKind::Bid, &[rec("A", Some(1.0)), rec("B", None)])
            .await
            .unwrap();
        assert_eq!(n, 2);
        store.upsert(RecordKind::Bid, &[rec("A", Some(2.5))]).await.unwrap();

        assert_eq!(store.count(RecordKind::Bid).await.unwrap(), 2);
        assert_eq!(store.count(RecordKind::Award).await.unwrap(), 0);
        let a = store.get(RecordKind::Bid, "A").await.unwrap().unwrap();
        assert_eq!(a.amount, Some(2.5));
        assert_eq!(a.category, Some(Category::Software));
        assert!(store.get(RecordKind::Bid, "Z").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn same_identifier_in_different_kinds_is_distinct() {
        let store = SqliteRecordStore::open_memory().await.unwrap();
        store.upsert(RecordKind::Bid, &[rec("X", Some(1.0))]).await.unwrap();
        store.upsert(RecordKind::Award, &[rec("X", Some(2.0))]).await.unwrap();
        assert_eq!(store.count(RecordKind::Bid).await.unwrap(), 1);
        assert_eq!(store.count(RecordKind::Award).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn large_batches_span_several_transactions() {
        let store = SqliteRecordStore::open_memory().await.unwrap();
        let records: Vec<NormalizedRecord> =
            (0..1234).map(|i| rec(&format!("ID{i:05}"), Some(i as f64))).collect();
        assert_eq!(store.upsert(RecordKind::Award, &records).await.unwrap(), 1234);
        assert_eq!(store.count(RecordKind::Award).await.unwrap(), 1234);
        assert_eq!(store.list(RecordKind::Award, 10).await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn open_at_creates_file_and_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("records.db");
        let store = SqliteRecordStore::open_at(&path).await.unwrap();
        store.upsert(RecordKind::Bid, &[rec("A", None)]).await.unwrap();
        assert!(path.exists());
        drop(store);

        let reopened = SqliteRecordStore::open_at(&path).await.unwrap();
        assert_eq!(reopened.count(RecordKind::Bid).await.unwrap(), 1);
    }
}
