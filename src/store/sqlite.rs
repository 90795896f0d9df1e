//! SQLite-backed metadata store.

use super::{MetadataStore, NewVideoMetadata, VideoMetadata};
use crate::config::ContentType;
use crate::error::{ReelError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS video_metadata (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        tags_json TEXT NOT NULL,
        video_path TEXT NOT NULL,
        topic TEXT NOT NULL,
        content_type TEXT NOT NULL,
        language TEXT NOT NULL,
        script TEXT,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_video_metadata_title ON video_metadata(title);
    CREATE INDEX IF NOT EXISTS idx_video_metadata_created_at ON video_metadata(created_at);
"#;

const COLUMNS: &str =
    "id, title, description, tags_json, video_path, topic, content_type, language, script, created_at";

/// SQLite-based metadata store.
pub struct SqliteMetadataStore {
    conn: Mutex<Connection>,
}

impl SqliteMetadataStore {
    /// Open (or create) the database at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized metadata store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ReelError::Store(format!("Failed to acquire lock: {}", e)))
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<VideoMetadata> {
        let tags_json: String = row.get(3)?;
        let content_type: String = row.get(6)?;
        let created_at: String = row.get(9)?;

        Ok(VideoMetadata {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            tags: serde_json::from_str(&tags_json).unwrap_or_default(),
            video_path: row.get(4)?,
            topic: row.get(5)?,
            content_type: content_type.parse().unwrap_or_default(),
            language: row.get(7)?,
            script: row.get(8)?,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    #[instrument(skip(self, metadata), fields(title = %metadata.title))]
    async fn insert(&self, metadata: &NewVideoMetadata) -> Result<VideoMetadata> {
        let conn = self.lock()?;
        let created_at = Utc::now();

        conn.execute(
            r#"
            INSERT INTO video_metadata
            (title, description, tags_json, video_path, topic, content_type, language, script, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                metadata.title,
                metadata.description,
                serde_json::to_string(&metadata.tags)?,
                metadata.video_path,
                metadata.topic,
                metadata.content_type.to_string(),
                metadata.language,
                metadata.script,
                created_at.to_rfc3339(),
            ],
        )?;

        let id = conn.last_insert_rowid();
        debug!("Stored video metadata {}", id);

        Ok(VideoMetadata {
            id,
            title: metadata.title.clone(),
            description: metadata.description.clone(),
            tags: metadata.tags.clone(),
            video_path: metadata.video_path.clone(),
            topic: metadata.topic.clone(),
            content_type: metadata.content_type,
            language: metadata.language.clone(),
            script: metadata.script.clone(),
            created_at,
        })
    }

    #[instrument(skip(self))]
    async fn get(&self, id: i64) -> Result<Option<VideoMetadata>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM video_metadata WHERE id = ?1", COLUMNS);

        match conn.query_row(&sql, params![id], Self::from_row) {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    async fn list(&self, limit: Option<usize>) -> Result<Vec<VideoMetadata>> {
        let conn = self.lock()?;
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let sql = format!(
            "SELECT {} FROM video_metadata ORDER BY created_at DESC, id DESC LIMIT ?1",
            COLUMNS
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![limit], Self::from_row)?;

        let mut videos = Vec::new();
        for row in rows {
            videos.push(row?);
        }
        Ok(videos)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM video_metadata WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(topic: &str) -> NewVideoMetadata {
        NewVideoMetadata::generated(
            topic,
            &format!("/videos/{}.mp4", topic),
            ContentType::InterestingFacts,
            "English",
            vec!["text-to-video".to_string(), "shorts".to_string()],
        )
        .with_script("Bananas are berries.")
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = SqliteMetadataStore::in_memory().unwrap();

        let stored = store.insert(&sample("bananas")).await.unwrap();
        assert_eq!(stored.id, 1);

        let loaded = store.get(stored.id).await.unwrap().unwrap();
        assert_eq!(loaded.topic, "bananas");
        assert_eq!(loaded.tags, vec!["text-to-video", "shorts"]);
        assert_eq!(loaded.content_type, ContentType::InterestingFacts);
        assert_eq!(loaded.script.as_deref(), Some("Bananas are berries."));
        assert_eq!(loaded.created_at.timestamp(), stored.created_at.timestamp());

        assert!(store.get(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first_with_limit() {
        let store = SqliteMetadataStore::in_memory().unwrap();
        for topic in ["one", "two", "three"] {
            store.insert(&sample(topic)).await.unwrap();
        }

        let all = store.list(None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].topic, "three");

        let limited = store.list(Some(2)).await.unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = SqliteMetadataStore::in_memory().unwrap();
        let stored = store.insert(&sample("volcano")).await.unwrap();

        assert!(store.delete(stored.id).await.unwrap());
        assert!(!store.delete(stored.id).await.unwrap());
        assert!(store.list(None).await.unwrap().is_empty());
    }

    #[test]
    fn test_empty_store_lists_nothing() {
        let store = SqliteMetadataStore::in_memory().unwrap();
        let videos = tokio_test::block_on(store.list(Some(10))).unwrap();
        assert!(videos.is_empty());
    }

    #[test]
    fn test_on_disk_store_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("videos.db");
        SqliteMetadataStore::new(&path).unwrap();
        assert!(path.exists());
    }
}
