//! Turso Embedded / libSQL storage layer for Postforge articles.
//!
//! The [`Storage`] struct wraps a local libSQL database holding the `articles`
//! table. Harvested articles are written through [`Storage::upsert_by_slug`]
//! (slug-keyed, insert-or-overwrite); enhanced articles are written through
//! [`Storage::insert`] as brand-new rows.

mod migrations;

use std::path::Path;

use postforge_shared::{Article, NewArticle, PostforgeError, Result};
use libsql::{Connection, Database, params};
use uuid::Uuid;

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl Storage {
    /// Open or create a database at `path` and apply pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PostforgeError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| PostforgeError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| PostforgeError::Storage(e.to_string()))?;

        let storage = Self { db, conn };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        PostforgeError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Write operations
    // -----------------------------------------------------------------------

    /// Insert a brand-new article. Returns the stored record with its
    /// generated id. Fails on slug collision.
    pub async fn insert(&self, article: &NewArticle) -> Result<Article> {
        let id = Uuid::now_v7().to_string();
        let references_json = serde_json::to_string(&article.references)
            .map_err(|e| PostforgeError::Storage(e.to_string()))?;

        self.conn
            .execute(
                "INSERT INTO articles (id, title, slug, content, author, source_url, references_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id.as_str(),
                    article.title.as_str(),
                    article.slug.as_str(),
                    article.content.as_str(),
                    article.author.as_str(),
                    article.source_url.as_deref(),
                    references_json.as_str(),
                    article.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| PostforgeError::Storage(e.to_string()))?;

        Ok(Article {
            id,
            title: article.title.clone(),
            slug: article.slug.clone(),
            content: article.content.clone(),
            author: article.author.clone(),
            source_url: article.source_url.clone(),
            references: article.references.clone(),
            created_at: article.created_at,
        })
    }

    /// Upsert an article by slug: insert when the slug is new, otherwise
    /// overwrite every field of the existing row (the id is preserved).
    pub async fn upsert_by_slug(&self, article: &NewArticle) -> Result<()> {
        let id = Uuid::now_v7().to_string();
        let references_json = serde_json::to_string(&article.references)
            .map_err(|e| PostforgeError::Storage(e.to_string()))?;

        self.conn
            .execute(
                "INSERT INTO articles (id, title, slug, content, author, source_url, references_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(slug) DO UPDATE SET
                   title = excluded.title,
                   content = excluded.content,
                   author = excluded.author,
                   source_url = excluded.source_url,
                   references_json = excluded.references_json,
                   created_at = excluded.created_at",
                params![
                    id.as_str(),
                    article.title.as_str(),
                    article.slug.as_str(),
                    article.content.as_str(),
                    article.author.as_str(),
                    article.source_url.as_deref(),
                    references_json.as_str(),
                    article.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| PostforgeError::Storage(e.to_string()))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Query operations
    // -----------------------------------------------------------------------

    /// Get an article by slug.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, title, slug, content, author, source_url, references_json, created_at
                 FROM articles WHERE slug = ?1",
                params![slug],
            )
            .await
            .map_err(|e| PostforgeError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_article(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(PostforgeError::Storage(e.to_string())),
        }
    }

    /// Most recently created article whose title does NOT contain `marker`
    /// (case-insensitive). `None` when every article carries the marker or
    /// the table is empty.
    pub async fn find_latest_unenhanced(&self, marker: &str) -> Result<Option<Article>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, title, slug, content, author, source_url, references_json, created_at
                 FROM articles
                 WHERE lower(title) NOT LIKE '%' || lower(?1) || '%'
                 ORDER BY created_at DESC
                 LIMIT 1",
                params![marker],
            )
            .await
            .map_err(|e| PostforgeError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_article(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(PostforgeError::Storage(e.to_string())),
        }
    }

    /// Most recently created article, enhanced or not.
    pub async fn find_latest_any(&self) -> Result<Option<Article>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, title, slug, content, author, source_url, references_json, created_at
                 FROM articles ORDER BY created_at DESC LIMIT 1",
                params![],
            )
            .await
            .map_err(|e| PostforgeError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_article(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(PostforgeError::Storage(e.to_string())),
        }
    }

    /// List all articles, newest first.
    pub async fn list_articles(&self) -> Result<Vec<Article>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, title, slug, content, author, source_url, references_json, created_at
                 FROM articles ORDER BY created_at DESC",
                params![],
            )
            .await
            .map_err(|e| PostforgeError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_article(&row)?);
        }
        Ok(results)
    }

    /// Total number of stored articles.
    pub async fn count_articles(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM articles", params![])
            .await
            .map_err(|e| PostforgeError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => row
                .get::<u64>(0)
                .map_err(|e| PostforgeError::Storage(e.to_string())),
            Ok(None) => Ok(0),
            Err(e) => Err(PostforgeError::Storage(e.to_string())),
        }
    }
}

/// Convert a database row to an [`Article`].
fn row_to_article(row: &libsql::Row) -> Result<Article> {
    let references_json: String = row
        .get(6)
        .map_err(|e| PostforgeError::Storage(e.to_string()))?;
    let references: Vec<String> = serde_json::from_str(&references_json)
        .map_err(|e| PostforgeError::Storage(format!("invalid references_json: {e}")))?;

    Ok(Article {
        id: row
            .get::<String>(0)
            .map_err(|e| PostforgeError::Storage(e.to_string()))?,
        title: row
            .get::<String>(1)
            .map_err(|e| PostforgeError::Storage(e.to_string()))?,
        slug: row
            .get::<String>(2)
            .map_err(|e| PostforgeError::Storage(e.to_string()))?,
        content: row
            .get::<String>(3)
            .map_err(|e| PostforgeError::Storage(e.to_string()))?,
        author: row
            .get::<String>(4)
            .map_err(|e| PostforgeError::Storage(e.to_string()))?,
        source_url: row.get::<String>(5).ok(),
        references,
        created_at: {
            let s: String = row
                .get(7)
                .map_err(|e| PostforgeError::Storage(e.to_string()))?;
            chrono::DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .map_err(|e| PostforgeError::Storage(format!("invalid date: {e}")))?
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use postforge_shared::ENHANCED_MARKER;
    use uuid::Uuid;

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("pf_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn new_article(title: &str, slug: &str) -> NewArticle {
        NewArticle {
            title: title.into(),
            slug: slug.into(),
            content: "<p>body</p>".into(),
            author: "Unknown".into(),
            source_url: Some("https://example.com/blogs/post".into()),
            references: vec![],
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        let version = storage.get_schema_version().await;
        assert_eq!(version, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("pf_test_{}.db", Uuid::now_v7()));
        let _s1 = Storage::open(&tmp).await.expect("first open");
        drop(_s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn insert_and_get_by_slug() {
        let storage = test_storage().await;
        let stored = storage
            .insert(&new_article("Intro to Widgets", "intro-to-widgets"))
            .await
            .expect("insert");
        assert!(!stored.id.is_empty());

        let found = storage
            .get_by_slug("intro-to-widgets")
            .await
            .expect("get")
            .expect("present");
        assert_eq!(found.id, stored.id);
        assert_eq!(found.title, "Intro to Widgets");
        assert_eq!(found.author, "Unknown");
        assert!(found.references.is_empty());
    }

    #[tokio::test]
    async fn upsert_same_slug_keeps_one_row() {
        let storage = test_storage().await;

        storage
            .upsert_by_slug(&new_article("Intro to Widgets", "intro-to-widgets"))
            .await
            .expect("first upsert");
        let original = storage
            .get_by_slug("intro-to-widgets")
            .await
            .unwrap()
            .unwrap();

        let mut updated = new_article("Intro to Widgets", "intro-to-widgets");
        updated.content = "<p>revised body</p>".into();
        updated.author = "Jane Doe".into();
        storage.upsert_by_slug(&updated).await.expect("second upsert");

        assert_eq!(storage.count_articles().await.expect("count"), 1);
        let found = storage
            .get_by_slug("intro-to-widgets")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, original.id);
        assert_eq!(found.content, "<p>revised body</p>");
        assert_eq!(found.author, "Jane Doe");
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_slug() {
        let storage = test_storage().await;
        storage
            .insert(&new_article("First", "shared-slug"))
            .await
            .expect("insert");
        let result = storage.insert(&new_article("Second", "shared-slug")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn latest_unenhanced_skips_marked_titles() {
        let storage = test_storage().await;
        let now = Utc::now();

        let mut plain = new_article("Older Post", "older-post");
        plain.created_at = now - Duration::hours(2);
        storage.insert(&plain).await.unwrap();

        let mut enhanced = new_article(
            &format!("Newer Post{ENHANCED_MARKER}"),
            "newer-post-ai-enhanced-1",
        );
        enhanced.created_at = now;
        enhanced.references = vec![
            "https://ref.example/one".into(),
            "https://ref.example/two".into(),
        ];
        storage.insert(&enhanced).await.unwrap();

        let candidate = storage
            .find_latest_unenhanced(ENHANCED_MARKER)
            .await
            .expect("query")
            .expect("present");
        assert_eq!(candidate.slug, "older-post");

        let latest = storage
            .find_latest_any()
            .await
            .expect("query")
            .expect("present");
        assert_eq!(latest.slug, "newer-post-ai-enhanced-1");
        assert_eq!(latest.references.len(), 2);
    }

    #[tokio::test]
    async fn latest_unenhanced_marker_case_insensitive() {
        let storage = test_storage().await;
        storage
            .insert(&new_article("Post (ai enhanced)", "post-ai-enhanced"))
            .await
            .unwrap();

        let candidate = storage
            .find_latest_unenhanced(ENHANCED_MARKER)
            .await
            .expect("query");
        assert!(candidate.is_none());
    }

    #[tokio::test]
    async fn latest_unenhanced_empty_table() {
        let storage = test_storage().await;
        let candidate = storage
            .find_latest_unenhanced(ENHANCED_MARKER)
            .await
            .expect("query");
        assert!(candidate.is_none());
    }

    #[tokio::test]
    async fn list_newest_first() {
        let storage = test_storage().await;
        let now = Utc::now();

        for (i, slug) in ["first", "second", "third"].iter().enumerate() {
            let mut article = new_article(slug, slug);
            article.created_at = now - Duration::hours((3 - i) as i64);
            storage.insert(&article).await.unwrap();
        }

        let articles = storage.list_articles().await.expect("list");
        assert_eq!(articles.len(), 3);
        assert_eq!(articles[0].slug, "third");
        assert_eq!(articles[2].slug, "first");
    }

    #[tokio::test]
    async fn null_source_url_roundtrip() {
        let storage = test_storage().await;
        let mut article = new_article("Manual Note", "manual-note");
        article.source_url = None;
        storage.insert(&article).await.unwrap();

        let found = storage.get_by_slug("manual-note").await.unwrap().unwrap();
        assert!(found.source_url.is_none());
    }
}
