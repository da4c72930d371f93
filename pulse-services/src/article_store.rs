//! Article Store
//!
//! URL-keyed SQLite table of polled headlines. Timestamps are stored as
//! fixed-width RFC 3339 UTC text so range queries can compare them as strings.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use pulse_core::Article;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info, instrument};

use crate::error::{StoreError, StoreResult};

const ARTICLE_COLUMNS: &str =
    "url, title, description, content, source_name, published_at, fetched_at";

/// Encode a timestamp for storage
pub(crate) fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Decode a stored timestamp
pub(crate) fn decode_ts(column: &'static str, value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StoreError::InvalidTimestamp {
            column,
            value: value.to_string(),
        })
}

/// Row as read from SQLite, before timestamp decoding
struct ArticleRow {
    url: String,
    title: String,
    description: Option<String>,
    content: Option<String>,
    source_name: String,
    published_at: String,
    fetched_at: String,
}

impl ArticleRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            url: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            content: row.get(3)?,
            source_name: row.get(4)?,
            published_at: row.get(5)?,
            fetched_at: row.get(6)?,
        })
    }

    fn into_article(self) -> StoreResult<Article> {
        Ok(Article {
            published_at: decode_ts("published_at", &self.published_at)?,
            fetched_at: decode_ts("fetched_at", &self.fetched_at)?,
            url: self.url,
            title: self.title,
            description: self.description,
            content: self.content,
            source_name: self.source_name,
        })
    }
}

/// Durable set of deduplicated articles keyed by URL
#[derive(Clone)]
pub struct ArticleStore {
    db: Arc<Mutex<Connection>>,
}

impl ArticleStore {
    /// Open (or create) the database file
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store (for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create the article table and its time indexes
    pub fn init_schema(&self) -> StoreResult<()> {
        let conn = self.db.lock();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                url TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                content TEXT,
                source_name TEXT NOT NULL,
                published_at TEXT NOT NULL,
                fetched_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_articles_published_at
            ON articles(published_at);

            CREATE INDEX IF NOT EXISTS idx_articles_fetched_at
            ON articles(fetched_at);
            "#,
        )?;
        info!("Article store schema initialized");
        Ok(())
    }

    /// Insert or fully overwrite one article
    pub fn upsert_article(&self, article: &Article) -> StoreResult<()> {
        let conn = self.db.lock();
        Self::upsert_with(&conn, article)?;
        Ok(())
    }

    /// Upsert a batch in one transaction; returns the number of rows written
    #[instrument(skip(self, articles), fields(count = articles.len()))]
    pub fn upsert_articles(&self, articles: &[Article]) -> StoreResult<usize> {
        let mut conn = self.db.lock();
        let tx = conn.transaction()?;
        for article in articles {
            Self::upsert_with(&tx, article)?;
        }
        tx.commit()?;
        debug!("Upserted {} articles", articles.len());
        Ok(articles.len())
    }

    fn upsert_with(conn: &Connection, article: &Article) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO articles (url, title, description, content, source_name, published_at, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                content = excluded.content,
                source_name = excluded.source_name,
                published_at = excluded.published_at,
                fetched_at = excluded.fetched_at",
            params![
                &article.url,
                &article.title,
                &article.description,
                &article.content,
                &article.source_name,
                encode_ts(article.published_at),
                encode_ts(article.fetched_at),
            ],
        )
    }

    /// Delete articles last fetched before `cutoff`; returns rows removed
    #[instrument(skip(self))]
    pub fn delete_fetched_before(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        let conn = self.db.lock();
        let deleted = conn.execute(
            "DELETE FROM articles WHERE fetched_at < ?1",
            params![encode_ts(cutoff)],
        )?;
        if deleted > 0 {
            info!("Retention removed {} articles fetched before {}", deleted, cutoff);
        }
        Ok(deleted)
    }

    /// Articles with `start <= published_at < end`, newest first
    pub fn articles_published_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<Article>> {
        let sql = format!(
            "SELECT {} FROM articles
             WHERE published_at >= ?1 AND published_at < ?2
             ORDER BY published_at DESC, url ASC",
            ARTICLE_COLUMNS
        );
        self.query_articles(&sql, params![encode_ts(start), encode_ts(end)])
    }

    /// Every stored article, newest published first
    pub fn all_articles(&self) -> StoreResult<Vec<Article>> {
        let sql = format!(
            "SELECT {} FROM articles ORDER BY published_at DESC, url ASC",
            ARTICLE_COLUMNS
        );
        self.query_articles(&sql, [])
    }

    fn query_articles<P: rusqlite::Params>(&self, sql: &str, params: P) -> StoreResult<Vec<Article>> {
        let rows: Vec<ArticleRow> = {
            let conn = self.db.lock();
            let mut stmt = conn.prepare(sql)?;
            let mapped = stmt.query_map(params, ArticleRow::from_row)?;
            let rows = mapped.collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };
        rows.into_iter().map(ArticleRow::into_article).collect()
    }

    pub fn get_article(&self, url: &str) -> StoreResult<Option<Article>> {
        let row = {
            let conn = self.db.lock();
            let sql = format!("SELECT {} FROM articles WHERE url = ?1", ARTICLE_COLUMNS);
            conn.query_row(&sql, params![url], ArticleRow::from_row)
                .optional()?
        };
        row.map(ArticleRow::into_article).transpose()
    }

    pub fn article_urls(&self) -> StoreResult<HashSet<String>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare("SELECT url FROM articles")?;
        let urls = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(urls)
    }

    pub fn count(&self) -> StoreResult<usize> {
        let conn = self.db.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
