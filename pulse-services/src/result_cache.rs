//! Result Cache
//!
//! Latest successful result per signal kind, held in memory for readers and
//! written through to SQLite so a restart serves the last completed cycle.
//!
//! Embeddings and cluster assignments are keyed by article url and merged per
//! url. The topic summary (with its url → topic map) and the breaking-news
//! assessment are replaced wholesale. The cache has no notion of expiry;
//! readers judge staleness from `computed_at`.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use pulse_core::{
    BreakingAssessment, CacheEntry, CacheKind, ClusterAssignment, TopicAssignment, TopicSummary,
};
use pulse_embedding::EmbeddingVector;
use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::article_store::{decode_ts, encode_ts};
use crate::error::StoreResult;

#[derive(Debug, Default)]
struct CacheState {
    embeddings: HashMap<String, CacheEntry<EmbeddingVector>>,
    clusters: HashMap<String, CacheEntry<ClusterAssignment>>,
    topic_summary: Option<CacheEntry<TopicSummary>>,
    topic_assignments: HashMap<String, TopicAssignment>,
    breaking: Option<CacheEntry<BreakingAssessment>>,
}

/// Last computed time per kind, for health reporting
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStatus {
    pub embeddings: Option<DateTime<Utc>>,
    pub embedding_count: usize,
    pub cluster_assignment: Option<DateTime<Utc>>,
    pub topic_summary: Option<DateTime<Utc>>,
    pub breaking_news: Option<DateTime<Utc>>,
}

/// In-memory + SQLite result cache
#[derive(Clone)]
pub struct ResultCache {
    state: Arc<RwLock<CacheState>>,
    db: Arc<Mutex<Connection>>,
}

impl ResultCache {
    /// Open (or create) the cache database file
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        Ok(Self::with_connection(conn))
    }

    /// Create an in-memory cache (for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::with_connection(Connection::open_in_memory()?))
    }

    fn with_connection(conn: Connection) -> Self {
        Self {
            state: Arc::new(RwLock::new(CacheState::default())),
            db: Arc::new(Mutex::new(conn)),
        }
    }

    /// Create the cache tables and load any persisted entries into memory
    pub fn init_schema(&self) -> StoreResult<()> {
        {
            let conn = self.db.lock();
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS article_embeddings (
                    url TEXT PRIMARY KEY,
                    embedding BLOB NOT NULL,
                    computed_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS article_clusters (
                    url TEXT PRIMARY KEY,
                    cluster_id INTEGER NOT NULL,
                    cluster_size INTEGER NOT NULL,
                    computed_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS article_topics (
                    url TEXT PRIMARY KEY,
                    topic_id INTEGER NOT NULL,
                    topic_label TEXT NOT NULL,
                    keywords TEXT NOT NULL,
                    computed_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS topics_cache (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    payload TEXT NOT NULL,
                    computed_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS breaking_news_cache (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    payload TEXT NOT NULL,
                    computed_at TEXT NOT NULL
                );
                "#,
            )?;
        }

        let loaded = self.load_from_db()?;
        info!("Result cache schema initialized ({} entries restored)", loaded);
        Ok(())
    }

    /// Replace the in-memory state with what is on disk
    fn load_from_db(&self) -> StoreResult<usize> {
        let state = {
            let conn = self.db.lock();
            CacheState {
                embeddings: Self::load_embeddings(&conn)?,
                clusters: Self::load_clusters(&conn)?,
                topic_summary: Self::load_singleton(&conn, "topics_cache"),
                topic_assignments: Self::load_topic_assignments(&conn)?,
                breaking: Self::load_singleton(&conn, "breaking_news_cache"),
            }
        };

        let loaded = state.embeddings.len()
            + state.clusters.len()
            + state.topic_assignments.len()
            + usize::from(state.topic_summary.is_some())
            + usize::from(state.breaking.is_some());
        *self.state.write() = state;
        Ok(loaded)
    }

    fn load_embeddings(
        conn: &Connection,
    ) -> StoreResult<HashMap<String, CacheEntry<EmbeddingVector>>> {
        let mut stmt = conn.prepare("SELECT url, embedding, computed_at FROM article_embeddings")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut embeddings = HashMap::new();
        for (url, blob, computed_at) in readable_rows("article_embeddings", rows) {
            let embedding = match bincode::deserialize::<EmbeddingVector>(&blob) {
                Ok(embedding) => embedding,
                Err(e) => {
                    warn!("Skipping cached embedding for {}: {}", url, e);
                    continue;
                }
            };
            let at = match decode_ts("computed_at", &computed_at) {
                Ok(at) => at,
                Err(e) => {
                    warn!("Skipping cached embedding for {}: {}", url, e);
                    continue;
                }
            };
            embeddings.insert(url, CacheEntry::with_time(embedding, at));
        }
        Ok(embeddings)
    }

    fn load_clusters(
        conn: &Connection,
    ) -> StoreResult<HashMap<String, CacheEntry<ClusterAssignment>>> {
        let mut stmt =
            conn.prepare("SELECT url, cluster_id, cluster_size, computed_at FROM article_clusters")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut clusters = HashMap::new();
        for (url, cluster_id, cluster_size, computed_at) in readable_rows("article_clusters", rows) {
            match decode_ts("computed_at", &computed_at) {
                Ok(at) => {
                    let assignment = ClusterAssignment {
                        cluster_id,
                        cluster_size: cluster_size.max(0) as usize,
                    };
                    clusters.insert(url, CacheEntry::with_time(assignment, at));
                }
                Err(e) => warn!("Skipping cluster assignment for {}: {}", url, e),
            }
        }
        Ok(clusters)
    }

    fn load_topic_assignments(conn: &Connection) -> StoreResult<HashMap<String, TopicAssignment>> {
        let mut stmt =
            conn.prepare("SELECT url, topic_id, topic_label, keywords FROM article_topics")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut assignments = HashMap::new();
        for (url, topic_id, topic_label, keywords) in readable_rows("article_topics", rows) {
            match serde_json::from_str::<Vec<String>>(&keywords) {
                Ok(keywords) => {
                    assignments.insert(
                        url,
                        TopicAssignment {
                            topic_id,
                            topic_label,
                            keywords,
                        },
                    );
                }
                Err(e) => warn!("Skipping topic assignment for {}: {}", url, e),
            }
        }
        Ok(assignments)
    }

    fn load_singleton<T: serde::de::DeserializeOwned>(
        conn: &Connection,
        table: &str,
    ) -> Option<CacheEntry<T>> {
        let sql = format!("SELECT payload, computed_at FROM {} WHERE id = 1", table);
        let (payload, computed_at): (String, String) = conn
            .query_row(&sql, [], |row| Ok((row.get(0)?, row.get(1)?)))
            .ok()?;
        match serde_json::from_str::<T>(&payload) {
            Ok(payload) => {
                let at = decode_ts("computed_at", &computed_at).ok()?;
                Some(CacheEntry::with_time(payload, at))
            }
            Err(e) => {
                warn!("Discarding unreadable {} row: {}", table, e);
                None
            }
        }
    }

    fn put_singleton<T: Serialize>(
        conn: &Connection,
        table: &str,
        payload: &T,
        computed_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let sql = format!(
            "INSERT INTO {} (id, payload, computed_at) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET
                payload = excluded.payload,
                computed_at = excluded.computed_at",
            table
        );
        conn.execute(&sql, params![serde_json::to_string(payload)?, encode_ts(computed_at)])?;
        Ok(())
    }

    /// Merge embeddings by url
    #[instrument(skip_all, fields(count = embeddings.len()))]
    pub fn put_embeddings(
        &self,
        embeddings: HashMap<String, EmbeddingVector>,
    ) -> StoreResult<DateTime<Utc>> {
        let computed_at = Utc::now();
        {
            let mut conn = self.db.lock();
            let tx = conn.transaction()?;
            for (url, embedding) in &embeddings {
                tx.execute(
                    "INSERT INTO article_embeddings (url, embedding, computed_at)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(url) DO UPDATE SET
                        embedding = excluded.embedding,
                        computed_at = excluded.computed_at",
                    params![url, bincode::serialize(embedding)?, encode_ts(computed_at)],
                )?;
            }
            tx.commit()?;
        }

        let mut state = self.state.write();
        for (url, embedding) in embeddings {
            state
                .embeddings
                .insert(url, CacheEntry::with_time(embedding, computed_at));
        }
        Ok(computed_at)
    }

    /// Merge cluster assignments by url
    #[instrument(skip_all, fields(count = assignments.len()))]
    pub fn put_clusters(
        &self,
        assignments: HashMap<String, ClusterAssignment>,
    ) -> StoreResult<DateTime<Utc>> {
        let computed_at = Utc::now();
        {
            let mut conn = self.db.lock();
            let tx = conn.transaction()?;
            for (url, assignment) in &assignments {
                tx.execute(
                    "INSERT INTO article_clusters (url, cluster_id, cluster_size, computed_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(url) DO UPDATE SET
                        cluster_id = excluded.cluster_id,
                        cluster_size = excluded.cluster_size,
                        computed_at = excluded.computed_at",
                    params![
                        url,
                        assignment.cluster_id,
                        assignment.cluster_size as i64,
                        encode_ts(computed_at)
                    ],
                )?;
            }
            tx.commit()?;
        }

        let mut state = self.state.write();
        for (url, assignment) in assignments {
            state
                .clusters
                .insert(url, CacheEntry::with_time(assignment, computed_at));
        }
        Ok(computed_at)
    }

    /// Replace the topic summary and every per-url topic assignment
    #[instrument(skip_all, fields(topics = summary.topics.len()))]
    pub fn put_topics(
        &self,
        summary: TopicSummary,
        assignments: HashMap<String, TopicAssignment>,
    ) -> StoreResult<DateTime<Utc>> {
        let computed_at = Utc::now();
        {
            let mut conn = self.db.lock();
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM article_topics", [])?;
            for (url, assignment) in &assignments {
                tx.execute(
                    "INSERT INTO article_topics (url, topic_id, topic_label, keywords, computed_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        url,
                        assignment.topic_id,
                        &assignment.topic_label,
                        serde_json::to_string(&assignment.keywords)?,
                        encode_ts(computed_at)
                    ],
                )?;
            }
            Self::put_singleton(&tx, "topics_cache", &summary, computed_at)?;
            tx.commit()?;
        }

        let mut state = self.state.write();
        state.topic_summary = Some(CacheEntry::with_time(summary, computed_at));
        state.topic_assignments = assignments;
        Ok(computed_at)
    }

    /// Replace the breaking-news assessment
    pub fn put_breaking(&self, assessment: BreakingAssessment) -> StoreResult<DateTime<Utc>> {
        let computed_at = Utc::now();
        {
            let conn = self.db.lock();
            Self::put_singleton(&conn, "breaking_news_cache", &assessment, computed_at)?;
        }
        self.state.write().breaking = Some(CacheEntry::with_time(assessment, computed_at));
        Ok(computed_at)
    }

    pub fn embedding(&self, url: &str) -> Option<CacheEntry<EmbeddingVector>> {
        self.state.read().embeddings.get(url).cloned()
    }

    /// All cached embeddings by url
    pub fn embeddings(&self) -> HashMap<String, EmbeddingVector> {
        self.state
            .read()
            .embeddings
            .iter()
            .map(|(url, entry)| (url.clone(), entry.payload.clone()))
            .collect()
    }

    pub fn embedded_urls(&self) -> HashSet<String> {
        self.state.read().embeddings.keys().cloned().collect()
    }

    /// The url → cluster map, stamped with its newest write; absent if empty
    pub fn cluster_assignments(&self) -> Option<CacheEntry<HashMap<String, ClusterAssignment>>> {
        let state = self.state.read();
        let computed_at = state.clusters.values().map(|e| e.computed_at).max()?;
        let payload = state
            .clusters
            .iter()
            .map(|(url, entry)| (url.clone(), entry.payload))
            .collect();
        Some(CacheEntry::with_time(payload, computed_at))
    }

    pub fn topics(&self) -> Option<CacheEntry<TopicSummary>> {
        self.state.read().topic_summary.clone()
    }

    pub fn topic_assignment(&self, url: &str) -> Option<TopicAssignment> {
        self.state.read().topic_assignments.get(url).cloned()
    }

    pub fn breaking(&self) -> Option<CacheEntry<BreakingAssessment>> {
        self.state.read().breaking.clone()
    }

    /// When `kind` was last written; `None` if never
    pub fn computed_at(&self, kind: CacheKind) -> Option<DateTime<Utc>> {
        let state = self.state.read();
        match kind {
            CacheKind::Embeddings => state.embeddings.values().map(|e| e.computed_at).max(),
            CacheKind::ClusterAssignment => state.clusters.values().map(|e| e.computed_at).max(),
            CacheKind::TopicSummary => state.topic_summary.as_ref().map(|e| e.computed_at),
            CacheKind::BreakingNews => state.breaking.as_ref().map(|e| e.computed_at),
        }
    }

    pub fn status(&self) -> CacheStatus {
        let embedding_count = self.state.read().embeddings.len();
        CacheStatus {
            embeddings: self.computed_at(CacheKind::Embeddings),
            embedding_count,
            cluster_assignment: self.computed_at(CacheKind::ClusterAssignment),
            topic_summary: self.computed_at(CacheKind::TopicSummary),
            breaking_news: self.computed_at(CacheKind::BreakingNews),
        }
    }

    /// Drop url-keyed entries whose url is not in `valid_urls`
    ///
    /// Returns the number of per-url entries removed. The topic summary and
    /// breaking-news assessment are never touched.
    #[instrument(skip_all, fields(valid = valid_urls.len()))]
    pub fn evict_stale(&self, valid_urls: &HashSet<String>) -> StoreResult<usize> {
        let stale: HashSet<String> = {
            let state = self.state.read();
            state
                .embeddings
                .keys()
                .chain(state.clusters.keys())
                .chain(state.topic_assignments.keys())
                .filter(|url| !valid_urls.contains(*url))
                .cloned()
                .collect()
        };
        if stale.is_empty() {
            return Ok(0);
        }

        {
            let mut conn = self.db.lock();
            let tx = conn.transaction()?;
            for url in &stale {
                for table in ["article_embeddings", "article_clusters", "article_topics"] {
                    tx.execute(&format!("DELETE FROM {} WHERE url = ?1", table), params![url])?;
                }
            }
            tx.commit()?;
        }

        let mut state = self.state.write();
        let before =
            state.embeddings.len() + state.clusters.len() + state.topic_assignments.len();
        state.embeddings.retain(|url, _| valid_urls.contains(url));
        state.clusters.retain(|url, _| valid_urls.contains(url));
        state.topic_assignments.retain(|url, _| valid_urls.contains(url));
        let removed =
            before - (state.embeddings.len() + state.clusters.len() + state.topic_assignments.len());

        debug!("Evicted {} cache entries for {} stale urls", removed, stale.len());
        Ok(removed)
    }
}

/// Rows that decoded; each failing row is logged and skipped
fn readable_rows<T>(
    table: &'static str,
    rows: impl Iterator<Item = rusqlite::Result<T>>,
) -> impl Iterator<Item = T> {
    rows.filter_map(move |row| match row {
        Ok(row) => Some(row),
        Err(e) => {
            warn!("Skipping unreadable {} row: {}", table, e);
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pulse_core::{ArticleRef, BreakingSignals, TopicInfo};

    fn cache() -> ResultCache {
        let cache = ResultCache::open_in_memory().unwrap();
        cache.init_schema().unwrap();
        cache
    }

    fn assessment(score: u8) -> BreakingAssessment {
        let now = Utc::now();
        BreakingAssessment {
            score,
            signals: BreakingSignals {
                volume: 100.0,
                novelty: 10.0,
                clustering: 50.0,
            },
            recent_count: 4,
            baseline_count: 10,
            representative: ArticleRef {
                title: "Quake hits coast".to_string(),
                url: "https://a".to_string(),
                source: "Wire".to_string(),
                published_at: now - Duration::minutes(5),
            },
            related_urls: vec!["https://a".to_string()],
            novel_entities: vec!["Coast".to_string()],
            is_breaking: score >= 60,
            detected_at: now,
        }
    }

    fn summary(label: &str) -> TopicSummary {
        TopicSummary {
            topics: vec![TopicInfo {
                topic_id: 0,
                label: label.to_string(),
                keywords: vec![label.to_lowercase()],
                article_count: 3,
                sample_articles: Vec::new(),
            }],
            total_articles: 20,
            uncategorized_count: 17,
        }
    }

    fn urls(list: &[&str]) -> HashSet<String> {
        list.iter().map(|u| u.to_string()).collect()
    }

    #[test]
    fn test_absent_before_first_put() {
        let cache = cache();
        for kind in CacheKind::ALL {
            assert!(cache.computed_at(kind).is_none(), "{}", kind.as_str());
        }
        assert!(cache.breaking().is_none());
        assert!(cache.topics().is_none());
        assert!(cache.cluster_assignments().is_none());
        assert!(cache.embeddings().is_empty());
    }

    #[test]
    fn test_put_then_get_returns_last_write() {
        let cache = cache();
        let before = Utc::now();

        cache.put_breaking(assessment(40)).unwrap();
        cache.put_breaking(assessment(75)).unwrap();

        let entry = cache.breaking().unwrap();
        assert_eq!(entry.payload.score, 75);
        assert!(entry.computed_at >= before);

        cache.put_topics(summary("Budget"), HashMap::new()).unwrap();
        assert_eq!(cache.topics().unwrap().payload.topics[0].label, "Budget");
    }

    #[test]
    fn test_embeddings_merge_per_url() {
        let cache = cache();
        cache
            .put_embeddings(HashMap::from([
                ("https://a".to_string(), vec![1.0, 0.0]),
                ("https://b".to_string(), vec![0.0, 1.0]),
            ]))
            .unwrap();
        cache
            .put_embeddings(HashMap::from([("https://b".to_string(), vec![0.5, 0.5])]))
            .unwrap();

        let all = cache.embeddings();
        assert_eq!(all.len(), 2);
        assert_eq!(all["https://a"], vec![1.0, 0.0]);
        assert_eq!(all["https://b"], vec![0.5, 0.5]);
    }

    #[test]
    fn test_topics_replace_assignments_wholesale() {
        let cache = cache();
        let assignment = |label: &str| TopicAssignment {
            topic_id: 0,
            topic_label: label.to_string(),
            keywords: vec![label.to_lowercase()],
        };
        cache
            .put_topics(summary("Old"), HashMap::from([("https://a".to_string(), assignment("Old"))]))
            .unwrap();
        cache
            .put_topics(summary("New"), HashMap::from([("https://b".to_string(), assignment("New"))]))
            .unwrap();

        assert!(cache.topic_assignment("https://a").is_none());
        assert_eq!(cache.topic_assignment("https://b").unwrap().topic_label, "New");
    }

    #[test]
    fn test_evict_stale_only_touches_url_keyed_entries() {
        let cache = cache();
        cache
            .put_embeddings(HashMap::from([
                ("https://keep".to_string(), vec![1.0]),
                ("https://gone".to_string(), vec![1.0]),
            ]))
            .unwrap();
        cache
            .put_clusters(HashMap::from([(
                "https://gone".to_string(),
                ClusterAssignment {
                    cluster_id: 0,
                    cluster_size: 2,
                },
            )]))
            .unwrap();
        cache.put_breaking(assessment(80)).unwrap();
        cache.put_topics(summary("Budget"), HashMap::new()).unwrap();

        let removed = cache.evict_stale(&urls(&["https://keep"])).unwrap();

        assert_eq!(removed, 2);
        assert!(cache.embedding("https://keep").is_some());
        assert!(cache.embedding("https://gone").is_none());
        assert!(cache.cluster_assignments().is_none());
        assert!(cache.breaking().is_some());
        assert!(cache.topics().is_some());

        assert_eq!(cache.evict_stale(&urls(&["https://keep"])).unwrap(), 0);
    }

    #[test]
    fn test_reload_restores_persisted_entries() {
        let cache = cache();
        cache
            .put_embeddings(HashMap::from([("https://a".to_string(), vec![0.25, -0.5])]))
            .unwrap();
        cache.put_breaking(assessment(90)).unwrap();
        cache
            .put_topics(
                summary("Budget"),
                HashMap::from([(
                    "https://a".to_string(),
                    TopicAssignment {
                        topic_id: 0,
                        topic_label: "Budget".to_string(),
                        keywords: vec!["budget".to_string()],
                    },
                )]),
            )
            .unwrap();
        let breaking_at = cache.computed_at(CacheKind::BreakingNews).unwrap();

        // Simulate a restart over the same connection
        *cache.state.write() = CacheState::default();
        assert!(cache.breaking().is_none());
        cache.init_schema().unwrap();

        assert_eq!(cache.embedding("https://a").unwrap().payload, vec![0.25, -0.5]);
        let breaking = cache.breaking().unwrap();
        assert_eq!(breaking.payload.score, 90);
        assert_eq!(encode_ts(breaking.computed_at), encode_ts(breaking_at));
        assert_eq!(cache.topics().unwrap().payload.uncategorized_count, 17);
        assert_eq!(cache.topic_assignment("https://a").unwrap().keywords, vec!["budget".to_string()]);
    }

    #[test]
    fn test_reload_skips_unreadable_rows() {
        let cache = cache();
        cache
            .put_clusters(HashMap::from([(
                "https://good".to_string(),
                ClusterAssignment {
                    cluster_id: 2,
                    cluster_size: 4,
                },
            )]))
            .unwrap();
        {
            let conn = cache.db.lock();
            conn.execute(
                "INSERT INTO article_clusters (url, cluster_id, cluster_size, computed_at)
                 VALUES ('https://bad-type', 'abc', 1, '2026-01-01T00:00:00Z')",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO article_clusters (url, cluster_id, cluster_size, computed_at)
                 VALUES ('https://bad-time', 1, 1, 'yesterday')",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO article_topics (url, topic_id, topic_label, keywords, computed_at)
                 VALUES ('https://bad-json', 0, 'Budget', 'not json', '2026-01-01T00:00:00Z')",
                [],
            )
            .unwrap();
        }

        *cache.state.write() = CacheState::default();
        cache.init_schema().unwrap();

        let clusters = cache.cluster_assignments().unwrap().payload;
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters["https://good"].cluster_id, 2);
        assert!(cache.topic_assignment("https://bad-json").is_none());
    }
}
