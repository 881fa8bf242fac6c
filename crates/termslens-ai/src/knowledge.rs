//! The legal knowledge base: a small, immutable list of clause records.
//!
//! Loading is lazy and single-flight. The first caller reads and parses
//! the resource; callers that arrive while that read is in flight await
//! the same load, and every later call is a cache hit. A failed load is
//! logged and reported as an empty collection, and is retried on the
//! next call.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use termslens_core::ClauseRecord;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("cannot read knowledge base {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed knowledge base: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate clause id {0:?}")]
    DuplicateId(String),
}

/// Where the clause records come from.
#[derive(Debug, Clone)]
pub enum KnowledgeSource {
    /// A JSON file on disk (normally `law_kb.json`).
    File(PathBuf),
    /// JSON text already in memory.
    Inline(String),
}

impl fmt::Display for KnowledgeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Inline(raw) => write!(f, "<inline, {} bytes>", raw.len()),
        }
    }
}

static GLOBAL: OnceLock<KnowledgeStore> = OnceLock::new();

/// Lazily loaded, memoised clause collection.
pub struct KnowledgeStore {
    source: KnowledgeSource,
    clauses: OnceCell<Arc<[ClauseRecord]>>,
    attempts: AtomicUsize,
}

impl KnowledgeStore {
    pub fn new(source: KnowledgeSource) -> Self {
        Self {
            source,
            clauses: OnceCell::new(),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::new(KnowledgeSource::File(path.into()))
    }

    pub fn from_json(raw: impl Into<String>) -> Self {
        Self::new(KnowledgeSource::Inline(raw.into()))
    }

    /// Install `self` as the process-wide store and return it.
    ///
    /// Only the first installation takes effect; later calls get the
    /// existing store back and their argument is dropped.
    pub fn install_global(self) -> &'static KnowledgeStore {
        let mut installed = false;
        let store = GLOBAL.get_or_init(|| {
            installed = true;
            self
        });
        if !installed {
            warn!(source = %store.source, "global knowledge store already installed");
        }
        store
    }

    /// The process-wide store, if one has been installed.
    pub fn global() -> Option<&'static KnowledgeStore> {
        GLOBAL.get()
    }

    pub fn source(&self) -> &KnowledgeSource {
        &self.source
    }

    /// True once a load has succeeded.
    pub fn is_loaded(&self) -> bool {
        self.clauses.initialized()
    }

    /// Number of times the resource has actually been read.
    pub fn load_attempts(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Load the collection, or an empty one if the resource is unusable.
    pub async fn load(&self) -> Arc<[ClauseRecord]> {
        match self.try_load().await {
            Ok(clauses) => clauses,
            Err(e) => {
                error!(source = %self.source, error = %e, "failed to load knowledge base");
                Arc::from(Vec::new())
            }
        }
    }

    /// Load the collection, surfacing the failure instead of degrading.
    pub async fn try_load(&self) -> Result<Arc<[ClauseRecord]>, KnowledgeError> {
        self.clauses
            .get_or_try_init(|| self.read_source())
            .await
            .cloned()
    }

    async fn read_source(&self) -> Result<Arc<[ClauseRecord]>, KnowledgeError> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        let clauses = match &self.source {
            KnowledgeSource::File(path) => {
                let raw = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| KnowledgeError::Io {
                        path: path.clone(),
                        source,
                    })?;
                parse_clauses(&raw)?
            }
            KnowledgeSource::Inline(raw) => parse_clauses(raw)?,
        };
        info!(source = %self.source, count = clauses.len(), "loaded legal knowledge base");
        Ok(clauses.into())
    }
}

/// Parse a JSON array of clause records, rejecting duplicate ids.
pub fn parse_clauses(raw: &str) -> Result<Vec<ClauseRecord>, KnowledgeError> {
    let clauses: Vec<ClauseRecord> = serde_json::from_str(raw)?;
    let mut seen = HashSet::with_capacity(clauses.len());
    for clause in &clauses {
        if !seen.insert(clause.id.as_str()) {
            return Err(KnowledgeError::DuplicateId(clause.id.clone()));
        }
    }
    Ok(clauses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const KB: &str = r#"[
        {"id":"P1","title":"개인정보 수집 동의","snippet":"개인정보를 수집할 때 동의","category":"privacy","law":"개인정보 보호법","article":"제15조"},
        {"id":"M1","title":"광고성 정보 전송","snippet":"광고 수신 동의","category":"marketing","law":"정보통신망법","article":"제50조","weight":1.2}
    ]"#;

    #[test]
    fn parses_records_in_order() {
        let clauses = parse_clauses(KB).unwrap();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].id, "P1");
        assert_eq!(clauses[1].weight, 1.2);
    }

    #[test]
    fn duplicate_ids_rejected() {
        let raw = r#"[
            {"id":"P1","title":"","snippet":"","category":"privacy","law":"","article":""},
            {"id":"P1","title":"","snippet":"","category":"terms","law":"","article":""}
        ]"#;
        assert!(matches!(parse_clauses(raw), Err(KnowledgeError::DuplicateId(id)) if id == "P1"));
    }

    #[tokio::test]
    async fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(KB.as_bytes()).unwrap();

        let store = KnowledgeStore::from_path(file.path());
        assert!(!store.is_loaded());
        let clauses = store.load().await;
        assert_eq!(clauses.len(), 2);
        assert!(store.is_loaded());
    }

    #[tokio::test]
    async fn missing_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = KnowledgeStore::from_path(dir.path().join("law_kb.json"));
        assert!(store.load().await.is_empty());
        assert!(!store.is_loaded());
        assert!(matches!(
            store.try_load().await,
            Err(KnowledgeError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn malformed_json_degrades_to_empty() {
        let store = KnowledgeStore::from_json("[{\"id\": ");
        assert!(store.load().await.is_empty());
        assert!(!store.is_loaded());
    }

    #[tokio::test]
    async fn empty_array_is_a_successful_load() {
        let store = KnowledgeStore::from_json("[]");
        assert!(store.load().await.is_empty());
        assert!(store.is_loaded());
    }

    #[tokio::test]
    async fn load_is_memoised() {
        let store = KnowledgeStore::from_json(KB);
        let first = store.load().await;
        let second = store.load().await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.load_attempts(), 1);
    }

    #[tokio::test]
    async fn failed_load_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("law_kb.json");
        let store = KnowledgeStore::from_path(&path);

        assert!(store.load().await.is_empty());
        std::fs::write(&path, KB).unwrap();
        assert_eq!(store.load().await.len(), 2);
        assert_eq!(store.load_attempts(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_access_shares_one_load() {
        let store = Arc::new(KnowledgeStore::from_json(KB));
        let loads = (0..16).map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.load().await })
        });
        let results: Vec<_> = futures::future::join_all(loads)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(store.load_attempts(), 1);
        for r in &results {
            assert!(Arc::ptr_eq(r, &results[0]));
        }
    }

    #[test]
    fn global_store_installs_once() {
        let first = KnowledgeStore::from_json("[]").install_global();
        let second = KnowledgeStore::from_json(KB).install_global();
        assert!(std::ptr::eq(first, second));
        assert!(std::ptr::eq(KnowledgeStore::global().unwrap(), first));
        assert!(matches!(first.source(), KnowledgeSource::Inline(raw) if raw == "[]"));
    }
}
