//! Trace file reader
//!
//! Traces are `<storage_id>.json` files written by other tools into one
//! directory. Finished traces never change again, so their summaries and parsed
//! trees are cached; open traces are re-read on every request.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use trace_model::{TraceError, TraceNode, TraceSummary};

#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("Trace directory does not exist: {0}")]
    MissingDir(String),
    #[error("Trace not found: {0}")]
    NotFound(String),
    #[error("Invalid storage id: {0}")]
    InvalidId(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Trace {storage_id} is unreadable: {source}")]
    Parse {
        storage_id: String,
        #[source]
        source: TraceError,
    },
}

/// Source of trace listings and trace trees
pub trait TraceReader: Send + Sync {
    fn list_summaries(&self) -> Result<Vec<TraceSummary>, ReaderError>;

    fn read_trace(&self, storage_id: &str) -> Result<Arc<TraceNode>, ReaderError>;
}

/// Storage ids are bare file stems
pub fn validate_storage_id(storage_id: &str) -> Result<(), ReaderError> {
    let invalid = storage_id.is_empty()
        || storage_id.contains(['/', '\\', '\0'])
        || storage_id.contains("..");
    if invalid {
        return Err(ReaderError::InvalidId(storage_id.to_string()));
    }
    Ok(())
}

#[derive(Debug)]
pub struct DirReader {
    dir: PathBuf,
    summaries: Mutex<HashMap<String, TraceSummary>>,
    trees: Mutex<HashMap<String, Arc<TraceNode>>>,
}

impl DirReader {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ReaderError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(ReaderError::MissingDir(dir.display().to_string()));
        }
        Ok(Self {
            dir,
            summaries: Mutex::new(HashMap::new()),
            trees: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn trace_path(&self, storage_id: &str) -> PathBuf {
        self.dir.join(format!("{storage_id}.json"))
    }

    fn load(&self, storage_id: &str) -> Result<Arc<TraceNode>, ReaderError> {
        let raw = match std::fs::read(self.trace_path(storage_id)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ReaderError::NotFound(storage_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let node = TraceNode::from_slice(&raw).map_err(|source| ReaderError::Parse {
            storage_id: storage_id.to_string(),
            source,
        })?;
        let node = Arc::new(node);

        if !node.is_open() {
            tracing::debug!(storage_id, "caching finished trace");
            self.trees
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(storage_id.to_string(), Arc::clone(&node));
            self.summaries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(
                    storage_id.to_string(),
                    TraceSummary::from_node(storage_id, &node),
                );
        }
        Ok(node)
    }

    fn summary(&self, storage_id: &str) -> Result<TraceSummary, ReaderError> {
        let cached = self
            .summaries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(storage_id)
            .cloned();
        match cached {
            Some(summary) => Ok(summary),
            None => {
                let node = self.load(storage_id)?;
                Ok(TraceSummary::from_node(storage_id, &node))
            }
        }
    }
}

impl TraceReader for DirReader {
    fn list_summaries(&self) -> Result<Vec<TraceSummary>, ReaderError> {
        let mut summaries = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(storage_id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if validate_storage_id(storage_id).is_err() {
                continue;
            }
            match self.summary(storage_id) {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    tracing::warn!(storage_id, error = %e, "skipping unreadable trace file");
                }
            }
        }
        tracing::debug!(count = summaries.len(), "listed traces");
        Ok(summaries)
    }

    fn read_trace(&self, storage_id: &str) -> Result<Arc<TraceNode>, ReaderError> {
        validate_storage_id(storage_id)?;
        let cached = self
            .trees
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(storage_id)
            .cloned();
        match cached {
            Some(node) => Ok(node),
            None => self.load(storage_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write(dir: &Path, storage_id: &str, value: serde_json::Value) {
        std::fs::write(dir.join(format!("{storage_id}.json")), value.to_string()).unwrap();
    }

    #[test]
    fn test_missing_directory() {
        let err = DirReader::new("/definitely/not/here").unwrap_err();
        assert!(matches!(err, ReaderError::MissingDir(_)));
    }

    #[test]
    fn test_storage_id_validation() {
        assert!(validate_storage_id("trace-abc").is_ok());
        for bad in ["", "../etc/passwd", "a/b", "a\\b", ".."] {
            assert!(validate_storage_id(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn test_list_ignores_other_files() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "trace-1", json!({"uid": "1", "name": "first"}));
        std::fs::write(tmp.path().join("notes.txt"), "hello").unwrap();
        std::fs::write(tmp.path().join("broken.json"), "{not json").unwrap();

        let reader = DirReader::new(tmp.path()).unwrap();
        let summaries = reader.list_summaries().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].storage_id, "trace-1");
        assert_eq!(summaries[0].name, "first");
    }

    #[test]
    fn test_finished_summaries_are_cached() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "done", json!({"uid": "d", "name": "before"}));
        write(
            tmp.path(),
            "live",
            json!({"uid": "l", "name": "before", "state": "open"}),
        );
        let reader = DirReader::new(tmp.path()).unwrap();
        reader.list_summaries().unwrap();

        write(tmp.path(), "done", json!({"uid": "d", "name": "after"}));
        write(
            tmp.path(),
            "live",
            json!({"uid": "l", "name": "after", "state": "open"}),
        );
        let mut summaries = reader.list_summaries().unwrap();
        summaries.sort_by(|a, b| a.storage_id.cmp(&b.storage_id));
        assert_eq!(summaries[0].name, "before");
        assert_eq!(summaries[1].name, "after");
    }

    #[test]
    fn test_read_trace_caches_finished_trees() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "done", json!({"uid": "d", "name": "n"}));
        write(tmp.path(), "live", json!({"uid": "l", "name": "n", "state": "open"}));
        let reader = DirReader::new(tmp.path()).unwrap();

        let first = reader.read_trace("done").unwrap();
        let second = reader.read_trace("done").unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let first = reader.read_trace("live").unwrap();
        let second = reader.read_trace("live").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_read_trace_errors() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("broken.json"), "[]").unwrap();
        let reader = DirReader::new(tmp.path()).unwrap();

        assert!(matches!(reader.read_trace("nope"), Err(ReaderError::NotFound(_))));
        assert!(matches!(reader.read_trace("../x"), Err(ReaderError::InvalidId(_))));
        assert!(matches!(reader.read_trace("broken"), Err(ReaderError::Parse { .. })));
    }
}
