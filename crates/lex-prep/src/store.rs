//! Dataset storage.
//!
//! A [`DatasetStore`] maps an opaque handle to a dataset snapshot. The
//! engine only reads and writes whole snapshots through it; deciding whether
//! a cleaned snapshot replaces or sits next to the original is up to the
//! caller.
//!
//! Two stores are provided:
//! - [`MemoryDatasetStore`]: snapshots kept in process, behind a `RwLock`
//! - [`FileDatasetStore`]: one CSV file per handle under a root directory

use chrono::{DateTime, Local};
use parking_lot::RwLock;
use polars::prelude::*;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use crate::error::{EngineError, Result, ResultExt};

/// Cell texts read as missing, alongside empty fields.
pub const NULL_MARKERS: &[&str] = &["NA", "N/A", "NULL", "null", "NaN", "nan"];

/// Storage collaborator for dataset snapshots.
pub trait DatasetStore: Send + Sync {
    /// Snapshot stored under `handle`.
    fn load(&self, handle: &str) -> Result<DataFrame>;

    /// Store a snapshot under a freshly generated handle.
    fn save(&self, df: &DataFrame) -> Result<String> {
        let handle = generate_handle();
        self.save_as(&handle, df)?;
        Ok(handle)
    }

    /// Store a snapshot under `handle`, replacing any previous one.
    fn save_as(&self, handle: &str, df: &DataFrame) -> Result<()>;

    fn contains(&self, handle: &str) -> bool;

    fn remove(&self, handle: &str) -> Result<()>;

    /// All stored handles, sorted.
    fn handles(&self) -> Vec<String>;

    /// When the snapshot under `handle` was last saved.
    fn saved_at(&self, handle: &str) -> Result<DateTime<Local>>;
}

static HANDLE_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn generate_handle() -> String {
    let n = HANDLE_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("dataset_{}_{}.csv", Local::now().format("%Y%m%d_%H%M%S"), n)
}

/// Handles double as file names, so they must be a single path component.
pub fn validate_handle(handle: &str) -> Result<()> {
    let trimmed = handle.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || handle.contains(['/', '\\'])
        || handle.contains('\0')
    {
        return Err(EngineError::InvalidHandle(handle.to_string()));
    }
    Ok(())
}

// ============================================================================
// CSV
// ============================================================================

/// Read a CSV file with a header row.
///
/// Column types are inferred from the first 100 rows. Empty fields and the
/// [`NULL_MARKERS`] are read as missing.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(EngineError::DatasetNotFound(path.display().to_string()));
    }

    let null_values = NullValues::AllColumns(NULL_MARKERS.iter().map(|m| (*m).into()).collect());

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .with_parse_options(
            CsvParseOptions::default()
                .with_quote_char(Some(b'"'))
                .with_null_values(Some(null_values)),
        )
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
        .context(format!("Failed to read {}", path.display()))?;

    debug!("Read {} rows x {} columns from {}", df.height(), df.width(), path.display());
    Ok(df)
}

/// Write a dataset as CSV with a header row. Missing cells are left empty.
pub fn write_csv(df: &DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    let mut df = df.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(&mut df)
        .context(format!("Failed to write {}", path.display()))?;

    debug!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

// ============================================================================
// In-memory store
// ============================================================================

struct StoredDataset {
    df: DataFrame,
    saved_at: DateTime<Local>,
}

/// Keeps snapshots in process.
#[derive(Default)]
pub struct MemoryDatasetStore {
    datasets: RwLock<HashMap<String, StoredDataset>>,
}

impl MemoryDatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.datasets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.read().is_empty()
    }
}

impl DatasetStore for MemoryDatasetStore {
    fn load(&self, handle: &str) -> Result<DataFrame> {
        self.datasets
            .read()
            .get(handle)
            .map(|stored| stored.df.clone())
            .ok_or_else(|| EngineError::DatasetNotFound(handle.to_string()))
    }

    fn save_as(&self, handle: &str, df: &DataFrame) -> Result<()> {
        validate_handle(handle)?;
        self.datasets.write().insert(
            handle.to_string(),
            StoredDataset {
                df: df.clone(),
                saved_at: Local::now(),
            },
        );
        Ok(())
    }

    fn contains(&self, handle: &str) -> bool {
        self.datasets.read().contains_key(handle)
    }

    fn remove(&self, handle: &str) -> Result<()> {
        self.datasets
            .write()
            .remove(handle)
            .map(|_| ())
            .ok_or_else(|| EngineError::DatasetNotFound(handle.to_string()))
    }

    fn handles(&self) -> Vec<String> {
        let mut handles: Vec<String> = self.datasets.read().keys().cloned().collect();
        handles.sort();
        handles
    }

    fn saved_at(&self, handle: &str) -> Result<DateTime<Local>> {
        self.datasets
            .read()
            .get(handle)
            .map(|stored| stored.saved_at)
            .ok_or_else(|| EngineError::DatasetNotFound(handle.to_string()))
    }
}

// ============================================================================
// File store
// ============================================================================

/// One CSV file per handle under a root directory.
#[derive(Debug, Clone)]
pub struct FileDatasetStore {
    root: PathBuf,
}

impl FileDatasetStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(EngineError::from)
            .context(format!("Failed to create store at {}", root.display()))?;
        Ok(Self { root })
    }

    fn path_for(&self, handle: &str) -> Result<PathBuf> {
        validate_handle(handle)?;
        Ok(self.root.join(handle))
    }
}

impl DatasetStore for FileDatasetStore {
    fn load(&self, handle: &str) -> Result<DataFrame> {
        let path = self.path_for(handle)?;
        if !path.is_file() {
            return Err(EngineError::DatasetNotFound(handle.to_string()));
        }
        read_csv(&path)
    }

    fn save_as(&self, handle: &str, df: &DataFrame) -> Result<()> {
        let path = self.path_for(handle)?;
        write_csv(df, &path)
    }

    fn contains(&self, handle: &str) -> bool {
        self.path_for(handle).map(|p| p.is_file()).unwrap_or(false)
    }

    fn remove(&self, handle: &str) -> Result<()> {
        let path = self.path_for(handle)?;
        if !path.is_file() {
            return Err(EngineError::DatasetNotFound(handle.to_string()));
        }
        std::fs::remove_file(path)?;
        Ok(())
    }

    fn handles(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut handles: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        handles.sort();
        handles
    }

    fn saved_at(&self, handle: &str) -> Result<DateTime<Local>> {
        let path = self.path_for(handle)?;
        if !path.is_file() {
            return Err(EngineError::DatasetNotFound(handle.to_string()));
        }
        let modified = std::fs::metadata(path)?.modified()?;
        Ok(DateTime::<Local>::from(modified))
    }
}

static_assertions::assert_impl_all!(MemoryDatasetStore: Send, Sync);
static_assertions::assert_impl_all!(FileDatasetStore: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> DataFrame {
        df![
            "age" => [Some(25i64), None, Some(35)],
            "city" => [Some("Oslo"), Some("Lima"), None],
        ]
        .unwrap()
    }

    #[test]
    fn test_validate_handle() {
        assert!(validate_handle("data.csv").is_ok());
        assert!(validate_handle("cleaned_data.csv").is_ok());
        for bad in ["", "  ", ".", "..", "../x.csv", "a/b.csv", "a\\b.csv"] {
            assert!(
                matches!(validate_handle(bad), Err(EngineError::InvalidHandle(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryDatasetStore::new();
        store.save_as("data.csv", &sample()).unwrap();

        assert!(store.contains("data.csv"));
        assert_eq!(store.len(), 1);
        let loaded = store.load("data.csv").unwrap();
        assert!(loaded.equals_missing(&sample()));
        assert!(store.saved_at("data.csv").unwrap() <= Local::now());
    }

    #[test]
    fn test_memory_store_generated_handles_are_unique() {
        let store = MemoryDatasetStore::new();
        let a = store.save(&sample()).unwrap();
        let b = store.save(&sample()).unwrap();

        assert_ne!(a, b);
        assert_eq!(store.handles().len(), 2);
    }

    #[test]
    fn test_memory_store_missing_handle() {
        let store = MemoryDatasetStore::new();
        assert!(matches!(store.load("nope"), Err(EngineError::DatasetNotFound(_))));
        assert!(matches!(store.remove("nope"), Err(EngineError::DatasetNotFound(_))));
    }

    #[test]
    fn test_memory_store_returns_independent_copy() {
        let store = MemoryDatasetStore::new();
        store.save_as("d.csv", &sample()).unwrap();

        let mut loaded = store.load("d.csv").unwrap();
        loaded = loaded.drop("age").unwrap();
        assert_eq!(loaded.width(), 1);
        assert_eq!(store.load("d.csv").unwrap().width(), 2);
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDatasetStore::new(dir.path()).unwrap();

        store.save_as("data.csv", &sample()).unwrap();
        assert!(store.contains("data.csv"));
        assert_eq!(store.handles(), vec!["data.csv".to_string()]);

        let loaded = store.load("data.csv").unwrap();
        assert_eq!(loaded.height(), 3);
        assert_eq!(loaded.column("age").unwrap().null_count(), 1);
        assert_eq!(loaded.column("city").unwrap().null_count(), 1);
        assert!(store.saved_at("data.csv").is_ok());

        store.remove("data.csv").unwrap();
        assert!(!store.contains("data.csv"));
    }

    #[test]
    fn test_file_store_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDatasetStore::new(dir.path()).unwrap();

        assert!(matches!(
            store.save_as("../escape.csv", &sample()),
            Err(EngineError::InvalidHandle(_))
        ));
        assert!(!store.contains("../escape.csv"));
    }

    #[test]
    fn test_read_csv_null_markers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("markers.csv");
        std::fs::write(&path, "x,label\n1,a\nNA,b\n3,N/A\n,NULL\n").unwrap();

        let df = read_csv(&path).unwrap();
        assert_eq!(df.column("x").unwrap().null_count(), 2);
        assert_eq!(df.column("label").unwrap().null_count(), 2);
    }

    #[test]
    fn test_read_csv_missing_file() {
        let err = read_csv(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert_eq!(err.error_code(), "DATASET_NOT_FOUND");
    }
}
