use directories::ProjectDirs;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub const DATA_KEY: &str = "taskboard-data";
/// Last stored snapshot that failed to load.
pub const BACKUP_KEY: &str = "taskboard-data-backup";
pub const PRESETS_KEY: &str = "taskboard-filter-presets";
pub const RANDOMIZER_KEY: &str = "taskboard-randomizer-options";

const PROJECT_DIR: &str = ".taskboard";

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("io error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
    #[error("no data directory available")]
    NoDataDir,
}

/// Synchronous string key-value store holding the persisted documents.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

pub type SharedStore = Rc<dyn KeyValueStore>;

/// One file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|source| StorageError::Io { path, source })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir).map_err(|source| StorageError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(|source| StorageError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StorageError::Io { path, source })?;
        tracing::debug!(key, bytes = value.len(), "wrote storage key");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if path.exists() {
            fs::remove_file(&path).map_err(|source| StorageError::Io { path, source })?;
        }
        Ok(())
    }
}

/// In-process store; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
    writes: Rc<Cell<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `set` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataScope {
    Project,
    Global,
}

#[derive(Debug, Clone)]
pub struct DataLocation {
    pub dir: PathBuf,
    pub scope: DataScope,
}

/// Creates a project-local data directory in `cwd`.
pub fn init_project_dir(cwd: &Path) -> Result<DataLocation, StorageError> {
    let dir = cwd.join(PROJECT_DIR);
    fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
        path: dir.clone(),
        source,
    })?;
    Ok(DataLocation {
        dir,
        scope: DataScope::Project,
    })
}

/// Nearest `.taskboard` directory walking up from `start`, else the global data dir.
pub fn locate_data_dir(start: &Path) -> Result<DataLocation, StorageError> {
    if let Some(dir) = find_project_dir(start) {
        return Ok(DataLocation {
            dir,
            scope: DataScope::Project,
        });
    }
    Ok(DataLocation {
        dir: global_data_dir()?,
        scope: DataScope::Global,
    })
}

pub fn locate_from_cwd() -> Result<DataLocation, StorageError> {
    let cwd = env::current_dir().map_err(|source| StorageError::Io {
        path: PathBuf::from("."),
        source,
    })?;
    locate_data_dir(&cwd)
}

fn find_project_dir(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(PROJECT_DIR);
        if candidate.is_dir() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

fn global_data_dir() -> Result<PathBuf, StorageError> {
    let dirs = ProjectDirs::from("", "", "taskboard").ok_or(StorageError::NoDataDir)?;
    Ok(dirs.data_dir().to_path_buf())
}
