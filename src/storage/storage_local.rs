//! File-backed local store
//!
//! One file per key under a base directory. File names are the hex SHA-256
//! of the key, so any valid key maps to a short, safe name; the key itself
//! is stored inside the file next to the value. Writes go to a temporary
//! file first and are persisted into place with a rename.

use crate::error::{StorageError, StorageResult};
use crate::storage::local_store::LocalStore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const ITEM_EXTENSION: &str = "item";

/// File store configuration
#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    /// Directory holding one file per key
    pub base_path: PathBuf,
    /// Create the directory if it doesn't exist
    pub create_dirs: bool,
    /// File permissions (Unix only)
    pub file_permissions: Option<u32>,
    /// Directory permissions (Unix only)
    pub dir_permissions: Option<u32>,
    /// Maximum size of a single value in bytes
    pub max_value_size: usize,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("./local_storage"),
            create_dirs: true,
            file_permissions: Some(0o600),
            dir_permissions: Some(0o700),
            max_value_size: 5 * 1024 * 1024, // 5MB
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ItemRecord {
    key: String,
    value: String,
}

/// Local store persisted on the filesystem
#[derive(Debug)]
pub struct FileLocalStore {
    config: FileStoreConfig,
}

fn io_failure(operation: &str, e: std::io::Error) -> StorageError {
    StorageError::OperationFailed {
        operation: operation.to_string(),
        reason: e.to_string(),
    }
}

impl FileLocalStore {
    /// Open (and optionally create) the store directory
    pub fn new(config: FileStoreConfig) -> StorageResult<Self> {
        if config.create_dirs && !config.base_path.exists() {
            fs::create_dir_all(&config.base_path)
                .map_err(|e| io_failure("create_base_directory", e))?;

            #[cfg(unix)]
            if let Some(perms) = config.dir_permissions {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&config.base_path, fs::Permissions::from_mode(perms))
                    .map_err(|e| io_failure("set_directory_permissions", e))?;
            }
        }

        if !config.base_path.is_dir() {
            return Err(StorageError::Unavailable {
                backend: "file".to_string(),
                reason: format!("{} is not a directory", config.base_path.display()),
            });
        }

        Ok(Self { config })
    }

    /// Open a store rooted at `base_path` with default settings
    pub fn open(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        Self::new(FileStoreConfig {
            base_path: base_path.into(),
            ..Default::default()
        })
    }

    fn item_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.config
            .base_path
            .join(format!("{}.{}", hex::encode(digest), ITEM_EXTENSION))
    }

    fn read_record(path: &Path) -> StorageResult<Option<ItemRecord>> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_failure("read_item", e)),
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| StorageError::OperationFailed {
                operation: "decode_item".to_string(),
                reason: e.to_string(),
            })
    }

    fn item_paths(&self) -> StorageResult<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.config.base_path).map_err(|e| StorageError::Unavailable {
            backend: "file".to_string(),
            reason: e.to_string(),
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| io_failure("read_directory_entry", e))?.path();
            if path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some(ITEM_EXTENSION) {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

impl LocalStore for FileLocalStore {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(Self::read_record(&self.item_path(key))?
            .filter(|record| record.key == key)
            .map(|record| record.value))
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        if value.len() > self.config.max_value_size {
            return Err(StorageError::QuotaExceeded);
        }

        let record = ItemRecord {
            key: key.to_string(),
            value: value.to_string(),
        };

        // dropped (and deleted) on every early return below
        let temp = NamedTempFile::new_in(&self.config.base_path)
            .map_err(|e| io_failure("create_temp_file", e))?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer(&mut writer, &record).map_err(|e| StorageError::OperationFailed {
                operation: "write_temp_file".to_string(),
                reason: e.to_string(),
            })?;
            writer.flush().map_err(|e| io_failure("flush_temp_file", e))?;
        }

        #[cfg(unix)]
        if let Some(perms) = self.config.file_permissions {
            use std::os::unix::fs::PermissionsExt;
            temp.as_file()
                .set_permissions(fs::Permissions::from_mode(perms))
                .map_err(|e| io_failure("set_file_permissions", e))?;
        }

        temp.persist(self.item_path(key))
            .map(|_| ())
            .map_err(|e| io_failure("atomic_rename", e.error))
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        match fs::remove_file(self.item_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_failure("remove_item", e)),
        }
    }

    fn clear(&self) -> StorageResult<()> {
        for path in self.item_paths()? {
            fs::remove_file(&path).map_err(|e| io_failure("clear", e))?;
        }
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        for path in self.item_paths()? {
            if let Some(record) = Self::read_record(&path)? {
                keys.push(record.key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}
