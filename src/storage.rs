use crate::config::atomic_rename;
use crate::pantry::Item;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub(crate) const SAVE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub(crate) enum StorageError {
    #[error("could not access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed save file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct PantrySave {
    pub(crate) version: u32,
    pub(crate) saved_at: DateTime<Utc>,
    pub(crate) money: u64,
    #[serde(default)]
    pub(crate) items: BTreeMap<Item, u32>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct ConsentFile {
    enabled: bool,
}

/// On-disk home of the pantry and the save-consent preference.
#[derive(Clone, Debug)]
pub(crate) struct SaveStore {
    pantry_path: PathBuf,
    consent_path: PathBuf,
}

impl SaveStore {
    pub(crate) fn new(pantry_path: PathBuf, consent_path: PathBuf) -> Self {
        Self {
            pantry_path,
            consent_path,
        }
    }

    /// Missing file means no consent was ever given.
    pub(crate) fn read_consent(&self) -> Result<bool, StorageError> {
        Ok(read_json::<ConsentFile>(&self.consent_path)?.is_some_and(|c| c.enabled))
    }

    pub(crate) fn write_consent(&self, enabled: bool) -> Result<(), StorageError> {
        write_json_atomic(&self.consent_path, &ConsentFile { enabled })
    }

    pub(crate) fn load_pantry(&self) -> Result<Option<PantrySave>, StorageError> {
        read_json(&self.pantry_path)
    }

    pub(crate) fn save_pantry(&self, save: &PantrySave) -> Result<(), StorageError> {
        write_json_atomic(&self.pantry_path, save)
    }

    pub(crate) fn clear(&self) -> Result<(), StorageError> {
        remove_if_present(&self.pantry_path)?;
        remove_if_present(&self.consent_path)
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>, StorageError> {
    let s = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StorageError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&s)
        .map(Some)
        .map_err(|source| StorageError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let io_err = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(value).map_err(|source| StorageError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(&tmp, data).map_err(io_err)?;
    atomic_rename(&tmp, path).map_err(io_err)
}

fn remove_if_present(path: &Path) -> Result<(), StorageError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(StorageError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
