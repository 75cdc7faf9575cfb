use crate::model::TaskStore;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const STORE_FILE_NAME: &str = "tasks.yaml";

#[derive(Debug, Clone)]
pub struct StoreLocation {
    pub path: PathBuf,
}

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("task file {path:?} is unavailable (run `todostack init` to create it)")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("task file {path:?} is malformed")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("serializing task store")]
    Serialize(#[source] serde_yaml::Error),
    #[error("writing {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreLocation {
    /// `--file` when given, otherwise `tasks.yaml` in the working directory.
    pub fn resolve(file: Option<PathBuf>) -> io::Result<Self> {
        let path = match file {
            Some(path) => path,
            None => env::current_dir()?.join(STORE_FILE_NAME),
        };
        Ok(StoreLocation::at(path))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        StoreLocation { path: path.into() }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

/// Creates an empty store file unless one is already there. Returns whether a
/// file was written.
pub fn init_store(location: &StoreLocation) -> Result<bool, StorageError> {
    if location.exists() {
        return Ok(false);
    }
    save_store(location, &TaskStore::default())?;
    Ok(true)
}

#[tracing::instrument(skip_all, fields(path = %location.path.display()))]
pub fn load_store(location: &StoreLocation) -> Result<TaskStore, StorageError> {
    let data = fs::read_to_string(&location.path).map_err(|source| StorageError::Unavailable {
        path: location.path.clone(),
        source,
    })?;
    let store: Option<TaskStore> =
        serde_yaml::from_str(&data).map_err(|source| StorageError::Malformed {
            path: location.path.clone(),
            source,
        })?;
    let store = store.unwrap_or_default();
    if store.is_empty() {
        debug!("task store is empty");
    }
    info!(days = store.len(), "loaded task store");
    Ok(store)
}

#[tracing::instrument(skip_all, fields(path = %location.path.display()))]
pub fn save_store(location: &StoreLocation, store: &TaskStore) -> Result<(), StorageError> {
    if let Some(parent) = non_empty_parent(&location.path) {
        fs::create_dir_all(parent).map_err(|source| StorageError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let serialized = to_yaml(store).map_err(StorageError::Serialize)?;
    fs::write(&location.path, serialized).map_err(|source| StorageError::Write {
        path: location.path.clone(),
        source,
    })?;
    debug!(days = store.len(), "saved task store");
    Ok(())
}

/// Writes each date key as a single-quoted string so YAML 1.1 readers keep it
/// a string instead of resolving it to a timestamp.
fn to_yaml(store: &TaskStore) -> Result<String, serde_yaml::Error> {
    if store.is_empty() {
        return Ok("{}\n".to_string());
    }
    let mut out = String::new();
    for (date, day) in store.iter() {
        out.push_str(&format!("'{}':\n", date.format("%Y-%m-%d")));
        for line in serde_yaml::to_string(day)?.lines() {
            out.push_str("  ");
            out.push_str(line);
            out.push('\n');
        }
    }
    Ok(out)
}

fn non_empty_parent(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DayTasks;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample_store() -> TaskStore {
        let mut store = TaskStore::default();
        store.set_day(
            date("2024-01-03"),
            DayTasks {
                completed: vec!["Walk dog".into()],
                todo: vec!["Call mom".into(), "Buy milk".into()],
            },
        );
        store.set_day(
            date("2024-01-02"),
            DayTasks {
                completed: Vec::new(),
                todo: vec!["Write report".into(), "Write report".into()],
            },
        );
        store
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let location = StoreLocation::at(dir.path().join(STORE_FILE_NAME));
        let store = sample_store();
        save_store(&location, &store).unwrap();
        assert_eq!(load_store(&location).unwrap(), store);
    }

    #[test]
    fn keys_are_written_in_date_order() {
        let dir = tempfile::tempdir().unwrap();
        let location = StoreLocation::at(dir.path().join(STORE_FILE_NAME));
        save_store(&location, &sample_store()).unwrap();
        let text = fs::read_to_string(&location.path).unwrap();
        let first = text.find("2024-01-02").unwrap();
        let second = text.find("2024-01-03").unwrap();
        assert!(first < second);
    }

    #[test]
    fn date_keys_are_single_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let location = StoreLocation::at(dir.path().join(STORE_FILE_NAME));
        let mut store = TaskStore::default();
        store.set_day(
            date("2024-01-02"),
            DayTasks {
                completed: Vec::new(),
                todo: vec!["a".into(), "multi\nline".into()],
            },
        );
        save_store(&location, &store).unwrap();
        let text = fs::read_to_string(&location.path).unwrap();
        assert!(text.starts_with("'2024-01-02':\n"));
        assert!(!text.contains("\n2024-01-02:"));
        assert_eq!(load_store(&location).unwrap(), store);
    }

    #[test]
    fn empty_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let location = StoreLocation::at(dir.path().join(STORE_FILE_NAME));
        fs::write(&location.path, "").unwrap();
        assert!(load_store(&location).unwrap().is_empty());
    }

    #[test]
    fn failed_write_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let location = StoreLocation::at(dir.path());
        let err = save_store(&location, &sample_store()).unwrap_err();
        assert!(matches!(err, StorageError::Write { .. }));
    }

    #[test]
    fn missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let location = StoreLocation::at(dir.path().join("absent.yaml"));
        let err = load_store(&location).unwrap_err();
        assert!(matches!(err, StorageError::Unavailable { .. }));
    }

    #[test]
    fn malformed_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let location = StoreLocation::at(dir.path().join(STORE_FILE_NAME));
        fs::write(&location.path, "not-a-date:\n  todo: [a]\n").unwrap();
        let err = load_store(&location).unwrap_err();
        assert!(matches!(err, StorageError::Malformed { .. }));
    }

    #[test]
    fn reads_files_written_by_other_tools() {
        let dir = tempfile::tempdir().unwrap();
        let location = StoreLocation::at(dir.path().join(STORE_FILE_NAME));
        fs::write(
            &location.path,
            "'2024-01-02':\n  completed: []\n  todo:\n  - Buy milk\n'2024-01-03':\n  todo: []\n",
        )
        .unwrap();
        let store = load_store(&location).unwrap();
        assert_eq!(store.day(date("2024-01-02")).todo, vec!["Buy milk"]);
        assert_eq!(store.day(date("2024-01-03")), DayTasks::default());
    }

    #[test]
    fn init_creates_empty_store_once() {
        let dir = tempfile::tempdir().unwrap();
        let location = StoreLocation::at(dir.path().join("nested").join(STORE_FILE_NAME));
        assert!(init_store(&location).unwrap());
        assert!(load_store(&location).unwrap().is_empty());

        save_store(&location, &sample_store()).unwrap();
        assert!(!init_store(&location).unwrap());
        assert_eq!(load_store(&location).unwrap(), sample_store());
    }
}
