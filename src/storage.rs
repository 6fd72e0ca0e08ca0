use crate::model::{Event, StoredEvent};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde_json::Value;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the single storage slot holding every event.
pub const STORAGE_KEY: &str = "calendario-eventos";

const PROJECT_DIR: &str = ".calendario";

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("no stored events")]
    Missing,
    #[error("storage unavailable: {0}")]
    Io(#[from] io::Error),
    #[error("stored events are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("stored events are not an array")]
    NotAnArray,
    #[error("storage is read-only")]
    WriteRejected,
}

/// A durable slot the event list is read from and written to as a whole.
pub trait EventStorage {
    fn load(&self) -> Result<Vec<Event>, StorageError>;
    fn save(&self, events: &[Event]) -> Result<(), StorageError>;
    fn describe(&self) -> String;
}

/// Parses the slot payload, keeping only records that normalize cleanly.
pub fn parse_events(payload: &str) -> Result<Vec<Event>, StorageError> {
    if payload.is_empty() {
        return Err(StorageError::Missing);
    }
    let entries = match serde_json::from_str::<Value>(payload)? {
        Value::Array(entries) => entries,
        _ => return Err(StorageError::NotAnArray),
    };
    let total = entries.len();
    let events: Vec<Event> = entries
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|entry| serde_json::from_value::<StoredEvent>(entry).ok())
        .filter_map(StoredEvent::normalize)
        .collect();
    if events.len() < total {
        debug!(dropped = total - events.len(), "dropped malformed stored events");
    }
    Ok(events)
}

pub fn serialize_events(events: &[Event]) -> Result<String, StorageError> {
    Ok(serde_json::to_string_pretty(events)?)
}

#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStorage { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventStorage for JsonFileStorage {
    fn load(&self) -> Result<Vec<Event>, StorageError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Err(StorageError::Missing),
            Err(err) => return Err(err.into()),
        };
        parse_events(&data)
    }

    fn save(&self, events: &[Event]) -> Result<(), StorageError> {
        if let Ok(meta) = fs::metadata(&self.path) {
            if meta.permissions().readonly() {
                return Err(StorageError::WriteRejected);
            }
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serialize_events(events)?)?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{}", self.path().display())
    }
}

/// In-process slot standing in for the file in tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: std::cell::RefCell<Option<String>>,
    reject_writes: bool,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn with_payload(payload: impl Into<String>) -> Self {
        MemoryStorage {
            slot: std::cell::RefCell::new(Some(payload.into())),
            reject_writes: false,
        }
    }

    /// A slot that refuses every write, like a full disk.
    pub fn read_only(payload: Option<String>) -> Self {
        MemoryStorage {
            slot: std::cell::RefCell::new(payload),
            reject_writes: true,
        }
    }

    pub fn payload(&self) -> Option<String> {
        self.slot.borrow().clone()
    }
}

#[cfg(test)]
impl EventStorage for MemoryStorage {
    fn load(&self) -> Result<Vec<Event>, StorageError> {
        match self.slot.borrow().as_deref() {
            Some(payload) => parse_events(payload),
            None => Err(StorageError::Missing),
        }
    }

    fn save(&self, events: &[Event]) -> Result<(), StorageError> {
        if self.reject_writes {
            return Err(StorageError::WriteRejected);
        }
        *self.slot.borrow_mut() = Some(serialize_events(events)?);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
impl<T: EventStorage + ?Sized> EventStorage for std::rc::Rc<T> {
    fn load(&self) -> Result<Vec<Event>, StorageError> {
        (**self).load()
    }

    fn save(&self, events: &[Event]) -> Result<(), StorageError> {
        (**self).save(events)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreScope {
    Explicit,
    Project,
    Global,
}

impl StoreScope {
    pub fn label(&self) -> &'static str {
        match self {
            StoreScope::Explicit => "file",
            StoreScope::Project => "project",
            StoreScope::Global => "global",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreLocation {
    pub path: PathBuf,
    pub scope: StoreScope,
}

impl StoreLocation {
    pub fn storage(&self) -> JsonFileStorage {
        JsonFileStorage::new(&self.path)
    }
}

pub fn init_project_store() -> Result<StoreLocation> {
    let cwd = env::current_dir()?;
    let dir = cwd.join(PROJECT_DIR);
    fs::create_dir_all(&dir).with_context(|| format!("creating {:?}", dir))?;
    let path = dir.join(slot_file_name());
    if !path.exists() {
        JsonFileStorage::new(&path)
            .save(&[])
            .with_context(|| format!("writing {:?}", path))?;
    }
    Ok(StoreLocation {
        path,
        scope: StoreScope::Project,
    })
}

/// Resolves the events file: explicit path, then a project store above `start`,
/// then the per-user data directory.
pub fn locate_store(explicit: Option<&Path>, start: &Path) -> Result<StoreLocation> {
    if let Some(path) = explicit {
        return Ok(StoreLocation {
            path: path.to_path_buf(),
            scope: StoreScope::Explicit,
        });
    }
    if let Some(project_path) = find_project_store(start) {
        return Ok(StoreLocation {
            path: project_path,
            scope: StoreScope::Project,
        });
    }
    Ok(StoreLocation {
        path: data_dir()?.join(slot_file_name()),
        scope: StoreScope::Global,
    })
}

pub fn data_dir() -> Result<PathBuf> {
    let dirs = project_dirs()?;
    Ok(dirs.data_dir().to_path_buf())
}

pub fn config_dir() -> Result<PathBuf> {
    let dirs = project_dirs()?;
    Ok(dirs.config_dir().to_path_buf())
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "calendario").context("locating data directory")
}

fn slot_file_name() -> String {
    format!("{}.json", STORAGE_KEY)
}

fn find_project_store(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(PROJECT_DIR).join(slot_file_name());
        if candidate.exists() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_rejects_wrong_shapes() {
        assert!(matches!(parse_events(""), Err(StorageError::Missing)));
        assert!(matches!(parse_events("{oops"), Err(StorageError::Json(_))));
        assert!(matches!(
            parse_events("\"not an array\""),
            Err(StorageError::NotAnArray)
        ));
        assert!(matches!(
            parse_events("{\"title\":\"x\"}"),
            Err(StorageError::NotAnArray)
        ));
    }

    #[test]
    fn test_parse_skips_non_object_entries() {
        let payload = r#"[3, "x", null, {"title": "Cine", "date": "2024-05-25"}]"#;
        let events = parse_events(payload).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Cine");
    }

    #[test]
    fn test_parse_drops_array_shaped_entries() {
        let events = parse_events(r#"[["Cine", "2024-05-25"]]"#).unwrap();
        assert!(events.is_empty());
        let events =
            parse_events(r#"[["Cine", "2024-05-25"], {"title": "Cine", "date": "2024-05-25"}]"#)
                .unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("nested").join("events.json"));
        assert!(matches!(storage.load(), Err(StorageError::Missing)));

        let events = parse_events(
            r#"[{"title": "Mercado", "date": "2024-05-18", "time": "09:30"}]"#,
        )
        .unwrap();
        storage.save(&events).unwrap();
        assert_eq!(storage.load().unwrap(), events);

        let raw = fs::read_to_string(storage.path()).unwrap();
        assert!(raw.contains("\"date\": \"2024-05-18\""));
    }

    #[test]
    fn test_read_only_file_rejects_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.json");
        fs::write(&path, "[]").unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&path, perms).unwrap();

        let storage = JsonFileStorage::new(&path);
        assert!(matches!(storage.save(&[]), Err(StorageError::WriteRejected)));
        assert!(storage.load().unwrap().is_empty());
    }

    #[test]
    fn test_memory_storage_rejecting_writes_keeps_payload() {
        let storage = MemoryStorage::read_only(Some("[]".into()));
        assert!(matches!(storage.save(&[]), Err(StorageError::WriteRejected)));
        assert_eq!(storage.payload().as_deref(), Some("[]"));
    }

    #[test]
    fn test_locate_prefers_explicit_then_project() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        let project_file = dir.path().join(PROJECT_DIR).join(slot_file_name());
        fs::create_dir_all(project_file.parent().unwrap()).unwrap();
        fs::write(&project_file, "[]").unwrap();

        let found = locate_store(None, &nested).unwrap();
        assert_eq!(found.scope, StoreScope::Project);
        assert_eq!(found.path, project_file);

        let explicit = dir.path().join("other.json");
        let found = locate_store(Some(&explicit), &nested).unwrap();
        assert_eq!(found.scope, StoreScope::Explicit);
        assert_eq!(found.path, explicit);
    }
}
