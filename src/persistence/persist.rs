use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;

use super::settings::AppSettings;
use crate::viz::style::LabelStyleOverrides;

/// Key holding the serialized per-label overrides.
pub const NODE_STYLES_KEY: &str = "nodeStyles";

/// Session-scoped string key/value store the style overrides are kept in.
pub trait StyleStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> anyhow::Result<()>;
}

impl<S: StyleStore + ?Sized> StyleStore for Box<S> {
    fn get(&self, key: &str) -> Option<String> { (**self).get(key) }
    fn set(&mut self, key: &str, value: String) -> anyhow::Result<()> { (**self).set(key, value) }
}

/// Process-lifetime store; forgotten when the application exits.
#[derive(Debug, Default, Clone)]
pub struct SessionStore {
    entries: BTreeMap<String, String>,
}

impl SessionStore {
    pub fn new() -> Self { Self::default() }

    pub fn with_entry(mut self, key: &str, value: impl Into<String>) -> Self {
        self.entries.insert(key.to_string(), value.into());
        self
    }
}

impl StyleStore for SessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// File-backed store: one JSON object of key -> string, rewritten atomically on every set.
#[derive(Debug)]
pub struct FileStyleStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStyleStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match read_entries(&path) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("ignoring unreadable style store {}: {:#}", path.display(), e);
                BTreeMap::new()
            }
        };
        Self { path, entries }
    }

    pub fn path(&self) -> &Path { &self.path }
}

fn read_entries(path: &Path) -> anyhow::Result<BTreeMap<String, String>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let mut f = File::open(path)?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    Ok(serde_json::from_str(&buf)?)
}

impl StyleStore for FileStyleStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> anyhow::Result<()> {
        let mut next = self.entries.clone();
        next.insert(key.to_string(), value);
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let s = serde_json::to_string_pretty(&next)?;
        atomic_write(&self.path, s.as_bytes())
            .with_context(|| format!("writing {}", self.path.display()))?;
        self.entries = next;
        Ok(())
    }
}

fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    {
        let mut f = File::create(&tmp_path)?;
        f.write_all(data)?;
        f.flush()?;
    }
    fs::rename(tmp_path, path)?;
    Ok(())
}

/// Read the overrides mapping. Missing or corrupt content yields an empty mapping.
pub fn load_overrides<S: StyleStore + ?Sized>(store: &S) -> LabelStyleOverrides {
    let Some(raw) = store.get(NODE_STYLES_KEY) else {
        return LabelStyleOverrides::new();
    };
    match serde_json::from_str(&raw) {
        Ok(overrides) => overrides,
        Err(e) => {
            log::warn!("discarding corrupt persisted node styles: {}", e);
            LabelStyleOverrides::new()
        }
    }
}

/// Full overwrite of the overrides mapping.
pub fn save_overrides<S: StyleStore + ?Sized>(store: &mut S, overrides: &LabelStyleOverrides) -> anyhow::Result<()> {
    let s = serde_json::to_string(overrides)?;
    store.set(NODE_STYLES_KEY, s)
}

/// The store selected by the settings: file-backed when styles persist across runs.
pub fn open_style_store(settings: &AppSettings) -> Box<dyn StyleStore> {
    if settings.persist_styles {
        let path = settings.style_store_dir().join("styles.json");
        log::debug!("using file style store at {}", path.display());
        Box::new(FileStyleStore::open(path))
    } else {
        Box::new(SessionStore::new())
    }
}
