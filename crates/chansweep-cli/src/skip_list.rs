use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chansweep_core::write_text_atomic;

const SKIPLIST_FILE: &str = "skiplist.json";

/// Channel names protected from discovery and bulk leaving, persisted as a
/// sorted, de-duplicated JSON array under the state directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipList {
    names: BTreeSet<String>,
}

impl SkipList {
    /// Loads the stored skip list, or an empty one when the file does not
    /// exist. Entries are whitespace-trimmed; blank entries are dropped.
    pub fn load(state_dir: &Path) -> Result<Self> {
        let path = skiplist_path(state_dir);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let entries: Vec<String> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(Self::from_names(entries))
    }

    pub fn from_names<I>(names: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let names = names
            .into_iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        Self { names }
    }

    pub fn save(&self, state_dir: &Path) -> Result<()> {
        let body = serde_json::to_string_pretty(&self.names)
            .context("failed to serialize skip list")?;
        write_text_atomic(&skiplist_path(state_dir), &body)
    }

    /// Returns `true` when the name was not already protected.
    pub fn add(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        self.names.insert(name.to_string())
    }

    /// Returns `true` when the name was present.
    pub fn remove(&mut self, name: &str) -> bool {
        self.names.remove(name.trim())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name.trim())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn into_set(self) -> HashSet<String> {
        self.names.into_iter().collect()
    }
}

fn skiplist_path(state_dir: &Path) -> PathBuf {
    state_dir.join(SKIPLIST_FILE)
}
