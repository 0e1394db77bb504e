use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chansweep_core::write_text_atomic;
use chansweep_engine::ChannelVisibility;
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "config.json";

/// Stored defaults for discovery runs, persisted as pretty JSON under the
/// state directory. Missing or out-of-range values fall back to defaults on
/// load; `config set` goes through [`AppConfig::validate`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub days: u32,
    pub limit: usize,
    pub types: Vec<String>,
    pub verbose: bool,
    pub keyword: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            days: 30,
            limit: 30,
            types: vec!["public".to_string()],
            verbose: false,
            keyword: String::new(),
        }
    }
}

impl AppConfig {
    /// Loads the stored config, or defaults when the file does not exist.
    /// Unreadable or unparseable JSON is an error; out-of-range values are
    /// quietly re-defaulted so an old or hand-edited file cannot wedge runs.
    pub fn load(state_dir: &Path) -> Result<Self> {
        let path = config_path(state_dir);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self, state_dir: &Path) -> Result<()> {
        self.validate()?;
        let body = serde_json::to_string_pretty(self).context("failed to serialize config")?;
        write_text_atomic(&config_path(state_dir), &body)
    }

    pub fn validate(&self) -> Result<()> {
        if self.days == 0 {
            bail!("days must be greater than 0");
        }
        if self.limit == 0 {
            bail!("limit must be greater than 0");
        }
        if self.types.is_empty() {
            bail!("types must name at least one of: public, private");
        }
        for raw in &self.types {
            if ChannelVisibility::parse(raw).is_none() {
                bail!("unknown channel type {raw:?}; expected public or private");
            }
        }
        Ok(())
    }

    /// Maps the stored type names onto the visibility mask, dropping names
    /// the engine does not know. An empty result falls back to public.
    pub fn type_mask(&self) -> Vec<ChannelVisibility> {
        let mut mask: Vec<ChannelVisibility> = Vec::new();
        for raw in &self.types {
            if let Some(visibility) = ChannelVisibility::parse(raw) {
                if !mask.contains(&visibility) {
                    mask.push(visibility);
                }
            }
        }
        if mask.is_empty() {
            mask.push(ChannelVisibility::Public);
        }
        mask
    }

    pub fn set_keyword(&mut self, keyword: &str) {
        self.keyword = keyword.trim().to_string();
    }

    fn normalize(&mut self) {
        let defaults = Self::default();
        if self.days == 0 {
            self.days = defaults.days;
        }
        if self.limit == 0 {
            self.limit = defaults.limit;
        }
        if self.types.is_empty() {
            self.types = defaults.types;
        }
    }
}

pub(crate) fn config_path(state_dir: &Path) -> PathBuf {
    state_dir.join(CONFIG_FILE)
}
