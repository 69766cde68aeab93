use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::entity::NoteColor;
use crate::error::Result;

pub const PROJECT_DIR: &str = ".stickyboard";
const CONFIG_FILE: &str = "config.json";

/// Project settings, read from `.stickyboard/config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_notes_collection")]
    pub notes_collection: String,
    #[serde(default = "default_groups_collection")]
    pub groups_collection: String,
    /// Color given to new notes when none is chosen.
    #[serde(default)]
    pub default_color: NoteColor,
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_notes_collection() -> String {
    "notes".to_string()
}

fn default_groups_collection() -> String {
    "taskGroups".to_string()
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            notes_collection: default_notes_collection(),
            groups_collection: default_groups_collection(),
            default_color: NoteColor::default(),
            log_filter: default_log_filter(),
        }
    }
}

impl Config {
    /// Load the project config; a missing file yields the defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(PROJECT_DIR).join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let dir = root.join(PROJECT_DIR);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(CONFIG_FILE), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.notes_collection, "notes");
        assert_eq!(config.groups_collection, "taskGroups");
        assert_eq!(config.default_color, NoteColor::Yellow);
    }

    #[test]
    fn test_missing_keys_take_defaults() {
        let config: Config = serde_json::from_str(r#"{ "default_color": "pink" }"#).unwrap();
        assert_eq!(config.default_color, NoteColor::Pink);
        assert_eq!(config.notes_collection, "notes");
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(Config::load(tmp.path()).unwrap(), Config::default());

        let config = Config {
            notes_collection: "stickies".to_string(),
            ..Config::default()
        };
        config.save(tmp.path()).unwrap();
        assert_eq!(Config::load(tmp.path()).unwrap(), config);
    }
}
