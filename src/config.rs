use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};
use uuid::Uuid;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WindowPosition {
    pub x: Option<i32>,
    pub y: Option<i32>,
}

impl Default for WindowPosition {
    fn default() -> Self {
        Self { x: None, y: Some(50) }
    }
}

/// Per-device configuration record. Unknown or missing fields fall back to
/// the defaults below, so config files written by older builds keep loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    pub api_url: String,
    pub auth_token: Option<String>,
    pub user_id: Option<i64>,
    /// Stable opaque device id, minted on first run.
    pub machine_id: String,
    pub theme: String,
    pub opacity: f64,
    pub position: WindowPosition,
    pub auto_start: bool,
    pub show_notifications: bool,
    pub proactive_advice: bool,
    pub advice_interval_ms: u64,
    pub monitor_interval_ms: u64,
    pub reconnect_interval_ms: u64,
    pub batch_threshold: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            auth_token: None,
            user_id: None,
            machine_id: String::new(),
            theme: "dark".to_string(),
            opacity: 0.9,
            position: WindowPosition::default(),
            auto_start: true,
            show_notifications: true,
            proactive_advice: true,
            advice_interval_ms: 120_000,
            monitor_interval_ms: 5_000,
            reconnect_interval_ms: 5_000,
            batch_threshold: 6,
        }
    }
}

pub struct ConfigStore {
    path: PathBuf,
    data: RwLock<AgentConfig>,
}

impl ConfigStore {
    /// Load the config from `path`. A missing or corrupt file is never fatal:
    /// the store falls back to defaults and logs what happened. The machine id
    /// is minted here on first run and persisted so it stays stable across
    /// restarts.
    pub fn load(path: PathBuf) -> Self {
        let mut data = if path.exists() {
            match fs::read_to_string(&path) {
                Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
                    warn!(
                        "config file {} is corrupt ({err}), using defaults",
                        path.display()
                    );
                    AgentConfig::default()
                }),
                Err(err) => {
                    warn!(
                        "failed to read config from {} ({err}), using defaults",
                        path.display()
                    );
                    AgentConfig::default()
                }
            }
        } else {
            AgentConfig::default()
        };

        let mut needs_persist = false;
        if data.machine_id.is_empty() {
            data.machine_id = Uuid::new_v4().to_string();
            needs_persist = true;
        }

        let store = Self {
            path,
            data: RwLock::new(data),
        };

        if needs_persist {
            if let Err(err) = store.persist() {
                warn!("failed to persist freshly minted machine id: {err:#}");
            }
        }

        store
    }

    pub fn get(&self) -> AgentConfig {
        self.data.read().expect("config lock poisoned").clone()
    }

    pub fn machine_id(&self) -> String {
        self.data
            .read()
            .expect("config lock poisoned")
            .machine_id
            .clone()
    }

    /// Apply a mutation and write the result back to disk.
    pub fn update(&self, mutate: impl FnOnce(&mut AgentConfig)) -> Result<()> {
        {
            let mut guard = self.data.write().expect("config lock poisoned");
            mutate(&mut guard);
        }
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let serialized = {
            let guard = self.data.read().expect("config lock poisoned");
            serde_json::to_string_pretty(&*guard)?
        };
        fs::write(&self.path, serialized)
            .with_context(|| format!("failed to write config to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults_with_machine_id() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::load(dir.path().join("config.json"));
        let config = store.get();

        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.batch_threshold, 6);
        assert_eq!(config.monitor_interval_ms, 5_000);
        assert_eq!(config.advice_interval_ms, 120_000);
        assert!(!config.machine_id.is_empty());
    }

    #[test]
    fn corrupt_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        let store = ConfigStore::load(path);
        assert_eq!(store.get().theme, "dark");
    }

    #[test]
    fn machine_id_is_stable_across_loads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let first = ConfigStore::load(path.clone()).machine_id();
        let second = ConfigStore::load(path).machine_id();

        assert_eq!(first, second);
    }

    #[test]
    fn updates_round_trip_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let store = ConfigStore::load(path.clone());
        store
            .update(|config| {
                config.user_id = Some(42);
                config.auth_token = Some("Bearer 42".to_string());
                config.proactive_advice = false;
            })
            .unwrap();

        let reloaded = ConfigStore::load(path).get();
        assert_eq!(reloaded.user_id, Some(42));
        assert_eq!(reloaded.auth_token.as_deref(), Some("Bearer 42"));
        assert!(!reloaded.proactive_advice);
    }
}
