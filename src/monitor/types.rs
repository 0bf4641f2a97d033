use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Productivity {
    Productive,
    Unproductive,
    Gaming,
    Neutral,
}

impl Default for Productivity {
    fn default() -> Self {
        Productivity::Neutral
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessUsage {
    pub name: String,
    pub cpu_percent: f64,
    pub mem_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SystemLoad {
    pub cpu_percent: f64,
    pub cpu_core_count: usize,
}

/// One point-in-time observation of what the machine is doing.
///
/// `productivity` defaults to `Neutral` so a sample deserialized from an old
/// backup file is never left unclassified.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySample {
    pub timestamp: DateTime<Utc>,
    pub machine_id: String,
    pub active_window: String,
    pub top_processes: Vec<ProcessUsage>,
    pub system_load: SystemLoad,
    #[serde(default)]
    pub productivity: Productivity,
}
