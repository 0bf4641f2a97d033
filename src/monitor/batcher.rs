use std::{fs, path::PathBuf, sync::Mutex as StdMutex};

use chrono::Utc;
use log::{info, warn};
use tokio::sync::Mutex;

use crate::api::{ApiClient, ApiError};

use super::types::ActivitySample;

#[derive(Debug, thiserror::Error)]
pub enum FlushError {
    #[error("activity delivery failed, {count} samples backed up to {}", backup.display())]
    Delivery {
        count: usize,
        backup: PathBuf,
        #[source]
        source: ApiError,
    },
    #[error("activity delivery failed and the backup write failed too: {backup_error}")]
    BackupFailed {
        backup_error: std::io::Error,
        #[source]
        source: ApiError,
    },
}

/// Accumulates classified samples and ships them to the backend in batches.
///
/// A failed delivery writes the pending samples to a timestamped local file
/// and clears them from memory; the file is a durability fallback, not a retry
/// queue. The one deviation from that fire-and-forget rule: if the backup
/// write itself fails, the samples stay in memory so the next flush attempt
/// sees them again instead of losing them silently.
pub struct Batcher {
    api: ApiClient,
    machine_id: String,
    backup_dir: PathBuf,
    pending: StdMutex<Vec<ActivitySample>>,
    // Serializes flushes so two overlapping calls cannot drain the same
    // snapshot twice.
    flush_gate: Mutex<()>,
}

impl Batcher {
    pub fn new(api: ApiClient, machine_id: String, backup_dir: PathBuf) -> Self {
        Self {
            api,
            machine_id,
            backup_dir,
            pending: StdMutex::new(Vec::new()),
            flush_gate: Mutex::new(()),
        }
    }

    /// Append one sample. Synchronous and infallible.
    pub fn append(&self, sample: ActivitySample) {
        self.pending.lock().expect("batch lock poisoned").push(sample);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().expect("batch lock poisoned").len()
    }

    /// Deliver everything pending at the time of the call. Samples appended
    /// while the request is in flight are left for the next flush.
    pub async fn flush(&self, user_id: i64) -> Result<(), FlushError> {
        let _gate = self.flush_gate.lock().await;

        let snapshot: Vec<ActivitySample> = {
            let pending = self.pending.lock().expect("batch lock poisoned");
            pending.clone()
        };
        if snapshot.is_empty() {
            return Ok(());
        }
        let count = snapshot.len();

        match self
            .api
            .send_activity(&self.machine_id, user_id, &snapshot)
            .await
        {
            Ok(()) => {
                self.drain(count);
                info!("delivered {count} activity samples");
                Ok(())
            }
            Err(source) => match self.write_backup(&snapshot) {
                Ok(backup) => {
                    self.drain(count);
                    warn!("activity delivery failed, backed up to {}", backup.display());
                    Err(FlushError::Delivery {
                        count,
                        backup,
                        source,
                    })
                }
                Err(backup_error) => Err(FlushError::BackupFailed {
                    backup_error,
                    source,
                }),
            },
        }
    }

    fn drain(&self, count: usize) {
        let mut pending = self.pending.lock().expect("batch lock poisoned");
        let end = count.min(pending.len());
        pending.drain(..end);
    }

    fn write_backup(&self, samples: &[ActivitySample]) -> std::io::Result<PathBuf> {
        let file_name = format!("activity_backup_{}.json", Utc::now().timestamp_millis());
        let path = self.backup_dir.join(file_name);
        let serialized = serde_json::to_string_pretty(samples)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        fs::write(&path, serialized)?;
        Ok(path)
    }
}
