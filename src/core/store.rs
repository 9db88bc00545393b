use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::info;

use super::records::{EnrichedRecord, ProgramPicks};

/// Per-program aggregate files under one directory. A single process-wide
/// lock serializes every merge, across all programs, so each
/// read-modify-write cycle sees the previous one completed.
pub struct PickStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl PickStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path_for(&self, program_name: &str) -> PathBuf {
        self.dir.join(format!("{program_name}.json"))
    }

    /// Append one enriched record to its program's aggregate. The variant
    /// selects the list. An existing file that fails to parse aborts the
    /// merge and is left untouched; a missing or empty file starts a fresh
    /// aggregate.
    pub async fn merge(&self, program_name: &str, record: EnrichedRecord) -> Result<()> {
        let _guard = self.lock.lock().await;

        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("create picks directory {}", self.dir.display()))?;

        let path = self.path_for(program_name);
        let existing = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e).with_context(|| format!("read {}", path.display())),
        };

        let mut picks: ProgramPicks = if existing.is_empty() {
            ProgramPicks::default()
        } else {
            serde_json::from_slice(&existing).with_context(|| {
                format!("existing picks file {} is not valid JSON", path.display())
            })?
        };

        picks.push(record);

        let serialized = serde_json::to_vec(&picks).context("serialize program picks")?;
        fs::write(&path, serialized)
            .await
            .with_context(|| format!("write {}", path.display()))?;

        info!("Updated picks for program {program_name}");
        Ok(())
    }
}
