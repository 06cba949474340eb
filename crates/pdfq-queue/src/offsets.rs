//! Committed consumer offsets, persisted per consumer group.
//!
//! Each group keeps one JSON file per topic under
//! `{offset_dir}/{group_id}/{topic}.json`, mapping partition to the offset of
//! the last handled record. Writes go to a temp file that is then renamed
//! over the old one, so a crash leaves either the previous or the new state.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use pdfq_core::{Error, Result};

#[derive(Debug, Default, Serialize, Deserialize)]
struct OffsetFile {
    offsets: BTreeMap<i32, i64>,
}

/// File-backed offset store for one `(group, topic)` pair.
#[derive(Debug)]
pub struct FileOffsetStore {
    path: PathBuf,
    offsets: BTreeMap<i32, i64>,
}

impl FileOffsetStore {
    /// Load the committed offsets of `group_id` for `topic`.
    ///
    /// A group that has never committed starts empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Queue`] if the offset file exists but cannot be parsed.
    pub async fn open(dir: &Path, group_id: &str, topic: &str) -> Result<Self> {
        let path = dir.join(group_id).join(format!("{topic}.json"));
        let offsets = match fs::read(&path).await {
            Ok(bytes) => {
                serde_json::from_slice::<OffsetFile>(&bytes)
                    .map_err(|e| {
                        Error::Queue(format!(
                            "corrupt offset file {}: {}",
                            path.display(),
                            e
                        ))
                    })?
                    .offsets
            }
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        info!(
            subsystem = "queue",
            component = "offsets",
            group_id,
            topic,
            committed_partitions = offsets.len(),
            "Committed offsets loaded"
        );
        Ok(Self { path, offsets })
    }

    /// Offset of the last handled record on `partition`.
    pub fn committed(&self, partition: i32) -> Option<i64> {
        self.offsets.get(&partition).copied()
    }

    /// Record `offset` as handled on `partition` and persist it.
    ///
    /// Offsets at or below the current committed value are ignored.
    pub async fn commit(&mut self, partition: i32, offset: i64) -> Result<()> {
        if self.committed(partition).is_some_and(|current| current >= offset) {
            return Ok(());
        }
        self.offsets.insert(partition, offset);
        self.persist().await?;
        debug!(
            subsystem = "queue",
            component = "offsets",
            partition,
            offset,
            "Offset committed"
        );
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let body = serde_json::to_vec_pretty(&OffsetFile {
            offsets: self.offsets.clone(),
        })?;

        // Atomic write: temp file + rename
        let temp_path = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&body).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            warn!(
                subsystem = "queue",
                component = "offsets",
                from = %temp_path.display(),
                to = %self.path.display(),
                error = %e,
                "Offset file rename failed"
            );
            Error::from(e)
        })
    }
}
