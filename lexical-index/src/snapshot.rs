use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::{document::IndexedDocument, index::SearchIndex};

/// Bumped whenever the on-disk layout or the tokenization rules change;
/// older snapshots are discarded and rebuilt rather than migrated.
const FORMAT_VERSION: u32 = 2;

/// The single serialized blob persisted after a successful rebuild: the built
/// index plus the backing document table needed to hydrate search hits.
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexSnapshot {
    format_version: u32,
    checksum: String,
    pub built_at: DateTime<Utc>,
    pub documents: Vec<IndexedDocument>,
    pub index: SearchIndex,
}

impl IndexSnapshot {
    pub fn new(documents: Vec<IndexedDocument>, index: SearchIndex) -> Result<Self, serde_json::Error> {
        let checksum = checksum_documents(&documents)?;
        Ok(Self {
            format_version: FORMAT_VERSION,
            checksum,
            built_at: Utc::now(),
            documents,
            index,
        })
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let blob = serde_json::to_vec(self)?;
        std::fs::write(path, blob)?;
        debug!(path = %path.display(), documents = self.documents.len(), "Persisted index snapshot");
        Ok(())
    }

    /// Fast-path loader. A missing file, a parse failure, a format-version
    /// mismatch, or a checksum mismatch all return `None` so the caller falls
    /// through to a full rebuild.
    pub fn load(path: &Path) -> Option<Self> {
        let blob = match std::fs::read(path) {
            Ok(blob) => blob,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Failed to read index snapshot");
                return None;
            }
        };

        let snapshot: IndexSnapshot = match serde_json::from_slice(&blob) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Malformed index snapshot, rebuilding");
                return None;
            }
        };

        if snapshot.format_version != FORMAT_VERSION {
            warn!(
                found = snapshot.format_version,
                expected = FORMAT_VERSION,
                "Index snapshot format mismatch, rebuilding"
            );
            return None;
        }

        match checksum_documents(&snapshot.documents) {
            Ok(checksum) if checksum == snapshot.checksum => Some(snapshot),
            Ok(_) => {
                warn!(path = %path.display(), "Index snapshot checksum mismatch, rebuilding");
                None
            }
            Err(err) => {
                warn!(error = %err, "Failed to checksum snapshot documents");
                None
            }
        }
    }
}

fn checksum_documents(documents: &[IndexedDocument]) -> Result<String, serde_json::Error> {
    let payload = serde_json::to_vec(documents)?;
    let digest = Sha256::digest(&payload);
    Ok(format!("{digest:x}"))
}
