//! Precomputed-embedding cache
//!
//! A pure serialization boundary: embeddings generated by the provider are
//! persisted alongside their ids, source model name and timestamp, so builds
//! can reuse them without recomputation. Stored as JSON; serde_json prints
//! floats with the shortest round-tripping representation, so vectors load
//! back bit-identical.

use crate::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// On-disk archive layout
///
/// `embeddings` is the one mandatory field; readers tolerate a missing
/// `metadata` field.
#[derive(Debug, Serialize, Deserialize)]
pub struct EmbeddingArchive {
    pub ids: Vec<u64>,
    pub embeddings: Vec<Vec<f32>>,
    pub model_name: String,
    pub created_at: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Vec<Map<String, Value>>>,
}

/// Archive loaded back from disk, with the model-mismatch flag surfaced
#[derive(Debug)]
pub struct LoadedArchive {
    pub ids: Vec<u64>,
    pub embeddings: Vec<Vec<f32>>,
    pub model_name: String,
    pub metadata: Option<Vec<Map<String, Value>>>,

    /// True when the archive was generated by a different model than the one
    /// currently configured. Non-fatal; the vectors are still usable.
    pub model_mismatch: bool,
}

impl LoadedArchive {
    /// Dimensionality of the stored vectors (0 for an empty archive)
    pub fn dimension(&self) -> usize {
        self.embeddings.first().map(Vec::len).unwrap_or(0)
    }
}

/// Persist embeddings for later reuse. Returns the written location.
pub fn save(
    path: impl AsRef<Path>,
    ids: Vec<u64>,
    embeddings: Vec<Vec<f32>>,
    model_name: &str,
    metadata: Option<Vec<Map<String, Value>>>,
) -> Result<PathBuf> {
    let path = path.as_ref();

    if ids.len() != embeddings.len() {
        return Err(AppError::DataIntegrity {
            message: format!(
                "Cannot save cache: {} ids for {} vectors",
                ids.len(),
                embeddings.len()
            ),
        });
    }

    if let Some(first) = embeddings.first() {
        if let Some(bad) = embeddings.iter().position(|v| v.len() != first.len()) {
            return Err(AppError::DataIntegrity {
                message: format!(
                    "Cannot save cache: vector {} has dimension {} (expected {})",
                    bad,
                    embeddings[bad].len(),
                    first.len()
                ),
            });
        }
    }

    if let Some(meta) = &metadata {
        if meta.len() != ids.len() {
            return Err(AppError::DataIntegrity {
                message: format!(
                    "Cannot save cache: {} metadata rows for {} ids",
                    meta.len(),
                    ids.len()
                ),
            });
        }
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let count = ids.len();
    let archive = EmbeddingArchive {
        ids,
        embeddings,
        model_name: model_name.to_string(),
        created_at: chrono::Utc::now().timestamp_millis() as f64 / 1000.0,
        metadata,
    };

    fs::write(path, serde_json::to_vec(&archive)?)?;

    info!(
        path = %path.display(),
        count = count,
        model = model_name,
        "Embedding cache saved"
    );

    Ok(path.to_path_buf())
}

/// Load an embedding archive.
///
/// Fails with `DataIntegrity` when the payload lacks its vectors or the
/// id/vector counts disagree. A model-name mismatch against the configured
/// model is logged and flagged, never fatal.
pub fn load(path: impl AsRef<Path>, configured_model: &str) -> Result<LoadedArchive> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;

    // Parse as a generic document first: a payload without its vectors field
    // is a corrupt cache, not a serde type error.
    let doc: Value = serde_json::from_slice(&bytes)?;
    if doc.get("embeddings").is_none() {
        return Err(AppError::DataIntegrity {
            message: format!(
                "Cache file {} has no 'embeddings' field",
                path.display()
            ),
        });
    }

    let archive: EmbeddingArchive = serde_json::from_value(doc)?;

    if archive.ids.len() != archive.embeddings.len() {
        return Err(AppError::DataIntegrity {
            message: format!(
                "Cache file {} has {} ids for {} vectors",
                path.display(),
                archive.ids.len(),
                archive.embeddings.len()
            ),
        });
    }

    let model_mismatch = archive.model_name != configured_model;
    if model_mismatch {
        warn!(
            cache_model = %archive.model_name,
            configured_model = configured_model,
            path = %path.display(),
            "Cache was generated by a different embedding model"
        );
    }

    info!(
        path = %path.display(),
        count = archive.ids.len(),
        dimension = archive.embeddings.first().map(Vec::len).unwrap_or(0),
        model = %archive.model_name,
        "Embedding cache loaded"
    );

    Ok(LoadedArchive {
        ids: archive.ids,
        embeddings: archive.embeddings,
        model_name: archive.model_name,
        metadata: archive.metadata,
        model_mismatch,
    })
}
