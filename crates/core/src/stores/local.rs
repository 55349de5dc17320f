//! Directory-backed vector collection.
//!
//! Layout under the persist directory:
//!
//! ```text
//! <persist_dir>/<collection>/manifest.json   name, dimension, created_at
//! <persist_dir>/<collection>/records.jsonl   one StoreRecord per line
//! ```
//!
//! Records are append-only. Search is a brute-force cosine scan, which is
//! plenty for a corpus of a few thousand chunks.

use crate::traits::VectorStore;
use crate::{ScoredRecord, StoreError, StoreRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const MANIFEST_FILE: &str = "manifest.json";
const RECORDS_FILE: &str = "records.jsonl";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    name: String,
    dimension: Option<usize>,
    created_at: DateTime<Utc>,
}

#[derive(Debug)]
struct CollectionState {
    manifest: Manifest,
    records: Vec<StoreRecord>,
    ids: HashSet<String>,
    sources: HashSet<String>,
}

#[derive(Debug)]
pub struct LocalCollection {
    dir: PathBuf,
    state: RwLock<CollectionState>,
}

impl LocalCollection {
    /// Opens the collection, creating the directory and manifest if absent.
    pub async fn open_or_create(
        persist_dir: impl AsRef<Path>,
        name: &str,
    ) -> Result<Self, StoreError> {
        let dir = collection_dir(persist_dir.as_ref(), name)?;
        fs::create_dir_all(&dir).await?;

        let manifest_path = dir.join(MANIFEST_FILE);
        if !fs::try_exists(&manifest_path).await? {
            let manifest = Manifest {
                name: name.to_string(),
                dimension: None,
                created_at: Utc::now(),
            };
            write_manifest(&dir, &manifest).await?;
            info!(collection = name, dir = %dir.display(), "created collection");
        }

        Self::load(dir).await
    }

    /// Opens a collection that ingestion has already built.
    pub async fn open_existing(
        persist_dir: impl AsRef<Path>,
        name: &str,
    ) -> Result<Self, StoreError> {
        let persist_dir = persist_dir.as_ref();
        if !fs::try_exists(persist_dir).await? {
            return Err(StoreError::Missing(persist_dir.display().to_string()));
        }

        let dir = collection_dir(persist_dir, name)?;
        if !fs::try_exists(dir.join(MANIFEST_FILE)).await? {
            return Err(StoreError::Missing(dir.display().to_string()));
        }

        Self::load(dir).await
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn dimension(&self) -> Option<usize> {
        self.state.read().await.manifest.dimension
    }

    async fn load(dir: PathBuf) -> Result<Self, StoreError> {
        let manifest_raw = fs::read_to_string(dir.join(MANIFEST_FILE)).await?;
        let manifest: Manifest = serde_json::from_str(&manifest_raw)?;

        let records_path = dir.join(RECORDS_FILE);
        let records = if fs::try_exists(&records_path).await? {
            let raw = fs::read_to_string(&records_path).await?;
            let (records, torn) = parse_records(&raw, &records_path, manifest.dimension)?;
            if !raw.is_empty() && !raw.ends_with('\n') {
                repair_tail(&records_path, &raw, torn).await?;
            }
            records
        } else {
            Vec::new()
        };

        let ids = records.iter().map(|record| record.id.clone()).collect();
        let sources = records
            .iter()
            .map(|record| record.metadata.source.clone())
            .collect();

        info!(
            collection = %manifest.name,
            records = records.len(),
            dimension = ?manifest.dimension,
            "opened collection"
        );

        Ok(Self {
            dir,
            state: RwLock::new(CollectionState {
                manifest,
                records,
                ids,
                sources,
            }),
        })
    }
}

#[async_trait]
impl VectorStore for LocalCollection {
    async fn add(&self, record: StoreRecord) -> Result<(), StoreError> {
        let mut state = self.state.write().await;

        if state.ids.contains(&record.id) {
            return Err(StoreError::DuplicateId(record.id));
        }

        match state.manifest.dimension {
            Some(expected) if expected != record.embedding.len() => {
                return Err(StoreError::DimensionMismatch {
                    expected,
                    actual: record.embedding.len(),
                });
            }
            Some(_) => {}
            None => {
                let mut manifest = state.manifest.clone();
                manifest.dimension = Some(record.embedding.len());
                write_manifest(&self.dir, &manifest).await?;
                state.manifest = manifest;
            }
        }

        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(RECORDS_FILE))
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!(id = %record.id, source = %record.metadata.source, "stored record");
        state.ids.insert(record.id.clone());
        state.sources.insert(record.metadata.source.clone());
        state.records.push(record);
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredRecord>, StoreError> {
        let state = self.state.read().await;

        if k == 0 || state.records.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(expected) = state.manifest.dimension {
            if expected != embedding.len() {
                return Err(StoreError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
        }

        let mut scored = state
            .records
            .iter()
            .map(|record| (record, cosine_similarity(embedding, &record.embedding)))
            .collect::<Vec<_>>();

        // Stable: equal scores keep insertion order.
        scored.sort_by(|left, right| right.1.total_cmp(&left.1));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(record, similarity)| ScoredRecord {
                id: record.id.clone(),
                document: record.document.clone(),
                metadata: record.metadata.clone(),
                similarity,
            })
            .collect())
    }

    async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    async fn contains_source(&self, source: &str) -> bool {
        self.state.read().await.sources.contains(source)
    }
}

fn collection_dir(persist_dir: &Path, name: &str) -> Result<PathBuf, StoreError> {
    let trimmed = name.trim();
    let valid = !trimmed.is_empty()
        && trimmed != "."
        && trimmed != ".."
        && !trimmed.contains(['/', '\\']);
    if !valid {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(persist_dir.join(trimmed))
}

async fn write_manifest(dir: &Path, manifest: &Manifest) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(manifest)?;
    let tmp_path = dir.join(format!("{MANIFEST_FILE}.tmp"));
    fs::write(&tmp_path, &bytes).await?;
    fs::rename(&tmp_path, dir.join(MANIFEST_FILE)).await?;
    Ok(())
}

/// Makes the records file end on a line boundary so the next append starts
/// a fresh line. A torn tail is cut off; a complete record that only lost
/// its newline gets one.
async fn repair_tail(path: &Path, raw: &str, torn: bool) -> Result<(), StoreError> {
    if torn {
        let keep = raw.rfind('\n').map_or(0, |newline| newline + 1);
        let file = fs::OpenOptions::new().write(true).open(path).await?;
        file.set_len(keep as u64).await?;
        file.sync_all().await?;
        warn!(path = %path.display(), kept_bytes = keep, "truncated torn trailing record");
    } else {
        let mut file = fs::OpenOptions::new().append(true).open(path).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
    }
    Ok(())
}

/// A torn final line (interrupted append) is skipped with a warning and
/// reported through the returned flag; any other unreadable line is an error.
fn parse_records(
    raw: &str,
    path: &Path,
    dimension: Option<usize>,
) -> Result<(Vec<StoreRecord>, bool), StoreError> {
    let lines = raw
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .collect::<Vec<_>>();
    let last = lines.len().saturating_sub(1);

    let mut records = Vec::with_capacity(lines.len());
    let mut torn = false;
    for (position, (line_no, line)) in lines.into_iter().enumerate() {
        let record: StoreRecord = match serde_json::from_str(line) {
            Ok(record) => record,
            Err(error) if position == last && !raw.ends_with('\n') => {
                warn!(path = %path.display(), line = line_no + 1, %error, "skipping torn trailing record");
                torn = true;
                continue;
            }
            Err(error) => {
                return Err(StoreError::Corrupt {
                    path: path.display().to_string(),
                    line: line_no + 1,
                    details: error.to_string(),
                });
            }
        };

        if let Some(expected) = dimension {
            if record.embedding.len() != expected {
                return Err(StoreError::Corrupt {
                    path: path.display().to_string(),
                    line: line_no + 1,
                    details: format!(
                        "embedding has {} values, collection expects {expected}",
                        record.embedding.len()
                    ),
                });
            }
        }

        records.push(record);
    }

    Ok((records, torn))
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
