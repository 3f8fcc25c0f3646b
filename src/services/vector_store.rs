//! Persistent vector store: a directory holding `manifest.json` and a SQLite
//! database of chunks with their embeddings.
//!
//! The manifest pins the embedding model and dimension the store was built
//! with. Opening the store with a different model fails instead of silently
//! mixing vector spaces.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::VectorStoreError;
use crate::models::{Chunk, DocumentKind, ScoredEntry, StoreManifest, VectorStoreEntry};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const DATABASE_FILE: &str = "entries.db";

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS entries (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL,
    source_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    position INTEGER NOT NULL,
    chunk_index INTEGER NOT NULL,
    text TEXT NOT NULL,
    metadata TEXT NOT NULL,
    embedding BLOB NOT NULL,
    ingested_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_entries_source ON entries(source_id);
"#;

pub struct VectorStore {
    path: PathBuf,
    conn: Mutex<Connection>,
    manifest: Mutex<StoreManifest>,
}

impl VectorStore {
    /// Open the store at `path` for `model_id`, creating it if absent.
    pub fn open(path: &Path, model_id: &str, dimension: usize) -> Result<Self, VectorStoreError> {
        std::fs::create_dir_all(path)?;
        let manifest_path = path.join(MANIFEST_FILE);

        let manifest = if manifest_path.exists() {
            let manifest = read_manifest(&manifest_path)?;
            if manifest.embedding_model != model_id {
                return Err(VectorStoreError::ModelMismatch {
                    recorded: manifest.embedding_model,
                    requested: model_id.to_string(),
                });
            }
            if manifest.dimension != dimension {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: manifest.dimension,
                    actual: dimension,
                });
            }
            manifest
        } else {
            if path.join(DATABASE_FILE).exists() {
                return Err(VectorStoreError::ManifestError(format!(
                    "{} exists without {}",
                    DATABASE_FILE, MANIFEST_FILE
                )));
            }
            let manifest = StoreManifest::new(model_id, dimension);
            write_manifest(&manifest_path, &manifest)?;
            tracing::info!(path = %path.display(), model = model_id, dimension, "created vector store");
            manifest
        };

        Self::with_manifest(path, manifest)
    }

    /// Open an existing store whatever model built it.
    pub fn open_existing(path: &Path) -> Result<Self, VectorStoreError> {
        let manifest_path = path.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Err(VectorStoreError::NotFound(path.display().to_string()));
        }
        let manifest = read_manifest(&manifest_path)?;
        Self::with_manifest(path, manifest)
    }

    fn with_manifest(path: &Path, manifest: StoreManifest) -> Result<Self, VectorStoreError> {
        let conn = Connection::open(path.join(DATABASE_FILE))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            path: path.to_path_buf(),
            conn: Mutex::new(conn),
            manifest: Mutex::new(manifest),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn manifest(&self) -> StoreManifest {
        self.manifest
            .lock()
            .map(|m| m.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn dimension(&self) -> usize {
        self.manifest().dimension
    }

    pub fn len(&self) -> Result<usize, VectorStoreError> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, VectorStoreError> {
        Ok(self.len()? == 0)
    }

    /// Append entries in a single transaction. Returns the number written.
    ///
    /// Entries are never deduplicated; ingesting a file twice stores it twice.
    pub fn upsert(&self, entries: &[VectorStoreEntry]) -> Result<usize, VectorStoreError> {
        if entries.is_empty() {
            return Ok(0);
        }

        let dimension = self.dimension();
        if let Some(bad) = entries.iter().find(|e| e.embedding.len() != dimension) {
            return Err(VectorStoreError::DimensionMismatch {
                expected: dimension,
                actual: bad.embedding.len(),
            });
        }

        let now = chrono::Utc::now().to_rfc3339();
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO entries
                 (id, source_id, kind, position, chunk_index, text, metadata, embedding, ingested_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for entry in entries {
                let metadata = serde_json::to_string(&entry.chunk.metadata)
                    .map_err(|e| VectorStoreError::ManifestError(e.to_string()))?;
                stmt.execute(params![
                    entry.id,
                    entry.chunk.source_id,
                    entry.chunk.kind.as_str(),
                    entry.chunk.position as i64,
                    entry.chunk.chunk_index as i64,
                    entry.chunk.text,
                    metadata,
                    encode_vector(&entry.embedding),
                    now,
                ])?;
            }
        }
        tx.commit()?;
        drop(conn);

        self.update_manifest(|m| m.touch())?;
        tracing::debug!(count = entries.len(), "stored entries");
        Ok(entries.len())
    }

    /// Top `k` entries by cosine similarity, best first.
    ///
    /// Equal scores keep insertion order. `k` larger than the store is clamped.
    pub fn search(
        &self,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredEntry>, VectorStoreError> {
        if k == 0 {
            return Err(VectorStoreError::InvalidSearch(
                "k must be at least 1".to_string(),
            ));
        }
        let dimension = self.dimension();
        if query_vector.len() != dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: dimension,
                actual: query_vector.len(),
            });
        }

        let conn = self.conn()?;

        let mut scored: Vec<(i64, f32)> = {
            let mut stmt = conn.prepare("SELECT seq, embedding FROM entries ORDER BY seq")?;
            let rows = stmt.query_map([], |row| {
                let seq: i64 = row.get(0)?;
                let blob: Vec<u8> = row.get(1)?;
                Ok((seq, blob))
            })?;

            let mut scored = Vec::new();
            for row in rows {
                let (seq, blob) = row?;
                scored.push((seq, cosine_similarity(query_vector, &decode_vector(&blob))));
            }
            scored
        };

        if scored.is_empty() {
            return Err(VectorStoreError::EmptyStore);
        }

        // Stable sort: ties stay in seq (insertion) order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        let mut hits = Vec::with_capacity(scored.len());
        for (rank, (seq, score)) in scored.into_iter().enumerate() {
            let entry = load_entry(&conn, seq)?.ok_or_else(|| {
                VectorStoreError::ManifestError(format!("entry {} vanished during search", seq))
            })?;
            hits.push(ScoredEntry {
                rank: rank as u32 + 1,
                score,
                entry,
            });
        }

        Ok(hits)
    }

    /// Delete every entry, keeping the manifest.
    pub fn clear(&self) -> Result<usize, VectorStoreError> {
        let removed = self.conn()?.execute("DELETE FROM entries", [])?;
        self.update_manifest(|m| m.touch())?;
        tracing::info!(path = %self.path.display(), removed, "cleared vector store");
        Ok(removed)
    }

    /// Remove the store at `path` (if any) and create a fresh one for `model_id`.
    pub fn recreate(
        path: &Path,
        model_id: &str,
        dimension: usize,
    ) -> Result<Self, VectorStoreError> {
        for name in [
            MANIFEST_FILE.to_string(),
            DATABASE_FILE.to_string(),
            format!("{}-wal", DATABASE_FILE),
            format!("{}-shm", DATABASE_FILE),
        ] {
            let file = path.join(name);
            if file.exists() {
                std::fs::remove_file(&file)?;
            }
        }
        Self::open(path, model_id, dimension)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, VectorStoreError> {
        self.conn
            .lock()
            .map_err(|_| VectorStoreError::ManifestError("connection lock poisoned".to_string()))
    }

    fn update_manifest(&self, f: impl FnOnce(&mut StoreManifest)) -> Result<(), VectorStoreError> {
        let mut manifest = self
            .manifest
            .lock()
            .map_err(|_| VectorStoreError::ManifestError("manifest lock poisoned".to_string()))?;
        f(&mut manifest);
        write_manifest(&self.path.join(MANIFEST_FILE), &manifest)
    }
}

fn load_entry(conn: &Connection, seq: i64) -> Result<Option<VectorStoreEntry>, VectorStoreError> {
    let row = conn
        .query_row(
            "SELECT id, source_id, kind, position, chunk_index, text, metadata, embedding
             FROM entries WHERE seq = ?1",
            params![seq],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, Vec<u8>>(7)?,
                ))
            },
        )
        .optional()?;

    let Some((id, source_id, kind, position, chunk_index, text, metadata, blob)) = row else {
        return Ok(None);
    };

    let kind: DocumentKind = kind.parse().map_err(VectorStoreError::ManifestError)?;
    let metadata: BTreeMap<String, String> = serde_json::from_str(&metadata)
        .map_err(|e| VectorStoreError::ManifestError(e.to_string()))?;

    Ok(Some(VectorStoreEntry {
        id,
        chunk: Chunk {
            text,
            source_id,
            kind,
            position: position as u64,
            chunk_index: chunk_index as u32,
            metadata,
        },
        embedding: decode_vector(&blob),
    }))
}

fn read_manifest(path: &Path) -> Result<StoreManifest, VectorStoreError> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| VectorStoreError::ManifestError(format!("{}: {}", path.display(), e)))
}

fn write_manifest(path: &Path, manifest: &StoreManifest) -> Result<(), VectorStoreError> {
    let content = serde_json::to_string_pretty(manifest)
        .map_err(|e| VectorStoreError::ManifestError(e.to_string()))?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn encode_vector(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|x| x.to_le_bytes()).collect()
}

fn decode_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Cosine similarity; zero when either vector has no magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
