//! SQLite-backed chunk store with vector search via `sqlite-vec`.

use std::os::raw::c_char;
use std::path::{Path, PathBuf};
use std::sync::Once;

use tokio_rusqlite::{Connection, ffi};

use super::ChunkDocument;
use crate::types::DeskError;

/// Persisted vector index over chunk documents.
///
/// The index lives in a single database file: a `chunks` table plus a
/// `chunks_embeddings` vec0 virtual table joined by rowid. Writes are
/// transactional per call: a batch is either fully committed or not at all.
/// Single-writer use is assumed; there is no locking discipline for
/// concurrent rebuild and query.
#[derive(Clone)]
pub struct SqliteChunkStore {
    conn: Connection,
    dimensions: usize,
}

impl SqliteChunkStore {
    /// Creates a fresh index at `path`, destroying any existing one first.
    ///
    /// There is no incremental-update path in this mode: the previous
    /// database file is removed entirely before the schema is recreated.
    pub async fn create(path: impl AsRef<Path>, dimensions: usize) -> Result<Self, DeskError> {
        let path = path.as_ref().to_path_buf();
        remove_database_files(&path).await?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let store = Self::open(path, dimensions).await?;
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Opens an existing index for search and append.
    ///
    /// The embedding provider must match the one used at write time; this
    /// precondition is assumed, not validated.
    pub async fn open_existing(
        path: impl AsRef<Path>,
        dimensions: usize,
    ) -> Result<Self, DeskError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(DeskError::Storage(format!(
                "index not found at {} (run an ingest with rebuild first)",
                path.display()
            )));
        }
        let store = Self::open(path, dimensions).await?;
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn open(path: PathBuf, dimensions: usize) -> Result<Self, DeskError> {
        Self::register_sqlite_vec()?;
        let conn = Connection::open(path)
            .await
            .map_err(|err| DeskError::Storage(err.to_string()))?;
        conn.call(|conn| {
            let result = conn.query_row("select vec_version()", [], |row| row.get::<_, String>(0));
            match result {
                Ok(_) => Ok(()),
                Err(err) => Err(err),
            }
        })
        .await
        .map_err(|err| DeskError::Storage(err.to_string()))?;
        Ok(Self { conn, dimensions })
    }

    async fn ensure_schema(&self) -> Result<(), DeskError> {
        let dimensions = self.dimensions;
        self.conn
            .call(move |conn| {
                conn.execute(
                    "CREATE TABLE IF NOT EXISTS chunks (
                        id TEXT PRIMARY KEY,
                        source TEXT,
                        title TEXT,
                        heading TEXT,
                        chunk_index TEXT,
                        metadata TEXT,
                        content TEXT
                    )",
                    [],
                )?;
                conn.execute(
                    "CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source)",
                    [],
                )?;
                conn.execute(
                    &format!(
                        "CREATE VIRTUAL TABLE IF NOT EXISTS chunks_embeddings \
                         USING vec0(embedding float[{dimensions}])"
                    ),
                    [],
                )?;
                Ok(())
            })
            .await
            .map_err(|err: tokio_rusqlite::Error| DeskError::Storage(err.to_string()))
    }

    /// Inserts chunk documents with their embeddings as one transaction.
    pub async fn add_chunks(
        &self,
        documents: Vec<(ChunkDocument, Vec<f32>)>,
    ) -> Result<(), DeskError> {
        if documents.is_empty() {
            return Ok(());
        }
        for (document, embedding) in &documents {
            if embedding.len() != self.dimensions {
                return Err(DeskError::Storage(format!(
                    "embedding for chunk {} has {} dimensions, index expects {}",
                    document.id,
                    embedding.len(),
                    self.dimensions
                )));
            }
        }

        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                for (document, embedding) in documents {
                    tx.execute(
                        "INSERT INTO chunks (id, source, title, heading, chunk_index, metadata, content) \
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                        (
                            &document.id,
                            &document.source,
                            &document.title,
                            &document.heading,
                            document.chunk_index.to_string(),
                            document.metadata.to_string(),
                            &document.content,
                        ),
                    )?;
                    let rowid = tx.last_insert_rowid();
                    let vector = serde_json::to_string(&embedding)
                        .map_err(|err| {
                            tokio_rusqlite::rusqlite::Error::ToSqlConversionFailure(Box::new(err))
                        })?;
                    tx.execute(
                        "INSERT INTO chunks_embeddings (rowid, embedding) VALUES (?1, ?2)",
                        (rowid, vector),
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(|err: tokio_rusqlite::Error| DeskError::Storage(err.to_string()))
    }

    /// Returns the `top_k` nearest chunks by cosine distance, most similar
    /// first, together with a similarity score in `[0, 1]`-ish range.
    pub async fn search_similar(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<(ChunkDocument, f32)>, DeskError> {
        let embedding_json = serde_json::to_string(query_embedding)
            .map_err(|err| DeskError::Retrieval(err.to_string()))?;

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT c.id, c.source, c.title, c.heading, c.chunk_index, c.content, c.metadata, \
                     vec_distance_cosine(e.embedding, vec_f32(?1)) as distance \
                     FROM chunks c \
                     JOIN chunks_embeddings e ON e.rowid = c.rowid \
                     ORDER BY distance ASC \
                     LIMIT {top_k}"
                ))?;

                let rows = stmt.query_map([&embedding_json], |row| {
                    let document = ChunkDocument {
                        id: row.get(0)?,
                        source: row.get(1)?,
                        title: row.get(2)?,
                        heading: row.get(3)?,
                        chunk_index: row.get::<_, String>(4)?.parse().unwrap_or(0),
                        content: row.get(5)?,
                        metadata: row
                            .get::<_, String>(6)
                            .map(|raw| serde_json::from_str(&raw).unwrap_or_default())
                            .unwrap_or_default(),
                    };
                    let distance: f32 = row.get(7)?;
                    // Cosine distance to similarity.
                    Ok((document, 1.0 - distance))
                })?;

                let mut results = Vec::new();
                for row in rows {
                    results.push(row?);
                }
                Ok(results)
            })
            .await
            .map_err(|err: tokio_rusqlite::Error| DeskError::Retrieval(err.to_string()))
    }

    /// Total number of chunks in the index.
    pub async fn count(&self) -> Result<usize, DeskError> {
        self.conn
            .call(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
                Ok(count as usize)
            })
            .await
            .map_err(|err: tokio_rusqlite::Error| DeskError::Storage(err.to_string()))
    }

    fn register_sqlite_vec() -> Result<(), DeskError> {
        use std::sync::Mutex;

        static INIT: Once = Once::new();
        static INIT_RESULT: Mutex<Option<Result<(), String>>> = Mutex::new(None);

        INIT.call_once(|| {
            let result = unsafe {
                type SqliteExtensionInit = unsafe extern "C" fn(
                    *mut ffi::sqlite3,
                    *mut *mut c_char,
                    *const ffi::sqlite3_api_routines,
                ) -> i32;

                let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
                let init_fn: SqliteExtensionInit =
                    std::mem::transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
                let rc = ffi::sqlite3_auto_extension(Some(init_fn));
                if rc != 0 {
                    Err(format!(
                        "failed to register sqlite-vec extension (code {rc})"
                    ))
                } else {
                    Ok(())
                }
            };
            *INIT_RESULT.lock().expect("init result mutex poisoned") = Some(result);
        });

        INIT_RESULT
            .lock()
            .expect("init result mutex poisoned")
            .clone()
            .expect("init was called but result not set")
            .map_err(DeskError::Storage)
    }
}

/// Removes the database file and its WAL/SHM siblings, ignoring absence.
async fn remove_database_files(path: &Path) -> Result<(), DeskError> {
    for suffix in ["", "-wal", "-shm"] {
        let mut candidate = path.as_os_str().to_owned();
        candidate.push(suffix);
        let candidate = PathBuf::from(candidate);
        match tokio::fs::remove_file(&candidate).await {
            Ok(()) => {
                tracing::info!(path = %candidate.display(), "removed existing index file");
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}
