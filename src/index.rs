//! SQLite-backed vector index.
//!
//! Embeddings are stored as little-endian f32 BLOBs in the `vectors` table,
//! one row per chunk, keyed by `doc_<document_id>_chunk_<index>`. Similarity
//! search loads candidate rows (optionally filtered by document type),
//! computes cosine similarity in process, and returns the top K.
//!
//! This brute-force design is deliberate: at the scale of one organization's
//! strategy documents a full scan is fast, and it keeps the store in the
//! same database file as everything else.

use anyhow::Result;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::models::{DocumentType, RetrievalHit};

/// Stored chunk text is capped at this many characters; the full body lives
/// in the documents table.
const METADATA_TEXT_CHARS: usize = 1000;

/// One chunk embedding ready for upsert.
pub struct VectorRecord {
    pub document_id: i64,
    pub filename: String,
    pub document_type: DocumentType,
    pub chunk_index: usize,
    pub text: String,
    pub embedding: Vec<f32>,
}

impl VectorRecord {
    /// The row id: `doc_<document_id>_chunk_<index>`.
    pub fn vector_id(&self) -> String {
        format!("doc_{}_chunk_{}", self.document_id, self.chunk_index)
    }
}

/// Insert or replace chunk vectors. Re-ingesting a document overwrites its
/// previous rows because the id encodes document and chunk position.
pub async fn upsert_vectors(pool: &SqlitePool, records: &[VectorRecord]) -> Result<usize> {
    let mut written = 0usize;

    for record in records {
        let stored_text: String = record.text.chars().take(METADATA_TEXT_CHARS).collect();
        let chunk_length = record.text.chars().count() as i64;
        let blob = vec_to_blob(&record.embedding);

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO vectors
                (id, document_id, filename, document_type, chunk_index,
                 text, chunk_length, dims, embedding)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.vector_id())
        .bind(record.document_id)
        .bind(&record.filename)
        .bind(record.document_type.as_str())
        .bind(record.chunk_index as i64)
        .bind(&stored_text)
        .bind(chunk_length)
        .bind(record.embedding.len() as i64)
        .bind(blob)
        .execute(pool)
        .await?;

        written += 1;
    }

    Ok(written)
}

/// Rank stored vectors against a query embedding and return the top `top_k`.
///
/// `type_filter` restricts candidates to one document type; `None` searches
/// everything. Results are sorted by descending similarity.
pub async fn query_similar(
    pool: &SqlitePool,
    query_embedding: &[f32],
    type_filter: Option<DocumentType>,
    top_k: usize,
) -> Result<Vec<RetrievalHit>> {
    let rows = match type_filter {
        Some(ty) => {
            sqlx::query(
                "SELECT id, document_id, filename, document_type, chunk_index, text, embedding \
                 FROM vectors WHERE document_type = ?",
            )
            .bind(ty.as_str())
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(
                "SELECT id, document_id, filename, document_type, chunk_index, text, embedding \
                 FROM vectors",
            )
            .fetch_all(pool)
            .await?
        }
    };

    let mut hits: Vec<RetrievalHit> = Vec::with_capacity(rows.len());

    for row in rows {
        let blob: Vec<u8> = row.get("embedding");
        let stored = blob_to_vec(&blob);
        let score = cosine_similarity(query_embedding, &stored) as f64;

        let type_str: String = row.get("document_type");
        let document_type = DocumentType::parse(&type_str).unwrap_or(DocumentType::General);

        hits.push(RetrievalHit {
            id: row.get("id"),
            score,
            text: row.get("text"),
            document_id: row.get("document_id"),
            filename: row.get("filename"),
            document_type,
            chunk_index: row.get("chunk_index"),
        });
    }

    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(top_k);

    Ok(hits)
}

/// Remove every vector belonging to a document. Returns the number of rows
/// deleted.
pub async fn delete_document_vectors(pool: &SqlitePool, document_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM vectors WHERE document_id = ?")
        .bind(document_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Index-level summary used by the stats command and endpoint.
#[derive(Debug, Serialize)]
pub struct IndexStats {
    pub total_vectors: i64,
    pub dimension: i64,
}

pub async fn index_stats(pool: &SqlitePool) -> Result<IndexStats> {
    let total_vectors: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vectors")
        .fetch_one(pool)
        .await?;

    let dimension: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(dims), 0) FROM vectors")
        .fetch_one(pool)
        .await?;

    Ok(IndexStats {
        total_vectors,
        dimension,
    })
}
