//! Document ingestion pipeline.
//!
//! Coordinates the full upload flow: extraction → metadata → classification
//! → chunking → embedding → storage. Embedding is non-fatal: a document
//! whose chunks could not all be embedded is still stored, with its
//! `embedding_status` recording how far indexing got.
//!
//! Status values: `pending` (embeddings disabled), `completed`, `partial`,
//! `failed`.

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::path::Path;

use crate::chunk::{chunk_text, ChunkPolicy};
use crate::classify::classify_document;
use crate::config::Config;
use crate::db;
use crate::embedding::{self, EmbeddingProvider};
use crate::extract::{extract_text, file_extension};
use crate::index::{upsert_vectors, VectorRecord};
use crate::models::{DocumentMetadata, DocumentType, UploadReport};

const SUPPORTED_EXTENSIONS: [&str; 3] = ["pdf", "docx", "txt"];

/// Ingest one document from raw bytes.
///
/// `override_type` skips the classifier; `None` classifies from filename
/// and content. The document row is written before embedding starts so a
/// failed embedding pass still leaves a queryable record.
pub async fn ingest_bytes(
    pool: &SqlitePool,
    config: &Config,
    provider: &dyn EmbeddingProvider,
    filename: &str,
    bytes: &[u8],
    override_type: Option<DocumentType>,
) -> Result<UploadReport> {
    let text = extract_text(bytes, filename)
        .with_context(|| format!("Failed to extract text from {}", filename))?;

    let metadata = DocumentMetadata::compute(&text);

    let document_type = match override_type {
        Some(ty) => ty,
        None => classify_document(filename, &text),
    };

    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let content_hash = format!("{:x}", hasher.finalize());

    let policy = ChunkPolicy::new(config.chunking.chunk_size, config.chunking.overlap)?;
    let chunks = chunk_text(&text, &policy);

    let result = sqlx::query(
        r#"
        INSERT INTO documents
            (filename, content, document_type, word_count, character_count,
             content_hash, embedding_status, uploaded_at)
        VALUES (?, ?, ?, ?, ?, ?, 'pending', ?)
        "#,
    )
    .bind(filename)
    .bind(&text)
    .bind(document_type.as_str())
    .bind(metadata.word_count as i64)
    .bind(metadata.character_count as i64)
    .bind(&content_hash)
    .bind(metadata.extracted_at.timestamp())
    .execute(pool)
    .await?;

    let document_id = result.last_insert_rowid();

    let embedding_status = if config.embedding.is_enabled() {
        embed_and_index(pool, config, provider, document_id, filename, document_type, &chunks)
            .await?
    } else {
        "pending".to_string()
    };

    if embedding_status != "pending" {
        sqlx::query("UPDATE documents SET embedding_status = ? WHERE id = ?")
            .bind(&embedding_status)
            .bind(document_id)
            .execute(pool)
            .await?;
    }

    Ok(UploadReport {
        document_id,
        filename: filename.to_string(),
        document_type,
        chunks_created: chunks.len(),
        embedding_status,
        word_count: metadata.word_count,
        character_count: metadata.character_count,
    })
}

/// Embed chunks in batches and index whatever succeeded. Returns the
/// resulting embedding status.
async fn embed_and_index(
    pool: &SqlitePool,
    config: &Config,
    provider: &dyn EmbeddingProvider,
    document_id: i64,
    filename: &str,
    document_type: DocumentType,
    chunks: &[String],
) -> Result<String> {
    if chunks.is_empty() {
        return Ok("completed".to_string());
    }

    let embeddings = embedding::embed_batch(provider, &config.embedding, chunks).await;

    let records: Vec<VectorRecord> = chunks
        .iter()
        .zip(embeddings.iter())
        .enumerate()
        .filter_map(|(i, (text, embedding))| {
            embedding.as_ref().map(|vec| VectorRecord {
                document_id,
                filename: filename.to_string(),
                document_type,
                chunk_index: i,
                text: text.clone(),
                embedding: vec.clone(),
            })
        })
        .collect();

    let indexed = upsert_vectors(pool, &records).await?;

    let status = if indexed == chunks.len() {
        "completed"
    } else if indexed > 0 {
        "partial"
    } else {
        "failed"
    };

    Ok(status.to_string())
}

/// Resolve a user-supplied `--doc-type` value. `"auto"` means classify.
pub fn resolve_doc_type(value: &str) -> Result<Option<DocumentType>> {
    if value == "auto" {
        return Ok(None);
    }
    match DocumentType::parse(value) {
        Some(ty) => Ok(Some(ty)),
        None => bail!(
            "Unknown document type: '{}'. Use auto, financial, market_research, internal, or general.",
            value
        ),
    }
}

/// Run the upload command for a file or directory path.
pub async fn run_upload(config: &Config, path: &Path, doc_type: &str) -> Result<()> {
    let override_type = resolve_doc_type(doc_type)?;
    let provider = embedding::create_provider(&config.embedding)?;
    let pool = db::connect(config).await?;

    let files = collect_files(path)?;
    if files.is_empty() {
        bail!(
            "No supported files found at {} (looking for .pdf, .docx, .txt)",
            path.display()
        );
    }

    let mut ok = 0usize;
    let mut failed = 0usize;

    for file in &files {
        let filename = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unnamed")
            .to_string();
        let bytes = std::fs::read(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;

        match ingest_bytes(&pool, config, provider.as_ref(), &filename, &bytes, override_type)
            .await
        {
            Ok(report) => {
                ok += 1;
                println!(
                    "  {} (id {}): {} chunks, type {}, embeddings {}",
                    report.filename,
                    report.document_id,
                    report.chunks_created,
                    report.document_type,
                    report.embedding_status
                );
            }
            Err(e) => {
                failed += 1;
                eprintln!("  {}: {:#}", filename, e);
            }
        }
    }

    println!();
    println!("Uploaded {} document(s), {} failed.", ok, failed);

    pool.close().await;
    if ok == 0 {
        bail!("All uploads failed");
    }
    Ok(())
}

/// Expand a path into the list of supported files: the file itself, or a
/// recursive walk for a directory.
fn collect_files(path: &Path) -> Result<Vec<std::path::PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        bail!("Path not found: {}", path.display());
    }

    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(path).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if SUPPORTED_EXTENSIONS.contains(&file_extension(name).as_str()) {
                files.push(entry.path().to_path_buf());
            }
        }
    }
    Ok(files)
}
