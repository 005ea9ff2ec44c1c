//! Document listing and deletion.

use anyhow::{bail, Result};
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::index::delete_document_vectors;
use crate::models::{DocumentRecord, DocumentType};

/// All documents, newest first.
pub async fn list_documents(pool: &SqlitePool) -> Result<Vec<DocumentRecord>> {
    let rows = sqlx::query(
        "SELECT id, filename, document_type, word_count, character_count, \
                embedding_status, uploaded_at \
         FROM documents ORDER BY uploaded_at DESC, id DESC",
    )
    .fetch_all(pool)
    .await?;

    let mut documents = Vec::with_capacity(rows.len());
    for row in rows {
        let type_str: String = row.get("document_type");
        documents.push(DocumentRecord {
            id: row.get("id"),
            filename: row.get("filename"),
            document_type: DocumentType::parse(&type_str).unwrap_or(DocumentType::General),
            word_count: row.get("word_count"),
            character_count: row.get("character_count"),
            embedding_status: row.get("embedding_status"),
            uploaded_at: row.get("uploaded_at"),
        });
    }

    Ok(documents)
}

/// Delete a document and its vectors. Vectors go first so a failure part
/// way through never leaves orphaned rows pointing at a missing document.
pub async fn delete_document(pool: &SqlitePool, document_id: i64) -> Result<()> {
    let exists: bool =
        sqlx::query_scalar("SELECT COUNT(*) > 0 FROM documents WHERE id = ?")
            .bind(document_id)
            .fetch_one(pool)
            .await?;
    if !exists {
        bail!("No document with id {}", document_id);
    }

    let vectors_deleted = delete_document_vectors(pool, document_id).await?;

    sqlx::query("DELETE FROM documents WHERE id = ?")
        .bind(document_id)
        .execute(pool)
        .await?;

    println!(
        "Deleted document {} ({} vector(s) removed).",
        document_id, vectors_deleted
    );
    Ok(())
}

/// Run the documents command: print the document table.
pub async fn run_documents(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let documents = list_documents(&pool).await?;

    if documents.is_empty() {
        println!("No documents uploaded yet.");
        pool.close().await;
        return Ok(());
    }

    println!(
        "{:<6} {:<40} {:<16} {:>8} {:>10} {:<10}",
        "ID", "FILENAME", "TYPE", "WORDS", "CHARS", "EMBEDDING"
    );
    for doc in &documents {
        println!(
            "{:<6} {:<40} {:<16} {:>8} {:>10} {:<10}",
            doc.id,
            doc.filename,
            doc.document_type.as_str(),
            doc.word_count,
            doc.character_count,
            doc.embedding_status
        );
    }

    pool.close().await;
    Ok(())
}

/// Run the delete command.
pub async fn run_delete(config: &Config, document_id: i64) -> Result<()> {
    let pool = db::connect(config).await?;
    delete_document(&pool, document_id).await?;
    pool.close().await;
    Ok(())
}
