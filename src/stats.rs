//! Database statistics and health overview.
//!
//! Provides a quick summary of what's indexed: document counts per type,
//! embedding coverage, query volume, and index size. Used by `sdesk stats`
//! and the `/api/stats` endpoint.

use anyhow::Result;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::index::{index_stats, IndexStats};

#[derive(Debug, Serialize)]
pub struct TypeCount {
    pub document_type: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct SystemStats {
    pub total_documents: i64,
    pub documents_by_type: Vec<TypeCount>,
    pub total_words: i64,
    pub total_queries: i64,
    pub index: IndexStats,
}

/// Collect the system-wide summary in one pass.
pub async fn collect_stats(pool: &SqlitePool) -> Result<SystemStats> {
    let total_documents: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
        .fetch_one(pool)
        .await?;

    let total_words: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(word_count), 0) FROM documents")
            .fetch_one(pool)
            .await?;

    let total_queries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM query_history")
        .fetch_one(pool)
        .await?;

    let rows = sqlx::query(
        "SELECT document_type, COUNT(*) AS count FROM documents \
         GROUP BY document_type ORDER BY count DESC, document_type",
    )
    .fetch_all(pool)
    .await?;

    let documents_by_type = rows
        .into_iter()
        .map(|row| TypeCount {
            document_type: row.get("document_type"),
            count: row.get("count"),
        })
        .collect();

    let index = index_stats(pool).await?;

    Ok(SystemStats {
        total_documents,
        documents_by_type,
        total_words,
        total_queries,
        index,
    })
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let stats = collect_stats(&pool).await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("stratdesk — System Stats");
    println!("========================");
    println!();
    println!("  Database:   {}", config.db.path.display());
    println!("  Size:       {}", format_bytes(db_size));
    println!();
    println!("  Documents:  {}", stats.total_documents);
    for tc in &stats.documents_by_type {
        println!("    {:<16} {}", tc.document_type, tc.count);
    }
    println!("  Words:      {}", stats.total_words);
    println!();
    println!("  Vectors:    {}", stats.index.total_vectors);
    println!("  Dimension:  {}", stats.index.dimension);
    println!();
    println!("  Queries:    {}", stats.total_queries);

    pool.close().await;
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::migrate::run_migrations(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn empty_database_stats() {
        let pool = test_pool().await;
        let stats = collect_stats(&pool).await.unwrap();
        assert_eq!(stats.total_documents, 0);
        assert_eq!(stats.total_queries, 0);
        assert!(stats.documents_by_type.is_empty());
    }

    #[tokio::test]
    async fn per_type_counts_grouped() {
        let pool = test_pool().await;
        for (name, ty) in [("a.txt", "financial"), ("b.txt", "financial"), ("c.txt", "internal")] {
            sqlx::query(
                "INSERT INTO documents (filename, content, document_type, word_count, \
                 character_count, content_hash, embedding_status, uploaded_at) \
                 VALUES (?, 'x', ?, 10, 50, 'h', 'pending', 0)",
            )
            .bind(name)
            .bind(ty)
            .execute(&pool)
            .await
            .unwrap();
        }

        let stats = collect_stats(&pool).await.unwrap();
        assert_eq!(stats.total_documents, 3);
        assert_eq!(stats.total_words, 30);
        assert_eq!(stats.documents_by_type[0].document_type, "financial");
        assert_eq!(stats.documents_by_type[0].count, 2);
    }

    #[test]
    fn byte_formatting() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
