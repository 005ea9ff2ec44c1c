//! Query history: every answered question is recorded with its sources and
//! confidence so past analyses can be reviewed.

use anyhow::Result;
use chrono::{TimeZone, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::config::Config;
use crate::db;
use crate::models::RagAnswer;

/// Listings truncate the response to this many characters.
const LISTING_RESPONSE_CHARS: usize = 200;

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub id: String,
    pub query: String,
    pub response: String,
    pub sources: Vec<String>,
    pub confidence_score: String,
    pub created_at: i64,
}

/// Persist one answered query.
pub async fn record_query(pool: &SqlitePool, query: &str, answer: &RagAnswer) -> Result<()> {
    let sources_json = serde_json::to_string(&answer.sources)?;

    sqlx::query(
        r#"
        INSERT INTO query_history (id, query, response, sources_json, confidence_score, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(query)
    .bind(&answer.response)
    .bind(&sources_json)
    .bind(&answer.confidence_score)
    .bind(Utc::now().timestamp())
    .execute(pool)
    .await?;

    Ok(())
}

/// Most recent queries first, responses truncated for listing.
pub async fn list_history(pool: &SqlitePool, limit: i64) -> Result<Vec<HistoryEntry>> {
    let rows = sqlx::query(
        "SELECT id, query, response, sources_json, confidence_score, created_at \
         FROM query_history ORDER BY created_at DESC, id LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let response: String = row.get("response");
        let sources_json: String = row.get("sources_json");
        let sources: Vec<String> = serde_json::from_str(&sources_json).unwrap_or_default();

        entries.push(HistoryEntry {
            id: row.get("id"),
            query: row.get("query"),
            response: truncate_chars(&response, LISTING_RESPONSE_CHARS),
            sources,
            confidence_score: row.get("confidence_score"),
            created_at: row.get("created_at"),
        });
    }

    Ok(entries)
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max).collect();
    format!("{}...", truncated)
}

/// Run the history command: print recent queries.
pub async fn run_history(config: &Config, limit: i64) -> Result<()> {
    let pool = db::connect(config).await?;
    let entries = list_history(&pool, limit).await?;

    if entries.is_empty() {
        println!("No queries recorded yet.");
        pool.close().await;
        return Ok(());
    }

    for entry in &entries {
        let when = Utc
            .timestamp_opt(entry.created_at, 0)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| entry.created_at.to_string());

        println!("[{}] {}", when, entry.query);
        println!("  confidence: {}", entry.confidence_score);
        if !entry.sources.is_empty() {
            println!("  sources: {}", entry.sources.join(", "));
        }
        println!("  {}", entry.response.replace('\n', " "));
        println!();
    }

    pool.close().await;
    Ok(())
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

    fn answer(response: &str, sources: Vec<&str>) -> RagAnswer {
        RagAnswer {
            response: response.to_string(),
            sources: sources.into_iter().map(String::from).collect(),
            confidence_score: "0.850".to_string(),
            chunks_found: 2,
            intent_analysis: None,
        }
    }

    #[tokio::test]
    async fn record_and_list_round_trip() {
        let pool = test_pool().await;
        record_query(&pool, "What was revenue?", &answer("Revenue grew.", vec!["q3.pdf"]))
            .await
            .unwrap();

        let entries = list_history(&pool, 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].query, "What was revenue?");
        assert_eq!(entries[0].sources, vec!["q3.pdf"]);
        assert_eq!(entries[0].confidence_score, "0.850");
    }

    #[tokio::test]
    async fn listing_truncates_long_responses() {
        let pool = test_pool().await;
        let long = "word ".repeat(100);
        record_query(&pool, "q", &answer(&long, vec![])).await.unwrap();

        let entries = list_history(&pool, 10).await.unwrap();
        assert_eq!(entries[0].response.chars().count(), 203);
        assert!(entries[0].response.ends_with("..."));
    }

    #[tokio::test]
    async fn limit_caps_results() {
        let pool = test_pool().await;
        for i in 0..5 {
            record_query(&pool, &format!("q{}", i), &answer("r", vec![]))
                .await
                .unwrap();
        }
        let entries = list_history(&pool, 3).await.unwrap();
        assert_eq!(entries.len(), 3);
    }

    #[test]
    fn short_responses_untouched() {
        assert_eq!(truncate_chars("short", 200), "short");
    }
}
