//! Retrieval-augmented answer assembly.
//!
//! Runs the full query flow: intent analysis → query embedding → vector
//! search → prompt assembly → completion. The result is always a
//! well-formed [`RagAnswer`]; failures along the way degrade the answer
//! text instead of surfacing as errors.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::completion::{self, CompletionProvider, STRATEGIST_SYSTEM_PROMPT};
use crate::config::Config;
use crate::db;
use crate::embedding::{self, EmbeddingProvider};
use crate::history;
use crate::index::query_similar;
use crate::models::{DocumentType, RagAnswer, RetrievalHit};

/// Answer a question against the indexed documents.
///
/// `type_filter` restricts retrieval to one document type. This function
/// never returns an error: internal failures are folded into the answer.
pub async fn generate_answer(
    pool: &SqlitePool,
    config: &Config,
    embedder: &dyn EmbeddingProvider,
    completer: &dyn CompletionProvider,
    query: &str,
    type_filter: Option<DocumentType>,
) -> RagAnswer {
    match try_generate(pool, config, embedder, completer, query, type_filter).await {
        Ok(answer) => answer,
        Err(e) => RagAnswer::from_error(&e),
    }
}

async fn try_generate(
    pool: &SqlitePool,
    config: &Config,
    embedder: &dyn EmbeddingProvider,
    completer: &dyn CompletionProvider,
    query: &str,
    type_filter: Option<DocumentType>,
) -> Result<RagAnswer> {
    let intent = completion::analyze_intent(completer, &config.completion, query).await;

    let hits = retrieve_hits(pool, config, embedder, query, type_filter).await?;

    if hits.is_empty() {
        return Ok(RagAnswer::no_results(Some(intent)));
    }

    let confidence_score = confidence_score(&hits);
    let sources = dedup_sources(&hits);
    let prompt = build_prompt(query, &hits, &sources);

    let response = match completion::complete_answer(
        completer,
        &config.completion,
        STRATEGIST_SYSTEM_PROMPT,
        &prompt,
    )
    .await
    {
        Ok(text) => text,
        Err(e) => format!(
            "I apologize, but I encountered an error generating the analysis: {}. \
             The relevant documents were found; please try again.",
            e
        ),
    };

    Ok(RagAnswer {
        response,
        sources,
        confidence_score,
        chunks_found: hits.len(),
        intent_analysis: Some(intent),
    })
}

/// Embed the query and search the index. Disabled embeddings yield no hits
/// rather than an error, so the caller falls through to the no-results
/// answer.
async fn retrieve_hits(
    pool: &SqlitePool,
    config: &Config,
    embedder: &dyn EmbeddingProvider,
    query: &str,
    type_filter: Option<DocumentType>,
) -> Result<Vec<RetrievalHit>> {
    if !config.embedding.is_enabled() {
        return Ok(Vec::new());
    }

    let query_embedding = match embedding::embed_query(embedder, &config.embedding, query).await {
        Ok(vec) => vec,
        Err(e) => {
            eprintln!("Warning: query embedding failed: {}", e);
            return Ok(Vec::new());
        }
    };

    query_similar(pool, &query_embedding, type_filter, config.retrieval.top_k).await
}

/// Mean hit similarity, formatted to three decimals.
fn confidence_score(hits: &[RetrievalHit]) -> String {
    let mean = hits.iter().map(|h| h.score).sum::<f64>() / hits.len() as f64;
    format!("{:.3}", mean)
}

/// Source filenames, deduplicated, in first-seen hit order.
fn dedup_sources(hits: &[RetrievalHit]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for hit in hits {
        if !sources.iter().any(|s| s == &hit.filename) {
            sources.push(hit.filename.clone());
        }
    }
    sources
}

/// Assemble the user prompt: numbered context blocks, the deduplicated
/// source list, then the question. Source labels are 1-indexed to match
/// citation instructions.
fn build_prompt(query: &str, hits: &[RetrievalHit], sources: &[String]) -> String {
    let mut prompt = String::from("Context from uploaded documents:\n\n");

    for (i, hit) in hits.iter().enumerate() {
        prompt.push_str(&format!(
            "[Source {}] {} ({}):\n{}\n\n",
            i + 1,
            hit.filename,
            hit.document_type,
            hit.text
        ));
    }

    prompt.push_str(&format!("Source documents: {}\n\n", sources.join(", ")));
    prompt.push_str(&format!(
        "Question: {}\n\nAnswer the question using the context above, citing sources by their \
         [Source N] labels.",
        query
    ));

    prompt
}

/// Run the ask command: answer the question, print the result, and record
/// it in the query history.
pub async fn run_ask(config: &Config, query: &str, doc_type: &str) -> Result<()> {
    let type_filter = match doc_type {
        "all" => None,
        other => match DocumentType::parse(other) {
            Some(ty) => Some(ty),
            None => anyhow::bail!(
                "Unknown document type filter: '{}'. Use all, financial, market_research, \
                 internal, or general.",
                other
            ),
        },
    };

    let embedder = embedding::create_provider(&config.embedding)?;
    let completer = completion::create_provider(&config.completion)?;
    let pool = db::connect(config).await?;

    let answer = generate_answer(
        &pool,
        config,
        embedder.as_ref(),
        completer.as_ref(),
        query,
        type_filter,
    )
    .await;

    println!("{}", answer.response);
    println!();
    if !answer.sources.is_empty() {
        println!("Sources: {}", answer.sources.join(", "));
    }
    println!(
        "Confidence: {}  ({} chunk(s) matched)",
        answer.confidence_score, answer.chunks_found
    );
    if let Some(ref intent) = answer.intent_analysis {
        println!("Intent: {}", intent.intent);
    }

    if let Err(e) = history::record_query(&pool, query, &answer).await {
        eprintln!("Warning: failed to record query history: {}", e);
    }

    pool.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentType;

    fn hit(filename: &str, score: f64, text: &str) -> RetrievalHit {
        RetrievalHit {
            id: format!("doc_1_chunk_{}", text.len()),
            score,
            text: text.to_string(),
            document_id: 1,
            filename: filename.to_string(),
            document_type: DocumentType::General,
            chunk_index: 0,
        }
    }

    #[test]
    fn confidence_is_mean_to_three_decimals() {
        let hits = vec![hit("a.txt", 0.9, "x"), hit("b.txt", 0.8, "y"), hit("c.txt", 0.7, "z")];
        assert_eq!(confidence_score(&hits), "0.800");
    }

    #[test]
    fn confidence_single_hit() {
        let hits = vec![hit("a.txt", 0.123456, "x")];
        assert_eq!(confidence_score(&hits), "0.123");
    }

    #[test]
    fn sources_deduplicated_in_first_seen_order() {
        let hits = vec![
            hit("alpha.pdf", 0.9, "one"),
            hit("beta.docx", 0.8, "two"),
            hit("alpha.pdf", 0.7, "three"),
        ];
        assert_eq!(dedup_sources(&hits), vec!["alpha.pdf", "beta.docx"]);
    }

    #[test]
    fn prompt_numbers_sources_from_one() {
        let hits = vec![hit("a.txt", 0.9, "First chunk."), hit("b.txt", 0.8, "Second chunk.")];
        let sources = dedup_sources(&hits);
        let prompt = build_prompt("What happened?", &hits, &sources);
        assert!(prompt.contains("[Source 1] a.txt"));
        assert!(prompt.contains("[Source 2] b.txt"));
        assert!(prompt.contains("First chunk."));
        assert!(prompt.contains("Source documents: a.txt, b.txt"));
        assert!(prompt.contains("Question: What happened?"));
        // Order: context before question.
        assert!(prompt.find("[Source 1]").unwrap() < prompt.find("Question:").unwrap());
    }

    #[tokio::test]
    async fn degraded_stack_yields_no_results_answer() {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::migrate::run_migrations(&pool).await.unwrap();

        let config: Config = toml::from_str(
            r#"
[db]
path = "unused.sqlite"

[server]
bind = "127.0.0.1:0"
"#,
        )
        .unwrap();

        let embedder = embedding::DisabledProvider;
        let completer = completion::DisabledCompletion;

        let answer = generate_answer(
            &pool,
            &config,
            &embedder,
            &completer,
            "What was Q3 revenue?",
            None,
        )
        .await;

        assert_eq!(answer.chunks_found, 0);
        assert_eq!(answer.confidence_score, "0.0");
        assert!(answer.response.contains("couldn't find relevant information"));
        assert!(answer.intent_analysis.is_some());
    }
}
