//! Core data models used throughout stratdesk.
//!
//! These types represent the documents, chunks, and retrieval results that
//! flow through the ingestion and answer pipelines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category tag assigned to a document at ingestion time.
///
/// `General` is the fallback when the classifier finds no keyword evidence
/// for any other category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Financial,
    MarketResearch,
    Internal,
    General,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Financial => "financial",
            DocumentType::MarketResearch => "market_research",
            DocumentType::Internal => "internal",
            DocumentType::General => "general",
        }
    }

    /// Parse a stored or user-supplied type label. `"auto"` and `"all"` are
    /// handled by callers and are not valid stored types.
    pub fn parse(s: &str) -> Option<DocumentType> {
        match s {
            "financial" => Some(DocumentType::Financial),
            "market_research" => Some(DocumentType::MarketResearch),
            "internal" => Some(DocumentType::Internal),
            "general" => Some(DocumentType::General),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only metadata derived from extracted text.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentMetadata {
    pub word_count: usize,
    pub character_count: usize,
    pub extracted_at: DateTime<Utc>,
}

impl DocumentMetadata {
    /// Compute metadata from extracted text. Deterministic apart from the
    /// timestamp; whitespace-delimited tokens count as words.
    pub fn compute(text: &str) -> Self {
        Self {
            word_count: text.split_whitespace().count(),
            character_count: text.chars().count(),
            extracted_at: Utc::now(),
        }
    }
}

/// Document row as persisted in SQLite.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub id: i64,
    pub filename: String,
    pub document_type: DocumentType,
    pub word_count: i64,
    pub character_count: i64,
    pub embedding_status: String,
    pub uploaded_at: i64,
}

/// A ranked match returned by the vector index for one query.
///
/// Transient: produced per query, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalHit {
    pub id: String,
    pub score: f64,
    pub text: String,
    pub document_id: i64,
    pub filename: String,
    pub document_type: DocumentType,
    pub chunk_index: i64,
}

/// Best-effort summary of what a query is asking for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentAnalysis {
    pub intent: String,
    pub concepts: String,
    pub relevant_types: String,
}

impl Default for IntentAnalysis {
    /// The fixed fallback used whenever intent analysis is unavailable.
    fn default() -> Self {
        Self {
            intent: "general analysis".to_string(),
            concepts: "business strategy".to_string(),
            relevant_types: "general".to_string(),
        }
    }
}

/// The structured answer produced by the retrieval aggregator.
///
/// Always well-formed: failures inside the aggregator are folded into the
/// `response` text rather than surfaced as errors.
#[derive(Debug, Clone, Serialize)]
pub struct RagAnswer {
    pub response: String,
    /// Source filenames, deduplicated, in first-seen hit order.
    pub sources: Vec<String>,
    /// Mean hit similarity formatted to three decimals, or `"0.0"` when no
    /// hits were found.
    pub confidence_score: String,
    pub chunks_found: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent_analysis: Option<IntentAnalysis>,
}

impl RagAnswer {
    /// The canned terminal answer for a query that matched nothing.
    pub fn no_results(intent: Option<IntentAnalysis>) -> Self {
        Self {
            response: "I couldn't find relevant information in the uploaded documents to \
                       answer your question. Please ensure you have uploaded relevant \
                       documents or try rephrasing your question."
                .to_string(),
            sources: Vec::new(),
            confidence_score: "0.0".to_string(),
            chunks_found: 0,
            intent_analysis: intent,
        }
    }

    /// Fold an aggregation failure into a user-facing answer.
    pub fn from_error(err: &anyhow::Error) -> Self {
        Self {
            response: format!(
                "I encountered an error while processing your question: {}. Please try again.",
                err
            ),
            sources: Vec::new(),
            confidence_score: "0.0".to_string(),
            chunks_found: 0,
            intent_analysis: None,
        }
    }
}

/// Summary returned after a document has been ingested.
#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub document_id: i64,
    pub filename: String,
    pub document_type: DocumentType,
    pub chunks_created: usize,
    pub embedding_status: String,
    pub word_count: usize,
    pub character_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_type_round_trip() {
        for ty in [
            DocumentType::Financial,
            DocumentType::MarketResearch,
            DocumentType::Internal,
            DocumentType::General,
        ] {
            assert_eq!(DocumentType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(DocumentType::parse("auto"), None);
        assert_eq!(DocumentType::parse(""), None);
    }

    #[test]
    fn metadata_counts() {
        let meta = DocumentMetadata::compute("one two  three\nfour");
        assert_eq!(meta.word_count, 4);
        assert_eq!(meta.character_count, 19);
    }

    #[test]
    fn metadata_empty_text() {
        let meta = DocumentMetadata::compute("");
        assert_eq!(meta.word_count, 0);
        assert_eq!(meta.character_count, 0);
    }

    #[test]
    fn no_results_answer_shape() {
        let ans = RagAnswer::no_results(None);
        assert_eq!(ans.confidence_score, "0.0");
        assert_eq!(ans.chunks_found, 0);
        assert!(ans.sources.is_empty());
        assert!(ans.response.contains("couldn't find relevant information"));
    }
}
