//! Heuristic keyword-based document classifier.
//!
//! Scores each candidate category against the filename and the first part of
//! the document body, never fails, and falls back to [`DocumentType::General`]
//! when nothing matches. The keyword tables are intentionally simple and
//! fixed; the scoring formula is part of the contract and covered by tests.

use crate::models::DocumentType;

/// Only this many leading characters of the content are scanned.
const CONTENT_SAMPLE_CHARS: usize = 1000;

/// Weight applied to a keyword found in the filename.
const FILENAME_WEIGHT: usize = 2;

/// Candidate categories in tie-break order: when two categories reach the
/// same top score, the one listed first wins.
const CATEGORY_KEYWORDS: &[(DocumentType, &[&str])] = &[
    (
        DocumentType::Financial,
        &[
            "revenue",
            "profit",
            "budget",
            "financial",
            "income",
            "expense",
            "balance sheet",
            "cash flow",
            "roi",
            "investment",
        ],
    ),
    (
        DocumentType::MarketResearch,
        &[
            "market",
            "research",
            "survey",
            "analysis",
            "competitor",
            "customer",
            "trend",
            "demographic",
            "segment",
        ],
    ),
    (
        DocumentType::Internal,
        &[
            "employee",
            "hr",
            "human resources",
            "policy",
            "procedure",
            "internal",
            "staff",
            "team",
            "organization",
        ],
    ),
];

/// Classify a document from its filename and extracted text.
///
/// Per-category score: [`FILENAME_WEIGHT`] for each keyword appearing as a
/// substring of the lowercased filename, plus the number of non-overlapping
/// occurrences of the keyword in the first [`CONTENT_SAMPLE_CHARS`] characters
/// of the lowercased content. The strictly highest score wins; all-zero
/// scores yield `General`.
pub fn classify_document(filename: &str, content: &str) -> DocumentType {
    let filename_lower = filename.to_lowercase();
    let sample: String = content
        .to_lowercase()
        .chars()
        .take(CONTENT_SAMPLE_CHARS)
        .collect();

    let mut best = DocumentType::General;
    let mut best_score = 0usize;

    for (category, keywords) in CATEGORY_KEYWORDS {
        let mut score = 0usize;
        for keyword in *keywords {
            if filename_lower.contains(keyword) {
                score += FILENAME_WEIGHT;
            }
            score += sample.matches(keyword).count();
        }

        // Strictly greater: ties keep the earlier category.
        if score > best_score {
            best_score = score;
            best = *category;
        }
    }

    best
}
