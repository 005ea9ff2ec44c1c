//! # stratdesk
//!
//! A document-grounded question answering service for business strategy.
//!
//! stratdesk ingests business documents (PDF, DOCX, TXT), classifies and
//! chunks them, indexes chunk embeddings in SQLite, and answers questions
//! grounded in the retrieved chunks via a CLI (`sdesk`) and a JSON HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────────┐   ┌───────────┐
//! │ Upload       │──▶│ Extract+Classify  │──▶│  SQLite    │
//! │ pdf/docx/txt │   │ Chunk+Embed       │   │ docs+vecs │
//! └──────────────┘   └───────────────────┘   └─────┬─────┘
//!                                                  │
//!                          ┌───────────────────────┤
//!                          ▼                       ▼
//!                     ┌──────────┐           ┌──────────┐
//!                     │   CLI    │           │   HTTP   │
//!                     │ (sdesk)  │           │  (JSON)  │
//!                     └──────────┘           └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! sdesk init                          # create database
//! sdesk upload ./reports              # ingest documents
//! sdesk ask "How did revenue develop this year?"
//! sdesk serve api                     # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`extract`] | PDF/DOCX/TXT text extraction |
//! | [`classify`] | Keyword-based document classification |
//! | [`chunk`] | Sentence-boundary-aware chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`completion`] | Chat completion provider abstraction |
//! | [`index`] | SQLite-backed vector index |
//! | [`ingest`] | Upload pipeline |
//! | [`answer`] | Retrieval-augmented answer assembly |
//! | [`history`] | Query history |
//! | [`server`] | JSON HTTP API server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod answer;
pub mod chunk;
pub mod classify;
pub mod completion;
pub mod config;
pub mod db;
pub mod docs;
pub mod embedding;
pub mod extract;
pub mod history;
pub mod index;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod server;
pub mod stats;
