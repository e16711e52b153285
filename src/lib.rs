//! # Careline
//!
//! A local retrieval-augmented generation assistant for healthcare documents.
//!
//! Careline ingests a folder of patient-education materials (`.txt`/`.md`),
//! cuts them into overlapping character chunks, embeds the chunks with the
//! OpenAI embeddings API, and stores them in a flat local vector index. At
//! question time it embeds the query, retrieves the nearest chunks, and asks
//! a chat model to answer grounded in those excerpts under a conservative
//! healthcare safety prompt.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────┐   ┌─────────────┐
//! │ Documents │──▶│ Chunk + Embed │──▶│ Flat index   │
//! │ .txt/.md  │   │  (build)      │   │ + metadata  │
//! └───────────┘   └──────────────┘   └──────┬──────┘
//!                                           │
//!                          ┌────────────────┤
//!                          ▼                ▼
//!                    ┌──────────┐     ┌──────────┐
//!                    │ retrieve │────▶│ generate │
//!                    │ (search) │     │ (ask/chat)│
//!                    └──────────┘     └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! careline build                 # ingest, embed, write the index
//! careline search "dehydration"  # inspect retrieval
//! careline ask "What are signs of dehydration?"
//! careline chat                  # interactive shell
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Core data types |
//! | [`chunk`] | Overlapping character-window chunking |
//! | [`ingest`] | Document loading and index construction |
//! | [`openai`] | Shared OpenAI HTTP client with retry |
//! | [`embedding`] | Embedding backend abstraction |
//! | [`index`] | Flat vector index and its binary file format |
//! | [`store`] | Paired index + metadata persistence |
//! | [`retrieve`] | Query embedding and nearest-chunk lookup |
//! | [`generate`] | Safety prompt, chat backend, answer engine |
//! | [`shell`] | Interactive shell and one-shot `ask` |

pub mod chunk;
pub mod config;
pub mod embedding;
pub mod generate;
pub mod index;
pub mod ingest;
pub mod models;
pub mod openai;
pub mod retrieve;
pub mod shell;
pub mod store;
