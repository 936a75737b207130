#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_docs_in_private_items)]
#![allow(clippy::module_name_repetitions)]

//! # Memory Engine
//!
//! A multi-tier, persistent memory substrate for an AI assistant:
//! episodic/semantic/procedural/prospective records, long-term fact decay,
//! a rolling conversation buffer, a knowledge graph, and cross-tier active
//! retrieval with prompt augmentation.
//!
//! ## Module Organization
//!
//! - [`record`]: episodic, semantic, procedural and prospective records
//!   with importance scoring, time decay, hash-embedding semantic search
//!   and pattern detection
//! - [`longterm`]: strength-keyed facts with exponential decay and
//!   reinforcement-on-recall
//! - [`shortterm`]: a bounded rolling buffer of recent interaction
//!   fragments
//! - [`graph`]: an in-memory knowledge graph with entity merge,
//!   relationship edges, and hybrid (exact/fuzzy/keyword) search
//! - [`conversation`]: fact extraction, summarization, and preference
//!   tracking over the active conversation
//! - [`retriever`]: fans a query out across every tier, merges confidence,
//!   reranks, dedups and renders a context block
//! - [`augmenter`]: the injection gate that decides whether and how to
//!   fold retrieved context into a prompt
//! - [`project_memory`]: the flat, project-scoped note list
//! - [`engine`]: [`engine::MemoryEngine`], the composition root that owns
//!   one instance of every store
//!
//! ## Quick Start
//!
//! ```no_run
//! use memory_engine::engine::MemoryEngine;
//! use memory_engine::paths::AppPaths;
//!
//! #[tokio::main]
//! async fn main() {
//!     let paths = AppPaths::default_for("my-assistant");
//!     let engine = MemoryEngine::with_defaults(&paths);
//!     engine.spawn_background_tasks();
//!
//!     let enhanced = engine
//!         .augmenter
//!         .enhance_prompt("how do I deploy this service?", 1, None, None)
//!         .await;
//!
//!     if enhanced.has_injected_context {
//!         println!("{}", enhanced.prompt);
//!     }
//!
//!     engine
//!         .augmenter
//!         .learn_from_exchange(
//!             "how do I deploy this service?",
//!             "run `make deploy`, it pushes to the staging cluster",
//!             "conv-1",
//!             Some(true),
//!         )
//!         .await;
//! }
//! ```
//!
//! ## Error Handling
//!
//! Most functions that can fail return [`Result<T>`] via [`error::Error`].
//! External failures (LLM calls, disk I/O) are absorbed behind
//! deterministic fallbacks wherever the design calls for one — see each
//! module's own documentation for its specific fallback behavior. Nothing
//! in this crate panics on a store's steady-state path; `unwrap`/`expect`
//! are confined to tests.
//!
//! ## Concurrency Model
//!
//! Every store wraps its state in a `tokio::sync::RwLock`: callers may
//! issue concurrent requests freely, but each store serializes its own
//! mutations internally. Stores share no locks with each other, so a slow
//! call against one tier never blocks another.

pub mod augmenter;
pub mod constants;
pub mod conversation;
pub mod engine;
pub mod error;
pub mod events;
pub mod graph;
pub mod llm;
pub mod longterm;
pub mod paths;
pub mod persist;
pub mod project_memory;
pub mod record;
pub mod retriever;
pub mod shortterm;
pub mod textutil;
pub mod types;

pub use engine::{EngineDependencies, HealthReport, MemoryEngine};
pub use error::{Error, Result};
