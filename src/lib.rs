//! # docpipe
//!
//! Document ingestion and retrieval over a vector index.
//!
//! The crate is organized around two pipelines that share an embedding
//! provider and a vector index backend:
//!
//! - [`ingest::IngestionPipeline`] enumerates documents from a source
//!   directory, embeds each one, upserts it into a collection, and moves
//!   the file into an archive directory once it is durably indexed.
//! - [`retrieve::RetrievalPipeline`] embeds a query, searches an existing
//!   collection, and optionally synthesizes an answer from the hits.
//!
//! Both pipelines go through the [`store::VectorIndex`] trait, so the
//! Qdrant backend and the in-memory backend used by tests are
//! interchangeable. [`server`] exposes the pipelines over HTTP.

pub mod config;
pub mod embed;
pub mod error;
pub mod ingest;
pub mod retrieve;
pub mod server;
pub mod store;
pub mod synthesis;

pub use config::AppConfig;
pub use error::PipelineError;
pub use ingest::{IngestionPipeline, IngestionSummary};
pub use retrieve::{QueryOutcome, RetrievalMode, RetrievalPipeline};
pub use store::{CollectionManager, DistanceMetric, VectorIndex};
