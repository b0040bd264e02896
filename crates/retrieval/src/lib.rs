//! lai-rag Retrieval Library
//!
//! Read path consumed by the HTTP layer:
//! - Immutable corpus repository with the protocol → recursos cross-reference
//! - Priority-ordered query router (exact IDs, keyword, similarity)
//! - Vector search engine over the pedido/recurso collections
//! - Context assembler rendering bounded text plus structured sources
//!
//! Everything here is read-only after construction; any number of queries may
//! run in parallel over the same shared state without locking.

mod assembler;
mod engine;
mod repository;
mod router;

pub use assembler::{AssemblerOptions, ContextAssembler, SourceRecord};
pub use engine::SearchEngine;
pub use repository::CorpusRepository;
pub use router::{classify_route, Route};
