//! Per-user RAG document backend.
//!
//! Users upload documents which are chunked, embedded, and stored in an
//! isolated per-user vector collection; chat queries retrieve relevant
//! chunks and feed them, with conversation history, to a language model.

pub mod chat;
pub mod core;
pub mod history;
pub mod ingest;
pub mod jobs;
pub mod llm;
pub mod rag;
pub mod server;
pub mod state;
