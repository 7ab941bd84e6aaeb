//! Per-user retrieval pipeline: chunking, collection lifecycle, and the
//! vector store gateway.

pub mod chunker;
pub mod gateway;
pub mod index;
pub mod memory;
pub mod qdrant;
pub mod registry;

pub use chunker::{ChunkerConfig, TextChunker};
pub use gateway::{DocumentInput, RetrievedMatch, VectorStoreGateway};
pub use index::{Distance, IndexPoint, ScoredPoint, VectorIndex};
pub use memory::MemoryIndex;
pub use qdrant::QdrantIndex;
pub use registry::{collection_name_for, CollectionRegistry};
