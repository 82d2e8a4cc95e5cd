//! # HyChain Store
//!
//! Storage interface for the HyChain ledger and the in-memory reference
//! backend. Blocks are dual-indexed: by opaque `_id` and by sequence.

pub mod memory;
pub mod traits;

pub use memory::MemoryStore;
pub use traits::{ChainStore, DisposeCallback};
