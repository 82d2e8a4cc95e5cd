//! # HyChain Core
//!
//! Pure primitives for the HyChain ledger: the canonical wire codec, hash
//! and signing primitives, the Merkle engine, and the block data model.
//!
//! This crate contains no storage and no networking. It is computation over
//! cryptographic data structures, plus the small scoped-resource utilities
//! (buffers, cancellation, named locks) the rest of the workspace shares.
//!
//! ## Key Types
//!
//! - [`Value`] - A value the canonical codec can carry
//! - [`HashEntity`] - Immutable digest or signature bytes
//! - [`Block`] - A signed, sequenced record carrying one transaction
//! - [`ChainError`] - The closed error taxonomy
//!
//! ## Canonicalization
//!
//! Blocks are serialized with a tagged TLV codec over a lexicographically
//! ordered marshalled form. See the [`codec`] and [`marshal`] modules.

pub mod block;
pub mod buffer;
pub mod cancel;
pub mod codec;
pub mod error;
pub mod hash;
pub mod ids;
pub mod locks;
pub mod marshal;
pub mod merkle;
pub mod sign;
pub mod validation;

pub use block::{
    genesis_previous_hash, Block, BlockHeaders, Metadata, Transaction, BLOCK_VERSION,
    GENESIS_PREVIOUS_HASH,
};
pub use buffer::{ByteReader, ByteWriter};
pub use cancel::{ensure_active, CancellationToken};
pub use codec::{
    deserialize, deserialize_bytes, read_u32_vql, serialize, write_u32_vql, ToValue, Value,
};
pub use error::{ChainError, Result};
pub use hash::{hash_data, HashAlgorithm, HashEntity, TextEncoding};
pub use ids::{long_id, now_millis, public_block_id, short_id, uuid_v7};
pub use locks::LockRegistry;
pub use marshal::Marshalled;
pub use merkle::{
    compute_root, create_root, generate_proof, verify_proof, ProofStep, Side, CHUNK_SIZE,
};
pub use sign::{consume_buffer, sign, SignSource, SignatureAlgorithm};
pub use validation::{validate_block, verify_block, verify_chain};
