//! # HyChain
//!
//! A library for building and persisting a signed, hash-linked,
//! append-only ledger of user-defined records.
//!
//! Every block carries one transaction and is protected three ways: a
//! Merkle root over the chunked payload, an Ed25519 signature over the
//! payload bytes, and an ECDSA signature over the canonical block form
//! that links it to its predecessor.
//!
//! ## Core Invariants
//!
//! 1. **Canonical bytes**: the same block always serializes to the same
//!    byte stream, so signatures are reproducible
//! 2. **Chained signatures**: `previous_hash` equals the predecessor's
//!    `block_signature`; genesis carries the `"0"`×64 character marker
//! 3. **Contiguous sequences**: blocks number from 0 with no gaps
//! 4. **Single writer**: a named mutex serializes commits per chain
//!
//! ## Example
//!
//! ```no_run
//! use hychain::{
//!     Algorithm, BlockFactory, CancellationToken, ChainConfig, KeyDetails, KeyObject,
//!     MemoryStore, OsEntropy, Transaction,
//! };
//!
//! # async fn demo() -> hychain::Result<()> {
//! let token = CancellationToken::new();
//! let mut key = KeyObject::generate_symmetric(
//!     Algorithm::named("SHA512")?,
//!     KeyDetails::default(),
//!     &OsEntropy,
//!     &token,
//! )
//! .await?;
//!
//! let factory = BlockFactory::new(MemoryStore::new(), ChainConfig::default());
//! let genesis = factory
//!     .create_genesis_block(Transaction::new("hello".to_string(), 0), &mut key, None, &token)
//!     .await?;
//! assert!(genesis.is_genesis());
//! # Ok(())
//! # }
//! ```

mod pipeline;

pub use pipeline::{BlockFactory, ChainConfig};

pub use hychain_core::{
    compute_root, create_root, deserialize, deserialize_bytes, ensure_active, generate_proof,
    genesis_previous_hash, hash_data, long_id, now_millis, public_block_id, read_u32_vql,
    serialize, short_id, sign, uuid_v7, validate_block, verify_block, verify_chain, verify_proof,
    write_u32_vql, Block, BlockHeaders,
    ByteReader, ByteWriter, CancellationToken, ChainError, HashAlgorithm, HashEntity,
    LockRegistry, Marshalled, Metadata, ProofStep, Result, Side, SignSource, SignatureAlgorithm,
    TextEncoding, ToValue, Transaction, Value, BLOCK_VERSION, CHUNK_SIZE, GENESIS_PREVIOUS_HASH,
};
pub use hychain_keys::{
    armor, armor_encoded, dearmor, Algorithm, ArmorSource, AsymmetricAlgorithm, EntropySource,
    KeyDetails, KeyDetailsPatch, KeyFormat, KeyKind, KeyObject, KeyPairOptions, OsEntropy,
    ARMOR_MAGIC,
};
pub use hychain_store::{ChainStore, DisposeCallback, MemoryStore};
