//! Block data model: headers, transaction, and the block record itself.
//!
//! A block carries exactly one transaction. Its identity is protected three
//! ways: the payload's Merkle root in the headers, an Ed25519 signature
//! over the serialized payload, and an ECDSA signature over the canonical
//! form of the whole record, which also links it to the previous block.

use std::collections::BTreeMap;

use chrono::TimeZone as _;
use chrono::Utc;
use serde_json::Value as Json;

use crate::codec::{serialize, ToValue, Value};
use crate::error::Result;
use crate::hash::HashEntity;
use crate::marshal::Marshalled;

/// Current block schema version.
pub const BLOCK_VERSION: u32 = 1;

/// The genesis `previous_hash`: the ASCII character `'0'` repeated 64
/// times. This is a character string, not a zeroed digest.
pub const GENESIS_PREVIOUS_HASH: &[u8; 64] =
    b"0000000000000000000000000000000000000000000000000000000000000000";

/// A hash entity over the genesis previous-hash marker.
pub fn genesis_previous_hash() -> HashEntity {
    HashEntity::new(&GENESIS_PREVIOUS_HASH[..])
}

/// Free-form block annotations; values are restricted to JSON scalars.
pub type Metadata = BTreeMap<String, Json>;

/// Integrity headers of a block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockHeaders {
    /// Milliseconds since the Unix epoch.
    pub ts: u64,
    /// RFC-1123 rendering of `ts` in UTC.
    pub timestamp: String,
    /// Byte length of the serialized transaction payload.
    pub content_length: u32,
    /// Merkle root over the chunked transaction.
    pub merkle_root: HashEntity,
    pub version: u32,
    pub nonce: u32,
}

impl BlockHeaders {
    /// Headers for a fresh block. `content_length` starts at zero and is
    /// assigned once the payload has been serialized.
    pub fn new(ts: u64, merkle_root: HashEntity) -> Self {
        Self {
            ts,
            timestamp: format_utc(ts),
            content_length: 0,
            merkle_root,
            version: BLOCK_VERSION,
            nonce: 0,
        }
    }
}

fn format_utc(ts: u64) -> String {
    match Utc.timestamp_millis_opt(ts as i64).single() {
        Some(dt) => dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
        None => String::new(),
    }
}

/// The unit of user data a block carries. Immutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction<P> {
    pub payload: P,
    pub sequence: u32,
}

impl<P> Transaction<P> {
    pub fn new(payload: P, sequence: u32) -> Self {
        Self { payload, sequence }
    }
}

impl<P: ToValue> Transaction<P> {
    /// The transaction as a marshalled codec value.
    pub fn to_value(&self) -> Value {
        let mut fields = BTreeMap::new();
        fields.insert(
            "payload".to_string(),
            self.payload.to_value().to_marshalled(),
        );
        fields.insert(
            "sequence".to_string(),
            Marshalled::Integer(self.sequence as i64),
        );
        Value::Marshalled(Marshalled::Object(fields))
    }
}

/// A signed, sequenced record in the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Block<P> {
    /// Internal id: timestamp-prefixed random id.
    pub id: String,
    /// Public id: a UUIDv7 with the hyphens removed.
    pub public_block_id: String,
    /// `block_signature` of the predecessor, or the genesis marker.
    pub previous_hash: HashEntity,
    /// Position in the chain, contiguous from zero.
    pub sequence: u32,
    pub transaction: Transaction<P>,
    pub headers: BlockHeaders,
    pub metadata: Metadata,
    /// Ed25519 signature over the serialized payload.
    pub content_signature: HashEntity,
    /// ECDSA-SHA512 signature over the canonical block form.
    pub block_signature: HashEntity,
}

impl<P: ToValue> Block<P> {
    /// Whether this block opens the chain.
    pub fn is_genesis(&self) -> bool {
        self.sequence == 0
    }

    /// The canonical codec value of this block: every field except
    /// `block_signature`, in lexicographic field order. This is the form
    /// the block signature covers.
    pub fn canonical_value(&self) -> Result<Value> {
        let mut headers = BTreeMap::new();
        headers.insert(
            "contentLength".to_string(),
            Marshalled::Integer(self.headers.content_length as i64),
        );
        headers.insert(
            "merkleRoot".to_string(),
            Marshalled::Binary(self.headers.merkle_root.buffer()?),
        );
        headers.insert(
            "nonce".to_string(),
            Marshalled::Integer(self.headers.nonce as i64),
        );
        headers.insert(
            "timestamp".to_string(),
            Marshalled::String(self.headers.timestamp.clone()),
        );
        headers.insert(
            "ts".to_string(),
            Marshalled::Integer(self.headers.ts as i64),
        );
        headers.insert(
            "version".to_string(),
            Marshalled::Integer(self.headers.version as i64),
        );

        let metadata = self
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), Marshalled::from_plain_json(v)))
            .collect();

        let transaction = match self.transaction.to_value() {
            Value::Marshalled(m) => m,
            other => other.to_marshalled(),
        };

        let mut fields = BTreeMap::new();
        fields.insert("_id".to_string(), Marshalled::String(self.id.clone()));
        fields.insert(
            "contentSignature".to_string(),
            Marshalled::Binary(self.content_signature.buffer()?),
        );
        fields.insert("headers".to_string(), Marshalled::Object(headers));
        fields.insert("metadata".to_string(), Marshalled::Object(metadata));
        fields.insert(
            "previousHash".to_string(),
            Marshalled::Binary(self.previous_hash.buffer()?),
        );
        fields.insert(
            "publicBlockId".to_string(),
            Marshalled::String(self.public_block_id.clone()),
        );
        fields.insert(
            "sequence".to_string(),
            Marshalled::Integer(self.sequence as i64),
        );
        fields.insert("transaction".to_string(), transaction);

        Ok(Value::Marshalled(Marshalled::Object(fields)))
    }

    /// The canonical byte stream covered by `block_signature`.
    pub fn canonical_bytes(&self) -> Result<bytes::Bytes> {
        serialize(&self.canonical_value()?)
    }

    /// The serialized payload bytes covered by `content_signature`.
    pub fn payload_bytes(&self) -> Result<bytes::Bytes> {
        serialize(&self.transaction.payload.to_value())
    }
}
