//! # HyChain Keys
//!
//! Key material for the HyChain ledger: the armor envelope that protects
//! keys at rest, the `KeyObject` container with its envelope conversions
//! and region accessors, and the generation factories.
//!
//! ## Key Types
//!
//! - [`KeyObject`] - Owner of key bytes plus their algorithm descriptor
//! - [`Algorithm`] - How to slice a secret key's buffer
//! - [`EntropySource`] - Cancellable random-bytes provider

pub mod algorithm;
pub mod armor;
pub mod entropy;
pub mod key;

pub use algorithm::{Algorithm, KeyDetails, KeyDetailsPatch, KeyKind};
pub use armor::{
    armor, armor_encoded, dearmor, parse_armor_key, ArmorSource, ARMOR_MAGIC, FLAG_ENCRYPTED,
    FLAG_PLAIN, WRAP_KEY_LEN,
};
pub use entropy::{EntropySource, OsEntropy};
pub use key::{
    AsymmetricAlgorithm, AsymmetricInfo, KeyFormat, KeyObject, KeyPairOptions, ARMOR_SECRET_LEN,
    SYMMETRIC_TAIL_LEN,
};
