//! Asymmetric and keyed signing dispatcher.
//!
//! `sign` drains a polymorphic byte source into one contiguous buffer and
//! dispatches on the algorithm name. HMAC routes through [`hash_data`] so
//! the key-truncation rule is shared; ECDSA signs the named SHA digest over
//! secp256k1 and emits DER; RSA is PKCS#1 v1.5; Ed25519 emits the 64-byte
//! R‖S form.

use std::str::FromStr;

use bytes::Bytes;
use ed25519_dalek::pkcs8::DecodePrivateKey as _;
use ed25519_dalek::Signer as _;
use k256::ecdsa::signature::hazmat::PrehashSigner as _;
use rsa::pkcs1::DecodeRsaPrivateKey as _;
use rsa::pkcs8::DecodePrivateKey as _;
use rsa::signature::{SignatureEncoding as _, Signer as _};
use sha2::{Digest, Sha256, Sha384, Sha512};
use tokio::sync::mpsc;

use crate::buffer::{ByteReader, ByteWriter};
use crate::cancel::{ensure_active, CancellationToken};
use crate::error::{ChainError, Result};
use crate::hash::{hash_data, HashAlgorithm, HashEntity};

/// Signature algorithms accepted by [`sign`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    HmacSha256,
    HmacSha384,
    HmacSha512,
    EcdsaSha256,
    EcdsaSha384,
    EcdsaSha512,
    RsaSha256,
    RsaSha384,
    RsaSha512,
    Ed25519,
}

impl SignatureAlgorithm {
    /// Canonical wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HmacSha256 => "HMAC-SHA256",
            Self::HmacSha384 => "HMAC-SHA384",
            Self::HmacSha512 => "HMAC-SHA512",
            Self::EcdsaSha256 => "ECDSA-SHA256",
            Self::EcdsaSha384 => "ECDSA-SHA384",
            Self::EcdsaSha512 => "ECDSA-SHA512",
            Self::RsaSha256 => "RSA-SHA256",
            Self::RsaSha384 => "RSA-SHA384",
            Self::RsaSha512 => "RSA-SHA512",
            Self::Ed25519 => "Ed25519",
        }
    }

    fn digest_algorithm(&self) -> Option<HashAlgorithm> {
        match self {
            Self::HmacSha256 | Self::EcdsaSha256 | Self::RsaSha256 => Some(HashAlgorithm::Sha256),
            Self::HmacSha384 | Self::EcdsaSha384 | Self::RsaSha384 => Some(HashAlgorithm::Sha384),
            Self::HmacSha512 | Self::EcdsaSha512 | Self::RsaSha512 => Some(HashAlgorithm::Sha512),
            Self::Ed25519 => None,
        }
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "HMAC-SHA256" => Ok(Self::HmacSha256),
            "HMAC-SHA384" => Ok(Self::HmacSha384),
            "HMAC-SHA512" => Ok(Self::HmacSha512),
            "ECDSA-SHA256" => Ok(Self::EcdsaSha256),
            "ECDSA-SHA384" => Ok(Self::EcdsaSha384),
            "ECDSA-SHA512" => Ok(Self::EcdsaSha512),
            "RSA-SHA256" => Ok(Self::RsaSha256),
            "RSA-SHA384" => Ok(Self::RsaSha384),
            "RSA-SHA512" => Ok(Self::RsaSha512),
            "Ed25519" => Ok(Self::Ed25519),
            other => Err(ChainError::InvalidType(format!(
                "unknown signature algorithm '{other}'"
            ))),
        }
    }
}

/// A source of bytes to be signed: an in-memory buffer, a cursor reader, or
/// a push channel delivering chunks until the sender closes.
pub enum SignSource {
    Buffer(Bytes),
    Reader(ByteReader),
    Channel(mpsc::Receiver<Result<Bytes>>),
}

impl From<Bytes> for SignSource {
    fn from(bytes: Bytes) -> Self {
        Self::Buffer(bytes)
    }
}

impl From<Vec<u8>> for SignSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Buffer(bytes.into())
    }
}

impl From<&[u8]> for SignSource {
    fn from(bytes: &[u8]) -> Self {
        Self::Buffer(Bytes::copy_from_slice(bytes))
    }
}

impl From<&str> for SignSource {
    fn from(text: &str) -> Self {
        Self::Buffer(Bytes::copy_from_slice(text.as_bytes()))
    }
}

impl From<ByteReader> for SignSource {
    fn from(reader: ByteReader) -> Self {
        Self::Reader(reader)
    }
}

impl From<mpsc::Receiver<Result<Bytes>>> for SignSource {
    fn from(rx: mpsc::Receiver<Result<Bytes>>) -> Self {
        Self::Channel(rx)
    }
}

/// Drain a source into one contiguous buffer, observing the token at every
/// suspension point.
pub async fn consume_buffer(source: SignSource, token: &CancellationToken) -> Result<Bytes> {
    ensure_active(token)?;
    match source {
        SignSource::Buffer(bytes) => Ok(bytes),
        SignSource::Reader(mut reader) => {
            let bytes = reader.buffer()?;
            reader.dispose();
            Ok(bytes)
        }
        SignSource::Channel(mut rx) => {
            let mut writer = ByteWriter::new();
            while let Some(chunk) = rx.recv().await {
                ensure_active(token)?;
                match chunk {
                    Ok(bytes) => writer.write(bytes)?,
                    Err(err) => {
                        writer.dispose();
                        return Err(err);
                    }
                }
            }
            writer.drain()
        }
    }
}

/// Sign `source` with `key` under `algorithm`.
///
/// The key is accepted as raw bytes (seed/scalar for Ed25519 and ECDSA),
/// PKCS#8 / PKCS#1 / SEC1 DER, or PEM, depending on the algorithm family.
/// Cancellation is observed after the drain and after signing.
pub async fn sign(
    algorithm: SignatureAlgorithm,
    source: impl Into<SignSource>,
    key: &[u8],
    optimize_for_ed25519: bool,
    token: &CancellationToken,
) -> Result<HashEntity> {
    let message = consume_buffer(source.into(), token).await?;
    ensure_active(token)?;

    let signature: Vec<u8> = match algorithm {
        SignatureAlgorithm::HmacSha256
        | SignatureAlgorithm::HmacSha384
        | SignatureAlgorithm::HmacSha512 => {
            let digest = algorithm
                .digest_algorithm()
                .expect("HMAC algorithms always name a digest");
            hash_data(&message, digest, Some(key))?.buffer()?.to_vec()
        }
        SignatureAlgorithm::EcdsaSha256
        | SignatureAlgorithm::EcdsaSha384
        | SignatureAlgorithm::EcdsaSha512 => {
            let digest = algorithm
                .digest_algorithm()
                .expect("ECDSA algorithms always name a digest");
            ecdsa_sign(&message, digest, key)?
        }
        SignatureAlgorithm::RsaSha256
        | SignatureAlgorithm::RsaSha384
        | SignatureAlgorithm::RsaSha512 => {
            let digest = algorithm
                .digest_algorithm()
                .expect("RSA algorithms always name a digest");
            rsa_sign(&message, digest, key)?
        }
        SignatureAlgorithm::Ed25519 => {
            // Ed25519 has no standard DER signature form; both encodings
            // are the 64-byte R‖S sequence.
            let _ = optimize_for_ed25519;
            let signing_key = parse_ed25519_key(key)?;
            signing_key.sign(&message).to_bytes().to_vec()
        }
    };

    ensure_active(token)?;
    Ok(HashEntity::new(signature))
}

fn digest_message(message: &[u8], algorithm: HashAlgorithm) -> Vec<u8> {
    match algorithm {
        HashAlgorithm::Sha256 => Sha256::digest(message).to_vec(),
        HashAlgorithm::Sha384 => Sha384::digest(message).to_vec(),
        HashAlgorithm::Sha512 => Sha512::digest(message).to_vec(),
    }
}

fn ecdsa_sign(message: &[u8], digest: HashAlgorithm, key: &[u8]) -> Result<Vec<u8>> {
    let signing_key = parse_secp256k1_key(key)?;
    let prehash = digest_message(message, digest);
    let signature: k256::ecdsa::Signature = signing_key
        .sign_prehash(&prehash)
        .map_err(|e| ChainError::Unknown(format!("ECDSA signing failed: {e}")))?;
    Ok(signature.to_der().as_bytes().to_vec())
}

fn rsa_sign(message: &[u8], digest: HashAlgorithm, key: &[u8]) -> Result<Vec<u8>> {
    let private_key = parse_rsa_key(key)?;
    let signature = match digest {
        HashAlgorithm::Sha256 => rsa::pkcs1v15::SigningKey::<Sha256>::new(private_key)
            .try_sign(message)
            .map(|s| s.to_vec()),
        HashAlgorithm::Sha384 => rsa::pkcs1v15::SigningKey::<Sha384>::new(private_key)
            .try_sign(message)
            .map(|s| s.to_vec()),
        HashAlgorithm::Sha512 => rsa::pkcs1v15::SigningKey::<Sha512>::new(private_key)
            .try_sign(message)
            .map(|s| s.to_vec()),
    };
    signature.map_err(|e| ChainError::Unknown(format!("RSA signing failed: {e}")))
}

/// Parse a secp256k1 private key from PEM, PKCS#8 DER, SEC1 DER, or a raw
/// 32-byte scalar (longer raw buffers contribute their first 32 bytes).
pub fn parse_secp256k1_key(key: &[u8]) -> Result<k256::ecdsa::SigningKey> {
    if looks_like_pem(key) {
        let text = std::str::from_utf8(key)
            .map_err(|e| ChainError::InvalidType(format!("invalid PEM text: {e}")))?;
        let secret = k256::SecretKey::from_pkcs8_pem(text)
            .or_else(|_| k256::SecretKey::from_sec1_pem(text))
            .map_err(|e| ChainError::InvalidType(format!("invalid EC PEM key: {e}")))?;
        return Ok(secret.into());
    }
    if let Ok(secret) = k256::SecretKey::from_pkcs8_der(key) {
        return Ok(secret.into());
    }
    if let Ok(secret) = k256::SecretKey::from_sec1_der(key) {
        return Ok(secret.into());
    }
    if key.len() >= 32 {
        let secret = k256::SecretKey::from_slice(&key[..32])
            .map_err(|e| ChainError::InvalidType(format!("invalid secp256k1 scalar: {e}")))?;
        return Ok(secret.into());
    }
    Err(ChainError::InvalidType(
        "secp256k1 key requires at least 32 bytes".into(),
    ))
}

/// Parse an Ed25519 signing key from PEM, PKCS#8 DER, or a raw 32-byte seed
/// (longer raw buffers contribute their first 32 bytes).
pub fn parse_ed25519_key(key: &[u8]) -> Result<ed25519_dalek::SigningKey> {
    if looks_like_pem(key) {
        let text = std::str::from_utf8(key)
            .map_err(|e| ChainError::InvalidType(format!("invalid PEM text: {e}")))?;
        return ed25519_dalek::SigningKey::from_pkcs8_pem(text)
            .map_err(|e| ChainError::InvalidType(format!("invalid Ed25519 PEM key: {e}")));
    }
    if let Ok(signing_key) = ed25519_dalek::SigningKey::from_pkcs8_der(key) {
        return Ok(signing_key);
    }
    if key.len() >= 32 {
        let seed: [u8; 32] = key[..32].try_into().expect("slice length checked");
        return Ok(ed25519_dalek::SigningKey::from_bytes(&seed));
    }
    Err(ChainError::InvalidType(
        "Ed25519 key requires at least 32 bytes".into(),
    ))
}

fn parse_rsa_key(key: &[u8]) -> Result<rsa::RsaPrivateKey> {
    if looks_like_pem(key) {
        let text = std::str::from_utf8(key)
            .map_err(|e| ChainError::InvalidType(format!("invalid PEM text: {e}")))?;
        if let Ok(private_key) = rsa::RsaPrivateKey::from_pkcs8_pem(text) {
            return Ok(private_key);
        }
        return rsa::RsaPrivateKey::from_pkcs1_pem(text)
            .map_err(|e| ChainError::InvalidType(format!("invalid RSA PEM key: {e}")));
    }
    if let Ok(private_key) = rsa::RsaPrivateKey::from_pkcs8_der(key) {
        return Ok(private_key);
    }
    rsa::RsaPrivateKey::from_pkcs1_der(key)
        .map_err(|e| ChainError::InvalidType(format!("invalid RSA key: {e}")))
}

fn looks_like_pem(key: &[u8]) -> bool {
    key.starts_with(b"-----BEGIN")
}
