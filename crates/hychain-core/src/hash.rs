//! Digest primitives: `HashEntity` and `hash_data`.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::error::{ChainError, Result};

/// Digest algorithms supported by the chain core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    Sha256,
    #[default]
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// Canonical name of the algorithm.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "SHA256",
            Self::Sha384 => "SHA384",
            Self::Sha512 => "SHA512",
        }
    }

    /// Digest output length in bytes.
    pub fn digest_length(&self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }
}

/// Text envelopes for byte sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Hex,
    Base64,
}

impl TextEncoding {
    /// Encode bytes under this envelope.
    pub fn encode(&self, bytes: &[u8]) -> String {
        match self {
            Self::Hex => hex::encode(bytes),
            Self::Base64 => BASE64.encode(bytes),
        }
    }

    /// Decode a text envelope back to bytes.
    pub fn decode(&self, text: &str) -> Result<Bytes> {
        match self {
            Self::Hex => hex::decode(text)
                .map(Bytes::from)
                .map_err(|e| ChainError::InvalidType(format!("invalid hex input: {e}"))),
            Self::Base64 => BASE64
                .decode(text)
                .map(Bytes::from)
                .map_err(|e| ChainError::InvalidType(format!("invalid base64 input: {e}"))),
        }
    }
}

/// HMAC keys longer than this are truncated before use.
const MAX_HMAC_KEY_LEN: usize = 64;

/// Immutable digest or signature bytes with a read cursor.
///
/// Equality is byte-exact and ignores the cursor. Cloning yields an
/// independent cursor over the same bytes.
#[derive(Clone)]
pub struct HashEntity {
    data: Option<Bytes>,
    cursor: usize,
}

impl HashEntity {
    /// Own the given bytes.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: Some(data.into()),
            cursor: 0,
        }
    }

    /// An entity over the empty byte sequence.
    pub fn empty() -> Self {
        Self::new(Bytes::new())
    }

    fn data(&self) -> Result<&Bytes> {
        self.data
            .as_ref()
            .ok_or_else(|| ChainError::ResourceDisposed("access on disposed hash entity".into()))
    }

    /// Length of the underlying bytes.
    pub fn byte_length(&self) -> Result<usize> {
        Ok(self.data()?.len())
    }

    /// The full underlying bytes.
    pub fn buffer(&self) -> Result<Bytes> {
        Ok(self.data()?.clone())
    }

    /// Text form of the bytes; hex by default.
    pub fn digest(&self, encoding: Option<TextEncoding>) -> Result<String> {
        let data = self.data()?;
        Ok(encoding.unwrap_or(TextEncoding::Hex).encode(data))
    }

    /// Read the next `n` bytes (all remaining when omitted), advancing the
    /// cursor. Reading past the end fails with `ERR_END_OF_STREAM`.
    pub fn read(&mut self, n: Option<usize>) -> Result<Bytes> {
        let data = self.data()?.clone();
        let remaining = data.len() - self.cursor;
        let n = n.unwrap_or(remaining);
        if n > remaining {
            return Err(ChainError::EndOfStream(format!(
                "requested {n} bytes with {remaining} remaining"
            )));
        }
        let slice = data.slice(self.cursor..self.cursor + n);
        self.cursor += n;
        Ok(slice)
    }

    /// Release the bytes. Idempotent.
    pub fn dispose(&mut self) {
        self.data = None;
    }

    /// Whether the entity has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.data.is_none()
    }
}

impl PartialEq for HashEntity {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for HashEntity {}

impl fmt::Debug for HashEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            Some(data) => {
                let preview = hex::encode(&data[..data.len().min(8)]);
                write!(f, "HashEntity({preview}..., {} bytes)", data.len())
            }
            None => write!(f, "HashEntity(disposed)"),
        }
    }
}

/// Digest `data` under `algorithm`. With a key, computes an HMAC keyed with
/// the first 64 bytes of the key instead.
pub fn hash_data(
    data: &[u8],
    algorithm: HashAlgorithm,
    key: Option<&[u8]>,
) -> Result<HashEntity> {
    let bytes: Vec<u8> = match key {
        None => match algorithm {
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        },
        Some(key) => {
            let key = &key[..key.len().min(MAX_HMAC_KEY_LEN)];
            match algorithm {
                HashAlgorithm::Sha256 => {
                    let mut mac = Hmac::<Sha256>::new_from_slice(key)
                        .map_err(|e| ChainError::InvalidArgument(format!("invalid HMAC key: {e}")))?;
                    mac.update(data);
                    mac.finalize().into_bytes().to_vec()
                }
                HashAlgorithm::Sha384 => {
                    let mut mac = Hmac::<Sha384>::new_from_slice(key)
                        .map_err(|e| ChainError::InvalidArgument(format!("invalid HMAC key: {e}")))?;
                    mac.update(data);
                    mac.finalize().into_bytes().to_vec()
                }
                HashAlgorithm::Sha512 => {
                    let mut mac = Hmac::<Sha512>::new_from_slice(key)
                        .map_err(|e| ChainError::InvalidArgument(format!("invalid HMAC key: {e}")))?;
                    mac.update(data);
                    mac.finalize().into_bytes().to_vec()
                }
            }
        }
    };
    Ok(HashEntity::new(bytes))
}
