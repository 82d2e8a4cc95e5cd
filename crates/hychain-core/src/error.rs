//! Error taxonomy for the HyChain workspace.
//!
//! The taxonomy is closed: every failure in the codec, crypto, storage and
//! pipeline layers maps onto one of the variants below. Each variant has a
//! stable name and numeric code; the wire representation of a code is its
//! negated absolute value.

use thiserror::Error;

/// The shared error type for every crate in the workspace.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("unknown error: {0}")]
    Unknown(String),

    #[error("invalid chunk: {0}")]
    InvalidChunk(String),

    #[error("resource disposed: {0}")]
    ResourceDisposed(String),

    #[error("end of stream: {0}")]
    EndOfStream(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("token cancelled: {0}")]
    TokenCancelled(String),

    #[error("crypto key too short: {0}")]
    CryptoKeyShort(String),

    #[error("magic number missmatch: {0}")]
    MagicNumberMissmatch(String),

    #[error("invalid bit flag: {0}")]
    InvalidBitflag(String),

    #[error("stream closed: {0}")]
    StreamClosed(String),

    #[error("invalid type: {0}")]
    InvalidType(String),

    #[error("missing object: {0}")]
    MissingObject(String),
}

impl ChainError {
    /// Stable name of the error kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unknown(_) => "UNKNOWN_ERROR",
            Self::InvalidChunk(_) => "ERR_INVALID_CHUNK",
            Self::ResourceDisposed(_) => "ERR_RESOURCE_DISPOSED",
            Self::EndOfStream(_) => "ERR_END_OF_STREAM",
            Self::UnsupportedOperation(_) => "ERR_UNSUPPORTED_OPERATION",
            Self::NotImplemented(_) => "ERR_NOT_IMPLEMENTED",
            Self::InvalidArgument(_) => "ERR_INVALID_ARGUMENT",
            Self::TokenCancelled(_) => "ERR_TOKEN_CANCELLED",
            Self::CryptoKeyShort(_) => "ERR_CRYPTO_KEY_SHORT",
            Self::MagicNumberMissmatch(_) => "ERR_MAGIC_NUMBER_MISSMATCH",
            Self::InvalidBitflag(_) => "ERR_INVALID_BITFLAG",
            Self::StreamClosed(_) => "ERR_STREAM_CLOSED",
            Self::InvalidType(_) => "ERR_INVALID_TYPE",
            Self::MissingObject(_) => "ERR_MISSING_OBJECT",
        }
    }

    /// Numeric code of the error kind.
    pub fn code(&self) -> i32 {
        match self {
            Self::Unknown(_) => 1087,
            Self::InvalidChunk(_) => 1083,
            Self::ResourceDisposed(_) => 1043,
            Self::EndOfStream(_) => 10392,
            Self::UnsupportedOperation(_) => 1079,
            Self::NotImplemented(_) => 1078,
            Self::InvalidArgument(_) => 1081,
            Self::TokenCancelled(_) => 1053,
            Self::CryptoKeyShort(_) => 10382,
            Self::MagicNumberMissmatch(_) => 10878,
            Self::InvalidBitflag(_) => 11854,
            Self::StreamClosed(_) => 1123,
            Self::InvalidType(_) => 1185,
            Self::MissingObject(_) => 1179,
        }
    }

    /// Code as it appears on the wire.
    pub fn wire_code(&self) -> i32 {
        -self.code().abs()
    }

    /// The free-form message attached at the failure site.
    pub fn message(&self) -> &str {
        match self {
            Self::Unknown(m)
            | Self::InvalidChunk(m)
            | Self::ResourceDisposed(m)
            | Self::EndOfStream(m)
            | Self::UnsupportedOperation(m)
            | Self::NotImplemented(m)
            | Self::InvalidArgument(m)
            | Self::TokenCancelled(m)
            | Self::CryptoKeyShort(m)
            | Self::MagicNumberMissmatch(m)
            | Self::InvalidBitflag(m)
            | Self::StreamClosed(m)
            | Self::InvalidType(m)
            | Self::MissingObject(m) => m,
        }
    }
}

/// Result type for chain operations.
pub type Result<T> = std::result::Result<T, ChainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_taxonomy() {
        let cases: Vec<(ChainError, &str, i32)> = vec![
            (ChainError::Unknown("x".into()), "UNKNOWN_ERROR", 1087),
            (ChainError::InvalidChunk("x".into()), "ERR_INVALID_CHUNK", 1083),
            (ChainError::ResourceDisposed("x".into()), "ERR_RESOURCE_DISPOSED", 1043),
            (ChainError::EndOfStream("x".into()), "ERR_END_OF_STREAM", 10392),
            (ChainError::UnsupportedOperation("x".into()), "ERR_UNSUPPORTED_OPERATION", 1079),
            (ChainError::NotImplemented("x".into()), "ERR_NOT_IMPLEMENTED", 1078),
            (ChainError::InvalidArgument("x".into()), "ERR_INVALID_ARGUMENT", 1081),
            (ChainError::TokenCancelled("x".into()), "ERR_TOKEN_CANCELLED", 1053),
            (ChainError::CryptoKeyShort("x".into()), "ERR_CRYPTO_KEY_SHORT", 10382),
            (ChainError::MagicNumberMissmatch("x".into()), "ERR_MAGIC_NUMBER_MISSMATCH", 10878),
            (ChainError::InvalidBitflag("x".into()), "ERR_INVALID_BITFLAG", 11854),
            (ChainError::StreamClosed("x".into()), "ERR_STREAM_CLOSED", 1123),
            (ChainError::InvalidType("x".into()), "ERR_INVALID_TYPE", 1185),
            (ChainError::MissingObject("x".into()), "ERR_MISSING_OBJECT", 1179),
        ];

        for (err, name, code) in cases {
            assert_eq!(err.name(), name);
            assert_eq!(err.code(), code);
            assert_eq!(err.wire_code(), -code);
        }
    }

    #[test]
    fn test_message_is_preserved() {
        let err = ChainError::MissingObject("leaf not present".into());
        assert_eq!(err.message(), "leaf not present");
        assert!(err.to_string().contains("leaf not present"));
    }
}
