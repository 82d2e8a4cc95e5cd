//! Armor envelope: `MAGIC ‖ flag ‖ body`.
//!
//! The envelope protects key material at rest. Flag 0 carries the body as
//! plaintext; flag 1 encrypts it with AES-128-CBC (PKCS#7 padding) under a
//! 32-byte wrapping key split as `[0,16) = master ‖ [16,32) = iv`.

use aes::Aes128;
use bytes::Bytes;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use hychain_core::{ChainError, Result, TextEncoding};

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// The fixed 20-byte armor magic header.
pub const ARMOR_MAGIC: &[u8; 20] = b"HY CHAIN ARMORED KEY";

/// Flag marking a plaintext body.
pub const FLAG_PLAIN: u8 = 0;
/// Flag marking an AES-128-CBC encrypted body.
pub const FLAG_ENCRYPTED: u8 = 1;

/// Minimum length of a wrapping key: 16 master bytes plus 16 IV bytes.
pub const WRAP_KEY_LEN: usize = 32;

/// Input to [`dearmor`]: raw bytes or a text envelope.
pub enum ArmorSource<'a> {
    Bytes(&'a [u8]),
    Text(&'a str),
}

impl<'a> From<&'a [u8]> for ArmorSource<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::Bytes(bytes)
    }
}

impl<'a> From<&'a str> for ArmorSource<'a> {
    fn from(text: &'a str) -> Self {
        Self::Text(text)
    }
}

impl<'a> From<&'a Bytes> for ArmorSource<'a> {
    fn from(bytes: &'a Bytes) -> Self {
        Self::Bytes(bytes.as_ref())
    }
}

/// Split a wrapping key into (master, iv). Fails with
/// `ERR_CRYPTO_KEY_SHORT` when fewer than 32 bytes are supplied.
pub fn parse_armor_key(key: &[u8]) -> Result<([u8; 16], [u8; 16])> {
    if key.len() < WRAP_KEY_LEN {
        return Err(ChainError::CryptoKeyShort(format!(
            "wrapping key requires {WRAP_KEY_LEN} bytes, got {}",
            key.len()
        )));
    }
    let master: [u8; 16] = key[..16].try_into().expect("length checked");
    let iv: [u8; 16] = key[16..32].try_into().expect("length checked");
    Ok((master, iv))
}

/// Wrap `source` in the armor envelope.
///
/// With `encrypted` set, `key` must supply at least 32 bytes of wrapping
/// material and the body is AES-128-CBC ciphertext.
pub fn armor(encrypted: bool, source: &[u8], key: Option<&[u8]>) -> Result<Bytes> {
    let body: Vec<u8> = if encrypted {
        let key = key.ok_or_else(|| {
            ChainError::CryptoKeyShort("encrypted armor requires a wrapping key".into())
        })?;
        let (master, iv) = parse_armor_key(key)?;
        Aes128CbcEnc::new(&master.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(source)
    } else {
        source.to_vec()
    };

    let mut out = Vec::with_capacity(ARMOR_MAGIC.len() + 1 + body.len());
    out.extend_from_slice(ARMOR_MAGIC);
    out.push(if encrypted { FLAG_ENCRYPTED } else { FLAG_PLAIN });
    out.extend_from_slice(&body);
    Ok(out.into())
}

/// Wrap `source` and emit the envelope under a text encoding.
pub fn armor_encoded(
    encrypted: bool,
    source: &[u8],
    key: Option<&[u8]>,
    encoding: TextEncoding,
) -> Result<String> {
    let bytes = armor(encrypted, source, key)?;
    Ok(encoding.encode(&bytes))
}

/// Unwrap an armor envelope back to the original payload.
///
/// Text input is decoded under `input_encoding` when given; otherwise a
/// base64-shaped string is decoded as base64 and anything else is treated
/// as raw bytes.
pub fn dearmor<'a>(
    source: impl Into<ArmorSource<'a>>,
    key: Option<&[u8]>,
    input_encoding: Option<TextEncoding>,
) -> Result<Bytes> {
    let bytes: Bytes = match source.into() {
        ArmorSource::Bytes(b) => Bytes::copy_from_slice(b),
        ArmorSource::Text(text) => match input_encoding {
            Some(encoding) => encoding.decode(text)?,
            None if looks_like_base64(text) => TextEncoding::Base64.decode(text)?,
            None => Bytes::copy_from_slice(text.as_bytes()),
        },
    };

    if bytes.len() < ARMOR_MAGIC.len() + 1 {
        return Err(ChainError::MagicNumberMissmatch(
            "input is shorter than the armor header".into(),
        ));
    }
    if &bytes[..ARMOR_MAGIC.len()] != ARMOR_MAGIC {
        return Err(ChainError::MagicNumberMissmatch(
            "armor magic header not found".into(),
        ));
    }

    let flag = bytes[ARMOR_MAGIC.len()];
    let body = &bytes[ARMOR_MAGIC.len() + 1..];
    match flag {
        FLAG_PLAIN => Ok(Bytes::copy_from_slice(body)),
        FLAG_ENCRYPTED => {
            let key = key.ok_or_else(|| {
                ChainError::CryptoKeyShort("encrypted armor requires a wrapping key".into())
            })?;
            let (master, iv) = parse_armor_key(key)?;
            let plain = Aes128CbcDec::new(&master.into(), &iv.into())
                .decrypt_padded_vec_mut::<Pkcs7>(body)
                .map_err(|_| ChainError::Unknown("armor body decryption failed".into()))?;
            Ok(plain.into())
        }
        other => Err(ChainError::InvalidBitflag(format!(
            "unknown armor flag {other}"
        ))),
    }
}

fn looks_like_base64(text: &str) -> bool {
    !text.is_empty()
        && text.len() % 4 == 0
        && text
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'=')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap_key() -> Vec<u8> {
        let mut key = vec![0x01u8; 16];
        key.extend_from_slice(&[0x02u8; 16]);
        key
    }

    #[test]
    fn test_plain_armor_layout() {
        let armored = armor(false, b"Hello, HyChain!", None).unwrap();
        assert_eq!(&armored[..20], ARMOR_MAGIC);
        assert_eq!(armored[20], FLAG_PLAIN);
        assert_eq!(&armored[21..], b"Hello, HyChain!");
    }

    #[test]
    fn test_plain_roundtrip() {
        let armored = armor(false, b"Hello, HyChain!", None).unwrap();
        let unwrapped = dearmor(armored.as_ref(), None, None).unwrap();
        assert_eq!(unwrapped.as_ref(), b"Hello, HyChain!");
    }

    #[test]
    fn test_encrypted_roundtrip() {
        let key = wrap_key();
        let armored = armor(true, b"Hello, HyChain!", Some(&key)).unwrap();
        assert_eq!(armored[20], FLAG_ENCRYPTED);
        // Ciphertext must not leak the plaintext.
        assert!(!armored
            .windows(b"HyChain".len())
            .skip(21)
            .any(|w| w == b"HyChain"));

        let unwrapped = dearmor(armored.as_ref(), Some(&key), None).unwrap();
        assert_eq!(unwrapped.as_ref(), b"Hello, HyChain!");
    }

    #[test]
    fn test_short_key_rejected() {
        let result = armor(true, b"Hello, HyChain!", Some(b"too-short-key"));
        assert!(matches!(result, Err(ChainError::CryptoKeyShort(_))));
    }

    #[test]
    fn test_unknown_flag_rejected() {
        let mut forged = ARMOR_MAGIC.to_vec();
        forged.push(99);
        forged.extend_from_slice(b"body");
        assert!(matches!(
            dearmor(forged.as_slice(), None, None),
            Err(ChainError::InvalidBitflag(_))
        ));
    }

    #[test]
    fn test_bad_magic_rejected() {
        assert!(matches!(
            dearmor(&b"INVALID_DATA00000000extra"[..], None, None),
            Err(ChainError::MagicNumberMissmatch(_))
        ));
    }

    #[test]
    fn test_text_input_with_explicit_encoding() {
        let key = wrap_key();
        let text = armor_encoded(true, b"secret", Some(&key), TextEncoding::Hex).unwrap();
        let unwrapped = dearmor(text.as_str(), Some(&key), Some(TextEncoding::Hex)).unwrap();
        assert_eq!(unwrapped.as_ref(), b"secret");
    }

    #[test]
    fn test_base64_shaped_text_is_autodetected() {
        let armored = armor(false, b"payload", None).unwrap();
        let text = TextEncoding::Base64.encode(&armored);
        let unwrapped = dearmor(text.as_str(), None, None).unwrap();
        assert_eq!(unwrapped.as_ref(), b"payload");
    }

    #[test]
    fn test_wrong_key_fails_decryption() {
        let key = wrap_key();
        let armored = armor(true, b"secret", Some(&key)).unwrap();
        let mut wrong = key.clone();
        wrong[0] ^= 0xff;
        let result = dearmor(armored.as_ref(), Some(&wrong), None);
        assert!(result.is_err() || result.unwrap().as_ref() != b"secret");
    }

    #[test]
    fn test_empty_body_roundtrip() {
        let armored = armor(false, b"", None).unwrap();
        assert_eq!(armored.len(), 21);
        let unwrapped = dearmor(armored.as_ref(), None, None).unwrap();
        assert!(unwrapped.is_empty());
    }
}
