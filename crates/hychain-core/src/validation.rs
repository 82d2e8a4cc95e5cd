//! Block validation: structural checks and signature verification.

use sha2::{Digest, Sha512};

use crate::block::{Block, GENESIS_PREVIOUS_HASH};
use crate::codec::ToValue;
use crate::error::{ChainError, Result};
use crate::merkle::create_root;

/// Validate a block's structure without touching cryptography.
///
/// This is the gate `put_block` applies before committing: ids present,
/// signatures non-empty, headers consistent with the serialized payload,
/// genesis marker correct, metadata restricted to JSON scalars.
pub fn validate_block<P: ToValue>(block: &Block<P>) -> Result<()> {
    if block.id.is_empty() {
        return Err(ChainError::InvalidArgument("block is missing _id".into()));
    }
    if block.public_block_id.is_empty() {
        return Err(ChainError::InvalidArgument(
            "block is missing publicBlockId".into(),
        ));
    }

    if block.content_signature.byte_length()? == 0 {
        return Err(ChainError::InvalidArgument(
            "content signature is empty".into(),
        ));
    }
    if block.block_signature.byte_length()? == 0 {
        return Err(ChainError::InvalidArgument(
            "block signature is empty".into(),
        ));
    }

    let previous = block.previous_hash.buffer()?;
    if block.is_genesis() {
        if previous.as_ref() != &GENESIS_PREVIOUS_HASH[..] {
            return Err(ChainError::InvalidArgument(
                "genesis block must carry the zero-character previous hash".into(),
            ));
        }
    } else if previous.is_empty() {
        return Err(ChainError::InvalidArgument(
            "non-genesis block is missing its previous hash".into(),
        ));
    }

    if block.headers.version == 0 {
        return Err(ChainError::InvalidArgument(
            "block version must be at least 1".into(),
        ));
    }
    if block.transaction.sequence != block.sequence {
        return Err(ChainError::InvalidArgument(format!(
            "transaction sequence {} does not match block sequence {}",
            block.transaction.sequence, block.sequence
        )));
    }

    let payload = block.payload_bytes()?;
    if block.headers.content_length as usize != payload.len() {
        return Err(ChainError::InvalidArgument(format!(
            "contentLength {} does not match serialized payload length {}",
            block.headers.content_length,
            payload.len()
        )));
    }

    for (key, value) in &block.metadata {
        if value.is_object() || value.is_array() {
            return Err(ChainError::InvalidType(format!(
                "metadata entry '{key}' must be a JSON scalar"
            )));
        }
    }

    Ok(())
}

/// Verify a block's cryptographic envelope: Merkle root, content signature
/// (Ed25519 over the serialized payload), and block signature (ECDSA-SHA512
/// in DER form over the canonical block bytes).
///
/// `content_key` is an Ed25519 public key (raw 32 bytes or SPKI DER);
/// `block_key` is a secp256k1 public key (SEC1 bytes or SPKI DER).
pub fn verify_block<P: ToValue>(
    block: &Block<P>,
    content_key: &[u8],
    block_key: &[u8],
) -> Result<()> {
    validate_block(block)?;

    let expected_root = create_root(&block.transaction.to_value())?;
    if expected_root != block.headers.merkle_root {
        return Err(ChainError::InvalidArgument(
            "merkle root does not match the transaction".into(),
        ));
    }

    let verifying_key = parse_ed25519_public(content_key)?;
    let payload = block.payload_bytes()?;
    let sig_bytes: [u8; 64] = block
        .content_signature
        .buffer()?
        .as_ref()
        .try_into()
        .map_err(|_| ChainError::InvalidArgument("content signature must be 64 bytes".into()))?;
    let signature = ed25519_dalek::Signature::from_bytes(&sig_bytes);
    use ed25519_dalek::Verifier as _;
    verifying_key
        .verify(&payload, &signature)
        .map_err(|_| ChainError::InvalidArgument("content signature does not verify".into()))?;

    let block_verifying_key = parse_secp256k1_public(block_key)?;
    let canonical = block.canonical_bytes()?;
    let der = block.block_signature.buffer()?;
    let ecdsa_sig = k256::ecdsa::Signature::from_der(&der)
        .map_err(|_| ChainError::InvalidArgument("block signature is not valid DER".into()))?;
    let prehash = Sha512::digest(&canonical);
    use k256::ecdsa::signature::hazmat::PrehashVerifier as _;
    block_verifying_key
        .verify_prehash(&prehash, &ecdsa_sig)
        .map_err(|_| ChainError::InvalidArgument("block signature does not verify".into()))?;

    Ok(())
}

/// Verify chain linkage: sequences contiguous from zero and every
/// `previous_hash` equal to the predecessor's `block_signature`.
///
/// Blocks must be supplied in ascending sequence order.
pub fn verify_chain<P: ToValue>(blocks: &[Block<P>]) -> Result<()> {
    for (position, block) in blocks.iter().enumerate() {
        if block.sequence as usize != position {
            return Err(ChainError::InvalidArgument(format!(
                "expected sequence {position}, found {}",
                block.sequence
            )));
        }
        if position == 0 {
            continue;
        }
        let previous = &blocks[position - 1];
        if block.previous_hash != previous.block_signature {
            return Err(ChainError::InvalidArgument(format!(
                "block {} does not link to its predecessor's signature",
                block.sequence
            )));
        }
    }
    Ok(())
}

/// Parse an Ed25519 public key from raw 32 bytes or SPKI DER.
pub fn parse_ed25519_public(key: &[u8]) -> Result<ed25519_dalek::VerifyingKey> {
    if key.len() == 32 {
        let raw: [u8; 32] = key.try_into().expect("length checked");
        return ed25519_dalek::VerifyingKey::from_bytes(&raw)
            .map_err(|e| ChainError::InvalidType(format!("invalid Ed25519 public key: {e}")));
    }
    use ed25519_dalek::pkcs8::DecodePublicKey as _;
    ed25519_dalek::VerifyingKey::from_public_key_der(key)
        .map_err(|e| ChainError::InvalidType(format!("invalid Ed25519 public key: {e}")))
}

/// Parse a secp256k1 public key from SEC1 bytes or SPKI DER.
pub fn parse_secp256k1_public(key: &[u8]) -> Result<k256::ecdsa::VerifyingKey> {
    if let Ok(verifying_key) = k256::ecdsa::VerifyingKey::from_sec1_bytes(key) {
        return Ok(verifying_key);
    }
    use k256::pkcs8::DecodePublicKey as _;
    k256::PublicKey::from_public_key_der(key)
        .map(|public| public.into())
        .map_err(|e| ChainError::InvalidType(format!("invalid secp256k1 public key: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{genesis_previous_hash, BlockHeaders, Metadata, Transaction};
    use crate::cancel::CancellationToken;
    use crate::hash::HashEntity;
    use crate::ids::{long_id, public_block_id};
    use crate::sign::{sign, SignatureAlgorithm};
    use bytes::Bytes;

    async fn signed_block(seed: [u8; 32]) -> Block<String> {
        let token = CancellationToken::new();
        let transaction = Transaction::new("payload".to_string(), 0);
        let merkle_root = create_root(&transaction.to_value()).unwrap();
        let mut headers = BlockHeaders::new(1736870400000, merkle_root);

        let payload_bytes =
            crate::codec::serialize(&transaction.payload.to_value()).unwrap();
        headers.content_length = payload_bytes.len() as u32;

        let content_signature = sign(
            SignatureAlgorithm::Ed25519,
            payload_bytes.as_ref(),
            &seed,
            true,
            &token,
        )
        .await
        .unwrap();

        let mut block = Block {
            id: long_id(),
            public_block_id: public_block_id(),
            previous_hash: genesis_previous_hash(),
            sequence: 0,
            transaction,
            headers,
            metadata: Metadata::new(),
            content_signature,
            block_signature: HashEntity::empty(),
        };

        let canonical = block.canonical_bytes().unwrap();
        block.block_signature = sign(
            SignatureAlgorithm::EcdsaSha512,
            canonical.as_ref(),
            &seed,
            false,
            &token,
        )
        .await
        .unwrap();
        block
    }

    fn public_keys(seed: [u8; 32]) -> (Vec<u8>, Vec<u8>) {
        let ed = ed25519_dalek::SigningKey::from_bytes(&seed);
        let content_key = ed.verifying_key().to_bytes().to_vec();

        let ec = crate::sign::parse_secp256k1_key(&seed).unwrap();
        let block_key = k256::ecdsa::VerifyingKey::from(&ec)
            .to_sec1_bytes()
            .to_vec();
        (content_key, block_key)
    }

    #[tokio::test]
    async fn test_signed_block_verifies() {
        let seed = [0x42u8; 32];
        let block = signed_block(seed).await;
        let (content_key, block_key) = public_keys(seed);
        verify_block(&block, &content_key, &block_key).unwrap();
    }

    #[tokio::test]
    async fn test_tampered_payload_fails_verification() {
        let seed = [0x42u8; 32];
        let mut block = signed_block(seed).await;
        block.transaction.payload = "tampered".to_string();
        block.headers.content_length = block.payload_bytes().unwrap().len() as u32;
        let (content_key, block_key) = public_keys(seed);
        assert!(verify_block(&block, &content_key, &block_key).is_err());
    }

    #[tokio::test]
    async fn test_tampered_block_signature_fails() {
        let seed = [0x42u8; 32];
        let mut block = signed_block(seed).await;
        block.block_signature = HashEntity::new(Bytes::from(vec![0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x01]));
        let (content_key, block_key) = public_keys(seed);
        assert!(verify_block(&block, &content_key, &block_key).is_err());
    }

    #[tokio::test]
    async fn test_validate_rejects_empty_id() {
        let seed = [0x42u8; 32];
        let mut block = signed_block(seed).await;
        block.id.clear();
        assert!(matches!(
            validate_block(&block),
            Err(ChainError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_validate_rejects_wrong_genesis_marker() {
        let seed = [0x42u8; 32];
        let mut block = signed_block(seed).await;
        block.previous_hash = HashEntity::new(Bytes::from(vec![0u8; 64]));
        assert!(validate_block(&block).is_err());
    }

    #[tokio::test]
    async fn test_validate_rejects_content_length_mismatch() {
        let seed = [0x42u8; 32];
        let mut block = signed_block(seed).await;
        block.headers.content_length += 1;
        assert!(validate_block(&block).is_err());
    }

    #[tokio::test]
    async fn test_validate_rejects_structured_metadata() {
        let seed = [0x42u8; 32];
        let mut block = signed_block(seed).await;
        block
            .metadata
            .insert("nested".to_string(), serde_json::json!({"a": 1}));
        assert!(matches!(
            validate_block(&block),
            Err(ChainError::InvalidType(_))
        ));
    }

    #[tokio::test]
    async fn test_verify_chain_linkage() {
        let seed = [0x42u8; 32];
        let genesis = signed_block(seed).await;

        let mut second = signed_block(seed).await;
        second.sequence = 1;
        second.transaction.sequence = 1;
        second.previous_hash = genesis.block_signature.clone();

        // Broken linkage is caught.
        let mut forged = second.clone();
        forged.previous_hash = HashEntity::new(Bytes::from(vec![0xff; 70]));
        assert!(verify_chain(&[genesis.clone(), forged]).is_err());

        verify_chain(&[genesis, second]).unwrap();
    }

    #[tokio::test]
    async fn test_verify_chain_requires_contiguous_sequences() {
        let seed = [0x42u8; 32];
        let genesis = signed_block(seed).await;
        let mut third = signed_block(seed).await;
        third.sequence = 2;
        third.transaction.sequence = 2;
        third.previous_hash = genesis.block_signature.clone();
        assert!(verify_chain(&[genesis, third]).is_err());
    }
}
