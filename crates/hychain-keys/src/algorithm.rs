//! Algorithm descriptors: how a key's underlying buffer is laid out.

use serde::{Deserialize, Serialize};

use hychain_core::{ChainError, Result};

/// The role of a key's material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    /// Symmetric material laid out as master ‖ iv ‖ auth tag ‖ tail.
    Secret,
    /// Opaque DER-encoded public key material.
    Public,
    /// Opaque DER-encoded private key material.
    Private,
}

/// Describes how to slice a secret key's buffer. For public/private kinds
/// the buffer is opaque and only `name` is meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Algorithm {
    pub kind: KeyKind,
    /// Master key length in bytes.
    pub length: usize,
    /// IV length in bytes; zero when the algorithm has no IV.
    #[serde(rename = "ivLength")]
    pub iv_length: usize,
    /// Authentication tag length in bytes; zero when absent.
    #[serde(rename = "authTagLength")]
    pub auth_tag_length: usize,
    pub name: Option<String>,
}

impl Algorithm {
    /// Look up a named secret-key layout.
    pub fn named(name: &str) -> Result<Self> {
        let (length, iv_length, auth_tag_length) = match name {
            "SHA256" | "SHA384" | "SHA512" => (64, 0, 0),
            "AES-CBC-128" => (16, 16, 0),
            "AES-CBC-256" => (32, 16, 0),
            "AES-GCM-128" | "AES-CCM-128" => (16, 12, 16),
            "AES-GCM-256" | "AES-CCM-256" => (32, 12, 16),
            "CHACHA20" => (32, 12, 0),
            other => {
                return Err(ChainError::InvalidType(format!(
                    "unknown algorithm '{other}'"
                )))
            }
        };
        Ok(Self {
            kind: KeyKind::Secret,
            length,
            iv_length,
            auth_tag_length,
            name: Some(name.to_string()),
        })
    }

    /// Descriptor for opaque public key material.
    pub fn public(name: &str) -> Self {
        Self {
            kind: KeyKind::Public,
            length: 0,
            iv_length: 0,
            auth_tag_length: 0,
            name: Some(name.to_string()),
        }
    }

    /// Descriptor for opaque private key material.
    pub fn private(name: &str) -> Self {
        Self {
            kind: KeyKind::Private,
            length: 0,
            iv_length: 0,
            auth_tag_length: 0,
            name: Some(name.to_string()),
        }
    }

    /// Total bytes the declared regions occupy: master ‖ iv ‖ auth tag.
    pub fn layout_length(&self) -> usize {
        self.length + self.iv_length + self.auth_tag_length
    }
}

/// Free-form tags that travel with a key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDetails {
    pub label: String,
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// A partial update to [`KeyDetails`]; unset fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct KeyDetailsPatch {
    pub label: Option<String>,
    pub user_id: Option<String>,
}
