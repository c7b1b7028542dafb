//! Encrypted storage blocks.
//!
//! The data owner chunks and encrypts the file (AES-GCM) before handing it
//! to the storage node; that step is external to this crate. What the
//! protocol needs is the block's *leaf digest*: the digest of the
//! ciphertext envelope, never of the plaintext.

use serde::{Deserialize, Serialize};

use super::Hash256;

/// Length of the AES-GCM initialisation vector, in bytes.
pub const IV_LEN: usize = 12;

/// Length of the AES-GCM authentication tag, in bytes.
pub const TAG_LEN: usize = 16;

/// An immutable encrypted block as held by a storage node.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct EncryptedBlock {
    /// AES-GCM ciphertext.
    pub ciphertext: Vec<u8>,
    /// 96-bit initialisation vector.
    pub iv: [u8; IV_LEN],
    /// 128-bit authentication tag.
    pub auth_tag: [u8; TAG_LEN],
}

impl EncryptedBlock {
    pub fn new(ciphertext: Vec<u8>, iv: [u8; IV_LEN], auth_tag: [u8; TAG_LEN]) -> Self {
        Self {
            ciphertext,
            iv,
            auth_tag,
        }
    }

    /// Computes the Merkle leaf digest of this block.
    ///
    /// `SHA-256(iv || ciphertext || auth_tag)`, from the block-leaf hash
    /// family.
    pub fn leaf_digest(&self) -> Hash256 {
        let mut data = Vec::with_capacity(IV_LEN + self.ciphertext.len() + TAG_LEN);
        data.extend_from_slice(&self.iv);
        data.extend_from_slice(&self.ciphertext);
        data.extend_from_slice(&self.auth_tag);
        Hash256::sha256(&data)
    }
}
