//! Core domain types used by the protocol
//!
//! This module defines strongly-typed digests, node identifiers, enclave
//! key and signature material, and the protocol artefacts (encrypted
//! blocks, proof packages, segment credentials) shared across the crate.
//! As elsewhere, the goal is to avoid "naked" byte buffers in public APIs
//! and use domain-specific newtypes instead.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use sha2::{Digest, Sha256};

/// Encrypted data blocks and their Merkle leaf digests.
pub mod block;
/// Chained per-slot proof packages.
pub mod proof;
/// Segment credentials folding a run of proof packages.
pub mod segment;

pub use block::EncryptedBlock;
pub use proof::{ProofHash, ProofPackage};
pub use segment::SegmentCredential;

/// Length in bytes of all 256-bit digest types used in this module.
pub const HASH_LEN: usize = 32;

/// Length in bytes of a SEC1 uncompressed P-256 public key.
pub const PUBLIC_KEY_LEN: usize = 65;

/// Length in bytes of a fixed-width (`r || s`) ECDSA P-256 signature.
pub const SIGNATURE_LEN: usize = 64;

/// Strongly-typed 256-bit digest wrapper.
///
/// Which hash function produced the bytes depends on the family: Merkle
/// nodes and block leaves use SHA-256 ([`Hash256::sha256`]), proof-package
/// content hashes use BLAKE3 (see [`ProofHash`]).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Hash256(pub [u8; HASH_LEN]);

impl Hash256 {
    /// The all-zero digest, used as `prev_hash` of slot 0.
    pub const ZERO: Hash256 = Hash256([0u8; HASH_LEN]);

    /// Computes the SHA-256 digest of `data`.
    ///
    /// This is the Merkle / block-leaf hash family.
    pub fn sha256(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(&digest);
        Hash256(out)
    }

    /// Returns the underlying 32-byte digest as a borrowed array.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Returns `true` if every byte is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_LEN]
    }

    /// Parses a hex-encoded 32-byte digest.
    pub fn from_hex(hex_str: &str) -> Option<Self> {
        let bytes = hex::decode(hex_str).ok()?;
        let arr: [u8; HASH_LEN] = bytes.try_into().ok()?;
        Some(Hash256(arr))
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Storage node identifier, as registered in the reputation contract.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        NodeId(id.to_string())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 256-bit challenge randomness drawn inside the enclave (`random_r`).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Challenge(pub [u8; HASH_LEN]);

impl Challenge {
    /// Returns the raw challenge bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }
}

/// Enclave public key: a SEC1 uncompressed P-256 point (`0x04 || X || Y`).
///
/// The type is opaque here; parsing happens when a signature is checked.
#[serde_as]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct EnclavePublicKey(#[serde_as(as = "[_; 65]")] pub [u8; PUBLIC_KEY_LEN]);

impl EnclavePublicKey {
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }
}

/// Enclave signature bytes in fixed-width `r || s` form.
#[serde_as]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct EnclaveSignature(#[serde_as(as = "[_; 64]")] pub [u8; SIGNATURE_LEN]);

impl EnclaveSignature {
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }
}

/// Anchor of a segment: content hash of its first package followed by the
/// content hash of its last package.
#[serde_as]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AnchorHash(#[serde_as(as = "[_; 64]")] pub [u8; 2 * HASH_LEN]);

impl AnchorHash {
    /// Concatenates the first and last content hashes of a segment.
    pub fn from_ends(first: &ProofHash, last: &ProofHash) -> Self {
        let mut out = [0u8; 2 * HASH_LEN];
        out[..HASH_LEN].copy_from_slice(first.0.as_bytes());
        out[HASH_LEN..].copy_from_slice(last.0.as_bytes());
        AnchorHash(out)
    }

    pub fn as_bytes(&self) -> &[u8; 2 * HASH_LEN] {
        &self.0
    }
}

/// Canonical encoding used for every signed or hashed structure.
///
/// Little-endian, fixed-width integers; fixed-size arrays carry no length
/// prefix. Changing this changes every signature and content hash.
pub(crate) fn canonical_config() -> impl bincode::config::Config {
    bincode::config::standard().with_fixed_int_encoding()
}
