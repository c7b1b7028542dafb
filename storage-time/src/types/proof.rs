//! Proof packages and content hashing.
//!
//! A [`ProofPackage`] is produced once per time slot by the prover. It is
//! chained to its predecessor through `prev_hash`, which must equal the
//! predecessor's [`ProofHash`]:
//!
//! ```text
//! packages[i].prev_hash == packages[i - 1].content_hash()
//! packages[0].prev_hash == 0x00..00
//! ```
//!
//! Two canonical encodings matter here. The *signing message* covers only
//! the five enclave-attested fields; the *content hash* covers the whole
//! package. Both are produced with [`bincode`] v2 in little-endian,
//! fixed-width mode (see [`super::canonical_config`]), so every field is
//! written at a fixed offset and width.

use serde::{Deserialize, Serialize};

use super::{Challenge, EnclaveSignature, HASH_LEN, Hash256, canonical_config};
use crate::merkle::MerklePath;

/// Context string for the BLAKE3 derive-key mode used by content hashes.
///
/// This keeps the content-hash family apart from the SHA-256 Merkle / block
/// family even for identical input bytes.
pub const CONTENT_HASH_CONTEXT: &str = "storage-time 2025-01 proof package content hash v1";

/// Length of the signing message: `u64 + u64 + u32 + f64 + [u8; 32]`.
pub const SIGNING_MESSAGE_LEN: usize = 8 + 8 + 4 + 8 + HASH_LEN;

/// Strongly-typed content hash of a [`ProofPackage`].
///
/// Used as the chaining pointer (`prev_hash`) and as the leaf type of
/// segment Merkle trees.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ProofHash(pub Hash256);

impl ProofHash {
    /// Predecessor pointer of slot 0.
    pub const GENESIS: ProofHash = ProofHash(Hash256::ZERO);

    /// Computes a content hash over already-canonical bytes.
    pub fn compute(canonical: &[u8]) -> Self {
        ProofHash(Hash256(blake3::derive_key(CONTENT_HASH_CONTEXT, canonical)))
    }

    pub fn as_hash(&self) -> &Hash256 {
        &self.0
    }
}

/// Fields attested by the enclave signature, in signing order.
#[derive(Serialize)]
struct SignedFields<'a> {
    time_slot_id: u64,
    t_start: u64,
    t_slot: u32,
    rep_snapshot: f64,
    random_r: &'a Challenge,
}

/// Builds the canonical message the enclave signs for one slot.
///
/// Layout: `time_slot_id (u64) || t_start (u64) || t_slot (u32) ||
/// rep_snapshot (f64) || random_r ([u8; 32])`, little-endian.
///
/// # Panics
///
/// Panics if encoding fails, which cannot happen for these field types.
pub fn signing_message(
    time_slot_id: u64,
    t_start: u64,
    t_slot: u32,
    rep_snapshot: f64,
    random_r: &Challenge,
) -> Vec<u8> {
    let fields = SignedFields {
        time_slot_id,
        t_start,
        t_slot,
        rep_snapshot,
        random_r,
    };
    bincode::serde::encode_to_vec(&fields, canonical_config())
        .expect("signed fields are always encodable")
}

/// One slot's storage proof.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProofPackage {
    /// Slot identifier, strictly increasing per node, starting at 0.
    pub time_slot_id: u64,
    /// Content hash of the previous package; all-zero for slot 0.
    pub prev_hash: ProofHash,
    /// Node reputation when the package was built, in `[0, 1]`.
    pub rep_snapshot: f64,
    /// Slot length in whole seconds, derived from `rep_snapshot`.
    pub t_slot: u32,
    /// Challenge randomness.
    pub random_r: Challenge,
    /// Challenged block: first four bytes of `random_r` mod block count.
    pub challenge_idx: u32,
    /// Encoded inclusion path of the challenged block, leaf to root.
    ///
    /// Each level is `sibling (32 bytes) || side (1 byte)`, see
    /// [`MerklePath::encode`].
    pub merkle_path: Vec<u8>,
    /// Enclave signature over [`ProofPackage::signing_message`].
    pub enclave_sig: EnclaveSignature,
    /// Slot start, in milliseconds since the Unix epoch.
    pub t_start: u64,
}

impl ProofPackage {
    /// Returns the message covered by `enclave_sig`.
    pub fn signing_message(&self) -> Vec<u8> {
        signing_message(
            self.time_slot_id,
            self.t_start,
            self.t_slot,
            self.rep_snapshot,
            &self.random_r,
        )
    }

    /// Returns the canonical byte representation of the full package.
    ///
    /// # Panics
    ///
    /// Panics if encoding fails. All fields are plain data, so this is
    /// considered a programming error.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        bincode::serde::encode_to_vec(self, canonical_config())
            .expect("ProofPackage should always be encodable")
    }

    /// Computes the content hash used for chaining and segment roots.
    pub fn content_hash(&self) -> ProofHash {
        ProofHash::compute(&self.canonical_bytes())
    }

    /// Decodes `merkle_path`, or `None` if it is malformed.
    pub fn path(&self) -> Option<MerklePath> {
        MerklePath::decode(&self.merkle_path)
    }

    /// Start of the following slot, in milliseconds.
    pub fn next_slot_start(&self) -> u64 {
        self.t_start
            .saturating_add(u64::from(self.t_slot).saturating_mul(1000))
    }

    /// Returns `true` if `self` directly follows `prev` in a hash chain.
    pub fn follows(&self, prev: &ProofPackage) -> bool {
        self.prev_hash == prev.content_hash()
            && prev.time_slot_id.checked_add(1) == Some(self.time_slot_id)
    }
}
