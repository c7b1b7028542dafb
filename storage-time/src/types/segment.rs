//! Segment credentials.

use serde::{Deserialize, Serialize};

use super::{AnchorHash, Hash256};

/// Aggregate credential for a contiguous run of slots sharing a
/// reputation band.
///
/// A segment is closed when the node's reputation drifts more than
/// `delta_rep` away from the reputation at the start of the run. The
/// credential commits to every package of the run through `seg_root` and
/// pins both ends of the run through `anchor_hash`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentCredential {
    /// Lower bound of the reputation band.
    pub rep_low: f64,
    /// Upper bound of the reputation band.
    pub rep_high: f64,
    /// First slot id covered (inclusive).
    pub epoch_start: u64,
    /// Last slot id covered (inclusive).
    pub epoch_end: u64,
    /// Merkle root over the content hashes of the run, in slot order.
    pub seg_root: Hash256,
    /// Content hash of the first package followed by that of the last.
    pub anchor_hash: AnchorHash,
}

impl SegmentCredential {
    /// Number of slots covered, or `None` if the epoch bounds are inverted.
    pub fn slot_count(&self) -> Option<u64> {
        self.epoch_end
            .checked_sub(self.epoch_start)
            .and_then(|d| d.checked_add(1))
    }

    /// Midpoint of the reputation band.
    pub fn rep_midpoint(&self) -> f64 {
        (self.rep_low + self.rep_high) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HASH_LEN;

    fn dummy_credential(start: u64, end: u64) -> SegmentCredential {
        SegmentCredential {
            rep_low: 0.4,
            rep_high: 0.6,
            epoch_start: start,
            epoch_end: end,
            seg_root: Hash256([1u8; HASH_LEN]),
            anchor_hash: AnchorHash([2u8; 2 * HASH_LEN]),
        }
    }

    #[test]
    fn slot_count_is_inclusive() {
        assert_eq!(dummy_credential(0, 4).slot_count(), Some(5));
        assert_eq!(dummy_credential(7, 7).slot_count(), Some(1));
        assert_eq!(dummy_credential(5, 4).slot_count(), None);
    }

    #[test]
    fn midpoint_of_band() {
        let c = dummy_credential(0, 0);
        assert!((c.rep_midpoint() - 0.5).abs() < 1e-12);
    }
}
