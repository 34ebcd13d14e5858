//! Patch-partitioned object identifier generation.
//!
//! Concurrent association runs over disjoint sky patches must never hand out the same
//! object id. The caller partitions the sky, assigns each patch a `(patch_id, patch_bits)`
//! pair, and seeds one [`IdFactory`] per run: the patch id occupies the high `patch_bits`
//! bits of every generated `u64`, a per-patch sequence counter the remaining low bits.
//! Runs over different patches therefore draw from disjoint id ranges by construction.

use crate::assoc_errors::AssocError;
use crate::constants::ObjectId;

/// Sequential object-id generator for one sky patch.
///
/// Layout of a generated id, for `patch_bits = b`:
///
/// ```text
/// [ patch_id : b bits ][ sequence : 64 - b bits, starting at 1 ]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdFactory {
    patch_id: u64,
    patch_bits: u8,
    seq: u64,
}

impl IdFactory {
    /// Create a factory for one `(patch_id, patch_bits)` pair.
    ///
    /// Arguments
    /// ---------
    /// * `patch_id`: identifier of the sky patch this run files its objects under
    /// * `patch_bits`: number of high bits reserved for `patch_id`, `1..=63`
    ///
    /// Return
    /// ------
    /// * The factory, or [`AssocError::InvalidIdConfiguration`] if `patch_bits` is out of
    ///   range or `patch_id` does not fit in `patch_bits` bits.
    pub fn new(patch_id: u64, patch_bits: u8) -> Result<Self, AssocError> {
        if patch_bits == 0 || patch_bits > 63 {
            return Err(AssocError::InvalidIdConfiguration(format!(
                "patch_bits must be in 1..=63 (got {patch_bits})"
            )));
        }
        if patch_id >> patch_bits != 0 {
            return Err(AssocError::InvalidIdConfiguration(format!(
                "patch_id {patch_id} does not fit in {patch_bits} bits"
            )));
        }
        Ok(IdFactory {
            patch_id,
            patch_bits,
            seq: 0,
        })
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.seq
    }

    /// Allocate the next object id.
    ///
    /// Return
    /// ------
    /// * The id, or [`AssocError::IdSpaceExhausted`] once the per-patch sequence space of
    ///   `2^(64 - patch_bits) - 1` ids is used up. No wraparound.
    pub fn next_id(&mut self) -> Result<ObjectId, AssocError> {
        let seq_bits = 64 - self.patch_bits;
        let max_seq = (1_u64 << seq_bits) - 1;
        if self.seq >= max_seq {
            return Err(AssocError::IdSpaceExhausted {
                patch_id: self.patch_id,
                patch_bits: self.patch_bits,
            });
        }
        self.seq += 1;
        Ok((self.patch_id << seq_bits) | self.seq)
    }
}

#[cfg(test)]
mod id_factory_test {
    use super::*;

    #[test]
    fn id_layout_places_patch_in_high_bits() {
        let mut factory = IdFactory::new(5, 8).unwrap();
        assert_eq!(factory.next_id().unwrap(), (5_u64 << 56) | 1);
        assert_eq!(factory.next_id().unwrap(), (5_u64 << 56) | 2);
        assert_eq!(factory.issued(), 2);
    }

    #[test]
    fn rejects_bad_patch_configuration() {
        assert!(matches!(
            IdFactory::new(0, 0),
            Err(AssocError::InvalidIdConfiguration(_))
        ));
        assert!(matches!(
            IdFactory::new(0, 64),
            Err(AssocError::InvalidIdConfiguration(_))
        ));
        // 256 needs 9 bits.
        assert!(matches!(
            IdFactory::new(256, 8),
            Err(AssocError::InvalidIdConfiguration(_))
        ));
        assert!(IdFactory::new(255, 8).is_ok());
    }

    #[test]
    fn disjoint_patches_never_collide() {
        let mut a = IdFactory::new(1, 16).unwrap();
        let mut b = IdFactory::new(2, 16).unwrap();
        let ids_a: Vec<_> = (0..100).map(|_| a.next_id().unwrap()).collect();
        let ids_b: Vec<_> = (0..100).map(|_| b.next_id().unwrap()).collect();
        for id in &ids_a {
            assert!(!ids_b.contains(id));
        }
    }

    #[test]
    fn exhaustion_fails_instead_of_wrapping() {
        // 63 patch bits leave a single sequence bit: exactly one id available.
        let mut factory = IdFactory::new(0, 63).unwrap();
        assert_eq!(factory.next_id().unwrap(), 1);
        assert_eq!(
            factory.next_id(),
            Err(AssocError::IdSpaceExhausted {
                patch_id: 0,
                patch_bits: 63
            })
        );
    }
}
