use thiserror::Error;

use crate::constants::{Degree, SourceId, VisitId};

/// Crate-wide error type for the association engine and its geometry helpers.
///
/// Every fallible public entry point in `diassoc` returns this enum. A failure is fatal to
/// the call: the engine performs no retries and exposes no partial state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssocError {
    #[error("Invalid association configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid identifier configuration: {0}")]
    InvalidIdConfiguration(String),

    #[error("Object id space exhausted for patch {patch_id} ({patch_bits} patch bits)")]
    IdSpaceExhausted { patch_id: u64, patch_bits: u8 },

    #[error("Invalid sky coordinate: ra = {ra} deg, dec = {dec} deg")]
    InvalidSkyCoordinate { ra: Degree, dec: Degree },

    #[error("Duplicate source key: visit {visit_id}, source {source_id}")]
    DuplicateSourceKey {
        visit_id: VisitId,
        source_id: SourceId,
    },
}
