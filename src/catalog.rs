//! Catalog record types for detections and the objects built from them.
//!
//! Data model
//! -----------------
//! * A [`DiaSource`] is one detection in one visit, keyed by the composite
//!   `(visit_id, source_id)` pair. The association engine reads its coordinate and fills
//!   exactly one field, `dia_object_id`; any further measurement columns stay in the
//!   caller's tables under the same composite key.
//! * A [`DiaObject`] is the persistent entity accumulated from repeated detections of the
//!   same physical source. Its coordinate is the spherical mean of all member detections.
//!   The auxiliary statistics (per-band PSF-flux data counters, proper-motion counter,
//!   nearest-neighbor slots, flags) are carried zero-initialized; downstream stages
//!   populate them.
//! * [`SourceBatch`] adapts columnar in-memory catalog data (parallel slices of ids and
//!   degrees) into `DiaSource` rows.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::assoc_errors::AssocError;
use crate::constants::{Degree, ObjectId, SourceId, VisitId};

/// Photometric band of an observation, in the conventional u, g, r, i, z, y order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Band {
    U,
    G,
    R,
    I,
    Z,
    Y,
}

impl Band {
    /// All bands, in storage order.
    pub const ALL: [Band; 6] = [Band::U, Band::G, Band::R, Band::I, Band::Z, Band::Y];

    /// Index of this band in per-band counter arrays.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Band::U => "u",
            Band::G => "g",
            Band::R => "r",
            Band::I => "i",
            Band::Z => "z",
            Band::Y => "y",
        };
        write!(f, "{s}")
    }
}

/// A single detection of a transient or variable signal in one visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaSource {
    /// Visit (exposure) this detection belongs to.
    pub visit_id: VisitId,
    /// Identifier of the detection, unique within its visit.
    pub source_id: SourceId,
    /// Right ascension in degrees, `[0, 360)`.
    pub ra: Degree,
    /// Declination in degrees, `[-90, +90]`.
    pub dec: Degree,
    /// Object this detection was associated to. `None` on input; the engine fills it.
    pub dia_object_id: Option<ObjectId>,
}

impl DiaSource {
    /// Create an unassociated detection record.
    pub fn new(visit_id: VisitId, source_id: SourceId, ra: Degree, dec: Degree) -> Self {
        DiaSource {
            visit_id,
            source_id,
            ra,
            dec,
            dia_object_id: None,
        }
    }
}

/// The persistent entity representing repeated detections of the same physical source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaObject {
    /// Globally unique object identifier (see [`IdFactory`](crate::id_factory::IdFactory)).
    pub dia_object_id: ObjectId,
    /// Right ascension of the mean coordinate, in degrees.
    pub ra: Degree,
    /// Declination of the mean coordinate, in degrees.
    pub dec: Degree,
    /// Number of detections associated to this object.
    pub n_dia_sources: u32,
    /// Number of epochs that entered the proper-motion/parallax fit. Zero here; filled
    /// downstream.
    pub pm_parallax_n_data: u32,
    /// Identifiers of the three nearest neighboring objects. Zero here; filled downstream.
    pub nearby_obj: [ObjectId; 3],
    /// Processing flag bits. Zero here; filled downstream.
    pub flags: u64,
    /// Per-band count of PSF-flux measurements, indexed by [`Band`]. Zero here; filled
    /// downstream.
    pub psf_flux_n_data: [u32; 6],
}

impl DiaObject {
    /// Create an object founded by a single detection at the given coordinate.
    ///
    /// All auxiliary statistics start at zero and `n_dia_sources` at one.
    pub fn new(dia_object_id: ObjectId, ra: Degree, dec: Degree) -> Self {
        DiaObject {
            dia_object_id,
            ra,
            dec,
            n_dia_sources: 1,
            pm_parallax_n_data: 0,
            nearby_obj: [0; 3],
            flags: 0,
            psf_flux_n_data: [0; 6],
        }
    }

    /// PSF-flux data counter for one band.
    pub fn psf_flux_n_data(&self, band: Band) -> u32 {
        self.psf_flux_n_data[band.index()]
    }
}

impl fmt::Display for DiaObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DiaObject {} at ({:.7} deg, {:+.7} deg), {} source(s)",
            self.dia_object_id, self.ra, self.dec, self.n_dia_sources
        )
    }
}

/// Columnar view over in-memory catalog data, one row per detection.
///
/// All slices must have the same length; the batch borrows them and materializes
/// [`DiaSource`] rows on demand.
///
/// Example
/// -----------------
/// ```rust
/// use diassoc::catalog::SourceBatch;
///
/// let visits = [1_u64, 1, 2];
/// let ids = [10_u64, 11, 12];
/// let ra = [10.0, 10.5, 10.000_05];
/// let dec = [20.0, 20.0, 20.000_05];
///
/// let batch = SourceBatch::new(&visits, &ids, &ra, &dec).unwrap();
/// let sources = batch.to_sources();
/// assert_eq!(sources.len(), 3);
/// assert!(sources.iter().all(|s| s.dia_object_id.is_none()));
/// ```
#[derive(Debug, Clone)]
pub struct SourceBatch<'a> {
    visit_ids: &'a [VisitId],
    source_ids: &'a [SourceId],
    ra_deg: &'a [Degree],
    dec_deg: &'a [Degree],
}

impl<'a> SourceBatch<'a> {
    /// Build a batch from parallel columns.
    ///
    /// Arguments
    /// ---------
    /// * `visit_ids`: visit of each detection
    /// * `source_ids`: per-visit identifier of each detection
    /// * `ra_deg`: right ascension column, degrees
    /// * `dec_deg`: declination column, degrees
    ///
    /// Return
    /// ------
    /// * The batch, or [`AssocError::InvalidConfiguration`] if the column lengths differ.
    pub fn new(
        visit_ids: &'a [VisitId],
        source_ids: &'a [SourceId],
        ra_deg: &'a [Degree],
        dec_deg: &'a [Degree],
    ) -> Result<Self, AssocError> {
        let n = visit_ids.len();
        if source_ids.len() != n || ra_deg.len() != n || dec_deg.len() != n {
            return Err(AssocError::InvalidConfiguration(format!(
                "source batch columns must have equal lengths (got {}, {}, {}, {})",
                n,
                source_ids.len(),
                ra_deg.len(),
                dec_deg.len()
            )));
        }
        Ok(SourceBatch {
            visit_ids,
            source_ids,
            ra_deg,
            dec_deg,
        })
    }

    /// Number of rows in the batch.
    pub fn len(&self) -> usize {
        self.visit_ids.len()
    }

    /// Whether the batch holds no rows.
    pub fn is_empty(&self) -> bool {
        self.visit_ids.is_empty()
    }

    /// Materialize the batch as unassociated [`DiaSource`] rows.
    pub fn to_sources(&self) -> Vec<DiaSource> {
        (0..self.len())
            .map(|i| {
                DiaSource::new(
                    self.visit_ids[i],
                    self.source_ids[i],
                    self.ra_deg[i],
                    self.dec_deg[i],
                )
            })
            .collect()
    }
}
