//! Incremental spatial association of detections into persistent objects.
//!
//! Overview
//! -----------------
//! [`Associator`] consumes a materialized table of [`DiaSource`] rows and partitions it
//! into [`DiaObject`]s under a fixed angular tolerance: each detection either attaches to
//! the nearest existing object within tolerance or founds a new one. The policy is greedy,
//! single-pass, and deterministic.
//!
//! Algorithm
//! -----------------
//! 1. Stable-sort the rows by `(visit_id, source_id)` to fix the replay order, then walk
//!    the visits in ascending order.
//! 2. For every detection, enumerate the HEALPix cells within **twice** the tolerance of
//!    its coordinate ([`SkyIndex::cells_within`]) — a deliberately loose superset radius so
//!    an object whose mean has drifted, or whose cell straddles the disc boundary, is never
//!    missed by the coarse filter.
//! 3. Keep the live objects whose current cell is in that set, measure the **exact**
//!    great-circle separation to each, and take the nearest.
//! 4. Attach the detection iff the nearest separation is strictly below the tolerance and
//!    that object has not yet received a detection this visit; otherwise found a new
//!    object. No fallback to the second-nearest: two same-visit detections contending for
//!    one object yield one attachment and one new object.
//!
//! Attaching updates the object's running spherical mean (an online unit-vector sum, no
//! coordinate history is kept) and recomputes its HEALPix cell from the new mean, so the
//! coarse index always reflects the live data. Objects are never deleted or merged.
//!
//! Determinism
//! -----------------
//! The engine is single-threaded and stateful per call only: replaying the same input
//! yields bit-identical object ids, member counts, and mean coordinates. Runs over
//! disjoint sky patches are independent and may be parallelized by the caller, provided
//! each gets its own `(patch_id, patch_bits)` pair (see [`IdFactory`]).
//!
//! Example
//! -----------------
//! ```rust
//! use diassoc::association::Associator;
//! use diassoc::catalog::DiaSource;
//! use diassoc::config::AssociationConfig;
//!
//! let associator = Associator::new(AssociationConfig::default()).unwrap();
//! let sources = vec![
//!     DiaSource::new(1, 10, 10.0, 20.0),
//!     DiaSource::new(2, 20, 10.000_05, 20.000_05),
//! ];
//! let result = associator.associate(sources, 7, 16).unwrap();
//! assert_eq!(result.objects.len(), 1);
//! assert_eq!(result.objects[0].n_dia_sources, 2);
//! ```

use std::collections::HashSet;

use ahash::RandomState;
use itertools::Itertools;
use nalgebra::Vector3;
use smallvec::SmallVec;

use crate::assoc_errors::AssocError;
use crate::catalog::{DiaObject, DiaSource};
use crate::config::AssociationConfig;
use crate::constants::{CellId, ObjectId, Radian, VisitId};
use crate::id_factory::IdFactory;
use crate::sky_index::{angular_separation, radec_to_unit, unit_to_radec, SkyIndex};

/// Result of one association run.
#[derive(Debug, Clone, PartialEq)]
pub struct Association {
    /// The input rows, sorted by `(visit_id, source_id)`, each with `dia_object_id` set.
    pub sources: Vec<DiaSource>,
    /// One row per created object, in creation order.
    pub objects: Vec<DiaObject>,
}

/// Live state of one object during a run.
///
/// The mean coordinate is kept as an un-normalized sum of member unit vectors; the mean
/// itself is the normalized sum, recomputed lazily.
#[derive(Debug, Clone)]
struct ObjectRecord {
    id: ObjectId,
    vector_sum: Vector3<f64>,
    n_sources: u32,
    cell: CellId,
}

impl ObjectRecord {
    fn found(id: ObjectId, unit: Vector3<f64>, cell: CellId) -> Self {
        ObjectRecord {
            id,
            vector_sum: unit,
            n_sources: 1,
            cell,
        }
    }

    fn attach(&mut self, unit: &Vector3<f64>) {
        self.vector_sum += unit;
        self.n_sources += 1;
    }

    /// Spherical mean of all member coordinates, as a unit vector.
    fn mean_unit(&self) -> Vector3<f64> {
        self.vector_sum.normalize()
    }
}

/// Strict tolerance test: a separation exactly equal to the tolerance does not match.
fn within_tolerance(separation: Radian, tolerance: Radian) -> bool {
    separation < tolerance
}

/// Spatial association engine.
///
/// Holds only the validated configuration and the derived [`SkyIndex`]; every call to
/// [`associate`](Associator::associate) owns its mutable state, so one `Associator` can be
/// shared across threads running disjoint patches.
#[derive(Debug, Clone)]
pub struct Associator {
    config: AssociationConfig,
    index: SkyIndex,
}

impl Associator {
    /// Build an engine from a configuration.
    ///
    /// Arguments
    /// ---------
    /// * `config`: tolerance and HEALPix resolution
    ///
    /// Return
    /// ------
    /// * The engine, or [`AssocError::InvalidConfiguration`] if the configuration is
    ///   degenerate.
    pub fn new(config: AssociationConfig) -> Result<Self, AssocError> {
        config.validate()?;
        let index = SkyIndex::new(config.nside)?;
        Ok(Associator { config, index })
    }

    /// The configuration this engine was built with.
    pub fn config(&self) -> &AssociationConfig {
        &self.config
    }

    /// Associate detections into objects.
    ///
    /// Arguments
    /// ---------
    /// * `sources`: detection rows with unique `(visit_id, source_id)` keys and valid
    ///   coordinates; consumed and returned annotated
    /// * `patch_id`: sky patch this run files its object ids under
    /// * `patch_bits`: bit width of `patch_id` (see [`IdFactory`])
    ///
    /// Return
    /// ------
    /// * An [`Association`] where every source row carries exactly one object id present in
    ///   the objects table, and `Σ n_dia_sources` equals the number of input rows.
    ///
    /// Errors
    /// ------
    /// * [`AssocError::InvalidIdConfiguration`] / [`AssocError::IdSpaceExhausted`] from id
    ///   generation, [`AssocError::InvalidSkyCoordinate`] for NaN or out-of-range
    ///   coordinates, [`AssocError::DuplicateSourceKey`] if the composite-key contract is
    ///   violated. On error the input is dropped; no partial result is exposed.
    pub fn associate(
        &self,
        sources: Vec<DiaSource>,
        patch_id: u64,
        patch_bits: u8,
    ) -> Result<Association, AssocError> {
        self.run(sources, patch_id, patch_bits, |_| {})
    }

    /// Variant of [`associate`](Associator::associate) reporting per-visit progress on the
    /// terminal.
    #[cfg(feature = "progress")]
    pub fn associate_with_progress(
        &self,
        sources: Vec<DiaSource>,
        patch_id: u64,
        patch_bits: u8,
    ) -> Result<Association, AssocError> {
        use indicatif::{ProgressBar, ProgressStyle};

        let n_visits = sources
            .iter()
            .map(|s| s.visit_id)
            .collect::<HashSet<VisitId, RandomState>>()
            .len() as u64;
        let pb = ProgressBar::new(n_visits.max(1));
        pb.set_style(
            ProgressStyle::with_template(
                "{bar:40.cyan/blue} {pos}/{len} ({percent:>3}%) | {per_sec} | ETA {eta_precise} | {msg}",
            )
            .expect("indicatif template"),
        );

        let result = self.run(sources, patch_id, patch_bits, |visit| {
            pb.set_message(format!("visit {visit}"));
            pb.inc(1);
        });
        pb.finish_and_clear();
        result
    }

    fn run(
        &self,
        mut sources: Vec<DiaSource>,
        patch_id: u64,
        patch_bits: u8,
        mut on_visit: impl FnMut(VisitId),
    ) -> Result<Association, AssocError> {
        let mut ids = IdFactory::new(patch_id, patch_bits)?;
        let tolerance = self.config.tolerance_rad();

        // Fix the replay order: ascending visits, ascending source ids within a visit.
        sources.sort_by_key(|s| (s.visit_id, s.source_id));
        for pair in sources.windows(2) {
            if pair[0].visit_id == pair[1].visit_id && pair[0].source_id == pair[1].source_id {
                return Err(AssocError::DuplicateSourceKey {
                    visit_id: pair[0].visit_id,
                    source_id: pair[0].source_id,
                });
            }
        }

        let mut arena: Vec<ObjectRecord> = Vec::new();
        let mut claimed: HashSet<usize, RandomState> = HashSet::default();

        for (visit, group) in &sources.iter_mut().chunk_by(|s| s.visit_id) {
            on_visit(visit);
            claimed.clear();
            for src in group {
                let unit = radec_to_unit(src.ra, src.dec)?;
                match self.find_match(&arena, &claimed, src, &unit, tolerance)? {
                    Some(idx) => {
                        let obj = &mut arena[idx];
                        obj.attach(&unit);
                        // The mean drifted; keep the coarse index consistent with it.
                        let (mean_ra, mean_dec) = unit_to_radec(&obj.mean_unit());
                        obj.cell = self.index.cell_of(mean_ra, mean_dec)?;
                        claimed.insert(idx);
                        src.dia_object_id = Some(obj.id);
                    }
                    None => {
                        let id = ids.next_id()?;
                        let cell = self.index.cell_of(src.ra, src.dec)?;
                        // A founding detection counts against the per-visit quota too.
                        claimed.insert(arena.len());
                        arena.push(ObjectRecord::found(id, unit, cell));
                        src.dia_object_id = Some(id);
                    }
                }
            }
        }

        let objects = arena
            .iter()
            .map(|rec| {
                let (ra, dec) = unit_to_radec(&rec.mean_unit());
                let mut obj = DiaObject::new(rec.id, ra, dec);
                obj.n_dia_sources = rec.n_sources;
                obj
            })
            .collect();

        Ok(Association { sources, objects })
    }

    /// Nearest unclaimed object within tolerance of a detection, if any.
    ///
    /// Coarse-filters the arena by HEALPix cell over a disc of twice the tolerance, then
    /// measures exact separations on the survivors. Returns `None` when no candidate is
    /// strictly within tolerance, or when the single nearest one is already claimed this
    /// visit.
    fn find_match(
        &self,
        arena: &[ObjectRecord],
        claimed: &HashSet<usize, RandomState>,
        src: &DiaSource,
        unit: &Vector3<f64>,
        tolerance: Radian,
    ) -> Result<Option<usize>, AssocError> {
        if arena.is_empty() {
            return Ok(None);
        }
        let cells = self
            .index
            .cells_within(src.ra, src.dec, 2.0 * tolerance)?;
        let candidates: SmallVec<[usize; 8]> = arena
            .iter()
            .enumerate()
            .filter(|(_, obj)| cells.contains(&obj.cell))
            .map(|(idx, _)| idx)
            .collect();

        let mut best: Option<(usize, Radian)> = None;
        for idx in candidates {
            let sep = angular_separation(unit, &arena[idx].mean_unit());
            // Ties keep the earliest-created object.
            if best.map_or(true, |(_, d)| sep < d) {
                best = Some((idx, sep));
            }
        }
        match best {
            Some((idx, d)) if within_tolerance(d, tolerance) && !claimed.contains(&idx) => {
                Ok(Some(idx))
            }
            _ => Ok(None),
        }
    }
}
