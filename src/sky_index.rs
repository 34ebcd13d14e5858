//! Spherical geometry helpers and the HEALPix candidate index.
//!
//! Overview
//! -----------------
//! The association engine never scans the full object list: it first narrows the search to
//! objects whose HEALPix cell intersects a small disc around the incoming detection, then
//! measures exact separations on that short list. This module supplies both layers:
//!
//! * **Exact geometry** – [`radec_to_unit`] and [`angular_separation`] convert equatorial
//!   coordinates to unit vectors and measure great-circle angles with an `atan2`
//!   formulation that stays accurate at sub-arcsecond separations.
//! * **Coarse index** – [`SkyIndex`] wraps the nested HEALPix scheme of the `cdshealpix`
//!   crate: [`SkyIndex::cell_of`] maps a coordinate to its cell and
//!   [`SkyIndex::cells_within`] enumerates a superset of the cells intersecting a disc.
//!
//! The disc coverage is *approximate on the safe side*: it may return cells that only
//! graze the disc, never miss one that intersects it, so the coarse filter is always a
//! superset of the true candidates.
//!
//! Errors
//! -----------------
//! Coordinates must satisfy `ra ∈ [0, 360)` and `dec ∈ [−90, +90]` degrees and be finite;
//! anything else is rejected with [`AssocError::InvalidSkyCoordinate`] rather than being
//! silently wrapped into a wrong cell.

use nalgebra::Vector3;

use crate::assoc_errors::AssocError;
use crate::constants::{CellId, CellSet, Degree, Radian, MAX_HEALPIX_DEPTH};

/// Reject non-finite or out-of-range equatorial coordinates.
fn check_radec(ra: Degree, dec: Degree) -> Result<(), AssocError> {
    if !ra.is_finite() || !dec.is_finite() || !(0.0..360.0).contains(&ra) || !(-90.0..=90.0).contains(&dec)
    {
        return Err(AssocError::InvalidSkyCoordinate { ra, dec });
    }
    Ok(())
}

/// Convert equatorial coordinates (degrees) to a unit vector on the sphere.
///
/// Arguments
/// ---------
/// * `ra`: right ascension in degrees, `[0, 360)`
/// * `dec`: declination in degrees, `[-90, +90]`
///
/// Return
/// ------
/// * The unit direction vector, or [`AssocError::InvalidSkyCoordinate`] for NaN or
///   out-of-range input.
pub fn radec_to_unit(ra: Degree, dec: Degree) -> Result<Vector3<f64>, AssocError> {
    check_radec(ra, dec)?;
    let (sin_ra, cos_ra) = ra.to_radians().sin_cos();
    let (sin_dec, cos_dec) = dec.to_radians().sin_cos();
    Ok(Vector3::new(cos_dec * cos_ra, cos_dec * sin_ra, sin_dec))
}

/// Convert a unit direction vector back to equatorial coordinates (degrees).
///
/// The right ascension is normalized to `[0, 360)`.
pub fn unit_to_radec(v: &Vector3<f64>) -> (Degree, Degree) {
    let mut ra = v.y.atan2(v.x).to_degrees();
    if ra < 0.0 {
        ra += 360.0;
    }
    if ra >= 360.0 {
        ra -= 360.0;
    }
    let dec = v.z.clamp(-1.0, 1.0).asin().to_degrees();
    (ra, dec)
}

/// Exact great-circle angle between two unit vectors, in radians.
///
/// Uses `atan2(‖a×b‖, a·b)`, which keeps full relative precision for small separations
/// where `acos(a·b)` would lose digits.
pub fn angular_separation(a: &Vector3<f64>, b: &Vector3<f64>) -> Radian {
    a.cross(b).norm().atan2(a.dot(b))
}

/// Nested HEALPix index at a fixed resolution.
///
/// A thin wrapper over `cdshealpix` exposing the two pure queries the association engine
/// needs. Cheap to copy; holds only the subdivision depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkyIndex {
    depth: u8,
}

impl SkyIndex {
    /// Build an index for the given `nside` resolution.
    ///
    /// Arguments
    /// ---------
    /// * `nside`: HEALPix nside, a power of two with `log2(nside) <= 29`
    ///
    /// Return
    /// ------
    /// * The index, or [`AssocError::InvalidConfiguration`] for an unsupported resolution.
    pub fn new(nside: u64) -> Result<Self, AssocError> {
        if nside == 0 || !nside.is_power_of_two() {
            return Err(AssocError::InvalidConfiguration(
                "nside must be a positive power of two".into(),
            ));
        }
        let depth = nside.trailing_zeros() as u8;
        if depth > MAX_HEALPIX_DEPTH {
            return Err(AssocError::InvalidConfiguration(format!(
                "nside must not exceed 2^{MAX_HEALPIX_DEPTH}"
            )));
        }
        Ok(SkyIndex { depth })
    }

    /// Subdivision depth of this index (`nside = 2^depth`).
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Cell containing the given coordinate.
    pub fn cell_of(&self, ra: Degree, dec: Degree) -> Result<CellId, AssocError> {
        check_radec(ra, dec)?;
        Ok(cdshealpix::nested::hash(
            self.depth,
            ra.to_radians(),
            dec.to_radians(),
        ))
    }

    /// Cells whose area may intersect the disc of `radius` radians around a coordinate.
    ///
    /// Guaranteed to be a superset of the truly intersecting cells.
    pub fn cells_within(
        &self,
        ra: Degree,
        dec: Degree,
        radius: Radian,
    ) -> Result<CellSet, AssocError> {
        check_radec(ra, dec)?;
        let coverage = cdshealpix::nested::cone_coverage_approx(
            self.depth,
            ra.to_radians(),
            dec.to_radians(),
            radius,
        );
        Ok(coverage.flat_iter().collect())
    }
}
