use approx::assert_relative_eq;
use nalgebra::Vector3;

use diassoc::catalog::{DiaObject, DiaSource};
use diassoc::sky_index::{radec_to_unit, unit_to_radec};

/// Shorthand for an unassociated detection row.
pub fn src(visit_id: u64, source_id: u64, ra: f64, dec: f64) -> DiaSource {
    DiaSource::new(visit_id, source_id, ra, dec)
}

/// Check that an object's coordinate equals the spherical mean of its member detections.
pub fn assert_mean_matches_members(object: &DiaObject, sources: &[DiaSource]) {
    let members: Vec<&DiaSource> = sources
        .iter()
        .filter(|s| s.dia_object_id == Some(object.dia_object_id))
        .collect();
    assert_eq!(
        members.len() as u32,
        object.n_dia_sources,
        "member count mismatch for object {}",
        object.dia_object_id
    );

    let sum: Vector3<f64> = members
        .iter()
        .map(|s| radec_to_unit(s.ra, s.dec).unwrap())
        .sum();
    let (mean_ra, mean_dec) = unit_to_radec(&sum.normalize());
    assert_relative_eq!(object.ra, mean_ra, epsilon = 1e-9);
    assert_relative_eq!(object.dec, mean_dec, epsilon = 1e-9);
}
