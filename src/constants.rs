//! # Constants and type definitions for diassoc
//!
//! This module centralizes the **conversion factors**, **identifier aliases**, and **common
//! type definitions** used throughout the `diassoc` library.
//!
//! ## Overview
//!
//! - Angular unit conversions (degrees ↔ radians, arcseconds ↔ radians)
//! - Core type aliases used across the crate (angles, catalog identifiers)
//! - Container types shared between the spatial index and the association engine
//!
//! These definitions are used by all main modules, including the association engine, the
//! spatial index, and the catalog record types.

use std::collections::HashSet;

use ahash::RandomState;

// -------------------------------------------------------------------------------------------------
// Unit conversions
// -------------------------------------------------------------------------------------------------

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Arcseconds → radians
pub const RADSEC: f64 = std::f64::consts::PI / 648_000.0;

/// Arcseconds per degree
pub const ARCSEC_PER_DEGREE: f64 = 3600.0;

// -------------------------------------------------------------------------------------------------
// Spatial index limits and defaults
// -------------------------------------------------------------------------------------------------

/// Deepest HEALPix subdivision supported by the nested indexing scheme.
///
/// `nside = 2^depth`; cell ids at depth 29 use 60 bits of a `u64`.
pub const MAX_HEALPIX_DEPTH: u8 = 29;

/// Default HEALPix `nside` resolution (2^18, cells roughly 0.8 arcsecond on a side).
pub const DEFAULT_NSIDE: u64 = 1 << 18;

/// Default association tolerance in arcseconds.
pub const DEFAULT_TOLERANCE_ARCSEC: f64 = 0.5;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in arcseconds
pub type ArcSec = f64;
/// Angle in radians
pub type Radian = f64;

/// Identifier of the visit (exposure) a source was detected in
pub type VisitId = u64;
/// Identifier of a single detection within its visit
pub type SourceId = u64;
/// Identifier of a persistent object built from associated detections
pub type ObjectId = u64;
/// Nested HEALPix cell identifier at the configured resolution
pub type CellId = u64;

/// Set of HEALPix cells returned by a disc-coverage query.
pub type CellSet = HashSet<CellId, RandomState>;
