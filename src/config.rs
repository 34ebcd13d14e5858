//! Configuration of the association engine.
//!
//! Overview
//! -----------------
//! This module defines the [`AssociationConfig`] struct and its fluent, validated builder.
//! Two scalars drive the whole engine:
//!
//! * **`tolerance_arcsec`** – maximum angular separation, in arcseconds, for a detection to
//!   be matched onto an existing object (strict upper bound, see
//!   [`Associator`](crate::association::Associator)).
//! * **`nside`** – HEALPix resolution used for the coarse candidate filter. Must be a power
//!   of two no deeper than [`MAX_HEALPIX_DEPTH`](crate::constants::MAX_HEALPIX_DEPTH).
//!
//! Validation
//! -----------------
//! Degenerate values fail fast with [`AssocError::InvalidConfiguration`] either at
//! [`AssociationConfigBuilder::build`] or when the config is handed to
//! [`Associator::new`](crate::association::Associator::new).
//!
//! Example
//! -----------------
//! ```rust
//! use diassoc::config::AssociationConfig;
//!
//! let config = AssociationConfig::builder()
//!     .tolerance_arcsec(1.0)
//!     .nside(1 << 16)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.depth(), 16);
//! ```

use crate::assoc_errors::AssocError;
use crate::constants::{
    ArcSec, Radian, DEFAULT_NSIDE, DEFAULT_TOLERANCE_ARCSEC, MAX_HEALPIX_DEPTH, RADSEC,
};

/// Tuning parameters for spatial association.
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationConfig {
    /// Maximum distance to match sources together, in arcseconds.
    pub tolerance_arcsec: ArcSec,
    /// HEALPix nside value used for indexing.
    pub nside: u64,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        AssociationConfig {
            tolerance_arcsec: DEFAULT_TOLERANCE_ARCSEC,
            nside: DEFAULT_NSIDE,
        }
    }
}

impl AssociationConfig {
    /// Construct a new [`AssociationConfig`] with the default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new [`AssociationConfigBuilder`] to override the defaults field by field.
    pub fn builder() -> AssociationConfigBuilder {
        AssociationConfigBuilder::new()
    }

    /// Check that the configuration is usable.
    ///
    /// Return
    /// ------
    /// * `Ok(())` if both scalars are valid, otherwise [`AssocError::InvalidConfiguration`].
    pub fn validate(&self) -> Result<(), AssocError> {
        if !self.tolerance_arcsec.is_finite() || self.tolerance_arcsec <= 0.0 {
            return Err(AssocError::InvalidConfiguration(
                "tolerance_arcsec must be finite and > 0".into(),
            ));
        }
        if self.nside == 0 || !self.nside.is_power_of_two() {
            return Err(AssocError::InvalidConfiguration(
                "nside must be a positive power of two".into(),
            ));
        }
        if self.nside.trailing_zeros() as u8 > MAX_HEALPIX_DEPTH {
            return Err(AssocError::InvalidConfiguration(format!(
                "nside must not exceed 2^{MAX_HEALPIX_DEPTH}"
            )));
        }
        Ok(())
    }

    /// Matching tolerance converted to radians.
    pub fn tolerance_rad(&self) -> Radian {
        self.tolerance_arcsec * RADSEC
    }

    /// Nested HEALPix depth corresponding to `nside` (`nside = 2^depth`).
    ///
    /// Only meaningful on a validated configuration.
    pub fn depth(&self) -> u8 {
        self.nside.trailing_zeros() as u8
    }
}

/// Builder for [`AssociationConfig`], with validation.
#[derive(Debug, Clone, Default)]
pub struct AssociationConfigBuilder {
    config: AssociationConfig,
}

impl AssociationConfigBuilder {
    /// Create a new builder initialized with default values.
    pub fn new() -> Self {
        Self {
            config: AssociationConfig::default(),
        }
    }

    pub fn tolerance_arcsec(mut self, v: ArcSec) -> Self {
        self.config.tolerance_arcsec = v;
        self
    }

    pub fn nside(mut self, v: u64) -> Self {
        self.config.nside = v;
        self
    }

    /// Finalize the builder and produce an [`AssociationConfig`] instance.
    ///
    /// Return
    /// ------
    /// * The validated configuration, or [`AssocError::InvalidConfiguration`] if any scalar
    ///   is degenerate (non-positive or non-finite tolerance, nside not a power of two or
    ///   deeper than the HEALPix limit).
    pub fn build(self) -> Result<AssociationConfig, AssocError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
