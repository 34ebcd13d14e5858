//! # diassoc: incremental spatial association of sky detections
//!
//! Given a time-ordered table of point detections on the sphere, `diassoc` clusters them
//! into persistent objects representing the same physical entity observed across visits.
//! Matching is greedy and deterministic: each detection attaches to the nearest existing
//! object strictly within an angular tolerance, at most one detection per object per
//! visit, or founds a new object. A nested HEALPix index keeps candidate lookup sub-linear.
//!
//! The single entry point is [`Associator::associate`](association::Associator::associate);
//! see the [`association`] module for the algorithm and its guarantees.

pub mod assoc_errors;
pub mod association;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod id_factory;
pub mod sky_index;

pub use assoc_errors::AssocError;
pub use association::{Association, Associator};
pub use catalog::{Band, DiaObject, DiaSource, SourceBatch};
pub use config::AssociationConfig;
pub use id_factory::IdFactory;
pub use sky_index::SkyIndex;
