//! Decoding of BOM observation bundles.
//!
//! A bundle is a gzipped tar archive with one JSON document per station.
//! Each document lists recent readings; the one with `sort_order == 0` is
//! the latest and becomes an [`ObservationRecord`].

mod bom;
pub mod decoder;
pub mod error;

pub use decoder::{ArchiveDecoder, BomArchiveDecoder, DecodeOutcome};
pub use error::ArchiveError;

pub use obs_common::ObservationRecord;
