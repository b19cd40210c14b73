//! Common types shared across the latest-observations workspace.

pub mod error;
pub mod observation;
pub mod region;

pub use error::{ObsError, ObsResult};
pub use observation::{ObservationRecord, WmoFilter};
pub use region::{RegionSelection, SourceDef, SourceTable};
