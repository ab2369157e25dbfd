#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Parcel extraction engine.
//!
//! Locates a target parcel by its administrative names and parcel number,
//! builds a fixed-size square around the target's centroid, and clips every
//! valid parcel in the dataset against that square. The pipeline is
//! synchronous and only ever borrows the [`ParcelDataset`], so one loaded
//! dataset can serve any number of concurrent extractions.
//!
//! ```text
//! filter -> bounds -> overlay
//! ```

pub mod bounds;
pub mod extract;
pub mod filter;
pub mod overlay;
pub mod profile;
pub mod search;
pub mod stats;

use koji_map_parcel_models::{MatchDiagnostics, SelectionCriteria};
use thiserror::Error;

pub use extract::{extract, extract_with_index};
pub use koji_map_parcel_models::ParcelDataset;
pub use overlay::ParcelIndex;

/// Errors that can occur during an extraction.
#[derive(Debug, Error)]
pub enum ParcelError {
    /// A required column is missing from the dataset schema.
    #[error("Required column not found: {column}")]
    SchemaMismatch {
        /// Label of the missing column.
        column: String,
    },

    /// No record satisfies the criteria.
    #[error("No parcel matches {criteria} ({diagnostics})")]
    NoMatchFound {
        /// The query that matched nothing.
        criteria: SelectionCriteria,
        /// Per-criterion counts to explain which constraint excluded
        /// every row.
        diagnostics: MatchDiagnostics,
    },

    /// A step that needs a geometry received a null or empty one.
    #[error("Invalid geometry: {message}")]
    InvalidGeometry {
        /// Description of what went wrong.
        message: String,
    },

    /// The query itself is unusable.
    #[error("Invalid criteria: {message}")]
    InvalidCriteria {
        /// Description of what went wrong.
        message: String,
    },
}
