#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dataset loading.
//!
//! Turns a GeoJSON export of an electronic cadastral map into an immutable
//! [`ParcelDataset`](koji_map_parcel_models::ParcelDataset), resolving
//! which role columns exist and which CRS the coordinates are in.

pub mod loader;
pub mod progress;

use koji_map_projection::ProjectionError;

pub use loader::{load_geojson, parse_geojson};
pub use progress::{NullProgress, ProgressCallback};

/// Errors that can occur while loading a dataset.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// I/O error reading the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The JSON is valid but not valid GeoJSON.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The file is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The top-level object is not a `FeatureCollection`.
    #[error("Expected a GeoJSON FeatureCollection")]
    NotFeatureCollection,

    /// A required column is absent from every feature.
    #[error("Required column not found: {column}")]
    MissingColumn {
        /// Configured label of the missing column.
        column: String,
    },

    /// The declared CRS is not supported.
    #[error("CRS error: {0}")]
    Projection(#[from] ProjectionError),
}
