#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Output delivery for extraction results.
//!
//! Names and writes the two KML documents, the Shift-JIS neighborhood CSV,
//! and a JSON summary for one [`ExtractionResult`].

pub mod naming;
pub mod summary;
pub mod table;

use std::path::{Path, PathBuf};

use koji_map_kml::{KmlError, KmlStyle, write_kml};
use koji_map_parcel_models::{ExtractionResult, SelectionCriteria};

pub use naming::{CSV_MIME, KML_MIME, ResultKind, file_stem};
pub use summary::ExtractionSummary;
pub use table::{TablePreview, neighborhood_csv};

/// Errors that can occur while producing output files.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// CSV writer error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A character has no Shift-JIS representation.
    #[error("Cannot encode '{value}' as Shift-JIS")]
    Encoding {
        /// The offending character.
        value: String,
    },

    /// Intermediate CSV text was not valid UTF-8.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// KML document could not be produced.
    #[error("KML error: {0}")]
    Kml(#[from] KmlError),
}

/// One file written by [`write_outputs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    /// Where it was written.
    pub path: PathBuf,
    /// MIME type to serve it with.
    pub mime: &'static str,
}

/// Every file written for one extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFiles {
    /// Target set KML.
    pub target_kml: OutputFile,
    /// Neighborhood set KML.
    pub neighborhood_kml: OutputFile,
    /// Neighborhood centroid CSV.
    pub neighborhood_csv: OutputFile,
    /// JSON summary.
    pub summary: OutputFile,
}

impl OutputFiles {
    /// All files in write order.
    #[must_use]
    pub fn all(&self) -> [&OutputFile; 4] {
        [
            &self.target_kml,
            &self.neighborhood_kml,
            &self.neighborhood_csv,
            &self.summary,
        ]
    }
}

/// Renders every output for `result` and writes them under `dir`.
///
/// All documents are rendered before anything is written, so a
/// reprojection or encoding failure leaves `dir` untouched.
///
/// # Errors
///
/// Returns [`ExportError`] if rendering fails or a file cannot be written.
pub fn write_outputs(
    dir: &Path,
    criteria: &SelectionCriteria,
    result: &ExtractionResult,
    style: &KmlStyle,
) -> Result<OutputFiles, ExportError> {
    let stem = file_stem(criteria);

    let target_kml = write_kml(
        &result.target_set,
        &naming::document_name(&stem, ResultKind::Target),
        style,
    )?;
    let neighborhood_kml = write_kml(
        &result.neighborhood_set,
        &naming::document_name(&stem, ResultKind::Neighborhood),
        style,
    )?;
    let csv = neighborhood_csv(&result.neighborhood_set)?;
    let summary = ExtractionSummary::new(criteria, result).to_json()?;

    std::fs::create_dir_all(dir)?;

    let files = OutputFiles {
        target_kml: OutputFile {
            path: dir.join(naming::kml_file_name(&stem, ResultKind::Target)),
            mime: KML_MIME,
        },
        neighborhood_kml: OutputFile {
            path: dir.join(naming::kml_file_name(&stem, ResultKind::Neighborhood)),
            mime: KML_MIME,
        },
        neighborhood_csv: OutputFile {
            path: dir.join(naming::csv_file_name(&stem)),
            mime: CSV_MIME,
        },
        summary: OutputFile {
            path: dir.join(naming::summary_file_name(&stem)),
            mime: "application/json",
        },
    };

    std::fs::write(&files.target_kml.path, target_kml)?;
    std::fs::write(&files.neighborhood_kml.path, neighborhood_kml)?;
    std::fs::write(&files.neighborhood_csv.path, csv)?;
    std::fs::write(&files.summary.path, summary)?;

    for file in files.all() {
        log::info!("Wrote {}", file.path.display());
    }

    Ok(files)
}
