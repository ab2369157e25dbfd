//! Tabular views of result sets: the Shift-JIS centroid CSV and plain
//! previews with geometry dropped.

use std::fmt;

use encoding_rs::SHIFT_JIS;
use koji_map_parcel::bounds::centroid_of;
use koji_map_parcel_models::{ParcelDataset, ParcelRecord};

use crate::ExportError;

/// Header of the centroid X column.
pub const CENTROID_X_COLUMN: &str = "中心X座標";

/// Header of the centroid Y column.
pub const CENTROID_Y_COLUMN: &str = "中心Y座標";

/// A result set as text cells, geometry removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePreview {
    /// Column headers.
    pub columns: Vec<String>,
    /// One row per record, aligned with `columns`. Nulls are empty.
    pub rows: Vec<Vec<String>>,
}

impl TablePreview {
    /// Previews every record of `set`.
    #[must_use]
    pub fn from_dataset(set: &ParcelDataset) -> Self {
        Self {
            columns: set.schema().columns().to_vec(),
            rows: set.records().iter().map(attribute_cells).collect(),
        }
    }

    /// Previews `set` with the centroid columns appended, as in the CSV
    /// export.
    #[must_use]
    pub fn with_centroids(set: &ParcelDataset) -> Self {
        let mut columns = set.schema().columns().to_vec();
        columns.push(CENTROID_X_COLUMN.to_string());
        columns.push(CENTROID_Y_COLUMN.to_string());

        let rows = set
            .records()
            .iter()
            .map(|record| {
                let mut cells = attribute_cells(record);
                let centroid = record.geometry.as_ref().and_then(centroid_of);
                cells.push(centroid.map(|c| c.x().to_string()).unwrap_or_default());
                cells.push(centroid.map(|c| c.y().to_string()).unwrap_or_default());
                cells
            })
            .collect();

        Self { columns, rows }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Writes header and rows as UTF-8 CSV.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Csv`] if the writer fails.
    pub fn to_csv(&self) -> Result<String, ExportError> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| ExportError::Io(e.into_error()))?;
        Ok(String::from_utf8(bytes)?)
    }
}

impl fmt::Display for TablePreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.columns.join("\t"))?;
        for row in &self.rows {
            writeln!(f, "{}", row.join("\t"))?;
        }
        Ok(())
    }
}

/// The neighborhood CSV: every attribute column plus the centroid of the
/// clipped geometry in the native CRS, encoded as Shift-JIS.
///
/// # Errors
///
/// Returns [`ExportError::Encoding`] naming the first character Shift-JIS
/// cannot represent, or [`ExportError::Csv`] if the writer fails.
pub fn neighborhood_csv(set: &ParcelDataset) -> Result<Vec<u8>, ExportError> {
    encode_shift_jis(&TablePreview::with_centroids(set).to_csv()?)
}

/// Encodes `text` as Shift-JIS, refusing lossy output.
///
/// # Errors
///
/// Returns [`ExportError::Encoding`] naming the first unmappable character.
pub fn encode_shift_jis(text: &str) -> Result<Vec<u8>, ExportError> {
    let (bytes, _, had_errors) = SHIFT_JIS.encode(text);
    if had_errors {
        let mut buf = [0u8; 4];
        let value = text
            .chars()
            .find(|c| SHIFT_JIS.encode(c.encode_utf8(&mut buf)).2)
            .map_or_else(String::new, String::from);
        return Err(ExportError::Encoding { value });
    }
    Ok(bytes.into_owned())
}

fn attribute_cells(record: &ParcelRecord) -> Vec<String> {
    record
        .values
        .iter()
        .map(|v| v.as_ref().map(ToString::to_string).unwrap_or_default())
        .collect()
}
