//! Statistics over extraction results.

use std::collections::BTreeSet;

use geo::Area;
use koji_map_parcel_models::{ColumnRole, ParcelDataset};
use serde::{Deserialize, Serialize};

use crate::bounds::centroid_of;

/// Summary statistics of parcel areas, in squared CRS units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaStats {
    /// Number of geometries measured.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample standard deviation; `None` with fewer than two values.
    pub std: Option<f64>,
    /// Smallest area.
    pub min: f64,
    /// First quartile.
    pub q25: f64,
    /// Median.
    pub median: f64,
    /// Third quartile.
    pub q75: f64,
    /// Largest area.
    pub max: f64,
}

/// Distinct values of one key column within a result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistinctCount {
    /// Column label.
    pub column: String,
    /// Number of distinct non-null values.
    pub distinct: usize,
}

/// Statistics of a neighborhood set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborhoodStats {
    /// Distinct counts for the key columns present.
    pub distinct: Vec<DistinctCount>,
    /// Area statistics of the clipped geometries, if any.
    pub area: Option<AreaStats>,
}

/// Centroid and area of one target parcel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetCoordinate {
    /// Centroid X in the dataset CRS.
    pub centroid_x: f64,
    /// Centroid Y in the dataset CRS.
    pub centroid_y: f64,
    /// Area in squared CRS units.
    pub area: f64,
}

/// Computes [`NeighborhoodStats`] for a result set.
#[must_use]
pub fn neighborhood_stats(set: &ParcelDataset) -> NeighborhoodStats {
    let distinct = ColumnRole::ALL
        .iter()
        .filter(|role| set.schema().has(**role))
        .map(|&role| DistinctCount {
            column: set.schema().label(role).to_string(),
            distinct: set
                .records()
                .iter()
                .filter_map(|r| set.text(r, role))
                .collect::<BTreeSet<_>>()
                .len(),
        })
        .collect();

    let areas: Vec<f64> = set
        .records()
        .iter()
        .filter_map(|r| r.geometry.as_ref())
        .map(|g| g.unsigned_area())
        .collect();

    NeighborhoodStats {
        distinct,
        area: area_stats(areas),
    }
}

/// Centroid and area of each target record that has a geometry.
#[must_use]
pub fn target_coordinates(set: &ParcelDataset) -> Vec<TargetCoordinate> {
    set.records()
        .iter()
        .filter_map(|r| {
            let geometry = r.geometry.as_ref()?;
            let centroid = centroid_of(geometry)?;
            Some(TargetCoordinate {
                centroid_x: centroid.x(),
                centroid_y: centroid.y(),
                area: geometry.unsigned_area(),
            })
        })
        .collect()
}

/// Describes `values`, or `None` if empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn area_stats(mut values: Vec<f64>) -> Option<AreaStats> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let std = (n > 1).then(|| {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        var.sqrt()
    });

    Some(AreaStats {
        count: n,
        mean,
        std,
        min: values[0],
        q25: quantile(&values, 0.25),
        median: quantile(&values, 0.5),
        q75: quantile(&values, 0.75),
        max: values[n - 1],
    })
}

/// Linear-interpolated quantile of sorted, non-empty `values`.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn quantile(values: &[f64], q: f64) -> f64 {
    let pos = q * (values.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    values[lo] + (values[hi] - values[lo]) * (pos - lo as f64)
}
