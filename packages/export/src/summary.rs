//! Machine-readable record of one extraction: the conditions used, the
//! counts, and the statistics shown alongside the previews.

use koji_map_parcel::stats::{
    NeighborhoodStats, TargetCoordinate, neighborhood_stats, target_coordinates,
};
use koji_map_parcel_models::{ExtractionResult, SelectionCriteria};
use serde::{Deserialize, Serialize};

use crate::ExportError;

/// The search conditions as displayed, with unspecified qualifiers
/// rendered as `指定なし`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConditions {
    /// Region.
    pub region: String,
    /// Sub-region or `指定なし`.
    pub sub_region: String,
    /// Sub-sub-region or `指定なし`.
    pub sub_sub_region: String,
    /// Parcel number.
    pub parcel_number: String,
}

/// Summary written next to the KML and CSV outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionSummary {
    /// Conditions used.
    pub conditions: SearchConditions,
    /// Half-width of the search square.
    pub range_m: f64,
    /// Records in the target set.
    pub target_count: usize,
    /// Records in the neighborhood set.
    pub neighborhood_count: usize,
    /// Sum of both counts.
    pub total_count: usize,
    /// Status line.
    pub status: String,
    /// Centroid and area per target.
    pub targets: Vec<TargetCoordinate>,
    /// Neighborhood statistics.
    pub neighborhood: NeighborhoodStats,
}

impl ExtractionSummary {
    /// Summarizes `result` of running `criteria`.
    #[must_use]
    pub fn new(criteria: &SelectionCriteria, result: &ExtractionResult) -> Self {
        let target_count = result.target_set.len();
        let neighborhood_count = result.neighborhood_set.len();

        Self {
            conditions: SearchConditions {
                region: criteria.region.clone(),
                sub_region: criteria.sub_region.to_string(),
                sub_sub_region: criteria.sub_sub_region.to_string(),
                parcel_number: criteria.parcel_number.clone(),
            },
            range_m: criteria.range_m,
            target_count,
            neighborhood_count,
            total_count: target_count + neighborhood_count,
            status: result.status.clone(),
            targets: target_coordinates(&result.target_set),
            neighborhood: neighborhood_stats(&result.neighborhood_set),
        }
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
