//! The full extraction pipeline: filter, bound, overlay.

use koji_map_parcel_models::{ExtractionResult, ParcelDataset, SelectionCriteria, status_message};

use crate::bounds::{search_square, validate_range};
use crate::filter::filter_targets;
use crate::overlay::ParcelIndex;
use crate::ParcelError;

/// Runs one extraction against `dataset`.
///
/// Builds a throwaway [`ParcelIndex`]; hosts serving repeated queries on
/// the same dataset should build the index once and call
/// [`extract_with_index`].
///
/// # Errors
///
/// Returns [`ParcelError`] if the criteria are invalid, the schema lacks a
/// required column, nothing matches, or the target has no usable geometry.
pub fn extract(
    dataset: &ParcelDataset,
    criteria: &SelectionCriteria,
) -> Result<ExtractionResult, ParcelError> {
    validate_criteria(criteria)?;
    let targets = filter_targets(dataset, criteria)?;
    let square = search_square(&targets, criteria.range_m)?;
    let neighbors = ParcelIndex::new(dataset).overlay(&square);
    Ok(finish(targets, neighbors, square))
}

/// Runs one extraction using a prebuilt index.
///
/// # Errors
///
/// See [`extract`].
pub fn extract_with_index(
    index: &ParcelIndex<'_>,
    criteria: &SelectionCriteria,
) -> Result<ExtractionResult, ParcelError> {
    validate_criteria(criteria)?;
    let targets = filter_targets(index.dataset(), criteria)?;
    let square = search_square(&targets, criteria.range_m)?;
    let neighbors = index.overlay(&square);
    Ok(finish(targets, neighbors, square))
}

fn finish(
    target_set: ParcelDataset,
    neighborhood_set: ParcelDataset,
    search_square: geo::Polygon<f64>,
) -> ExtractionResult {
    let status = status_message(target_set.len(), neighborhood_set.len());
    log::info!("{status}");

    ExtractionResult {
        target_set,
        neighborhood_set,
        search_square,
        status,
    }
}

fn validate_criteria(criteria: &SelectionCriteria) -> Result<(), ParcelError> {
    if criteria.region.trim().is_empty() {
        return Err(ParcelError::InvalidCriteria {
            message: "region must not be empty".to_string(),
        });
    }
    if criteria.parcel_number.trim().is_empty() {
        return Err(ParcelError::InvalidCriteria {
            message: "parcel number must not be empty".to_string(),
        });
    }
    validate_range(criteria.range_m)
}
