//! Parcel-number lookup and qualifier option listing.
//!
//! These back the interactive flow: pick a region, narrow by the optional
//! sub-region levels the dataset actually has, then look up parcel
//! numbers before running an extraction.

use std::collections::BTreeSet;

use geo::Point;
use koji_map_parcel_models::{ColumnRole, ParcelDataset, ParcelRecord, Qualifier};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::bounds::centroid_of;
use crate::filter::field_equals;

/// Maximum number of search hits a caller should display at once.
pub const SEARCH_DISPLAY_LIMIT: usize = 50;

/// How a parcel-number search term is matched.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SearchMode {
    /// Whole parcel number must equal the term.
    Exact,
    /// Parcel number must contain the term.
    #[default]
    Partial,
}

/// One parcel-number search result.
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelHit {
    /// Position of the record in the dataset.
    pub index: usize,
    /// Region name, if non-null.
    pub region: Option<String>,
    /// Sub-region name, if the column exists and is non-null.
    pub sub_region: Option<String>,
    /// Sub-sub-region name, if the column exists and is non-null.
    pub sub_sub_region: Option<String>,
    /// The matching parcel number.
    pub parcel_number: String,
    /// Centroid in the dataset CRS, when the record has a geometry.
    pub centroid: Option<Point<f64>>,
}

/// Finds records whose parcel number matches `term`.
///
/// Null parcel numbers never match. Returns every hit; callers truncate
/// to [`SEARCH_DISPLAY_LIMIT`] for display.
#[must_use]
pub fn search_parcel_numbers(
    dataset: &ParcelDataset,
    term: &str,
    mode: SearchMode,
) -> Vec<ParcelHit> {
    let term = term.trim();
    if term.is_empty() || !dataset.schema().has(ColumnRole::ParcelNumber) {
        return Vec::new();
    }

    let owned = |record: &ParcelRecord, role: ColumnRole| {
        dataset.text(record, role).map(|s| s.into_owned())
    };

    dataset
        .records()
        .iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let number = dataset.text(record, ColumnRole::ParcelNumber)?;
            let matched = match mode {
                SearchMode::Exact => number == term,
                SearchMode::Partial => number.contains(term),
            };
            if !matched {
                return None;
            }
            Some(ParcelHit {
                index,
                region: owned(record, ColumnRole::Region),
                sub_region: owned(record, ColumnRole::SubRegion),
                sub_sub_region: owned(record, ColumnRole::SubSubRegion),
                parcel_number: number.into_owned(),
                centroid: record.geometry.as_ref().and_then(centroid_of),
            })
        })
        .collect()
}

/// Sorted distinct region names, nulls excluded.
#[must_use]
pub fn region_options(dataset: &ParcelDataset) -> Vec<String> {
    distinct_values(dataset, ColumnRole::Region, &[])
}

/// Sorted distinct sub-region names within `region`.
///
/// Returns `None` when the dataset has no sub-region column or the region
/// has no non-null sub-region values.
#[must_use]
pub fn sub_region_options(dataset: &ParcelDataset, region: &str) -> Option<Vec<String>> {
    if !dataset.schema().has(ColumnRole::SubRegion) {
        return None;
    }
    let values = distinct_values(dataset, ColumnRole::SubRegion, &[(ColumnRole::Region, region)]);
    (!values.is_empty()).then_some(values)
}

/// Sorted distinct sub-sub-region names within `region`, further narrowed
/// by `sub_region` when it is specified and the column exists.
#[must_use]
pub fn sub_sub_region_options(
    dataset: &ParcelDataset,
    region: &str,
    sub_region: &Qualifier,
) -> Option<Vec<String>> {
    if !dataset.schema().has(ColumnRole::SubSubRegion) {
        return None;
    }

    let mut constraints = vec![(ColumnRole::Region, region)];
    if let Some(value) = sub_region.value() {
        if dataset.schema().has(ColumnRole::SubRegion) {
            constraints.push((ColumnRole::SubRegion, value));
        }
    }

    let values = distinct_values(dataset, ColumnRole::SubSubRegion, &constraints);
    (!values.is_empty()).then_some(values)
}

fn distinct_values(
    dataset: &ParcelDataset,
    role: ColumnRole,
    constraints: &[(ColumnRole, &str)],
) -> Vec<String> {
    dataset
        .records()
        .iter()
        .filter(|record| {
            constraints
                .iter()
                .all(|(r, value)| field_equals(dataset, record, *r, value))
        })
        .filter_map(|record| dataset.text(record, role))
        .map(|s| s.into_owned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Geometry, Rect, coord};
    use koji_map_parcel_models::{ColumnNames, DatasetSchema};

    fn dataset(columns: &[&str], rows: &[&[Option<&str>]]) -> ParcelDataset {
        let schema = DatasetSchema::new(
            columns.iter().map(ToString::to_string).collect(),
            ColumnNames::default(),
        );
        let geometry = Geometry::Polygon(
            Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 2.0, y: 2.0 }).to_polygon(),
        );
        ParcelDataset::new(
            schema,
            None,
            rows.iter()
                .map(|row| ParcelRecord {
                    values: row.iter().map(|v| v.map(Into::into)).collect(),
                    geometry: Some(geometry.clone()),
                })
                .collect(),
        )
    }

    fn sample() -> ParcelDataset {
        dataset(
            &["大字名", "丁目名", "小字名", "地番"],
            &[
                &[Some("Aza1"), Some("2丁目"), Some("西"), Some("1174")],
                &[Some("Aza1"), Some("1丁目"), Some("東"), Some("1174-2")],
                &[Some("Aza1"), Some("1丁目"), Some("北"), Some("11")],
                &[Some("Aza1"), None, Some("南"), Some("274")],
                &[Some("Aza2"), Some("3丁目"), Some("中"), None],
                &[None, Some("9丁目"), None, Some("1174")],
            ],
        )
    }

    #[test]
    fn exact_search_requires_whole_number() {
        let hits = search_parcel_numbers(&sample(), "1174", SearchMode::Exact);
        let indices: Vec<usize> = hits.iter().map(|h| h.index).collect();
        assert_eq!(indices, vec![0, 5]);
        assert_eq!(hits[1].region, None);
    }

    #[test]
    fn partial_search_matches_substrings() {
        let hits = search_parcel_numbers(&sample(), "17", SearchMode::Partial);
        let numbers: Vec<&str> = hits.iter().map(|h| h.parcel_number.as_str()).collect();
        assert_eq!(numbers, vec!["1174", "1174-2", "1174"]);
    }

    #[test]
    fn search_reports_centroid() {
        let hits = search_parcel_numbers(&sample(), "11", SearchMode::Exact);
        let centroid = hits[0].centroid.unwrap();
        assert!((centroid.x() - 1.0).abs() < 1e-9);
        assert!((centroid.y() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn blank_term_matches_nothing() {
        assert!(search_parcel_numbers(&sample(), "  ", SearchMode::Partial).is_empty());
    }

    #[test]
    fn search_mode_parses_from_str() {
        assert_eq!("exact".parse::<SearchMode>().unwrap(), SearchMode::Exact);
        assert_eq!(SearchMode::Partial.to_string(), "partial");
    }

    #[test]
    fn lists_regions_without_nulls() {
        assert_eq!(region_options(&sample()), vec!["Aza1", "Aza2"]);
    }

    #[test]
    fn lists_sub_regions_for_region() {
        assert_eq!(
            sub_region_options(&sample(), "Aza1"),
            Some(vec!["1丁目".to_string(), "2丁目".to_string()])
        );
        assert_eq!(sub_region_options(&sample(), "Aza9"), None);
    }

    #[test]
    fn lists_sub_sub_regions_narrowed_by_sub_region() {
        assert_eq!(
            sub_sub_region_options(&sample(), "Aza1", &Qualifier::Value("1丁目".to_string())),
            Some(vec!["北".to_string(), "東".to_string()])
        );
        assert_eq!(
            sub_sub_region_options(&sample(), "Aza1", &Qualifier::NotSpecified)
                .map(|v| v.len()),
            Some(4)
        );
    }

    #[test]
    fn options_absent_without_column() {
        let flat = dataset(&["大字名", "地番"], &[&[Some("Aza1"), Some("1")]]);
        assert_eq!(sub_region_options(&flat, "Aza1"), None);
        assert_eq!(
            sub_sub_region_options(&flat, "Aza1", &Qualifier::NotSpecified),
            None
        );
    }
}
