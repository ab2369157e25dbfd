//! GeoJSON `FeatureCollection` to [`ParcelDataset`].
//!
//! Columns are the union of feature property keys in first-seen order.
//! Polygon, `MultiPolygon` and Point geometries are kept; anything else is
//! stored as a null geometry.

use std::collections::BTreeSet;
use std::path::Path;

use geo::Geometry;
use geojson::{Feature, FeatureCollection, GeoJson};
use koji_map_parcel_models::{
    AttributeValue, ColumnNames, ColumnRole, Crs, DatasetSchema, ParcelDataset, ParcelRecord,
};
use koji_map_projection::{crs_from_epsg, parse_epsg_name};
use serde_json::Value;

use crate::DatasetError;
use crate::progress::ProgressCallback;

/// Reads and parses the GeoJSON file at `path`.
///
/// # Errors
///
/// Returns [`DatasetError`] if the file cannot be read or is not a
/// usable parcel `FeatureCollection`.
pub fn load_geojson(
    path: &Path,
    names: &ColumnNames,
    crs_override: Option<Crs>,
    progress: &dyn ProgressCallback,
) -> Result<ParcelDataset, DatasetError> {
    log::info!("Loading {}", path.display());
    progress.set_message(format!("Reading {}", path.display()));
    let text = std::fs::read_to_string(path)?;
    parse_geojson(&text, names, crs_override, progress)
}

/// Parses GeoJSON text into a dataset.
///
/// The CRS is `crs_override` if given, else the legacy `crs` member of
/// the collection, else unset.
///
/// # Errors
///
/// Returns [`DatasetError::Json`] for malformed JSON,
/// [`DatasetError::GeoJson`] for invalid GeoJSON,
/// [`DatasetError::NotFeatureCollection`] for other GeoJSON objects, and
/// [`DatasetError::MissingColumn`] when the region or parcel number
/// column is absent.
pub fn parse_geojson(
    text: &str,
    names: &ColumnNames,
    crs_override: Option<Crs>,
    progress: &dyn ProgressCallback,
) -> Result<ParcelDataset, DatasetError> {
    let value: Value = serde_json::from_str(text)?;
    let GeoJson::FeatureCollection(collection) = GeoJson::from_json_value(value)? else {
        return Err(DatasetError::NotFeatureCollection);
    };

    let crs = match crs_override {
        Some(crs) => Some(crs),
        None => declared_crs(&collection)?,
    };
    match &crs {
        Some(crs) => log::info!("Dataset CRS: {crs}"),
        None => log::warn!("Dataset declares no CRS; KML output needs an explicit one"),
    }

    let columns = collect_columns(&collection.features);
    let schema = DatasetSchema::new(columns, names.clone());
    for role in [ColumnRole::Region, ColumnRole::ParcelNumber] {
        if !schema.has(role) {
            return Err(DatasetError::MissingColumn {
                column: schema.label(role).to_string(),
            });
        }
    }

    let total = collection.features.len();
    progress.set_total(total as u64);
    progress.set_message("Converting features".to_string());

    let mut dropped = 0usize;
    let mut records = Vec::with_capacity(total);
    for (idx, feature) in collection.features.into_iter().enumerate() {
        let record = convert_feature(&schema, idx, feature);
        if record.geometry.is_none() {
            dropped += 1;
        }
        records.push(record);
        progress.inc(1);
    }

    let dataset = ParcelDataset::new(schema, crs, records);
    progress.finish(format!("Loaded {} parcels", dataset.len()));
    log::info!(
        "Loaded {} parcels ({dropped} without usable geometry), {} columns",
        dataset.len(),
        dataset.schema().columns().len()
    );
    Ok(dataset)
}

/// EPSG code from a `{"type": "name", "properties": {"name": ...}}` member.
fn declared_crs(collection: &FeatureCollection) -> Result<Option<Crs>, DatasetError> {
    let Some(name) = collection
        .foreign_members
        .as_ref()
        .and_then(|members| members.get("crs"))
        .and_then(|crs| crs.pointer("/properties/name"))
        .and_then(Value::as_str)
    else {
        return Ok(None);
    };

    match parse_epsg_name(name) {
        Some(code) => Ok(Some(crs_from_epsg(code)?)),
        None => {
            log::warn!("Ignoring unrecognised CRS name '{name}'");
            Ok(None)
        }
    }
}

fn collect_columns(features: &[Feature]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut columns = Vec::new();
    for properties in features.iter().filter_map(|f| f.properties.as_ref()) {
        for key in properties.keys() {
            if seen.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

fn convert_feature(schema: &DatasetSchema, idx: usize, feature: Feature) -> ParcelRecord {
    let mut properties = feature.properties.unwrap_or_default();
    let values = schema
        .columns()
        .iter()
        .map(|column| properties.remove(column).and_then(convert_value))
        .collect();

    let geometry = feature
        .geometry
        .and_then(|geometry| match Geometry::<f64>::try_from(geometry) {
            Ok(g @ (Geometry::Polygon(_) | Geometry::MultiPolygon(_) | Geometry::Point(_))) => Some(g),
            Ok(_) => {
                log::warn!("Feature {idx}: unsupported geometry type, stored as null");
                None
            }
            Err(e) => {
                log::warn!("Feature {idx}: invalid geometry ({e}), stored as null");
                None
            }
        });

    ParcelRecord { values, geometry }
}

fn convert_value(value: Value) -> Option<AttributeValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(AttributeValue::Bool(b)),
        Value::Number(n) => n
            .as_i64()
            .map(AttributeValue::Integer)
            .or_else(|| n.as_f64().map(AttributeValue::Float)),
        Value::String(s) => Some(AttributeValue::Text(s)),
        other @ (Value::Array(_) | Value::Object(_)) => Some(AttributeValue::Text(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullProgress;
    use std::sync::atomic::{AtomicU64, Ordering};

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::6677" } },
        "features": [
            {
                "type": "Feature",
                "properties": { "大字名": "本町", "地番": "1174-2", "面積": 120.5 },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "大字名": "本町", "丁目名": "1丁目", "地番": 12, "面積": null },
                "geometry": { "type": "LineString", "coordinates": [[0, 0], [1, 1]] }
            },
            {
                "type": "Feature",
                "properties": { "大字名": "本町", "地番": "5" },
                "geometry": null
            }
        ]
    }"#;

    #[derive(Default)]
    struct CountingProgress {
        total: AtomicU64,
        done: AtomicU64,
    }

    impl ProgressCallback for CountingProgress {
        fn set_total(&self, total: u64) {
            self.total.store(total, Ordering::Relaxed);
        }
        fn inc(&self, delta: u64) {
            self.done.fetch_add(delta, Ordering::Relaxed);
        }
        fn set_message(&self, _msg: String) {}
        fn finish(&self, _msg: String) {}
    }

    fn parse(text: &str) -> Result<ParcelDataset, DatasetError> {
        parse_geojson(text, &ColumnNames::default(), None, &NullProgress)
    }

    #[test]
    fn columns_are_union_in_first_seen_order() {
        let data = parse(SAMPLE).unwrap();
        assert_eq!(data.schema().columns(), ["大字名", "地番", "面積", "丁目名"]);
        assert!(data.schema().has(ColumnRole::SubRegion));
        assert!(!data.schema().has(ColumnRole::SubSubRegion));
    }

    #[test]
    fn converts_property_values() {
        let data = parse(SAMPLE).unwrap();
        let first = &data.records()[0];
        let second = &data.records()[1];
        assert_eq!(first.values[2], Some(AttributeValue::Float(120.5)));
        assert_eq!(first.values[3], None, "missing key becomes null");
        assert_eq!(second.values[1], Some(AttributeValue::Integer(12)));
        assert_eq!(second.values[2], None, "JSON null becomes null");
        assert_eq!(
            data.text(second, ColumnRole::ParcelNumber).as_deref(),
            Some("12")
        );
    }

    #[test]
    fn keeps_polygons_and_nulls_other_geometry() {
        let data = parse(SAMPLE).unwrap();
        assert!(matches!(data.records()[0].geometry, Some(Geometry::Polygon(_))));
        assert!(data.records()[1].geometry.is_none());
        assert!(data.records()[2].geometry.is_none());
    }

    #[test]
    fn reads_declared_crs() {
        let data = parse(SAMPLE).unwrap();
        assert_eq!(data.crs().and_then(|c| c.epsg), Some(6677));
    }

    #[test]
    fn override_wins_over_declared_crs() {
        let data = parse_geojson(
            SAMPLE,
            &ColumnNames::default(),
            Some(crs_from_epsg(2451).unwrap()),
            &NullProgress,
        )
        .unwrap();
        assert_eq!(data.crs().and_then(|c| c.epsg), Some(2451));
    }

    #[test]
    fn missing_crs_is_left_unset() {
        let text = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"大字名": "A", "地番": "1"}, "geometry": null}
        ]}"#;
        assert!(parse(text).unwrap().crs().is_none());
    }

    #[test]
    fn requires_region_and_parcel_columns() {
        let text = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"大字名": "A"}, "geometry": null}
        ]}"#;
        let err = parse(text).unwrap_err();
        assert!(
            matches!(err, DatasetError::MissingColumn { ref column } if column == "地番"),
            "got {err}"
        );
    }

    #[test]
    fn custom_column_names_are_honoured() {
        let names = ColumnNames {
            region: "oaza".to_string(),
            parcel_number: "chiban".to_string(),
            ..ColumnNames::default()
        };
        let text = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"oaza": "A", "chiban": "1"}, "geometry": null}
        ]}"#;
        let data = parse_geojson(text, &names, None, &NullProgress).unwrap();
        assert_eq!(data.schema().index_of(ColumnRole::ParcelNumber), Some(1));
    }

    #[test]
    fn rejects_non_collections() {
        let text = r#"{"type": "Point", "coordinates": [0, 0]}"#;
        assert!(matches!(parse(text), Err(DatasetError::NotFeatureCollection)));
        assert!(matches!(parse("{not json"), Err(DatasetError::Json(_))));
    }

    #[test]
    fn reports_progress_per_feature() {
        let progress = CountingProgress::default();
        parse_geojson(SAMPLE, &ColumnNames::default(), None, &progress).unwrap();
        assert_eq!(progress.total.load(Ordering::Relaxed), 3);
        assert_eq!(progress.done.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parcels.geojson");
        std::fs::write(&path, SAMPLE).unwrap();
        let data = load_geojson(&path, &ColumnNames::default(), None, &NullProgress).unwrap();
        assert_eq!(data.len(), 3);
    }
}
