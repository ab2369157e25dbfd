#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Cadastral parcel types shared across the koji-map toolchain.
//!
//! A [`ParcelDataset`] is an in-memory, column-ordered collection of
//! parcel records loaded once from a vector dataset. Which of the optional
//! administrative columns it carries is recorded up front in a
//! [`DatasetSchema`], so the extraction engine branches on that descriptor
//! instead of probing records at runtime.

use std::borrow::Cow;
use std::fmt;

use geo::{Geometry, Polygon};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Default half-width of the neighborhood search square, in projected CRS
/// units (meters for the plane rectangular systems).
pub const DEFAULT_RANGE_M: f64 = 61.0;

/// Selection label meaning "no qualifier chosen".
pub const NOT_SPECIFIED: &str = "選択なし";

/// Which administrative or identifying role a column plays.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ColumnRole {
    /// Top-level administrative name (大字).
    Region,
    /// Optional second level (丁目).
    SubRegion,
    /// Optional third level (小字).
    SubSubRegion,
    /// Parcel number (地番), compared as text.
    ParcelNumber,
}

impl ColumnRole {
    /// All roles in hierarchy order.
    pub const ALL: &[Self] = &[
        Self::Region,
        Self::SubRegion,
        Self::SubSubRegion,
        Self::ParcelNumber,
    ];
}

/// Source column labels for each [`ColumnRole`].
///
/// Defaults match the Japanese electronic cadastral map (電子公図) schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ColumnNames {
    /// Region column label.
    pub region: String,
    /// Sub-region column label.
    pub sub_region: String,
    /// Sub-sub-region column label.
    pub sub_sub_region: String,
    /// Parcel number column label.
    pub parcel_number: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            region: "大字名".to_string(),
            sub_region: "丁目名".to_string(),
            sub_sub_region: "小字名".to_string(),
            parcel_number: "地番".to_string(),
        }
    }
}

impl ColumnNames {
    /// Returns the configured label for `role`.
    #[must_use]
    pub fn label(&self, role: ColumnRole) -> &str {
        match role {
            ColumnRole::Region => &self.region,
            ColumnRole::SubRegion => &self.sub_region,
            ColumnRole::SubSubRegion => &self.sub_sub_region,
            ColumnRole::ParcelNumber => &self.parcel_number,
        }
    }
}

/// Column layout of a dataset plus which role columns it actually has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSchema {
    columns: Vec<String>,
    names: ColumnNames,
    region: Option<usize>,
    sub_region: Option<usize>,
    sub_sub_region: Option<usize>,
    parcel_number: Option<usize>,
}

impl DatasetSchema {
    /// Builds a schema from ordered (non-geometry) column labels, resolving
    /// each role against `names`.
    #[must_use]
    pub fn new(columns: Vec<String>, names: ColumnNames) -> Self {
        let find = |label: &str| columns.iter().position(|c| c == label);
        let region = find(&names.region);
        let sub_region = find(&names.sub_region);
        let sub_sub_region = find(&names.sub_sub_region);
        let parcel_number = find(&names.parcel_number);

        Self {
            columns,
            names,
            region,
            sub_region,
            sub_sub_region,
            parcel_number,
        }
    }

    /// Ordered column labels, excluding geometry.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The role-to-label mapping this schema was resolved with.
    #[must_use]
    pub const fn names(&self) -> &ColumnNames {
        &self.names
    }

    /// Position of the column playing `role`, if the dataset has it.
    #[must_use]
    pub const fn index_of(&self, role: ColumnRole) -> Option<usize> {
        match role {
            ColumnRole::Region => self.region,
            ColumnRole::SubRegion => self.sub_region,
            ColumnRole::SubSubRegion => self.sub_sub_region,
            ColumnRole::ParcelNumber => self.parcel_number,
        }
    }

    /// Whether the dataset has a column for `role`.
    #[must_use]
    pub const fn has(&self, role: ColumnRole) -> bool {
        self.index_of(role).is_some()
    }

    /// Configured label for `role`, whether or not the column exists.
    #[must_use]
    pub fn label(&self, role: ColumnRole) -> &str {
        self.names.label(role)
    }
}

/// A single attribute value. Nulls are represented as `None` at the
/// record level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Boolean attribute.
    Bool(bool),
    /// Integral attribute.
    Integer(i64),
    /// Floating point attribute.
    Float(f64),
    /// Free-form text.
    Text(String),
}

impl AttributeValue {
    /// Text form used for equality against query strings.
    #[must_use]
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(s) => Cow::Borrowed(s),
            other => Cow::Owned(other.to_string()),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// A coordinate reference system, identified by EPSG code where known and
/// carrying the proj definition used to transform out of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crs {
    /// EPSG code, if the definition came from the registry.
    pub epsg: Option<u32>,
    /// Human-readable name.
    pub name: String,
    /// proj-style definition string (`+proj=tmerc ...`).
    pub definition: String,
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.epsg {
            Some(code) => write!(f, "EPSG:{code} ({})", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// One parcel: attribute values aligned with [`DatasetSchema::columns`]
/// and an optional geometry in the dataset's CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelRecord {
    /// Attribute values in column order; `None` is null.
    pub values: Vec<Option<AttributeValue>>,
    /// Polygon, multi-polygon or (degenerate) point geometry.
    pub geometry: Option<Geometry<f64>>,
}

/// An ordered, read-only collection of parcels sharing one schema and CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelDataset {
    schema: DatasetSchema,
    crs: Option<Crs>,
    records: Vec<ParcelRecord>,
}

impl ParcelDataset {
    /// Creates a dataset. Records shorter than the schema are padded with
    /// nulls; extra values are dropped.
    #[must_use]
    pub fn new(schema: DatasetSchema, crs: Option<Crs>, mut records: Vec<ParcelRecord>) -> Self {
        let width = schema.columns().len();
        for record in &mut records {
            record.values.resize(width, None);
        }
        Self {
            schema,
            crs,
            records,
        }
    }

    /// A dataset with the same schema and CRS holding `records`.
    #[must_use]
    pub fn subset(&self, records: Vec<ParcelRecord>) -> Self {
        Self::new(self.schema.clone(), self.crs.clone(), records)
    }

    /// The schema descriptor.
    #[must_use]
    pub const fn schema(&self) -> &DatasetSchema {
        &self.schema
    }

    /// Dataset-level CRS.
    #[must_use]
    pub const fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    /// All records in load order.
    #[must_use]
    pub fn records(&self) -> &[ParcelRecord] {
        &self.records
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Non-null value of the `role` column for `record`.
    #[must_use]
    pub fn value<'a>(&self, record: &'a ParcelRecord, role: ColumnRole) -> Option<&'a AttributeValue> {
        let idx = self.schema.index_of(role)?;
        record.values.get(idx)?.as_ref()
    }

    /// Text of the `role` column for `record`, if present and non-null.
    #[must_use]
    pub fn text<'a>(&self, record: &'a ParcelRecord, role: ColumnRole) -> Option<Cow<'a, str>> {
        self.value(record, role).map(AttributeValue::as_text)
    }
}

/// An optional qualifier in a query: either a concrete value or the
/// "not specified" sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Qualifier {
    /// No constraint.
    #[default]
    NotSpecified,
    /// Constrain to this exact value.
    Value(String),
}

impl Qualifier {
    /// Interprets a UI selection: `None`, blank, or [`NOT_SPECIFIED`] all
    /// mean no constraint.
    #[must_use]
    pub fn from_selection(selection: Option<&str>) -> Self {
        match selection.map(str::trim) {
            None | Some("" | NOT_SPECIFIED) => Self::NotSpecified,
            Some(value) => Self::Value(value.to_string()),
        }
    }

    /// The constrained value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::NotSpecified => None,
            Self::Value(v) => Some(v),
        }
    }

    /// Whether a value was specified.
    #[must_use]
    pub const fn is_specified(&self) -> bool {
        matches!(self, Self::Value(_))
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSpecified => f.write_str("指定なし"),
            Self::Value(v) => f.write_str(v),
        }
    }
}

/// An extraction query.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionCriteria {
    /// Required region name.
    pub region: String,
    /// Optional sub-region.
    pub sub_region: Qualifier,
    /// Optional sub-sub-region.
    pub sub_sub_region: Qualifier,
    /// Required parcel number, matched as text.
    pub parcel_number: String,
    /// Half-width of the neighborhood square in projected CRS units.
    pub range_m: f64,
}

impl SelectionCriteria {
    /// Criteria with no qualifiers and the default half-width.
    #[must_use]
    pub fn new(region: impl Into<String>, parcel_number: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            sub_region: Qualifier::NotSpecified,
            sub_sub_region: Qualifier::NotSpecified,
            parcel_number: parcel_number.into(),
            range_m: DEFAULT_RANGE_M,
        }
    }

    /// Sets the sub-region qualifier.
    #[must_use]
    pub fn with_sub_region(mut self, sub_region: Qualifier) -> Self {
        self.sub_region = sub_region;
        self
    }

    /// Sets the sub-sub-region qualifier.
    #[must_use]
    pub fn with_sub_sub_region(mut self, sub_sub_region: Qualifier) -> Self {
        self.sub_sub_region = sub_sub_region;
        self
    }

    /// Overrides the half-width.
    #[must_use]
    pub const fn with_range(mut self, range_m: f64) -> Self {
        self.range_m = range_m;
        self
    }

    /// The qualifier for an optional role. Required roles return
    /// [`Qualifier::NotSpecified`].
    #[must_use]
    pub fn qualifier(&self, role: ColumnRole) -> &Qualifier {
        const NONE: &Qualifier = &Qualifier::NotSpecified;
        match role {
            ColumnRole::SubRegion => &self.sub_region,
            ColumnRole::SubSubRegion => &self.sub_sub_region,
            ColumnRole::Region | ColumnRole::ParcelNumber => NONE,
        }
    }
}

impl fmt::Display for SelectionCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "region={}", self.region)?;
        if let Some(v) = self.sub_region.value() {
            write!(f, ", sub_region={v}")?;
        }
        if let Some(v) = self.sub_sub_region.value() {
            write!(f, ", sub_sub_region={v}")?;
        }
        write!(f, ", parcel_number={}", self.parcel_number)
    }
}

/// Per-criterion match counts reported when a query matches nothing.
///
/// Optional counts are `Some` only when that qualifier was specified and
/// the dataset has the column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDiagnostics {
    /// Records whose region alone matches.
    pub region_matches: usize,
    /// Records whose parcel number alone matches.
    pub parcel_number_matches: usize,
    /// Records whose sub-region alone matches.
    pub sub_region_matches: Option<usize>,
    /// Records whose sub-sub-region alone matches.
    pub sub_sub_region_matches: Option<usize>,
}

impl fmt::Display for MatchDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "region matches: {}, parcel number matches: {}",
            self.region_matches, self.parcel_number_matches
        )?;
        if let Some(n) = self.sub_region_matches {
            write!(f, ", sub-region matches: {n}")?;
        }
        if let Some(n) = self.sub_sub_region_matches {
            write!(f, ", sub-sub-region matches: {n}")?;
        }
        Ok(())
    }
}

/// Output of one extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    /// Records matching the criteria exactly.
    pub target_set: ParcelDataset,
    /// Records intersecting the search square, clipped to it.
    pub neighborhood_set: ParcelDataset,
    /// The search square in the dataset CRS.
    pub search_square: Polygon<f64>,
    /// Human-readable count summary.
    pub status: String,
}

/// Formats the success status line for an extraction.
#[must_use]
pub fn status_message(targets: usize, neighbors: usize) -> String {
    format!("対象筆: {targets}件, 周辺筆: {neighbors}件")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(columns: &[&str]) -> DatasetSchema {
        DatasetSchema::new(
            columns.iter().map(ToString::to_string).collect(),
            ColumnNames::default(),
        )
    }

    #[test]
    fn schema_resolves_present_roles_only() {
        let schema = schema(&["大字名", "地番", "所在"]);
        assert_eq!(schema.index_of(ColumnRole::Region), Some(0));
        assert_eq!(schema.index_of(ColumnRole::ParcelNumber), Some(1));
        assert!(!schema.has(ColumnRole::SubRegion));
        assert!(!schema.has(ColumnRole::SubSubRegion));
        assert_eq!(schema.label(ColumnRole::SubRegion), "丁目名");
    }

    #[test]
    fn dataset_pads_short_records() {
        let dataset = ParcelDataset::new(
            schema(&["大字名", "地番", "所在"]),
            None,
            vec![ParcelRecord {
                values: vec![Some("Aza1".into())],
                geometry: None,
            }],
        );
        assert_eq!(dataset.records()[0].values.len(), 3);
        assert_eq!(
            dataset.text(&dataset.records()[0], ColumnRole::Region).as_deref(),
            Some("Aza1")
        );
        assert!(dataset.value(&dataset.records()[0], ColumnRole::ParcelNumber).is_none());
    }

    #[test]
    fn numeric_values_compare_as_text() {
        assert_eq!(AttributeValue::Integer(100).as_text(), "100");
        assert_eq!(AttributeValue::Float(100.0).as_text(), "100");
        assert_eq!(AttributeValue::Text("0012".into()).as_text(), "0012");
    }

    #[test]
    fn qualifier_treats_sentinel_as_unspecified() {
        assert_eq!(Qualifier::from_selection(None), Qualifier::NotSpecified);
        assert_eq!(
            Qualifier::from_selection(Some(NOT_SPECIFIED)),
            Qualifier::NotSpecified
        );
        assert_eq!(Qualifier::from_selection(Some("  ")), Qualifier::NotSpecified);
        assert_eq!(
            Qualifier::from_selection(Some("1丁目")),
            Qualifier::Value("1丁目".to_string())
        );
    }

    #[test]
    fn criteria_defaults_to_fixed_range() {
        let criteria = SelectionCriteria::new("Aza1", "100");
        assert!((criteria.range_m - 61.0).abs() < f64::EPSILON);
        assert!(!criteria.sub_region.is_specified());
        assert_eq!(criteria.to_string(), "region=Aza1, parcel_number=100");
    }

    #[test]
    fn diagnostics_display_includes_optional_counts() {
        let diagnostics = MatchDiagnostics {
            region_matches: 2,
            parcel_number_matches: 0,
            sub_region_matches: Some(1),
            sub_sub_region_matches: None,
        };
        assert_eq!(
            diagnostics.to_string(),
            "region matches: 2, parcel number matches: 0, sub-region matches: 1"
        );
    }

    #[test]
    fn status_message_reports_counts() {
        assert_eq!(status_message(1, 12), "対象筆: 1件, 周辺筆: 12件");
    }
}
