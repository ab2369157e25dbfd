//! Attribute filter: resolves the target records for a query.
//!
//! Region and parcel number are mandatory and compared as exact text.
//! Sub-region and sub-sub-region constraints apply only when the query
//! specifies them *and* the dataset has the column; a dataset lacking the
//! column silently ignores the qualifier.

use koji_map_parcel_models::{
    ColumnRole, MatchDiagnostics, ParcelDataset, ParcelRecord, SelectionCriteria,
};

use crate::ParcelError;

/// Returns the records matching `criteria`, in dataset order.
///
/// # Errors
///
/// * [`ParcelError::SchemaMismatch`] if the region or parcel number column
///   is absent.
/// * [`ParcelError::NoMatchFound`] if nothing matches, carrying
///   [`MatchDiagnostics`].
pub fn filter_targets(
    dataset: &ParcelDataset,
    criteria: &SelectionCriteria,
) -> Result<ParcelDataset, ParcelError> {
    require_column(dataset, ColumnRole::Region)?;
    require_column(dataset, ColumnRole::ParcelNumber)?;

    let qualifiers = active_qualifiers(dataset, criteria);

    let matched: Vec<ParcelRecord> = dataset
        .records()
        .iter()
        .filter(|record| {
            field_equals(dataset, record, ColumnRole::Region, &criteria.region)
                && field_equals(
                    dataset,
                    record,
                    ColumnRole::ParcelNumber,
                    &criteria.parcel_number,
                )
                && qualifiers
                    .iter()
                    .all(|(role, value)| field_equals(dataset, record, *role, value))
        })
        .cloned()
        .collect();

    if matched.is_empty() {
        let diagnostics = diagnose(dataset, criteria);
        log::info!("No parcel matches {criteria}: {diagnostics}");
        return Err(ParcelError::NoMatchFound {
            criteria: criteria.clone(),
            diagnostics,
        });
    }

    log::debug!("{} record(s) match {criteria}", matched.len());

    Ok(dataset.subset(matched))
}

/// Counts how many records each criterion matches on its own.
#[must_use]
pub fn diagnose(dataset: &ParcelDataset, criteria: &SelectionCriteria) -> MatchDiagnostics {
    let count = |role: ColumnRole, value: &str| {
        dataset
            .records()
            .iter()
            .filter(|record| field_equals(dataset, record, role, value))
            .count()
    };

    let optional = |role: ColumnRole| {
        criteria
            .qualifier(role)
            .value()
            .filter(|_| dataset.schema().has(role))
            .map(|value| count(role, value))
    };

    MatchDiagnostics {
        region_matches: count(ColumnRole::Region, &criteria.region),
        parcel_number_matches: count(ColumnRole::ParcelNumber, &criteria.parcel_number),
        sub_region_matches: optional(ColumnRole::SubRegion),
        sub_sub_region_matches: optional(ColumnRole::SubSubRegion),
    }
}

/// Optional qualifiers that actually constrain this dataset.
fn active_qualifiers<'a>(
    dataset: &ParcelDataset,
    criteria: &'a SelectionCriteria,
) -> Vec<(ColumnRole, &'a str)> {
    [ColumnRole::SubRegion, ColumnRole::SubSubRegion]
        .into_iter()
        .filter_map(|role| {
            let value = criteria.qualifier(role).value()?;
            if dataset.schema().has(role) {
                Some((role, value))
            } else {
                log::debug!(
                    "Ignoring {role} qualifier '{value}': dataset has no '{}' column",
                    dataset.schema().label(role)
                );
                None
            }
        })
        .collect()
}

fn require_column(dataset: &ParcelDataset, role: ColumnRole) -> Result<(), ParcelError> {
    if dataset.schema().has(role) {
        Ok(())
    } else {
        Err(ParcelError::SchemaMismatch {
            column: dataset.schema().label(role).to_string(),
        })
    }
}

/// Non-null and textually equal.
pub(crate) fn field_equals(
    dataset: &ParcelDataset,
    record: &ParcelRecord,
    role: ColumnRole,
    expected: &str,
) -> bool {
    dataset
        .text(record, role)
        .is_some_and(|actual| actual == expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Geometry, Rect, coord};
    use koji_map_parcel_models::{ColumnNames, DatasetSchema, Qualifier};

    fn square(cx: f64, cy: f64) -> Option<Geometry<f64>> {
        Some(Geometry::Polygon(
            Rect::new(
                coord! { x: cx - 0.5, y: cy - 0.5 },
                coord! { x: cx + 0.5, y: cy + 0.5 },
            )
            .to_polygon(),
        ))
    }

    fn dataset(columns: &[&str], rows: Vec<Vec<Option<&str>>>) -> ParcelDataset {
        let schema = DatasetSchema::new(
            columns.iter().map(ToString::to_string).collect(),
            ColumnNames::default(),
        );
        let records = rows
            .into_iter()
            .zip((0_u32..).map(|i| f64::from(i) * 10.0))
            .map(|(row, x)| ParcelRecord {
                values: row.into_iter().map(|v| v.map(Into::into)).collect(),
                geometry: square(x, 0.0),
            })
            .collect();
        ParcelDataset::new(schema, None, records)
    }

    fn hierarchical() -> ParcelDataset {
        dataset(
            &["大字名", "丁目名", "小字名", "地番"],
            vec![
                vec![Some("Aza1"), Some("1丁目"), Some("東"), Some("100")],
                vec![Some("Aza1"), Some("2丁目"), Some("西"), Some("100")],
                vec![Some("Aza1"), None, None, Some("100")],
                vec![Some("Aza2"), Some("1丁目"), Some("東"), Some("100")],
                vec![Some("Aza1"), Some("1丁目"), Some("東"), None],
            ],
        )
    }

    #[test]
    fn matches_region_and_parcel_number() {
        let targets = filter_targets(&hierarchical(), &SelectionCriteria::new("Aza1", "100"))
            .unwrap();
        assert_eq!(targets.len(), 3);
    }

    #[test]
    fn applies_sub_region_when_column_present() {
        let criteria = SelectionCriteria::new("Aza1", "100")
            .with_sub_region(Qualifier::Value("2丁目".to_string()));
        let targets = filter_targets(&hierarchical(), &criteria).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(
            targets
                .text(&targets.records()[0], ColumnRole::SubSubRegion)
                .as_deref(),
            Some("西")
        );
    }

    #[test]
    fn applies_both_qualifiers() {
        let criteria = SelectionCriteria::new("Aza1", "100")
            .with_sub_region(Qualifier::Value("1丁目".to_string()))
            .with_sub_sub_region(Qualifier::Value("東".to_string()));
        let targets = filter_targets(&hierarchical(), &criteria).unwrap();
        assert_eq!(targets.len(), 1);
    }

    #[test]
    fn qualifier_excludes_null_values() {
        let criteria = SelectionCriteria::new("Aza1", "100")
            .with_sub_region(Qualifier::Value("1丁目".to_string()));
        let targets = filter_targets(&hierarchical(), &criteria).unwrap();
        assert!(
            targets
                .records()
                .iter()
                .all(|r| targets.value(r, ColumnRole::SubRegion).is_some())
        );
    }

    #[test]
    fn ignores_qualifier_for_missing_column() {
        let flat = dataset(
            &["大字名", "地番"],
            vec![vec![Some("Aza1"), Some("100")], vec![Some("Aza1"), Some("200")]],
        );
        let criteria = SelectionCriteria::new("Aza1", "100")
            .with_sub_region(Qualifier::Value("1丁目".to_string()))
            .with_sub_sub_region(Qualifier::Value("東".to_string()));
        let targets = filter_targets(&flat, &criteria).unwrap();
        assert_eq!(targets.len(), 1);
    }

    #[test]
    fn parcel_numbers_compare_as_text() {
        let data = dataset(
            &["大字名", "地番"],
            vec![vec![Some("Aza1"), Some("0100")], vec![Some("Aza1"), Some("100")]],
        );
        let targets = filter_targets(&data, &SelectionCriteria::new("Aza1", "0100")).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(
            targets
                .text(&targets.records()[0], ColumnRole::ParcelNumber)
                .as_deref(),
            Some("0100")
        );
    }

    #[test]
    fn missing_region_column_is_schema_mismatch() {
        let data = dataset(&["地番"], vec![vec![Some("100")]]);
        let err = filter_targets(&data, &SelectionCriteria::new("Aza1", "100")).unwrap_err();
        assert!(
            matches!(err, ParcelError::SchemaMismatch { ref column } if column == "大字名"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn missing_parcel_column_is_schema_mismatch() {
        let data = dataset(&["大字名"], vec![vec![Some("Aza1")]]);
        let err = filter_targets(&data, &SelectionCriteria::new("Aza1", "100")).unwrap_err();
        assert!(matches!(err, ParcelError::SchemaMismatch { ref column } if column == "地番"));
    }

    #[test]
    fn no_match_reports_diagnostics() {
        let data = hierarchical();
        let criteria = SelectionCriteria::new("Aza1", "999")
            .with_sub_region(Qualifier::Value("1丁目".to_string()));
        let err = filter_targets(&data, &criteria).unwrap_err();
        let ParcelError::NoMatchFound { diagnostics, .. } = err else {
            panic!("expected NoMatchFound, got {err}");
        };

        let direct_region = data
            .records()
            .iter()
            .filter(|r| data.text(r, ColumnRole::Region).as_deref() == Some("Aza1"))
            .count();
        assert_eq!(diagnostics.region_matches, direct_region);
        assert_eq!(diagnostics.parcel_number_matches, 0);
        assert_eq!(diagnostics.sub_region_matches, Some(3));
        assert_eq!(diagnostics.sub_sub_region_matches, None);
    }

    #[test]
    fn diagnostics_omit_qualifier_for_missing_column() {
        let flat = dataset(&["大字名", "地番"], vec![vec![Some("Aza1"), Some("100")]]);
        let criteria = SelectionCriteria::new("Aza9", "100")
            .with_sub_region(Qualifier::Value("1丁目".to_string()));
        let diagnostics = diagnose(&flat, &criteria);
        assert_eq!(diagnostics.region_matches, 0);
        assert_eq!(diagnostics.parcel_number_matches, 1);
        assert_eq!(diagnostics.sub_region_matches, None);
    }
}
