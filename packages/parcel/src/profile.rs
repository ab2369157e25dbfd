//! Dataset profiling: column null rates, distinct counts, top regions.

use std::collections::{BTreeMap, BTreeSet};

use koji_map_parcel_models::{ColumnRole, ParcelDataset};
use serde::{Deserialize, Serialize};

/// How many region values [`profile_dataset`] reports.
pub const TOP_VALUE_LIMIT: usize = 20;

/// Null statistics for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnProfile {
    /// Column label.
    pub name: String,
    /// Non-null value count.
    pub non_null: usize,
    /// Null value count.
    pub nulls: usize,
    /// Null share of all records, in percent, one decimal.
    pub null_percent: f64,
}

/// Distinct-value statistics for a role column the dataset has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleProfile {
    /// Which role.
    pub role: ColumnRole,
    /// Column label.
    pub column: String,
    /// Number of distinct non-null values.
    pub distinct: usize,
    /// Number of non-null values.
    pub non_null: usize,
}

/// A value and how many records carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueCount {
    /// The value as text.
    pub value: String,
    /// Record count.
    pub count: usize,
}

/// Overview of a loaded dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetProfile {
    /// Total records.
    pub record_count: usize,
    /// CRS label, if known.
    pub crs: Option<String>,
    /// Records without geometry.
    pub null_geometries: usize,
    /// Per-column null statistics in column order.
    pub columns: Vec<ColumnProfile>,
    /// Role columns present in the dataset.
    pub roles: Vec<RoleProfile>,
    /// Most common region values.
    pub top_regions: Vec<ValueCount>,
}

/// Profiles `dataset`.
#[must_use]
pub fn profile_dataset(dataset: &ParcelDataset) -> DatasetProfile {
    let total = dataset.len();

    let columns = dataset
        .schema()
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let non_null = dataset
                .records()
                .iter()
                .filter(|r| r.values.get(idx).is_some_and(Option::is_some))
                .count();
            let nulls = total - non_null;
            ColumnProfile {
                name: name.clone(),
                non_null,
                nulls,
                null_percent: percent(nulls, total),
            }
        })
        .collect();

    let roles = ColumnRole::ALL
        .iter()
        .filter(|role| dataset.schema().has(**role))
        .map(|&role| {
            let values: Vec<String> = dataset
                .records()
                .iter()
                .filter_map(|r| dataset.text(r, role))
                .map(|s| s.into_owned())
                .collect();
            RoleProfile {
                role,
                column: dataset.schema().label(role).to_string(),
                non_null: values.len(),
                distinct: values.iter().collect::<BTreeSet<_>>().len(),
            }
        })
        .collect();

    DatasetProfile {
        record_count: total,
        crs: dataset.crs().map(ToString::to_string),
        null_geometries: dataset
            .records()
            .iter()
            .filter(|r| r.geometry.is_none())
            .count(),
        columns,
        roles,
        top_regions: value_counts(dataset, ColumnRole::Region, TOP_VALUE_LIMIT),
    }
}

/// Counts of each non-null value of a role column, most common first,
/// ties broken by value.
#[must_use]
pub fn value_counts(dataset: &ParcelDataset, role: ColumnRole, limit: usize) -> Vec<ValueCount> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for record in dataset.records() {
        if let Some(value) = dataset.text(record, role) {
            *counts.entry(value.into_owned()).or_default() += 1;
        }
    }

    let mut ordered: Vec<ValueCount> = counts
        .into_iter()
        .map(|(value, count)| ValueCount { value, count })
        .collect();
    ordered.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    ordered.truncate(limit);
    ordered
}

#[allow(clippy::cast_precision_loss)]
fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64 * 1000.0).round() / 10.0
}
