//! Output file names and MIME types.

use koji_map_parcel_models::SelectionCriteria;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// MIME type of KML documents.
pub const KML_MIME: &str = "application/vnd.google-earth.kml+xml";

/// MIME type of the centroid CSV.
pub const CSV_MIME: &str = "text/csv";

/// Which of the two result sets an output belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum ResultKind {
    /// Parcels matching the query.
    #[strum(serialize = "対象筆")]
    #[serde(rename = "対象筆")]
    Target,
    /// Parcels clipped to the search square.
    #[strum(serialize = "周辺筆")]
    #[serde(rename = "周辺筆")]
    Neighborhood,
}

/// Joins the region, any specified qualifiers, and the parcel number with
/// `_`.
///
/// Path separators and characters invalid in file names are replaced with
/// `_`, so the stem always names a file directly inside the output
/// directory.
#[must_use]
pub fn file_stem(criteria: &SelectionCriteria) -> String {
    let mut parts = vec![criteria.region.as_str()];
    if let Some(sub_region) = criteria.sub_region.value() {
        parts.push(sub_region);
    }
    if let Some(sub_sub_region) = criteria.sub_sub_region.value() {
        parts.push(sub_sub_region);
    }
    parts.push(&criteria.parcel_number);
    parts
        .join("_")
        .chars()
        .map(|c| if is_unsafe_in_file_name(c) { '_' } else { c })
        .collect()
}

fn is_unsafe_in_file_name(c: char) -> bool {
    matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_control()
}

/// KML document name, e.g. `Aza1_100_対象筆`.
#[must_use]
pub fn document_name(stem: &str, kind: ResultKind) -> String {
    format!("{stem}_{kind}")
}

/// KML file name, e.g. `Aza1_100_周辺筆.kml`.
#[must_use]
pub fn kml_file_name(stem: &str, kind: ResultKind) -> String {
    format!("{}.kml", document_name(stem, kind))
}

/// Centroid CSV file name. Only the neighborhood set is exported.
#[must_use]
pub fn csv_file_name(stem: &str) -> String {
    format!("{}.csv", document_name(stem, ResultKind::Neighborhood))
}

/// Summary JSON file name.
#[must_use]
pub fn summary_file_name(stem: &str) -> String {
    format!("{stem}_summary.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use koji_map_parcel_models::Qualifier;

    #[test]
    fn stem_skips_unspecified_qualifiers() {
        let criteria = SelectionCriteria::new("Aza1", "100");
        assert_eq!(file_stem(&criteria), "Aza1_100");
    }

    #[test]
    fn stem_includes_specified_qualifiers_in_order() {
        let criteria = SelectionCriteria::new("本町", "1174-2")
            .with_sub_region(Qualifier::Value("1丁目".to_string()))
            .with_sub_sub_region(Qualifier::Value("東".to_string()));
        assert_eq!(file_stem(&criteria), "本町_1丁目_東_1174-2");

        let sub_sub_only = SelectionCriteria::new("本町", "5")
            .with_sub_sub_region(Qualifier::Value("東".to_string()));
        assert_eq!(file_stem(&sub_sub_only), "本町_東_5");
    }

    #[test]
    fn stem_never_leaves_the_output_directory() {
        let criteria = SelectionCriteria::new("..", "../etc/passwd")
            .with_sub_region(Qualifier::Value(r"a\b".to_string()));
        let stem = file_stem(&criteria);
        assert_eq!(stem, ".._a_b_.._etc_passwd");

        let path = std::path::Path::new("out").join(kml_file_name(&stem, ResultKind::Target));
        assert_eq!(path.parent(), Some(std::path::Path::new("out")));
    }

    #[test]
    fn file_names_carry_kind_suffix() {
        assert_eq!(kml_file_name("Aza1_100", ResultKind::Target), "Aza1_100_対象筆.kml");
        assert_eq!(
            kml_file_name("Aza1_100", ResultKind::Neighborhood),
            "Aza1_100_周辺筆.kml"
        );
        assert_eq!(csv_file_name("Aza1_100"), "Aza1_100_周辺筆.csv");
        assert_eq!(summary_file_name("Aza1_100"), "Aza1_100_summary.json");
        assert_eq!(document_name("Aza1_100", ResultKind::Target), "Aza1_100_対象筆");
    }

    #[test]
    fn kind_parses_from_suffix() {
        assert_eq!("周辺筆".parse::<ResultKind>().unwrap(), ResultKind::Neighborhood);
    }
}
