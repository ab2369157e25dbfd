//! Compile-time registry of supported coordinate reference systems.
//!
//! Each entry is a `(name, toml_content)` pair embedded via `include_str!`.
//! The TOML files under `crs/` hold `[[crs]]` tables with an EPSG code, a
//! name, and a proj definition string.

use serde::Deserialize;

/// Number of registered CRS definitions. Enforced by a test.
#[cfg(test)]
const EXPECTED_CRS_COUNT: usize = 41;

/// Embedded TOML CRS tables.
const CRS_TOMLS: &[(&str, &str)] = &[
    ("geographic", include_str!("../crs/geographic.toml")),
    ("jgd2000", include_str!("../crs/jgd2000.toml")),
    ("jgd2011", include_str!("../crs/jgd2011.toml")),
];

/// One registered CRS.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CrsDefinition {
    /// EPSG code.
    pub epsg: u32,
    /// Display name.
    pub name: String,
    /// proj definition string.
    pub proj: String,
}

#[derive(Deserialize)]
struct CrsFile {
    crs: Vec<CrsDefinition>,
}

/// Returns all registered CRS definitions.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse. Since these are
/// compile-time constants, parse failures indicate a development error
/// and are caught by the tests.
#[must_use]
pub fn all_definitions() -> Vec<CrsDefinition> {
    CRS_TOMLS
        .iter()
        .flat_map(|(name, toml_str)| {
            toml::de::from_str::<CrsFile>(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse CRS table '{name}': {e}"))
                .crs
        })
        .collect()
}

/// Looks up a registered CRS by EPSG code.
#[must_use]
pub fn find_by_epsg(code: u32) -> Option<CrsDefinition> {
    all_definitions().into_iter().find(|d| d.epsg == code)
}
