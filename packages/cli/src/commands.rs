//! Subcommand implementations shared by the flag-driven and interactive
//! entry points.

use std::path::{Path, PathBuf};

use koji_map_cli_utils::{IndicatifProgress, MultiProgress};
use koji_map_dataset::load_geojson;
use koji_map_export::naming::ResultKind;
use koji_map_export::{TablePreview, write_outputs};
use koji_map_kml::KmlStyle;
use koji_map_parcel::profile::profile_dataset;
use koji_map_parcel::search::{
    SEARCH_DISPLAY_LIMIT, SearchMode, region_options, search_parcel_numbers, sub_region_options,
    sub_sub_region_options,
};
use koji_map_parcel::stats::neighborhood_stats;
use koji_map_parcel::{ParcelDataset, extract as run_extract};
use koji_map_parcel_models::{Crs, Qualifier, SelectionCriteria};
use koji_map_projection::{ProjectionError, crs_from_epsg, resolve_crs};

use crate::config::FileConfig;

/// Rows shown per preview table.
const PREVIEW_ROWS: usize = 20;

/// Output directory when neither the flag nor the config sets one.
const DEFAULT_OUTPUT_DIR: &str = ".";

/// CRS override from the `--crs` flag, else the config's `epsg`.
///
/// # Errors
///
/// Returns [`ProjectionError`] if the value does not resolve.
pub fn crs_override(config: &FileConfig, flag: Option<&str>) -> Result<Option<Crs>, ProjectionError> {
    match (flag, config.epsg) {
        (Some(value), _) => resolve_crs(value).map(Some),
        (None, Some(code)) => crs_from_epsg(code).map(Some),
        (None, None) => Ok(None),
    }
}

/// Loads the dataset with a progress bar.
///
/// # Errors
///
/// Returns an error if the CRS override is invalid or loading fails.
pub fn load_dataset(
    multi: &MultiProgress,
    config: &FileConfig,
    input: &Path,
    crs: Option<&str>,
) -> Result<ParcelDataset, Box<dyn std::error::Error>> {
    let crs = crs_override(config, crs)?;
    let progress = IndicatifProgress::records_bar(multi, "Loading parcels");
    Ok(load_geojson(input, &config.columns, crs, &*progress)?)
}

/// Builds criteria from raw selections.
#[must_use]
pub fn criteria(
    region: &str,
    sub_region: Option<&str>,
    sub_sub_region: Option<&str>,
    parcel: &str,
    range: f64,
) -> SelectionCriteria {
    SelectionCriteria::new(region.trim(), parcel.trim())
        .with_sub_region(Qualifier::from_selection(sub_region))
        .with_sub_sub_region(Qualifier::from_selection(sub_sub_region))
        .with_range(range)
}

/// `--output-dir`, else the config's `output_dir`, else the working
/// directory.
#[must_use]
pub fn output_dir(config: &FileConfig, flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| config.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
}

/// Runs one extraction and prints the status line, previews, and written
/// files. Returns `false` when the extraction itself failed; the failure
/// message has then already been printed.
///
/// # Errors
///
/// Returns an error if writing the outputs fails.
pub fn extract(
    dataset: &ParcelDataset,
    criteria: &SelectionCriteria,
    output_dir: Option<&Path>,
    style: &KmlStyle,
) -> Result<bool, Box<dyn std::error::Error>> {
    let result = match run_extract(dataset, criteria) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("{e}");
            return Ok(false);
        }
    };

    println!("{}", result.status);
    println!();
    print_preview(ResultKind::Target, &TablePreview::from_dataset(&result.target_set));
    print_preview(
        ResultKind::Neighborhood,
        &TablePreview::from_dataset(&result.neighborhood_set),
    );

    let stats = neighborhood_stats(&result.neighborhood_set);
    for distinct in &stats.distinct {
        println!("{}: {} distinct", distinct.column, distinct.distinct);
    }
    if let Some(area) = stats.area {
        println!(
            "area: mean {:.2}, min {:.2}, median {:.2}, max {:.2}",
            area.mean, area.min, area.median, area.max
        );
    }

    let Some(dir) = output_dir else {
        return Ok(true);
    };
    let files = write_outputs(dir, criteria, &result, style)?;
    println!();
    for file in files.all() {
        println!("{} ({})", file.path.display(), file.mime);
    }

    Ok(true)
}

fn print_preview(kind: ResultKind, preview: &TablePreview) {
    println!("{kind} ({}件)", preview.len());
    if preview.is_empty() {
        println!();
        return;
    }

    let shown = TablePreview {
        columns: preview.columns.clone(),
        rows: preview.rows.iter().take(PREVIEW_ROWS).cloned().collect(),
    };
    print!("{shown}");
    if preview.len() > PREVIEW_ROWS {
        println!("... {} more", preview.len() - PREVIEW_ROWS);
    }
    println!();
}

/// Prints parcel-number search hits, capped at the display limit.
pub fn search(dataset: &ParcelDataset, term: &str, mode: SearchMode) {
    let hits = search_parcel_numbers(dataset, term, mode);
    if hits.is_empty() {
        println!("No parcel numbers match '{term}' ({mode})");
        return;
    }

    println!("{:<8} {:<16} {:<12} {:<12} {:<14} CENTROID", "INDEX", "REGION", "SUB", "SUB-SUB", "PARCEL");
    for hit in hits.iter().take(SEARCH_DISPLAY_LIMIT) {
        let centroid = hit
            .centroid
            .map_or_else(String::new, |c| format!("{:.3}, {:.3}", c.x(), c.y()));
        println!(
            "{:<8} {:<16} {:<12} {:<12} {:<14} {centroid}",
            hit.index,
            hit.region.as_deref().unwrap_or("-"),
            hit.sub_region.as_deref().unwrap_or("-"),
            hit.sub_sub_region.as_deref().unwrap_or("-"),
            hit.parcel_number,
        );
    }

    if hits.len() > SEARCH_DISPLAY_LIMIT {
        println!("\n{} matches, showing the first {SEARCH_DISPLAY_LIMIT}", hits.len());
    } else {
        println!("\n{} match(es)", hits.len());
    }
}

/// Prints the dataset profile.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn profile(dataset: &ParcelDataset, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let profile = profile_dataset(dataset);
    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }

    println!("Records: {}", profile.record_count);
    println!("CRS: {}", profile.crs.as_deref().unwrap_or("(not declared)"));
    println!("Null geometries: {}", profile.null_geometries);
    println!();

    println!("{:<24} {:>10} {:>10} {:>8}", "COLUMN", "NON-NULL", "NULL", "NULL %");
    for column in &profile.columns {
        println!(
            "{:<24} {:>10} {:>10} {:>7.1}%",
            column.name, column.non_null, column.nulls, column.null_percent
        );
    }
    println!();

    for role in &profile.roles {
        println!(
            "{} ({}): {} distinct of {} values",
            role.column, role.role, role.distinct, role.non_null
        );
    }
    println!();

    println!("Top regions:");
    for value in &profile.top_regions {
        println!("  {:<24} {}", value.value, value.count);
    }

    Ok(())
}

/// Prints the selectable qualifier values.
pub fn options(dataset: &ParcelDataset, region: Option<&str>, sub_region: Option<&str>) {
    let Some(region) = region else {
        for value in region_options(dataset) {
            println!("{value}");
        }
        return;
    };

    match sub_region_options(dataset, region) {
        Some(values) => {
            println!("Sub-regions of {region}:");
            for value in values {
                println!("  {value}");
            }
        }
        None => println!("{region} has no sub-regions"),
    }

    let sub_region = Qualifier::from_selection(sub_region);
    match sub_sub_region_options(dataset, region, &sub_region) {
        Some(values) => {
            println!("Sub-sub-regions of {region} / {sub_region}:");
            for value in values {
                println!("  {value}");
            }
        }
        None => println!("{region} / {sub_region} has no sub-sub-regions"),
    }
}
