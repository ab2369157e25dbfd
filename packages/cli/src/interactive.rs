//! Prompt-driven extraction.
//!
//! Mirrors the selection flow of a map-lookup form: pick the region, then
//! the optional sub-region and sub-sub-region the dataset offers (each
//! with a `選択なし` entry), then enter the parcel number. When nothing
//! matches, offers a partial parcel-number search to pick from.

use std::path::PathBuf;

use dialoguer::{Confirm, Input, Select};
use koji_map_cli_utils::MultiProgress;
use koji_map_parcel::search::{
    SEARCH_DISPLAY_LIMIT, SearchMode, region_options, search_parcel_numbers, sub_region_options,
    sub_sub_region_options,
};
use koji_map_parcel::ParcelDataset;
use koji_map_parcel_models::{DEFAULT_RANGE_M, NOT_SPECIFIED, Qualifier, SelectionCriteria};

use crate::commands;
use crate::config::FileConfig;

/// Runs the interactive flow.
///
/// # Errors
///
/// Returns an error if a prompt fails, the dataset cannot be loaded, or
/// writing the outputs fails.
pub fn run(
    multi: &MultiProgress,
    config: &FileConfig,
    input: Option<PathBuf>,
    crs: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Koji Map");
    println!();

    let input = match input {
        Some(input) => input,
        None => PathBuf::from(
            Input::<String>::new()
                .with_prompt("Parcel GeoJSON file")
                .interact_text()?,
        ),
    };
    let dataset = commands::load_dataset(multi, config, &input, crs.as_deref())?;

    loop {
        let Some(criteria) = prompt_criteria(&dataset)? else {
            println!("Dataset has no region values.");
            return Ok(());
        };

        let write = Confirm::new()
            .with_prompt("Write KML/CSV outputs?")
            .default(true)
            .interact()?;
        let output_dir = if write {
            let default = commands::output_dir(config, None);
            Some(PathBuf::from(
                Input::<String>::new()
                    .with_prompt("Output directory")
                    .default(default.display().to_string())
                    .interact_text()?,
            ))
        } else {
            None
        };

        if !commands::extract(&dataset, &criteria, output_dir.as_deref(), &config.style)? {
            offer_search(&dataset, &criteria.parcel_number)?;
        }

        let again = Confirm::new()
            .with_prompt("Extract another parcel?")
            .default(false)
            .interact()?;
        if !again {
            return Ok(());
        }
    }
}

fn prompt_criteria(
    dataset: &ParcelDataset,
) -> Result<Option<SelectionCriteria>, Box<dyn std::error::Error>> {
    let regions = region_options(dataset);
    if regions.is_empty() {
        return Ok(None);
    }
    let idx = Select::new()
        .with_prompt("大字名")
        .items(&regions)
        .default(0)
        .max_length(20)
        .interact()?;
    let region = regions[idx].clone();

    let sub_region = match sub_region_options(dataset, &region) {
        Some(values) => select_qualifier("丁目名", values)?,
        None => Qualifier::NotSpecified,
    };
    let sub_sub_region = match sub_sub_region_options(dataset, &region, &sub_region) {
        Some(values) => select_qualifier("小字名", values)?,
        None => Qualifier::NotSpecified,
    };

    let parcel: String = Input::new().with_prompt("地番").interact_text()?;

    Ok(Some(
        SelectionCriteria::new(region, parcel.trim())
            .with_sub_region(sub_region)
            .with_sub_sub_region(sub_sub_region)
            .with_range(DEFAULT_RANGE_M),
    ))
}

/// Select with a leading `選択なし` entry.
fn select_qualifier(
    prompt: &str,
    values: Vec<String>,
) -> Result<Qualifier, Box<dyn std::error::Error>> {
    let mut items = Vec::with_capacity(values.len() + 1);
    items.push(NOT_SPECIFIED.to_string());
    items.extend(values);

    let idx = Select::new()
        .with_prompt(prompt)
        .items(&items)
        .default(0)
        .max_length(20)
        .interact()?;
    Ok(Qualifier::from_selection(Some(items[idx].as_str())))
}

fn offer_search(dataset: &ParcelDataset, term: &str) -> Result<(), Box<dyn std::error::Error>> {
    let hits = search_parcel_numbers(dataset, term, SearchMode::Partial);
    if hits.is_empty() {
        return Ok(());
    }

    let show = Confirm::new()
        .with_prompt(format!("{} parcel numbers contain '{term}'. Show them?", hits.len()))
        .default(true)
        .interact()?;
    if show {
        commands::search(dataset, term, SearchMode::Partial);
        if hits.len() > SEARCH_DISPLAY_LIMIT {
            println!("Narrow the term to see the rest.");
        }
    }
    Ok(())
}
