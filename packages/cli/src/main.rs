#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line parcel extraction.
//!
//! ```text
//! koji_map extract -i parcels.geojson --region 本町 --parcel 1174-2 [--sub-region 1丁目]
//! koji_map search -i parcels.geojson --term 1174 [--mode exact]
//! koji_map profile -i parcels.geojson [--json]
//! koji_map options -i parcels.geojson [--region 本町 [--sub-region 1丁目]]
//! koji_map interactive [-i parcels.geojson]
//! ```
//!
//! Running `koji_map` with no subcommand enters interactive mode.
//!
//! Uses `indicatif-log-bridge` (via [`koji_map_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and the loading bar never fight for the terminal.

mod commands;
mod config;
mod interactive;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use koji_map_parcel::search::SearchMode;
use koji_map_parcel_models::DEFAULT_RANGE_M;

use crate::config::FileConfig;

#[derive(Parser)]
#[command(
    name = "koji_map",
    about = "Extract a cadastral parcel and its neighborhood as KML and CSV"
)]
struct Cli {
    /// TOML config file (defaults to ./koji_map.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Where to load the parcel dataset from.
#[derive(Args, Clone)]
struct DatasetArgs {
    /// GeoJSON FeatureCollection of parcels
    #[arg(long, short)]
    input: PathBuf,

    /// CRS of the input: EPSG code, `EPSG:NNNN`, or a `+proj=` string.
    /// Overrides the file's declared CRS and the config's `epsg`.
    #[arg(long)]
    crs: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a target parcel and the parcels around it
    Extract {
        #[command(flatten)]
        dataset: DatasetArgs,

        /// Region (大字名)
        #[arg(long)]
        region: String,

        /// Sub-region (丁目名); omit or pass 選択なし for none
        #[arg(long)]
        sub_region: Option<String>,

        /// Sub-sub-region (小字名); omit or pass 選択なし for none
        #[arg(long)]
        sub_sub_region: Option<String>,

        /// Parcel number (地番)
        #[arg(long)]
        parcel: String,

        /// Half-width of the search square in CRS units
        #[arg(long, default_value_t = DEFAULT_RANGE_M, value_parser = parse_range)]
        range: f64,

        /// Directory for the KML, CSV and summary files
        #[arg(long, short)]
        output_dir: Option<PathBuf>,

        /// Print previews without writing files
        #[arg(long)]
        dry_run: bool,
    },
    /// Look up parcel numbers
    Search {
        #[command(flatten)]
        dataset: DatasetArgs,

        /// Parcel number or fragment
        #[arg(long)]
        term: String,

        /// `exact` or `partial`
        #[arg(long, default_value = "partial")]
        mode: SearchMode,
    },
    /// Show column statistics of a dataset
    Profile {
        #[command(flatten)]
        dataset: DatasetArgs,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the selectable region / sub-region / sub-sub-region values
    Options {
        #[command(flatten)]
        dataset: DatasetArgs,

        /// List sub-regions (and sub-sub-regions) of this region
        #[arg(long)]
        region: Option<String>,

        /// Narrow sub-sub-regions to this sub-region
        #[arg(long)]
        sub_region: Option<String>,
    },
    /// Walk through an extraction with prompts
    Interactive {
        /// GeoJSON FeatureCollection of parcels (prompted for if omitted)
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// CRS override, as for the other subcommands
        #[arg(long)]
        crs: Option<String>,
    },
}

fn parse_range(value: &str) -> Result<f64, String> {
    let range: f64 = value
        .parse()
        .map_err(|e| format!("'{value}' is not a number: {e}"))?;
    if (1.0..=1000.0).contains(&range) {
        Ok(range)
    } else {
        Err(format!("range must be between 1 and 1000, got {range}"))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = koji_map_cli_utils::init_logger();
    let cli = Cli::parse();
    let config = FileConfig::load(cli.config.as_deref())?;

    let Some(command) = cli.command else {
        return interactive::run(&multi, &config, None, None);
    };

    match command {
        Commands::Extract {
            dataset,
            region,
            sub_region,
            sub_sub_region,
            parcel,
            range,
            output_dir,
            dry_run,
        } => {
            let data = commands::load_dataset(&multi, &config, &dataset.input, dataset.crs.as_deref())?;
            let criteria = commands::criteria(
                &region,
                sub_region.as_deref(),
                sub_sub_region.as_deref(),
                &parcel,
                range,
            );
            let output_dir = (!dry_run).then(|| commands::output_dir(&config, output_dir));
            if !commands::extract(&data, &criteria, output_dir.as_deref(), &config.style)? {
                std::process::exit(1);
            }
        }
        Commands::Search {
            dataset,
            term,
            mode,
        } => {
            let data = commands::load_dataset(&multi, &config, &dataset.input, dataset.crs.as_deref())?;
            commands::search(&data, &term, mode);
        }
        Commands::Profile { dataset, json } => {
            let data = commands::load_dataset(&multi, &config, &dataset.input, dataset.crs.as_deref())?;
            commands::profile(&data, json)?;
        }
        Commands::Options {
            dataset,
            region,
            sub_region,
        } => {
            let data = commands::load_dataset(&multi, &config, &dataset.input, dataset.crs.as_deref())?;
            commands::options(&data, region.as_deref(), sub_region.as_deref());
        }
        Commands::Interactive { input, crs } => {
            interactive::run(&multi, &config, input, crs)?;
        }
    }

    Ok(())
}
