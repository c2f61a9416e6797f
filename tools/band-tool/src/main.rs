use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use drivetime::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;

mod catalog;

use catalog::{read_band_records, read_config, read_facilities, read_legacy_bands, write_band_records, CatalogStats};

#[derive(Parser, Debug)]
#[command(
    name = "band-tool",
    author,
    version,
    about = "Convert, inspect and query drive-time band catalogs",
    long_about = "Works on JSON band catalogs as exchanged with the band store.\n\n\
                  `encode` turns a file of legacy provider band objects into compact \
                  band records, `inspect` reports which geometry encoding each stored \
                  band uses, and `nearby` runs a drive-time query against a band \
                  catalog and a facility file."
)]
struct Args {
    /// Verbose output (show debug messages)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert legacy provider bands into compact band records
    Encode {
        /// JSON array of legacy band objects
        #[arg(short, long)]
        input: PathBuf,

        /// Output JSON file of band records
        #[arg(short, long)]
        output: PathBuf,

        /// Catalog version tag stored on every band
        #[arg(long)]
        band_version: Option<String>,
    },

    /// Report geometry encodings and sizes of a band record file
    Inspect {
        /// JSON array of band records
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Find facilities whose drive-time band covers a point
    Nearby {
        /// JSON array of band records
        #[arg(short, long)]
        bands: PathBuf,

        /// JSON array of facilities
        #[arg(short, long)]
        facilities: PathBuf,

        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        long: f64,

        /// Only facilities offering one of these services (comma separated)
        #[arg(long, value_delimiter = ',')]
        services: Vec<String>,

        /// Drop results whose bracket ends after this many minutes
        #[arg(long)]
        max_drive_time: Option<u32>,

        /// Engine configuration JSON
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "info" }),
    )
    .format_timestamp(None)
    .init();

    match args.command {
        Command::Encode {
            input,
            output,
            band_version,
        } => {
            log::info!("Input: {}", input.display());
            let bands = read_legacy_bands(&input, band_version.as_deref())?;
            log::info!("  Converted {} legacy bands", bands.len());

            write_band_records(&bands, &output)?;
            log::info!("Output written to: {}", output.display());
        }

        Command::Inspect { input } => {
            let records = read_band_records(&input)?;
            let stats = CatalogStats::collect(&records);
            stats.log_summary();
            if !stats.unreadable.is_empty() {
                bail!("{} bands have unreadable geometry", stats.unreadable.len());
            }
        }

        Command::Nearby {
            bands,
            facilities,
            lat,
            long,
            services,
            max_drive_time,
            config,
        } => {
            let config = match &config {
                Some(path) => read_config(path)?,
                None => EngineConfig::default(),
            };

            let store = StaticBandStore::from_records(read_band_records(&bands)?)
                .context("Band catalog contains invalid records")?;
            let directory = StaticFacilityDirectory::from_facilities(read_facilities(&facilities)?);
            log::debug!("Loaded {} bands and {} facilities", store.len(), directory.len());

            let engine = NearbyQueryEngine::new(Arc::new(store), Arc::new(directory)).with_config(config);

            let mut request = NearbyRequest::new(lat, long).with_services(services);
            request.max_drive_time = max_drive_time;

            let response = engine.nearby(&request).context("Nearby query failed")?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
