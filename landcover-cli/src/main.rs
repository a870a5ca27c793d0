use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::RemoteArgs;

/// Land-cover terrain lookup CLI tool
#[derive(Parser)]
#[command(name = "landcover")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// ArcGIS MapServer base URL
    #[arg(long, env = "LANDCOVER_SERVICE_URL", global = true)]
    service_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(
        long,
        env = "LANDCOVER_TIMEOUT_SECS",
        default_value = "30",
        global = true
    )]
    timeout: u64,

    /// Extra attempts after transport errors and 5xx responses
    #[arg(
        long,
        env = "LANDCOVER_MAX_RETRIES",
        default_value = "2",
        global = true
    )]
    max_retries: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a coordinate as an Open Location Code
    Encode {
        /// Latitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Number of significant digits (2, 4, 6, 8, or 10 to 15)
        #[arg(short, long, default_value = "10")]
        length: usize,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the cell, planar extent and identify polygon of a code
    Decode {
        /// Full Open Location Code, e.g. 8FQF2222+22
        code: String,

        /// Output result as JSON
        #[arg(short, long, conflicts_with = "geojson")]
        json: bool,

        /// Output the cell outline as a GeoJSON feature
        #[arg(short, long)]
        geojson: bool,
    },

    /// Look up the terrain types of a coordinate or code
    Terrain {
        /// Latitude in decimal degrees
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude in decimal degrees
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        /// Open Location Code (a space may replace the '+')
        #[arg(long, conflicts_with_all = ["lat", "lon"])]
        code: Option<String>,

        /// Code length used when encoding the coordinate
        #[arg(short, long, default_value = "10")]
        length: usize,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Look up terrain types for every row of a CSV file
    Batch {
        /// Input CSV file
        input: PathBuf,

        /// Output file (defaults to <input>_terrain.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Column holding location codes; used when present
        #[arg(long, default_value = "code")]
        code_col: String,

        /// Column name for latitude, used without a code column
        #[arg(long, default_value = "lat")]
        lat_col: String,

        /// Column name for longitude, used without a code column
        #[arg(long, default_value = "lon")]
        lon_col: String,

        /// Rows resolved concurrently
        #[arg(short, long, env = "LANDCOVER_MAX_CONCURRENCY", default_value = "8")]
        concurrency: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let remote = RemoteArgs {
        service_url: cli.service_url,
        timeout: cli.timeout,
        max_retries: cli.max_retries,
    };

    match cli.command {
        Commands::Encode {
            lat,
            lon,
            length,
            json,
        } => commands::encode::run(lat, lon, length, json),
        Commands::Decode {
            code,
            json,
            geojson,
        } => commands::decode::run(&code, json, geojson),
        Commands::Terrain {
            lat,
            lon,
            code,
            length,
            json,
        } => commands::terrain::run(&remote, lat, lon, code, length, json).await,
        Commands::Batch {
            input,
            output,
            code_col,
            lat_col,
            lon_col,
            concurrency,
        } => {
            commands::batch::run(
                &remote,
                input,
                output,
                &code_col,
                &lat_col,
                &lon_col,
                concurrency,
            )
            .await
        }
    }
}
