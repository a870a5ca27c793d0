use anyhow::{bail, Context, Result};
use landcover::olc::normalize_query_code;
use landcover::resolver::DEFAULT_MAX_CONCURRENCY;
use landcover::LocationQuery;

use super::RemoteArgs;

pub async fn run(
    remote: &RemoteArgs,
    lat: Option<f64>,
    lon: Option<f64>,
    code: Option<String>,
    length: usize,
    json: bool,
) -> Result<()> {
    let query = match (code, lat, lon) {
        (Some(code), _, _) => LocationQuery::Code(normalize_query_code(&code)),
        (None, Some(lat), Some(lon)) => LocationQuery::Point { lat, lon },
        _ => bail!("Provide either --code or both --lat and --lon"),
    };

    let resolver = remote.resolver(length, DEFAULT_MAX_CONCURRENCY)?;
    let result = resolver
        .resolve(&query)
        .await
        .context("Failed to resolve terrain")?;

    if json {
        println!("{}", serde_json::to_string(&result)?);
    } else {
        println!("{}", result.location_code);
        if result.terrain_types.is_empty() {
            println!("  (no land cover)");
        }
        for terrain in &result.terrain_types {
            println!("  {}", terrain);
        }
    }

    Ok(())
}
