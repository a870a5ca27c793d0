use anyhow::{Context, Result};
use landcover::geojson::cell_feature;
use landcover::{build_polygon, olc, CodeArea, PlanarExtent, Polygon};
use serde::Serialize;

#[derive(Serialize)]
struct DecodeResponse {
    code: String,
    area: CodeArea,
    /// Absent for cells touching a pole.
    extent: Option<PlanarExtent>,
    polygon: Option<Polygon>,
}

pub fn run(code: &str, json: bool, geojson: bool) -> Result<()> {
    let code = olc::normalize_query_code(code);
    let area = olc::decode(&code).context("Failed to decode location code")?;

    if geojson {
        println!("{}", cell_feature(&code, &area));
        return Ok(());
    }

    let extent = PlanarExtent::from_cell(&area);

    if json {
        let response = DecodeResponse {
            code,
            area,
            polygon: extent.as_ref().ok().map(build_polygon),
            extent: extent.ok(),
        };
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("Code:     {} ({} digits)", code, area.code_length);
    println!(
        "Latitude:  {:.8} .. {:.8} (center {:.8})",
        area.lat_lo, area.lat_hi, area.lat_center
    );
    println!(
        "Longitude: {:.8} .. {:.8} (center {:.8})",
        area.lon_lo, area.lon_hi, area.lon_center
    );
    match &extent {
        Ok(extent) => {
            println!(
                "Extent:   {} ({:.1}m x {:.1}m)",
                extent,
                extent.width(),
                extent.height()
            );
            println!("Polygon:  {}", build_polygon(extent).to_json()?);
        }
        Err(e) => println!("Extent:   unavailable ({})", e),
    }

    Ok(())
}
