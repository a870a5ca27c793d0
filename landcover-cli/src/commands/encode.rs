use anyhow::{Context, Result};
use landcover::olc;
use serde::Serialize;

#[derive(Serialize)]
struct EncodeResponse {
    lat: f64,
    lon: f64,
    code: String,
}

pub fn run(lat: f64, lon: f64, length: usize, json: bool) -> Result<()> {
    let code = olc::encode_with_length(lat, lon, length).context("Failed to encode location")?;

    if json {
        let response = EncodeResponse { lat, lon, code };
        println!("{}", serde_json::to_string(&response)?);
    } else {
        println!("{}", code);
    }

    Ok(())
}
