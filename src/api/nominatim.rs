use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::thread;
use std::time::Duration;

use super::USER_AGENT;

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Overpass derives area ids from OSM ids with these offsets
const RELATION_AREA_OFFSET: u64 = 3_600_000_000;
const WAY_AREA_OFFSET: u64 = 2_400_000_000;

#[derive(Debug, Deserialize)]
struct NominatimResult {
    lat: String,
    lon: String,
    display_name: String,
    #[serde(default)]
    osm_type: Option<String>,
    #[serde(default)]
    osm_id: Option<u64>,
}

/// A geocoded place that can be used as an Overpass search area.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub display_name: String,
    pub lat: f64,
    pub lon: f64,
    pub osm_type: String,
    pub osm_id: u64,
}

impl Place {
    /// Overpass area id for this place's boundary
    pub fn area_id(&self) -> Option<u64> {
        match self.osm_type.as_str() {
            "relation" => Some(RELATION_AREA_OFFSET + self.osm_id),
            "way" => Some(WAY_AREA_OFFSET + self.osm_id),
            _ => None,
        }
    }
}

/// Geocode a place name (e.g. "Berlin, Germany") to its OSM boundary.
///
/// Uses the Nominatim API. Includes a 1 second delay for rate limiting
/// (Nominatim ToS). Only results backed by a relation or closed way are
/// usable as an area, relations preferred.
pub fn geocode_place(place: &str) -> Result<Place> {
    // Rate limiting - Nominatim requires max 1 request per second
    thread::sleep(Duration::from_secs(1));

    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to create HTTP client")?;

    let response = client
        .get(NOMINATIM_URL)
        .query(&[("q", place), ("format", "json"), ("limit", "5")])
        .send()
        .context("Failed to send request to Nominatim API")?;

    if !response.status().is_success() {
        bail!("Nominatim API returned error status: {}", response.status());
    }

    let results: Vec<NominatimResult> = response
        .json()
        .context("Failed to parse Nominatim JSON response")?;

    select_area(results).ok_or_else(|| anyhow::anyhow!("No boundary found for place: {}", place))?
}

fn select_area(results: Vec<NominatimResult>) -> Option<Result<Place>> {
    let best = results
        .iter()
        .position(|r| r.osm_type.as_deref() == Some("relation"))
        .or_else(|| {
            results
                .iter()
                .position(|r| r.osm_type.as_deref() == Some("way"))
        })?;
    let result = results.into_iter().nth(best)?;
    Some(to_place(result))
}

fn to_place(result: NominatimResult) -> Result<Place> {
    let lat: f64 = result
        .lat
        .parse()
        .context("Failed to parse latitude from Nominatim response")?;
    let lon: f64 = result
        .lon
        .parse()
        .context("Failed to parse longitude from Nominatim response")?;
    let osm_id = result
        .osm_id
        .context("Nominatim result is missing osm_id")?;

    Ok(Place {
        display_name: result.display_name,
        lat,
        lon,
        osm_type: result.osm_type.unwrap_or_default(),
        osm_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nominatim_response() {
        let json = r#"[
            {"lat":"52.5173885","lon":"13.3951309","display_name":"Berlin, Deutschland","osm_type":"node","osm_id":240109189},
            {"lat":"52.5108850","lon":"13.3989367","display_name":"Berlin, Deutschland","osm_type":"relation","osm_id":62422}
        ]"#;
        let results: Vec<NominatimResult> = serde_json::from_str(json).unwrap();
        assert_eq!(results.len(), 2);

        let place = select_area(results).unwrap().unwrap();
        assert_eq!(place.osm_type, "relation");
        assert_eq!(place.osm_id, 62422);
        assert_eq!(place.area_id(), Some(3_600_062_422));
        assert!((place.lat - 52.510885).abs() < 1e-6);
    }

    #[test]
    fn test_no_area_result() {
        let json = r#"[{"lat":"52.5","lon":"13.4","display_name":"Somewhere","osm_type":"node","osm_id":1}]"#;
        let results: Vec<NominatimResult> = serde_json::from_str(json).unwrap();
        assert!(select_area(results).is_none());
    }

    #[test]
    fn test_way_area_id() {
        let place = Place {
            display_name: "Park".to_string(),
            lat: 0.0,
            lon: 0.0,
            osm_type: "way".to_string(),
            osm_id: 5,
        };
        assert_eq!(place.area_id(), Some(2_400_000_005));
    }
}
