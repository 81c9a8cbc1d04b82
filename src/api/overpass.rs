use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::USER_AGENT;
use crate::config::OverpassConfig;

/// Raw Overpass API response
#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    pub elements: Vec<Element>,
}

/// Center point Overpass emits for ways and relations with `out center`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Center {
    pub lat: f64,
    pub lon: f64,
}

/// A single element from Overpass (node, way or relation)
#[derive(Debug, Deserialize)]
pub struct Element {
    #[serde(rename = "type")]
    pub type_: String,
    pub id: u64,
    #[serde(default)]
    pub tags: Option<HashMap<String, String>>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub center: Option<Center>,
}

/// Build the Overpass QL query for drinking water points inside an area
fn drinking_water_query(area_id: u64, timeout_secs: u64) -> String {
    format!(
        r#"[out:json][timeout:{timeout}];
(
  nwr["amenity"="drinking_water"](area:{area_id});
);
out center tags;"#,
        timeout = timeout_secs,
        area_id = area_id
    )
}

/// Fetch all `amenity=drinking_water` nodes, ways and relations in an area
///
/// # Arguments
/// * `area_id` - Overpass area id (see [`super::nominatim::Place::area_id`])
/// * `config` - mirrors, timeout and retry settings
pub fn fetch_drinking_water(area_id: u64, config: &OverpassConfig) -> Result<OverpassResponse> {
    // Server-side timeout a little below the client's
    let server_timeout = config.timeout_secs.saturating_sub(20).max(25);
    let query = drinking_water_query(area_id, server_timeout);
    execute_overpass_query(&query, config)
}

/// Execute an Overpass API query against each mirror in turn, with retry
/// logic for 429/504 errors
fn execute_overpass_query(query: &str, config: &OverpassConfig) -> Result<OverpassResponse> {
    if config.urls.is_empty() {
        bail!("No Overpass API URLs configured");
    }

    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .context("Failed to create HTTP client")?;

    let max_retries = config.max_retries.max(1);
    let mut last_error = None;

    for url in &config.urls {
        for attempt in 0..max_retries {
            if attempt > 0 {
                // Wait before retry - Overpass recommends waiting when overloaded
                let wait_secs = 30 * attempt as u64;
                log::warn!(
                    "Overpass API busy, retrying {} in {} seconds (attempt {}/{})",
                    url,
                    wait_secs,
                    attempt + 1,
                    max_retries
                );
                std::thread::sleep(Duration::from_secs(wait_secs));
            }

            // Overpass expects form-encoded POST data: data=<query>
            let response = match client.post(url).form(&[("data", query)]).send() {
                Ok(r) => r,
                Err(e) => {
                    log::warn!("Request to {} failed: {}", url, e);
                    last_error = Some(format!("{}: {}", url, e));
                    break;
                }
            };

            match response.status().as_u16() {
                200 => {
                    let result: OverpassResponse = response
                        .json()
                        .context("Failed to parse Overpass JSON response")?;
                    log::info!("Overpass returned {} elements from {}", result.elements.len(), url);
                    return Ok(result);
                }
                429 | 504 => {
                    // 429 = Too Many Requests, 504 = Gateway Timeout
                    last_error = Some(format!(
                        "{} returned status {} (attempt {})",
                        url,
                        response.status(),
                        attempt + 1
                    ));
                    continue;
                }
                status => {
                    log::warn!("Overpass mirror {} returned status {}", url, status);
                    last_error = Some(format!("{} returned status {}", url, status));
                    break;
                }
            }
        }
    }

    bail!(
        "Overpass API failed on all {} mirrors: {}",
        config.urls.len(),
        last_error.unwrap_or_else(|| "Unknown error".to_string())
    )
}

/// Read a saved Overpass JSON response from disk
pub fn load_response(path: &std::path::Path) -> Result<OverpassResponse> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read Overpass response: {}", path.display()))?;
    serde_json::from_str(&contents).context("Failed to parse Overpass JSON response")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drinking_water_query() {
        let query = drinking_water_query(3_600_062_422, 180);
        assert!(query.starts_with("[out:json][timeout:180];"));
        assert!(query.contains(r#"nwr["amenity"="drinking_water"](area:3600062422);"#));
        assert!(query.contains("out center tags;"));
    }

    #[test]
    fn test_parse_overpass_response() {
        let json = r#"{
            "elements": [
                {"type": "node", "id": 1, "lat": 52.52, "lon": 13.40, "tags": {"amenity": "drinking_water"}},
                {"type": "way", "id": 2, "center": {"lat": 52.51, "lon": 13.39}, "tags": {"amenity": "drinking_water", "operator": "Berliner Wasserbetriebe"}}
            ]
        }"#;

        let response: OverpassResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.elements.len(), 2);
        assert_eq!(response.elements[0].type_, "node");
        assert_eq!(response.elements[1].type_, "way");
        assert!(response.elements[1].lat.is_none());
        assert_eq!(response.elements[1].center.unwrap().lat, 52.51);
    }

    #[test]
    fn test_empty_mirror_list() {
        let config = OverpassConfig {
            urls: Vec::new(),
            ..OverpassConfig::default()
        };
        assert!(fetch_drinking_water(1, &config).is_err());
    }

    #[test]
    fn test_load_response() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("osm.json");
        std::fs::write(&path, r#"{"elements": []}"#).unwrap();
        assert!(load_response(&path).unwrap().elements.is_empty());
    }
}
