use anyhow::{Context, Result, bail};
use reqwest::StatusCode;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use super::USER_AGENT;
use crate::config::WfsConfig;

const PREVIEW_CHARS: usize = 1000;

/// What a single GetFeature request produced
#[derive(Debug)]
enum WfsReply {
    Features(serde_json::Value),
    /// Service answered with an XML exception report
    ServiceError(String),
    /// Anything else that isn't a FeatureCollection
    Unusable(String),
}

fn getfeature_params<'a>(
    config: &'a WfsConfig,
    output_format: &'a str,
    max_features: &'a str,
) -> [(&'static str, &'a str); 6] {
    [
        ("service", "WFS"),
        ("version", "2.0.0"),
        ("request", "GetFeature"),
        ("typeName", config.type_name.as_str()),
        ("outputFormat", output_format),
        ("maxFeatures", max_features),
    ]
}

fn preview(body: &str) -> String {
    body.chars().take(PREVIEW_CHARS).collect()
}

/// Classify a response body
fn classify_body(body: &str) -> WfsReply {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) if value.get("features").is_some_and(|f| f.is_array()) => {
            WfsReply::Features(value)
        }
        Ok(_) => WfsReply::Unusable(preview(body)),
        Err(_) => {
            let lower = body.to_lowercase();
            if lower.contains("xml") && lower.contains("error") {
                WfsReply::ServiceError(preview(body))
            } else {
                WfsReply::Unusable(preview(body))
            }
        }
    }
}

/// Decide what one format attempt produced, given the HTTP status and the
/// outcome of reading the body. `Err` carries the reason for the log line
/// and the final error message.
fn evaluate_reply<E: fmt::Display>(
    format: &str,
    status: StatusCode,
    body: Result<String, E>,
) -> Result<serde_json::Value, String> {
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            log::warn!("Failed to read WFS response body for {}: {}", format, e);
            return Err(format!("{}: {}", format, e));
        }
    };

    if !status.is_success() {
        log::warn!("WFS returned HTTP {}: {}", status, preview(&body));
        return Err(format!("{}: HTTP {}", format, status));
    }

    match classify_body(&body) {
        WfsReply::Features(value) => {
            log::info!("WFS format {} returned {} characters", format, body.len());
            Ok(value)
        }
        WfsReply::ServiceError(text) => {
            log::warn!("WFS returned an XML error for {}:\n{}", format, text);
            Err(format!("{}: WFS exception", format))
        }
        WfsReply::Unusable(text) => {
            log::warn!("WFS response for {} is not a FeatureCollection:\n{}", format, text);
            Err(format!("{}: not a FeatureCollection", format))
        }
    }
}

/// Run `attempt` for each format in order until one yields a FeatureCollection
fn first_feature_collection<F>(formats: &[String], mut attempt: F) -> Result<serde_json::Value>
where
    F: FnMut(&str) -> Result<serde_json::Value, String>,
{
    if formats.is_empty() {
        bail!("No WFS output formats configured");
    }

    let mut last_error = None;
    for format in formats {
        match attempt(format) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = Some(e),
        }
    }

    bail!(
        "Failed to fetch data from WFS: {}",
        last_error.unwrap_or_else(|| "Unknown error".to_string())
    )
}

/// Fetch the complete fountain FeatureCollection from the BWB WFS.
///
/// Each configured output format is tried in order; the first reply that
/// parses as a JSON document with a `features` array wins.
pub fn fetch_feature_collection(config: &WfsConfig) -> Result<serde_json::Value> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .context("Failed to create HTTP client")?;

    let max_features = config.max_features.to_string();

    first_feature_collection(&config.output_formats, |format| {
        log::info!("Requesting {} from {} as {}", config.type_name, config.url, format);

        let response = match client
            .get(&config.url)
            .query(&getfeature_params(config, format, &max_features))
            .send()
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                log::warn!("WFS request timed out after {} seconds", config.timeout_secs);
                return Err(format!("{}: timeout", format));
            }
            Err(e) => {
                log::warn!("WFS request failed: {}", e);
                return Err(format!("{}: {}", format, e));
            }
        };

        let status = response.status();
        evaluate_reply(format, status, response.text())
    })
}

/// Write a FeatureCollection as pretty-printed UTF-8 JSON, creating parent
/// directories as needed
pub fn save_feature_collection(path: &Path, data: &serde_json::Value) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(data).context("Failed to serialize WFS data")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Short description of the first feature: property keys and geometry type
pub fn describe_first_feature(data: &serde_json::Value) -> Option<(Vec<String>, String)> {
    let first = data.get("features")?.as_array()?.first()?;
    let keys = first
        .get("properties")
        .and_then(|p| p.as_object())
        .map(|p| p.keys().cloned().collect())
        .unwrap_or_default();
    let geometry_type = first
        .get("geometry")
        .and_then(|g| g.get("type"))
        .and_then(|t| t.as_str())
        .unwrap_or("Unknown")
        .to_string();
    Some((keys, geometry_type))
}

/// Number of features in a FeatureCollection
pub fn feature_count(data: &serde_json::Value) -> usize {
    data.get("features")
        .and_then(|f| f.as_array())
        .map(|f| f.len())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [13.4, 52.5]},
             "properties": {"oid": 1, "typ": "Kaiser Brunnen", "strasse": "Müllerstraße"}}
        ]
    }"#;

    #[test]
    fn test_classify_feature_collection() {
        assert!(matches!(classify_body(SAMPLE), WfsReply::Features(_)));
    }

    #[test]
    fn test_classify_xml_error() {
        let body = r#"<?xml version="1.0"?><ows:ExceptionReport><ows:Exception exceptionCode="InvalidParameterValue">error</ows:Exception></ows:ExceptionReport>"#;
        assert!(matches!(classify_body(body), WfsReply::ServiceError(_)));
    }

    #[test]
    fn test_classify_other_json() {
        assert!(matches!(classify_body(r#"{"error": "nope"}"#), WfsReply::Unusable(_)));
        assert!(matches!(classify_body("<html></html>"), WfsReply::Unusable(_)));
    }

    fn formats() -> Vec<String> {
        vec!["GEOJSON".to_string(), "ESRIGEOJSON".to_string()]
    }

    #[test]
    fn test_evaluate_reply() {
        let ok = evaluate_reply("GEOJSON", StatusCode::OK, Ok::<_, String>(SAMPLE.to_string()));
        assert_eq!(feature_count(&ok.unwrap()), 1);

        let unavailable = evaluate_reply(
            "GEOJSON",
            StatusCode::SERVICE_UNAVAILABLE,
            Ok::<_, String>(SAMPLE.to_string()),
        );
        assert_eq!(unavailable.unwrap_err(), "GEOJSON: HTTP 503 Service Unavailable");

        let unread = evaluate_reply("GEOJSON", StatusCode::OK, Err("operation timed out"));
        assert_eq!(unread.unwrap_err(), "GEOJSON: operation timed out");
    }

    #[test]
    fn test_body_read_failure_falls_back_to_next_format() {
        let mut tried = Vec::new();
        let data = first_feature_collection(&formats(), |format| {
            tried.push(format.to_string());
            let body = if format == "GEOJSON" {
                Err("operation timed out")
            } else {
                Ok(SAMPLE.to_string())
            };
            evaluate_reply(format, StatusCode::OK, body)
        })
        .unwrap();

        assert_eq!(tried, formats());
        assert_eq!(feature_count(&data), 1);
    }

    #[test]
    fn test_all_formats_fail_reports_last_error() {
        let err = first_feature_collection(&formats(), |format| {
            evaluate_reply(format, StatusCode::OK, Ok::<_, String>("<html></html>".to_string()))
        })
        .unwrap_err();
        assert!(err.to_string().contains("ESRIGEOJSON: not a FeatureCollection"));

        assert!(first_feature_collection(&[], |_| Err("unused".to_string())).is_err());
    }

    #[test]
    fn test_getfeature_params() {
        let config = WfsConfig::default();
        let params = getfeature_params(&config, "GEOJSON", "10000");
        assert!(params.contains(&("typeName", "Trinkbrunnen_BWB:Trinkbrunnen_BWB")));
        assert!(params.contains(&("outputFormat", "GEOJSON")));
        assert!(params.contains(&("maxFeatures", "10000")));
    }

    #[test]
    fn test_save_and_describe() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("wfs.json");
        let data: serde_json::Value = serde_json::from_str(SAMPLE).unwrap();

        save_feature_collection(&path, &data).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        // Non-ASCII text is kept as-is
        assert!(written.contains("Müllerstraße"));
        assert_eq!(feature_count(&data), 1);

        let (keys, geometry_type) = describe_first_feature(&data).unwrap();
        assert_eq!(geometry_type, "Point");
        assert!(keys.contains(&"typ".to_string()));
    }
}
