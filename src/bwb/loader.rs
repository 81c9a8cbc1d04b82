use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::domain::{AttrValue, Dataset, GeoRecord};
use crate::error::LoadError;

pub const SOURCE_NAME: &str = "BWB";

/// GeoJSON FeatureCollection as served by the BWB WFS
#[derive(Debug, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
    pub features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub coordinates: serde_json::Value,
}

/// Load the BWB fountain file written by the `fetch-wfs` command
pub fn load_bwb_file(path: &Path) -> Result<Dataset, LoadError> {
    let contents = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_bwb(&contents)
}

/// Parse a FeatureCollection of Point features into a dataset
///
/// GeoJSON coordinates are `[lon, lat]`. The record id is the `oid`
/// property, falling back to the feature id, then the position.
pub fn parse_bwb(json: &str) -> Result<Dataset, LoadError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    if !value.get("features").is_some_and(|f| f.is_array()) {
        return Err(LoadError::NotAFeatureCollection);
    }
    let collection: FeatureCollection = serde_json::from_value(value)?;
    if let Some(kind) = &collection.type_
        && kind != "FeatureCollection"
    {
        return Err(LoadError::NotAFeatureCollection);
    }

    let records = collection
        .features
        .iter()
        .enumerate()
        .map(|(index, feature)| feature_to_record(index, feature))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Dataset::new(SOURCE_NAME, records))
}

fn feature_to_record(index: usize, feature: &Feature) -> Result<GeoRecord, LoadError> {
    let geometry = feature
        .geometry
        .as_ref()
        .ok_or(LoadError::MissingGeometry { index })?;

    if geometry.type_ != "Point" {
        return Err(LoadError::UnsupportedGeometry {
            index,
            kind: geometry.type_.clone(),
        });
    }

    let (lon, lat) = point_coordinates(&geometry.coordinates)
        .ok_or(LoadError::InvalidCoordinates { index })?;

    let attributes: BTreeMap<String, AttrValue> = feature
        .properties
        .iter()
        .flatten()
        .map(|(k, v)| (k.clone(), AttrValue::from_json(v)))
        .collect();

    let id = attributes
        .get("oid")
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .or_else(|| feature.id.as_ref().map(json_id))
        .unwrap_or_else(|| index.to_string());

    Ok(GeoRecord {
        id,
        lat,
        lon,
        attributes,
    })
}

fn json_id(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Extract a valid `[lon, lat]` pair
fn point_coordinates(coordinates: &serde_json::Value) -> Option<(f64, f64)> {
    let pair = coordinates.as_array()?;
    let lon = pair.first()?.as_f64()?;
    let lat = pair.get(1)?.as_f64()?;
    if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
        return None;
    }
    Some((lon, lat))
}
