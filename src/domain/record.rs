use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A descriptive attribute value carried by a record.
///
/// Sources mix strings, numbers and nulls freely (e.g. `einbaujahr` is a
/// number in some WFS dumps and a string in others), so values are kept
/// close to their JSON form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl AttrValue {
    /// Convert a JSON value. Arrays and objects are flattened to their JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => AttrValue::Null,
            serde_json::Value::Bool(b) => AttrValue::Bool(*b),
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => AttrValue::Number(f),
                None => AttrValue::Text(n.to_string()),
            },
            serde_json::Value::String(s) => AttrValue::Text(s.clone()),
            other => AttrValue::Text(other.to_string()),
        }
    }

    /// True for null and blank strings.
    pub fn is_empty(&self) -> bool {
        match self {
            AttrValue::Null => true,
            AttrValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Null => Ok(()),
            AttrValue::Bool(b) => write!(f, "{}", b),
            // Years and ids arrive as floats from JSON; print them without ".0"
            AttrValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            AttrValue::Number(n) => write!(f, "{}", n),
            AttrValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

impl From<f64> for AttrValue {
    fn from(n: f64) -> Self {
        AttrValue::Number(n)
    }
}

/// A single point location with descriptive attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoRecord {
    pub id: String,
    /// WGS84 latitude in decimal degrees
    pub lat: f64,
    /// WGS84 longitude in decimal degrees
    pub lon: f64,
    pub attributes: BTreeMap<String, AttrValue>,
}

impl GeoRecord {
    pub fn new(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: id.into(),
            lat,
            lon,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }

    /// Attribute rendered as text, empty when missing or null.
    pub fn attr_text(&self, key: &str) -> String {
        self.attr(key).map(|v| v.to_string()).unwrap_or_default()
    }

    /// Attribute text, or `fallback` when missing or blank.
    pub fn attr_or(&self, key: &str, fallback: &str) -> String {
        match self.attr(key) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => fallback.to_string(),
        }
    }

    pub fn coords(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }
}

/// An ordered collection of records from one source.
///
/// Positional index is the record identity within a run; ids are not
/// required to be unique.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub source: String,
    pub records: Vec<GeoRecord>,
}

impl Dataset {
    pub fn new(source: impl Into<String>, records: Vec<GeoRecord>) -> Self {
        Self {
            source: source.into(),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&GeoRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GeoRecord> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a GeoRecord;
    type IntoIter = std::slice::Iter<'a, GeoRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Arithmetic mean of (lat, lon) pairs.
pub fn mean_center(points: impl IntoIterator<Item = (f64, f64)>) -> Option<(f64, f64)> {
    let mut count = 0usize;
    let (mut lat_sum, mut lon_sum) = (0.0, 0.0);
    for (lat, lon) in points {
        lat_sum += lat;
        lon_sum += lon;
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some((lat_sum / count as f64, lon_sum / count as f64))
}
