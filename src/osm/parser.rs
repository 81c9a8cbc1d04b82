use crate::api::OverpassResponse;
use crate::api::overpass::Element;
use crate::domain::{AttrValue, Dataset, GeoRecord};

pub const SOURCE_NAME: &str = "OSM";

/// OSM tag names used in reports and popups
pub mod keys {
    pub const OSM_TYPE: &str = "osm_type";
    pub const OSM_ID: &str = "osm_id";
    pub const NAME: &str = "name";
    pub const OPERATOR: &str = "operator";
    pub const SOURCE: &str = "source";
    pub const DESCRIPTION: &str = "description";
    pub const WEBSITE: &str = "website";
}

/// Parse an Overpass response into a drinking water dataset
///
/// # Algorithm
/// 1. Nodes use their own lat/lon
/// 2. Ways and relations use the `center` Overpass computed for them
/// 3. Elements without any position are skipped
/// 4. All tags are kept as attributes, plus `osm_type` and `osm_id`
pub fn parse_drinking_water(response: &OverpassResponse) -> Dataset {
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for element in &response.elements {
        let Some((lat, lon)) = element_position(element) else {
            skipped += 1;
            continue;
        };

        let mut record = GeoRecord::new(format!("{}/{}", element.type_, element.id), lat, lon)
            .with_attr(keys::OSM_TYPE, element.type_.as_str())
            .with_attr(keys::OSM_ID, element.id.to_string());

        if let Some(tags) = &element.tags {
            for (k, v) in tags {
                // Tags never override the identity attributes
                if k != keys::OSM_TYPE && k != keys::OSM_ID {
                    record
                        .attributes
                        .insert(k.clone(), AttrValue::Text(v.clone()));
                }
            }
        }

        records.push(record);
    }

    if skipped > 0 {
        log::warn!("Skipped {} OSM elements without coordinates", skipped);
    }

    Dataset::new(SOURCE_NAME, records)
}

fn element_position(element: &Element) -> Option<(f64, f64)> {
    match (element.lat, element.lon) {
        (Some(lat), Some(lon)) => Some((lat, lon)),
        _ => element.center.map(|c| (c.lat, c.lon)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::overpass::Center;
    use std::collections::HashMap;

    fn element(type_: &str, id: u64, lat: Option<f64>, lon: Option<f64>) -> Element {
        Element {
            type_: type_.to_string(),
            id,
            tags: None,
            lat,
            lon,
            center: None,
        }
    }

    #[test]
    fn test_parse_drinking_water() {
        let mut node = element("node", 1, Some(52.52), Some(13.40));
        node.tags = Some({
            let mut m = HashMap::new();
            m.insert("amenity".to_string(), "drinking_water".to_string());
            m.insert("operator".to_string(), "Berliner Wasserbetriebe".to_string());
            m
        });

        let mut way = element("way", 2, None, None);
        way.center = Some(Center {
            lat: 52.51,
            lon: 13.39,
        });

        let response = OverpassResponse {
            elements: vec![node, way, element("relation", 3, None, None)],
        };

        let dataset = parse_drinking_water(&response);
        assert_eq!(dataset.source, "OSM");
        assert_eq!(dataset.len(), 2);

        let first = &dataset.records[0];
        assert_eq!(first.id, "node/1");
        assert_eq!(first.coords(), (52.52, 13.40));
        assert_eq!(first.attr_text("operator"), "Berliner Wasserbetriebe");
        assert_eq!(first.attr_text("osm_type"), "node");
        assert_eq!(first.attr_text("osm_id"), "1");

        let second = &dataset.records[1];
        assert_eq!(second.id, "way/2");
        assert_eq!(second.coords(), (52.51, 13.39));
        assert_eq!(second.attr_or("name", "N/A"), "N/A");
    }

    #[test]
    fn test_parse_empty_response() {
        let response = OverpassResponse {
            elements: Vec::new(),
        };
        assert!(parse_drinking_water(&response).is_empty());
    }
}
