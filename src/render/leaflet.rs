//! Minimal Leaflet page writer
//!
//! Layers are serialized to JSON and handed to a fixed script that draws
//! circle markers, connector lines, a legend box and a layer switcher.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
const TILE_ATTRIBUTION: &str = "&copy; OpenStreetMap contributors";
const POSITRON_URL: &str = "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png";
const POSITRON_ATTRIBUTION: &str = "&copy; OpenStreetMap contributors &copy; CARTO";

#[derive(Debug, Clone, Serialize)]
pub struct CircleMarker {
    pub lat: f64,
    pub lon: f64,
    pub radius: f64,
    pub fill_color: String,
    pub tooltip: String,
    /// Trusted HTML; callers escape user data with [`escape_html`]
    pub popup: String,
}

impl CircleMarker {
    pub fn new(lat: f64, lon: f64, fill_color: &str) -> Self {
        Self {
            lat,
            lon,
            radius: 6.0,
            fill_color: fill_color.to_string(),
            tooltip: String::new(),
            popup: String::new(),
        }
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    /// Plain text, escaped here
    pub fn with_tooltip(mut self, tooltip: &str) -> Self {
        self.tooltip = escape_html(tooltip);
        self
    }

    pub fn with_popup(mut self, popup_html: String) -> Self {
        self.popup = popup_html;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Polyline {
    /// (lat, lon) pairs
    pub points: Vec<(f64, f64)>,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Layer {
    pub name: String,
    pub markers: Vec<CircleMarker>,
    pub lines: Vec<Polyline>,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            markers: Vec::new(),
            lines: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LeafletMap {
    pub title: String,
    pub center: (f64, f64),
    pub zoom: u8,
    pub layers: Vec<Layer>,
    /// Trusted HTML placed in the bottom-left legend box
    pub legend_html: String,
}

#[derive(Serialize)]
struct PageData<'a> {
    center: (f64, f64),
    zoom: u8,
    layers: &'a [Layer],
}

impl LeafletMap {
    pub fn new(title: &str, center: (f64, f64)) -> Self {
        Self {
            title: title.to_string(),
            center,
            zoom: 11,
            layers: Vec::new(),
            legend_html: String::new(),
        }
    }

    pub fn marker_count(&self) -> usize {
        self.layers.iter().map(|l| l.markers.len()).sum()
    }

    pub fn to_html(&self) -> Result<String> {
        let data = PageData {
            center: self.center,
            zoom: self.zoom,
            layers: &self.layers,
        };
        // "</" inside a script block would end it early
        let json = serde_json::to_string(&data)
            .context("Failed to serialize map layers")?
            .replace("</", "<\\/");

        Ok(PAGE_TEMPLATE
            .replace("{{TITLE}}", &escape_html(&self.title))
            .replace("{{LEGEND}}", &self.legend_html)
            .replace("{{TILE_URL}}", TILE_URL)
            .replace("{{TILE_ATTRIBUTION}}", TILE_ATTRIBUTION)
            .replace("{{POSITRON_URL}}", POSITRON_URL)
            .replace("{{POSITRON_ATTRIBUTION}}", POSITRON_ATTRIBUTION)
            .replace("{{DATA}}", &json))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if self.marker_count() == 0 {
            bail!("Refusing to write an empty map: {}", path.display());
        }
        let html = self.to_html()?;
        let file = File::create(path)
            .with_context(|| format!("Failed to create map file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(html.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{{TITLE}}</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>
html, body, #map { height: 100%; margin: 0; }
.legend { position: fixed; bottom: 50px; left: 50px; width: 250px; background: white;
  border: 2px solid grey; z-index: 9999; font-size: 14px; padding: 15px;
  font-family: Arial, sans-serif; }
.legend p { margin: 3px 0; }
.popup { font-family: Arial, sans-serif; }
</style>
</head>
<body>
<div id="map"></div>
<div class="legend">{{LEGEND}}</div>
<script>
const DATA = {{DATA}};
const osm = L.tileLayer("{{TILE_URL}}", { attribution: "{{TILE_ATTRIBUTION}}" });
const positron = L.tileLayer("{{POSITRON_URL}}", { attribution: "{{POSITRON_ATTRIBUTION}}" });
const map = L.map("map", { center: DATA.center, zoom: DATA.zoom, layers: [osm] });
const overlays = {};
for (const layer of DATA.layers) {
  const group = L.featureGroup();
  for (const line of layer.lines) {
    L.polyline(line.points, { color: line.color, weight: 2, opacity: 0.6 }).addTo(group);
  }
  for (const m of layer.markers) {
    const marker = L.circleMarker([m.lat, m.lon], {
      radius: m.radius, color: "white", weight: 2, fillColor: m.fill_color, fillOpacity: 0.8
    });
    if (m.popup) marker.bindPopup(m.popup, { maxWidth: 350 });
    if (m.tooltip) marker.bindTooltip(m.tooltip);
    marker.addTo(group);
  }
  group.addTo(map);
  overlays[layer.name] = group;
}
L.control.layers({ "OpenStreetMap": osm, "CartoDB Positron": positron }, overlays).addTo(map);
</script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Müller" & Söhne's</b>"#),
            "&lt;b&gt;&quot;Müller&quot; &amp; Söhne&#39;s&lt;/b&gt;"
        );
    }

    #[test]
    fn test_to_html_embeds_layers() {
        let mut map = LeafletMap::new("Test <map>", (52.52, 13.40));
        let mut layer = Layer::new("BWB");
        layer.markers.push(
            CircleMarker::new(52.52, 13.40, "red")
                .with_tooltip("Kaiser <Brunnen>")
                .with_popup("<p>popup</p>".to_string()),
        );
        map.layers.push(layer);
        map.legend_html = "<h4>Legend</h4>".to_string();

        let html = map.to_html().unwrap();
        assert!(html.contains("<title>Test &lt;map&gt;</title>"));
        assert!(html.contains("<h4>Legend</h4>"));
        assert!(html.contains(r#""fill_color":"red""#));
        assert!(html.contains("Kaiser &lt;Brunnen&gt;"));
        // Closing tags inside the JSON are escaped for the script block
        assert!(html.contains(r#"<p>popup<\/p>"#));
        assert!(!html.contains("{{DATA}}"));
    }

    #[test]
    fn test_write_map() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("map.html");

        let mut map = LeafletMap::new("Test", (0.0, 0.0));
        assert!(map.write(&path).is_err());

        let mut layer = Layer::new("points");
        layer.markers.push(CircleMarker::new(0.0, 0.0, "blue"));
        map.layers.push(layer);
        map.write(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("<!DOCTYPE html>"));
        assert_eq!(map.marker_count(), 1);
    }
}
