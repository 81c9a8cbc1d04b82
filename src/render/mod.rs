pub mod leaflet;
pub mod maps;

pub use leaflet::{CircleMarker, Layer, LeafletMap, Polyline, escape_html};
pub use maps::{comparison_map, simple_map, type_map};
