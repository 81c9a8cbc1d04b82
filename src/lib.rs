//! trinkbrunnen - Compare Berlin drinking fountain data from BWB and OpenStreetMap

pub mod api;
pub mod bwb;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod matching;
pub mod osm;
pub mod render;
pub mod report;
