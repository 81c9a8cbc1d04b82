pub mod nominatim;
pub mod overpass;
pub mod wfs;

pub use nominatim::{Place, geocode_place};
pub use overpass::{OverpassResponse, fetch_drinking_water};
pub use wfs::{fetch_feature_collection, save_feature_collection};

pub(crate) const USER_AGENT: &str = "trinkbrunnen/0.1.0 (drinking fountain comparison)";
