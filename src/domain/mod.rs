pub mod fountain;
pub mod record;

pub use fountain::FountainType;
pub use record::{AttrValue, Dataset, GeoRecord, mean_center};
