pub mod distance;
pub mod matcher;

pub use distance::geodesic_distance;
pub use matcher::{MatchOutcome, MatchResult, ProximityMatcher, match_datasets};
