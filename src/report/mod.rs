pub mod comparison;
pub mod summary;

pub use comparison::{ComparisonReport, DistanceStats};
pub use summary::{DatasetSummary, value_counts};
