use std::collections::HashMap;
use std::fmt;

use crate::domain::GeoRecord;

/// Label used when a record has no value for the counted attribute
pub const UNKNOWN: &str = "Unknown";

/// Count attribute values, most frequent first (ties by name).
///
/// Missing or blank values are counted under [`UNKNOWN`] when
/// `keep_missing` is set and dropped otherwise.
pub fn value_counts<'a>(
    records: impl IntoIterator<Item = &'a GeoRecord>,
    key: &str,
    keep_missing: bool,
) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for record in records {
        let value = match record.attr(key) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ if keep_missing => UNKNOWN.to_string(),
            _ => continue,
        };
        *counts.entry(value).or_insert(0) += 1;
    }

    let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

pub fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Per-type breakdown of a single dataset
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSummary {
    pub total: usize,
    /// (type, count), most frequent first
    pub type_counts: Vec<(String, usize)>,
}

impl DatasetSummary {
    pub fn by_attribute<'a>(records: impl IntoIterator<Item = &'a GeoRecord>, key: &str) -> Self {
        let records: Vec<&GeoRecord> = records.into_iter().collect();
        Self {
            total: records.len(),
            type_counts: value_counts(records.iter().copied(), key, true),
        }
    }
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Trinkbrunnen Statistics:")?;
        writeln!(f, "{}", "-".repeat(30))?;
        for (name, count) in &self.type_counts {
            writeln!(
                f,
                "{:15}: {:3} ({:5.1}%)",
                name,
                count,
                percent(*count, self.total)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fountain(typ: Option<&str>) -> GeoRecord {
        let record = GeoRecord::new("x", 52.5, 13.4);
        match typ {
            Some(t) => record.with_attr("typ", t),
            None => record,
        }
    }

    #[test]
    fn test_value_counts_sorted() {
        let records = vec![
            fountain(Some("Wiener Brunnen")),
            fountain(Some("Kaiser Brunnen")),
            fountain(Some("Kaiser Brunnen")),
            fountain(Some("Botsch Brunnen")),
            fountain(None),
        ];

        let counts = value_counts(&records, "typ", false);
        assert_eq!(
            counts,
            vec![
                ("Kaiser Brunnen".to_string(), 2),
                ("Botsch Brunnen".to_string(), 1),
                ("Wiener Brunnen".to_string(), 1),
            ]
        );

        let with_missing = value_counts(&records, "typ", true);
        assert!(with_missing.contains(&("Unknown".to_string(), 1)));
    }

    #[test]
    fn test_summary_display() {
        let records = vec![
            fountain(Some("Kaiser Brunnen")),
            fountain(Some("Kaiser Brunnen")),
            fountain(Some("Wiener Brunnen")),
            fountain(Some("Wiener Brunnen")),
        ];
        let summary = DatasetSummary::by_attribute(&records, "typ");
        assert_eq!(summary.total, 4);

        let text = summary.to_string();
        assert!(text.contains("Kaiser Brunnen :   2 ( 50.0%)"));
    }

    #[test]
    fn test_percent_of_zero() {
        assert_eq!(percent(3, 0), 0.0);
        assert_eq!(percent(1, 4), 25.0);
    }
}
