use std::fmt;

use super::summary::{percent, value_counts};
use crate::bwb::keys as bwb_keys;
use crate::domain::Dataset;
use crate::matching::MatchOutcome;
use crate::osm::parser::keys as osm_keys;

const TOP_OPERATORS: usize = 5;
const RECENT_YEARS: usize = 5;

/// Distance statistics over all matches
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceStats {
    pub mean_m: f64,
    pub median_m: f64,
    pub max_m: f64,
    /// Matches at or below the close-match threshold
    pub close_count: usize,
    pub close_threshold_m: f64,
}

impl DistanceStats {
    /// `None` when there are no distances
    pub fn from_distances(distances: &[f64], close_threshold_m: f64) -> Option<Self> {
        if distances.is_empty() {
            return None;
        }
        let mut sorted = distances.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let n = sorted.len();
        let median_m = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        };

        Some(Self {
            mean_m: sorted.iter().sum::<f64>() / n as f64,
            median_m,
            max_m: sorted[n - 1],
            close_count: sorted.iter().filter(|&&d| d <= close_threshold_m).count(),
            close_threshold_m,
        })
    }
}

/// Coverage analysis of OSM against the official BWB data.
///
/// OSM is the reference side of the match, BWB the candidate side.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonReport {
    pub bwb_total: usize,
    pub osm_total: usize,
    pub matched: usize,
    pub bwb_missing: usize,
    pub osm_additional: usize,
    pub distance: Option<DistanceStats>,
    /// Types of BWB fountains with no OSM counterpart
    pub missing_types: Vec<(String, usize)>,
    /// Most common non-empty OSM operators
    pub top_operators: Vec<(String, usize)>,
    /// Latest BWB installation years, ascending
    pub recent_years: Vec<(String, usize)>,
}

impl ComparisonReport {
    pub fn build(
        osm: &Dataset,
        bwb: &Dataset,
        outcome: &MatchOutcome,
        close_threshold_m: f64,
    ) -> Self {
        let distances: Vec<f64> = outcome.matches.iter().map(|m| m.distance_m).collect();

        let missing_types = value_counts(
            outcome.unmatched_candidate_records(bwb),
            bwb_keys::TYPE,
            false,
        );

        let mut top_operators = value_counts(osm, osm_keys::OPERATOR, false);
        top_operators.truncate(TOP_OPERATORS);

        Self {
            bwb_total: bwb.len(),
            osm_total: osm.len(),
            matched: outcome.matches.len(),
            bwb_missing: outcome.unmatched_candidates.len(),
            osm_additional: outcome.unmatched_reference.len(),
            distance: DistanceStats::from_distances(&distances, close_threshold_m),
            missing_types,
            top_operators,
            recent_years: recent_years(bwb),
        }
    }

    /// Share of BWB fountains that have an OSM counterpart, in percent
    pub fn coverage(&self) -> f64 {
        percent(self.matched, self.bwb_total)
    }
}

fn recent_years(bwb: &Dataset) -> Vec<(String, usize)> {
    let mut years: Vec<(String, usize)> = value_counts(bwb, bwb_keys::INSTALLED, false)
        .into_iter()
        .filter(|(year, _)| year != "null")
        .collect();

    // Numeric years in numeric order, anything else after them
    years.sort_by(|a, b| match (a.0.parse::<i64>(), b.0.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        (Err(_), Err(_)) => a.0.cmp(&b.0),
    });

    let skip = years.len().saturating_sub(RECENT_YEARS);
    years.split_off(skip)
}

impl fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "=".repeat(60))?;
        writeln!(f, "TRINKBRUNNEN DATA COMPARISON ANALYSIS")?;
        writeln!(f, "{}", "=".repeat(60))?;

        writeln!(f)?;
        writeln!(f, "Dataset overview:")?;
        writeln!(f, "BWB Official Data:     {:3} fountains", self.bwb_total)?;
        writeln!(f, "OSM Community Data:    {:3} fountains", self.osm_total)?;
        writeln!(f, "Matches found:         {:3} fountains", self.matched)?;
        writeln!(f, "Coverage rate:         {:5.1}%", self.coverage())?;

        writeln!(f)?;
        writeln!(f, "Detailed breakdown:")?;
        writeln!(
            f,
            "BWB fountains in OSM:  {:3} ({:5.1}%)",
            self.matched,
            self.coverage()
        )?;
        writeln!(
            f,
            "BWB fountains missing: {:3} ({:5.1}%)",
            self.bwb_missing,
            percent(self.bwb_missing, self.bwb_total)
        )?;
        writeln!(f, "OSM additional fountains: {:3}", self.osm_additional)?;

        if let Some(stats) = &self.distance {
            writeln!(f)?;
            writeln!(f, "Match quality:")?;
            writeln!(f, "Average distance:      {:5.1}m", stats.mean_m)?;
            writeln!(f, "Median distance:       {:5.1}m", stats.median_m)?;
            writeln!(f, "Max distance:          {:5.1}m", stats.max_m)?;
            writeln!(
                f,
                "Very close matches (<={}m): {} ({:.1}%)",
                stats.close_threshold_m,
                stats.close_count,
                percent(stats.close_count, self.matched)
            )?;
        }

        if !self.missing_types.is_empty() {
            writeln!(f)?;
            writeln!(f, "Missing BWB fountain types:")?;
            for (typ, count) in &self.missing_types {
                writeln!(f, "  {:15}: {:3}", typ, count)?;
            }
        }

        if !self.top_operators.is_empty() {
            writeln!(f)?;
            writeln!(f, "OSM fountain operators:")?;
            for (operator, count) in &self.top_operators {
                writeln!(f, "  {:20}: {:3}", operator, count)?;
            }
        }

        if !self.recent_years.is_empty() {
            writeln!(f)?;
            writeln!(f, "BWB installation years:")?;
            for (year, count) in &self.recent_years {
                writeln!(f, "  {}: {:3} fountains", year, count)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GeoRecord;
    use crate::matching::ProximityMatcher;

    fn bwb_fountain(id: &str, lat: f64, lon: f64, typ: &str, year: f64) -> GeoRecord {
        GeoRecord::new(id, lat, lon)
            .with_attr("typ", typ)
            .with_attr("einbaujahr", year)
    }

    fn osm_fountain(id: &str, lat: f64, lon: f64, operator: &str) -> GeoRecord {
        GeoRecord::new(id, lat, lon).with_attr("operator", operator)
    }

    #[test]
    fn test_distance_stats() {
        let stats = DistanceStats::from_distances(&[30.0, 5.0, 10.0, 15.0], 10.0).unwrap();
        assert_eq!(stats.mean_m, 15.0);
        assert_eq!(stats.median_m, 12.5);
        assert_eq!(stats.max_m, 30.0);
        assert_eq!(stats.close_count, 2);

        let odd = DistanceStats::from_distances(&[3.0, 1.0, 2.0], 10.0).unwrap();
        assert_eq!(odd.median_m, 2.0);

        assert!(DistanceStats::from_distances(&[], 10.0).is_none());
    }

    #[test]
    fn test_build_report() {
        let bwb = Dataset::new(
            "BWB",
            vec![
                bwb_fountain("1", 52.5200, 13.4050, "Kaiser Brunnen", 2016.0),
                bwb_fountain("2", 52.5300, 13.4100, "Wiener Brunnen", 2019.0),
                bwb_fountain("3", 52.5400, 13.4200, "Wiener Brunnen", 2019.0),
            ],
        );
        let osm = Dataset::new(
            "OSM",
            vec![
                osm_fountain("node/1", 52.5201, 13.4051, "Berliner Wasserbetriebe"),
                osm_fountain("node/2", 52.6000, 13.5000, ""),
            ],
        );

        let outcome = ProximityMatcher::new(50.0).unwrap().run(&osm, &bwb);
        let report = ComparisonReport::build(&osm, &bwb, &outcome, 10.0);

        assert_eq!(report.bwb_total, 3);
        assert_eq!(report.osm_total, 2);
        assert_eq!(report.matched, 1);
        assert_eq!(report.bwb_missing, 2);
        assert_eq!(report.osm_additional, 1);
        assert!((report.coverage() - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.missing_types, vec![("Wiener Brunnen".to_string(), 2)]);
        assert_eq!(
            report.top_operators,
            vec![("Berliner Wasserbetriebe".to_string(), 1)]
        );
        assert_eq!(
            report.recent_years,
            vec![("2016".to_string(), 1), ("2019".to_string(), 2)]
        );

        let stats = report.distance.as_ref().unwrap();
        assert_eq!(stats.close_count, 0);

        let text = report.to_string();
        assert!(text.contains("Coverage rate:          33.3%"));
        assert!(text.contains("Missing BWB fountain types:"));
    }

    #[test]
    fn test_report_empty_bwb() {
        let bwb = Dataset::new("BWB", Vec::new());
        let osm = Dataset::new("OSM", vec![osm_fountain("node/1", 52.52, 13.40, "")]);
        let outcome = ProximityMatcher::new(50.0).unwrap().run(&osm, &bwb);

        let report = ComparisonReport::build(&osm, &bwb, &outcome, 10.0);
        assert_eq!(report.coverage(), 0.0);
        assert!(report.distance.is_none());
        assert!(!report.to_string().contains("Match quality"));
    }

    #[test]
    fn test_recent_years_keeps_last_five() {
        let records = (2010..2018)
            .map(|y| bwb_fountain("x", 52.5, 13.4, "Kaiser Brunnen", y as f64))
            .chain(std::iter::once(
                GeoRecord::new("y", 52.5, 13.4).with_attr("einbaujahr", "null"),
            ))
            .collect();
        let years = recent_years(&Dataset::new("BWB", records));
        let labels: Vec<&str> = years.iter().map(|(y, _)| y.as_str()).collect();
        assert_eq!(labels, vec!["2013", "2014", "2015", "2016", "2017"]);
    }
}
