use serde::Serialize;
use std::collections::BTreeMap;

use super::distance::geodesic_distance;
use crate::domain::{AttrValue, Dataset, GeoRecord};
use crate::error::MatchError;

/// A single reference/candidate pairing produced by [`ProximityMatcher::run`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub reference_index: usize,
    pub candidate_index: usize,
    /// Geodesic distance in meters
    pub distance_m: f64,
    pub reference_id: String,
    pub candidate_id: String,
    /// Attributes copied from the reference record (keys chosen by the caller)
    pub reference_attrs: BTreeMap<String, AttrValue>,
    /// Attributes copied from the candidate record (keys chosen by the caller)
    pub candidate_attrs: BTreeMap<String, AttrValue>,
}

/// Matches plus the indices of both sides that were left over.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchOutcome {
    pub matches: Vec<MatchResult>,
    /// Indices into the reference dataset, in original order
    pub unmatched_reference: Vec<usize>,
    /// Indices into the candidate dataset, in original order
    pub unmatched_candidates: Vec<usize>,
}

impl MatchOutcome {
    pub fn unmatched_reference_records<'a>(
        &'a self,
        reference: &'a Dataset,
    ) -> impl Iterator<Item = &'a GeoRecord> + 'a {
        self.unmatched_reference
            .iter()
            .filter_map(move |&i| reference.get(i))
    }

    pub fn unmatched_candidate_records<'a>(
        &'a self,
        candidates: &'a Dataset,
    ) -> impl Iterator<Item = &'a GeoRecord> + 'a {
        self.unmatched_candidates
            .iter()
            .filter_map(move |&i| candidates.get(i))
    }
}

/// Greedy one-to-one nearest neighbour matching under a distance threshold.
///
/// Reference records are visited in order; each takes the closest candidate
/// not yet consumed whose distance is strictly below the threshold. This is
/// first-reference-wins and not a globally optimal assignment. Runs in
/// O(|reference| x |candidates|).
#[derive(Debug, Clone)]
pub struct ProximityMatcher {
    max_distance_m: f64,
    reference_keys: Vec<String>,
    candidate_keys: Vec<String>,
}

impl ProximityMatcher {
    pub fn new(max_distance_m: f64) -> Result<Self, MatchError> {
        if !max_distance_m.is_finite() || max_distance_m <= 0.0 {
            return Err(MatchError::InvalidThreshold(max_distance_m));
        }
        Ok(Self {
            max_distance_m,
            reference_keys: Vec::new(),
            candidate_keys: Vec::new(),
        })
    }

    /// Attribute keys to copy from each side into every [`MatchResult`]
    pub fn with_copied_attrs(mut self, reference_keys: &[&str], candidate_keys: &[&str]) -> Self {
        self.reference_keys = reference_keys.iter().map(|k| k.to_string()).collect();
        self.candidate_keys = candidate_keys.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn run(&self, reference: &Dataset, candidates: &Dataset) -> MatchOutcome {
        let mut consumed = vec![false; candidates.len()];
        let mut reference_matched = vec![false; reference.len()];
        let mut matches = Vec::new();

        for (i, ref_record) in reference.iter().enumerate() {
            let mut closest: Option<(usize, f64)> = None;

            for (j, candidate) in candidates.iter().enumerate() {
                if consumed[j] {
                    continue;
                }
                let distance = geodesic_distance(ref_record.coords(), candidate.coords());
                // Strict comparisons: threshold itself is out of range, ties keep the earlier candidate
                if distance < self.max_distance_m
                    && closest.is_none_or(|(_, best)| distance < best)
                {
                    closest = Some((j, distance));
                }
            }

            if let Some((j, distance)) = closest {
                consumed[j] = true;
                reference_matched[i] = true;
                matches.push(self.build_result(i, ref_record, j, &candidates.records[j], distance));
            }
        }

        MatchOutcome {
            matches,
            unmatched_reference: unflagged(&reference_matched),
            unmatched_candidates: unflagged(&consumed),
        }
    }

    fn build_result(
        &self,
        reference_index: usize,
        reference: &GeoRecord,
        candidate_index: usize,
        candidate: &GeoRecord,
        distance_m: f64,
    ) -> MatchResult {
        MatchResult {
            reference_index,
            candidate_index,
            distance_m,
            reference_id: reference.id.clone(),
            candidate_id: candidate.id.clone(),
            reference_attrs: copy_attrs(reference, &self.reference_keys),
            candidate_attrs: copy_attrs(candidate, &self.candidate_keys),
        }
    }
}

/// Convenience wrapper for a one-off run with no copied attributes.
pub fn match_datasets(
    reference: &Dataset,
    candidates: &Dataset,
    max_distance_m: f64,
) -> Result<MatchOutcome, MatchError> {
    Ok(ProximityMatcher::new(max_distance_m)?.run(reference, candidates))
}

fn unflagged(flags: &[bool]) -> Vec<usize> {
    flags
        .iter()
        .enumerate()
        .filter(|&(_, &flag)| !flag)
        .map(|(i, _)| i)
        .collect()
}

fn copy_attrs(record: &GeoRecord, keys: &[String]) -> BTreeMap<String, AttrValue> {
    keys.iter()
        .map(|k| {
            let value = record.attr(k).cloned().unwrap_or(AttrValue::Null);
            (k.clone(), value)
        })
        .collect()
}
