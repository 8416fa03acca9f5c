// Hierarchical score aggregation.
//
// The roll-up is deliberately non-compensatory above the dimension level:
// dimensions are the arithmetic mean of their two components, but
// sub-indexes and the overall Index use the geometric mean, so a very low
// score in one branch cannot be offset by high scores elsewhere.
// Substituting an arithmetic mean at those levels is a correctness bug.
//
// Missing values propagate: if any required child is missing (or, for the
// geometric mean, non-positive), the parent is missing. The functions never
// skip inputs silently.
use crate::schema::{Schema, INDEX_NAME};
use crate::types::Observation;

/// Recompute-vs-stored comparison tolerance.
pub const VALIDATION_TOLERANCE: f64 = 1e-6;

/// Arithmetic mean of a dimension's two component scores.
pub fn dimension_score(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some((a? + b?) / 2.0)
}

/// Geometric mean of a sub-index's dimension scores.
///
/// Returns `None` if any input is missing or non-positive (the geometric
/// mean is undefined there). An empty slice is a caller error, not a data
/// condition.
pub fn sub_index_score(dimensions: &[Option<f64>]) -> Option<f64> {
    geometric_mean(dimensions)
}

/// Geometric mean of the three sub-index scores, same missing policy.
pub fn index_score(sub_indexes: &[Option<f64>]) -> Option<f64> {
    geometric_mean(sub_indexes)
}

fn geometric_mean(values: &[Option<f64>]) -> Option<f64> {
    assert!(!values.is_empty(), "geometric mean of an empty sequence");
    // Sum of logs rather than a running product, to stay in range for any
    // input count.
    let mut log_sum = 0.0;
    for v in values {
        let v = (*v)?;
        if v <= 0.0 {
            return None;
        }
        log_sum += v.ln();
    }
    Some((log_sum / values.len() as f64).exp())
}

/// Hierarchy level of a recomputed score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Level {
    Dimension,
    SubIndex,
    Index,
}

/// A disagreement between a stored aggregate and its bottom-up recompute.
///
/// Also emitted when exactly one of the two sides is missing: a stored
/// value whose children cannot reproduce it (or vice versa) is just as much
/// a data-quality signal as a numeric drift.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Mismatch {
    pub territory: String,
    pub year: i32,
    pub level: Level,
    pub name: String,
    pub stored: Option<f64>,
    pub recomputed: Option<f64>,
}

fn disagree(stored: Option<f64>, recomputed: Option<f64>, tolerance: f64) -> bool {
    match (stored, recomputed) {
        (Some(s), Some(r)) => (s - r).abs() > tolerance,
        (None, None) => false,
        _ => true,
    }
}

/// Recompute every level of one observation bottom-up from its raw
/// indicators and report where the stored aggregates disagree.
///
/// Mismatches are data-quality warnings for inspection; nothing is
/// corrected in place and nothing fails.
pub fn validate_observation(obs: &Observation, schema: &Schema, tolerance: f64) -> Vec<Mismatch> {
    let mut mismatches = Vec::new();
    let mut report = |level: Level, name: &str, stored: Option<f64>, recomputed: Option<f64>| {
        if disagree(stored, recomputed, tolerance) {
            mismatches.push(Mismatch {
                territory: obs.territory.clone(),
                year: obs.year,
                level,
                name: name.to_string(),
                stored,
                recomputed,
            });
        }
    };

    let mut dim_scores = Vec::with_capacity(schema.dimensions.len());
    for (pos, dim) in schema.dimensions.iter().enumerate() {
        let a = obs.indicators[dim.components[0] - 1];
        let b = obs.indicators[dim.components[1] - 1];
        let recomputed = dimension_score(a, b);
        report(Level::Dimension, &dim.name, obs.dimensions[pos], recomputed);
        dim_scores.push(recomputed);
    }

    let mut sub_scores = Vec::with_capacity(schema.sub_indexes.len());
    for (pos, sub) in schema.sub_indexes.iter().enumerate() {
        let children: Vec<Option<f64>> = sub.dimensions.iter().map(|&d| dim_scores[d]).collect();
        let recomputed = sub_index_score(&children);
        report(Level::SubIndex, &sub.name, obs.sub_indexes[pos], recomputed);
        sub_scores.push(recomputed);
    }

    let recomputed_index = index_score(&sub_scores);
    report(Level::Index, INDEX_NAME, obs.index, recomputed_index);

    mismatches
}

/// Summary of a whole-dataset validation pass, serialized to the JSON
/// validation report.
#[derive(Debug, serde::Serialize)]
pub struct ValidationReport {
    pub rows_checked: usize,
    pub rows_clean: usize,
    pub tolerance: f64,
    pub mismatches: Vec<Mismatch>,
}

pub fn validate_dataset(observations: &[Observation], schema: &Schema) -> ValidationReport {
    let mut mismatches = Vec::new();
    let mut rows_clean = 0usize;
    for obs in observations {
        let found = validate_observation(obs, schema, VALIDATION_TOLERANCE);
        if found.is_empty() {
            rows_clean += 1;
        }
        mismatches.extend(found);
    }
    ValidationReport {
        rows_checked: observations.len(),
        rows_clean,
        tolerance: VALIDATION_TOLERANCE,
        mismatches,
    }
}
