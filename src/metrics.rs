// Derived presentation metrics: rank, tier and score deltas.
//
// Everything here is a pure function over already-loaded values; missing
// data flows in and out as `None`.
use crate::schema::{TIER_BINS, TIER_LABELS};
use crate::util::sig_round;

/// Number of significant figures used for displayed score differences.
pub const DELTA_FIGURES: u32 = 2;

/// Min ranking of `target` among `values`, descending: the best score gets
/// rank 1 and ties share the lowest rank number ([90, 90, 80] ranks as
/// [1, 1, 3]).
///
/// Entries with a missing value never rank and never displace anyone.
/// Returns `None` when the target is absent from the set or its own value
/// is missing. Callers decide what belongs in the set; aggregate rows
/// (World, areas) are simply not included when ranking countries.
pub fn rank(values: &[(&str, Option<f64>)], target: &str) -> Option<u32> {
    let (_, target_value) = values.iter().find(|(name, _)| *name == target)?;
    let target_value = (*target_value)?;
    let better = values
        .iter()
        .filter(|(_, v)| matches!(v, Some(v) if *v > target_value))
        .count();
    Some(better as u32 + 1)
}

/// Classify an Index score into its tier label.
///
/// Bins are half-open on the lower bound: a score exactly at a breakpoint
/// falls into the higher bin (60.0 is "Medium", not "Low"). Missing or
/// out-of-range scores have no tier.
pub fn tier(score: Option<f64>) -> Option<&'static str> {
    let score = score?;
    if !score.is_finite() || !(0.0..=100.0).contains(&score) {
        return None;
    }
    let mut label = TIER_LABELS[0];
    for (edge, name) in TIER_BINS.iter().zip(TIER_LABELS.iter()) {
        if score >= *edge {
            label = name;
        }
    }
    Some(label)
}

/// Signed difference from a reference score, rounded for display to
/// [`DELTA_FIGURES`] significant figures. Missing either side, there is no
/// delta.
pub fn delta(score: Option<f64>, reference: Option<f64>) -> Option<f64> {
    Some(sig_round(score? - reference?, DELTA_FIGURES))
}

/// Direction glyph shown next to a delta on the scorecard.
pub fn change_arrow(delta: Option<f64>) -> &'static str {
    match delta {
        Some(d) if d > 0.0 => "\u{25b2}",
        Some(d) if d < 0.0 => "\u{25bc}",
        Some(_) => "=",
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_shares_lowest_number_on_ties() {
        let values = [
            ("Alpha", Some(90.0)),
            ("Bravo", Some(90.0)),
            ("Charlie", Some(80.0)),
        ];
        assert_eq!(rank(&values, "Alpha"), Some(1));
        assert_eq!(rank(&values, "Bravo"), Some(1));
        assert_eq!(rank(&values, "Charlie"), Some(3));
    }

    #[test]
    fn rank_undefined_without_a_value() {
        let values = [("Alpha", None), ("Bravo", None)];
        assert_eq!(rank(&values, "Alpha"), None);
        assert_eq!(rank(&values, "Bravo"), None);
        assert_eq!(rank(&values, "Delta"), None);
    }

    #[test]
    fn rank_skips_missing_competitors() {
        let values = [("Alpha", Some(70.0)), ("Bravo", None), ("Charlie", Some(90.0))];
        assert_eq!(rank(&values, "Alpha"), Some(2));
    }

    #[test]
    fn tier_boundary_takes_higher_bin() {
        assert_eq!(tier(Some(60.0)), Some("Medium"));
        assert_eq!(tier(Some(59.999)), Some("Low"));
        assert_eq!(tier(Some(0.0)), Some("Very Low"));
        assert_eq!(tier(Some(85.0)), Some("Very High"));
        assert_eq!(tier(Some(100.0)), Some("Very High"));
    }

    #[test]
    fn tier_undefined_for_missing_or_out_of_range() {
        assert_eq!(tier(None), None);
        assert_eq!(tier(Some(-0.1)), None);
        assert_eq!(tier(Some(100.1)), None);
        assert_eq!(tier(Some(f64::NAN)), None);
    }

    #[test]
    fn delta_rounds_to_two_significant_figures() {
        let d = delta(Some(77.346), Some(75.1)).unwrap();
        assert!((d - 2.2).abs() < 1e-9);
    }

    #[test]
    fn delta_against_missing_reference_is_undefined() {
        assert_eq!(delta(Some(77.3), None), None);
        assert_eq!(delta(None, Some(75.1)), None);
    }

    #[test]
    fn arrows_follow_sign() {
        assert_eq!(change_arrow(Some(2.2)), "\u{25b2}");
        assert_eq!(change_arrow(Some(-0.5)), "\u{25bc}");
        assert_eq!(change_arrow(Some(0.0)), "=");
        assert_eq!(change_arrow(None), "");
    }
}
