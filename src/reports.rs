// Presentation-ready report builders: scorecard, ranking and evolution.
//
// Each builder is a pure function over the loaded `Dataset`. Unknown
// territories or feature names are caller errors and fail hard; missing
// scores degrade to "N/A" cells and empty deltas, never to a failure.
use crate::loader::{Dataset, WORLD};
use crate::metrics::{change_arrow, delta, rank, tier};
use crate::schema::FeatureRef;
use crate::types::{EvolutionRow, Observation, RankingRow, ScorecardRow, ScorecardSummary};
use crate::util::{format_value, sig_format, ValueFormat, MISSING_LABEL};
use std::error::Error;

fn unknown_territory(territory: &str, year: i32) -> Box<dyn Error> {
    format!("no observation for territory '{}' in {}", territory, year).into()
}

/// Scorecard header block for one territory and year.
pub fn scorecard_summary(
    dataset: &Dataset,
    territory: &str,
    year: i32,
) -> Result<ScorecardSummary, Box<dyn Error>> {
    let obs = dataset
        .observation(territory, year)
        .ok_or_else(|| unknown_territory(territory, year))?;

    let countries = dataset.countries(year);
    let ranked: Vec<(&str, Option<f64>)> = countries
        .iter()
        .map(|o| (o.territory.as_str(), o.index))
        .collect();
    let rank_text = match rank(&ranked, territory) {
        Some(r) => format!("{}/{}", r, ranked.len()),
        None => MISSING_LABEL.to_string(),
    };

    let population_fmt = ValueFormat::fixed(3).scaled(1e6).with_suffix(" millions");
    let gdp_fmt = ValueFormat::fixed(0).with_prefix("US$");
    let score_fmt = ValueFormat::significant(3).with_suffix("/100");

    Ok(ScorecardSummary {
        territory: obs.territory.clone(),
        year,
        area: obs.area.clone().unwrap_or_else(|| MISSING_LABEL.to_string()),
        population: format_value(obs.population, &population_fmt),
        gdp_per_capita: format_value(obs.gdp_per_capita, &gdp_fmt),
        score: format_value(obs.index, &score_fmt),
        rank: rank_text,
        tier: tier(obs.index).unwrap_or(MISSING_LABEL).to_string(),
    })
}

/// Deltas of one feature score against the parent area and World rows.
///
/// World has no reference at all; an area row compares only against the
/// World; a missing score voids both comparisons.
fn reference_deltas(
    score: Option<f64>,
    is_world: bool,
    area_row: Option<&Observation>,
    world_row: Option<&Observation>,
    feature: FeatureRef,
) -> (Option<f64>, Option<f64>) {
    if is_world || score.is_none() {
        return (None, None);
    }
    let from_area = area_row.and_then(|a| delta(score, a.feature(feature)));
    let from_world = world_row.and_then(|w| delta(score, w.feature(feature)));
    (from_area, from_world)
}

fn delta_cell(d: Option<f64>) -> String {
    let figures = ValueFormat::significant(crate::metrics::DELTA_FIGURES);
    match d {
        Some(_) => format!("{} {}", change_arrow(d), format_value(d, &figures)),
        None => MISSING_LABEL.to_string(),
    }
}

/// Component table of a scorecard: every feature column with its score and
/// its differences from the parent area and from the World.
pub fn scorecard_table(
    dataset: &Dataset,
    territory: &str,
    year: i32,
) -> Result<Vec<ScorecardRow>, Box<dyn Error>> {
    let obs = dataset
        .observation(territory, year)
        .ok_or_else(|| unknown_territory(territory, year))?;
    let is_world = territory == WORLD;
    let area_row = obs
        .area
        .as_deref()
        .and_then(|area| dataset.observation(area, year));
    let world_row = dataset.observation(WORLD, year);

    let mut rows = Vec::new();
    for name in dataset.schema.feature_columns() {
        let feature = dataset
            .schema
            .resolve_feature(&name)
            .ok_or_else(|| format!("schema produced an unresolvable column '{}'", name))?;
        let component = match feature {
            FeatureRef::Indicator(number) => {
                format!("{}: {}", name, dataset.metadata[number - 1].name)
            }
            _ => name.clone(),
        };
        let score = obs.feature(feature);
        let (from_area, from_world) =
            reference_deltas(score, is_world, area_row, world_row, feature);
        rows.push(ScorecardRow {
            component,
            score: sig_format(score),
            diff_from_area: delta_cell(from_area),
            diff_from_world: delta_cell(from_world),
        });
    }
    Ok(rows)
}

/// Ranked country table for one feature and year, best score first.
///
/// Countries without a value for the feature do not rank and are left out;
/// aggregate rows never participate.
pub fn ranking_table(
    dataset: &Dataset,
    feature_name: &str,
    year: i32,
) -> Result<Vec<RankingRow>, Box<dyn Error>> {
    let feature = dataset
        .schema
        .resolve_feature(feature_name)
        .ok_or_else(|| format!("unknown feature '{}'", feature_name))?;

    let mut scored: Vec<(&Observation, f64)> = dataset
        .countries(year)
        .into_iter()
        .filter_map(|o| o.feature(feature).map(|v| (o, v)))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut rows = Vec::with_capacity(scored.len());
    let mut current_rank = 0u32;
    let mut previous: Option<f64> = None;
    for (position, (obs, value)) in scored.iter().enumerate() {
        // Min ranking: ties keep the first position of their value.
        if previous != Some(*value) {
            current_rank = position as u32 + 1;
            previous = Some(*value);
        }
        rows.push(RankingRow {
            rank: current_rank,
            territory: obs.territory.clone(),
            area: obs
                .area
                .clone()
                .unwrap_or_else(|| MISSING_LABEL.to_string()),
            score: sig_format(Some(*value)),
        });
    }
    Ok(rows)
}

/// Index evolution series: the territory, its parent area and the World
/// across every observed year.
pub fn evolution_table(
    dataset: &Dataset,
    territory: &str,
) -> Result<Vec<EvolutionRow>, Box<dyn Error>> {
    if !dataset.is_known_territory(territory) {
        return Err(format!("unknown territory '{}'", territory).into());
    }
    let mut series: Vec<String> = vec![territory.to_string()];
    if let Some(area) = dataset.area_of(territory) {
        series.push(area);
    }
    if territory != WORLD {
        series.push(WORLD.to_string());
    }

    let mut rows = Vec::new();
    for name in &series {
        for year in dataset.years() {
            if let Some(obs) = dataset.observation(name, year) {
                rows.push(EvolutionRow {
                    territory: name.clone(),
                    year,
                    score: sig_format(obs.index),
                });
            }
        }
    }
    Ok(rows)
}
