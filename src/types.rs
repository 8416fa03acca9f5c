use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Raw metadata row as deserialized from `indicator_metadata.csv`.
///
/// Everything is optional text; the loader turns it into a typed
/// [`IndicatorMeta`] and rejects rows without a usable indicator number.
#[derive(Debug, Deserialize)]
pub struct RawMetaRow {
    #[serde(rename = "number")]
    pub number: Option<String>,
    #[serde(rename = "name")]
    pub name: Option<String>,
    #[serde(rename = "dimension")]
    pub dimension: Option<String>,
    #[serde(rename = "sub_index")]
    pub sub_index: Option<String>,
    #[serde(rename = "description")]
    pub description: Option<String>,
    #[serde(rename = "unit")]
    pub unit: Option<String>,
    #[serde(rename = "last_update")]
    pub last_update: Option<String>,
    #[serde(rename = "source_url")]
    pub source_url: Option<String>,
}

/// Typed metadata for one of the 30 indicators.
#[derive(Debug, Clone)]
pub struct IndicatorMeta {
    pub number: usize,
    pub name: String,
    pub dimension: String,
    pub sub_index: String,
    pub description: String,
    pub unit: String,
    pub last_update: Option<NaiveDate>,
    pub source_url: String,
}

/// One cleaned observation row: a (territory, year) pair with the full
/// score hierarchy and the two context figures shown on scorecards.
///
/// Scores are `Option<f64>` throughout; `None` is the missing-value
/// sentinel that propagates through every aggregation and metric.
#[derive(Debug, Clone)]
pub struct Observation {
    pub territory: String,
    /// Grouping of territories; `None` for pseudo-territories (World and
    /// the area aggregate rows themselves).
    pub area: Option<String>,
    /// ISO-style geographic code used to look up map geometry.
    pub code: Option<String>,
    pub year: i32,
    /// Overall 0-100 composite score.
    pub index: Option<f64>,
    /// The 3 sub-index scores, in schema order.
    pub sub_indexes: Vec<Option<f64>>,
    /// The 15 dimension scores, in schema order.
    pub dimensions: Vec<Option<f64>>,
    /// The 30 normalized indicator scores, in indicator-number order.
    pub indicators: Vec<Option<f64>>,
    pub population: Option<f64>,
    pub gdp_per_capita: Option<f64>,
}

impl Observation {
    /// Value of a resolved feature column on this row.
    pub fn feature(&self, feature: crate::schema::FeatureRef) -> Option<f64> {
        use crate::schema::FeatureRef::*;
        match feature {
            Index => self.index,
            SubIndex(pos) => self.sub_indexes[pos],
            Dimension(pos) => self.dimensions[pos],
            Indicator(number) => self.indicators[number - 1],
        }
    }
}

/// One row of the ranking report for a selected feature and year.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RankingRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: u32,
    #[serde(rename = "Territory")]
    #[tabled(rename = "Territory")]
    pub territory: String,
    #[serde(rename = "Area")]
    #[tabled(rename = "Area")]
    pub area: String,
    #[serde(rename = "Score")]
    #[tabled(rename = "Score")]
    pub score: String,
}

/// One row of a scorecard component table: a feature's score for the
/// territory, with its signed differences from the parent area and from
/// the World aggregate.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ScorecardRow {
    #[serde(rename = "Component")]
    #[tabled(rename = "Component")]
    pub component: String,
    #[serde(rename = "Score")]
    #[tabled(rename = "Score")]
    pub score: String,
    #[serde(rename = "DifferenceFromArea")]
    #[tabled(rename = "Difference from Area")]
    pub diff_from_area: String,
    #[serde(rename = "DifferenceFromWorld")]
    #[tabled(rename = "Difference from World")]
    pub diff_from_world: String,
}

/// Scorecard header values, already formatted for display.
#[derive(Debug, Serialize, Clone)]
pub struct ScorecardSummary {
    pub territory: String,
    pub year: i32,
    pub area: String,
    pub population: String,
    pub gdp_per_capita: String,
    pub score: String,
    pub rank: String,
    pub tier: String,
}

/// One point of the index-evolution series (territory, parent area and
/// World across all observed years).
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct EvolutionRow {
    #[serde(rename = "Territory")]
    #[tabled(rename = "Territory")]
    pub territory: String,
    #[serde(rename = "Year")]
    #[tabled(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Score")]
    #[tabled(rename = "Score")]
    pub score: String,
}
