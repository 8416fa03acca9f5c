// Explicit schema for the score hierarchy.
//
// The source tables carry the hierarchy implicitly in their column names
// (Index, sub-index and dimension columns followed by `Indicator N`
// columns). Instead of re-parsing names everywhere, the hierarchy is built
// once from the metadata table and validated here; every later lookup goes
// through this mapping. A metadata table that does not induce exactly
// 3 sub-indexes x 5 dimensions x 2 indicators is a structural error and
// fails the load outright.
use crate::types::IndicatorMeta;
use std::error::Error;

pub const INDEX_NAME: &str = "CFA Index";
pub const INDICATOR_COUNT: usize = 30;
pub const DIMENSION_COUNT: usize = 15;
pub const SUB_INDEX_COUNT: usize = 3;
pub const COMPONENTS_PER_DIMENSION: usize = 2;
pub const DIMENSIONS_PER_SUB_INDEX: usize = 5;

/// Tier classification breakpoints for the Index score. Bins are half-open
/// on the lower bound: a score exactly at a breakpoint takes the higher
/// bin, and 100 stays in the top bin.
pub const TIER_BINS: [f64; 5] = [0.0, 45.0, 60.0, 75.0, 85.0];
pub const TIER_LABELS: [&str; 5] = ["Very Low", "Low", "Medium", "High", "Very High"];

/// A dimension: named aggregate of exactly two component indicators.
#[derive(Debug, Clone)]
pub struct DimensionDef {
    pub name: String,
    pub sub_index: String,
    /// 1-based indicator numbers of the two components.
    pub components: [usize; COMPONENTS_PER_DIMENSION],
}

/// A sub-index: named aggregate of five dimensions.
#[derive(Debug, Clone)]
pub struct SubIndexDef {
    pub name: String,
    /// 0-based positions into `Schema::dimensions`.
    pub dimensions: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct Schema {
    pub sub_indexes: Vec<SubIndexDef>,
    pub dimensions: Vec<DimensionDef>,
}

/// A resolved feature column: which level it sits at and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureRef {
    Index,
    /// 0-based position into `Schema::sub_indexes`.
    SubIndex(usize),
    /// 0-based position into `Schema::dimensions`.
    Dimension(usize),
    /// 1-based indicator number.
    Indicator(usize),
}

impl Schema {
    /// Build the hierarchy from the metadata table.
    ///
    /// Consecutive indicator pairs (1,2), (3,4), ... form the dimensions;
    /// both members of a pair must agree on dimension and sub-index name.
    /// Sub-indexes are collected in order of first appearance.
    pub fn from_metadata(meta: &[IndicatorMeta]) -> Result<Schema, Box<dyn Error>> {
        if meta.len() != INDICATOR_COUNT {
            return Err(format!(
                "expected {} indicators in metadata, found {}",
                INDICATOR_COUNT,
                meta.len()
            )
            .into());
        }
        let mut by_number = meta.to_vec();
        by_number.sort_by_key(|m| m.number);
        for (i, m) in by_number.iter().enumerate() {
            if m.number != i + 1 {
                return Err(format!(
                    "indicator numbers must cover 1..={} exactly once; missing or duplicate near {}",
                    INDICATOR_COUNT, m.number
                )
                .into());
            }
        }

        let mut dimensions: Vec<DimensionDef> = Vec::with_capacity(DIMENSION_COUNT);
        for pair in by_number.chunks(COMPONENTS_PER_DIMENSION) {
            let (a, b) = (&pair[0], &pair[1]);
            if a.dimension != b.dimension || a.sub_index != b.sub_index {
                return Err(format!(
                    "indicators {} and {} must share a dimension and sub-index (found '{}'/'{}')",
                    a.number, b.number, a.dimension, b.dimension
                )
                .into());
            }
            if dimensions.iter().any(|d| d.name == a.dimension) {
                return Err(format!("duplicate dimension name '{}'", a.dimension).into());
            }
            dimensions.push(DimensionDef {
                name: a.dimension.clone(),
                sub_index: a.sub_index.clone(),
                components: [a.number, b.number],
            });
        }

        let mut sub_indexes: Vec<SubIndexDef> = Vec::with_capacity(SUB_INDEX_COUNT);
        for (pos, dim) in dimensions.iter().enumerate() {
            match sub_indexes.iter_mut().find(|s| s.name == dim.sub_index) {
                Some(s) => s.dimensions.push(pos),
                None => sub_indexes.push(SubIndexDef {
                    name: dim.sub_index.clone(),
                    dimensions: vec![pos],
                }),
            }
        }
        if sub_indexes.len() != SUB_INDEX_COUNT {
            return Err(format!(
                "expected {} sub-indexes, found {}",
                SUB_INDEX_COUNT,
                sub_indexes.len()
            )
            .into());
        }
        for s in &sub_indexes {
            if s.dimensions.len() != DIMENSIONS_PER_SUB_INDEX {
                return Err(format!(
                    "sub-index '{}' has {} dimensions, expected {}",
                    s.name,
                    s.dimensions.len(),
                    DIMENSIONS_PER_SUB_INDEX
                )
                .into());
            }
        }

        Ok(Schema { sub_indexes, dimensions })
    }

    /// Column header for indicator `number` in the observation table.
    pub fn indicator_column(number: usize) -> String {
        format!("Indicator {}", number)
    }

    /// Resolve a feature column name to its place in the hierarchy.
    ///
    /// `None` means the name is not a feature at all; callers treat that as
    /// a contract violation, not missing data.
    pub fn resolve_feature(&self, name: &str) -> Option<FeatureRef> {
        if name == INDEX_NAME {
            return Some(FeatureRef::Index);
        }
        if let Some(pos) = self.sub_indexes.iter().position(|s| s.name == name) {
            return Some(FeatureRef::SubIndex(pos));
        }
        if let Some(pos) = self.dimensions.iter().position(|d| d.name == name) {
            return Some(FeatureRef::Dimension(pos));
        }
        let number = name.strip_prefix("Indicator ")?.trim().parse::<usize>().ok()?;
        if (1..=INDICATOR_COUNT).contains(&number) {
            Some(FeatureRef::Indicator(number))
        } else {
            None
        }
    }

    /// All feature columns in display order: Index, sub-indexes,
    /// dimensions, then the 30 indicator columns.
    pub fn feature_columns(&self) -> Vec<String> {
        let mut cols = Vec::with_capacity(1 + SUB_INDEX_COUNT + DIMENSION_COUNT + INDICATOR_COUNT);
        cols.push(INDEX_NAME.to_string());
        cols.extend(self.sub_indexes.iter().map(|s| s.name.clone()));
        cols.extend(self.dimensions.iter().map(|d| d.name.clone()));
        for n in 1..=INDICATOR_COUNT {
            cols.push(Self::indicator_column(n));
        }
        cols
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::IndicatorMeta;

    /// Synthetic but structurally faithful metadata: 3 sub-indexes, each
    /// with 5 dimensions of 2 indicators.
    pub(crate) fn sample_metadata() -> Vec<IndicatorMeta> {
        let subs = ["Context", "Children", "Women"];
        (1..=INDICATOR_COUNT)
            .map(|n| {
                let dim = (n - 1) / COMPONENTS_PER_DIMENSION;
                IndicatorMeta {
                    number: n,
                    name: format!("Measure {}", n),
                    dimension: format!("Dimension {}", dim + 1),
                    sub_index: subs[dim / DIMENSIONS_PER_SUB_INDEX].to_string(),
                    description: String::new(),
                    unit: "score".to_string(),
                    last_update: None,
                    source_url: String::new(),
                }
            })
            .collect()
    }

    #[test]
    fn builds_hierarchy_from_metadata() {
        let schema = Schema::from_metadata(&sample_metadata()).unwrap();
        assert_eq!(schema.dimensions.len(), DIMENSION_COUNT);
        assert_eq!(schema.sub_indexes.len(), SUB_INDEX_COUNT);
        assert_eq!(schema.dimensions[0].components, [1, 2]);
        assert_eq!(schema.dimensions[14].components, [29, 30]);
        assert_eq!(schema.sub_indexes[0].name, "Context");
        assert_eq!(schema.sub_indexes[2].dimensions, vec![10, 11, 12, 13, 14]);
    }

    #[test]
    fn feature_columns_in_display_order() {
        let schema = Schema::from_metadata(&sample_metadata()).unwrap();
        let cols = schema.feature_columns();
        assert_eq!(cols.len(), 49);
        assert_eq!(cols[0], INDEX_NAME);
        assert_eq!(cols[1], "Context");
        assert_eq!(cols[4], "Dimension 1");
        assert_eq!(cols[19], "Indicator 1");
        assert_eq!(cols[48], "Indicator 30");
    }

    #[test]
    fn resolves_feature_names() {
        let schema = Schema::from_metadata(&sample_metadata()).unwrap();
        assert_eq!(schema.resolve_feature(INDEX_NAME), Some(FeatureRef::Index));
        assert_eq!(schema.resolve_feature("Women"), Some(FeatureRef::SubIndex(2)));
        assert_eq!(schema.resolve_feature("Dimension 4"), Some(FeatureRef::Dimension(3)));
        assert_eq!(schema.resolve_feature("Indicator 30"), Some(FeatureRef::Indicator(30)));
        assert_eq!(schema.resolve_feature("Indicator 31"), None);
        assert_eq!(schema.resolve_feature("Nonsense"), None);
    }

    #[test]
    fn rejects_mismatched_pair() {
        let mut meta = sample_metadata();
        meta[1].dimension = "Somewhere else".to_string();
        assert!(Schema::from_metadata(&meta).is_err());
    }

    #[test]
    fn rejects_wrong_indicator_count() {
        let mut meta = sample_metadata();
        meta.pop();
        assert!(Schema::from_metadata(&meta).is_err());
    }

    #[test]
    fn rejects_duplicate_numbers() {
        let mut meta = sample_metadata();
        meta[0].number = 2;
        assert!(Schema::from_metadata(&meta).is_err());
    }
}
