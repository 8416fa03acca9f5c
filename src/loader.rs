// Dataset loading: the two CSV tables plus the geometry file, read once at
// startup into an immutable `Dataset`.
//
// The observation table is wide (territory, area, code, year followed by
// ~50 score columns), so it is read through a header-index map resolved
// against the schema instead of a serde struct. A schema column missing
// from the header is a structural error and fails the load; a cell that
// does not parse or is outside [0,100] is a data problem, counted and
// carried as missing.
use crate::geo::{self, Centroid, GeometryTable};
use crate::schema::{Schema, INDICATOR_COUNT};
use crate::types::{IndicatorMeta, Observation, RawMetaRow};
use crate::util::{parse_date_safe, parse_f64_safe, parse_i32_safe};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::error::Error;

pub const WORLD: &str = "World";

const POPULATION_COLUMN: &str = "Population, total";
const GDP_COLUMN: &str = "GDP per capita";

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub parse_errors: usize,
    /// Score cells dropped for being unparsable or outside [0,100].
    pub invalid_cells: usize,
}

/// The immutable in-memory tables every computation reads from.
///
/// Built once by [`Dataset::load`]; nothing mutates it afterwards, which is
/// what makes every derived computation safe to rerun at will.
#[derive(Debug)]
pub struct Dataset {
    pub observations: Vec<Observation>,
    pub metadata: Vec<IndicatorMeta>,
    pub schema: Schema,
    /// Map centers: one per territory code, one per area name, one for World.
    pub centroids: HashMap<String, Centroid>,
}

impl Dataset {
    pub fn load(
        observations_path: &str,
        metadata_path: &str,
        geometry_path: &str,
    ) -> Result<(Dataset, LoadReport), Box<dyn Error>> {
        let metadata = load_metadata(metadata_path)?;
        let schema = Schema::from_metadata(&metadata)?;
        let (observations, report) = load_observations(observations_path, &schema)?;
        let geometries = geo::parse_geometries(&std::fs::read_to_string(geometry_path)?)?;
        let centroids = build_centroids(&observations, &geometries);
        Ok((Dataset { observations, metadata, schema, centroids }, report))
    }

    pub fn observation(&self, territory: &str, year: i32) -> Option<&Observation> {
        self.observations
            .iter()
            .find(|o| o.territory == territory && o.year == year)
    }

    /// Distinct observation years, ascending.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.observations.iter().map(|o| o.year).collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    /// Country rows for one year; aggregate rows (World, areas) have no
    /// parent area and are excluded.
    pub fn countries(&self, year: i32) -> Vec<&Observation> {
        self.observations
            .iter()
            .filter(|o| o.year == year && o.area.is_some())
            .collect()
    }

    /// Parent area of a territory, if it has one.
    pub fn area_of(&self, territory: &str) -> Option<String> {
        self.observations
            .iter()
            .find(|o| o.territory == territory)
            .and_then(|o| o.area.clone())
    }

    pub fn is_known_territory(&self, territory: &str) -> bool {
        self.observations.iter().any(|o| o.territory == territory)
    }

    /// Map center for a territory: areas and World are keyed by name,
    /// countries by their geographic code.
    pub fn map_center(&self, territory: &str) -> Option<Centroid> {
        if let Some(c) = self.centroids.get(territory) {
            return Some(*c);
        }
        let code = self
            .observations
            .iter()
            .find(|o| o.territory == territory)
            .and_then(|o| o.code.as_deref())?;
        self.centroids.get(code).copied()
    }
}

pub fn load_metadata(path: &str) -> Result<Vec<IndicatorMeta>, Box<dyn Error>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut metas = Vec::with_capacity(INDICATOR_COUNT);
    for result in rdr.deserialize::<RawMetaRow>() {
        let row = result?;
        let number = row
            .number
            .as_deref()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .ok_or("metadata row with a missing or non-numeric indicator number")?;
        metas.push(IndicatorMeta {
            number,
            name: row.name.unwrap_or_default().trim().to_string(),
            dimension: row.dimension.unwrap_or_default().trim().to_string(),
            sub_index: row.sub_index.unwrap_or_default().trim().to_string(),
            description: row.description.unwrap_or_default().trim().to_string(),
            unit: row.unit.unwrap_or_default().trim().to_string(),
            last_update: parse_date_safe(row.last_update.as_deref()),
            source_url: row.source_url.unwrap_or_default().trim().to_string(),
        });
    }
    Ok(metas)
}

/// Header-index map for the wide observation table. Every schema feature
/// column must be present.
struct ColumnMap {
    territory: usize,
    area: usize,
    code: usize,
    year: usize,
    features: Vec<usize>,
    population: Option<usize>,
    gdp_per_capita: Option<usize>,
}

impl ColumnMap {
    fn resolve(headers: &csv::StringRecord, schema: &Schema) -> Result<ColumnMap, Box<dyn Error>> {
        let index_of = |name: &str| headers.iter().position(|h| h.trim() == name);
        let require = |name: &str| {
            index_of(name).ok_or_else(|| format!("observation table is missing column '{}'", name))
        };
        let mut features = Vec::new();
        for name in schema.feature_columns() {
            features.push(require(&name)?);
        }
        Ok(ColumnMap {
            territory: require("territory")?,
            area: require("area")?,
            code: require("code")?,
            year: require("year")?,
            features,
            population: index_of(POPULATION_COLUMN),
            gdp_per_capita: index_of(GDP_COLUMN),
        })
    }
}

fn optional_text(record: &csv::StringRecord, idx: usize) -> Option<String> {
    let s = record.get(idx)?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

pub fn load_observations(
    path: &str,
    schema: &Schema,
) -> Result<(Vec<Observation>, LoadReport), Box<dyn Error>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let columns = ColumnMap::resolve(rdr.headers()?, schema)?;
    let feature_count = columns.features.len();
    let sub_index_count = schema.sub_indexes.len();
    let dimension_count = schema.dimensions.len();

    let mut total_rows = 0usize;
    let mut parse_errors = 0usize;
    let mut invalid_cells = 0usize;
    let mut observations = Vec::new();

    for result in rdr.records() {
        total_rows += 1;
        let record = match result {
            Ok(r) => r,
            Err(_) => {
                parse_errors += 1;
                continue;
            }
        };

        let Some(territory) = optional_text(&record, columns.territory) else {
            parse_errors += 1;
            continue;
        };
        let Some(year) = parse_i32_safe(record.get(columns.year)) else {
            parse_errors += 1;
            continue;
        };
        let area = optional_text(&record, columns.area);
        let code = optional_text(&record, columns.code);

        // Scores stay missing when unparsable or out of the 0-100 range;
        // the row itself is kept.
        let mut score_cell = |idx: usize| match parse_f64_safe(record.get(idx)) {
            Some(v) if (0.0..=100.0).contains(&v) => Some(v),
            Some(_) => {
                invalid_cells += 1;
                None
            }
            None => {
                if record.get(idx).map(|s| !s.trim().is_empty()).unwrap_or(false) {
                    invalid_cells += 1;
                }
                None
            }
        };

        // Feature order mirrors `Schema::feature_columns`: index first,
        // then sub-indexes, dimensions and indicators.
        let scores: Vec<Option<f64>> = columns.features.iter().map(|&i| score_cell(i)).collect();
        debug_assert_eq!(scores.len(), feature_count);
        let index = scores[0];
        let sub_indexes = scores[1..1 + sub_index_count].to_vec();
        let dimensions = scores[1 + sub_index_count..1 + sub_index_count + dimension_count].to_vec();
        let indicators = scores[1 + sub_index_count + dimension_count..].to_vec();

        observations.push(Observation {
            territory,
            area,
            code,
            year,
            index,
            sub_indexes,
            dimensions,
            indicators,
            population: columns
                .population
                .and_then(|i| parse_f64_safe(record.get(i))),
            gdp_per_capita: columns
                .gdp_per_capita
                .and_then(|i| parse_f64_safe(record.get(i))),
        });
    }

    let report = LoadReport {
        total_rows,
        loaded_rows: observations.len(),
        parse_errors,
        invalid_cells,
    };
    Ok((observations, report))
}

/// One map center per territory code, plus the union centroid of each
/// area's member codes and of the whole world.
fn build_centroids(
    observations: &[Observation],
    geometries: &GeometryTable,
) -> HashMap<String, Centroid> {
    let mut members: HashMap<String, Vec<String>> = HashMap::new();
    let mut world_codes: Vec<String> = Vec::new();
    for obs in observations {
        let (Some(area), Some(code)) = (&obs.area, &obs.code) else {
            continue;
        };
        let codes = members.entry(area.clone()).or_default();
        if !codes.contains(code) {
            codes.push(code.clone());
        }
        if !world_codes.contains(code) {
            world_codes.push(code.clone());
        }
    }

    let mut centroids = HashMap::new();
    for code in &world_codes {
        if let Some(c) = geo::territory_centroid(code, geometries) {
            centroids.insert(code.clone(), c);
        }
    }
    for (area, codes) in &members {
        if let Some(c) = geo::area_centroid(codes, geometries) {
            centroids.insert(area.clone(), c);
        }
    }
    if let Some(c) = geo::area_centroid(&world_codes, geometries) {
        centroids.insert(WORLD.to_string(), c);
    }
    centroids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tests::sample_metadata;
    use std::io::Write;

    fn schema() -> Schema {
        Schema::from_metadata(&sample_metadata()).unwrap()
    }

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("cfa_index_test_{}_{}", std::process::id(), name));
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn observation_csv(schema: &Schema) -> String {
        let mut header = vec![
            "territory".to_string(),
            "area".to_string(),
            "code".to_string(),
            "year".to_string(),
        ];
        header.extend(schema.feature_columns());
        header.push(format!("\"{}\"", POPULATION_COLUMN));
        header.push(GDP_COLUMN.to_string());

        // 49 feature cells: index, 3 sub-indexes, 15 dimensions, 30
        // indicators, all 50.0, then population and GDP.
        let scores = vec!["50.0"; 49].join(",");
        let mut csv = header.join(",") + "\n";
        csv += &format!("\"Testland\",\"North\",TST,2023,{},82300000,12500\n", scores);
        // Out-of-range index cell and an unparsable indicator cell.
        let mut bad_scores: Vec<&str> = vec!["50.0"; 49];
        bad_scores[0] = "120.5";
        bad_scores[19] = "n/a";
        csv += &format!("\"Otherland\",\"North\",OTH,2023,{},,\n", bad_scores.join(","));
        // Area aggregate row: no parent area.
        csv += &format!("\"North\",,,2023,{},,\n", scores);
        // Unusable row: no year.
        csv += &format!("\"Nowhere\",\"North\",NWH,,{},,\n", scores);
        csv
    }

    #[test]
    fn loads_wide_observation_table() {
        let schema = schema();
        let path = write_temp("obs.csv", &observation_csv(&schema));
        let (obs, report) = load_observations(path.to_str().unwrap(), &schema).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(report.total_rows, 4);
        assert_eq!(report.loaded_rows, 3);
        assert_eq!(report.parse_errors, 1);
        assert_eq!(report.invalid_cells, 2);

        let test = &obs[0];
        assert_eq!(test.territory, "Testland");
        assert_eq!(test.area.as_deref(), Some("North"));
        assert_eq!(test.year, 2023);
        assert_eq!(test.index, Some(50.0));
        assert_eq!(test.sub_indexes.len(), 3);
        assert_eq!(test.dimensions.len(), 15);
        assert_eq!(test.indicators.len(), 30);
        assert_eq!(test.population, Some(82_300_000.0));

        let other = &obs[1];
        assert_eq!(other.index, None);
        assert_eq!(other.indicators[0], None);
        assert_eq!(other.indicators[1], Some(50.0));

        let north = &obs[2];
        assert_eq!(north.area, None);
        assert_eq!(north.code, None);
    }

    #[test]
    fn missing_schema_column_is_a_hard_error() {
        let schema = schema();
        let csv = "territory,area,code,year,CFA Index\nX,Y,XXX,2023,50\n";
        let path = write_temp("short.csv", csv);
        let result = load_observations(path.to_str().unwrap(), &schema);
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }

    #[test]
    fn loads_metadata_table() {
        let csv = "number,name,dimension,sub_index,description,unit,last_update,source_url\n\
                   1,Water access,Environment,Context,Share of population,%,2023-05-01,https://example.org\n";
        let path = write_temp("meta.csv", csv);
        let metas = load_metadata(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(metas.len(), 1);
        assert_eq!(metas[0].number, 1);
        assert_eq!(metas[0].dimension, "Environment");
        assert!(metas[0].last_update.is_some());
    }

    #[test]
    fn metadata_without_number_fails() {
        let csv = "number,name,dimension,sub_index,description,unit,last_update,source_url\n\
                   ,Nameless,Environment,Context,,,,\n";
        let path = write_temp("meta_bad.csv", csv);
        let result = load_metadata(path.to_str().unwrap());
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }

    #[test]
    fn centroids_cover_codes_areas_and_world() {
        let schema = schema();
        let path = write_temp("obs_geo.csv", &observation_csv(&schema));
        let (obs, _) = load_observations(path.to_str().unwrap(), &schema).unwrap();
        std::fs::remove_file(&path).ok();

        let geo_json = r#"{
            "TST": [[[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]]],
            "OTH": [[[10.0, 0.0], [12.0, 0.0], [12.0, 2.0], [10.0, 2.0]]]
        }"#;
        let geometries = geo::parse_geometries(geo_json).unwrap();
        let centroids = build_centroids(&obs, &geometries);

        assert!((centroids["TST"].lon - 1.0).abs() < 1e-12);
        // Equal-area members: the union centroid is halfway between.
        assert!((centroids["North"].lon - 6.0).abs() < 1e-12);
        assert_eq!(centroids["North"], centroids[WORLD]);

        let dataset = Dataset {
            observations: obs,
            metadata: sample_metadata(),
            schema: self::schema(),
            centroids,
        };
        // Countries resolve through their code, aggregates by name.
        assert!((dataset.map_center("Testland").unwrap().lon - 1.0).abs() < 1e-12);
        assert!((dataset.map_center("North").unwrap().lon - 6.0).abs() < 1e-12);
        assert!(dataset.map_center(WORLD).is_some());
        assert_eq!(dataset.map_center("Atlantis"), None);
    }
}
