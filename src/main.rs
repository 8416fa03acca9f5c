// Entry point and high-level CLI flow.
//
// The dataset is loaded once into in-memory read-only state; every report
// is an independent recomputation over it:
// - Option [1] loads the observation, metadata and geometry files,
//   printing diagnostics.
// - Option [2] recomputes the score hierarchy bottom-up and writes a JSON
//   report of any disagreement with the stored aggregates.
// - Option [3] builds a territory scorecard (summary, component table).
// - Option [4] builds a ranking table for a feature and year.
mod aggregate;
mod geo;
mod loader;
mod metrics;
mod output;
mod reports;
mod schema;
mod types;
mod util;

use loader::{Dataset, WORLD};
use once_cell::sync::Lazy;
use schema::INDEX_NAME;
use std::io::{self, Write};
use std::sync::Mutex;

static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { data: None }));

struct AppState {
    data: Option<std::sync::Arc<Dataset>>,
}

const OBSERVATIONS_FILE: &str = "cfa_observations.csv";
const METADATA_FILE: &str = "indicator_metadata.csv";
const GEOMETRY_FILE: &str = "territory_geometry.json";

/// Read a single line of input after printing a prompt.
fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn read_choice() -> String {
    read_line("Enter choice: ")
}

/// Ask the user whether to go back to the selection menu after a report.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        let resp = read_line("Back to Selection (Y/N): ").to_uppercase();
        match resp.as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// The loaded dataset, or `None` with a console hint when nothing is
/// loaded yet.
fn current_dataset() -> Option<std::sync::Arc<Dataset>> {
    let state = APP_STATE.lock().unwrap();
    if state.data.is_none() {
        println!("Error: No data loaded. Please load the dataset first (option 1).\n");
    }
    state.data.clone()
}

/// Handle option [1]: load the three input files.
fn handle_load() {
    match Dataset::load(OBSERVATIONS_FILE, METADATA_FILE, GEOMETRY_FILE) {
        Ok((dataset, report)) => {
            println!(
                "Processing dataset... ({} rows read, {} territory-year rows loaded)",
                util::format_int(report.total_rows as i64),
                util::format_int(report.loaded_rows as i64)
            );
            println!(
                "Note: {} rows skipped, {} score cells dropped as unparsable or out of [0,100].",
                util::format_int(report.parse_errors as i64),
                util::format_int(report.invalid_cells as i64)
            );
            println!(
                "Info: {} indicators across {} dimensions and {} sub-indexes; {} map centers.\n",
                dataset.metadata.len(),
                dataset.schema.dimensions.len(),
                dataset.schema.sub_indexes.len(),
                util::format_int(dataset.centroids.len() as i64)
            );
            let mut state = APP_STATE.lock().unwrap();
            state.data = Some(std::sync::Arc::new(dataset));
        }
        Err(e) => {
            eprintln!("Failed to load dataset: {}\n", e);
        }
    }
}

/// Handle option [2]: recompute the hierarchy and report mismatches.
fn handle_validate() {
    let Some(dataset) = current_dataset() else {
        return;
    };
    println!("Validating aggregation (tolerance {:e})...", aggregate::VALIDATION_TOLERANCE);
    let report = aggregate::validate_dataset(&dataset.observations, &dataset.schema);
    println!(
        "{} rows checked, {} clean, {} mismatches.",
        util::format_int(report.rows_checked as i64),
        util::format_int(report.rows_clean as i64),
        util::format_int(report.mismatches.len() as i64)
    );
    for m in report.mismatches.iter().take(5) {
        println!(
            "  {:?} '{}' for {} {}: stored {} vs recomputed {}",
            m.level,
            m.name,
            m.territory,
            m.year,
            util::sig_format(m.stored),
            util::sig_format(m.recomputed)
        );
    }
    let file = "validation_report.json";
    if let Err(e) = output::write_json(file, &report) {
        eprintln!("Write error: {}", e);
    }
    println!("(Full report exported to {})\n", file);
}

/// Handle option [3]: scorecard for a territory and year.
fn handle_scorecard() {
    let Some(dataset) = current_dataset() else {
        return;
    };
    let territory = {
        let t = read_line("Territory (empty for World): ");
        if t.is_empty() {
            WORLD.to_string()
        } else {
            t
        }
    };
    let year = prompt_year(&dataset);

    let summary = match reports::scorecard_summary(&dataset, &territory, year) {
        Ok(s) => s,
        Err(e) => {
            println!("Error: {}\n", e);
            return;
        }
    };
    println!("\nScorecard: {} ({})", summary.territory, summary.year);
    println!("  Area:           {}", summary.area);
    println!("  Population:     {}", summary.population);
    println!("  GDP per capita: {}", summary.gdp_per_capita);
    println!("  {}:      {}", INDEX_NAME, summary.score);
    println!("  Rank:           {}", summary.rank);
    println!("  Tier:           {}", summary.tier);
    match dataset.map_center(&territory) {
        Some(c) => println!("  Map center:     {:.2}, {:.2}\n", c.lat, c.lon),
        None => println!("  Map center:     {}\n", util::MISSING_LABEL),
    }
    if let Err(e) = output::write_json("scorecard_summary.json", &summary) {
        eprintln!("Write error: {}", e);
    }

    match reports::scorecard_table(&dataset, &territory, year) {
        Ok(rows) => {
            output::preview_report("Components:", &rows, 4);
            let file = "scorecard_components.csv";
            if let Err(e) = output::write_csv(file, &rows) {
                eprintln!("Write error: {}", e);
            }
            println!("(Full table exported to {})\n", file);
        }
        Err(e) => println!("Error: {}\n", e),
    }

    match reports::evolution_table(&dataset, &territory) {
        Ok(rows) => {
            let title = format!("{} evolution (territory, area, World):", INDEX_NAME);
            output::preview_report(&title, &rows, 6);
        }
        Err(e) => println!("Error: {}\n", e),
    }
}

/// Handle option [4]: ranking for a feature and year.
fn handle_ranking() {
    let Some(dataset) = current_dataset() else {
        return;
    };
    let feature = {
        let f = read_line(&format!("Feature (empty for {}): ", INDEX_NAME));
        if f.is_empty() {
            INDEX_NAME.to_string()
        } else {
            f
        }
    };
    let year = prompt_year(&dataset);

    match reports::ranking_table(&dataset, &feature, year) {
        Ok(rows) => {
            let title = format!("\nRanking: {} ({})", feature, year);
            output::preview_report(&title, &rows, 10);
            let file = "ranking.csv";
            if let Err(e) = output::write_csv(file, &rows) {
                eprintln!("Write error: {}", e);
            }
            println!("(Full table exported to {})\n", file);
        }
        Err(e) => println!("Error: {}\n", e),
    }
}

fn prompt_year(dataset: &Dataset) -> i32 {
    let years = dataset.years();
    let latest = years.last().copied().unwrap_or(0);
    let input = read_line(&format!("Year (empty for {}): ", latest));
    match util::parse_i32_safe(Some(&input)) {
        Some(y) => y,
        None => latest,
    }
}

fn main() {
    loop {
        println!("Select:");
        println!("[1] Load the dataset");
        println!("[2] Validate aggregation");
        println!("[3] Territory scorecard");
        println!("[4] Ranking\n");
        match read_choice().as_str() {
            "1" => {
                handle_load();
            }
            "2" => {
                println!("");
                handle_validate();
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "3" => {
                println!("");
                handle_scorecard();
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "4" => {
                println!("");
                handle_ranking();
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter a number between 1 and 4.\n");
            }
        }
    }
}
