// Entry point and interactive drill-down menu.
//
// - Option [1] (re)loads every source and rebuilds the snapshot.
// - Options [2]-[5] walk national view → city → team → salesperson.
// - Option [6] asks the evaluation service for a verdict on the selected
//   salesperson; option [7] exports the snapshot summary.
// `--summary <path>` skips the menu entirely.
mod aggregate;
mod config;
mod evaluator;
mod geo;
mod loader;
mod output;
mod selection;
mod snapshot;
mod source;
mod stats;
mod telemetry;
mod types;
mod util;

use anyhow::Context;
use clap::Parser;
use config::AppConfig;
use evaluator::Evaluator;
use geo::GeoTables;
use selection::Selection;
use snapshot::Snapshot;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "morale-dashboard", about = "Sales morale drill-down dashboard")]
struct Cli {
    /// Directory holding the processed CSV exports
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Evaluation service endpoint
    #[arg(long)]
    evaluator_url: Option<String>,
    /// Start with this city selected
    #[arg(long)]
    city: Option<String>,
    /// Start with this team selected (needs --city)
    #[arg(long)]
    team: Option<String>,
    /// Load once, print the national view, write the JSON summary here and exit
    #[arg(long, value_name = "PATH")]
    summary: Option<PathBuf>,
}

// Everything the menu reads from. A reload swaps `snapshot` in one assignment.
struct AppState {
    config: AppConfig,
    http: reqwest::Client,
    evaluator: Evaluator,
    snapshot: Snapshot,
    selection: Selection,
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
/// `None` once stdin is closed.
fn read_choice() -> Option<String> {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    read_trimmed_line(&mut io::stdin().lock())
}

fn read_trimmed_line(input: &mut impl BufRead) -> Option<String> {
    let mut buf = String::new();
    match input.read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Numbered pick list. Accepts either the number or the exact name.
fn pick(label: &str, options: &[String]) -> Option<String> {
    if options.is_empty() {
        println!("No {} available ({}).\n", label, output::NO_DATA);
        return None;
    }
    println!("Select {}:", label);
    for (i, option) in options.iter().enumerate() {
        println!("[{}] {}", i + 1, option);
    }
    let choice = read_choice()?;
    let picked = match choice.parse::<usize>() {
        Ok(n) if (1..=options.len()).contains(&n) => Some(options[n - 1].clone()),
        _ => options.iter().find(|o| **o == choice).cloned(),
    };
    if picked.is_none() {
        println!("Invalid choice.\n");
    }
    picked
}

async fn handle_load(state: &mut AppState) {
    println!("Loading sources...");
    let snapshot = Snapshot::load(&state.config.data, GeoTables::standard(), &state.http).await;
    for report in &snapshot.reports {
        match &report.error {
            Some(err) => println!("  {}: unavailable ({})", report.source, err),
            None if report.is_empty() => println!("  {}: {}", report.source, output::NO_DATA),
            None => println!(
                "  {}: {} rows kept of {} ({} skipped, {} malformed, {} fields coerced)",
                report.source,
                util::format_int(report.kept_rows),
                util::format_int(report.total_rows),
                util::format_int(report.skipped_rows),
                util::format_int(report.malformed_rows),
                util::format_int(report.coerced_fields),
            ),
        }
    }
    if snapshot.boundaries.is_some() {
        println!("  boundary document loaded");
    }
    if snapshot.is_empty() {
        println!("  no data loaded; every view will show {}", output::NO_DATA);
    }
    println!(
        "Loaded {} cities, {} teams, {} salespeople.\n",
        util::format_int(snapshot.cities.len()),
        util::format_int(snapshot.teams.len()),
        util::format_int(snapshot.salespeople.len()),
    );
    state.snapshot = snapshot;
}

fn show_current(state: &AppState) {
    let snapshot = &state.snapshot;
    match &state.selection {
        Selection::NoSelection => output::print_overview(&snapshot.overview(GeoTables::standard())),
        Selection::CitySelected { city } => {
            println!(
                "\n{} composite: {}",
                city,
                util::format_score(snapshot.city_score(city))
            );
            output::print_team_view(&snapshot.team_view(city));
        }
        Selection::TeamSelected { city, team } => {
            output::print_sales_view(&snapshot.sales_view(city, team))
        }
        Selection::SalespersonSelected { city, team, person } => {
            match snapshot.person_view(city, team, person) {
                Some(view) => output::print_person_view(&view),
                None => println!("{} is not a member of {} / {}.\n", person, city, team),
            }
        }
    }
}

fn handle_choose_city(state: &mut AppState) {
    let cities: Vec<String> = state.snapshot.city_team_index().into_keys().collect();
    if let Some(city) = pick("city", &cities) {
        state.selection.select_city(&city);
        show_current(state);
    }
}

fn handle_choose_team(state: &mut AppState) {
    let Some(city) = state.selection.city().map(str::to_string) else {
        println!("Error: {}\n", selection::SelectionError::NoCity);
        return;
    };
    let teams: Vec<String> = state
        .snapshot
        .city_team_index()
        .remove(&city)
        .map(|set| set.into_iter().collect())
        .unwrap_or_default();
    if let Some(team) = pick("team", &teams) {
        match state.selection.select_team(&team) {
            Ok(()) => show_current(state),
            Err(e) => println!("Error: {}\n", e),
        }
    }
}

fn handle_choose_salesperson(state: &mut AppState) {
    let (Some(city), Some(team)) = (state.selection.city(), state.selection.team()) else {
        let err = match state.selection.city() {
            None => selection::SelectionError::NoCity,
            Some(_) => selection::SelectionError::NoTeam,
        };
        println!("Error: {}\n", err);
        return;
    };
    let members: Vec<String> = state
        .snapshot
        .sales_view(city, team)
        .members
        .into_iter()
        .map(|p| p.name)
        .collect();
    if members.is_empty() {
        println!("(no members)\n");
        return;
    }
    if let Some(person) = pick("salesperson", &members) {
        match state.selection.select_salesperson(&person) {
            Ok(()) => show_current(state),
            Err(e) => println!("Error: {}\n", e),
        }
    }
}

async fn handle_evaluate(state: &AppState) {
    let (Some(city), Some(team), Some(person)) = (
        state.selection.city(),
        state.selection.team(),
        state.selection.person(),
    ) else {
        println!("Error: select a salesperson first (option 5).\n");
        return;
    };
    let Some(view) = state.snapshot.person_view(city, team, person) else {
        println!("{} is not a member of {} / {}.\n", person, city, team);
        return;
    };
    println!("Requesting evaluation for {}...", view.person.name);
    let verdict = state.evaluator.evaluate(&view.person).await;
    println!("\n{}\n", verdict);
}

fn export_summary(snapshot: &Snapshot, path: &Path) -> anyhow::Result<()> {
    let overview = snapshot.overview(GeoTables::standard());
    output::write_json(path, &snapshot.summary())
        .map_err(|e| anyhow::anyhow!("writing {}: {e}", path.display()))?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let regions = dir.join("regions.csv");
    output::write_csv(&regions, &output::region_rows(&overview))
        .map_err(|e| anyhow::anyhow!("writing {}: {e}", regions.display()))?;
    let cities = dir.join("cities.csv");
    output::write_csv(&cities, &output::city_rows(&overview))
        .map_err(|e| anyhow::anyhow!("writing {}: {e}", cities.display()))?;

    if let Some(document) = &snapshot.boundaries {
        let boundaries = dir.join("boundaries.json");
        output::write_json(&boundaries, document)
            .map_err(|e| anyhow::anyhow!("writing {}: {e}", boundaries.display()))?;
        println!("Boundary document written to {}", boundaries.display());
    }

    info!(path = %path.display(), "summary exported");
    println!(
        "Summary written to {} (tables in {} and {})\n",
        path.display(),
        regions.display(),
        cities.display()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load().context("loading configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data.data_dir = dir;
    }
    if let Some(url) = cli.evaluator_url {
        config.evaluator.url = url;
    }
    telemetry::init(&config.telemetry).context("initialising logging")?;

    let http = reqwest::Client::builder()
        .build()
        .context("building HTTP client")?;
    let evaluator = Evaluator::new(&config.evaluator).context("building evaluation client")?;

    let mut state = AppState {
        snapshot: Snapshot::empty(GeoTables::standard()),
        selection: Selection::from_seed(cli.city.as_deref(), cli.team.as_deref()),
        config,
        http,
        evaluator,
    };
    handle_load(&mut state).await;

    if let Some(path) = cli.summary {
        output::print_overview(&state.snapshot.overview(GeoTables::standard()));
        return export_summary(&state.snapshot, &path);
    }

    if state.selection != Selection::NoSelection {
        show_current(&state);
    }

    loop {
        println!("Sales Morale Dashboard:");
        println!("[1] Reload data");
        println!("[2] National overview");
        println!("[3] Choose city");
        println!("[4] Choose team");
        println!("[5] Choose salesperson");
        println!("[6] Evaluate salesperson");
        println!("[7] Export summary");
        println!("[0] Exit\n");
        let Some(choice) = read_choice() else {
            println!("\nExiting the program.");
            break;
        };
        match choice.as_str() {
            "1" => handle_load(&mut state).await,
            "2" => {
                state.selection.clear();
                show_current(&state);
            }
            "3" => handle_choose_city(&mut state),
            "4" => handle_choose_team(&mut state),
            "5" => handle_choose_salesperson(&mut state),
            "6" => handle_evaluate(&state).await,
            "7" => {
                if let Err(e) = export_summary(&state.snapshot, Path::new("summary.json")) {
                    eprintln!("Write error: {:#}", e);
                }
            }
            "0" => {
                println!("Exiting the program.");
                break;
            }
            _ => println!("Invalid choice. Please enter 0-7.\n"),
        }
    }
    Ok(())
}
