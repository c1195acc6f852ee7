// Entry point and high-level CLI flow.
//
// - Option [1] reads the sheet exports from the data directory and prints
//   what was found.
// - Option [2] builds the dashboard, writes the exports and prints previews.
// - Option [3] drills into one indicator, for the whole district or one
//   facility, and exports the per-row detail.
// - After a report, the user can go back to the menu or exit.
use kpi_dashboard::config::AppConfig;
use kpi_dashboard::error::AppError;
use kpi_dashboard::loader::{self, SheetData};
use kpi_dashboard::reports::{build_all, dashboard_stats, Dashboard};
use kpi_dashboard::resolver::standard_table;
use kpi_dashboard::types::DashboardStats;
use kpi_dashboard::{output, telemetry, util, views};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};
use tracing::error;

// Sheets are loaded once and reused for every report run.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { data: None }));

struct AppState {
    data: Option<SheetData>,
}

#[derive(Serialize)]
struct DashboardExport<'a> {
    dashboard: &'a Dashboard,
    stats: DashboardStats,
}

fn state() -> MutexGuard<'static, AppState> {
    APP_STATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn loaded_data() -> Option<SheetData> {
    let data = state().data.clone();
    if data.is_none() {
        println!("Error: No data loaded. Please load the data first (option 1).\n");
    }
    data
}

/// Print `label` and read one trimmed line. `None` once stdin is closed.
fn prompt(label: &str) -> Option<String> {
    print!("{label}");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// `true` to return to the menu; a closed stdin counts as `N`.
fn back_to_menu() -> bool {
    while let Some(answer) = prompt("Back to menu (Y/N): ") {
        match answer.to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
    false
}

fn handle_load(config: &AppConfig) {
    match loader::load_sheets(&config.data_dir) {
        Ok((data, report)) => {
            println!(
                "Loaded {} indicators ({} rows) and {} catalog entries.",
                util::format_int(report.indicators),
                util::format_int(report.total_rows),
                util::format_int(report.catalog_entries)
            );
            println!(
                "Directories: {} facilities, {} areas.",
                util::format_int(report.facilities),
                util::format_int(report.areas)
            );
            if report.current_quarter > 0 {
                println!("Current reporting quarter: Q{}", report.current_quarter);
            }
            println!();
            state().data = Some(data);
        }
        Err(e) => {
            error!("load failed: {e}");
            eprintln!("Failed to load data: {}\n", e);
        }
    }
}

/// Writes the summary CSV, the facility matrix CSV and the dashboard JSON,
/// and prints previews of each.
fn handle_generate_reports(config: &AppConfig) -> Result<(), AppError> {
    let Some(data) = loaded_data() else {
        return Ok(());
    };

    let dashboard = build_all(&data.catalog, &data.payload, &config.scope());
    let stats = dashboard_stats(&dashboard.summaries, &[]);
    std::fs::create_dir_all(&config.output_dir)?;

    println!("Generating reports...\n");

    let table = views::indicator_table(&dashboard.summaries);
    let summary_csv = config.output_dir.join("kpi_summary.csv");
    output::write_csv(&summary_csv, &table)?;
    println!("Indicator Summary (scope {})\n", config.scope_prefix);
    println!("{}\n", output::render_preview(&table, config.preview_rows));
    println!("(Full table exported to {})\n", summary_csv.display());

    let keys = views::facility_keys(&dashboard.summaries, &data.facilities);
    let (header, rows) = views::indicator_matrix(
        &dashboard.summaries,
        &keys,
        &data.facilities,
        &data.areas,
    );
    let matrix_csv = config.output_dir.join("kpi_matrix.csv");
    output::write_records(&matrix_csv, &header, &rows)?;
    println!(
        "Facility matrix: {} indicators x {} facilities (exported to {})\n",
        rows.len(),
        keys.len(),
        matrix_csv.display()
    );

    let dashboard_json = config.output_dir.join("dashboard.json");
    let export = DashboardExport {
        dashboard: &dashboard,
        stats,
    };
    output::write_json(&dashboard_json, &export)?;
    println!("Dashboard Stats ({}):", dashboard_json.display());
    println!("{}\n", output::render_preview(&[stats], 1));
    println!("Last updated: {}\n", dashboard.last_updated);
    Ok(())
}

/// Drill into one indicator: pick it by its `#` in the summary table, then a
/// facility code (blank for the whole district).
fn handle_detail(config: &AppConfig) -> Result<(), AppError> {
    let Some(data) = loaded_data() else {
        return Ok(());
    };
    let dashboard = build_all(&data.catalog, &data.payload, &config.scope());
    println!(
        "{}\n",
        output::render_preview(&views::indicator_table(&dashboard.summaries), usize::MAX)
    );

    let Some(choice) = prompt("Indicator #: ") else {
        return Ok(());
    };
    let summary = choice
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|idx| dashboard.summaries.get(idx));
    let Some(summary) = summary else {
        println!("Invalid indicator number.\n");
        return Ok(());
    };
    let key = prompt("Facility code (blank for all): ").unwrap_or_default();

    let (heading, rows) = if key.is_empty() {
        ("District total".to_string(), views::rows_for_keys(summary, &[]))
    } else {
        (
            views::facility_name(&data.facilities, &key),
            views::rows_for_key(summary, &key),
        )
    };
    let table = standard_table();
    let detail = views::detail_rows(summary, &rows, &data.areas, table);
    let footer = views::detail_footer(summary, &rows, table);

    std::fs::create_dir_all(&config.output_dir)?;
    let detail_csv = config.output_dir.join("kpi_detail.csv");
    output::write_csv(&detail_csv, &detail)?;

    println!("\n{heading}: {} ({})", summary.title, views::threshold_text(summary));
    println!("Data as of: {}\n", footer.last_updated);
    println!("{}\n", output::render_preview(&detail, config.preview_rows));
    println!(
        "Total villages: {} | Sum target: {} | Sum result: {}",
        util::format_int(footer.villages),
        util::format_count(footer.total_target),
        util::format_count(footer.total_result)
    );
    println!("(Full detail exported to {})\n", detail_csv.display());
    Ok(())
}

fn run() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    loop {
        println!("KPI Dashboard");
        println!("[1] Load data");
        println!("[2] Generate reports");
        println!("[3] Indicator detail\n");
        let Some(choice) = prompt("Enter choice: ") else {
            return Ok(());
        };
        let outcome = match choice.as_str() {
            "1" => {
                handle_load(&config);
                continue;
            }
            "2" => {
                println!();
                handle_generate_reports(&config)
            }
            "3" => {
                println!();
                handle_detail(&config)
            }
            _ => {
                println!("Invalid choice. Please enter 1, 2 or 3.\n");
                continue;
            }
        };
        if let Err(e) = outcome {
            error!("report failed: {e}");
            eprintln!("Write error: {}", e);
        }
        if !back_to_menu() {
            println!("Exiting the program.");
            return Ok(());
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}
