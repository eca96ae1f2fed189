// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use std::env;
use std::path::PathBuf;

use ledger_insights::{
    get_report_runs, import_dataset, load_dataset, load_dataset_from_dir, record_report_run,
    setup_database, verify_count, InsightsConfig, ReportKind, TransactionFlow,
};

const USAGE: &str = "\
Usage:
  ledger-insights                         browse every report (TUI)
  ledger-insights import [data_dir]       load CSV files into SQLite
  ledger-insights report <slug|all> [--json]
  ledger-insights flow <transaction_id>   follow money from a transaction
  ledger-insights runs                    recent report runs
  ledger-insights list                    available report slugs";

fn main() -> Result<()> {
    let config = InsightsConfig::from_env();
    config.init_logging();

    let args: Vec<String> = env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        None => run_ui_mode(&config)?,
        Some("import") => run_import(&config, args.get(1).map(PathBuf::from))?,
        Some("report") => {
            let Some(target) = args.get(1) else {
                bail!("Missing report slug\n\n{}", USAGE);
            };
            let json = args.iter().any(|a| a == "--json");
            run_report(&config, target, json)?;
        }
        Some("flow") => {
            let id: i64 = args
                .get(1)
                .context("Missing transaction id")?
                .parse()
                .context("Transaction id must be an integer")?;
            run_flow(&config, id)?;
        }
        Some("runs") => run_history(&config)?,
        Some("list") => {
            for kind in ReportKind::ALL {
                println!("{:<30} {}", kind.slug(), kind.title());
            }
        }
        Some("help") | Some("--help") | Some("-h") => println!("{}", USAGE),
        Some(other) => bail!("Unknown command '{}'\n\n{}", other, USAGE),
    }

    Ok(())
}

fn open_database(config: &InsightsConfig) -> Result<Connection> {
    let conn = Connection::open(&config.db_path)
        .with_context(|| format!("Failed to open {}", config.db_path.display()))?;
    setup_database(&conn)?;
    Ok(conn)
}

fn run_import(config: &InsightsConfig, data_dir: Option<PathBuf>) -> Result<()> {
    let data_dir = data_dir.unwrap_or_else(|| config.data_dir.clone());

    println!("🗄️  Import - CSV → SQLite + WAL");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("\n📂 Loading CSV files from {}...", data_dir.display());
    let dataset = load_dataset_from_dir(&data_dir)?;

    // Fail before writing anything if a foreign key points nowhere
    dataset.transaction_rows()?;

    println!("\n🔧 Setting up database {}...", config.db_path.display());
    let conn = open_database(config)?;

    println!("\n💾 Inserting records...");
    let summary = import_dataset(&conn, &dataset)?;

    println!("\n🔍 Verifying database...");
    for table in ["customers", "accounts", "transactions", "transaction_flows"] {
        println!("✓ {:<18} {}", table, verify_count(&conn, table)?);
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Inserted {} new records", summary.total());

    Ok(())
}

fn run_report(config: &InsightsConfig, target: &str, json: bool) -> Result<()> {
    let kinds: Vec<ReportKind> = if target == "all" {
        ReportKind::ALL.to_vec()
    } else {
        match ReportKind::from_slug(target) {
            Some(kind) => vec![kind],
            None => bail!("Unknown report '{}' (try `ledger-insights list`)", target),
        }
    };

    let conn = open_database(config)?;
    let dataset = load_dataset(&conn)?;

    let mut tables = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let table = kind
            .run(&dataset, &config.report)
            .with_context(|| format!("Report {} failed", kind.slug()))?;
        record_report_run(&conn, &table)?;
        tables.push(table);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&tables)?);
    } else {
        for table in &tables {
            println!("{}", table.render());
        }
    }

    Ok(())
}

fn run_flow(config: &InsightsConfig, start: i64) -> Result<()> {
    let conn = open_database(config)?;
    let dataset = load_dataset(&conn)?;
    let flow = TransactionFlow::new(&dataset.flows);

    println!("🔀 Money flow from transaction #{} ({} edges)", start, flow.edge_count());
    for step in flow.reachable_from(start) {
        let detail = dataset
            .transaction(step.transaction_id)
            .map(|t| {
                format!(
                    "{} {} {}",
                    t.transaction_date,
                    t.transaction_type,
                    t.amount.map_or("-".to_string(), |a| format!("{:.2}", a))
                )
            })
            .unwrap_or_else(|| "(not in dataset)".to_string());

        println!(
            "{}#{}  {}",
            "  ".repeat(step.depth),
            step.transaction_id,
            detail
        );
    }

    Ok(())
}

fn run_history(config: &InsightsConfig) -> Result<()> {
    let conn = open_database(config)?;

    for run in get_report_runs(&conn, 50)? {
        println!(
            "{}  {:<28} {:>6} rows  {}  {}",
            run.generated_at.format("%Y-%m-%d %H:%M:%S"),
            run.slug,
            run.row_count,
            &run.fingerprint[..12.min(run.fingerprint.len())],
            run.run_id
        );
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &InsightsConfig) -> Result<()> {
    if !config.db_path.exists() {
        eprintln!("❌ Database not found: {}", config.db_path.display());
        eprintln!("   Run: ledger-insights import <data_dir>");
        std::process::exit(1);
    }

    let conn = open_database(config)?;
    let dataset = load_dataset(&conn)?;

    let pages = ReportKind::ALL
        .into_iter()
        .map(|kind| {
            let outcome = kind.run(&dataset, &config.report);
            if let Err(err) = &outcome {
                log::warn!("Report {} failed: {}", kind.slug(), err);
            }
            ui::ReportPage { kind, outcome }
        })
        .collect();

    let mut app = ui::App::new(pages, dataset.transactions.len());
    ui::run_ui(&mut app)?;

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &InsightsConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use: ledger-insights report all");
    std::process::exit(1);
}
