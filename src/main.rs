use clap::{CommandFactory, Parser, ValueEnum};
use std::path::{Path, PathBuf};

mod batch;
mod domain;
mod inventory;
mod provider;
mod report;
mod snapshot;
mod transport;

use batch::{BatchOptions, BatchRunner};
use inventory::InventoryTable;
use provider::{ClientConfig, ProviderClient, ProviderSpec};

#[derive(Parser)]
#[command(
    name = "lot_audit",
    version,
    about = "Check a dealer inventory CSV against live AutoTrader and Carsguide listings"
)]
struct Cli {
    /// Path to input CSV file with vehicle data
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Stock number to search for (single vehicle)
    #[arg(long)]
    stock_no: Option<String>,

    /// Which API to use for single vehicle search
    #[arg(long, value_enum, default_value = "both")]
    api: ApiChoice,

    /// Vehicle make (helps with Carsguide search accuracy)
    #[arg(long)]
    make: Option<String>,

    /// Save raw API responses to file
    #[arg(long)]
    save: bool,

    /// Output file name (default: processed_cars_<timestamp>.csv)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Dealer ID to use for searches
    #[arg(long, default_value = "12751")]
    dealer_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ApiChoice {
    Autotrader,
    Carsguide,
    Both,
}

fn main() {
    let cli = Cli::parse();

    if let Some(csv_path) = cli.csv.clone() {
        run_batch(&cli, &csv_path);
    } else if let Some(stock_no) = cli.stock_no.clone() {
        run_single(&cli, &stock_no);
    } else {
        // Nothing actionable: show usage and return.
        let _ = Cli::command().print_help();
        println!();
    }
}

fn run_batch(cli: &Cli, csv_path: &Path) {
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("processed_cars_{}.csv", snapshot::timestamp())));

    println!("Processing CSV file: {}", csv_path.display());
    println!("Searching both AutoTrader and Carsguide for all vehicles...");

    let mut table = match InventoryTable::load(csv_path) {
        Ok(table) => table,
        Err(e) => {
            eprintln!("error: could not load {}: {e}", csv_path.display());
            std::process::exit(1);
        }
    };
    println!("Loaded {} rows", table.len());

    let runner = match BatchRunner::new(BatchOptions {
        dealer_id: cli.dealer_id.clone(),
        save_raw: cli.save,
        verbose: cli.verbose,
    }) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("error: could not initialise provider clients: {e}");
            std::process::exit(1);
        }
    };

    let records = table.records();
    let results = runner.run(&records);
    table.apply_results(&results);

    if let Err(e) = table.save(&output) {
        eprintln!("error: could not save results: {e}");
        std::process::exit(1);
    }

    println!("\nResults saved to {}", output.display());
    println!("{}", report::batch_summary(&results));
}

fn run_single(cli: &Cli, stock_no: &str) {
    let config = ClientConfig {
        verbose: cli.verbose,
        ..ClientConfig::default()
    };

    if matches!(cli.api, ApiChoice::Autotrader | ApiChoice::Both) {
        search_one(ProviderSpec::autotrader(), config.clone(), cli, stock_no, None);
    }
    if matches!(cli.api, ApiChoice::Carsguide | ApiChoice::Both) {
        search_one(
            ProviderSpec::carsguide(),
            config,
            cli,
            stock_no,
            cli.make.as_deref(),
        );
    }
}

fn search_one(
    spec: ProviderSpec,
    config: ClientConfig,
    cli: &Cli,
    stock_no: &str,
    make: Option<&str>,
) {
    let name = spec.name;
    println!("\n{}", "=".repeat(60));
    println!("SEARCHING {}", name.to_uppercase());
    println!("{}", "=".repeat(60));

    let client = match ProviderClient::new(spec, config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("error: could not initialise {name} client: {e}");
            return;
        }
    };

    match client.lookup(stock_no, &cli.dealer_id, make, None) {
        Ok(outcome) if !outcome.is_empty() => {
            if cli.save {
                let filename = format!(
                    "{}_data_{}_{}.json",
                    name.to_lowercase(),
                    stock_no,
                    snapshot::timestamp(),
                );
                snapshot::save_json(&outcome.raw, Some(&filename));
            }
            if let Some(listing) = outcome.first() {
                println!("{}", report::vehicle_details(listing));
            }
        }
        Ok(_) => println!("No vehicle found in {name} or API error occurred"),
        Err(e) => {
            eprintln!("warning: {name} lookup failed: {e}");
            println!("No vehicle found in {name} or API error occurred");
        }
    }
}
