//! Goal Planner CLI
//!
//! Runs a first-run plan calculation for one request file and prints the
//! response as JSON

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use goal_planner::catalog::load_catalog;
use goal_planner::client::load_request;
use goal_planner::settings::load_settings;
use goal_planner::{InMemoryCatalog, Planner, Services, StaticSettings, UnavailableLifeQuotes};

#[derive(Parser, Debug)]
#[command(name = "goal_planner", about = "Calculate a goal-based financial plan")]
struct Args {
    /// Request JSON file
    #[arg(short, long)]
    request: PathBuf,

    /// Directory with settings and catalog CSV files (built-in defaults when omitted)
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Pretty-print the response
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let (settings, catalog) = match &args.data {
        Some(dir) => (
            load_settings(dir).with_context(|| format!("loading settings from {}", dir.display()))?,
            load_catalog(dir).with_context(|| format!("loading catalog from {}", dir.display()))?,
        ),
        None => (StaticSettings::defaults(), InMemoryCatalog::default_catalog()),
    };

    let request = load_request(&args.request)
        .with_context(|| format!("reading request {}", args.request.display()))?;

    let services = Services {
        products: &catalog,
        portfolios: &catalog,
        life_quotes: &UnavailableLifeQuotes,
    };
    let response = Planner::new(&settings, services).calculate_first_run(&request)?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{}", json);
    Ok(())
}
