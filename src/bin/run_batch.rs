//! Run every request in a directory in parallel
//!
//! Each `<name>.json` gets a `<name>.response.json` next to it. Requests are
//! independent runs; failures are reported and do not stop the batch.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use rayon::prelude::*;

use goal_planner::catalog::load_catalog;
use goal_planner::client::load_request;
use goal_planner::settings::load_settings;
use goal_planner::{InMemoryCatalog, Planner, Services, StaticSettings, UnavailableLifeQuotes};

const RESPONSE_SUFFIX: &str = ".response.json";

#[derive(Parser, Debug)]
#[command(name = "run_batch", about = "Calculate every plan request in a directory")]
struct Args {
    /// Directory of request JSON files
    dir: PathBuf,

    /// Directory with settings and catalog CSV files
    #[arg(short, long)]
    data: Option<PathBuf>,
}

fn request_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if name.ends_with(".json") && !name.ends_with(RESPONSE_SUFFIX) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn response_path(request: &Path) -> PathBuf {
    let stem = request.file_stem().and_then(|s| s.to_str()).unwrap_or("request");
    request.with_file_name(format!("{}{}", stem, RESPONSE_SUFFIX))
}

fn run_one(planner: &Planner<'_>, path: &Path) -> Result<()> {
    let request = load_request(path).with_context(|| format!("reading {}", path.display()))?;
    let response = planner
        .calculate_first_run(&request)
        .with_context(|| format!("calculating {}", path.display()))?;
    let out = response_path(path);
    fs::write(&out, serde_json::to_string_pretty(&response)?)
        .with_context(|| format!("writing {}", out.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let start = Instant::now();

    let (settings, catalog) = match &args.data {
        Some(dir) => (load_settings(dir)?, load_catalog(dir)?),
        None => (StaticSettings::defaults(), InMemoryCatalog::default_catalog()),
    };

    let files = request_files(&args.dir)?;
    info!("Found {} requests in {}", files.len(), args.dir.display());

    let failures: usize = files
        .par_iter()
        .map(|path| {
            let services = Services {
                products: &catalog,
                portfolios: &catalog,
                life_quotes: &UnavailableLifeQuotes,
            };
            match run_one(&Planner::new(&settings, services), path) {
                Ok(()) => 0,
                Err(err) => {
                    error!("{:#}", err);
                    1
                }
            }
        })
        .sum();

    println!(
        "Processed {} requests ({} failed) in {:?}",
        files.len(),
        failures,
        start.elapsed()
    );
    Ok(())
}
