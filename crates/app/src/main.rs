//! Runs one design search over JSON catalogue files and prints the ranked
//! outcome as JSON.
//!
//! Without positional arguments the bundled sample data under `data/` is used.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use electrical::SelectionPolicy;
use log::LevelFilter;
use packcore::{Catalogue, CatalogueError, ComponentCatalogue, RawCellRecord, Requirements};
use search::{DesignEngine, SearchConfig};
use serde::de::DeserializeOwned;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use thiserror::Error;

#[derive(Debug, Error)]
enum AppError {
    #[error("reading {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("parsing {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error(transparent)]
    Catalogue(#[from] CatalogueError),
    #[error("writing output: {0}")]
    Output(#[from] serde_json::Error),
    #[error(transparent)]
    Logger(#[from] log::SetLoggerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Policy {
    /// Cheapest part meeting the ratings
    Cheapest,
    /// First meeting part in price order
    First,
}

impl From<Policy> for SelectionPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Cheapest => SelectionPolicy::CheapestMatch,
            Policy::First => SelectionPolicy::FirstMatch,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "packsearch", version, about = "Battery pack design-space search")]
struct Args {
    /// Cell catalogue (JSON array of cell records)
    #[arg(requires_all = ["components", "requirements"])]
    cells: Option<PathBuf>,
    /// Component catalogue grouped by kind (JSON)
    components: Option<PathBuf>,
    /// Pack requirements (JSON)
    requirements: Option<PathBuf>,

    /// Search configuration (JSON); the flags below override it
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Highest parallel count tried per series count
    #[arg(long)]
    max_parallel: Option<u32>,
    /// Designs kept in `results`
    #[arg(long)]
    top: Option<usize>,
    /// Designs kept in `plotResults`
    #[arg(long)]
    plot: Option<usize>,
    /// Component selection policy
    #[arg(long, value_enum)]
    policy: Option<Policy>,
    /// Energy and power split percentages for two-chemistry designs, e.g. 0,50,100
    #[arg(long, value_delimiter = ',')]
    splits: Option<Vec<u8>>,
    /// Energy purchase price per kWh
    #[arg(long)]
    buy_price: Option<f64>,
    /// Energy resale price per kWh
    #[arg(long)]
    sell_price: Option<f64>,
    #[arg(long)]
    discount_rate: Option<f64>,
    /// One-way main cable run (m)
    #[arg(long)]
    cable_length: Option<f64>,
    /// Conductor temperature limit (°C)
    #[arg(long)]
    cable_max_temp: Option<f64>,
    /// Depth-of-discharge swing of the usage profile
    #[arg(long)]
    dod: Option<f64>,

    /// Skip two-chemistry combinations
    #[arg(long)]
    no_multi: bool,
    /// Skip the global mix optimizer
    #[arg(long)]
    no_optimizer: bool,
    /// Wall-clock budget for the whole search (ms)
    #[arg(long, value_name = "MS")]
    time_limit: Option<u64>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Cells, components and requirements files
    fn inputs(&self) -> [PathBuf; 3] {
        match (&self.cells, &self.components, &self.requirements) {
            (Some(cells), Some(components), Some(requirements)) => {
                [cells.clone(), components.clone(), requirements.clone()]
            }
            _ => {
                let data = Path::new(env!("CARGO_MANIFEST_DIR")).join("data");
                [
                    data.join("cells.json"),
                    data.join("components.json"),
                    data.join("requirements.json"),
                ]
            }
        }
    }

    fn search_config(&self) -> Result<SearchConfig, AppError> {
        let mut config: SearchConfig = match &self.config {
            Some(path) => read_json(path)?,
            None => SearchConfig::default(),
        };

        if let Some(max_parallel) = self.max_parallel {
            config = config.with_max_parallel(max_parallel);
        }
        if self.top.is_some() || self.plot.is_some() {
            let top = self.top.unwrap_or(config.top_results);
            let plot = self.plot.unwrap_or(config.plot_results);
            config = config.with_cutoffs(top, plot);
        }
        if let Some(policy) = self.policy {
            config = config.with_selection_policy(policy.into());
        }
        if let Some(splits) = &self.splits {
            config = config.with_split_grid(splits.clone());
        }
        if self.no_multi {
            config = config.with_multi(false);
        }
        if self.no_optimizer {
            config = config.with_optimizer(false);
        }
        if let Some(ms) = self.time_limit {
            config = config.with_time_limit(Duration::from_millis(ms));
        }

        let mut financial = config.financial;
        if self.buy_price.is_some() || self.sell_price.is_some() {
            financial = financial.with_prices(
                self.buy_price.unwrap_or(financial.buy_price_per_kwh),
                self.sell_price.unwrap_or(financial.sell_price_per_kwh),
            );
        }
        if let Some(rate) = self.discount_rate {
            financial = financial.with_discount_rate(rate);
        }
        config = config.with_financial(financial);

        if let Some(length) = self.cable_length {
            config.cable_model = config.cable_model.with_run_length(length);
        }
        if let Some(max_temp) = self.cable_max_temp {
            config.cable_model = config.cable_model.with_max_temperature(max_temp);
        }
        if let Some(dod) = self.dod {
            config.durability = config.durability.with_requested_dod(dod);
        }
        Ok(config)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let text = fs::read_to_string(path).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| AppError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn run(args: Args) -> Result<(), AppError> {
    let level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto)?;

    let [cells_path, components_path, requirements_path] = args.inputs();
    let cells: Vec<RawCellRecord> = read_json(&cells_path)?;
    let components: ComponentCatalogue = read_json(&components_path)?;
    let requirements: Requirements = read_json(&requirements_path)?;
    let config = args.search_config()?;

    let catalogue = Catalogue::from_raw(cells, components)?;
    let outcome = DesignEngine::new(config).run(&catalogue, &requirements);

    match outcome.results.first() {
        Some(best) => log::info!(
            "Best: {} subpack(s), {:.0} Wh, {:.0} W, {:.1} kg, {:.2} ({:.2} Wh per unit price)",
            best.subpacks.len(),
            best.total_energy,
            best.total_continuous_power,
            best.total_weight,
            best.total_price,
            best.energy_per_price()
        ),
        None => log::warn!("No design satisfies the requirements"),
    }

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn main() {
    if let Err(e) = run(Args::parse()) {
        eprintln!("packsearch: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_default_to_bundled_data() {
        let args = Args::try_parse_from(["packsearch", "--verbose"]).unwrap();
        assert!(args.verbose);
        assert!(args.inputs()[0].ends_with("data/cells.json"));
        assert!(args.config.is_none());

        let args = Args::try_parse_from(["packsearch", "c.json", "k.json", "r.json", "--config", "s.json"]).unwrap();
        assert_eq!(args.inputs()[2], PathBuf::from("r.json"));
        assert_eq!(args.config, Some(PathBuf::from("s.json")));

        assert!(Args::try_parse_from(["packsearch", "only-one.json"]).is_err());
        assert!(Args::try_parse_from(["packsearch", "--config"]).is_err());
    }

    #[test]
    fn test_flags_override_search_config() {
        let args = Args::try_parse_from([
            "packsearch",
            "--max-parallel",
            "8",
            "--top",
            "5",
            "--policy",
            "first",
            "--splits",
            "0,50,100",
            "--sell-price",
            "0.4",
            "--discount-rate",
            "0.07",
            "--cable-length",
            "3",
            "--cable-max-temp",
            "90",
            "--dod",
            "0.6",
            "--no-multi",
            "--time-limit",
            "1500",
        ])
        .unwrap();
        let config = args.search_config().unwrap();

        assert_eq!(config.max_parallel, 8);
        assert_eq!(config.top_results, 5);
        assert_eq!(config.plot_results, 100);
        assert_eq!(config.selection_policy, SelectionPolicy::FirstMatch);
        assert_eq!(config.split_grid_pct, vec![0, 50, 100]);
        assert!((config.financial.buy_price_per_kwh - 0.10).abs() < 1e-12);
        assert!((config.financial.sell_price_per_kwh - 0.4).abs() < 1e-12);
        assert!((config.financial.discount_rate - 0.07).abs() < 1e-12);
        assert!((config.cable_model.run_length_m - 3.0).abs() < 1e-12);
        assert!((config.cable_model.max_temperature_c - 90.0).abs() < 1e-12);
        assert!((config.durability.requested_dod - 0.6).abs() < 1e-12);
        assert!(!config.enable_multi);
        assert!(config.enable_optimizer);
        assert_eq!(config.time_limit_ms, Some(1500));

        let untouched = Args::try_parse_from(["packsearch"]).unwrap().search_config().unwrap();
        assert_eq!(untouched, SearchConfig::default());
    }

    #[test]
    fn test_bundled_data_builds_a_catalogue() {
        let args = Args::try_parse_from(["packsearch"]).unwrap();
        let [cells_path, components_path, requirements_path] = args.inputs();
        let cells: Vec<RawCellRecord> = read_json(&cells_path).unwrap();
        let components: ComponentCatalogue = read_json(&components_path).unwrap();
        let requirements: Requirements = read_json(&requirements_path).unwrap();

        let catalogue = Catalogue::from_raw(cells, components).unwrap();
        assert_eq!(catalogue.cells().len(), 30);
        assert_eq!(catalogue.components().bms.len(), 2);
        assert!(requirements.debug);
    }
}
