//! lcaio: command-line front end for the hybridization engine.
//!
//! ## Example Usage
//!
//! ```bash
//! # Lifecycle impacts of a bundle, keyed by MATRIXID only
//! lcaio --label-columns 1 lifecycle --bundle inventory.bin --quantity impacts
//!
//! # Hybridize with an IO table, then report everything as JSON
//! lcaio --json lifecycle --bundle inventory.bin --io exiobase.json \
//!     --categories categories.json --hybridize records.json
//!
//! # Binary bundle to JSON and back
//! lcaio convert --input inventory.bin --output inventory.json
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lcaio::args::{Cli, Command, ConvertArgs, InspectArgs, LifecycleArgs};
use lcaio::report;
use lcaio::{HybridizationRecord, HybridizerConfig, InventoryHybridizer, IoTable, MatDict};

fn load_config(cli: &Cli) -> Result<HybridizerConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => HybridizerConfig::from_env(),
    };
    if let Some(columns) = &cli.label_columns {
        config.label_columns = columns.clone();
    }
    if cli.verbose {
        config.verbose = true;
    }
    Ok(config)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {} {}", what, path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {} {}", what, path.display()))
}

fn lifecycle(args: LifecycleArgs, mut config: HybridizerConfig, json: bool) -> Result<()> {
    if let Some(matching) = args.sector_matching {
        config.sector_matching = matching.into();
    }
    let mut hybridizer = InventoryHybridizer::new(config);

    let bundle = MatDict::load(&args.bundle)?;
    let background = match &args.background {
        Some(path) => MatDict::load(path)?,
        None => bundle.clone(),
    };
    hybridizer
        .extract_background_from_matdict(&background)
        .context("extracting background")?;

    if let Some(path) = &args.io {
        let table = IoTable::load_json(path)?;
        hybridizer
            .extract_io_background(&table)
            .context("loading IO background")?;
    }
    if let Some(path) = &args.categories {
        let categories: BTreeMap<String, Vec<String>> = read_json(path, "categories")?;
        for (name, sectors) in categories {
            hybridizer.set_io_category(name, sectors);
        }
    }

    hybridizer
        .extract_foreground_from_matdict(&bundle)
        .context("extracting foreground")?;
    hybridizer
        .match_foreground_to_background()
        .context("aligning foreground to background")?;

    if let Some(path) = &args.hybridize {
        let records: Vec<HybridizationRecord> = read_json(path, "hybridization records")?;
        let outcomes = hybridizer
            .hybridize_multiple_processes(&records)
            .context("hybridizing foreground")?;
        info!(records = outcomes.len(), "applied hybridization records");
    }

    match args.quantity.single() {
        Some(quantity) => {
            let v = hybridizer.calc_lifecycle(quantity)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report::vector_to_json(&v))?);
            } else {
                print!("{}", report::format_vector(&quantity.to_string(), &v));
            }
        }
        None => {
            let results = hybridizer.calc_all()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report::results_to_json(&results))?);
            } else {
                print!("{}", report::format_results(&results));
            }
        }
    }
    Ok(())
}

fn convert(args: ConvertArgs) -> Result<()> {
    let dict = MatDict::load(&args.input)?;
    dict.save(&args.output)?;
    println!(
        "Converted {} entries: {} -> {}",
        dict.len(),
        args.input.display(),
        args.output.display()
    );
    Ok(())
}

fn inspect(args: InspectArgs, json: bool) -> Result<()> {
    let dict = MatDict::load(&args.bundle)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report::bundle_to_json(&dict))?);
    } else {
        print!("{}", report::format_bundle(&dict));
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let json = cli.json;

    match cli.command {
        Command::Lifecycle(args) => lifecycle(args, config, json),
        Command::Convert(args) => convert(args),
        Command::Inspect(args) => inspect(args, json),
    }
}
