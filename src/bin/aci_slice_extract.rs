//! aci-slice-extract: Extract a self-consistent slice of a fabric configuration
//!
//! Usage:
//!   # Snapshot file in, bundle stream out
//!   aci-slice-extract config.json --seeds extraction_list.yml
//!
//!   # One .jsonl file per table
//!   aci-slice-extract config.json --seeds extraction_list.yml --output-dir ./tables
//!
//!   # Extract and convert for another fabric in one go
//!   aci-slice-extract config.json --seeds list.yml --plan plan.yml -o ./tables

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use aci_slice::extract::seeds::read_seeds;
use aci_slice::extract::{BundleWriter, TableWriter};
use aci_slice::remap::{self, SubstitutionPlan};
use aci_slice::schema::aci;
use aci_slice::{extract, ConversionErrors, SliceConfig, Table, TreeIndex};
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use serde_json::Value;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "aci-slice-extract")]
#[command(about = "Extract a self-consistent configuration slice into tables", long_about = None)]
struct Args {
    /// Configuration payload: snapshot, API response or array (stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// YAML extraction list (EPGs, L3Outs or explicit objects)
    #[arg(long, short = 's')]
    seeds: String,

    /// Output directory for separate .jsonl files per table
    /// If omitted, writes to stdout as a single stream with a `_table` field
    #[arg(long, short = 'o')]
    output_dir: Option<String>,

    /// Comma-separated tables to write (default: all)
    #[arg(long)]
    tables: Option<String>,

    /// Maximum number of objects in the closure (default: 100000)
    #[arg(long)]
    max_objects: Option<usize>,

    /// Maximum relation hops from a seed (default: 64)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Substitution plan to apply to the extracted tables
    #[arg(long)]
    plan: Option<String>,

    /// Debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    // Build config
    let mut config = SliceConfig::default();
    if let Some(max) = args.max_objects {
        config.max_objects = max;
    }
    if let Some(depth) = args.max_depth {
        config.max_depth = depth;
    }

    let payload = read_payload(args.input.as_deref())?;
    let tree = TreeIndex::load(&payload).context("Failed to load configuration tree")?;
    let seeds = read_seeds(&args.seeds).context("Failed to load extraction list")?;

    let registry = aci::registry();
    let extraction = extract(&tree, registry, &seeds, &config).context("Extraction failed")?;
    if !extraction.warnings.is_empty() {
        warn!(count = extraction.warnings.len(), "extraction finished with warnings");
    }

    let mut tables = extraction.tables;
    if let Some(plan_path) = &args.plan {
        let plan = SubstitutionPlan::read(plan_path)?;
        let (converted, report) =
            remap::apply(registry, &tables, &plan).map_err(report_conflicts)?;
        for (table, cells) in &report.changed {
            info!(table = %table, cells, "converted");
        }
        tables = converted;
    }

    if let Some(filter) = &args.tables {
        tables = select_tables(tables, filter)?;
    }

    if let Some(output_dir) = &args.output_dir {
        let writer = TableWriter::new(output_dir)?;
        for path in writer.write_tables(&tables)? {
            info!(path = %path.display(), "wrote table");
        }
    } else {
        let stdout = std::io::stdout();
        let mut writer = BundleWriter::new(stdout.lock());
        writer.write_tables(&tables)?;
        writer.flush()?;
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Read the payload, using SIMD-accelerated parsing when possible
fn read_payload(input: Option<&str>) -> Result<Value> {
    let reader = if let Some(file_path) = input {
        let file = File::open(file_path).with_context(|| format!("Failed to open {}", file_path))?;
        Box::new(BufReader::new(file)) as Box<dyn Read>
    } else {
        Box::new(std::io::stdin()) as Box<dyn Read>
    };

    let mut content = Vec::new();
    let mut buf_reader = BufReader::new(reader);
    buf_reader
        .read_to_end(&mut content)
        .context("Failed to read payload")?;

    // simd-json parses in place, keep a copy for the fallback
    let mut scratch = content.clone();
    match simd_json::serde::from_slice::<Value>(&mut scratch) {
        Ok(value) => Ok(value),
        Err(_) => serde_json::from_slice(&content).context("Failed to parse JSON payload"),
    }
}

fn select_tables(tables: Vec<Table>, filter: &str) -> Result<Vec<Table>> {
    let wanted: HashSet<&str> = filter
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect();
    for name in &wanted {
        if !tables.iter().any(|t| t.name == *name) {
            bail!("Unknown table `{}`", name);
        }
    }
    Ok(tables
        .into_iter()
        .filter(|t| wanted.contains(t.name.as_str()))
        .collect())
}

fn report_conflicts(errors: ConversionErrors) -> anyhow::Error {
    for conflict in errors.errors() {
        error!("{}", conflict);
    }
    anyhow!(errors).context("Substitution plan rejected")
}
