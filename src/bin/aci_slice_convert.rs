//! aci-slice-convert: Apply a substitution plan to extracted tables
//!
//! Usage:
//!   # Bundle in (file or stdin), bundle out
//!   aci-slice-extract config.json -s list.yml | aci-slice-convert --plan plan.yml
//!
//!   # One .jsonl file per table
//!   aci-slice-convert tables.jsonl --plan plan.yml --output-dir ./converted

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use aci_slice::extract::{read_bundle, BundleWriter, TableWriter};
use aci_slice::remap::{RemapEngine, SubstitutionPlan};
use aci_slice::schema::aci;
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{BufRead, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "aci-slice-convert")]
#[command(about = "Rewrite identifiers across extracted tables", long_about = None)]
struct Args {
    /// Bundle stream produced by aci-slice-extract (stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// YAML substitution plan: namespace -> {old: new}
    #[arg(long, short = 'p')]
    plan: String,

    /// Output directory for separate .jsonl files per table
    /// If omitted, writes to stdout as a single stream with a `_table` field
    #[arg(long, short = 'o')]
    output_dir: Option<String>,

    /// Debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let registry = aci::registry();
    let plan = SubstitutionPlan::read(&args.plan)?;

    let reader = if let Some(file_path) = &args.input {
        let file = File::open(file_path).with_context(|| format!("Failed to open {}", file_path))?;
        Box::new(BufReader::new(file)) as Box<dyn BufRead>
    } else {
        Box::new(BufReader::new(std::io::stdin())) as Box<dyn BufRead>
    };
    let tables = read_bundle(reader, registry).context("Failed to read table bundle")?;

    let engine = match RemapEngine::new(registry, &plan, &tables).validate() {
        Ok(engine) => engine,
        Err(errors) => {
            for conflict in errors.errors() {
                error!("{}", conflict);
            }
            return Err(anyhow!(errors).context("Substitution plan rejected"));
        }
    };
    for entry in engine.derived() {
        info!(namespace = %entry.namespace, old = %entry.old, new = %entry.new, "derived substitution");
    }

    let applied = engine.apply();
    for (table, cells) in &applied.report.changed {
        info!(table = %table, cells, "converted");
    }

    if let Some(output_dir) = &args.output_dir {
        let writer = TableWriter::new(output_dir)?;
        writer.write_tables(&applied.tables)?;
    } else {
        let stdout = std::io::stdout();
        let mut writer = BundleWriter::new(stdout.lock());
        writer.write_tables(&applied.tables)?;
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
