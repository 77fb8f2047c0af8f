use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use irontable::io::glob::expand_glob_required;
use irontable::{
    ConvertOptions, JsonlSource, Region, TableStore, TsvOptions, convert_to_store, export_tsv,
    merge_stores, presets, reconcile_widths,
};

#[derive(Parser, Debug)]
#[command(name = "irontable", about = "Build and merge chunked columnar tables of genomic records")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a store holding one table from a JSONL record file.
    Convert {
        /// Records, one JSON object per line (gzip accepted).
        input: PathBuf,
        /// Output store directory.
        #[arg(long)]
        out: PathBuf,
        /// Table name inside the store.
        #[arg(long)]
        table: String,
        /// Table layout: variant, breakpoint, breakpoint_library, mappability.
        #[arg(long, default_value = "variant")]
        kind: String,
        /// Records per row group.
        #[arg(long, default_value_t = irontable::DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
        /// Only keep records in this region, e.g. `7` or `7:1,000-2,000`.
        #[arg(long)]
        region: Option<Region>,
    },
    /// Print the reconciled text widths of a set of stores as JSON.
    Widths {
        /// Input stores.
        inputs: Vec<PathBuf>,
        /// Glob selecting input stores, used when no inputs are given.
        #[arg(long)]
        glob: Option<String>,
    },
    /// Merge stores into one, in the given order.
    Merge {
        /// Input stores.
        inputs: Vec<PathBuf>,
        /// Glob selecting input stores (sorted by path), used when no inputs are given.
        #[arg(long)]
        glob: Option<String>,
        /// Output store directory.
        #[arg(long)]
        out: PathBuf,
    },
    /// Export one table as TSV.
    ExportTsv {
        store: PathBuf,
        table: String,
        out: PathBuf,
        /// Prepend a row index column.
        #[arg(long)]
        index: bool,
        /// Gzip the output.
        #[arg(long)]
        compress: bool,
    },
    /// List the tables of a store with their row counts.
    Tables { store: PathBuf },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Convert {
            input,
            out,
            table,
            kind,
            chunk_size,
            region,
        } => run_convert(input, out, &table, &kind, chunk_size, region)?,
        Commands::Widths { inputs, glob } => {
            let inputs = resolve_inputs(inputs, glob)?;
            let registry = reconcile_widths(&inputs)?;
            println!("{}", serde_json::to_string_pretty(&registry)?);
        }
        Commands::Merge { inputs, glob, out } => {
            let inputs = resolve_inputs(inputs, glob)?;
            let report = merge_stores(&inputs, &out)
                .with_context(|| format!("failed to merge into {}", out.display()))?;
            for (table, rows) in &report.tables {
                println!("{table}\t{rows}");
            }
        }
        Commands::ExportTsv {
            store,
            table,
            out,
            index,
            compress,
        } => {
            let rows = export_tsv(&store, &table, &out, &TsvOptions { index, compress })
                .with_context(|| format!("failed to export {table} from {}", store.display()))?;
            println!("{rows}");
        }
        Commands::Tables { store } => {
            let opened = TableStore::open_read(&store)
                .with_context(|| format!("failed to open {}", store.display()))?;
            for table in opened.list_tables() {
                let rows = opened.num_rows(&table).unwrap_or(0);
                println!("{table}\t{rows}");
            }
        }
    }
    Ok(())
}

fn run_convert(
    input: PathBuf,
    out: PathBuf,
    table: &str,
    kind: &str,
    chunk_size: usize,
    region: Option<Region>,
) -> Result<()> {
    let Some(spec) = presets::by_name(kind, table) else {
        bail!("unknown table kind `{kind}`");
    };
    let mut options = ConvertOptions::default().chunk_size(chunk_size);
    if let Some(region) = region {
        options = options.region(region);
    }
    let source = JsonlSource::new(&input);
    let report = convert_to_store(&source, &spec, &out, &options)
        .with_context(|| format!("failed to convert {}", input.display()))?;
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
    println!(
        "{}\t{} records\t{} rows\t{} row groups",
        report.table,
        report.records,
        report.rows,
        report.row_groups.len()
    );
    Ok(())
}

fn resolve_inputs(inputs: Vec<PathBuf>, glob: Option<String>) -> Result<Vec<PathBuf>> {
    match (inputs.is_empty(), glob) {
        (false, None) => Ok(inputs),
        (true, Some(pattern)) => Ok(expand_glob_required(&pattern)?),
        (false, Some(_)) => bail!("give either input stores or --glob, not both"),
        (true, None) => bail!("no input stores given"),
    }
}
