use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use rayon::prelude::*;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use walkdir::WalkDir;

use sas7bdat_table::logger::{log_error, set_log_file, set_log_prefix};
use sas7bdat_table::{ColumnKind, CsvSink, ReadOptions, SasFile};

#[derive(Parser)]
#[command(
    name = "sas7tab",
    version,
    about = "Decode uncompressed SAS7BDAT files into CSV/TSV tables"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert one or more inputs to delimited text.
    Convert(Box<ConvertArgs>),
    /// Print the header and column schema of a dataset.
    Inspect(InspectArgs),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum SinkKind {
    Csv,
    Tsv,
}

impl SinkKind {
    const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
        }
    }
}

#[derive(Parser, Clone)]
struct ConvertArgs {
    /// Input files or directories (recurses directories).
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory (computed file names).
    #[arg(long, conflicts_with = "out")]
    out_dir: Option<PathBuf>,

    /// Output file (only valid with a single input).
    #[arg(long, conflicts_with = "out_dir")]
    out: Option<PathBuf>,

    /// Sink kind: csv or tsv.
    #[arg(long, value_enum, default_value_t = SinkKind::Csv)]
    sink: SinkKind,

    /// Field delimiter. Defaults to ',' for csv and '\t' for tsv.
    #[arg(long)]
    delimiter: Option<char>,

    /// Write header row.
    #[arg(long = "headers", action = ArgAction::SetTrue, default_value_t = true)]
    headers: bool,
    /// Disable header row.
    #[arg(long = "no-headers", action = ArgAction::SetFalse, overrides_with = "headers")]
    _no_headers: bool,

    /// Label for the output table. Defaults to the dataset name.
    #[arg(long)]
    table_name: Option<String>,

    /// Skip leading N rows.
    #[arg(long)]
    skip: Option<u64>,

    /// Limit to at most N rows.
    #[arg(long = "max-rows")]
    max_rows: Option<u64>,

    /// Project a subset of columns by name (comma-separated).
    #[arg(long = "columns", value_delimiter = ',', conflicts_with = "column_indices")]
    columns: Option<Vec<String>>,

    /// Project a subset of columns by zero-based indices (comma-separated).
    #[arg(long = "column-indices", value_delimiter = ',')]
    column_indices: Option<Vec<usize>>,

    /// Number of concurrent worker threads.
    #[arg(long)]
    jobs: Option<usize>,

    /// Stop on first error.
    #[arg(long)]
    fail_fast: bool,

    /// Append warnings and errors to this file as well as stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Parser, Clone)]
struct InspectArgs {
    input: PathBuf,
    /// Emit JSON instead of human readable output.
    #[arg(long)]
    json: bool,
}

type AnyError = Box<dyn std::error::Error + Send + Sync>;

fn main() -> Result<(), AnyError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Convert(args) => run_convert(&args),
        Command::Inspect(args) => run_inspect(&args),
    }
}

fn run_convert(args: &ConvertArgs) -> Result<(), AnyError> {
    if let Some(jobs) = args.jobs {
        let _ = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global();
    }
    if let Some(path) = &args.log_file {
        set_log_file(path)?;
    }
    if let Some(delimiter) = args.delimiter
        && !delimiter.is_ascii()
    {
        return Err(format!("delimiter '{delimiter}' is not a single ASCII character").into());
    }

    let files = discover_inputs(&args.inputs);
    if files.is_empty() {
        return Err("no .sas7bdat inputs found".into());
    }
    if args.out.is_some() && files.len() != 1 {
        return Err("--out requires a single input".into());
    }

    let tasks: Vec<(PathBuf, PathBuf)> = match &args.out {
        Some(out) => vec![(files[0].clone(), out.clone())],
        None => files
            .into_iter()
            .map(|input| {
                let output = output_path(&input, args);
                (input, output)
            })
            .collect(),
    };

    let process = |(input, output): (PathBuf, PathBuf)| -> Result<(), AnyError> {
        convert_one(&input, &output, args)
    };

    if args.fail_fast {
        tasks
            .into_par_iter()
            .map(process)
            .collect::<Result<Vec<_>, _>>()?;
    } else {
        let failures = tasks
            .into_par_iter()
            .map(|(input, output)| {
                let res = process((input.clone(), output));
                if let Err(ref e) = res {
                    let _prefix = set_log_prefix(input.display().to_string());
                    log_error(&e.to_string());
                }
                res
            })
            .filter(Result::is_err)
            .count();
        if failures > 0 {
            eprintln!("completed with {failures} failures");
        }
    }

    Ok(())
}

fn convert_one(input: &Path, output: &Path, args: &ConvertArgs) -> Result<(), AnyError> {
    let _prefix = set_log_prefix(input.display().to_string());
    let sas = SasFile::open(input)?;

    let mut options = ReadOptions::new();
    if let Some(name) = &args.table_name {
        options = options.with_table_name(name.clone());
    }
    if let Some(skip) = args.skip {
        options = options.with_skip_rows(skip);
    }
    if let Some(max_rows) = args.max_rows {
        options = options.with_max_rows(max_rows);
    }
    if let Some(indices) = &args.column_indices {
        options = options.with_column_indices(indices.iter().copied());
    } else if let Some(names) = &args.columns {
        options = options.with_column_names(names.iter().cloned());
    }

    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let delimiter = match (args.sink, args.delimiter) {
        (_, Some(ch)) => ch as u8,
        (SinkKind::Tsv, None) => b'\t',
        (SinkKind::Csv, None) => b',',
    };
    let mut sink = CsvSink::new(BufWriter::new(File::create(output)?))
        .with_headers(args.headers)
        .with_delimiter(delimiter);
    let rows = sas.write_into(&options, &mut sink)?;

    println!("{} -> {} ({rows} rows)", input.display(), output.display());
    Ok(())
}

fn run_inspect(args: &InspectArgs) -> Result<(), AnyError> {
    let sas = SasFile::open(&args.input)?;
    let layout = sas.layout();
    let header = &layout.header;

    if args.json {
        #[derive(serde::Serialize)]
        struct ColumnJson<'a> {
            index: usize,
            name: &'a str,
            #[serde(rename = "type")]
            column_type: &'static str,
            kind: &'static str,
            offset: usize,
            length: usize,
            format: Option<&'a str>,
            label: Option<&'a str>,
        }
        #[derive(serde::Serialize)]
        struct InspectJson<'a> {
            name: Option<&'a str>,
            label: Option<&'a str>,
            encoding: &'static str,
            architecture: &'static str,
            created: Option<String>,
            modified: Option<String>,
            page_size: usize,
            page_count: usize,
            row_length: usize,
            row_count: u64,
            column_count: usize,
            columns: Vec<ColumnJson<'a>>,
        }

        let columns = layout
            .columns
            .iter()
            .map(|column| ColumnJson {
                index: column.index,
                name: column.trimmed_name(),
                column_type: column.column_type().as_str(),
                kind: kind_label(column.kind),
                offset: column.row_offset,
                length: column.row_length,
                format: column.format.as_deref(),
                label: column.label.as_deref(),
            })
            .collect();
        let payload = InspectJson {
            name: header.dataset_name.as_deref(),
            label: layout.file_label.as_deref(),
            encoding: header.encoding.name(),
            architecture: architecture_label(header.architecture.is_64bit()),
            created: header.created.as_ref().and_then(format_timestamp),
            modified: header.modified.as_ref().and_then(format_timestamp),
            page_size: header.page_size,
            page_count: header.page_count,
            row_length: layout.row_layout.row_length,
            row_count: layout.row_count(),
            column_count: layout.column_count(),
            columns,
        };
        serde_json::to_writer_pretty(std::io::stdout(), &payload)?;
        println!();
    } else {
        println!(
            "Rows: {}  Columns: {}  Table: {}",
            layout.row_count(),
            layout.column_count(),
            header.dataset_name.as_deref().unwrap_or("")
        );
        if let Some(label) = &layout.file_label {
            println!("Label: {label}");
        }
        println!(
            "Encoding: {}  Layout: {}  Pages: {} x {} bytes",
            header.encoding.name(),
            architecture_label(header.architecture.is_64bit()),
            header.page_count,
            header.page_size
        );
        for column in &layout.columns {
            println!(
                "[{idx:>3}] {name:<24}  {ty:<7}  {kind:<9}  width={w:<4}  fmt={fmt}",
                idx = column.index,
                name = column.trimmed_name(),
                ty = column.column_type().as_str(),
                kind = kind_label(column.kind),
                w = column.row_length,
                fmt = column.format.as_deref().unwrap_or("").trim()
            );
        }
    }
    Ok(())
}

const fn kind_label(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Numeric => "numeric",
        ColumnKind::Character => "character",
    }
}

const fn architecture_label(is_64bit: bool) -> &'static str {
    if is_64bit { "64-bit" } else { "32-bit" }
}

fn format_timestamp(value: &OffsetDateTime) -> Option<String> {
    value.format(&Rfc3339).ok()
}

fn discover_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in inputs {
        if path.is_dir() {
            for entry in WalkDir::new(path).into_iter().filter_map(Result::ok) {
                let entry_path = entry.path();
                if entry.file_type().is_file() && has_sas_extension(entry_path) {
                    files.push(entry_path.to_path_buf());
                }
            }
        } else {
            files.push(path.clone());
        }
    }
    files.sort();
    files.dedup();
    files
}

fn has_sas_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("sas7bdat"))
}

fn output_path(input: &Path, args: &ConvertArgs) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "out".into(), |s| s.to_string_lossy().into_owned());
    let file_name = format!("{stem}.{}", args.sink.extension());
    match &args.out_dir {
        Some(dir) => dir.join(file_name),
        None => input.with_file_name(file_name),
    }
}
