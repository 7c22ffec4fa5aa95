//! secpipe CLI - command-line interface for the security event pipeline
//!
//! Commands:
//! - process: run the full pipeline over a CSV batch and write the enriched table
//! - validate: run the pipeline and report schema findings without writing output
//! - schema: print the expected input columns and the derived output columns

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use secpipe::io::{to_ndjson, CsvAdapter, OUTPUT_COLUMNS};
use secpipe::{
    run_pipeline, PipelineConfig, PipelineError, ValidateMode, DEFAULT_GAP_MINUTES,
    REQUIRED_COLUMNS, SECPIPE_VERSION,
};

/// secpipe - clean, normalize, and enrich security event logs
#[derive(Parser)]
#[command(name = "secpipe")]
#[command(version = SECPIPE_VERSION)]
#[command(about = "Batch pipeline for security event logs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: clean, normalize, derive features, write output
    Process {
        /// Input CSV path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// Inactivity gap in minutes to split sessions
        #[arg(long, default_value_t = DEFAULT_GAP_MINUTES)]
        session_gap_minutes: f64,

        /// Output format
        #[arg(long, default_value = "csv")]
        output_format: OutputFormat,

        /// Drop records whose normalized severity is 'unknown'
        #[arg(long)]
        drop_unknown_severity: bool,

        /// Schema validation mode
        #[arg(long, default_value = "warn")]
        validate: ValidateArg,

        /// Print a brief post-run summary to stderr
        #[arg(long)]
        summary: bool,
    },

    /// Run the pipeline and report schema-validation findings
    Validate {
        /// Input CSV path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print input and output schema information
    Schema {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Comma-separated values with a header row
    Csv,
    /// Newline-delimited JSON (one event per line)
    Ndjson,
}

#[derive(Clone, ValueEnum)]
enum ValidateArg {
    Off,
    Warn,
    Strict,
}

impl From<ValidateArg> for ValidateMode {
    fn from(arg: ValidateArg) -> Self {
        match arg {
            ValidateArg::Off => ValidateMode::Off,
            ValidateArg::Warn => ValidateMode::Warn,
            ValidateArg::Strict => ValidateMode::Strict,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Process {
            input,
            output,
            session_gap_minutes,
            output_format,
            drop_unknown_severity,
            validate,
            summary,
        } => cmd_process(
            &input,
            &output,
            session_gap_minutes,
            output_format,
            drop_unknown_severity,
            validate.into(),
            summary,
        ),
        Commands::Validate { input, json } => cmd_validate(&input, json),
        Commands::Schema { json } => cmd_schema(json),
    }
}

fn cmd_process(
    input: &Path,
    output: &Path,
    session_gap_minutes: f64,
    output_format: OutputFormat,
    drop_unknown_severity: bool,
    validate: ValidateMode,
    summary: bool,
) -> Result<(), CliError> {
    let data = read_input(input)?;
    let batch = CsvAdapter::parse(&data)?;

    let config = PipelineConfig {
        gap_minutes: session_gap_minutes,
        drop_unknown_severity,
        validate,
    };
    let run = run_pipeline(batch, &config)?;

    let rendered = match output_format {
        OutputFormat::Csv => CsvAdapter::write(&run.table)?,
        OutputFormat::Ndjson => to_ndjson(&run.table)?,
    };
    write_output(output, &rendered)?;

    if summary {
        print_summary(&run);
    }

    Ok(())
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), CliError> {
    let data = read_input(input)?;
    let batch = CsvAdapter::parse(&data)?;

    let run = run_pipeline(batch, &PipelineConfig::default())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&run.issues)?);
    } else if run.issues.is_empty() {
        println!("ok: {} rows, no schema findings", run.table.len());
    } else {
        for issue in &run.issues {
            println!("finding: {issue}");
        }
    }

    Ok(())
}

fn cmd_schema(json: bool) -> Result<(), CliError> {
    let required: Vec<&str> = REQUIRED_COLUMNS.iter().map(|c| c.name()).collect();

    if json {
        let report = serde_json::json!({
            "required_input_columns": required,
            "output_columns": OUTPUT_COLUMNS,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("required input columns: {}", required.join(", "));
        println!("output columns: {}", OUTPUT_COLUMNS.join(", "));
    }

    Ok(())
}

fn print_summary(run: &secpipe::PipelineRun) {
    let summary = run.summary();
    eprintln!("rows: {}", summary.rows);
    eprintln!("users: {} | sessions: {}", summary.users, summary.sessions);
    if let (Some(first), Some(last)) = (summary.first_event, summary.last_event) {
        eprintln!("time range: {} -> {}", first.to_rfc3339(), last.to_rfc3339());
    }
    eprintln!("severity breakdown:");
    for (label, count) in &summary.severity_counts {
        eprintln!("  {label}: {count}");
    }
}

fn read_input(path: &Path) -> Result<String, CliError> {
    if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn write_output(path: &Path, data: &str) -> Result<(), CliError> {
    if path.to_string_lossy() == "-" {
        io::stdout().write_all(data.as_bytes())?;
        Ok(())
    } else {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(fs::write(path, data)?)
    }
}

#[derive(Debug)]
enum CliError {
    Pipeline(PipelineError),
    Io(io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Pipeline(e) => write!(f, "{e}"),
            CliError::Io(e) => write!(f, "io error: {e}"),
            CliError::Json(e) => write!(f, "json error: {e}"),
        }
    }
}

impl From<PipelineError> for CliError {
    fn from(e: PipelineError) -> Self {
        CliError::Pipeline(e)
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Json(e)
    }
}
