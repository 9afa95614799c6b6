//! CLI entrypoint for `dehashed-excerpt`.
//!
//! Validates the input path, streams the CSV through the library engine,
//! prints the fixed-format excerpt report, and optionally writes a JSON
//! sidecar. A failed sidecar write is logged but does not change the exit
//! status.
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Parser, ValueEnum};
use dehashed_excerpt::{
    columns::Overrides,
    dialect::DelimiterSpec,
    engine::{Engine, Options},
    export::save_summary_json,
    io::{DEFAULT_MMAP_THRESHOLD_BYTES, encoding_for_label},
    report::render_report,
};
use log::{LevelFilter, error, info};

#[derive(Parser, Debug)]
#[command(
    name = "dehashed-excerpt",
    version,
    about = "Generate an excerpt of names & emails and count unique breached databases."
)]
struct Args {
    /// Path to the breach-search CSV export
    #[arg(long = "csv", required = true)]
    csv: PathBuf,

    /// Max number of unique excerpt lines to show
    #[arg(long = "limit", default_value_t = 10)]
    limit: usize,

    /// Email column name (case-insensitive). If omitted, auto-detect.
    #[arg(long = "email-col")]
    email_col: Option<String>,

    /// Name column name (case-insensitive). If omitted, auto-detect.
    #[arg(long = "name-col")]
    name_col: Option<String>,

    /// First name column (case-insensitive)
    #[arg(long = "first-col")]
    first_col: Option<String>,

    /// Last name column (case-insensitive)
    #[arg(long = "last-col")]
    last_col: Option<String>,

    /// Breach column (case-insensitive). If omitted, auto-detect.
    #[arg(long = "breach-col")]
    breach_col: Option<String>,

    /// File encoding, e.g. utf-8 or latin-1
    #[arg(long = "encoding", default_value = "utf-8")]
    encoding: String,

    /// Delimiter: auto, ',', ';', '\t', '|', ':'
    #[arg(long = "delimiter", default_value = "auto")]
    delimiter: DelimiterSpec,

    /// Prefer emails with this domain in the excerpt ranking
    #[arg(long = "prefer-domain")]
    prefer_domain: Option<String>,

    /// Write a JSON summary to this file (stdout remains text)
    #[arg(long = "json-file")]
    json_file: Option<PathBuf>,

    /// Override mmap threshold in bytes. If zero, disable mmap.
    #[arg(long = "mmap-threshold", default_value_t = DEFAULT_MMAP_THRESHOLD_BYTES)]
    mmap_threshold: u64,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error logging
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    /// Log row counters collected while scanning
    #[arg(long = "log-parse-stats")]
    log_parse_stats: bool,

    /// Control color output (auto, always, never)
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

fn init_logger(verbosity: u8, quiet: bool) {
    let level = match verbosity {
        _ if quiet => LevelFilter::Error,
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

fn build_options(args: &Args) -> Result<Options> {
    if !args.csv.exists() {
        bail!("File not found: {}", args.csv.display());
    }
    Ok(Options {
        limit: args.limit,
        overrides: Overrides {
            email: args.email_col.clone(),
            name: args.name_col.clone(),
            first: args.first_col.clone(),
            last: args.last_col.clone(),
            breach: args.breach_col.clone(),
        },
        encoding: encoding_for_label(&args.encoding)?,
        delimiter: args.delimiter,
        prefer_domain: args.prefer_domain.clone(),
        mmap_threshold: args.mmap_threshold,
    })
}

fn main() {
    let args = Args::parse();
    init_logger(args.verbose, args.quiet);
    let styled = match args.color {
        ColorChoice::Always => {
            colored::control::set_override(true);
            true
        }
        ColorChoice::Never => {
            colored::control::set_override(false);
            false
        }
        ColorChoice::Auto => std::io::stdout().is_terminal(),
    };

    let options = match build_options(&args) {
        Ok(o) => o,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    let mut engine = Engine::new(options);
    if let Err(e) = engine.load_from_path(&args.csv) {
        error!("{}", e);
        std::process::exit(e.exit_code());
    }

    print!("{}", render_report(&engine, styled));

    if let Some(path) = &args.json_file {
        match save_summary_json(&engine.summary(), path) {
            Ok(()) => info!("wrote JSON summary to {}", path.display()),
            Err(e) => error!("failed to write JSON file: {:#}", e),
        }
    }

    if args.log_parse_stats {
        let stats = engine.parse_stats;
        info!(
            "parse stats: rows={}, with_email={}, without_email={}, decode_errors={}",
            stats.rows,
            stats.rows_with_email,
            stats.rows_without_email(),
            stats.decode_errors
        );
    }
}
