//! CLI entrypoint for `generate-fixtures`: writes deterministic, DeHashed-like
//! result pages for exercising `dehashed-excerpt`.
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use dehashed_excerpt::fixtures::{
    BREACHES_DEFAULT, FREEMAIL_DEFAULT, FixtureConfig, FixtureFormat, generate_all, parse_list,
};
use log::{LevelFilter, error, info};

#[derive(Parser, Debug)]
#[command(
    name = "generate-fixtures",
    version,
    about = "Produce mock breach-search fixtures for testing"
)]
struct Args {
    /// Corporate domain used for most emails
    #[arg(long = "domain", default_value = "example.com")]
    domain: String,

    /// Directory to write fixtures into
    #[arg(long = "out", default_value = "./fixtures")]
    out: PathBuf,

    /// Number of fixture files to generate
    #[arg(long = "pages", default_value_t = 2)]
    pages: usize,

    /// Entries per page
    #[arg(long = "per-page", default_value_t = 200)]
    per_page: usize,

    /// RNG seed for determinism
    #[arg(long = "seed", default_value_t = 1234)]
    seed: u64,

    /// Probability [0..1] that an email uses the corporate domain
    #[arg(long = "prefer-corporate", default_value_t = 0.7)]
    prefer_corporate: f64,

    /// Comma list for the freemail pool
    #[arg(long = "freemail-domains", default_value_t = FREEMAIL_DEFAULT.join(","))]
    freemail_domains: String,

    /// Comma list of breach names to sample
    #[arg(long = "breaches", default_value_t = BREACHES_DEFAULT.join(","))]
    breaches: String,

    /// Include plaintext/hashed password-ish fields
    #[arg(long = "include-passwords")]
    include_passwords: bool,

    /// Output file format
    #[arg(long = "format", value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Csv,
}

fn init_logger(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

fn main() {
    let args = Args::parse();
    init_logger(args.verbose);

    let cfg = FixtureConfig {
        domain: args.domain.trim().to_string(),
        pages: args.pages,
        per_page: args.per_page,
        seed: args.seed,
        prefer_corporate: args.prefer_corporate,
        freemail_domains: parse_list(&args.freemail_domains),
        breaches: parse_list(&args.breaches),
        include_passwords: args.include_passwords,
        format: match args.format {
            Format::Json => FixtureFormat::Json,
            Format::Csv => FixtureFormat::Csv,
        },
    };
    if let Err(e) = cfg.validate() {
        error!("{}", e);
        std::process::exit(2);
    }
    info!("generating {} page(s) with seed {}", cfg.pages, cfg.seed);

    let now = chrono::Utc::now();
    let written = match generate_all(&cfg, &args.out, now) {
        Ok(w) => w,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(4);
        }
    };
    let mut total = 0;
    for (path, count) in &written {
        println!("Wrote {} ({} entries)", path.display(), count);
        total += count;
    }
    println!(
        "Done. Generated {} entries across {} page(s) into {}",
        total,
        cfg.pages,
        args.out.display()
    );
}
