#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that synthesizes hierarchical order profiles.

mod profile;
mod report;

use std::{
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use order_profile_core::{DateRange, Granularity};
use order_profile_system_apportion::GaussianNoise;
use order_profile_system_cascade::{resolve, ProfileRequest};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{profile::ProfileFile, report::ReportFormat};

const DEFAULT_LOG_FILTER: &str = "order_profile=info";

/// Distributes a total number of orders over years, months, days and hours.
#[derive(Debug, Parser)]
#[command(name = "order-profile", version)]
struct Args {
    /// First day of the range (YYYY-MM-DD).
    #[arg(long)]
    start: NaiveDate,

    /// Last day of the range, inclusive (YYYY-MM-DD).
    #[arg(long)]
    end: NaiveDate,

    /// Number of orders to distribute.
    #[arg(long, allow_negative_numbers = true)]
    total: i64,

    /// Deepest level to resolve and print.
    #[arg(long, value_enum, default_value_t = Level::Month)]
    granularity: Level,

    /// TOML file holding weights, factors and noise settings.
    #[arg(long, value_name = "FILE")]
    profile: Option<PathBuf>,

    /// Standard deviation of the multiplicative noise; overrides the profile.
    #[arg(long, value_name = "STD_DEV", allow_negative_numbers = true)]
    noise: Option<f64>,

    /// Seed for reproducible noise; overrides the profile.
    #[arg(long, env = "ORDER_PROFILE_SEED")]
    seed: Option<u64>,

    /// Output encoding.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,
}

/// Granularity as spelled on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Level {
    Year,
    Month,
    Day,
    Hour,
}

impl From<Level> for Granularity {
    fn from(level: Level) -> Self {
        match level {
            Level::Year => Self::Year,
            Level::Month => Self::Month,
            Level::Day => Self::Day,
            Level::Hour => Self::Hour,
        }
    }
}

/// Entry point for the order profile command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(&args, &mut out)
}

fn run(args: &Args, out: &mut impl Write) -> Result<()> {
    let range = DateRange::new(args.start, args.end).context("invalid date range")?;
    let profile = match &args.profile {
        Some(path) => ProfileFile::load(path)?,
        None => ProfileFile::default(),
    };

    let request = ProfileRequest::from_signed_total(range, args.total)
        .context("invalid order total")?
        .with_month_weights(profile.month_weights()?)
        .with_day_factors(profile.day_factors()?)
        .with_hour_shape(profile.hour_shape()?)
        .with_noise(profile.noise(args.noise)?);

    let granularity = Granularity::from(args.granularity);
    let seed = profile.seed(args.seed);
    let mut source = match seed {
        Some(seed) => GaussianNoise::seeded(seed),
        None => GaussianNoise::from_entropy(),
    };
    info!(
        %granularity,
        start = %request.range().start(),
        end = %request.range().end(),
        total = request.total(),
        noise = ?request.noise().map(|noise| noise.std_dev()),
        seed = ?seed,
        "resolving order profile"
    );

    let resolved =
        resolve(&request, granularity, &mut source).context("failed to resolve order profile")?;
    report::write(&resolved, args.format, out)
}
