use clap::Parser;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{Settings, TwilioClient, UsageError, UsageFilter, UsageRecord};

#[derive(Parser, Debug)]
#[command(
    name = "twilio-usage",
    about = "Fetch usage records for a Twilio account"
)]
pub struct Args {
    /// Usage category (e.g. "sms", "calls", "totalprice")
    #[arg(long, short, default_value = "")]
    pub category: String,

    /// First day of the range, YYYY-MM-DD or an offset such as -30days
    #[arg(long, short, default_value = "", allow_hyphen_values = true)]
    pub start_date: String,

    /// Last day of the range, YYYY-MM-DD or an offset such as +0days
    #[arg(long, short, default_value = "", allow_hyphen_values = true)]
    pub end_date: String,

    /// Include usage of subaccounts
    #[arg(long)]
    pub include_subaccounts: bool,

    /// Settings file (default: ~/.twilio-usage/settings.json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, env = "TWILIO_TIMEOUT_SECS")]
    pub timeout: Option<u64>,

    /// Print records as a JSON array
    #[arg(long)]
    pub json: bool,

    /// Only print records, no summary
    #[arg(long, short)]
    pub quiet: bool,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(long, short)]
    pub verbose: bool,
}

impl Args {
    pub fn filter(&self) -> UsageFilter {
        UsageFilter::new()
            .category(&self.category)
            .start_date(&self.start_date)
            .end_date(&self.end_date)
            .include_subaccounts(self.include_subaccounts)
    }
}

pub async fn run(args: Args) -> ExitCode {
    let loaded = match &args.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let mut settings = match loaded {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load settings: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(timeout) = args.timeout {
        settings.timeout_secs = timeout;
    }
    debug!(?settings, "Loaded settings");

    let client = match TwilioClient::from_settings(&settings) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    match client.fetch_usage_with_cancel(&args.filter(), &cancel).await {
        Ok(records) => {
            if args.json {
                match serde_json::to_string_pretty(&records) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Failed to encode records: {}", e);
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                for record in &records {
                    println!("{}", format_record(record));
                }
            }
            if !args.quiet {
                display_summary(&records);
            }
            ExitCode::SUCCESS
        }
        Err(UsageError::Exception(exception)) => {
            eprintln!("Twilio rejected the request: {}", exception);
            if let Some(more_info) = &exception.more_info {
                eprintln!("  See {}", more_info);
            }
            ExitCode::from(2)
        }
        Err(UsageError::Cancelled) => {
            eprintln!("Cancelled");
            ExitCode::from(130)
        }
        Err(e) => {
            eprintln!("Failed to fetch usage: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn format_record(record: &UsageRecord) -> String {
    format!(
        "{} {}..{}  count={} {}  usage={} {}  price={} {}",
        record.category,
        record.start_date,
        record.end_date,
        record.count,
        record.count_unit,
        record.usage,
        record.usage_unit,
        record.price,
        record.price_unit
    )
}

fn display_summary(records: &[UsageRecord]) {
    eprintln!("\n{} record(s)", records.len());
    for (unit, total) in total_price(records) {
        eprintln!("  total price: {:.4} {}", total, unit);
    }
}

/// Sum of record prices per currency unit; unparseable prices are skipped.
fn total_price(records: &[UsageRecord]) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();
    for record in records {
        if let Some(price) = record.price_value() {
            *totals.entry(record.price_unit.clone()).or_insert(0.0) += price;
        }
    }
    totals
}
