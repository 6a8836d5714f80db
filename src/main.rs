use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use twilio_usage::cli::{self, Args};

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "twilio_usage=debug"
    } else {
        "twilio_usage=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);
    cli::run(args).await
}
