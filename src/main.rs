use std::env;
use std::path::Path;
use std::process;

use tracing::error;
use tracing_subscriber::EnvFilter;

use binance_rates::api::BinanceApi;
use binance_rates::args::{self, CliArgs, UsageError};
use binance_rates::clock::SystemClock;
use binance_rates::monitor::{Monitor, MonitorConfig};
use binance_rates::watchlist::Watchlist;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn program_name(argv: &[String]) -> String {
    argv.first()
        .and_then(|raw| Path::new(raw).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    let argv: Vec<String> = env::args().collect();
    let cli = match CliArgs::parse(&argv) {
        Ok(cli) => cli,
        Err(error) => {
            println!("{error}");
            match error {
                UsageError::BadDuration(_) => println!("{}", args::DURATION_FORMAT_HINT),
                UsageError::MissingPairs => print!("{}", args::usage(&program_name(&argv))),
            }
            process::exit(error.exit_code());
        }
    };

    let config = MonitorConfig::from_cli(&cli);
    let watchlist = Watchlist::from_args(&cli.pairs);

    let api = match BinanceApi::new() {
        Ok(api) => api,
        Err(error) => {
            error!(%error, "could not build the HTTP client");
            println!("Stopping ...");
            process::exit(1);
        }
    };

    let mut monitor = match Monitor::init(api, SystemClock, config, watchlist).await {
        Ok(monitor) => monitor,
        Err(error) => {
            error!(%error, "exchange metadata fetch failed");
            println!("Stopping ...");
            process::exit(1);
        }
    };

    tokio::select! {
        result = monitor.run() => {
            if let Err(error) = result {
                error!(%error, "terminal write failed");
                process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\nExiting ...");
        }
    }
}
