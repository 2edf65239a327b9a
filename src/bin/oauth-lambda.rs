use std::time::Duration;

use anyhow::{Context, Result};
use clap::arg;
use clap::command;
use clap::Parser;
use oauth_lambda::observability::metrics::get_metrics;
use oauth_lambda::utils::config_loader;
use oauth_lambda::utils::logging;
use oauth_lambda::utils::logging::LogLevel;
use oauth_lambda::AuthorizedClient;
use reqwest::Client;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "oauth-lambda.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    /// URL to call with the authorized client
    #[arg(short, long, env = "TARGET_URL")]
    url: String,
    /// how many times to call the URL, the token is fetched once
    #[arg(long, default_value_t = 1)]
    repeat: usize,
    /// print prometheus metrics when done
    #[arg(long)]
    print_metrics: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config, init logging
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config.settings, args.log_level).await?;

    // -------------------------------
    // 2. Create request client and wrap it
    // -------------------------------

    let client = Client::builder()
        .timeout(Duration::from_millis(service_config.settings.http_timeout_ms()))
        .build()
        .context("failed to build http client")?;
    let authorized = AuthorizedClient::new(service_config.credentials, client);

    // -------------------------------
    // 3. Call the target
    // -------------------------------

    info!("calling '{}' {} time(s)", args.url, args.repeat);
    for attempt in 1..=args.repeat {
        match authorized.get(&args.url).await {
            Ok(response) => {
                let status = response.status();
                let body = response.text().await?;
                println!("[{attempt}] {status}\n{body}");
            }
            Err(err) => {
                warn!("call {} failed: {}", attempt, err);
                println!("[{attempt}] error: {err}");
            }
        }
    }

    // -------------------------------
    // 4. Metrics
    // -------------------------------

    if args.print_metrics {
        print!("{}", get_metrics().await.gather_text()?);
    }

    Ok(())
}
