//! gold-scrape entry point, invoked once a day by the scheduler.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use serde::Serialize;

use gold_scrape::config::ScrapeConfig;
use gold_scrape::events::{Fanout, MemoryObserver, ScrapeEvent, ScrapeObserver, TracingObserver};
use gold_scrape::extraction::numeric::format_thousands;
use gold_scrape::pipeline::{
    CredentialProvider, EnvCredentialProvider, Extraction, Notifier, PipelineCoordinator,
    SessionCredentials, StaticCredentialProvider, StreamNotifier, WebhookNotifier,
};
use gold_scrape::FetchedPage;

#[derive(Parser)]
#[command(
    name = "gold-scrape",
    about = "Daily gold price scraper: fetch, extract, notify",
    version
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, extract and deliver the daily summary (default)
    Run {
        #[command(flatten)]
        fetch: FetchArgs,
        /// POST the summary to this webhook instead of printing it
        #[arg(long)]
        webhook: Option<String>,
        /// Skip the credential lookup (stream delivery only)
        #[arg(long)]
        anonymous: bool,
    },
    /// Fetch the page and save the raw HTML
    Fetch {
        #[command(flatten)]
        fetch: FetchArgs,
        /// Write the body here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Extract prices from a saved page without touching the network
    Parse {
        /// HTML file produced by `gold-scrape fetch`
        input: PathBuf,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish)
        shell: Shell,
    },
}

#[derive(Args, Default)]
struct FetchArgs {
    /// Page to scrape (default: $GOLD_SCRAPE_URL or the 24h.com.vn price page)
    #[arg(long)]
    url: Option<String>,
    /// Per-attempt timeout in seconds (default: $GOLD_SCRAPE_TIMEOUT_SECS or 10)
    #[arg(long)]
    timeout: Option<u64>,
    /// Proxy URL for all requests (default: $GOLD_SCRAPE_PROXY)
    #[arg(long)]
    proxy: Option<String>,
    /// Total attempts including the first request
    #[arg(long)]
    max_attempts: Option<u32>,
    /// Send a fixed user agent instead of a random browser one
    #[arg(long)]
    no_random_user_agent: bool,
}

impl FetchArgs {
    /// Flags > environment > defaults.
    fn resolve(&self) -> Result<ScrapeConfig> {
        let mut cfg = ScrapeConfig::from_env()?;
        if let Some(url) = &self.url {
            cfg.url = url.clone();
        }
        if let Some(secs) = self.timeout {
            cfg.fetch.set_timeout_secs(secs)?;
        }
        if let Some(proxy) = &self.proxy {
            cfg.fetch.proxy = Some(proxy.clone());
        }
        if let Some(n) = self.max_attempts {
            cfg.fetch.retry.max_attempts = n;
        }
        if self.no_random_user_agent {
            cfg.fetch.random_user_agent = false;
        }
        Ok(cfg)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    let logs = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.json {
        logs.json().init();
    } else {
        logs.init();
    }

    // Under --json the events ride along in the printed report.
    let recorded = MemoryObserver::new();
    let observer: Arc<dyn ScrapeObserver> = if cli.json {
        Arc::new(Fanout(vec![
            Arc::new(TracingObserver) as Arc<dyn ScrapeObserver>,
            recorded.clone(),
        ]))
    } else {
        Arc::new(TracingObserver)
    };

    match cli.command.unwrap_or(Commands::Run {
        fetch: FetchArgs::default(),
        webhook: None,
        anonymous: false,
    }) {
        Commands::Run {
            fetch,
            webhook,
            anonymous,
        } => {
            let config = fetch.resolve()?;
            let notifier: Arc<dyn Notifier> = match webhook {
                Some(url) => Arc::new(WebhookNotifier::new(url, config.fetch.timeout())?),
                // Keep stdout clean for the JSON report.
                None if cli.json => Arc::new(StreamNotifier::stderr()),
                None => Arc::new(StreamNotifier::stdout()),
            };
            let credentials: Box<dyn CredentialProvider> = if anonymous {
                Box::new(StaticCredentialProvider(SessionCredentials::new("", "", "")))
            } else {
                Box::new(EnvCredentialProvider)
            };

            let coordinator = PipelineCoordinator::new(config, notifier, observer)?;
            let report = coordinator
                .run(credentials.as_ref())
                .await
                .context("gold price run failed")?;

            if cli.json {
                print_json(&report, &recorded)?;
            } else {
                print_extraction(&report.extraction);
            }
        }

        Commands::Fetch { fetch, output } => {
            let config = fetch.resolve()?;
            let coordinator =
                PipelineCoordinator::new(config, Arc::new(StreamNotifier::stdout()), observer)?;
            let page = coordinator.fetch_page().await?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &page.body)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    eprintln!(
                        "Saved {} bytes from {} to {}",
                        page.body.len(),
                        page.final_url,
                        path.display()
                    );
                }
                None => print!("{}", page.body),
            }
        }

        Commands::Parse { input } => {
            let body = std::fs::read_to_string(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let coordinator = PipelineCoordinator::new(
                ScrapeConfig::default(),
                Arc::new(StreamNotifier::stdout()),
                observer,
            )?;
            let page = FetchedPage {
                url: input.display().to_string(),
                final_url: input.display().to_string(),
                status: 200,
                body,
                attempts: 0,
            };
            let extraction = coordinator.extract(&page)?;
            if cli.json {
                print_json(&extraction, &recorded)?;
            } else {
                print_extraction(&extraction);
            }
        }

        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "gold-scrape",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct JsonOutput<'a, T> {
    #[serde(flatten)]
    result: &'a T,
    events: Vec<ScrapeEvent>,
}

fn print_json<T: Serialize>(result: &T, recorded: &MemoryObserver) -> Result<()> {
    let output = JsonOutput {
        result,
        events: recorded.events(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_extraction(extraction: &Extraction) {
    let r = &extraction.record;
    println!("Gold prices ({})", r.index);
    println!(
        "  Buy:  {:>12}   (yesterday {:>12}, {:+})",
        format_thousands(r.buy_price),
        format_thousands(r.prev_buy_price),
        r.buy_change()
    );
    println!(
        "  Sell: {:>12}   (yesterday {:>12}, {:+})",
        format_thousands(r.sell_price),
        format_thousands(r.prev_sell_price),
        r.sell_change()
    );
    println!("  Spread: {:>11}", format!("{:+}", r.spread()));

    if let Some(table) = &extraction.table {
        if table.len() > 1 {
            println!("  Other rows:");
            for row in table.records.iter().skip(1) {
                println!(
                    "    {:<24} {:>12} / {:>12}",
                    row.index,
                    format_thousands(row.buy_price),
                    format_thousands(row.sell_price)
                );
            }
        }
    }

    match &extraction.series {
        Some(series) => {
            let latest = series
                .latest()
                .map(|p| format!(", latest {} {}/{}", p.date, p.buy_in, p.sell_out))
                .unwrap_or_default();
            println!("  Chart: {} points{latest}", series.len());
        }
        None => println!("  Chart: unavailable"),
    }
}
