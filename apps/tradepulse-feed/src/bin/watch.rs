//! tradepulse-watch - terminal client for the TradePulse feed
//!
//! Streams snapshots, reduces them into price, delta and history, and prints
//! the symbols on the user's watchlist. Also manages the watchlist.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tradepulse_feed::domain::snapshot::format_price;
use tradepulse_feed::infrastructure::directory::HttpUserDirectory;
use tradepulse_feed::infrastructure::telemetry::{self, TelemetryConfig};
use tradepulse_feed::{
    ClientConfig, ClientState, FeedClient, FeedClientConfig, FeedEvent, SubscriptionService,
    Symbol, Universe, load_dotenv,
};

#[derive(Parser)]
#[command(name = "tradepulse-watch")]
#[command(about = "Watch the TradePulse price feed and manage a watchlist")]
struct Cli {
    /// Feed WebSocket URL
    #[arg(long, env = "TRADEPULSE_FEED_URL", global = true)]
    feed_url: Option<String>,

    /// Subscription API base URL
    #[arg(long, env = "TRADEPULSE_API_URL", global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream prices; with --email only the user's watchlist is shown
    Watch {
        /// User e-mail
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Add a ticker to the watchlist
    Subscribe {
        /// User e-mail
        #[arg(short, long)]
        email: String,
        /// Ticker symbol
        ticker: String,
    },
    /// Remove a ticker from the watchlist
    Unsubscribe {
        /// User e-mail
        #[arg(short, long)]
        email: String,
        /// Ticker symbol
        ticker: String,
    },
    /// Show the watchlist
    List {
        /// User e-mail
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let _telemetry_guard = telemetry::init_with_config(
        TelemetryConfig::from_env().with_default_service_name("tradepulse-watch"),
    );

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env()?;
    if let Some(url) = cli.feed_url {
        config.feed_url = url;
    }
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }

    let universe = Arc::new(Universe::standard());
    let directory = Arc::new(
        HttpUserDirectory::new(config.api_url.clone()).context("building API client")?,
    );
    let subscriptions = SubscriptionService::new(Arc::clone(&universe), directory);

    match cli.command {
        Commands::Watch { email } => {
            let watchlist = match email {
                Some(email) => Some(
                    subscriptions
                        .subscriptions(&email)
                        .await
                        .with_context(|| format!("loading watchlist for {email}"))?
                        .iter()
                        .cloned()
                        .collect::<BTreeSet<Symbol>>(),
                ),
                None => None,
            };
            watch(&config, &universe, watchlist).await?;
        }
        Commands::Subscribe { email, ticker } => {
            let set = subscriptions.subscribe(&email, &ticker).await?;
            print_watchlist(&email, &set.to_vec());
        }
        Commands::Unsubscribe { email, ticker } => {
            let set = subscriptions.unsubscribe(&email, &ticker).await?;
            print_watchlist(&email, &set.to_vec());
        }
        Commands::List { email } => {
            let set = subscriptions.subscriptions(&email).await?;
            print_watchlist(&email, &set.to_vec());
        }
    }

    Ok(())
}

async fn watch(
    config: &ClientConfig,
    universe: &Universe,
    watchlist: Option<BTreeSet<Symbol>>,
) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let (event_tx, mut event_rx) = mpsc::channel::<FeedEvent>(64);
    let client = FeedClient::new(FeedClientConfig::from(config), event_tx, cancel.clone());
    let client_handle = tokio::spawn(client.run());

    let shown: Vec<&str> = universe
        .symbols()
        .filter(|s| watchlist.as_ref().is_none_or(|w| w.contains(*s)))
        .collect();
    tracing::info!(symbols = ?shown, "Watching");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                cancel.cancel();
                break;
            }
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                match event {
                    FeedEvent::Connected => tracing::info!(url = %config.feed_url, "Connected"),
                    FeedEvent::Disconnected => tracing::warn!("Disconnected, state cleared"),
                    FeedEvent::Reconnecting { attempt, delay } => tracing::info!(
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Reconnecting"
                    ),
                    FeedEvent::Snapshot { state, .. } => render(&state, universe, &shown),
                }
            }
        }
    }

    client_handle
        .await
        .context("feed client task panicked")?
        .context("feed client stopped")?;
    Ok(())
}

fn render(state: &ClientState, universe: &Universe, shown: &[&str]) {
    for symbol in shown {
        let Some(price) = state.price_state(symbol) else {
            continue;
        };
        let name = universe.get(symbol).map_or("", |i| i.name.as_str());
        let history = state
            .history(symbol)
            .map(|h| h.iter().map(|p| format_price(*p)).collect::<Vec<_>>().join(" "))
            .unwrap_or_default();
        println!(
            "{symbol:<5} {name:<22} {:>8} {:>+8} | {history}",
            format_price(price.price),
            price.delta.round_dp(2),
        );
    }
    println!();
}

fn print_watchlist(email: &str, symbols: &[Symbol]) {
    if symbols.is_empty() {
        println!("{}: (empty)", email.trim());
    } else {
        println!("{}: {}", email.trim(), symbols.join(", "));
    }
}
