//! Sports odds arbitrage engine entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use rust_decimal::Decimal;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use odds_arb::api::{create_router, AppState};
use odds_arb::arbitrage::{
    allocate_stakes_with_precision, kelly_stake, DetectorConfig, OpportunityDetector,
    RefreshTarget, Scanner,
};
use odds_arb::config::Config;
use odds_arb::metrics;
use odds_arb::monitor::{refresh_opportunity, Alert, spawn_cleanup, Monitor, MonitorSettings, Subject};
use odds_arb::odds::{BookmakerRegistry, MarketKey};
use odds_arb::preferences::{validate_stake, UserArbitragePreferences};
use odds_arb::provider::OddsApiClient;
use odds_arb::rate_limit::RateLimiter;
use odds_arb::utils::shutdown_signal;

/// Cross-bookmaker sports odds arbitrage engine.
#[derive(Parser, Debug)]
#[command(name = "odds-arb")]
#[command(about = "Detects sports betting arbitrage across bookmakers and sizes the stakes")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format: "text" or "json".
    #[arg(long, global = true, env = "LOG_FORMAT", default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the monitor and HTTP server (default).
    Run {
        /// HTTP server port; overrides PORT.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Fetch odds once and print every opportunity.
    Scan {
        /// Sport keys; overrides SPORTS.
        #[arg(short, long, value_delimiter = ',')]
        sports: Vec<String>,

        /// Market keys; overrides MARKETS.
        #[arg(short, long, value_delimiter = ',')]
        markets: Vec<MarketKey>,

        /// Total stake; overrides STAKE_AMOUNT.
        #[arg(long)]
        stake: Option<Decimal>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Re-check one event against fresh odds.
    Refresh {
        /// Sport key of the event.
        #[arg(long)]
        sport: String,

        /// Market key.
        #[arg(short, long, default_value = "h2h")]
        market: MarketKey,

        /// Home team, as quoted by the provider.
        #[arg(long)]
        home: String,

        /// Away team, as quoted by the provider.
        #[arg(long)]
        away: String,

        /// Total stake; overrides STAKE_AMOUNT.
        #[arg(long)]
        stake: Option<Decimal>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Split a stake across winning odds.
    Allocate {
        /// Decimal odds, one per outcome.
        #[arg(required = true, num_args = 1..)]
        prices: Vec<f64>,

        /// Total stake.
        #[arg(short, long, default_value = "1000")]
        stake: Decimal,

        /// Decimal places for amounts.
        #[arg(long, default_value_t = 2)]
        precision: u32,
    },

    /// Kelly stake for a single value bet.
    Kelly {
        /// Decimal odds offered.
        odds: f64,

        /// Estimated true win probability (0-1).
        probability: f64,

        /// Bankroll.
        #[arg(short, long, default_value = "1000")]
        bankroll: Decimal,
    },

    /// Check configuration validity.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments; .env may supply LOG_FORMAT
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("odds_arb=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let json_logs = args.log_format.eq_ignore_ascii_case("json");

    tracing_subscriber::registry()
        .with(filter)
        .with(json_logs.then(|| fmt::layer().json()))
        .with((!json_logs).then(fmt::layer))
        .init();

    // Handle subcommands
    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(),
        Some(Command::Allocate {
            prices,
            stake,
            precision,
        }) => cmd_allocate(&prices, stake, precision),
        Some(Command::Kelly {
            odds,
            probability,
            bankroll,
        }) => cmd_kelly(odds, probability, bankroll),
        Some(Command::Scan {
            sports,
            markets,
            stake,
            json,
        }) => cmd_scan(sports, markets, stake, json).await,
        Some(Command::Refresh {
            sport,
            market,
            home,
            away,
            stake,
            json,
        }) => cmd_refresh(RefreshTarget::new(sport, market, home, away), stake, json).await,
        Some(Command::Run { port }) => cmd_run(port).await,
        None => cmd_run(None).await,
    }
}

/// Load and validate configuration, logging failures.
fn load_config() -> anyhow::Result<Config> {
    let config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    Ok(config)
}

fn build_scanner(config: &Config) -> Scanner {
    Scanner::new(OpportunityDetector::new(
        DetectorConfig {
            near_arb_ceiling: config.near_arb_ceiling,
            money_precision: config.money_precision,
        },
        Arc::new(BookmakerRegistry::builtin().clone()),
    ))
}

/// Check configuration validity.
fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("ODDS ARB - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    print!("Validating preferences... ");
    let prefs = match UserArbitragePreferences::from_config(&config) {
        Ok(p) => {
            println!("OK");
            p
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Preferences validation failed"));
        }
    };

    let registry = BookmakerRegistry::builtin();
    let mut bookmakers: Vec<&str> = prefs.eligible_bookmakers.iter().map(String::as_str).collect();
    bookmakers.sort_unstable();

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Provider: {}", config.odds_api_url);
    println!("  Regions: {}", config.odds_regions);
    println!("  Sports: {}", config.sport_list().join(", "));
    println!("  Markets: {}", config.markets);
    println!("  Stake: {}", prefs.stake_amount);
    println!("  Min Profit: {}%", prefs.min_profit_threshold_percent);
    println!("  Scan Interval: {}s", config.scan_interval_secs);
    println!("  Subjects: {}", config.subject_list().join(", "));
    println!("  Bookmakers:");
    for id in bookmakers {
        match registry.get(id) {
            Some(info) => println!("    - {} ({}, {} reliability)", id, info.kind, info.reliability),
            None => println!("    - {} (not in registry)", id),
        }
    }
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Print a stake split.
fn cmd_allocate(prices: &[f64], stake: Decimal, precision: u32) -> anyhow::Result<()> {
    validate_stake(stake)?;
    let allocation = allocate_stakes_with_precision(prices, stake, precision)?;

    println!("Total implied probability: {:.4}", allocation.total_implied);
    for (price, leg_stake) in prices.iter().zip(&allocation.stakes) {
        println!("  @ {:<6} stake {}", price, leg_stake);
    }
    println!("Guaranteed profit: {} ({}%)", allocation.guaranteed_profit, allocation.roi_percent);
    println!("Worst-case payout: {}", allocation.worst_case_payout);
    println!("Realized profit:   {}", allocation.realized_profit());

    Ok(())
}

/// Print Kelly advice.
fn cmd_kelly(odds: f64, probability: f64, bankroll: Decimal) -> anyhow::Result<()> {
    let advice = kelly_stake(odds, probability, bankroll)?;

    match advice.explanation {
        Some(reason) => println!("{} (Kelly fraction {:.4})", reason, advice.fraction),
        None => {
            println!("Kelly fraction: {:.4} ({}% of bankroll)", advice.fraction, advice.percentage);
            println!("Stake: {}", advice.stake);
            println!("Expected value: {}", advice.expected_value);
        }
    }

    Ok(())
}

/// Fetch once and print opportunities.
async fn cmd_scan(
    sports: Vec<String>,
    markets: Vec<MarketKey>,
    stake: Option<Decimal>,
    json: bool,
) -> anyhow::Result<()> {
    let mut config = load_config()?;
    if let Some(stake) = stake {
        config.stake_amount = stake;
    }

    let sports = if sports.is_empty() { config.sport_list() } else { sports };
    let markets = if markets.is_empty() {
        config.market_list().map_err(|e| anyhow::anyhow!(e))?
    } else {
        markets
    };

    let prefs = UserArbitragePreferences::from_config(&config)?;
    let client = OddsApiClient::new(&config)?;
    let scanner = build_scanner(&config);

    let batches = client.fetch_batches(&sports, &markets).await;
    let opportunities = scanner.scan(&batches, &prefs);

    if json {
        println!("{}", serde_json::to_string_pretty(&opportunities)?);
    } else if opportunities.is_empty() {
        println!("No arbitrage opportunities found.");
    } else {
        for opportunity in &opportunities {
            println!("{}", opportunity);
        }
    }

    Ok(())
}

/// Re-fetch one event's odds and report whether its opportunity still holds.
async fn cmd_refresh(target: RefreshTarget, stake: Option<Decimal>, json: bool) -> anyhow::Result<()> {
    let mut config = load_config()?;
    if let Some(stake) = stake {
        config.stake_amount = stake;
    }

    let prefs = UserArbitragePreferences::from_config(&config)?;
    let client = OddsApiClient::new(&config)?;
    let scanner = build_scanner(&config);

    let outcome = refresh_opportunity(&client, &scanner, &target, &prefs).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", outcome);
    }

    Ok(())
}

/// Run the monitor loop and HTTP server.
async fn cmd_run(port_override: Option<u16>) -> anyhow::Result<()> {
    info!("Loading configuration...");
    let mut config = load_config()?;
    if let Some(port) = port_override {
        config.port = port;
    }

    let prefs = UserArbitragePreferences::from_config(&config)?;
    let markets = config.market_list().map_err(|e| anyhow::anyhow!(e))?;

    info!("Configuration loaded successfully");
    info!("Sports: {}", config.sports);
    info!("Markets: {}", config.markets);
    info!("Stake: {}", prefs.stake_amount);
    info!("Min profit: {}%", prefs.min_profit_threshold_percent);

    // Install the Prometheus recorder before any metric is touched
    let prometheus = PrometheusBuilder::new().install_recorder()?;
    metrics::init_metrics();

    let client = Arc::new(OddsApiClient::new(&config)?);
    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit_requests,
        config.rate_limit_window(),
    ));

    let monitor = Arc::new(Monitor::new(
        Arc::clone(&client),
        build_scanner(&config),
        MonitorSettings {
            sports: config.sport_list(),
            markets,
            interval: config.scan_interval(),
            dedup_window: config.dedup_window(),
        },
    ));

    // Create app state
    let app_state = AppState::new(monitor.stats(), Arc::clone(&limiter), config.money_precision)
        .with_prometheus(prometheus);

    // Start HTTP server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let router = create_router(app_state.clone());
    let (stop_tx, stop_rx) = watch::channel(false);

    let mut server_stop = stop_rx.clone();
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                server_stop.changed().await.ok();
            })
            .await
    });

    // Alert sink
    let (alert_tx, mut alert_rx) = mpsc::channel::<Alert>(256);
    let sink_handle = tokio::spawn(async move {
        while let Some(alert) = alert_rx.recv().await {
            info!(subject = %alert.subject, "ARBITRAGE: {}", alert.opportunity);
        }
    });

    let subjects: Vec<Subject> = config
        .subject_list()
        .into_iter()
        .map(|id| Subject {
            id,
            prefs: prefs.clone(),
        })
        .collect();
    if subjects.is_empty() {
        warn!("No monitor subjects configured; only the HTTP API will run");
    }

    let mut handles = monitor.spawn_all(subjects, alert_tx, stop_rx.clone());
    handles.push(spawn_cleanup(
        Arc::clone(client.cache()),
        limiter,
        config.odds_cache_ttl(),
        stop_rx,
    ));
    app_state.set_ready(true);

    info!("========================================");
    info!("ODDS ARBITRAGE MONITOR STARTED");
    info!("========================================");

    shutdown_signal().await;
    app_state.set_ready(false);
    stop_tx.send(true).ok();

    for handle in handles {
        if let Err(e) = handle.await {
            warn!("Monitor task ended abnormally: {}", e);
        }
    }
    sink_handle.await.ok();
    server_handle.await??;

    info!("Shutdown complete");
    Ok(())
}
