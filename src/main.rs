//! eatout-rs — Rust rewrite of the Eat Out to Help Out restaurant finder.
//!
//! Downloads the participating-restaurant GeoJSON feed with HTTP
//! conditional-caching semantics (If-Modified-Since / 304), keeps the last
//! good payload on disk, and answers viewport queries against it. The map and
//! web view of the mobile app are replaced by a console presentation of the
//! same finder boundary.

#![warn(clippy::all)]

mod cache;
mod cli;
mod config;
mod feed;
mod finder;
mod handoff;
mod location;
mod map;
mod shutdown;
mod types;

use std::io::IsTerminal;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use indicatif::ProgressBar;
use tracing_subscriber::EnvFilter;

use cache::{CacheStore, SqliteCacheStore};
use cli::Command;
use config::FeedConfig;
use feed::FeedFetcher;
use finder::{
    DownloadStateUi, ErrorNotice, Finder, FinderItem, FinderOutlet, TrackingControlUi,
};
use location::LocationGateway;
use map::{CoordinateRegion, CoordinateSpan, GeoCoordinate};

/// Console implementation of the presentation boundary.
///
/// The mobile app renders these callbacks as a map, an alert and a tracking
/// button; here they become stdout lines plus a download spinner.
struct ConsoleOutlet {
    no_progress_bar: bool,
    spinner: Mutex<Option<ProgressBar>>,
    items: Mutex<Vec<FinderItem>>,
}

impl ConsoleOutlet {
    fn new(no_progress_bar: bool) -> Self {
        Self {
            no_progress_bar,
            spinner: Mutex::new(None),
            items: Mutex::new(Vec::new()),
        }
    }

    /// The most recently shown item set.
    fn items(&self) -> Vec<FinderItem> {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn clear_spinner(&self) {
        if let Some(spinner) = self
            .spinner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            spinner.finish_and_clear();
        }
    }
}

impl FinderOutlet for ConsoleOutlet {
    fn show_items(&self, items: Vec<FinderItem>) {
        println!("Loaded {} participating restaurants", items.len());
        *self.items.lock().unwrap_or_else(|e| e.into_inner()) = items;
    }

    fn show_error(&self, notice: ErrorNotice) {
        self.clear_spinner();
        eprintln!("{}: {}", notice.title, notice.message);
        eprintln!("Run `eatout-rs sync` to try again.");
    }

    fn show_url(&self, url: reqwest::Url, title: &str) {
        println!("{title}: {url}");
    }

    fn show_download_state(&self, state: DownloadStateUi) {
        match state {
            DownloadStateUi::InProgress => {
                if self.no_progress_bar || !std::io::stderr().is_terminal() {
                    return;
                }
                let spinner = ProgressBar::new_spinner();
                spinner.set_message("Downloading restaurant feed...");
                spinner.enable_steady_tick(Duration::from_millis(120));
                *self.spinner.lock().unwrap_or_else(|e| e.into_inner()) = Some(spinner);
            }
            DownloadStateUi::Finished => self.clear_spinner(),
        }
    }

    fn show_tracking_control(&self, control: TrackingControlUi) {
        match control {
            TrackingControlUi::Hidden => {}
            TrackingControlUi::Enabled => {
                println!("Location permission undecided; run with --location allow to enable tracking.");
            }
            TrackingControlUi::Disabled => {
                println!("Location permission denied; tracking unavailable.");
            }
        }
    }

    fn show_user_tracking(&self) {
        println!("Location tracking enabled.");
    }
}

struct App {
    finder: Arc<Finder>,
    outlet: Arc<ConsoleOutlet>,
}

/// Wire the dependency graph: cache store → fetcher → finder, with the
/// console outlet on the presentation side and the configured answer standing
/// in for the platform permission dialog.
async fn build_app(config: &FeedConfig) -> anyhow::Result<App> {
    let cache: Arc<dyn CacheStore> =
        Arc::new(SqliteCacheStore::open(&config.cache_directory).await?);
    let fetcher = Arc::new(FeedFetcher::new(
        config.feed_url.clone(),
        cache.clone(),
        config.conditional,
    )?);

    let (location, mut prompts) = LocationGateway::new();
    let location = Arc::new(location);
    let policy_level = config.location.authorization_level();
    {
        let location = Arc::clone(&location);
        tokio::spawn(async move {
            while prompts.recv().await.is_some() {
                location.authorization_changed(policy_level);
            }
        });
    }
    // Initial platform callback so non-prompting queries resolve immediately.
    location.authorization_changed(policy_level);
    tracing::debug!(status = ?location.status(), "location gateway initialized");

    let outlet = Arc::new(ConsoleOutlet::new(config.no_progress_bar));
    let finder = Arc::new(Finder::new(fetcher, cache, location, outlet.clone()));
    Ok(App { finder, outlet })
}

/// Give detached presentation tasks (tracking status) a beat to print before
/// the process exits.
async fn drain_presentation() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

async fn run_sync(args: cli::SyncArgs) -> anyhow::Result<()> {
    let config = FeedConfig::from_args(&args.feed)?;
    let app = build_app(&config).await?;

    // A sync run carries the permission answer on its command line, which is
    // the console version of tapping the tracking button.
    app.finder.update_location();
    app.finder.load().await;
    drain_presentation().await;

    if !app.finder.has_loaded() {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_watch(args: cli::WatchArgs) -> anyhow::Result<()> {
    let config = FeedConfig::from_args(&args.feed)?;
    let app = build_app(&config).await?;
    let shutdown_token = shutdown::cancel_on_ctrl_c();

    app.finder.update_ui();

    loop {
        app.finder.load().await;

        if shutdown_token.is_cancelled() {
            tracing::info!("Shutdown requested, exiting...");
            break;
        }
        tracing::info!("Waiting {} seconds...", args.interval);
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(args.interval)) => {}
            _ = shutdown_token.cancelled() => {
                tracing::info!("Shutdown during wait, exiting...");
                break;
            }
        }
    }
    Ok(())
}

async fn run_nearby(args: cli::NearbyArgs) -> anyhow::Result<()> {
    let config = FeedConfig::from_args(&args.feed)?;
    let app = build_app(&config).await?;

    app.finder.load().await;
    if !app.finder.has_loaded() {
        std::process::exit(1);
    }

    if args.span > map::ZOOM_SPAN_MAX {
        println!(
            "Viewport span {} is wider than the zoom-in threshold {}; zoom in to see restaurants.",
            args.span,
            map::ZOOM_SPAN_MAX
        );
        return Ok(());
    }

    let viewport = CoordinateRegion::new(
        GeoCoordinate {
            latitude: args.lat,
            longitude: args.lon,
        },
        CoordinateSpan {
            latitude_delta: args.span,
            longitude_delta: args.span,
        },
    );
    let items = app.outlet.items();
    let delta = map::reconcile(viewport, &items, &[]);

    if delta.is_empty() {
        println!("No restaurants inside this viewport.");
    } else {
        println!(
            "{} restaurants near ({}, {}):",
            delta.to_add.len(),
            args.lat,
            args.lon
        );
        for item in &delta.to_add {
            println!("  {} ({})", item.name, item.postcode);
        }
    }

    if let Some(name) = &args.select {
        match delta
            .to_add
            .iter()
            .find(|item| item.name.eq_ignore_ascii_case(name))
        {
            Some(item) => app.finder.did_select(item),
            None => println!("'{name}' is not inside this viewport."),
        }
    }
    Ok(())
}

async fn run_status(args: cli::StatusArgs) -> anyhow::Result<()> {
    let directory = config::cache_directory(&args.cache);

    if !directory.join("cache.db").exists() {
        println!("No cache found at {}", directory.display());
        println!("Run a sync first to create it.");
        return Ok(());
    }

    let store = SqliteCacheStore::open(&directory).await?;
    let summary = store.summary().await?;

    println!("Cache: {}", directory.display());
    println!();
    match &summary.validator {
        Some(validator) => {
            println!("Validator (Last-Modified): {validator}");
            if let Some(at) = summary.validator_updated_at {
                println!("  stored {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
            }
        }
        None => println!("Validator: <none> (next fetch is unconditional)"),
    }
    match summary.payload_bytes {
        Some(bytes) => println!("Cached payload: {bytes} bytes"),
        None => println!("Cached payload: <none>"),
    }
    println!();
    println!("Fetches recorded: {}", summary.total_runs);
    if !summary.recent_runs.is_empty() {
        println!("Recent:");
        for run in &summary.recent_runs {
            match &run.detail {
                Some(detail) => println!(
                    "  {}  {} - {}",
                    run.at.format("%Y-%m-%d %H:%M:%S"),
                    run.outcome,
                    detail
                ),
                None => println!("  {}  {}", run.at.format("%Y-%m-%d %H:%M:%S"), run.outcome),
            }
        }
    }
    Ok(())
}

async fn run_reset_cache(args: cli::ResetCacheArgs) -> anyhow::Result<()> {
    let directory = config::cache_directory(&args.cache);

    if !directory.join("cache.db").exists() {
        println!("No cache found at {}", directory.display());
        return Ok(());
    }

    if !args.yes {
        println!("This will delete the cached feed and validator under:");
        println!("  {}", directory.display());
        println!();
        print!("Are you sure? [y/N] ");
        use std::io::Write;
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let store = SqliteCacheStore::open(&directory).await?;
    store.clear().await?;
    println!("Cache cleared.");
    Ok(())
}

fn run_search(args: cli::SearchArgs) {
    let url = handoff::search_url(&args.name, args.postcode.as_deref().unwrap_or(""));
    println!("{url}");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    let filter = match cli.log_level {
        types::LogLevel::Debug => "debug",
        types::LogLevel::Info => "info",
        types::LogLevel::Warn => "warn",
        types::LogLevel::Error => "error",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    match cli.command {
        Command::Sync(args) => run_sync(args).await,
        Command::Watch(args) => run_watch(args).await,
        Command::Nearby(args) => run_nearby(args).await,
        Command::Status(args) => run_status(args).await,
        Command::ResetCache(args) => run_reset_cache(args).await,
        Command::Search(args) => {
            run_search(args);
            Ok(())
        }
    }
}
