use clap::{Args, Parser, Subcommand};

use crate::config::DEFAULT_FEED_URL;
use crate::types::{LocationPolicy, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "eatout-rs",
    about = "Find Eat Out to Help Out restaurants from the command line"
)]
pub struct Cli {
    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download the restaurant feed and refresh the local cache
    Sync(SyncArgs),
    /// Run sync repeatedly, waiting between runs
    Watch(WatchArgs),
    /// List cached restaurants inside a map viewport
    Nearby(NearbyArgs),
    /// Show cache state and recent fetch history
    Status(StatusArgs),
    /// Delete the cached feed, its validator and the fetch log
    ResetCache(ResetCacheArgs),
    /// Print the web-search handoff URL for a restaurant
    Search(SearchArgs),
}

#[derive(Args, Debug)]
pub struct CacheArgs {
    /// Directory for the cached feed and its metadata
    #[arg(long, default_value = "~/.eatout-rs")]
    pub cache_directory: String,
}

#[derive(Args, Debug)]
pub struct FeedArgs {
    #[command(flatten)]
    pub cache: CacheArgs,

    /// Feed URL
    #[arg(long, default_value = DEFAULT_FEED_URL)]
    pub feed_url: String,

    /// Ignore the stored validator and fetch unconditionally
    #[arg(long)]
    pub full: bool,

    /// Disable the download spinner
    #[arg(long)]
    pub no_progress_bar: bool,

    /// Answer to the location permission prompt on this headless run
    #[arg(long, value_enum, default_value = "ask")]
    pub location: LocationPolicy,
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub feed: FeedArgs,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub feed: FeedArgs,

    /// Seconds between runs
    #[arg(long, default_value_t = 900)]
    pub interval: u64,
}

#[derive(Args, Debug)]
pub struct NearbyArgs {
    #[command(flatten)]
    pub feed: FeedArgs,

    /// Viewport centre latitude
    #[arg(
        long,
        allow_negative_numbers = true,
        default_value_t = crate::map::CoordinateRegion::UK.center.latitude
    )]
    pub lat: f64,

    /// Viewport centre longitude
    #[arg(
        long,
        allow_negative_numbers = true,
        default_value_t = crate::map::CoordinateRegion::UK.center.longitude
    )]
    pub lon: f64,

    /// Latitude span of the viewport, in degrees
    #[arg(long, default_value_t = crate::map::CoordinateSpan::MIDDLE.latitude_delta)]
    pub span: f64,

    /// Print the web handoff URL for the named restaurant in the viewport
    #[arg(long)]
    pub select: Option<String>,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub cache: CacheArgs,
}

#[derive(Args, Debug)]
pub struct ResetCacheArgs {
    #[command(flatten)]
    pub cache: CacheArgs,

    /// Skip confirmation
    #[arg(long)]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Restaurant name
    pub name: String,

    /// Postcode, to narrow the search
    pub postcode: Option<String>,
}
