use std::path::PathBuf;

use reqwest::Url;

use crate::cli;
use crate::types::LocationPolicy;

/// Where the participating-restaurant feed is published.
pub const DEFAULT_FEED_URL: &str =
    "https://beny23.github.io/static-distance-app/restaurants.geojson.gz";

/// Resolved configuration for commands that touch the network.
#[derive(Debug)]
pub struct FeedConfig {
    pub feed_url: Url,
    pub cache_directory: PathBuf,
    /// False when `--full` asked for an unconditional fetch.
    pub conditional: bool,
    pub no_progress_bar: bool,
    pub location: LocationPolicy,
}

impl FeedConfig {
    pub fn from_args(args: &cli::FeedArgs) -> anyhow::Result<Self> {
        let feed_url = Url::parse(&args.feed_url)
            .map_err(|e| anyhow::anyhow!("invalid feed URL '{}': {}", args.feed_url, e))?;

        Ok(Self {
            feed_url,
            cache_directory: cache_directory(&args.cache),
            conditional: !args.full,
            no_progress_bar: args.no_progress_bar,
            location: args.location,
        })
    }
}

/// Resolve the cache directory argument, expanding a leading tilde.
pub fn cache_directory(args: &cli::CacheArgs) -> PathBuf {
    expand_tilde(&args.cache_directory)
}

/// Expand ~ to the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn feed_args(argv: &[&str]) -> cli::FeedArgs {
        let mut full_argv = vec!["eatout-rs", "sync"];
        full_argv.extend_from_slice(argv);
        let cli = cli::Cli::try_parse_from(full_argv).unwrap();
        match cli.command {
            cli::Command::Sync(args) => args.feed,
            other => panic!("expected sync, got {other:?}"),
        }
    }

    #[test]
    fn test_expand_tilde_with_home() {
        let result = expand_tilde("~/feeds");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(result, home.join("feeds"));
        }
    }

    #[test]
    fn test_expand_tilde_no_prefix() {
        assert_eq!(
            expand_tilde("/absolute/path"),
            PathBuf::from("/absolute/path")
        );
        assert_eq!(expand_tilde("relative/path"), PathBuf::from("relative/path"));
    }

    #[test]
    fn test_from_args_defaults() {
        let config = FeedConfig::from_args(&feed_args(&[])).unwrap();
        assert_eq!(config.feed_url.as_str(), DEFAULT_FEED_URL);
        assert!(config.conditional);
        assert!(!config.no_progress_bar);
    }

    #[test]
    fn test_from_args_full_disables_conditional() {
        let config = FeedConfig::from_args(&feed_args(&["--full"])).unwrap();
        assert!(!config.conditional);
    }

    #[test]
    fn test_from_args_rejects_bad_url() {
        let result = FeedConfig::from_args(&feed_args(&["--feed-url", "not a url"]));
        assert!(result.is_err());
    }
}
