//! Command implementations for the plugin-feed CLI
//!
//! - **feed**: render feeds to stdout or a directory
//! - **releases**: human-readable release listing
//! - **cache**: page cache maintenance

pub mod cache;
pub mod feed;
pub mod releases;

pub use cache::cache_clear;
pub use feed::feed;
pub use releases::releases;

use indicatif::{ProgressBar, ProgressStyle};
use plugin_feed::cache::{CacheStore, DiskCache, MemoryCache};
use plugin_feed::config::Config;
use plugin_feed::error::Result;
use plugin_feed::fetch::Fetcher;
use std::sync::Arc;

/// Disk cache at the configured location
pub(crate) fn disk_cache(config: &Config) -> DiskCache {
    config
        .cache_dir
        .clone()
        .map(DiskCache::new)
        .unwrap_or_default()
}

pub(crate) fn open_fetcher(config: &Config, no_cache: bool) -> Result<Fetcher> {
    let cache: Arc<dyn CacheStore> = if no_cache {
        Arc::new(MemoryCache::default())
    } else {
        Arc::new(disk_cache(config))
    };
    Fetcher::new(cache, config)
}

/// Spinner on stderr, hidden when stderr is not a terminal
pub(crate) fn spinner(message: String) -> ProgressBar {
    if !std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
