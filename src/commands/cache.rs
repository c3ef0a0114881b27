use colored::Colorize;
use plugin_feed::cache::CacheStore;
use plugin_feed::config::Config;
use plugin_feed::error::Result;

pub fn cache_clear(config: &Config) -> Result<()> {
    let cache = super::disk_cache(config);
    let removed = cache.clear_expired()?;

    println!(
        "{} Removed {} expired entries from {}",
        "✓".green().bold(),
        removed.to_string().bold(),
        cache.dir().display().to_string().cyan()
    );
    Ok(())
}
