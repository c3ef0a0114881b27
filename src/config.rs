//! Runtime configuration, read once from the environment.
//!
//! | Variable                | Meaning                                  | Default |
//! |-------------------------|------------------------------------------|---------|
//! | `OUTPUT_LIMIT`          | releases per feed, `0` for unlimited     | 25      |
//! | `RELEASE_STABILITY`     | comma list of stabilities, or `any`      | `any`   |
//! | `OUTPUT_FORMAT`         | `atom`, `rss` or `json`                  | `atom`  |
//! | `PLUGIN_FEED_CACHE_TTL` | seconds a fetched page stays fresh       | 3600    |
//! | `PLUGIN_FEED_CACHE_DIR` | where the disk cache lives               | XDG     |

use crate::cache::DEFAULT_TTL;
use crate::error::{FeedError, Result};
use crate::fetch::REQUEST_TIMEOUT;
use crate::model::Stability;
use regex::Regex;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_OUTPUT_LIMIT: usize = 25;

const STABILITY_TAGS: &[&str] = &["stable", "alpha", "beta", "rc"];

/// Maximum number of releases in a feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLimit {
    Unlimited,
    Count(usize),
}

impl OutputLimit {
    pub fn from_count(count: usize) -> Self {
        if count == 0 {
            OutputLimit::Unlimited
        } else {
            OutputLimit::Count(count)
        }
    }
}

impl Default for OutputLimit {
    fn default() -> Self {
        OutputLimit::Count(DEFAULT_OUTPUT_LIMIT)
    }
}

impl FromStr for OutputLimit {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("false") {
            return Ok(OutputLimit::Unlimited);
        }
        s.parse()
            .map(OutputLimit::from_count)
            .map_err(|_| FeedError::Config(format!("OUTPUT_LIMIT must be a number, got {:?}", s)))
    }
}

/// Which stabilities end up in the feed
#[derive(Debug, Clone, Default)]
pub enum StabilityFilter {
    #[default]
    Any,
    Only(Regex),
}

impl StabilityFilter {
    /// Parse `any` or a comma separated list such as `stable,rc`
    pub fn parse(list: &str) -> Result<Self> {
        let tags: Vec<String> = list
            .split(',')
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        if tags.is_empty() || tags.iter().any(|t| t == "any") {
            return Ok(StabilityFilter::Any);
        }

        if let Some(unknown) = tags.iter().find(|t| !STABILITY_TAGS.contains(&t.as_str())) {
            return Err(FeedError::Config(format!(
                "unknown stability {:?}, expected one of: any, {}",
                unknown,
                STABILITY_TAGS.join(", ")
            )));
        }

        let pattern = Regex::new(&format!(r"^(?:{})(?:\.\d+)?$", tags.join("|")))?;
        Ok(StabilityFilter::Only(pattern))
    }

    pub fn matches(&self, stability: &Stability) -> bool {
        match self {
            StabilityFilter::Any => true,
            StabilityFilter::Only(pattern) => pattern.is_match(&stability.to_string()),
        }
    }
}

/// Output serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Atom,
    Rss,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Atom => "atom",
            OutputFormat::Rss => "rss",
            OutputFormat::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "atom" => Ok(OutputFormat::Atom),
            "rss" | "rss2" => Ok(OutputFormat::Rss),
            "json" => Ok(OutputFormat::Json),
            other => Err(FeedError::Config(format!(
                "OUTPUT_FORMAT must be atom, rss or json, got {:?}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub output_limit: OutputLimit,
    pub stability: StabilityFilter,
    pub format: OutputFormat,
    pub cache_ttl: Duration,
    pub cache_dir: Option<PathBuf>,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_limit: OutputLimit::default(),
            stability: StabilityFilter::Any,
            format: OutputFormat::Atom,
            cache_ttl: DEFAULT_TTL,
            cache_dir: None,
            timeout: REQUEST_TIMEOUT,
        }
    }
}

impl Config {
    /// Read the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any variable source; unset variables keep defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(limit) = lookup("OUTPUT_LIMIT") {
            config.output_limit = limit.parse()?;
        }
        if let Some(stability) = lookup("RELEASE_STABILITY") {
            config.stability = StabilityFilter::parse(&stability)?;
        }
        if let Some(format) = lookup("OUTPUT_FORMAT") {
            config.format = format.parse()?;
        }
        if let Some(ttl) = lookup("PLUGIN_FEED_CACHE_TTL") {
            let secs = ttl.trim().parse().map_err(|_| {
                FeedError::Config(format!("PLUGIN_FEED_CACHE_TTL must be seconds, got {:?}", ttl))
            })?;
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(dir) = lookup("PLUGIN_FEED_CACHE_DIR").filter(|d| !d.trim().is_empty()) {
            config.cache_dir = Some(PathBuf::from(dir));
        }

        Ok(config)
    }
}
