//! Library interface for plugin-feed
//!
//! Builds release feeds for software plugins from registry pages, tag browsers and
//! vendor changelogs. The binary is a thin CLI over [`parser::load_all`] and
//! [`render::render`].

pub mod cache;
pub mod changelog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod model;
pub mod parser;
pub mod reconcile;
pub mod render;
pub mod tags;
pub mod version;

// Re-export commonly used types
pub use cache::{CacheStore, DiskCache, MemoryCache};
pub use config::{Config, OutputFormat, OutputLimit, StabilityFilter};
pub use error::{FeedError, Result};
pub use fetch::Fetcher;
pub use model::{PluginProfile, Release, ReleaseSet, Stability};
pub use parser::{Parser, Variant, load_all, load_each};
