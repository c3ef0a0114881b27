//! Parser variants and the release view handed to the feed writer.
//!
//! Every vendor family implements [`ReleaseSource`]:
//!
//! - **registry**: registry profile + changelog + tag browser, reconciled
//! - **feed**: one vendor Atom/RSS feed (or HTML page) filtered by a title pattern
//! - **marketplace**: marketplace item page with per-release changelog entries
//! - **text**: plain-text changelog file
//!
//! [`Variant::for_plugin`] picks the variant for a plugin id; ids without a vendor
//! entry are registry plugins. [`Parser::load`] runs it once and keeps the result.

pub mod bespoke;
pub mod feed;
pub mod registry;

use crate::config::{Config, OutputLimit, StabilityFilter};
use crate::error::{FeedError, Result};
use crate::fetch::{Fetcher, PluginFetcher, SourceMap};
use crate::model::{PluginProfile, Release, ReleaseSet};
use crate::version::classify_stability;
use chrono::{DateTime, Utc};
use std::future::Future;

pub use bespoke::{Marketplace, PlainTextChangelog};
pub use feed::GenericFeed;
pub use registry::Registry;

/// What a variant produces: feed metadata and ordered releases
#[derive(Debug, Clone)]
pub struct Loaded {
    pub profile: PluginProfile,
    pub releases: ReleaseSet,
}

impl Loaded {
    /// A profile without releases, used when a required source is missing
    pub fn empty(profile: PluginProfile) -> Self {
        Self {
            profile,
            releases: ReleaseSet::new(),
        }
    }
}

/// One way of turning a vendor's pages into releases
pub trait ReleaseSource {
    /// Source names and URL templates this variant fetches
    fn sources(&self) -> SourceMap;

    /// Fetch and parse. A missing source yields fewer releases, not an error.
    fn load(&self, fetcher: PluginFetcher<'_>) -> impl Future<Output = Result<Loaded>> + Send;
}

#[derive(Debug, Clone)]
pub enum Variant {
    Registry(Registry),
    Feed(GenericFeed),
    Marketplace(Marketplace),
    PlainText(PlainTextChangelog),
}

impl Variant {
    /// Static vendor lookup; unknown plugins come from the registry
    pub fn for_plugin(plugin: &str) -> Self {
        match plugin {
            "gravityforms" => Variant::Feed(GenericFeed::gravity_forms()),
            "elementor-pro" => Variant::Feed(GenericFeed::elementor_pro()),
            "revslider" => Variant::Marketplace(Marketplace::slider_revolution()),
            "searchwp" => Variant::PlainText(PlainTextChangelog::searchwp()),
            _ => Variant::Registry(Registry::default()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Variant::Registry(_) => "registry",
            Variant::Feed(_) => "feed",
            Variant::Marketplace(_) => "marketplace",
            Variant::PlainText(_) => "text",
        }
    }
}

impl ReleaseSource for Variant {
    fn sources(&self) -> SourceMap {
        match self {
            Variant::Registry(v) => v.sources(),
            Variant::Feed(v) => v.sources(),
            Variant::Marketplace(v) => v.sources(),
            Variant::PlainText(v) => v.sources(),
        }
    }

    async fn load(&self, fetcher: PluginFetcher<'_>) -> Result<Loaded> {
        match self {
            Variant::Registry(v) => v.load(fetcher).await,
            Variant::Feed(v) => v.load(fetcher).await,
            Variant::Marketplace(v) => v.load(fetcher).await,
            Variant::PlainText(v) => v.load(fetcher).await,
        }
    }
}

/// A loaded plugin: profile, releases and the configured output filter
#[derive(Debug, Clone)]
pub struct Parser {
    profile: PluginProfile,
    releases: ReleaseSet,
    filter: StabilityFilter,
    limit: OutputLimit,
}

impl Parser {
    /// Load `plugin` with the variant chosen by [`Variant::for_plugin`]
    pub async fn load(plugin: &str, config: &Config, fetcher: &Fetcher) -> Result<Self> {
        Self::load_variant(plugin, &Variant::for_plugin(plugin), config, fetcher).await
    }

    /// Load `plugin` with an explicit variant.
    ///
    /// Any error raised by the variant is reported as [`FeedError::Plugin`].
    pub async fn load_variant<S: ReleaseSource>(
        plugin: &str,
        variant: &S,
        config: &Config,
        fetcher: &Fetcher,
    ) -> Result<Self> {
        let sources = variant.sources();
        let loaded = variant
            .load(fetcher.for_plugin(plugin, &sources))
            .await
            .map_err(|err| FeedError::plugin(plugin, err))?;

        tracing::info!("{}: {} releases", plugin, loaded.releases.len());
        Ok(Self::from_loaded(loaded, config))
    }

    pub fn from_loaded(loaded: Loaded, config: &Config) -> Self {
        let mut profile = loaded.profile;
        profile.modified = loaded.releases.modified();

        Self {
            profile,
            releases: loaded.releases,
            filter: config.stability.clone(),
            limit: config.output_limit,
        }
    }

    pub fn profile(&self) -> &PluginProfile {
        &self.profile
    }

    /// Every release, unfiltered
    pub fn all_releases(&self) -> &ReleaseSet {
        &self.releases
    }

    /// Releases passing the stability filter, newest first, truncated to `limit`
    /// (or the configured limit). Content is sanitized on the way out.
    pub fn releases(&self, limit: Option<OutputLimit>) -> Vec<&Release> {
        let matching = self
            .releases
            .iter()
            .filter(|r| self.filter.matches(&r.stability))
            .inspect(|r| {
                r.content();
            });

        match limit.unwrap_or(self.limit) {
            OutputLimit::Unlimited => matching.collect(),
            OutputLimit::Count(n) => matching.take(n).collect(),
        }
    }
}

/// Load several plugins concurrently, one task each.
///
/// Results come back in input order. A failing or panicking plugin only affects
/// its own entry.
pub async fn load_all(
    plugins: &[String],
    config: &Config,
    fetcher: &Fetcher,
) -> Vec<(String, Result<Parser>)> {
    let jobs = plugins
        .iter()
        .map(|plugin| (plugin.clone(), Variant::for_plugin(plugin)))
        .collect();

    load_each(jobs, config, fetcher).await
}

/// [`load_all`] with the variant given per plugin instead of looked up
pub async fn load_each(
    jobs: Vec<(String, Variant)>,
    config: &Config,
    fetcher: &Fetcher,
) -> Vec<(String, Result<Parser>)> {
    let plugins: Vec<String> = jobs.iter().map(|(plugin, _)| plugin.clone()).collect();

    let handles: Vec<_> = jobs
        .into_iter()
        .map(|(plugin, variant)| {
            let config = config.clone();
            let fetcher = fetcher.clone();
            tokio::spawn(async move {
                Parser::load_variant(&plugin, &variant, &config, &fetcher).await
            })
        })
        .collect();

    let results = futures::future::join_all(handles).await;

    plugins
        .into_iter()
        .zip(results)
        .map(|(plugin, joined)| {
            let result = joined.unwrap_or_else(|err| {
                tracing::error!("Loading {} aborted: {}", plugin, err);
                Err(FeedError::plugin(&plugin, err))
            });
            (plugin, result)
        })
        .collect()
}

/// Release for a dated vendor changelog entry.
///
/// `None` when the entry has no version or no date, which drops it from the feed.
pub(crate) fn dated_release(
    plugin_title: &str,
    heading: &str,
    version: Option<String>,
    created: Option<DateTime<Utc>>,
    content: Option<String>,
    link: &str,
) -> Option<Release> {
    let Some(version) = version else {
        tracing::debug!("No version in {:?}", heading);
        return None;
    };
    let Some(created) = created else {
        tracing::debug!("No date for {} in {:?}", version, heading);
        return None;
    };

    Some(
        Release::new(plugin_title, &version, classify_stability(heading), created)
            .with_description(heading)
            .with_content(content.unwrap_or_else(|| heading.to_string()))
            .with_link(link),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Stability;
    use chrono::TimeZone;

    fn parser(stabilities: &[Stability], config: &Config) -> Parser {
        let releases: ReleaseSet = stabilities
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    - chrono::Duration::days(i as i64);
                Release::new("Demo", &format!("1.{}", 20 - i), *s, created)
                    .with_content(format!("<p>{}</p><script>x()</script>", i))
            })
            .collect();

        Parser::from_loaded(
            Loaded {
                profile: PluginProfile::new("demo", "https://example.com/demo"),
                releases,
            },
            config,
        )
    }

    fn mixed() -> Vec<Stability> {
        (0..10)
            .map(|i| match i % 3 {
                0 => Stability::Stable,
                1 => Stability::Beta(Some(i)),
                _ => Stability::Rc(None),
            })
            .collect()
    }

    #[test]
    fn test_variant_lookup() {
        assert_eq!(Variant::for_plugin("gravityforms").kind(), "feed");
        assert_eq!(Variant::for_plugin("revslider").kind(), "marketplace");
        assert_eq!(Variant::for_plugin("searchwp").kind(), "text");
        assert_eq!(Variant::for_plugin("akismet").kind(), "registry");
    }

    #[test]
    fn test_limit_property() {
        let config = Config::default();
        let parser = parser(&mixed(), &config);

        for limit in 0..12 {
            let got = parser.releases(Some(OutputLimit::from_count(limit))).len();
            let expected = if limit == 0 { 10 } else { limit.min(10) };
            assert_eq!(got, expected, "limit {}", limit);
        }
    }

    #[test]
    fn test_default_limit_from_config() {
        let config = Config {
            output_limit: OutputLimit::Count(4),
            ..Config::default()
        };
        assert_eq!(parser(&mixed(), &config).releases(None).len(), 4);
    }

    #[test]
    fn test_stability_filter_property() {
        let config = Config {
            stability: StabilityFilter::parse("stable,rc").unwrap(),
            output_limit: OutputLimit::Unlimited,
            ..Config::default()
        };
        let parser = parser(&mixed(), &config);
        let releases = parser.releases(None);

        assert_eq!(releases.len(), 7);
        assert!(
            releases
                .iter()
                .all(|r| matches!(r.stability, Stability::Stable | Stability::Rc(_)))
        );
        // order is preserved
        assert!(releases.windows(2).all(|w| w[0].created >= w[1].created));
        // a limit applies after filtering
        assert_eq!(parser.releases(Some(OutputLimit::Count(2))).len(), 2);
    }

    #[test]
    fn test_releases_is_idempotent_and_sanitizes() {
        let parser = parser(&mixed(), &Config::default());

        let first: Vec<_> = parser.releases(None).iter().map(|r| r.version.clone()).collect();
        let second: Vec<_> = parser.releases(None).iter().map(|r| r.version.clone()).collect();
        assert_eq!(first, second);

        assert!(parser.all_releases().iter().all(|r| r.is_sanitized()));
        assert_eq!(parser.releases(None)[0].content(), "<p>0</p>");
    }

    #[test]
    fn test_modified_is_newest_release() {
        let parser = parser(&mixed(), &Config::default());
        assert_eq!(
            parser.profile().modified,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_dated_release_requires_version_and_date() {
        let date = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

        assert!(dated_release("Demo", "x", None, Some(date), None, "l").is_none());
        assert!(dated_release("Demo", "x", Some("1.0".into()), None, None, "l").is_none());

        let release =
            dated_release("Demo", "1.0 RC 2", Some("1.0".into()), Some(date), None, "l").unwrap();
        assert_eq!(release.stability, Stability::Rc(Some(2)));
        assert_eq!(release.content(), "1.0 RC 2");
        assert_eq!(release.link, "l");
    }
}
