//! Registry plugins: profile page, changelog and tag browser.

use super::{Loaded, ReleaseSource};
use crate::changelog::{element_text, parse_html_blocks};
use crate::error::Result;
use crate::fetch::{PluginFetcher, SourceMap};
use crate::model::{Image, PluginProfile, ReleaseSet};
use crate::reconcile::reconcile;
use crate::tags::parse_tags;
use scraper::{Html, Selector};
use std::sync::LazyLock;

pub const PROFILE: &str = "profile";
pub const CHANGELOG: &str = "changelog";
pub const TAGS: &str = "tags";
pub const TRUNK_LOG: &str = "trunk_log";

const REGISTRY_BASE: &str = "https://wordpress.org";
const BROWSER_BASE: &str = "https://plugins.trac.wordpress.org";

const CHANGELOG_CONTAINER: &str = "#tab-changelog, .plugin-changelog, #changelog";

struct ProfileSelectors {
    title: Selector,
    og_title: Selector,
    description: Selector,
    og_description: Selector,
    og_image: Selector,
}

static SELECTORS: LazyLock<ProfileSelectors> = LazyLock::new(|| ProfileSelectors {
    title: Selector::parse("h1.plugin-title").unwrap(),
    og_title: Selector::parse(r#"meta[property="og:title"]"#).unwrap(),
    description: Selector::parse(r#"meta[name="description"]"#).unwrap(),
    og_description: Selector::parse(r#"meta[property="og:description"]"#).unwrap(),
    og_image: Selector::parse(r#"meta[property="og:image"]"#).unwrap(),
});

/// Registry-hosted plugin, reconciled against its tag browser
#[derive(Debug, Clone)]
pub struct Registry {
    registry_base: String,
    browser_base: String,
}

impl Registry {
    /// Registry at `registry_base` with its tag browser at `browser_base`
    pub fn hosted_at(registry_base: &str, browser_base: &str) -> Self {
        Self {
            registry_base: registry_base.trim_end_matches('/').to_string(),
            browser_base: browser_base.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::hosted_at(REGISTRY_BASE, BROWSER_BASE)
    }
}

impl ReleaseSource for Registry {
    fn sources(&self) -> SourceMap {
        SourceMap::new()
            .with(PROFILE, format!("{}/plugins/{{}}/", self.registry_base))
            .with(CHANGELOG, format!("{}/plugins/{{}}/?tab=changelog", self.registry_base))
            .with(TAGS, format!("{}/browser/{{}}/tags/?order=date&desc=1", self.browser_base))
            .with(TRUNK_LOG, format!("{}/log/{{}}/trunk?mode=stop_on_copy&", self.browser_base))
    }

    async fn load(&self, fetcher: PluginFetcher<'_>) -> Result<Loaded> {
        let plugin = fetcher.plugin();
        let link = fetcher.url(PROFILE).unwrap_or_default();

        let profile = match fetcher.fetch(PROFILE, None).await {
            Some(html) => parse_profile(&html, plugin, &link),
            None => PluginProfile::new(plugin, link),
        };

        let Some(tags_html) = fetcher.fetch(TAGS, None).await else {
            tracing::warn!("{}: no tag listing, feed will be empty", plugin);
            return Ok(Loaded::empty(profile));
        };
        let changelog_html = fetcher.fetch(CHANGELOG, None).await;

        let releases = build_releases(
            &profile.title,
            &tags_html,
            changelog_html.as_deref(),
            &fetcher.url(TRUNK_LOG).unwrap_or_default(),
        );

        Ok(Loaded { profile, releases })
    }
}

fn build_releases(
    title: &str,
    tags_html: &str,
    changelog_html: Option<&str>,
    trunk_log: &str,
) -> ReleaseSet {
    let tags = parse_tags(tags_html);
    let blocks = changelog_html
        .map(|html| parse_html_blocks(html, CHANGELOG_CONTAINER))
        .unwrap_or_default();

    tracing::debug!("{} tags, {} changelog blocks", tags.len(), blocks.len());
    reconcile(title, &tags, &blocks, trunk_log)
}

/// Title, description and image from the registry profile page
pub fn parse_profile(html: &str, plugin: &str, link: &str) -> PluginProfile {
    let document = Html::parse_document(html);
    let meta = |selector: &Selector| {
        document
            .select(selector)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
    };

    let mut profile = PluginProfile::new(plugin, link);

    if let Some(title) = document
        .select(&SELECTORS.title)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .or_else(|| meta(&SELECTORS.og_title))
    {
        profile.title = title;
    }

    if let Some(description) =
        meta(&SELECTORS.description).or_else(|| meta(&SELECTORS.og_description))
    {
        profile.description = description;
    }

    profile.image = meta(&SELECTORS.og_image).map(|url| Image {
        url,
        title: profile.title.clone(),
    });

    profile
}
