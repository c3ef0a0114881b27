//! Vendor-specific scrapers that do not go through tag reconciliation.

use super::{Loaded, ReleaseSource, dated_release};
use crate::changelog::{BodyNode, ChangelogBlock, element_text, parse_text_blocks};
use crate::error::Result;
use crate::fetch::{PluginFetcher, SourceMap};
use crate::model::{Image, PluginProfile, ReleaseSet};
use crate::version::{extract_date, extract_version};
use chrono::{DateTime, NaiveDate, Utc};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

pub const PAGE: &str = "page";
pub const CHANGELOG: &str = "changelog";

struct MarketplaceSelectors {
    entry: Selector,
    version: Selector,
    time: Selector,
    notes: Selector,
    og_image: Selector,
}

static SELECTORS: LazyLock<MarketplaceSelectors> = LazyLock::new(|| MarketplaceSelectors {
    entry: Selector::parse(".changelog__entry").unwrap(),
    version: Selector::parse(".changelog__version, h2, h3, h4").unwrap(),
    time: Selector::parse("time[datetime]").unwrap(),
    notes: Selector::parse(".changelog__notes").unwrap(),
    og_image: Selector::parse(r#"meta[property="og:image"]"#).unwrap(),
});

/// Marketplace item page. Each `.changelog__entry` holds a version heading
/// (with the date in it or in a `<time>`) and a notes container.
#[derive(Debug, Clone)]
pub struct Marketplace {
    title: String,
    description: String,
    template: String,
}

impl Marketplace {
    pub fn new(title: &str, description: &str, template: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            template: template.to_string(),
        }
    }

    pub fn slider_revolution() -> Self {
        Self::new(
            "Slider Revolution",
            "Responsive WordPress slider plugin",
            "https://codecanyon.net/item/{}/2751380/changelog",
        )
    }
}

impl ReleaseSource for Marketplace {
    fn sources(&self) -> SourceMap {
        SourceMap::new().with(PAGE, self.template.clone())
    }

    async fn load(&self, fetcher: PluginFetcher<'_>) -> Result<Loaded> {
        let url = fetcher.url(PAGE).unwrap_or_default();
        let mut profile = PluginProfile::new(fetcher.plugin(), url.clone());
        profile.title = self.title.clone();
        profile.description = self.description.clone();

        let Some(html) = fetcher.fetch(PAGE, None).await else {
            tracing::warn!("{}: item page unavailable", fetcher.plugin());
            return Ok(Loaded::empty(profile));
        };

        let (releases, image) = parse_marketplace(&html, &self.title, &url);
        profile.image = image.map(|url| Image {
            url,
            title: self.title.clone(),
        });
        Ok(Loaded { profile, releases })
    }
}

/// Releases and the item image from a marketplace page
pub fn parse_marketplace(html: &str, title: &str, link: &str) -> (ReleaseSet, Option<String>) {
    let document = Html::parse_document(html);

    let image = document
        .select(&SELECTORS.og_image)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::to_string);

    let releases = document
        .select(&SELECTORS.entry)
        .filter_map(|entry| {
            let heading = entry.select(&SELECTORS.version).next().map(element_text)?;
            let block = ChangelogBlock {
                body: entry
                    .select(&SELECTORS.notes)
                    .next()
                    .map(notes_body)
                    .unwrap_or_default(),
                heading,
            };

            dated_release(
                title,
                &block.heading,
                extract_version(&block.heading, Some(title)),
                extract_date(&block.heading).or_else(|| entry_time(entry)),
                block.content(),
                link,
            )
        })
        .collect();

    (releases, image)
}

fn notes_body(notes: ElementRef<'_>) -> Vec<BodyNode> {
    notes
        .children()
        .filter_map(ElementRef::wrap)
        .map(|el| BodyNode::new(el.value().name(), el.inner_html().trim()))
        .collect()
}

fn entry_time(entry: ElementRef<'_>) -> Option<DateTime<Utc>> {
    let value = entry.select(&SELECTORS.time).next()?.value().attr("datetime")?;
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()?
                .and_hms_opt(0, 0, 0)
                .map(|d| d.and_utc())
        })
}

/// Plain-text changelog file with dated version headings
#[derive(Debug, Clone)]
pub struct PlainTextChangelog {
    title: String,
    description: String,
    template: String,
}

impl PlainTextChangelog {
    pub fn new(title: &str, description: &str, template: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            template: template.to_string(),
        }
    }

    pub fn searchwp() -> Self {
        Self::new(
            "SearchWP",
            "Custom search for WordPress",
            "https://searchwp.com/extensions/{}/changelog.txt",
        )
    }
}

impl ReleaseSource for PlainTextChangelog {
    fn sources(&self) -> SourceMap {
        SourceMap::new().with(CHANGELOG, self.template.clone())
    }

    async fn load(&self, fetcher: PluginFetcher<'_>) -> Result<Loaded> {
        let url = fetcher.url(CHANGELOG).unwrap_or_default();
        let mut profile = PluginProfile::new(fetcher.plugin(), url.clone());
        profile.title = self.title.clone();
        profile.description = self.description.clone();

        let Some(text) = fetcher.fetch(CHANGELOG, None).await else {
            tracing::warn!("{}: changelog unavailable", fetcher.plugin());
            return Ok(Loaded::empty(profile));
        };

        let releases = parse_text_blocks(&text)
            .into_iter()
            .filter_map(|block| {
                dated_release(
                    &self.title,
                    &block.heading,
                    extract_version(&block.heading, Some(&self.title)),
                    extract_date(&block.heading),
                    block.content(),
                    &url,
                )
            })
            .collect();

        Ok(Loaded { profile, releases })
    }
}
