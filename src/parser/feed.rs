//! Vendors that announce releases in their own feed or news page.
//!
//! The source is read as RSS 2.0 or Atom when it looks like one, otherwise as an
//! HTML page segmented by headings. Only entries whose title matches the vendor's
//! release pattern become releases; there are no tags, so each release links to
//! the announcement itself.

use super::{Loaded, ReleaseSource, dated_release};
use crate::changelog::parse_html_blocks;
use crate::error::Result;
use crate::fetch::{PluginFetcher, SourceMap};
use crate::model::{PluginProfile, ReleaseSet};
use crate::version::{extract_date, extract_version};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;

pub const FEED: &str = "feed";

#[derive(Debug, Clone)]
pub struct GenericFeed {
    title: String,
    description: String,
    template: String,
    pattern: String,
}

impl GenericFeed {
    /// `template` is the feed URL with `{}` for the plugin id, `pattern` a regex
    /// matching release titles, optionally with a `version` group.
    pub fn new(title: &str, description: &str, template: &str, pattern: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            template: template.to_string(),
            pattern: pattern.to_string(),
        }
    }

    pub fn gravity_forms() -> Self {
        Self::new(
            "Gravity Forms",
            "Advanced forms for WordPress",
            "https://www.{}.com/category/release-notes/feed/",
            r"(?i)^Gravity Forms v?(?P<version>\d[\d.]*)\b.*\bReleased\b",
        )
    }

    pub fn elementor_pro() -> Self {
        Self::new(
            "Elementor Pro",
            "Website builder for WordPress",
            "https://elementor.com/pro/changelog/?product={}",
            r"(?i)^v?(?P<version>\d+(?:\.\d+)+)\s*[-–]",
        )
    }
}

impl ReleaseSource for GenericFeed {
    fn sources(&self) -> SourceMap {
        SourceMap::new().with(FEED, self.template.clone())
    }

    async fn load(&self, fetcher: PluginFetcher<'_>) -> Result<Loaded> {
        let pattern = Regex::new(&self.pattern)?;
        let url = fetcher.url(FEED).unwrap_or_default();

        let mut profile = PluginProfile::new(fetcher.plugin(), url.clone());
        profile.title = self.title.clone();
        profile.description = self.description.clone();

        let Some(body) = fetcher.fetch(FEED, None).await else {
            tracing::warn!("{}: feed unavailable", fetcher.plugin());
            return Ok(Loaded::empty(profile));
        };

        let releases = self.releases(&parse_entries(&body), &pattern, &url);
        Ok(Loaded { profile, releases })
    }
}

impl GenericFeed {
    fn releases(&self, entries: &[Entry], pattern: &Regex, source_url: &str) -> ReleaseSet {
        entries
            .iter()
            .filter_map(|entry| {
                let Some(caps) = pattern.captures(&entry.title) else {
                    tracing::debug!("Not a release announcement: {:?}", entry.title);
                    return None;
                };
                let version = caps
                    .name("version")
                    .map(|m| m.as_str().trim_end_matches('.').to_string())
                    .or_else(|| extract_version(&entry.title, Some(&self.title)));

                dated_release(
                    &self.title,
                    &entry.title,
                    version,
                    entry.date.or_else(|| extract_date(&entry.title)),
                    entry.content.clone(),
                    entry.link.as_deref().unwrap_or(source_url),
                )
            })
            .collect()
    }
}

/// A feed item, Atom entry or HTML heading block
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub title: String,
    pub link: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: Option<String>,
    #[serde(rename = "pubDate", default)]
    pub_date: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Atom {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    #[serde(default)]
    title: AtomText,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    #[serde(default)]
    published: Option<String>,
    #[serde(default)]
    updated: Option<String>,
    #[serde(default)]
    summary: Option<AtomText>,
    #[serde(default)]
    content: Option<AtomText>,
}

#[derive(Debug, Default, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@rel", default)]
    rel: Option<String>,
}

/// Parse a feed or HTML page into entries. Unreadable feeds yield no entries.
pub fn parse_entries(body: &str) -> Vec<Entry> {
    let head = body.get(..body.len().min(1024)).unwrap_or(body);

    if head.contains("<rss") {
        match quick_xml::de::from_str::<Rss>(body) {
            Ok(rss) => rss.channel.items.into_iter().map(Entry::from).collect(),
            Err(err) => {
                tracing::warn!("Invalid RSS feed: {}", err);
                Vec::new()
            }
        }
    } else if head.contains("<feed") {
        match quick_xml::de::from_str::<Atom>(body) {
            Ok(atom) => atom.entries.into_iter().map(Entry::from).collect(),
            Err(err) => {
                tracing::warn!("Invalid Atom feed: {}", err);
                Vec::new()
            }
        }
    } else {
        parse_html_blocks(body, "main, article, body")
            .into_iter()
            .map(|block| Entry {
                date: extract_date(&block.heading),
                content: block.content(),
                title: block.heading,
                link: None,
            })
            .collect()
    }
}

impl From<RssItem> for Entry {
    fn from(item: RssItem) -> Self {
        Entry {
            title: item.title.trim().to_string(),
            link: item.link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
            date: item
                .pub_date
                .and_then(|d| DateTime::parse_from_rfc2822(d.trim()).ok())
                .map(|d| d.with_timezone(&Utc)),
            content: item.description.filter(|d| !d.trim().is_empty()),
        }
    }
}

impl From<AtomEntry> for Entry {
    fn from(entry: AtomEntry) -> Self {
        let link = entry
            .links
            .iter()
            .find(|l| l.rel.as_deref().is_none_or(|rel| rel == "alternate"))
            .or_else(|| entry.links.first())
            .map(|l| l.href.clone());

        let date = entry
            .published
            .or(entry.updated)
            .and_then(|d| DateTime::parse_from_rfc3339(d.trim()).ok())
            .map(|d| d.with_timezone(&Utc));

        Entry {
            title: entry.title.value.trim().to_string(),
            link,
            date,
            content: entry
                .content
                .or(entry.summary)
                .map(|t| t.value)
                .filter(|v| !v.trim().is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Stability;
    use chrono::TimeZone;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Release Notes</title>
    <link>https://www.gravityforms.com</link>
    <item>
      <title>Gravity Forms v2.8.2 Released</title>
      <link>https://www.gravityforms.com/gravity-forms-v2-8-2-released/</link>
      <pubDate>Tue, 05 Mar 2024 15:00:00 +0000</pubDate>
      <description><![CDATA[<p>Security fixes.</p>]]></description>
    </item>
    <item>
      <title>Webinar: building better forms</title>
      <link>https://www.gravityforms.com/webinar/</link>
      <pubDate>Mon, 04 Mar 2024 15:00:00 +0000</pubDate>
    </item>
    <item>
      <title>Gravity Forms 2.8 Beta 2 Released</title>
      <link>https://www.gravityforms.com/gravity-forms-2-8-beta-2-released/</link>
      <pubDate>Thu, 01 Feb 2024 10:00:00 +0000</pubDate>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>News</title>
  <entry>
    <title type="html">Demo 3.1 released</title>
    <link rel="replies" href="https://example.com/3.1#comments"/>
    <link rel="alternate" href="https://example.com/3.1"/>
    <updated>2024-02-10T08:00:00Z</updated>
    <summary>Short</summary>
    <content type="html">&lt;p&gt;Long&lt;/p&gt;</content>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss_entries() {
        let entries = parse_entries(RSS);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].title, "Gravity Forms v2.8.2 Released");
        assert_eq!(
            entries[0].date,
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 15, 0, 0).unwrap())
        );
        assert_eq!(entries[0].content.as_deref(), Some("<p>Security fixes.</p>"));
        assert_eq!(entries[1].content, None);
    }

    #[test]
    fn test_parse_atom_entries() {
        let entries = parse_entries(ATOM);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Demo 3.1 released");
        assert_eq!(entries[0].link.as_deref(), Some("https://example.com/3.1"));
        assert_eq!(entries[0].content.as_deref(), Some("<p>Long</p>"));
        assert_eq!(
            entries[0].date,
            Some(Utc.with_ymd_and_hms(2024, 2, 10, 8, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_html_entries() {
        let html = r#"<html><body><main>
            <h2>v3.20.1 - 2024-03-04</h2><ul><li>Fix: editor crash</li></ul>
            <h2>Upcoming</h2><p>Soon</p>
        </main></body></html>"#;

        let entries = parse_entries(html);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "v3.20.1 - 2024-03-04");
        assert_eq!(
            entries[0].date,
            Some(Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap())
        );
        assert_eq!(entries[0].content.as_deref(), Some("<ul><li>Fix: editor crash</li></ul>"));
    }

    #[test]
    fn test_broken_feed_yields_nothing() {
        assert!(parse_entries("<rss><channel><item><title>x</channel>").is_empty());
    }

    #[test]
    fn test_releases_filtered_by_pattern() {
        let vendor = GenericFeed::gravity_forms();
        let pattern = Regex::new(&vendor.pattern).unwrap();

        let releases = vendor.releases(&parse_entries(RSS), &pattern, "https://feed");
        let versions: Vec<_> = releases.iter().map(|r| r.version.as_str()).collect();
        assert_eq!(versions, vec!["2.8.2", "2.8"]);

        let beta = releases.iter().nth(1).unwrap();
        assert_eq!(beta.stability, Stability::Beta(Some(2)));
        assert_eq!(beta.title, "Gravity Forms 2.8");
        assert_eq!(
            beta.link,
            "https://www.gravityforms.com/gravity-forms-2-8-beta-2-released/"
        );
        assert_eq!(beta.content(), "Gravity Forms 2.8 Beta 2 Released");
    }

    #[test]
    fn test_html_releases_without_dates_are_dropped() {
        let vendor = GenericFeed::elementor_pro();
        let pattern = Regex::new(&vendor.pattern).unwrap();
        let html = "<main><h2>3.20.1 - 2024-03-04</h2><p>a</p><h2>3.20.0 - soon</h2><p>b</p></main>";

        let releases = vendor.releases(&parse_entries(html), &pattern, "https://elementor.com");
        assert_eq!(releases.len(), 1);
        assert_eq!(releases.iter().next().unwrap().link, "https://elementor.com");
    }
}
