//! Atom, RSS 2.0 and JSON output.

use crate::config::OutputFormat;
use crate::error::Result;
use crate::model::{PluginProfile, Release};
use chrono::{DateTime, Utc};
use quick_xml::se::Serializer;
use serde::Serialize;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;
const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

/// Render releases (already filtered and ordered) with their profile
pub fn render(
    profile: &PluginProfile,
    releases: &[&Release],
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Atom => to_xml(&atom(profile, releases)),
        OutputFormat::Rss => to_xml(&rss(profile, releases)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&JsonFeed { profile, releases })?),
    }
}

fn to_xml<T: Serialize>(document: &T) -> Result<String> {
    let mut body = String::new();
    let mut serializer = Serializer::new(&mut body);
    serializer.indent(' ', 2);
    document.serialize(serializer)?;
    Ok(format!("{}\n{}\n", XML_DECLARATION, body))
}

fn modified(profile: &PluginProfile) -> DateTime<Utc> {
    profile.modified.unwrap_or_else(Utc::now)
}

fn entry_id(profile: &PluginProfile, release: &Release) -> String {
    format!("{}#{}", profile.link, release.version)
}

#[derive(Serialize)]
struct JsonFeed<'a> {
    profile: &'a PluginProfile,
    releases: &'a [&'a Release],
}

#[derive(Serialize)]
#[serde(rename = "feed")]
struct AtomFeed<'a> {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    id: &'a str,
    title: &'a str,
    subtitle: &'a str,
    updated: String,
    link: AtomLink<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon: Option<&'a str>,
    entry: Vec<AtomEntry<'a>>,
}

#[derive(Serialize)]
struct AtomLink<'a> {
    #[serde(rename = "@href")]
    href: &'a str,
}

#[derive(Serialize)]
struct AtomText<'a> {
    #[serde(rename = "@type")]
    kind: &'static str,
    #[serde(rename = "$text")]
    value: &'a str,
}

#[derive(Serialize)]
struct AtomCategory {
    #[serde(rename = "@term")]
    term: String,
}

#[derive(Serialize)]
struct AtomEntry<'a> {
    id: String,
    title: &'a str,
    updated: String,
    published: String,
    summary: &'a str,
    content: AtomText<'a>,
    link: AtomLink<'a>,
    category: AtomCategory,
}

fn atom<'a>(profile: &'a PluginProfile, releases: &[&'a Release]) -> AtomFeed<'a> {
    AtomFeed {
        xmlns: ATOM_NS,
        id: &profile.link,
        title: &profile.title,
        subtitle: &profile.description,
        updated: modified(profile).to_rfc3339(),
        link: AtomLink {
            href: &profile.link,
        },
        icon: profile.image.as_ref().map(|i| i.url.as_str()),
        entry: releases
            .iter()
            .map(|release| AtomEntry {
                id: entry_id(profile, release),
                title: &release.title,
                updated: release.created.to_rfc3339(),
                published: release.created.to_rfc3339(),
                summary: &release.description,
                content: AtomText {
                    kind: "html",
                    value: release.content(),
                },
                link: AtomLink {
                    href: &release.link,
                },
                category: AtomCategory {
                    term: release.stability.to_string(),
                },
            })
            .collect(),
    }
}

#[derive(Serialize)]
#[serde(rename = "rss")]
struct Rss<'a> {
    #[serde(rename = "@version")]
    version: &'static str,
    channel: Channel<'a>,
}

#[derive(Serialize)]
struct Channel<'a> {
    title: &'a str,
    link: &'a str,
    description: &'a str,
    #[serde(rename = "lastBuildDate")]
    last_build_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<RssImage<'a>>,
    item: Vec<RssItem<'a>>,
}

#[derive(Serialize)]
struct RssImage<'a> {
    url: &'a str,
    title: &'a str,
    link: &'a str,
}

#[derive(Serialize)]
struct Guid {
    #[serde(rename = "@isPermaLink")]
    is_perma_link: &'static str,
    #[serde(rename = "$text")]
    value: String,
}

#[derive(Serialize)]
struct RssItem<'a> {
    title: &'a str,
    link: &'a str,
    guid: Guid,
    #[serde(rename = "pubDate")]
    pub_date: String,
    description: &'a str,
    category: String,
}

fn rss<'a>(profile: &'a PluginProfile, releases: &[&'a Release]) -> Rss<'a> {
    Rss {
        version: "2.0",
        channel: Channel {
            title: &profile.title,
            link: &profile.link,
            description: &profile.description,
            last_build_date: modified(profile).to_rfc2822(),
            image: profile.image.as_ref().map(|image| RssImage {
                url: &image.url,
                title: &image.title,
                link: &profile.link,
            }),
            item: releases
                .iter()
                .map(|release| RssItem {
                    title: &release.title,
                    link: &release.link,
                    guid: Guid {
                        is_perma_link: "false",
                        value: entry_id(profile, release),
                    },
                    pub_date: release.created.to_rfc2822(),
                    description: release.content(),
                    category: release.stability.to_string(),
                })
                .collect(),
        },
    }
}
