//! Tags, releases and plugin profile metadata.
//!
//! A [`TagList`] is what the tag browser yields, a [`Release`] is one entry of the
//! generated feed, and a [`PluginProfile`] carries the feed-level metadata.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Release maturity, optionally qualified with a number (`beta.3`, `rc.2`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stability {
    #[default]
    Stable,
    Alpha(Option<u32>),
    Beta(Option<u32>),
    Rc(Option<u32>),
}

impl Stability {
    /// Tag name without the numeric qualifier
    pub fn tag(&self) -> &'static str {
        match self {
            Stability::Stable => "stable",
            Stability::Alpha(_) => "alpha",
            Stability::Beta(_) => "beta",
            Stability::Rc(_) => "rc",
        }
    }

    pub fn is_stable(&self) -> bool {
        matches!(self, Stability::Stable)
    }
}

impl fmt::Display for Stability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stability::Stable => f.write_str("stable"),
            Stability::Alpha(n) | Stability::Beta(n) | Stability::Rc(n) => match n {
                Some(n) => write!(f, "{}.{}", self.tag(), n),
                None => f.write_str(self.tag()),
            },
        }
    }
}

impl Serialize for Stability {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One source-control tag matching a released version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub revision: String,
    pub description: String,
    pub created: DateTime<Utc>,
}

/// Tags in listing order (newest first) with a lookup by version.
///
/// The chronologically previous tag of `version` is the element right after it.
#[derive(Debug, Clone, Default)]
pub struct TagList {
    tags: Vec<Tag>,
    index: HashMap<String, usize>,
}

impl TagList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tag, ignoring names that are already present
    pub fn push(&mut self, tag: Tag) -> bool {
        if self.index.contains_key(&tag.name) {
            return false;
        }
        self.index.insert(tag.name.clone(), self.tags.len());
        self.tags.push(tag);
        true
    }

    pub fn get(&self, version: &str) -> Option<&Tag> {
        self.position(version).map(|i| &self.tags[i])
    }

    pub fn position(&self, version: &str) -> Option<usize> {
        self.index.get(version).copied()
    }

    /// The tag listed after `version`, i.e. the release preceding it
    pub fn previous(&self, version: &str) -> Option<&Tag> {
        self.position(version).and_then(|i| self.tags.get(i + 1))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.tags.iter()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl FromIterator<Tag> for TagList {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        let mut list = TagList::new();
        for tag in iter {
            list.push(tag);
        }
        list
    }
}

impl<'a> IntoIterator for &'a TagList {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.iter()
    }
}

/// One published release as it appears in the feed
#[derive(Debug, Clone)]
pub struct Release {
    pub title: String,
    pub version: String,
    pub description: String,
    pub stability: Stability,
    pub created: DateTime<Utc>,
    pub link: String,
    raw_content: String,
    sanitized: OnceLock<String>,
}

impl Release {
    pub fn new(
        plugin_title: &str,
        version: &str,
        stability: Stability,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            title: format!("{} {}", plugin_title, version),
            version: version.to_string(),
            description: String::new(),
            stability,
            created,
            link: String::new(),
            raw_content: String::new(),
            sanitized: OnceLock::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.raw_content = content.into();
        self.sanitized = OnceLock::new();
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = link.into();
        self
    }

    /// Release body, sanitized on first access
    pub fn content(&self) -> &str {
        self.sanitized
            .get_or_init(|| crate::changelog::sanitize(&self.raw_content))
    }

    pub(crate) fn is_sanitized(&self) -> bool {
        self.sanitized.get().is_some()
    }
}

impl Serialize for Release {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut s = serializer.serialize_struct("Release", 7)?;
        s.serialize_field("title", &self.title)?;
        s.serialize_field("version", &self.version)?;
        s.serialize_field("description", &self.description)?;
        s.serialize_field("stability", &self.stability)?;
        s.serialize_field("created", &self.created)?;
        s.serialize_field("content", self.content())?;
        s.serialize_field("link", &self.link)?;
        s.end()
    }
}

/// Releases ordered newest first, at most one per version
#[derive(Debug, Clone, Default)]
pub struct ReleaseSet {
    releases: Vec<Release>,
}

impl ReleaseSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, version: &str) -> bool {
        self.releases.iter().any(|r| r.version == version)
    }

    /// Insert a release unless its version is already present
    pub fn insert(&mut self, release: Release) -> bool {
        if self.contains(&release.version) {
            return false;
        }
        self.releases.push(release);
        true
    }

    /// Restore newest-first order; releases with equal dates keep their order
    pub fn sort_newest_first(&mut self) {
        self.releases.sort_by(|a, b| b.created.cmp(&a.created));
    }

    /// Creation time of the most recent release
    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.releases.iter().map(|r| r.created).max()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Release> {
        self.releases.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Release> {
        self.releases.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }
}

impl FromIterator<Release> for ReleaseSet {
    fn from_iter<I: IntoIterator<Item = Release>>(iter: I) -> Self {
        let mut set = ReleaseSet::new();
        for release in iter {
            set.insert(release);
        }
        set.sort_newest_first();
        set
    }
}

impl<'a> IntoIterator for &'a ReleaseSet {
    type Item = &'a Release;
    type IntoIter = std::slice::Iter<'a, Release>;

    fn into_iter(self) -> Self::IntoIter {
        self.releases.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    pub url: String,
    pub title: String,
}

/// Feed-level metadata for one plugin
#[derive(Debug, Clone, Serialize)]
pub struct PluginProfile {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image: Option<Image>,
    pub link: String,
    pub modified: Option<DateTime<Utc>>,
}

impl PluginProfile {
    /// Profile with only the identifier known; the title defaults to the id
    pub fn new(id: &str, link: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            image: None,
            link: link.into(),
            modified: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tag(name: &str, rev: &str, day: u32) -> Tag {
        Tag {
            name: name.to_string(),
            revision: rev.to_string(),
            description: format!("Tagging {}", name),
            created: Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_stability_display() {
        assert_eq!(Stability::Stable.to_string(), "stable");
        assert_eq!(Stability::Alpha(None).to_string(), "alpha");
        assert_eq!(Stability::Beta(Some(3)).to_string(), "beta.3");
        assert_eq!(Stability::Rc(Some(2)).to_string(), "rc.2");
    }

    #[test]
    fn test_tag_list_previous() {
        let tags: TagList = vec![tag("1.2", "10", 3), tag("1.1", "9", 2), tag("1.0", "8", 1)]
            .into_iter()
            .collect();

        assert_eq!(tags.previous("1.2").unwrap().revision, "9");
        assert_eq!(tags.previous("1.1").unwrap().revision, "8");
        assert!(tags.previous("1.0").is_none());
        assert!(tags.previous("0.9").is_none());
    }

    #[test]
    fn test_tag_list_keeps_first_duplicate() {
        let mut tags = TagList::new();
        assert!(tags.push(tag("1.0", "8", 1)));
        assert!(!tags.push(tag("1.0", "99", 5)));
        assert_eq!(tags.len(), 1);
        assert_eq!(tags.get("1.0").unwrap().revision, "8");
    }

    #[test]
    fn test_release_set_orders_and_dedupes() {
        let day = |d| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap();
        let set: ReleaseSet = vec![
            Release::new("Plugin", "1.0", Stability::Stable, day(1)),
            Release::new("Plugin", "1.1", Stability::Stable, day(2)),
            Release::new("Plugin", "1.0", Stability::Beta(None), day(9)),
        ]
        .into_iter()
        .collect();

        let versions: Vec<_> = set.iter().map(|r| r.version.as_str()).collect();
        assert_eq!(versions, vec!["1.1", "1.0"]);
        assert_eq!(set.modified(), Some(day(2)));
    }

    #[test]
    fn test_release_content_is_sanitized_once() {
        let release = Release::new("Plugin", "1.0", Stability::Stable, Utc::now())
            .with_content("<p>Fixed</p><script>alert(1)</script>");

        assert!(!release.is_sanitized());
        assert_eq!(release.content(), "<p>Fixed</p>");
        assert!(release.is_sanitized());
        assert_eq!(release.content(), "<p>Fixed</p>");
        assert!(release.raw_content.contains("script"));
    }
}
