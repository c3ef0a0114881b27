//! Merging tags and changelog blocks into releases.
//!
//! Dates and links always come from tags, so a changelog block only becomes a
//! release when its version names an existing tag. When no block matches at all,
//! every tag becomes a release on its own, described by its commit message.
//!
//! Each release then links to the trunk log bounded by its own tag revision and,
//! when there is one, the revision of the tag listed after it (the previous
//! release).

use crate::changelog::ChangelogBlock;
use crate::model::{Release, ReleaseSet, TagList};
use crate::version::{classify_stability, extract_version};

pub const COMMIT_MESSAGE_PREFIX: &str = "Commit message: ";

/// Build the release set for one plugin.
///
/// `trunk_log` is the log URL the `stop_rev` parameters are appended to, so it
/// should end in `?` or `&`.
pub fn reconcile(
    plugin_title: &str,
    tags: &TagList,
    blocks: &[ChangelogBlock],
    trunk_log: &str,
) -> ReleaseSet {
    let mut releases = match_changelog(plugin_title, tags, blocks);

    if releases.is_empty() && !tags.is_empty() {
        tracing::debug!(
            "No changelog entry matched any of {} tags, using commit messages",
            tags.len()
        );
        releases = from_tags(plugin_title, tags);
    }

    for release in releases.iter_mut() {
        if let Some(link) = commit_range_link(trunk_log, tags, &release.version) {
            release.link = link;
        }
    }

    releases.sort_newest_first();
    releases
}

fn match_changelog(plugin_title: &str, tags: &TagList, blocks: &[ChangelogBlock]) -> ReleaseSet {
    let mut releases = ReleaseSet::new();

    for block in blocks {
        let Some(version) = extract_version(&block.heading, Some(plugin_title)) else {
            tracing::debug!("No version in changelog heading {:?}", block.heading);
            continue;
        };
        let Some(tag) = tags.get(&version) else {
            tracing::debug!("Changelog entry {} has no tag, dropped", version);
            continue;
        };
        if releases.contains(&version) {
            tracing::debug!("Duplicate changelog entry {} dropped", version);
            continue;
        }

        let content = block
            .content()
            .unwrap_or_else(|| tag.description.clone());

        releases.insert(
            Release::new(plugin_title, &version, classify_stability(&block.heading), tag.created)
                .with_description(tag.description.as_str())
                .with_content(content),
        );
    }

    releases
}

fn from_tags(plugin_title: &str, tags: &TagList) -> ReleaseSet {
    let mut releases = ReleaseSet::new();

    for tag in tags {
        releases.insert(
            Release::new(plugin_title, &tag.name, classify_stability(&tag.name), tag.created)
                .with_description(tag.description.as_str())
                .with_content(format!("{}{}", COMMIT_MESSAGE_PREFIX, tag.description)),
        );
    }

    releases
}

/// Trunk log link between the release `version` and the one before it
pub fn commit_range_link(trunk_log: &str, tags: &TagList, version: &str) -> Option<String> {
    let tag = tags.get(version)?;
    let mut link = format!("{}stop_rev={}", trunk_log, tag.revision);

    if let Some(previous) = tags.previous(version) {
        link.push_str("&stop_rev=");
        link.push_str(&previous.revision);
    }

    Some(link)
}
