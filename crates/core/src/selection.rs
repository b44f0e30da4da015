//! Picking a torrent for a watch request out of indexer results.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::searcher::{SearchCategory, SearchQuery, TorrentResult};

/// What a search is trying to find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTarget {
    Movie { name: String },
    Episode { show: String, season: u32, episode: u32 },
    /// A pack holding a whole season.
    Season { show: String, season: u32 },
}

impl SearchTarget {
    /// Free-text indexer query, e.g. "Show S01E02".
    pub fn query_string(&self) -> String {
        match self {
            SearchTarget::Movie { name } => name.clone(),
            SearchTarget::Episode {
                show,
                season,
                episode,
            } => format!("{show} S{season:02}E{episode:02}"),
            SearchTarget::Season { show, season } => format!("{show} S{season:02}"),
        }
    }

    pub fn category(&self) -> SearchCategory {
        match self {
            SearchTarget::Movie { .. } => SearchCategory::Movies,
            _ => SearchCategory::Tv,
        }
    }

    pub fn query(&self) -> SearchQuery {
        SearchQuery::new(self.query_string()).with_category(self.category())
    }

    fn name(&self) -> &str {
        match self {
            SearchTarget::Movie { name } => name,
            SearchTarget::Episode { show, .. } | SearchTarget::Season { show, .. } => show,
        }
    }

    /// True when `title` names this target.
    pub fn matches(&self, title: &str) -> bool {
        let title_tokens: HashSet<String> = tokens(title).collect();
        if !tokens(self.name()).all(|t| title_tokens.contains(&t)) {
            return false;
        }

        match self {
            SearchTarget::Movie { .. } => true,
            SearchTarget::Episode {
                season, episode, ..
            } => episode_markers(title).contains(&(*season, *episode)),
            SearchTarget::Season { season, .. } => {
                episode_markers(title).is_empty() && season_markers(title).contains(season)
            }
        }
    }
}

static EPISODE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bs(\d{1,2})[ ._-]?e(\d{1,3})").unwrap());

static SEASON_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:s|season[ ._-]?)(\d{1,2})\b").unwrap());

/// Acceptable results for `target`, most seeded first: they match, have
/// seeders, carry a download link and are not blacklisted.
///
/// Results without a known hash are kept; the hash the download daemon
/// reports for them has to be checked again after adding.
pub fn rank_candidates<'a>(
    results: &'a [TorrentResult],
    target: &SearchTarget,
    blacklist: &HashSet<String>,
) -> Vec<&'a TorrentResult> {
    let mut candidates: Vec<&TorrentResult> = results
        .iter()
        .filter(|r| r.seeders > 0)
        .filter(|r| r.download_link().is_some())
        .filter(|r| result_hash(r).map_or(true, |h| !blacklist.contains(&h)))
        .filter(|r| target.matches(&r.title))
        .collect();
    candidates.sort_by(|a, b| b.seeders.cmp(&a.seeders));
    candidates
}

/// Info hash of a result, from the indexer or the magnet's `btih`.
pub fn result_hash(result: &TorrentResult) -> Option<String> {
    result
        .info_hash
        .as_deref()
        .filter(|h| !h.is_empty())
        .map(str::to_lowercase)
        .or_else(|| result.magnet_uri.as_deref().and_then(magnet_hash))
}

/// Extract the `btih` hash from a magnet URI.
pub fn magnet_hash(magnet: &str) -> Option<String> {
    let lower = magnet.to_lowercase();
    let start = lower.find("urn:btih:")? + "urn:btih:".len();
    let hash: String = lower[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    (!hash.is_empty()).then_some(hash)
}

/// Lowercase alphanumeric words; apostrophes are dropped so "Grey's" matches "Greys".
fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .map(|w| w.replace('\'', "").to_lowercase())
        .filter(|w| !w.is_empty())
}

/// Every (season, episode) pair marked as SxxEyy in the title.
fn episode_markers(title: &str) -> Vec<(u32, u32)> {
    EPISODE_MARKER
        .captures_iter(title)
        .filter_map(|c| Some((c[1].parse().ok()?, c[2].parse().ok()?)))
        .collect()
}

/// Seasons marked as Sxx or "Season x" in the title.
fn season_markers(title: &str) -> Vec<u32> {
    SEASON_MARKER
        .captures_iter(title)
        .filter_map(|c| c[1].parse().ok())
        .collect()
}
