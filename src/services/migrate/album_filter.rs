use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::ports::deezer::ResolvedPair;

/// Which tracks of a Deezer album to download.
///
/// `whole` wins over `tracks`: once an album is requested whole, the explicit track set
/// no longer restricts anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlbumFilter {
    pub whole: bool,
    pub tracks: HashSet<String>,
}

impl AlbumFilter {
    pub fn whole() -> Self {
        Self {
            whole: true,
            tracks: HashSet::new(),
        }
    }

    pub fn partial(track_id: impl Into<String>) -> Self {
        Self {
            whole: false,
            tracks: HashSet::from([track_id.into()]),
        }
    }

    /// Combine two filters for the same album. Commutative and associative, so the
    /// result does not depend on the order album facts arrive in.
    pub fn merge(mut self, other: AlbumFilter) -> Self {
        self.whole |= other.whole;
        self.tracks.extend(other.tracks);
        self
    }

    pub fn selects(&self, track_id: &str) -> bool {
        self.whole || self.tracks.contains(track_id)
    }
}

impl fmt::Display for AlbumFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.whole {
            write!(f, "whole album")
        } else {
            write!(f, "{} selected track(s)", self.tracks.len())
        }
    }
}

/// Album id -> filter for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlbumFilters(HashMap<String, AlbumFilter>);

impl AlbumFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one filter into the album's entry, creating it on first touch.
    pub fn insert(&mut self, album_id: impl Into<String>, filter: AlbumFilter) {
        let album_id = album_id.into();
        let merged = match self.0.remove(&album_id) {
            Some(existing) => existing.merge(filter),
            None => filter,
        };
        self.0.insert(album_id, merged);
    }

    pub fn add_track(&mut self, pair: ResolvedPair) {
        self.insert(pair.album_id, AlbumFilter::partial(pair.track_id));
    }

    pub fn add_whole_album(&mut self, album_id: impl Into<String>) {
        self.insert(album_id, AlbumFilter::whole());
    }

    pub fn get(&self, album_id: &str) -> Option<&AlbumFilter> {
        self.0.get(album_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AlbumFilter)> {
        self.0.iter()
    }
}

impl IntoIterator for AlbumFilters {
    type Item = (String, AlbumFilter);
    type IntoIter = std::collections::hash_map::IntoIter<String, AlbumFilter>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Group resolved playlist tracks and whole-album requests into per-album filters.
pub fn build_album_filters(
    pairs: impl IntoIterator<Item = ResolvedPair>,
    whole_albums: impl IntoIterator<Item = String>,
) -> AlbumFilters {
    let mut filters = AlbumFilters::new();
    for pair in pairs {
        filters.add_track(pair);
    }
    for album_id in whole_albums {
        filters.add_whole_album(album_id);
    }
    filters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(track_id: &str, album_id: &str) -> ResolvedPair {
        ResolvedPair {
            track_id: track_id.into(),
            album_id: album_id.into(),
        }
    }

    #[test]
    fn test_tracks_of_same_album_are_grouped() {
        let filters = build_album_filters(vec![pair("t1", "al"), pair("t2", "al")], vec![]);

        assert_eq!(filters.len(), 1);
        let filter = filters.get("al").unwrap();
        assert!(!filter.whole);
        assert_eq!(
            filter.tracks,
            HashSet::from(["t1".to_string(), "t2".to_string()])
        );
    }

    #[test]
    fn test_whole_album_request_creates_empty_whole_filter() {
        let filters = build_album_filters(vec![], vec!["al".to_string()]);

        assert_eq!(filters.get("al"), Some(&AlbumFilter::whole()));
    }

    #[test]
    fn test_whole_wins_when_tracks_come_first() {
        let mut filters = AlbumFilters::new();
        filters.add_track(pair("t1", "al"));
        filters.add_whole_album("al");

        assert!(filters.get("al").unwrap().whole);
    }

    #[test]
    fn test_whole_wins_when_album_comes_first() {
        let mut filters = AlbumFilters::new();
        filters.add_whole_album("al");
        filters.add_track(pair("t1", "al"));

        let filter = filters.get("al").unwrap();
        assert!(filter.whole);
        assert!(filter.selects("any-track-on-the-album"));
    }

    #[test]
    fn test_merge_is_commutative() {
        let a = AlbumFilter::partial("t1").merge(AlbumFilter::partial("t2"));
        let b = AlbumFilter::whole();

        assert_eq!(a.clone().merge(b.clone()), b.merge(a));
    }

    #[test]
    fn test_merge_is_associative() {
        let a = AlbumFilter::partial("t1");
        let b = AlbumFilter::whole();
        let c = AlbumFilter::partial("t3");

        assert_eq!(
            a.clone().merge(b.clone()).merge(c.clone()),
            a.merge(b.merge(c))
        );
    }

    #[test]
    fn test_duplicate_tracks_collapse() {
        let filters = build_album_filters(vec![pair("t1", "al"), pair("t1", "al")], vec![]);
        assert_eq!(filters.get("al").unwrap().tracks.len(), 1);
    }

    #[test]
    fn test_selects_only_listed_tracks_when_partial() {
        let filter = AlbumFilter::partial("t1");
        assert!(filter.selects("t1"));
        assert!(!filter.selects("t2"));
    }

    #[test]
    fn test_separate_albums_stay_separate() {
        let filters = build_album_filters(
            vec![pair("t1", "a1"), pair("t2", "a2")],
            vec!["a3".to_string()],
        );

        assert_eq!(filters.len(), 3);
        assert!(!filters.get("a1").unwrap().whole);
        assert!(!filters.get("a2").unwrap().whole);
        assert!(filters.get("a3").unwrap().whole);
    }

    #[test]
    fn test_display() {
        assert_eq!(AlbumFilter::whole().to_string(), "whole album");
        assert_eq!(AlbumFilter::partial("t").to_string(), "1 selected track(s)");
    }
}
