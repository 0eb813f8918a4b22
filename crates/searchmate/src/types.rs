//! Core value types shared by the walker, cache and orchestrator.

use std::collections::hash_set;
use std::collections::HashSet;
use std::path::Path;

use crate::cache::CacheKey;

/// Default minimum trimmed query length before a search is attempted.
pub const MIN_QUERY_LEN: usize = 3;

/// A free-text query as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Returns the query exactly as submitted.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }

    pub fn is_blank(&self) -> bool {
        self.trimmed().is_empty()
    }

    /// Returns true if the trimmed query is at least `min_len` characters long.
    pub fn is_eligible(&self, min_len: usize) -> bool {
        self.trimmed().chars().count() >= min_len
    }

    /// Lower-cased substring that file names are matched against, with
    /// whitespace runs collapsed into single spaces.
    pub fn pattern(&self) -> String {
        self.cache_key().pattern().to_string()
    }

    /// Cache key shared by every query that differs only in case or spacing.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::from_query(&self.text)
    }
}

impl From<&str> for Query {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// Deduplicated, unordered set of absolute file paths matching a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    paths: HashSet<String>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a path. Returns false if it was already present.
    pub fn insert(&mut self, path: impl Into<String>) -> bool {
        self.paths.insert(path.into())
    }

    pub fn remove(&mut self, path: &str) -> bool {
        self.paths.remove(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> hash_set::Iter<'_, String> {
        self.paths.iter()
    }

    /// Drops every path that no longer exists on disk. Returns how many were dropped.
    pub fn retain_existing(&mut self) -> usize {
        let before = self.paths.len();
        self.paths.retain(|path| Path::new(path).exists());
        before - self.paths.len()
    }

    /// Shrinks the set to at most `max` paths.
    ///
    /// Which paths survive is deterministic (lexicographically smallest) so that
    /// repeated truncations of the same walk agree with each other.
    pub fn truncate(&mut self, max: usize) {
        if self.paths.len() <= max {
            return;
        }
        let mut sorted = self.sorted();
        sorted.truncate(max);
        self.paths = sorted.into_iter().collect();
    }

    /// Returns the paths in lexicographic order, for display.
    pub fn sorted(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.paths.iter().cloned().collect();
        paths.sort_unstable();
        paths
    }
}

impl FromIterator<String> for ResultSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}

impl Extend<String> for ResultSet {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        self.paths.extend(iter);
    }
}

impl IntoIterator for ResultSet {
    type Item = String;
    type IntoIter = hash_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a String;
    type IntoIter = hash_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn query_eligibility_uses_trimmed_length() {
        assert!(!Query::new("  ab  ").is_eligible(MIN_QUERY_LEN));
        assert!(Query::new(" abc ").is_eligible(MIN_QUERY_LEN));
        assert!(Query::new("ab").is_eligible(2));
        assert!(Query::new("   ").is_blank());
    }

    #[test]
    fn pattern_is_lowercased_and_trimmed() {
        assert_eq!(Query::new("  RePort ").pattern(), "report");
        assert_eq!(Query::new(" Report \t  Old ").pattern(), "report old");
    }

    #[test]
    fn result_set_deduplicates() {
        let mut set = ResultSet::new();
        assert!(set.insert("/a/b.txt"));
        assert!(!set.insert("/a/b.txt"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn truncate_keeps_smallest_paths() {
        let mut set: ResultSet = ["/c", "/a", "/d", "/b"]
            .into_iter()
            .map(String::from)
            .collect();
        set.truncate(2);
        assert_eq!(set.sorted(), vec!["/a".to_string(), "/b".to_string()]);
    }

    #[test]
    fn retain_existing_drops_missing_paths() {
        let temp = TempDir::new().unwrap();
        let present = temp.path().join("present.txt");
        File::create(&present).unwrap();

        let mut set = ResultSet::new();
        set.insert(present.to_string_lossy());
        set.insert(temp.path().join("gone.txt").to_string_lossy());

        assert_eq!(set.retain_existing(), 1);
        assert!(set.contains(&present.to_string_lossy()));
    }
}
