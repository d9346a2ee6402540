//! Forward-slash route paths shared by the router, tool registry, and
//! orchestration engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A forward-slash path such as `/research/brave/fast`. The root path is `/`.
///
/// Paths are normalized on construction: a trailing slash (other than the
/// root) is stripped, and a missing leading slash is added.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(String);

impl Path {
    /// The root path, `/`.
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Normalize and construct a path from any string-like input.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let raw = raw.as_ref();
        let mut normalized = if raw.starts_with('/') {
            raw.to_string()
        } else {
            format!("/{raw}")
        };
        if normalized.len() > 1 && normalized.ends_with('/') {
            normalized.pop();
        }
        Self(normalized)
    }

    /// Borrow the normalized path string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if this is the root path.
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Split into non-empty segments, root yields an empty iterator.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Join a child segment or subpath onto this path.
    pub fn join(&self, child: impl AsRef<str>) -> Self {
        let child = child.as_ref();
        if child.is_empty() {
            return self.clone();
        }
        if self.is_root() {
            return Self::new(child);
        }
        Self::new(format!("{}/{}", self.0, child.trim_start_matches('/')))
    }

    /// True if `self` is `other` or an ancestor of `other` in the trie.
    pub fn is_prefix_of(&self, other: &Path) -> bool {
        if self.is_root() {
            return true;
        }
        other.0 == self.0 || other.0.starts_with(&format!("{}/", self.0))
    }

    /// The tool-key slug: leading slash stripped, non-alphanumerics to `_`.
    pub fn tool_key(&self) -> String {
        let trimmed = self.0.trim_start_matches('/');
        let mut out = String::with_capacity(trimmed.len());
        for ch in trimmed.chars() {
            if ch.is_ascii_alphanumeric() {
                out.push(ch);
            } else {
                out.push('_');
            }
        }
        if out.is_empty() {
            "root".to_string()
        } else {
            out
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Path {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl Default for Path {
    fn default() -> Self {
        Self::root()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_leading_and_trailing_slashes() {
        assert_eq!(Path::new("research/brave").as_str(), "/research/brave");
        assert_eq!(Path::new("/research/brave/").as_str(), "/research/brave");
        assert_eq!(Path::new("/").as_str(), "/");
    }

    #[test]
    fn segments_split_on_slash() {
        let p = Path::new("/research/brave/fast");
        assert_eq!(p.segments().collect::<Vec<_>>(), vec!["research", "brave", "fast"]);
        assert_eq!(Path::root().segments().count(), 0);
    }

    #[test]
    fn join_builds_child_paths() {
        assert_eq!(Path::root().join("chat").as_str(), "/chat");
        assert_eq!(Path::new("/a").join("/b").as_str(), "/a/b");
        assert_eq!(Path::new("/a").join("b/c").as_str(), "/a/b/c");
    }

    #[test]
    fn prefix_matching() {
        let root = Path::root();
        let a = Path::new("/a");
        let ab = Path::new("/a/b");
        assert!(root.is_prefix_of(&ab));
        assert!(a.is_prefix_of(&ab));
        assert!(!ab.is_prefix_of(&a));
        assert!(!Path::new("/ab").is_prefix_of(&Path::new("/a/b")));
    }

    #[test]
    fn tool_key_replaces_non_alphanumerics() {
        assert_eq!(Path::new("/research/brave-fast").tool_key(), "research_brave_fast");
        assert_eq!(Path::root().tool_key(), "root");
    }
}
