use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered key sequence locating a value in a tree-shaped document.
///
/// The first segment is a node identifier; the remaining segments are
/// property names. Numeric segments are carried in decimal string form so
/// the dot-joined wire form round-trips exactly.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Path(Vec<String>);

impl Path {
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Parse a dot-joined path as used by the wire format, e.g. `"p1.content"`.
    pub fn from_dotted(dotted: &str) -> Self {
        if dotted.is_empty() {
            return Self(Vec::new());
        }
        Self(dotted.split('.').map(str::to_string).collect())
    }

    /// Dot-joined form used by the wire format.
    pub fn to_dotted(&self) -> String {
        self.0.join(".")
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }

    /// Segments of `self` below `prefix`, or `None` when `self` does not
    /// start with `prefix`.
    pub fn relative_to<'a>(&'a self, prefix: &Path) -> Option<&'a [String]> {
        if self.starts_with(prefix) {
            Some(&self.0[prefix.0.len()..])
        } else {
            None
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_dotted())
    }
}

impl<const N: usize> From<[&str; N]> for Path {
    fn from(segments: [&str; N]) -> Self {
        Self(segments.iter().map(|s| s.to_string()).collect())
    }
}

impl From<&[&str]> for Path {
    fn from(segments: &[&str]) -> Self {
        Self(segments.iter().map(|s| s.to_string()).collect())
    }
}

impl From<Vec<String>> for Path {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

/// A (path, offset) pointer into text content, e.g. a cursor or an
/// annotation boundary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinate {
    pub path: Path,
    pub offset: usize,
}

impl Coordinate {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }
}
