//! Exclude pattern matching for object keys.
//!
//! Supports .gitignore-style glob patterns for keeping keys out of a sync.

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Pattern matching for key exclusion.
#[derive(Debug, Clone)]
pub struct ExcludePatterns {
    /// Compiled glob set for matching.
    glob_set: GlobSet,
    /// Raw pattern strings (for display/serialization).
    patterns: Vec<String>,
}

impl Default for ExcludePatterns {
    fn default() -> Self {
        Self::new()
    }
}

impl ExcludePatterns {
    /// Create a new empty exclude pattern set.
    pub fn new() -> Self {
        Self {
            glob_set: GlobSet::empty(),
            patterns: Vec::new(),
        }
    }

    /// Create from a list of patterns.
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        let mut pattern_list = Vec::new();

        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = Glob::new(pattern)?;
            builder.add(glob);
            pattern_list.push(pattern.to_string());
        }

        Ok(Self {
            glob_set: builder.build()?,
            patterns: pattern_list,
        })
    }

    /// Parse patterns from a string (one per line, like .gitignore).
    pub fn parse_gitignore(content: &str) -> Result<Self> {
        let patterns: Vec<&str> = content
            .lines()
            .map(str::trim)
            // Negation (!) is not supported
            .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
            .collect();

        Self::from_patterns(&patterns)
    }

    /// Merge another exclude patterns set into this one.
    pub fn merge(&self, other: &ExcludePatterns) -> Result<Self> {
        let mut patterns = self.patterns.clone();
        for pattern in &other.patterns {
            if !patterns.contains(pattern) {
                patterns.push(pattern.clone());
            }
        }
        Self::from_patterns(&patterns)
    }

    /// Check if a key should be excluded.
    pub fn is_excluded(&self, key: &str) -> bool {
        if self.patterns.is_empty() {
            return false;
        }

        // Check against the full key
        if self.glob_set.is_match(key) {
            return true;
        }

        // Check each key segment for name patterns like "*.tmp" or "_temporary"
        key.split('/')
            .filter(|segment| !segment.is_empty())
            .any(|segment| self.glob_set.is_match(segment))
    }

    /// Get the list of patterns.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
