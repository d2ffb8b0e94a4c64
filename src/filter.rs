//! Element filtering before diffing and committing
//!
//! Not every element in a document belongs in a changelog. The filter drops:
//! - elements whose name matches one of the ignore globs (`"_*"`, `"Draft/**"`)
//! - private elements, named with a leading `_` or `.`, when enabled
//! - kinds outside the tracked set, when one is configured
//!
//! Patterns use `globset` syntax and match against the element name, with `/`
//! acting as the separator for grouped names such as `"Brand/Primary"`.

use crate::error::Result;
use crate::types::{ElementKind, ElementRecord, Snapshot};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeSet;
use tracing::debug;

/// Decides which observed elements are tracked
#[derive(Debug, Clone)]
pub struct ElementFilter {
    patterns: Vec<String>,
    ignore: GlobSet,
    skip_private: bool,
    kinds: Option<BTreeSet<ElementKind>>,
}

impl Default for ElementFilter {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            ignore: GlobSet::empty(),
            skip_private: false,
            kinds: None,
        }
    }
}

impl ElementFilter {
    /// Create a filter that tracks everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile ignore patterns
    ///
    /// # Errors
    ///
    /// - [`SnapError::InvalidPattern`](crate::SnapError::InvalidPattern) if a pattern does not compile
    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            builder.add(Glob::new(pattern)?);
        }
        self.ignore = builder.build()?;
        self.patterns = patterns;
        Ok(self)
    }

    /// Skip elements whose name starts with `_` or `.`
    pub fn with_skip_private(mut self, skip: bool) -> Self {
        self.skip_private = skip;
        self
    }

    /// Only track the given kinds
    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = ElementKind>) -> Self {
        self.kinds = Some(kinds.into_iter().collect());
        self
    }

    /// Configured ignore patterns
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Check whether `element` is tracked
    pub fn accepts(&self, element: &ElementRecord) -> bool {
        if let Some(kinds) = &self.kinds {
            if !kinds.contains(&element.kind) {
                return false;
            }
        }
        if self.skip_private && (element.name.starts_with('_') || element.name.starts_with('.')) {
            return false;
        }
        !self.ignore.is_match(&element.name)
    }

    /// Drop untracked elements from `snapshot`
    pub fn apply(&self, mut snapshot: Snapshot) -> Snapshot {
        let before = snapshot.elements.len();
        snapshot.elements.retain(|e| self.accepts(e));
        let dropped = before - snapshot.elements.len();
        if dropped > 0 {
            debug!(dropped, kept = snapshot.elements.len(), "filtered untracked elements");
        }
        snapshot
    }
}
