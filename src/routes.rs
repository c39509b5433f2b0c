//! Route table.
//!
//! Associates URL patterns with fully qualified segment names. Patterns use
//! the `:name` placeholder syntax:
//!
//! - `:name` matches one path segment,
//! - `:name*` matches the rest of the path,
//! - `:name?` matches one optional path segment.
//!
//! The table answers two questions: which segment a URL belongs to
//! ([`RouteTable::recognize`], feature `matcher`, backed by [`matchit`]) and
//! which URL a segment lives at ([`RouteTable::reverse_url`]).
//!
//! # Example
//!
//! ```
//! use route_segment::{RouteParams, RouteTable};
//!
//! let mut routes = RouteTable::new();
//! routes.register("/items/:id/:tab?", "items.item");
//!
//! let params = RouteParams::from_iter([("id", "7")]);
//! let url = routes.reverse_url("items.item", &RouteParams::new(), &params).unwrap();
//! assert_eq!(url, "/items/7");
//! ```

use crate::error::{Result, SegmentError};
use crate::info_log;
use crate::params::RouteParams;
use std::collections::HashMap;

/// A registered pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub pattern: String,
    pub segment: String,
}

/// Ordered pattern registrations plus the reverse mapping.
pub struct RouteTable {
    entries: Vec<RouteEntry>,
    reverse: HashMap<String, String>,
    #[cfg(feature = "matcher")]
    matcher: matchit::Router<usize>,
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTable")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            reverse: HashMap::new(),
            #[cfg(feature = "matcher")]
            matcher: matchit::Router::new(),
        }
    }
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `pattern` for the segment `segment`.
    ///
    /// The reverse mapping keeps the latest pattern per segment. When the
    /// same pattern is registered twice, the latest registration is the one
    /// [`recognize`](Self::recognize) dispatches to.
    pub fn register(&mut self, pattern: impl Into<String>, segment: impl Into<String>) {
        let entry = RouteEntry {
            pattern: pattern.into(),
            segment: segment.into(),
        };
        info_log!("Registered route '{}' -> '{}'", entry.pattern, entry.segment);

        self.reverse
            .insert(entry.segment.clone(), entry.pattern.clone());
        self.entries.push(entry);

        #[cfg(feature = "matcher")]
        self.rebuild_matcher();
    }

    /// All registrations in order.
    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Pattern registered last for `segment`.
    pub fn pattern_for(&self, segment: &str) -> Option<&str> {
        self.reverse.get(segment).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build the URL of `segment` from `current` route parameters overlaid
    /// with `params`.
    ///
    /// Optional placeholders with no value are dropped along with their
    /// leading `/`. A required placeholder with no value fails with
    /// [`SegmentError::MissingRouteParam`].
    pub fn reverse_url(
        &self,
        segment: &str,
        current: &RouteParams,
        params: &RouteParams,
    ) -> Result<String> {
        let pattern = self
            .pattern_for(segment)
            .ok_or_else(|| SegmentError::UnknownSegment {
                name: segment.to_string(),
            })?;
        let merged = RouteParams::merge(current, params);
        substitute(pattern, &merged)
    }

    /// Find the segment registered for `path` and the parameters it captures.
    #[cfg(feature = "matcher")]
    pub fn recognize(&self, path: &str) -> Result<(String, RouteParams)> {
        let path = if path.is_empty() { "/" } else { path };
        let matched = self
            .matcher
            .at(path)
            .map_err(|_| SegmentError::RouteNotFound {
                path: path.to_string(),
            })?;
        let entry = self
            .entries
            .get(*matched.value)
            .ok_or_else(|| SegmentError::RouteNotFound {
                path: path.to_string(),
            })?;

        let params = matched
            .params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Ok((entry.segment.clone(), params))
    }

    #[cfg(feature = "matcher")]
    fn rebuild_matcher(&mut self) {
        let mut matcher = matchit::Router::new();
        let mut seen = std::collections::HashSet::new();

        // Newest first, so a re-registered pattern keeps its latest segment.
        for (idx, entry) in self.entries.iter().enumerate().rev() {
            if !seen.insert(entry.pattern.as_str()) {
                continue;
            }
            for route in matcher_routes(&entry.pattern) {
                if let Err(err) = matcher.insert(route.clone(), idx) {
                    crate::warn_log!(
                        "Route '{}' ({}) not added to matcher: {}",
                        entry.pattern,
                        route,
                        err
                    );
                }
            }
        }

        self.matcher = matcher;
    }
}

/// Replace `:name` placeholders in `pattern` with values from `params`.
fn substitute(pattern: &str, params: &RouteParams) -> Result<String> {
    let mut url = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        if c != ':' {
            url.push(c);
            continue;
        }

        let mut name = String::new();
        while let Some(&n) = chars.peek() {
            if n.is_alphanumeric() || n == '_' {
                name.push(n);
                chars.next();
            } else {
                break;
            }
        }
        if name.is_empty() {
            url.push(c);
            continue;
        }

        let optional = match chars.peek() {
            Some(&'?') => {
                chars.next();
                true
            }
            Some(&'*') => {
                chars.next();
                false
            }
            _ => false,
        };

        match params.get(&name) {
            Some(value) => url.push_str(value),
            None if optional => {
                if url.ends_with('/') {
                    url.pop();
                }
            }
            None => {
                return Err(SegmentError::MissingRouteParam {
                    param: name,
                    route: pattern.to_string(),
                })
            }
        }
    }

    Ok(url)
}

/// `matchit` routes for one pattern. Each optional placeholder doubles the
/// variants: with and without that path segment.
#[cfg(feature = "matcher")]
fn matcher_routes(pattern: &str) -> Vec<String> {
    let mut variants: Vec<Vec<String>> = vec![Vec::new()];

    for part in pattern.split('/').filter(|s| !s.is_empty()) {
        match part.strip_prefix(':') {
            Some(name) if name.ends_with('?') => {
                let name = &name[..name.len() - 1];
                let with: Vec<Vec<String>> = variants
                    .iter()
                    .map(|v| {
                        let mut v = v.clone();
                        v.push(format!("{{{}}}", name));
                        v
                    })
                    .collect();
                variants.extend(with);
            }
            Some(name) if name.ends_with('*') => {
                let name = &name[..name.len() - 1];
                for v in &mut variants {
                    v.push(format!("{{*{}}}", name));
                }
            }
            Some(name) => {
                for v in &mut variants {
                    v.push(format!("{{{}}}", name));
                }
            }
            None => {
                for v in &mut variants {
                    v.push(part.to_string());
                }
            }
        }
    }

    variants
        .into_iter()
        .map(|parts| format!("/{}", parts.join("/")))
        .collect()
}
