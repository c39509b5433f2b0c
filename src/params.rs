//! Route parameters.
//!
//! [`RouteParams`] is the string mapping the host router extracts from the
//! matched URL (e.g. `:id` in `/items/:id`). The engine keeps two copies:
//! the live parameters of the latest route change, and a snapshot taken at the
//! latest committed segment update. Segment `dependencies` compare the two.
//!
//! # Example
//!
//! ```
//! use route_segment::RouteParams;
//!
//! let params = RouteParams::from_iter([("id", "42"), ("tab", "info")]);
//! assert_eq!(params.get_as::<u32>("id"), Some(42));
//! assert_eq!(params.get("tab"), Some(&"info".to_string()));
//! ```

use std::collections::HashMap;

/// Route parameters captured from the current URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    params: HashMap<String, String>,
}

impl RouteParams {
    /// Create empty route parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from an existing `HashMap`.
    pub fn from_map(params: HashMap<String, String>) -> Self {
        Self { params }
    }

    /// Get a parameter value by key.
    pub fn get(&self, key: &str) -> Option<&String> {
        self.params.get(key)
    }

    /// Get a parameter and parse it as a specific type.
    ///
    /// Returns `None` if the parameter doesn't exist or cannot be parsed.
    pub fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: std::str::FromStr,
    {
        self.params.get(key)?.parse().ok()
    }

    /// Insert or overwrite a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Return `true` if the given key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Get a reference to the underlying parameter map.
    pub fn all(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// Iterate over all `(key, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.params.iter()
    }

    /// Return `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Return the number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether `key` holds a different value (or presence) in `other`.
    pub fn differs(&self, other: &RouteParams, key: &str) -> bool {
        self.params.get(key) != other.params.get(key)
    }

    /// Overlay `overrides` on top of `base`; keys in `overrides` win.
    ///
    /// # Example
    ///
    /// ```
    /// use route_segment::RouteParams;
    ///
    /// let current = RouteParams::from_iter([("id", "1"), ("tab", "info")]);
    /// let given = RouteParams::from_iter([("id", "2")]);
    ///
    /// let merged = RouteParams::merge(&current, &given);
    /// assert_eq!(merged.get("id"), Some(&"2".to_string()));
    /// assert_eq!(merged.get("tab"), Some(&"info".to_string()));
    /// ```
    pub fn merge(base: &RouteParams, overrides: &RouteParams) -> RouteParams {
        let mut merged = base.clone();
        for (key, value) in overrides.iter() {
            merged.params.insert(key.clone(), value.clone());
        }
        merged
    }
}

impl<K, V> FromIterator<(K, V)> for RouteParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            params: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
