//! Segment configuration.
//!
//! [`SegmentParams`] is the configuration bag attached to every node of the
//! segment tree. Everything is optional; an empty bag is a valid segment that
//! resolves immediately with no locals.
//!
//! # Example
//!
//! ```
//! use route_segment::{Invocable, Resolution, SegmentParams};
//! use serde_json::json;
//!
//! let params = SegmentParams::new()
//!     .template_url("/templates/item.html")
//!     .controller("ItemCtrl")
//!     .resolve("item", "itemLoader")
//!     .resolve("now", Invocable::from_fn(|| Resolution::ready(1_700_000_000)))
//!     .dependencies(["id"])
//!     .until_resolved(SegmentParams::new().template("<p>Loading...</p>"))
//!     .resolve_failed(SegmentParams::new().template("<p>Failed</p>"))
//!     .data("title", json!("Item"));
//!
//! assert_eq!(params.dependencies, vec!["id".to_string()]);
//! assert!(params.until_resolved.is_some());
//! ```

use crate::inject::Invocable;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Local holding the resolved template text.
pub const TEMPLATE_LOCAL: &str = "$template";

/// Local a `resolve_failed` fallback receives the rejection reason under.
pub const ERROR_LOCAL: &str = "error";

/// Resolved values made available to a segment's template and controller.
pub type Locals = Map<String, Value>;

/// A template or template URL: literal text, or computed through the injector.
#[derive(Debug, Clone)]
pub enum Template {
    /// Literal text.
    Text(String),
    /// Evaluated through [`Injector::invoke`](crate::Injector::invoke); the
    /// result may be deferred.
    Invoke(Invocable),
}

impl From<&str> for Template {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Template {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Invocable> for Template {
    fn from(invocable: Invocable) -> Self {
        Self::Invoke(invocable)
    }
}

/// One `resolve` entry.
#[derive(Debug, Clone)]
pub enum Resolvable {
    /// Name of an injectable, fetched with [`Injector::get`](crate::Injector::get).
    Injectable(String),
    /// Callable evaluated with [`Injector::invoke`](crate::Injector::invoke).
    Invoke(Invocable),
    /// A value known up front.
    Value(Value),
}

impl From<&str> for Resolvable {
    fn from(name: &str) -> Self {
        Self::Injectable(name.to_string())
    }
}

impl From<String> for Resolvable {
    fn from(name: String) -> Self {
        Self::Injectable(name)
    }
}

impl From<Invocable> for Resolvable {
    fn from(invocable: Invocable) -> Self {
        Self::Invoke(invocable)
    }
}

impl From<Value> for Resolvable {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// Configuration of a single segment.
///
/// Fields are public for reading; build with the chained setters.
#[derive(Clone, Default)]
pub struct SegmentParams {
    /// Template text, or a callable producing it.
    pub template: Option<Template>,
    /// URL of a template fetched through the [`TemplateSource`](crate::TemplateSource)
    /// when `auto_load_templates` is on.
    pub template_url: Option<Template>,
    /// Controller name, passed through to the view renderer.
    pub controller: Option<String>,
    /// Controller alias, passed through to the view renderer.
    pub controller_as: Option<String>,
    /// Values to resolve before the segment is committed, by local name.
    pub resolve: BTreeMap<String, Resolvable>,
    /// Parameters shown while `resolve` is pending.
    pub until_resolved: Option<Box<SegmentParams>>,
    /// Parameters shown if `resolve` rejects.
    pub resolve_failed: Option<Box<SegmentParams>>,
    /// Route parameters whose change re-resolves this segment.
    pub dependencies: Vec<String>,
    /// Function re-evaluated on every digest; a changed value reloads the segment.
    pub watcher: Option<Invocable>,
    /// Whether this segment is picked automatically when its parent is the
    /// deepest level of a route.
    pub default: bool,
    /// Arbitrary host keys.
    pub data: Map<String, Value>,
}

impl SegmentParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn template(mut self, text: impl Into<String>) -> Self {
        self.template = Some(Template::Text(text.into()));
        self
    }

    pub fn template_with(mut self, invocable: Invocable) -> Self {
        self.template = Some(Template::Invoke(invocable));
        self
    }

    pub fn template_url(mut self, url: impl Into<String>) -> Self {
        self.template_url = Some(Template::Text(url.into()));
        self
    }

    pub fn template_url_with(mut self, invocable: Invocable) -> Self {
        self.template_url = Some(Template::Invoke(invocable));
        self
    }

    pub fn controller(mut self, name: impl Into<String>) -> Self {
        self.controller = Some(name.into());
        self
    }

    pub fn controller_as(mut self, alias: impl Into<String>) -> Self {
        self.controller_as = Some(alias.into());
        self
    }

    /// Add a `resolve` entry. A string names an injectable; an
    /// [`Invocable`] is called.
    pub fn resolve(mut self, key: impl Into<String>, value: impl Into<Resolvable>) -> Self {
        self.resolve.insert(key.into(), value.into());
        self
    }

    pub fn until_resolved(mut self, params: SegmentParams) -> Self {
        self.until_resolved = Some(Box::new(params));
        self
    }

    pub fn resolve_failed(mut self, params: SegmentParams) -> Self {
        self.resolve_failed = Some(Box::new(params));
        self
    }

    pub fn dependencies<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = names.into_iter().map(Into::into).collect();
        self
    }

    /// Attach a watcher. The reserved dependency name `segment` receives the
    /// resolved segment.
    pub fn watcher(mut self, invocable: Invocable) -> Self {
        self.watcher = Some(invocable);
        self
    }

    /// Mark as the default child of its parent.
    pub fn default_child(mut self) -> Self {
        self.default = true;
        self
    }

    pub fn data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Copy without the `until_resolved` and `resolve_failed` stages.
    pub(crate) fn without_stages(&self) -> SegmentParams {
        SegmentParams {
            until_resolved: None,
            resolve_failed: None,
            ..self.clone()
        }
    }

    /// Copy whose only `resolve` entry is the rejection reason.
    pub(crate) fn with_error(&self, reason: Value) -> SegmentParams {
        let mut resolve = BTreeMap::new();
        resolve.insert(ERROR_LOCAL.to_string(), Resolvable::Value(reason));
        SegmentParams {
            resolve,
            ..self.clone()
        }
    }

    /// Whether a route parameter named in `dependencies` changed between the
    /// two snapshots.
    pub(crate) fn dependencies_changed(
        &self,
        committed: &crate::RouteParams,
        live: &crate::RouteParams,
    ) -> bool {
        self.dependencies
            .iter()
            .any(|name| committed.differs(live, name))
    }
}

impl fmt::Debug for SegmentParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentParams")
            .field("template", &self.template)
            .field("template_url", &self.template_url)
            .field("controller", &self.controller)
            .field("controller_as", &self.controller_as)
            .field("resolve", &self.resolve.keys().collect::<Vec<_>>())
            .field("until_resolved", &self.until_resolved.is_some())
            .field("resolve_failed", &self.resolve_failed.is_some())
            .field("dependencies", &self.dependencies)
            .field("watcher", &self.watcher.is_some())
            .field("default", &self.default)
            .field("data", &self.data)
            .finish()
    }
}
