//! Configuration-time API.
//!
//! [`RouteSegmentProvider`] collects everything the engine needs before
//! routing starts: the segment tree, the route table, and [`SegmentOptions`].
//! It stays reachable afterwards through
//! [`SegmentRouter::configure`](crate::SegmentRouter::configure).
//!
//! # Example
//!
//! ```
//! use route_segment::{RouteSegmentProvider, SegmentParams};
//!
//! # fn main() -> route_segment::Result<()> {
//! let mut provider = RouteSegmentProvider::new();
//! provider
//!     .when("/section1", "s1")
//!     .when("/section1/:id", "s1.itemInfo")
//!     .when("/section2", "s2");
//!
//! provider
//!     .add_segment("s1", SegmentParams::new().template_url("templates/section1.html"))
//!     .descend_last()?
//!     .add_segment("home", SegmentParams::new().template_url("templates/home.html").default_child())
//!     .add_segment("itemInfo", SegmentParams::new().dependencies(["id"]))
//!     .to_root()
//!     .add_segment("s2", SegmentParams::new());
//!
//! assert!(provider.tree().node(&["s1", "home"]).is_some());
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use crate::routes::RouteTable;
use crate::segment::SegmentParams;
use crate::tree::{SegmentPointer, SegmentTree};

/// Engine options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentOptions {
    /// Fetch `template_url` through the template source and expose the body
    /// as the `$template` local.
    pub auto_load_templates: bool,
    /// Fail on undeclared segments instead of creating them on the fly.
    pub strict_mode: bool,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            auto_load_templates: true,
            strict_mode: false,
        }
    }
}

impl SegmentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auto_load_templates(mut self, enabled: bool) -> Self {
        self.auto_load_templates = enabled;
        self
    }

    pub fn strict_mode(mut self, enabled: bool) -> Self {
        self.strict_mode = enabled;
        self
    }
}

/// Segment tree, route table, and options.
#[derive(Debug, Default)]
pub struct RouteSegmentProvider {
    tree: SegmentTree,
    routes: RouteTable,
    options: SegmentOptions,
}

impl RouteSegmentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: SegmentOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Register `pattern` for the fully qualified segment name `segment`.
    pub fn when(&mut self, pattern: impl Into<String>, segment: impl Into<String>) -> &mut Self {
        self.routes.register(pattern, segment);
        self
    }

    /// Add or overwrite a top-level segment. Returns the top-level cursor.
    pub fn add_segment(&mut self, name: impl Into<String>, params: SegmentParams) -> SegmentPointer<'_> {
        self.root().add_segment(name, params)
    }

    /// Cursor into the children of top-level segment `name`.
    pub fn descend(&mut self, name: &str) -> Result<SegmentPointer<'_>> {
        self.root().descend(name)
    }

    /// Cursor into the children of the top-level segment added last.
    pub fn descend_last(&mut self) -> Result<SegmentPointer<'_>> {
        self.root().descend_last()
    }

    /// Top-level cursor.
    pub fn root(&mut self) -> SegmentPointer<'_> {
        self.tree.pointer(self.options.strict_mode)
    }

    pub fn options(&self) -> &SegmentOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut SegmentOptions {
        &mut self.options
    }

    pub fn tree(&self) -> &SegmentTree {
        &self.tree
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }
}
