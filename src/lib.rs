//! # Route Segment
//!
//! A hierarchical route resolver. A route maps to a fully qualified segment
//! name such as `section2.section23`; each dot-separated component is an
//! independently configured level with its own template, controller, and
//! asynchronous data. On navigation only the levels that actually changed are
//! resolved again, so unaffected ancestors keep their state.
//!
//! - **Segment Tree** - Nested segment definitions built with a cursor API
//! - **Route Table** - Pattern to segment mapping, forward and reverse
//! - **Resolution Pipeline** - Per-level diffing and asynchronous resolving
//!   with `until_resolved` / `resolve_failed` stages and default children
//! - **Watchers** - Reload a level when a watched value changes
//! - **Template Cache** - LRU cache in front of the template source
//!
//! # Quick Start
//!
//! ```
//! use route_segment::*;
//!
//! # fn main() -> route_segment::Result<()> {
//! let mut provider = RouteSegmentProvider::new();
//! provider
//!     .when("/section1", "s1")
//!     .when("/section1/:id", "s1.item");
//!
//! provider
//!     .add_segment("s1", SegmentParams::new().template("<div>s1</div>"))
//!     .descend_last()?
//!     .add_segment("item", SegmentParams::new().template("<div>item</div>").dependencies(["id"]));
//!
//! let router = SegmentRouter::new(provider, StaticInjector::new(), NoTemplates);
//! router.subscribe(|change| {
//!     let name = change.segment.as_ref().map(|s| s.name().to_string());
//!     println!("level {} is now {:?}", change.index, name);
//! });
//!
//! pollster::block_on(router.navigate_path("/section1/42"))?;
//! assert_eq!(router.name(), "s1.item");
//! assert_eq!(router.param("id").as_deref(), Some("42"));
//! assert_eq!(router.url_for("s1.item", &RouteParams::from_iter([("id", "7")]))?, "/section1/7");
//! # Ok(())
//! # }
//! ```
//!
//! # Feature Flags
//!
//! - `log` (default) - Uses the standard `log` crate for logging
//! - `tracing` - Uses the `tracing` crate for structured logging (mutually exclusive with `log`)
//! - `cache` (default) - LRU template cache
//! - `matcher` (default) - URL recognition in the route table

#![cfg_attr(docsrs, feature(doc_cfg))]
// Lints are configured in Cargo.toml [lints] section

// Logging abstraction
pub mod logging;

// Cache (optional)
#[cfg(feature = "cache")]
pub mod cache;

// Error handling
pub mod error;

// Collaborator interfaces
pub mod inject;
pub mod template;

// Configuration
pub mod params;
pub mod provider;
pub mod routes;
pub mod segment;
pub mod tree;

// Engine
pub mod state;
mod context;
mod resolve;
mod watcher;

// Re-export main types for convenient access
#[cfg(feature = "cache")]
pub use cache::{CacheStats, CachedTemplates};
pub use context::{RouteChange, SegmentRouter};
pub use error::{Rejection, Result, SegmentError};
pub use inject::{
    Deferred, Injector, Invocable, InvokeArgs, Resolution, StaticInjector, SEGMENT_DEPENDENCY,
};
pub use params::RouteParams;
pub use provider::{RouteSegmentProvider, SegmentOptions};
pub use routes::{RouteEntry, RouteTable};
pub use segment::{Locals, Resolvable, SegmentParams, Template, ERROR_LOCAL, TEMPLATE_LOCAL};
pub use state::{ListenerId, ResolvedSegment, SegmentChange};
pub use template::{NoTemplates, StaticTemplates, TemplateFuture, TemplateSource};
pub use tree::{camel_case, SegmentNode, SegmentPointer, SegmentTree};
pub use watcher::WatcherId;
