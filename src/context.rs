//! The resolution engine handle.
//!
//! [`SegmentRouter`] owns one engine instance: the provider it was built
//! from, the chain state, listeners, and watchers. It is a cheap handle
//! (`Rc` inside); clones share the same engine.
//!
//! The engine never spawns. Operations that resolve segments return a
//! [`LocalBoxFuture`] that the host drives on its own single-threaded
//! executor. Several of them may be in flight at once; superseded work is
//! discarded when it completes.
//!
//! # Example
//!
//! ```
//! use route_segment::{
//!     NoTemplates, RouteChange, RouteSegmentProvider, SegmentParams, SegmentRouter, StaticInjector,
//! };
//! use serde_json::json;
//!
//! let mut provider = RouteSegmentProvider::new();
//! provider.when("/2/X", "section2.section21");
//! provider
//!     .add_segment("section2", SegmentParams::new())
//!     .descend_last()
//!     .unwrap()
//!     .add_segment("section21", SegmentParams::new().resolve("answer", "answer"));
//!
//! let injector = StaticInjector::new().with("answer", 42);
//! let router = SegmentRouter::new(provider, injector, NoTemplates);
//!
//! pollster::block_on(router.navigate(RouteChange::to("section2.section21"))).unwrap();
//! assert_eq!(router.name(), "section2.section21");
//! assert_eq!(router.segment(1).unwrap().local("answer"), Some(&json!(42)));
//! ```

use crate::error::Result;
use crate::inject::Injector;
use crate::params::RouteParams;
use crate::provider::{RouteSegmentProvider, SegmentOptions};
use crate::state::{ChainState, ListenerId, Listeners, ResolvedSegment, SegmentChange};
use crate::template::TemplateSource;
use crate::watcher::WatcherSet;
use futures::future::LocalBoxFuture;
use std::cell::RefCell;
use std::rc::Rc;

// ============================================================================
// RouteChange
// ============================================================================

/// A route change reported by the host router.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteChange {
    /// Fully qualified segment name of the matched route, if it has one.
    pub segment: Option<String>,
    /// Route parameters of the matched route.
    pub params: RouteParams,
}

impl RouteChange {
    /// A change to the route associated with `segment`.
    pub fn to(segment: impl Into<String>) -> Self {
        Self {
            segment: Some(segment.into()),
            params: RouteParams::new(),
        }
    }

    /// A change to a route without an associated segment.
    pub fn unsegmented() -> Self {
        Self::default()
    }

    pub fn with_params(mut self, params: RouteParams) -> Self {
        self.params = params;
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key, value);
        self
    }
}

// ============================================================================
// SegmentRouter
// ============================================================================

pub(crate) struct RouterInner {
    pub(crate) provider: RefCell<RouteSegmentProvider>,
    pub(crate) state: RefCell<ChainState>,
    pub(crate) listeners: RefCell<Listeners>,
    pub(crate) watchers: RefCell<WatcherSet>,
    pub(crate) injector: Rc<dyn Injector>,
    pub(crate) templates: Rc<dyn TemplateSource>,
}

/// Handle to a segment resolution engine.
#[derive(Clone)]
pub struct SegmentRouter {
    inner: Rc<RouterInner>,
}

impl SegmentRouter {
    /// Build an engine from its configuration and collaborators.
    pub fn new<I, T>(provider: RouteSegmentProvider, injector: I, templates: T) -> Self
    where
        I: Injector + 'static,
        T: TemplateSource + 'static,
    {
        Self {
            inner: Rc::new(RouterInner {
                provider: RefCell::new(provider),
                state: RefCell::new(ChainState::default()),
                listeners: RefCell::new(Listeners::default()),
                watchers: RefCell::new(WatcherSet::default()),
                injector: Rc::new(injector),
                templates: Rc::new(templates),
            }),
        }
    }

    /// Apply a route change.
    ///
    /// The live route parameters and the level diff are updated right away;
    /// the returned future resolves the changed levels. It completes with
    /// `Ok(())` once a newer navigation or reload claims a level it was
    /// resolving.
    pub fn navigate(&self, change: RouteChange) -> LocalBoxFuture<'static, Result<()>> {
        crate::resolve::navigate(&self.inner, change)
    }

    /// Recognize `path` against the registered routes and navigate there.
    #[cfg(feature = "matcher")]
    pub fn navigate_path(&self, path: &str) -> LocalBoxFuture<'static, Result<()>> {
        use futures::future::{self, FutureExt};

        let recognized = self.inner.provider.borrow().routes().recognize(path);
        match recognized {
            Ok((segment, params)) => self.navigate(RouteChange::to(segment).with_params(params)),
            Err(err) => future::ready(Err(err)).boxed_local(),
        }
    }

    /// Reload level `index`. See [`ResolvedSegment::reload`].
    pub fn reload(&self, index: usize) -> LocalBoxFuture<'static, Result<()>> {
        crate::resolve::reload(&self.inner, index)
    }

    /// Evaluate every watcher; the returned future reloads what changed and
    /// yields the number of changed watchers.
    ///
    /// Watchers are evaluated when `digest` is called, not when the future is
    /// first polled.
    pub fn digest(&self) -> LocalBoxFuture<'static, Result<usize>> {
        crate::watcher::digest(&self.inner)
    }

    /// Call `listener` for every per-level change.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&SegmentChange) + 'static,
    {
        self.inner.listeners.borrow_mut().add(Rc::new(listener))
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner.listeners.borrow_mut().remove(id)
    }

    /// Dot-joined names of the resolved levels; empty before the first
    /// commit.
    pub fn name(&self) -> String {
        self.inner.state.borrow().name.clone()
    }

    /// The chain, holes included.
    pub fn chain(&self) -> Vec<Option<Rc<ResolvedSegment>>> {
        self.inner.state.borrow().chain.clone()
    }

    pub fn segment(&self, index: usize) -> Option<Rc<ResolvedSegment>> {
        self.inner.state.borrow().segment(index)
    }

    /// Route parameters as of the latest notification. They lag behind the
    /// live parameters while levels are resolving.
    pub fn route_params(&self) -> RouteParams {
        self.inner.state.borrow().committed.clone()
    }

    /// Route parameters of the latest route change.
    pub fn live_params(&self) -> RouteParams {
        self.inner.state.borrow().live.clone()
    }

    /// One committed route parameter.
    pub fn param(&self, name: &str) -> Option<String> {
        self.inner.state.borrow().committed.get(name).cloned()
    }

    /// Whether the active name starts with `prefix`.
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.inner.state.borrow().name.starts_with(prefix)
    }

    /// Whether the active name is exactly `name`.
    pub fn equals(&self, name: &str) -> bool {
        self.inner.state.borrow().name == name
    }

    /// Whether `name` is one of the resolved levels.
    pub fn contains(&self, name: &str) -> bool {
        self.inner
            .state
            .borrow()
            .chain
            .iter()
            .flatten()
            .any(|s| s.name() == name)
    }

    /// URL of `segment`, from the live route parameters overlaid with
    /// `params`.
    pub fn url_for(&self, segment: &str, params: &RouteParams) -> Result<String> {
        let live = self.live_params();
        self.inner
            .provider
            .borrow()
            .routes()
            .reverse_url(segment, &live, params)
    }

    /// Change configuration after routing started. Later resolves and reloads
    /// read the updated tree and options.
    pub fn configure<R>(&self, f: impl FnOnce(&mut RouteSegmentProvider) -> R) -> R {
        f(&mut self.inner.provider.borrow_mut())
    }

    pub fn options(&self) -> SegmentOptions {
        *self.inner.provider.borrow().options()
    }

    /// Number of attached watchers.
    pub fn watcher_count(&self) -> usize {
        self.inner.watchers.borrow().len()
    }
}

impl std::fmt::Debug for SegmentRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("SegmentRouter")
            .field("name", &state.name)
            .field("chain", &state.chain)
            .field("committed", &state.committed)
            .finish_non_exhaustive()
    }
}
