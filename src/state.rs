//! Chain state management.
//!
//! [`ChainState`] is the mutable core shared by the resolution pipeline and
//! the watcher subsystem: the resolved chain, the composite name, both route
//! parameter snapshots, and the per-level pending guards.

use crate::context::RouterInner;
use crate::error::Result;
use crate::params::RouteParams;
use crate::segment::{Locals, SegmentParams, TEMPLATE_LOCAL};
use crate::watcher::WatcherId;
use futures::future::{self, FutureExt, LocalBoxFuture};
use serde_json::Value;
use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

/// A segment committed to the chain.
pub struct ResolvedSegment {
    name: String,
    params: Rc<SegmentParams>,
    locals: Locals,
    index: usize,
    pub(crate) watcher: Cell<Option<WatcherId>>,
    router: Weak<RouterInner>,
}

impl ResolvedSegment {
    pub(crate) fn new(
        name: String,
        params: Rc<SegmentParams>,
        locals: Locals,
        index: usize,
        router: Weak<RouterInner>,
    ) -> Self {
        Self {
            name,
            params,
            locals,
            index,
            watcher: Cell::new(None),
            router,
        }
    }

    /// Segment name as configured.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Params in effect: the segment's own, or its `until_resolved` /
    /// `resolve_failed` stage.
    pub fn params(&self) -> &SegmentParams {
        &self.params
    }

    pub fn locals(&self) -> &Locals {
        &self.locals
    }

    pub fn local(&self, key: &str) -> Option<&Value> {
        self.locals.get(key)
    }

    /// Resolved template text, if any.
    pub fn template(&self) -> Option<&str> {
        self.locals.get(TEMPLATE_LOCAL).and_then(Value::as_str)
    }

    /// Depth in the chain.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether a watcher is attached and still live.
    pub fn has_watcher(&self) -> bool {
        self.watcher.get().is_some()
    }

    /// Re-resolve this level from the current tree definition, then the
    /// levels below it.
    ///
    /// Completes immediately if the router is gone.
    pub fn reload(&self) -> LocalBoxFuture<'static, Result<()>> {
        match self.router.upgrade() {
            Some(inner) => crate::resolve::reload(&inner, self.index),
            None => future::ready(Ok(())).boxed_local(),
        }
    }
}

impl fmt::Debug for ResolvedSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedSegment")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("locals", &self.locals)
            .field("has_watcher", &self.has_watcher())
            .finish_non_exhaustive()
    }
}

/// Per-level change notification. `segment` is `None` for a cleared level.
#[derive(Debug, Clone)]
pub struct SegmentChange {
    pub index: usize,
    pub segment: Option<Rc<ResolvedSegment>>,
}

/// Handle returned by [`SegmentRouter::subscribe`](crate::SegmentRouter::subscribe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub(crate) type Listener = Rc<dyn Fn(&SegmentChange)>;

#[derive(Default)]
pub(crate) struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, Listener)>,
}

impl Listeners {
    pub(crate) fn add(&mut self, listener: Listener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.entries.push((id, listener));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| *existing != id);
        self.entries.len() != before
    }

    /// Listeners to call, detached from the registry so callbacks may
    /// subscribe or unsubscribe.
    pub(crate) fn snapshot(&self) -> Vec<Listener> {
        self.entries.iter().map(|(_, l)| Rc::clone(l)).collect()
    }
}

/// Pending guard of one level.
#[derive(Debug, Clone, Default)]
struct Guard {
    name: Option<String>,
    generation: u64,
}

/// Mutable engine state.
#[derive(Debug, Default)]
pub(crate) struct ChainState {
    pub(crate) chain: Vec<Option<Rc<ResolvedSegment>>>,
    pub(crate) name: String,
    /// Route parameters as of the latest notification.
    pub(crate) committed: RouteParams,
    /// Route parameters of the latest route change.
    pub(crate) live: RouteParams,
    /// Components of the segment name last navigated to.
    pub(crate) target: Vec<String>,
    guards: Vec<Guard>,
    generation: u64,
    /// Navigation ID counter; each navigation increments it so earlier
    /// passes can detect they were superseded.
    navigation_id: u64,
}

impl ChainState {
    pub(crate) fn navigation_id(&self) -> u64 {
        self.navigation_id
    }

    pub(crate) fn start_navigation(&mut self) -> u64 {
        self.navigation_id += 1;
        self.navigation_id
    }

    pub(crate) fn is_navigation_current(&self, nav_id: u64) -> bool {
        self.navigation_id == nav_id
    }

    pub(crate) fn guard_name(&self, index: usize) -> Option<&str> {
        self.guards.get(index)?.name.as_deref()
    }

    fn guard_mut(&mut self, index: usize) -> &mut Guard {
        if self.guards.len() <= index {
            self.guards.resize_with(index + 1, Guard::default);
        }
        &mut self.guards[index]
    }

    fn bump(&mut self, index: usize, name: Option<String>) -> u64 {
        self.generation += 1;
        let generation = self.generation;
        let guard = self.guard_mut(index);
        guard.name = name;
        guard.generation = generation;
        generation
    }

    /// Claim `index` for a resolve of `name`; earlier attempts become stale.
    pub(crate) fn begin(&mut self, index: usize, name: &str) -> u64 {
        self.bump(index, Some(name.to_string()))
    }

    /// Point the guard back at the segment already displayed at `index`.
    pub(crate) fn reaffirm(&mut self, index: usize, name: &str) {
        self.bump(index, Some(name.to_string()));
    }

    pub(crate) fn release(&mut self, index: usize) -> u64 {
        self.bump(index, None)
    }

    /// Release every level from `depth` down.
    ///
    /// Returns the new generations, and whether one of the released levels
    /// was still resolving a segment it did not display yet.
    pub(crate) fn release_from(&mut self, depth: usize) -> (Vec<(usize, u64)>, bool) {
        let end = self.guards.len().max(self.chain.len());
        let mut released = Vec::new();
        let mut interrupted = false;
        for index in depth..end {
            if let Some(name) = self.guard_name(index) {
                interrupted |= self.segment(index).map_or(true, |s| s.name() != name);
            }
            released.push((index, self.release(index)));
        }
        (released, interrupted)
    }

    pub(crate) fn is_attempt_current(&self, index: usize, generation: u64) -> bool {
        self.guards
            .get(index)
            .is_some_and(|g| g.generation == generation)
    }

    pub(crate) fn segment(&self, index: usize) -> Option<Rc<ResolvedSegment>> {
        self.chain.get(index).cloned().flatten()
    }

    pub(crate) fn set_segment(&mut self, index: usize, segment: Option<Rc<ResolvedSegment>>) {
        if self.chain.len() <= index {
            self.chain.resize(index + 1, None);
        }
        self.chain[index] = segment;
    }

    /// Take the segment out of `index`, leaving a hole.
    pub(crate) fn take_segment(&mut self, index: usize) -> Option<Rc<ResolvedSegment>> {
        self.chain.get_mut(index).and_then(Option::take)
    }

    /// Snapshot the live parameters and rebuild the composite name from the
    /// chain, skipping holes.
    pub(crate) fn commit_view(&mut self) {
        self.committed = self.live.clone();
        self.name = self
            .chain
            .iter()
            .flatten()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(".");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(name: &str, index: usize) -> Rc<ResolvedSegment> {
        Rc::new(ResolvedSegment::new(
            name.to_string(),
            Rc::new(SegmentParams::default()),
            Locals::new(),
            index,
            Weak::new(),
        ))
    }

    #[test]
    fn test_navigation_ids() {
        let mut state = ChainState::default();
        let first = state.start_navigation();
        assert!(state.is_navigation_current(first));

        let second = state.start_navigation();
        assert!(!state.is_navigation_current(first));
        assert!(state.is_navigation_current(second));
    }

    #[test]
    fn test_guard_generations() {
        let mut state = ChainState::default();
        let attempt = state.begin(2, "a");
        assert_eq!(state.guard_name(2), Some("a"));
        assert_eq!(state.guard_name(0), None);
        assert!(state.is_attempt_current(2, attempt));

        let retry = state.begin(2, "a");
        assert!(!state.is_attempt_current(2, attempt));
        assert!(state.is_attempt_current(2, retry));

        state.release(2);
        assert_eq!(state.guard_name(2), None);
        assert!(!state.is_attempt_current(2, retry));
    }

    #[test]
    fn test_release_from_depth() {
        let mut state = ChainState::default();
        state.begin(0, "a");
        state.set_segment(0, Some(segment("a", 0)));
        state.begin(1, "b");
        state.set_segment(1, Some(segment("b", 1)));

        let (released, interrupted) = state.release_from(1);
        assert_eq!(released.len(), 1);
        assert!(!interrupted);
        assert!(state.is_attempt_current(1, released[0].1));
        assert_eq!(state.guard_name(0), Some("a"));

        // Level 2 is claimed but nothing is displayed there yet
        state.begin(2, "c");
        let (released, interrupted) = state.release_from(1);
        assert_eq!(released.iter().map(|r| r.0).collect::<Vec<_>>(), [1, 2]);
        assert!(interrupted);
        assert_eq!(state.guard_name(2), None);
    }

    #[test]
    fn test_composite_name_skips_holes() {
        let mut state = ChainState::default();
        state.set_segment(0, Some(segment("a", 0)));
        state.set_segment(2, Some(segment("c", 2)));
        state.live.insert("id", "1");
        state.commit_view();

        assert_eq!(state.chain.len(), 3);
        assert_eq!(state.name, "a.c");
        assert_eq!(state.committed.get("id"), Some(&"1".to_string()));

        assert!(state.take_segment(0).is_some());
        state.commit_view();
        assert_eq!(state.name, "c");
    }

    #[test]
    fn test_listeners() {
        let mut listeners = Listeners::default();
        let a = listeners.add(Rc::new(|_| {}));
        let b = listeners.add(Rc::new(|_| {}));
        assert_ne!(a, b);
        assert_eq!(listeners.snapshot().len(), 2);
        assert!(listeners.remove(a));
        assert!(!listeners.remove(a));
        assert_eq!(listeners.snapshot().len(), 1);
    }

    #[test]
    fn test_detached_segment_reload_is_noop() {
        let seg = segment("a", 0);
        assert!(pollster::block_on(seg.reload()).is_ok());
        assert!(!seg.has_watcher());
        assert_eq!(seg.template(), None);
    }
}
