//! Segment watchers.
//!
//! A segment configured with [`SegmentParams::watcher`](crate::SegmentParams::watcher)
//! gets its watcher evaluated once when it is committed, capturing the initial
//! value, and again on every [`SegmentRouter::digest`](crate::SegmentRouter::digest).
//! A value different from the last captured one reloads the level.
//!
//! Watchers belong to a chain level. A watcher is disposed only when its level
//! is committed again, cleared, or truncated; a resolve that starts at the
//! level and is then superseded or fails leaves it in place.

use crate::context::RouterInner;
use crate::error::{Result, SegmentError};
use crate::inject::{Invocable, Resolution};
use crate::state::ResolvedSegment;
use crate::{debug_log, trace_log, warn_log};
use futures::future::{self, FutureExt, LocalBoxFuture};
use serde_json::Value;
use std::rc::Rc;

/// Identifier of an attached watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatcherId(u64);

#[derive(Debug)]
struct WatchEntry {
    id: WatcherId,
    index: usize,
    segment: Rc<ResolvedSegment>,
    invocable: Invocable,
    last: Value,
}

/// Live watchers, at most one per chain level.
#[derive(Debug, Default)]
pub(crate) struct WatcherSet {
    next_id: u64,
    entries: Vec<WatchEntry>,
}

impl WatcherSet {
    fn insert(
        &mut self,
        index: usize,
        segment: Rc<ResolvedSegment>,
        invocable: Invocable,
        last: Value,
    ) -> WatcherId {
        self.next_id += 1;
        let id = WatcherId(self.next_id);
        self.entries.push(WatchEntry {
            id,
            index,
            segment,
            invocable,
            last,
        });
        id
    }

    /// Dispose the watcher of level `index`, if any.
    pub(crate) fn dispose_at(&mut self, index: usize) {
        self.entries.retain(|entry| {
            if entry.index != index {
                return true;
            }
            entry.segment.watcher.set(None);
            trace_log!("Watcher of segment '{}' disposed", entry.segment.name());
            false
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn record(&mut self, id: WatcherId, value: Value) -> Option<usize> {
        let entry = self.entries.iter_mut().find(|e| e.id == id)?;
        entry.last = value;
        Some(entry.index)
    }
}

/// Evaluate `invocable` against `segment`; watchers must answer synchronously.
pub(crate) fn evaluate(inner: &RouterInner, invocable: &Invocable, segment: &Rc<ResolvedSegment>) -> Result<Value> {
    match inner.injector.invoke(invocable, Some(Rc::clone(segment)))? {
        Resolution::Ready(value) => Ok(value),
        Resolution::Deferred(_) => Err(SegmentError::InvalidWatcher {
            segment: segment.name().to_string(),
        }),
    }
}

/// Start watching `segment`, which was just committed at its level, from the
/// value `initial` captured before the commit.
pub(crate) fn install(inner: &RouterInner, segment: &Rc<ResolvedSegment>, invocable: Invocable, initial: Value) {
    let mut watchers = inner.watchers.borrow_mut();
    watchers.dispose_at(segment.index());
    let id = watchers.insert(segment.index(), Rc::clone(segment), invocable, initial);
    segment.watcher.set(Some(id));
    trace_log!("Watcher attached to segment '{}'", segment.name());
}

/// Evaluate every watcher now; reload what changed when the returned future
/// is driven.
///
/// The future yields how many watchers changed. Only the shallowest changed
/// level is reloaded, since reloading it re-resolves every level below. A
/// watcher that fails to evaluate does not stop the others: changed levels
/// are still reloaded, then the first failure is returned.
pub(crate) fn digest(inner: &Rc<RouterInner>) -> LocalBoxFuture<'static, Result<usize>> {
    let pending: Vec<(WatcherId, Rc<ResolvedSegment>, Invocable, Value)> = inner
        .watchers
        .borrow()
        .entries
        .iter()
        .map(|e| (e.id, Rc::clone(&e.segment), e.invocable.clone(), e.last.clone()))
        .collect();

    let mut changed = Vec::new();
    let mut failure = None;
    for (id, segment, invocable, last) in pending {
        let value = match evaluate(inner, &invocable, &segment) {
            Ok(value) => value,
            Err(err) => {
                warn_log!("Watcher of segment '{}' failed: {}", segment.name(), err);
                failure.get_or_insert(err);
                continue;
            }
        };
        if value == last {
            continue;
        }
        if let Some(index) = inner.watchers.borrow_mut().record(id, value) {
            debug_log!(
                "Watcher of segment '{}' changed, reloading level {}",
                segment.name(),
                index
            );
            changed.push(index);
        }
    }

    let count = changed.len();
    let Some(shallowest) = changed.into_iter().min() else {
        return future::ready(failure.map_or(Ok(0), Err)).boxed_local();
    };

    let reload = crate::resolve::reload(inner, shallowest);
    async move {
        reload.await?;
        failure.map_or(Ok(count), Err)
    }
    .boxed_local()
}
