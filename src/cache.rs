//! Template caching.
//!
//! [`CachedTemplates`] wraps any [`TemplateSource`] with an LRU cache keyed by
//! URL, so that re-resolving a segment (reload, dependency change, navigating
//! back) does not fetch its `template_url` again. It is gated behind the
//! `cache` feature flag and uses the [`lru`] crate internally.
//!
//! Only successful fetches are cached; a rejected fetch is retried the next
//! time the URL is requested. [`CacheStats`] tracks hits, misses, and
//! invalidations.
//!
//! # Examples
//!
//! ```
//! use route_segment::cache::CachedTemplates;
//! use route_segment::template::{StaticTemplates, TemplateSource};
//!
//! let source = CachedTemplates::new(StaticTemplates::new().with("/a.html", "A"));
//!
//! assert_eq!(pollster::block_on(source.fetch("/a.html")).unwrap(), "A");
//! assert_eq!(pollster::block_on(source.fetch("/a.html")).unwrap(), "A");
//! assert_eq!(source.stats().hits, 1);
//! assert_eq!(source.stats().misses, 1);
//! ```

use crate::template::{TemplateFuture, TemplateSource};
use crate::{debug_log, trace_log};
use futures::future::{self, FutureExt};
use lru::LruCache;
use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::rc::Rc;

/// Counters tracking cache effectiveness.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Fetches answered from the cache.
    pub hits: usize,
    /// Fetches forwarded to the inner source.
    pub misses: usize,
    /// Number of full cache invalidations (via [`CachedTemplates::clear`]).
    pub invalidations: usize,
}

impl CacheStats {
    /// Return the hit rate as a value in `0.0..=1.0`.
    ///
    /// Returns `0.0` if nothing was fetched yet.
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug)]
struct CacheInner {
    entries: LruCache<String, String>,
    stats: CacheStats,
}

/// LRU-cached template source.
///
/// Default capacity is 256 templates.
pub struct CachedTemplates<S> {
    source: S,
    inner: Rc<RefCell<CacheInner>>,
}

impl<S: TemplateSource> CachedTemplates<S> {
    const DEFAULT_CAPACITY: usize = 256;

    /// Wrap `source` with the default capacity.
    pub fn new(source: S) -> Self {
        Self::with_capacity(source, Self::DEFAULT_CAPACITY)
    }

    /// Wrap `source` with a custom capacity. A zero capacity is bumped to one.
    pub fn with_capacity(source: S, capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            source,
            inner: Rc::new(RefCell::new(CacheInner {
                entries: LruCache::new(cap),
                stats: CacheStats::default(),
            })),
        }
    }

    /// Drop every cached template and increment the invalidation counter.
    pub fn clear(&self) {
        let mut inner = self.inner.borrow_mut();
        let removed = inner.entries.len();
        inner.entries.clear();
        inner.stats.invalidations += 1;
        debug_log!(
            "Template cache cleared: {} entries removed ({} total invalidations, hit rate: {:.1}%)",
            removed,
            inner.stats.invalidations,
            inner.stats.hit_rate() * 100.0
        );
    }

    /// Forget a single URL.
    pub fn remove(&self, url: &str) -> bool {
        self.inner.borrow_mut().entries.pop(url).is_some()
    }

    /// Snapshot of the cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.inner.borrow().stats.clone()
    }

    /// Reset all counters to zero.
    pub fn reset_stats(&self) {
        self.inner.borrow_mut().stats = CacheStats::default();
    }

    /// Number of cached templates.
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Whether the cache holds no templates.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: TemplateSource> TemplateSource for CachedTemplates<S> {
    fn fetch(&self, url: &str) -> TemplateFuture {
        {
            let mut inner = self.inner.borrow_mut();
            if let Some(body) = inner.entries.get(url).cloned() {
                inner.stats.hits += 1;
                trace_log!("Template cache hit for '{}'", url);
                return future::ready(Ok(body)).boxed_local();
            }
            inner.stats.misses += 1;
            trace_log!("Template cache miss for '{}'", url);
        }

        let pending = self.source.fetch(url);
        let inner = Rc::clone(&self.inner);
        let url = url.to_string();
        async move {
            let body = pending.await?;
            inner.borrow_mut().entries.push(url, body.clone());
            Ok(body)
        }
        .boxed_local()
    }
}
