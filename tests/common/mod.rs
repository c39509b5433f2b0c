//! Test utilities for segment resolution tests
//!
//! Provides the standard segment fixture, a map-backed injector with
//! controllable deferred values, a recording listener, and a local executor
//! for interleaving navigations with value completion.

#![allow(dead_code)]

use futures::channel::oneshot;
use futures::executor::LocalPool;
use futures::future::{FutureExt, LocalBoxFuture, Shared};
use futures::task::LocalSpawnExt;
use route_segment::*;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Route capture of `env_logger` output; safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Fixture
// ============================================================================

/// Routes and segments shared by the routing tests, in strict mode with
/// template loading off.
pub fn provider() -> RouteSegmentProvider {
    let mut provider = RouteSegmentProvider::with_options(
        SegmentOptions::new()
            .strict_mode(true)
            .auto_load_templates(false),
    );

    provider
        .when("/1", "section-first")
        .when("/2", "section2")
        .when("/2/X", "section2.section21")
        .when("/X-foo", "section2.section21.section211")
        .when("/Y", "section2.section22")
        .when("/2/:id", "section2.section23")
        .when("/2/:id/bar", "section2.section23.section231")
        .when("/invalid", "invalid")
        .when("/2/:id/invalid", "section2.section23.invalid");

    provider
        .add_segment("section-first", test_params("A"))
        .add_segment("section2", test_params("B"))
        .descend_last()
        .unwrap()
        .add_segment("section21", test_params("C"))
        .descend_last()
        .unwrap()
        .add_segment("section211", test_params("E"))
        .ascend()
        .add_segment("section22", test_params("D"))
        .add_segment("section23", test_params("F"));

    // Starting from the root again
    provider
        .descend("section2")
        .unwrap()
        .descend("section23")
        .unwrap()
        .add_segment("section231", test_params("G"));

    provider
}

pub fn test_params(value: &str) -> SegmentParams {
    SegmentParams::new().data("test", value)
}

/// Engine over `provider` with the given injector and no template source.
pub fn router(provider: RouteSegmentProvider, injector: &TestInjector) -> SegmentRouter {
    init_logging();
    SegmentRouter::new(provider, injector.clone(), NoTemplates)
}

// ============================================================================
// Deferred values
// ============================================================================

type SharedValue = Shared<LocalBoxFuture<'static, Result<Value, Rejection>>>;

/// A value completed by the test, readable any number of times.
#[derive(Clone)]
pub struct Deferral {
    sender: Rc<RefCell<Option<oneshot::Sender<Result<Value, Rejection>>>>>,
    value: SharedValue,
}

impl Deferral {
    pub fn new() -> Self {
        let (sender, receiver) = oneshot::channel();
        let value = receiver
            .map(|received| received.unwrap_or_else(|_| Err(Rejection::new("deferral dropped"))))
            .boxed_local()
            .shared();
        Self {
            sender: Rc::new(RefCell::new(Some(sender))),
            value,
        }
    }

    pub fn resolve(&self, value: impl Into<Value>) {
        self.settle(Ok(value.into()));
    }

    pub fn reject(&self, reason: impl Into<Rejection>) {
        self.settle(Err(reason.into()));
    }

    fn settle(&self, outcome: Result<Value, Rejection>) {
        if let Some(sender) = self.sender.borrow_mut().take() {
            let _ = sender.send(outcome);
        }
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::deferred(self.value.clone())
    }

    /// A `resolve` entry returning this value.
    pub fn invocable(&self) -> Invocable {
        let deferral = self.clone();
        Invocable::from_fn(move || deferral.resolution())
    }
}

// ============================================================================
// Injector
// ============================================================================

#[derive(Clone)]
enum Injectable {
    Value(Value),
    Deferred(Deferral),
}

/// Injector over a shared, mutable map.
#[derive(Clone, Default)]
pub struct TestInjector {
    values: Rc<RefCell<HashMap<String, Injectable>>>,
}

impl TestInjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, name: &str, value: impl Into<Value>) {
        self.values
            .borrow_mut()
            .insert(name.to_string(), Injectable::Value(value.into()));
    }

    pub fn set_deferred(&self, name: &str, deferral: &Deferral) {
        self.values
            .borrow_mut()
            .insert(name.to_string(), Injectable::Deferred(deferral.clone()));
    }

    pub fn remove(&self, name: &str) {
        self.values.borrow_mut().remove(name);
    }
}

impl Injector for TestInjector {
    fn get(&self, name: &str) -> Option<Resolution> {
        let entry = self.values.borrow().get(name).cloned()?;
        Some(match entry {
            Injectable::Value(value) => Resolution::Ready(value),
            Injectable::Deferred(deferral) => deferral.resolution(),
        })
    }
}

// ============================================================================
// Listener
// ============================================================================

/// Records every change notification.
#[derive(Clone, Default)]
pub struct Recorder {
    changes: Rc<RefCell<Vec<SegmentChange>>>,
}

impl Recorder {
    pub fn attach(router: &SegmentRouter) -> Self {
        let recorder = Self::default();
        let changes = Rc::clone(&recorder.changes);
        router.subscribe(move |change| changes.borrow_mut().push(change.clone()));
        recorder
    }

    pub fn len(&self) -> usize {
        self.changes.borrow().len()
    }

    pub fn get(&self, index: usize) -> SegmentChange {
        self.changes.borrow()[index].clone()
    }

    pub fn clear(&self) {
        self.changes.borrow_mut().clear();
    }

    /// `(index, segment name)` pairs in notification order.
    pub fn names(&self) -> Vec<(usize, Option<String>)> {
        self.changes
            .borrow()
            .iter()
            .map(|c| (c.index, c.segment.as_ref().map(|s| s.name().to_string())))
            .collect()
    }
}

/// Assert that `change` carries `name` at `index` with the fixture's `test`
/// value and no locals.
pub fn assert_change(change: &SegmentChange, index: usize, name: &str, test: &str) {
    assert_eq!(change.index, index);
    let segment = change
        .segment
        .as_ref()
        .unwrap_or_else(|| panic!("level {} was cleared, expected '{}'", index, name));
    assert_eq!(segment.name(), name);
    assert_eq!(segment.params().data["test"], test);
    assert!(segment.locals().is_empty(), "unexpected locals {:?}", segment.locals());
}

// ============================================================================
// Executor
// ============================================================================

pub type Outcome = Rc<RefCell<Option<route_segment::Result<()>>>>;

/// Single-threaded executor driving engine futures step by step.
pub struct Driver {
    pool: LocalPool,
}

impl Driver {
    pub fn new() -> Self {
        Self {
            pool: LocalPool::new(),
        }
    }

    /// Run `future` in the background; its result lands in the returned slot.
    pub fn spawn(&self, future: LocalBoxFuture<'static, route_segment::Result<()>>) -> Outcome {
        let outcome: Outcome = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&outcome);
        self.pool
            .spawner()
            .spawn_local(async move {
                let result = future.await;
                *slot.borrow_mut() = Some(result);
            })
            .expect("spawn on local pool");
        outcome
    }

    /// Run every task until none can make progress.
    pub fn settle(&mut self) {
        self.pool.run_until_stalled();
    }
}
