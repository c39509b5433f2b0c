//! Injection facility interface.
//!
//! The engine never constructs values itself. Every `resolve` entry, callable
//! template, and watcher goes through an [`Injector`] supplied by the host:
//!
//! - [`Injector::get`] returns the current instance of a named injectable,
//!   which may still be pending ([`Resolution::Deferred`]).
//! - [`Injector::invoke`] calls an [`Invocable`] with its declared
//!   dependencies looked up by name. The default implementation resolves them
//!   through `get`, binding the reserved name `segment` to the segment being
//!   watched when there is one.
//!
//! # Example
//!
//! ```
//! use route_segment::inject::{Injector, Invocable, Resolution};
//! use serde_json::json;
//!
//! struct Answer;
//!
//! impl Injector for Answer {
//!     fn get(&self, name: &str) -> Option<Resolution> {
//!         (name == "answer").then(|| Resolution::ready(42))
//!     }
//! }
//!
//! let double = Invocable::new(["answer"], |args| {
//!     let n = args.value("answer").and_then(|v| v.as_i64()).unwrap_or_default();
//!     Resolution::ready(n * 2)
//! });
//!
//! match Answer.invoke(&double, None).unwrap() {
//!     Resolution::Ready(value) => assert_eq!(value, json!(84)),
//!     Resolution::Deferred(_) => unreachable!(),
//! }
//! ```

use crate::error::{Rejection, Result, SegmentError};
use crate::state::ResolvedSegment;
use futures::future::{self, FutureExt, LocalBoxFuture};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

/// Dependency name bound to the watched segment during watcher evaluation.
pub const SEGMENT_DEPENDENCY: &str = "segment";

/// A value that is not available yet.
pub type Deferred = LocalBoxFuture<'static, std::result::Result<Value, Rejection>>;

/// Outcome of asking the injection facility for a value.
pub enum Resolution {
    /// The value is available now.
    Ready(Value),
    /// The value arrives later, or the computation rejects.
    Deferred(Deferred),
}

impl Resolution {
    /// An immediately available value.
    pub fn ready(value: impl Into<Value>) -> Self {
        Self::Ready(value.into())
    }

    /// A value produced by `future`.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = std::result::Result<Value, Rejection>> + 'static,
    {
        Self::Deferred(future.boxed_local())
    }

    /// An already rejected value.
    pub fn rejected(reason: impl Into<Rejection>) -> Self {
        Self::Deferred(future::ready(Err(reason.into())).boxed_local())
    }

    /// Whether the value is available without awaiting.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Turn either form into an awaitable.
    pub fn into_deferred(self) -> Deferred {
        match self {
            Self::Ready(value) => future::ready(Ok(value)).boxed_local(),
            Self::Deferred(deferred) => deferred,
        }
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<Value> for Resolution {
    fn from(value: Value) -> Self {
        Self::Ready(value)
    }
}

type InvokeFn = dyn Fn(InvokeArgs) -> Resolution;

/// A callable with dependencies declared by name.
#[derive(Clone)]
pub struct Invocable {
    deps: Vec<String>,
    func: Rc<InvokeFn>,
}

impl Invocable {
    /// Create a callable that receives the dependencies named in `deps`.
    pub fn new<I, S, F>(deps: I, func: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(InvokeArgs) -> Resolution + 'static,
    {
        Self {
            deps: deps.into_iter().map(Into::into).collect(),
            func: Rc::new(func),
        }
    }

    /// A callable without dependencies.
    pub fn from_fn<F>(func: F) -> Self
    where
        F: Fn() -> Resolution + 'static,
    {
        Self {
            deps: Vec::new(),
            func: Rc::new(move |_| func()),
        }
    }

    /// Declared dependency names, in declaration order.
    pub fn deps(&self) -> &[String] {
        &self.deps
    }

    /// Call with already assembled arguments.
    pub fn call(&self, args: InvokeArgs) -> Resolution {
        (self.func)(args)
    }
}

impl fmt::Debug for Invocable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocable")
            .field("deps", &self.deps)
            .finish_non_exhaustive()
    }
}

/// Arguments handed to an [`Invocable`].
#[derive(Debug, Default)]
pub struct InvokeArgs {
    values: HashMap<String, Resolution>,
    segment: Option<Rc<ResolvedSegment>>,
}

impl InvokeArgs {
    /// Empty arguments, optionally bound to a segment.
    pub fn new(segment: Option<Rc<ResolvedSegment>>) -> Self {
        Self {
            values: HashMap::new(),
            segment,
        }
    }

    /// Add a named argument.
    pub fn insert(&mut self, name: impl Into<String>, value: Resolution) {
        self.values.insert(name.into(), value);
    }

    /// A dependency that is available synchronously.
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.values.get(name)? {
            Resolution::Ready(value) => Some(value),
            Resolution::Deferred(_) => None,
        }
    }

    /// Take a dependency out, in whatever form the injector produced it.
    pub fn take(&mut self, name: &str) -> Option<Resolution> {
        self.values.remove(name)
    }

    /// The segment a watcher is evaluated for.
    pub fn segment(&self) -> Option<&Rc<ResolvedSegment>> {
        self.segment.as_ref()
    }
}

/// The host's dependency injection facility.
pub trait Injector {
    /// Current instance of the injectable called `name`.
    fn get(&self, name: &str) -> Option<Resolution>;

    /// Invoke `invocable` with its declared dependencies.
    fn invoke(
        &self,
        invocable: &Invocable,
        segment: Option<Rc<ResolvedSegment>>,
    ) -> Result<Resolution> {
        let bind_segment = segment.is_some();
        let mut args = InvokeArgs::new(segment);
        for dep in invocable.deps() {
            if bind_segment && dep == SEGMENT_DEPENDENCY {
                continue;
            }
            let value = self
                .get(dep)
                .ok_or_else(|| SegmentError::UnknownInjectable { name: dep.clone() })?;
            args.insert(dep.clone(), value);
        }
        Ok(invocable.call(args))
    }
}

impl<T: Injector + ?Sized> Injector for Rc<T> {
    fn get(&self, name: &str) -> Option<Resolution> {
        (**self).get(name)
    }

    fn invoke(
        &self,
        invocable: &Invocable,
        segment: Option<Rc<ResolvedSegment>>,
    ) -> Result<Resolution> {
        (**self).invoke(invocable, segment)
    }
}

/// An injector backed by a fixed map of ready values.
#[derive(Debug, Clone, Default)]
pub struct StaticInjector {
    values: HashMap<String, Value>,
}

impl StaticInjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl Injector for StaticInjector {
    fn get(&self, name: &str) -> Option<Resolution> {
        self.values.get(name).cloned().map(Resolution::Ready)
    }
}
