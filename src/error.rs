//! Error types for segment configuration and resolution.
//!
//! - [`SegmentError`]: every failure the engine surfaces to its caller.
//!   Configuration errors (tree traversal, reverse URLs) are returned
//!   synchronously; resolution errors come out of the navigation future.
//! - [`Rejection`]: the reason carried by a rejected deferred value. It is
//!   what a `resolveFailed` fallback receives as its `error` local.
//!
//! A navigation superseded by a newer one is not an error: its results are
//! dropped silently and the future completes with `Ok(())`.
//!
//! # Examples
//!
//! ```
//! use route_segment::error::{Rejection, SegmentError};
//!
//! let err = SegmentError::UnhandledResolveFailure {
//!     segment: "item".into(),
//!     reason: Rejection::new("timeout"),
//! };
//! assert_eq!(
//!     err.to_string(),
//!     "resolving failed with reason `timeout`, but no `resolveFailed` provided for segment `item`"
//! );
//! ```

use serde_json::Value;
use std::fmt;

/// Result alias used across the crate.
pub type Result<T, E = SegmentError> = std::result::Result<T, E>;

/// Errors raised while configuring segments or resolving a route.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SegmentError {
    /// A segment name that is not declared in the tree, or that has no
    /// registered route when generating a URL.
    #[error("unknown segment `{name}`")]
    UnknownSegment { name: String },

    /// Reverse URL generation left a required placeholder unsubstituted.
    #[error("route param `{param}` is not specified for route `{route}`")]
    MissingRouteParam { param: String, route: String },

    /// The watcher attached to a segment did not evaluate to a plain value.
    #[error("watcher is not a synchronous function in segment `{segment}`")]
    InvalidWatcher { segment: String },

    /// A resolve rejected and the segment has no `resolveFailed` fallback.
    #[error(
        "resolving failed with reason `{reason}`, but no `resolveFailed` provided for segment `{segment}`"
    )]
    UnhandledResolveFailure { segment: String, reason: Rejection },

    /// The injection facility does not know the requested name.
    #[error("unknown injectable `{name}`")]
    UnknownInjectable { name: String },

    /// No registered route pattern matches the path.
    #[error("no route registered for path `{path}`")]
    RouteNotFound { path: String },
}

impl SegmentError {
    /// Whether the error comes from configuration rather than resolution.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SegmentError::UnknownSegment { .. } | SegmentError::MissingRouteParam { .. }
        )
    }
}

/// Reason a deferred value was rejected with.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rejection {
    reason: Value,
}

impl Rejection {
    /// Create a rejection from any JSON-convertible reason.
    pub fn new(reason: impl Into<Value>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// The raw reason.
    pub fn reason(&self) -> &Value {
        &self.reason
    }

    /// Consume the rejection and return the reason.
    pub fn into_reason(self) -> Value {
        self.reason
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Value::String(s) => f.write_str(s),
            Value::Null => f.write_str("undefined"),
            other => write!(f, "{}", other),
        }
    }
}

impl From<Value> for Rejection {
    fn from(reason: Value) -> Self {
        Self { reason }
    }
}

impl From<&str> for Rejection {
    fn from(reason: &str) -> Self {
        Self::new(reason)
    }
}

impl From<String> for Rejection {
    fn from(reason: String) -> Self {
        Self::new(reason)
    }
}
