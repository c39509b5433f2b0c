//! Template fetch facility interface.
//!
//! When [`SegmentOptions::auto_load_templates`](crate::SegmentOptions) is on,
//! a segment's `template_url` is fetched through a [`TemplateSource`] and the
//! body lands in the `$template` local. Wrap a source in
//! [`CachedTemplates`](crate::cache::CachedTemplates) (feature `cache`) to
//! avoid fetching the same URL twice.

use crate::error::Rejection;
use futures::future::{self, FutureExt, LocalBoxFuture};
use std::collections::HashMap;
use std::rc::Rc;

/// Pending template body.
pub type TemplateFuture = LocalBoxFuture<'static, Result<String, Rejection>>;

/// Source of remote template text.
pub trait TemplateSource {
    /// Fetch the body behind `url`.
    fn fetch(&self, url: &str) -> TemplateFuture;
}

impl<T: TemplateSource + ?Sized> TemplateSource for Rc<T> {
    fn fetch(&self, url: &str) -> TemplateFuture {
        (**self).fetch(url)
    }
}

/// A source for hosts that never load templates; every fetch rejects.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTemplates;

impl TemplateSource for NoTemplates {
    fn fetch(&self, url: &str) -> TemplateFuture {
        let reason = format!("no template source configured for `{}`", url);
        future::ready(Err(Rejection::new(reason))).boxed_local()
    }
}

/// Templates served from memory, keyed by URL. Unknown URLs reject with
/// `404`.
#[derive(Debug, Clone, Default)]
pub struct StaticTemplates {
    templates: HashMap<String, String>,
}

impl StaticTemplates {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template body for `url`.
    pub fn with(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.templates.insert(url.into(), body.into());
        self
    }
}

impl TemplateSource for StaticTemplates {
    fn fetch(&self, url: &str) -> TemplateFuture {
        let result = self
            .templates
            .get(url)
            .cloned()
            .ok_or_else(|| Rejection::new(404));
        future::ready(result).boxed_local()
    }
}
