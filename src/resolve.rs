//! Segment resolution pipeline.
//!
//! # Architecture
//!
//! A route change carries a fully qualified segment name such as
//! `section2.section23.section231`. The pipeline splits it into one component
//! per chain level and works out, synchronously, which levels must change:
//!
//! ```text
//! level  target       displayed    guard        decision
//! [0]    section2     section2     section2     keep
//! [1]    section23    section21    section21    update   <- first change
//! [2]    section231   section211   section211   update   (cascade)
//! ```
//!
//! A level is updated when its guard names a different segment, when a
//! shallower level is already being updated, or when one of its
//! `dependencies` route parameters changed. A level whose guard differs but
//! which still displays the wanted segment is pointed back at it and left
//! alone.
//!
//! The updates then run one level at a time when the returned future is
//! driven. Each level resolves its locals (and template), commits, notifies
//! listeners, and clears every deeper level still holding a segment. After the
//! updates the chain is truncated to the route's depth. If the deepest updated
//! level ends the chain, default children are resolved below it.
//!
//! # Staleness
//!
//! The diff claims every level it updates with a fresh generation and releases
//! every level below the route's depth, before any future is driven. A result
//! commits only if its generation is still the level's current one, so a newer
//! navigation that keeps a level leaves its in-flight resolve alone.
//! Superseded results are dropped without notification and end their pass
//! with `Ok(())`. Truncation and default children run only for the latest
//! navigation.

use crate::context::{RouteChange, RouterInner};
use crate::error::{Rejection, Result, SegmentError};
use crate::inject::{Deferred, Resolution};
use crate::segment::{Locals, Resolvable, SegmentParams, Template, TEMPLATE_LOCAL};
use crate::state::{ResolvedSegment, SegmentChange};
use crate::tree::Candidate;
use crate::{debug_log, error_log, trace_log, warn_log};
use futures::future::{self, FutureExt, LocalBoxFuture, TryFutureExt};
use serde_json::Value;
use std::rc::Rc;

#[derive(Debug)]
struct Update {
    index: usize,
    generation: u64,
    candidate: Candidate,
}

/// One run of level updates and the guard generations it claimed.
struct Pass {
    inner: Rc<RouterInner>,
    nav_id: u64,
    names: Vec<String>,
    claims: Vec<(usize, u64)>,
    /// A default child below the route was interrupted by the diff.
    resume_defaults: bool,
}

impl Pass {
    fn new(inner: &Rc<RouterInner>, nav_id: u64, names: Vec<String>, updates: &[Update]) -> Self {
        Self {
            inner: Rc::clone(inner),
            nav_id,
            names,
            claims: updates.iter().map(|u| (u.index, u.generation)).collect(),
            resume_defaults: false,
        }
    }

    /// Whether `level` is still claimed by this pass.
    fn owns(&self, level: usize) -> bool {
        let state = self.inner.state.borrow();
        self.claims
            .iter()
            .any(|&(index, generation)| index == level && state.is_attempt_current(index, generation))
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Apply a route change.
///
/// Route parameters and the level diff are applied immediately; resolving
/// happens when the returned future is driven.
pub(crate) fn navigate(inner: &Rc<RouterInner>, change: RouteChange) -> LocalBoxFuture<'static, Result<()>> {
    let RouteChange { segment, params } = change;
    inner.state.borrow_mut().live = params;

    let Some(segment) = segment else {
        trace_log!("Route change without a segment, nothing to resolve");
        return future::ready(Ok(())).boxed_local();
    };
    let names: Vec<String> = segment.split('.').map(String::from).collect();

    let candidates = match lookup_all(inner, &names, 0) {
        Ok(candidates) => candidates,
        Err(err) => {
            error_log!("Cannot navigate to '{}': {}", segment, err);
            return future::ready(Err(err)).boxed_local();
        }
    };

    let mut state = inner.state.borrow_mut();
    let nav_id = state.start_navigation();
    state.target = names.clone();

    let mut updates: Vec<Update> = Vec::new();
    for (index, candidate) in candidates.into_iter().enumerate() {
        let deps_changed = candidate
            .params
            .dependencies_changed(&state.committed, &state.live);
        let displayed = state
            .segment(index)
            .is_some_and(|s| s.name() == candidate.name);

        if updates.is_empty() && !deps_changed && displayed {
            if state.guard_name(index) != Some(candidate.name.as_str()) {
                state.reaffirm(index, &candidate.name);
            }
            continue;
        }
        let generation = state.begin(index, &candidate.name);
        updates.push(Update {
            index,
            generation,
            candidate,
        });
    }
    let (released, interrupted) = state.release_from(names.len());
    drop(state);

    debug_log!(
        "Navigating to '{}' (navigation {}), updating levels {:?}",
        segment,
        nav_id,
        updates.iter().map(|u| u.index).collect::<Vec<_>>()
    );

    let mut pass = Pass::new(inner, nav_id, names, &updates);
    pass.claims.extend(released);
    pass.resume_defaults = interrupted;
    run_pass(pass, updates).boxed_local()
}

/// Re-resolve level `index` and every level below it.
///
/// The route is the latest navigation target, extended with the default
/// children currently in the chain once the target is on screen. Definitions
/// are read from the tree now, so params overwritten since the last resolve
/// take effect.
pub(crate) fn reload(inner: &Rc<RouterInner>, index: usize) -> LocalBoxFuture<'static, Result<()>> {
    let (path, nav_id) = {
        let state = inner.state.borrow();
        let mut path = state.target.clone();
        let on_target = path
            .iter()
            .enumerate()
            .all(|(level, name)| state.segment(level).is_some_and(|s| s.name() == name));
        if on_target {
            for slot in state.chain.iter().skip(path.len()) {
                match slot {
                    Some(segment) => path.push(segment.name().to_string()),
                    None => break,
                }
            }
        }
        (path, state.navigation_id())
    };

    if index >= path.len() {
        trace_log!("Reload of level {} ignored, chain is {} deep", index, path.len());
        return future::ready(Ok(())).boxed_local();
    }

    let candidates = match lookup_all(inner, &path, index) {
        Ok(candidates) => candidates,
        Err(err) => return future::ready(Err(err)).boxed_local(),
    };
    let updates: Vec<Update> = {
        let mut state = inner.state.borrow_mut();
        candidates
            .into_iter()
            .enumerate()
            .map(|(offset, candidate)| Update {
                index: index + offset,
                generation: state.begin(index + offset, &candidate.name),
                candidate,
            })
            .collect()
    };

    debug_log!("Reloading level {} of '{}'", index, path.join("."));
    let pass = Pass::new(inner, nav_id, path, &updates);
    run_pass(pass, updates).boxed_local()
}

fn lookup_all(inner: &RouterInner, names: &[String], from: usize) -> Result<Vec<Candidate>> {
    let provider = inner.provider.borrow();
    let strict = provider.options().strict_mode;
    (from..names.len())
        .map(|index| provider.tree().lookup(names, index, strict))
        .collect()
}

// ============================================================================
// Pass
// ============================================================================

async fn run_pass(pass: Pass, updates: Vec<Update>) -> Result<()> {
    let inner = &pass.inner;
    let mut last_update = None;

    for update in updates {
        let (index, generation) = (update.index, update.generation);
        if !update_segment(&pass, update).await? || !publish(&pass, index, generation) {
            return Ok(());
        }
        last_update = Some(index);
    }

    let depth = pass.names.len();
    let truncated = {
        let mut state = inner.state.borrow_mut();
        if !state.is_navigation_current(pass.nav_id) {
            return Ok(());
        }
        if state.chain.len() > depth {
            let tail = state.chain.split_off(depth);
            let mut held = Vec::new();
            for (offset, slot) in tail.into_iter().enumerate() {
                state.release(depth + offset);
                if slot.is_some() {
                    held.push(depth + offset);
                }
            }
            last_update = depth.checked_sub(1);
            held
        } else {
            Vec::new()
        }
    };
    for index in truncated {
        inner.watchers.borrow_mut().dispose_at(index);
        debug_log!("Level {} truncated", index);
        broadcast(inner, index);
    }

    let chain_len = inner.state.borrow().chain.len();
    let ends_chain = chain_len > 0 && last_update == Some(chain_len - 1);
    if ends_chain || (pass.resume_defaults && chain_len == depth) {
        resolve_defaults(&pass).await?;
    }
    Ok(())
}

/// Resolve the chain of default children below the end of the route.
async fn resolve_defaults(pass: &Pass) -> Result<()> {
    let inner = &pass.inner;
    let mut path = pass.names.clone();
    loop {
        let candidate = inner.provider.borrow().tree().default_child(&path);
        let Some(candidate) = candidate else {
            return Ok(());
        };

        let index = path.len();
        let name = candidate.name.clone();
        let generation = {
            let mut state = inner.state.borrow_mut();
            if !state.is_navigation_current(pass.nav_id) {
                return Ok(());
            }
            state.begin(index, &name)
        };
        debug_log!("Default child '{}' selected for level {}", name, index);

        let update = Update {
            index,
            generation,
            candidate,
        };
        if !update_segment(pass, update).await? || !publish(pass, index, generation) {
            return Ok(());
        }
        path.push(name);
    }
}

/// Resolve a claimed level, through its `until_resolved` stage first if it
/// has one. Returns `false` when the attempt was superseded.
async fn update_segment(pass: &Pass, update: Update) -> Result<bool> {
    let Update {
        index,
        generation,
        candidate,
    } = update;
    if !pass.inner.state.borrow().is_attempt_current(index, generation) {
        trace_log!("Level {} was claimed again before it started resolving", index);
        return Ok(false);
    }
    trace_log!("Resolving segment '{}' at level {}", candidate.name, index);

    let attempt = Attempt {
        inner: Rc::clone(&pass.inner),
        index,
        generation,
        name: candidate.name,
    };

    if let Some(interim) = &candidate.params.until_resolved {
        let interim = Rc::new(interim.without_stages());
        if !resolve_level(attempt.clone(), interim).await? || !publish(pass, index, generation) {
            return Ok(false);
        }
    }

    resolve_level(attempt, candidate.params).await
}

// ============================================================================
// Level
// ============================================================================

#[derive(Clone)]
struct Attempt {
    inner: Rc<RouterInner>,
    index: usize,
    generation: u64,
    name: String,
}

impl Attempt {
    fn is_current(&self) -> bool {
        self.inner
            .state
            .borrow()
            .is_attempt_current(self.index, self.generation)
    }
}

/// Resolve `params` for one level and commit the result.
fn resolve_level(attempt: Attempt, params: Rc<SegmentParams>) -> LocalBoxFuture<'static, Result<bool>> {
    async move {
        let pending = collect_locals(&attempt.inner, &params)?;
        let outcome = future::try_join_all(
            pending
                .into_iter()
                .map(|(key, deferred)| deferred.map_ok(move |value| (key, value))),
        )
        .await;

        match outcome {
            Ok(values) => commit(&attempt, params, values.into_iter().collect()),
            Err(rejection) => {
                if !attempt.is_current() {
                    debug_log!(
                        "Rejected resolve of '{}' at level {} was superseded",
                        attempt.name,
                        attempt.index
                    );
                    return Ok(false);
                }
                fail(attempt, &params, rejection).await
            }
        }
    }
    .boxed_local()
}

async fn fail(attempt: Attempt, params: &SegmentParams, rejection: Rejection) -> Result<bool> {
    match &params.resolve_failed {
        Some(fallback) => {
            warn_log!(
                "Resolving segment '{}' failed with reason `{}`, using resolveFailed",
                attempt.name,
                rejection
            );
            let fallback = Rc::new(fallback.with_error(rejection.into_reason()));
            resolve_level(attempt, fallback).await
        }
        None => {
            let err = SegmentError::UnhandledResolveFailure {
                segment: attempt.name,
                reason: rejection,
            };
            error_log!("{}", err);
            Err(err)
        }
    }
}

/// Deferred locals of `params`, keyed by local name.
fn collect_locals(inner: &RouterInner, params: &SegmentParams) -> Result<Vec<(String, Deferred)>> {
    let mut pending = Vec::with_capacity(params.resolve.len() + 1);

    for (key, resolvable) in &params.resolve {
        let resolution = match resolvable {
            Resolvable::Injectable(name) => inner
                .injector
                .get(name)
                .ok_or_else(|| SegmentError::UnknownInjectable { name: name.clone() })?,
            Resolvable::Invoke(invocable) => inner.injector.invoke(invocable, None)?,
            Resolvable::Value(value) => Resolution::Ready(value.clone()),
        };
        pending.push((key.clone(), resolution.into_deferred()));
    }

    let mut template = params
        .template
        .as_ref()
        .map(|t| evaluate(inner, t))
        .transpose()?;

    let auto_load = inner.provider.borrow().options().auto_load_templates;
    if let (true, Some(url)) = (auto_load, &params.template_url) {
        let url = evaluate(inner, url)?;
        let templates = Rc::clone(&inner.templates);
        template = Some(
            async move {
                let url = match url.await? {
                    Value::String(url) => url,
                    other => other.to_string(),
                };
                templates.fetch(&url).await.map(Value::String)
            }
            .boxed_local(),
        );
    }

    if let Some(template) = template {
        pending.push((TEMPLATE_LOCAL.to_string(), template));
    }
    Ok(pending)
}

fn evaluate(inner: &RouterInner, template: &Template) -> Result<Deferred> {
    match template {
        Template::Text(text) => Ok(future::ready(Ok(Value::String(text.clone()))).boxed_local()),
        Template::Invoke(invocable) => Ok(inner.injector.invoke(invocable, None)?.into_deferred()),
    }
}

fn commit(attempt: &Attempt, params: Rc<SegmentParams>, locals: Locals) -> Result<bool> {
    let inner = &attempt.inner;
    if !attempt.is_current() {
        debug_log!(
            "Resolved segment '{}' at level {} was superseded, discarding",
            attempt.name,
            attempt.index
        );
        return Ok(false);
    }

    let segment = Rc::new(ResolvedSegment::new(
        attempt.name.clone(),
        Rc::clone(&params),
        locals,
        attempt.index,
        Rc::downgrade(inner),
    ));
    let watching = params
        .watcher
        .as_ref()
        .map(|invocable| {
            crate::watcher::evaluate(inner, invocable, &segment).map(|initial| (invocable.clone(), initial))
        })
        .transpose()?;

    // The watcher runs user code, which may have navigated away.
    if !attempt.is_current() {
        debug_log!(
            "Segment '{}' at level {} was superseded while watching, discarding",
            attempt.name,
            attempt.index
        );
        return Ok(false);
    }

    inner
        .state
        .borrow_mut()
        .set_segment(attempt.index, Some(Rc::clone(&segment)));
    inner.watchers.borrow_mut().dispose_at(attempt.index);
    if let Some((invocable, initial)) = watching {
        crate::watcher::install(inner, &segment, invocable, initial);
    }
    trace_log!("Segment '{}' committed at level {}", attempt.name, attempt.index);
    Ok(true)
}

// ============================================================================
// Notification
// ============================================================================

fn broadcast(inner: &RouterInner, index: usize) {
    let change = {
        let mut state = inner.state.borrow_mut();
        state.commit_view();
        SegmentChange {
            index,
            segment: state.segment(index),
        }
    };
    let listeners = inner.listeners.borrow().snapshot();
    for listener in listeners {
        listener(&change);
    }
}

/// Notify listeners of level `index`, then clear the levels below it.
/// Returns `false` when a listener claimed the level again.
fn publish(pass: &Pass, index: usize, generation: u64) -> bool {
    broadcast(&pass.inner, index);
    if !pass.inner.state.borrow().is_attempt_current(index, generation) {
        debug_log!("Level {} was claimed again while notifying", index);
        return false;
    }
    clear_below(pass, index);
    true
}

/// Clear every level below `index` that still holds a segment and is still
/// claimed by `pass`.
fn clear_below(pass: &Pass, index: usize) {
    let inner = &pass.inner;
    let len = inner.state.borrow().chain.len();
    for level in index + 1..len {
        if !pass.owns(level) {
            continue;
        }
        let cleared = inner.state.borrow_mut().take_segment(level).is_some();
        if cleared {
            inner.watchers.borrow_mut().dispose_at(level);
            debug_log!("Level {} cleared", level);
            broadcast(inner, level);
        }
    }
}
