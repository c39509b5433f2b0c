//! Segment tree and its configuration cursor.
//!
//! The tree is an arena of [`SegmentNode`]s keyed by the path of canonical
//! names leading to them. Children lists keep insertion order, which is the
//! order default children are scanned in.
//!
//! Segment names are canonicalized with [`camel_case`] for lookup, so the
//! configured `section-first` and the route component `section-first` both
//! land on the key `sectionFirst`. The node keeps the original spelling for
//! composite names.
//!
//! # Example
//!
//! ```
//! use route_segment::{SegmentParams, SegmentTree};
//!
//! let mut tree = SegmentTree::new();
//! tree.pointer(true)
//!     .add_segment("section2", SegmentParams::new())
//!     .descend_last()
//!     .unwrap()
//!     .add_segment("section21", SegmentParams::new())
//!     .add_segment("section22", SegmentParams::new());
//!
//! assert!(tree.node(&["section2", "section22"]).is_some());
//! assert!(tree.pointer(true).descend("missing").is_err());
//! ```

use crate::error::{Result, SegmentError};
use crate::segment::SegmentParams;
use crate::trace_log;
use std::collections::HashMap;
use std::rc::Rc;

/// Canonical lookup key for a segment name.
///
/// A run of `:`, `-`, `_` followed by a character collapses into that
/// character, upper-cased unless the run starts the name. A trailing run
/// keeps only its last separator.
///
/// ```
/// use route_segment::tree::camel_case;
///
/// assert_eq!(camel_case("section-first"), "sectionFirst");
/// assert_eq!(camel_case("invalid_child"), "invalidChild");
/// assert_eq!(camel_case("-lead"), "lead");
/// assert_eq!(camel_case("plain"), "plain");
/// ```
pub fn camel_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len());
    let mut i = 0;

    while i < chars.len() {
        if !is_separator(chars[i]) {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        let start = i;
        while i < chars.len() && is_separator(chars[i]) {
            i += 1;
        }
        match chars.get(i) {
            Some(&c) if start == 0 => out.push(c),
            Some(&c) => out.extend(c.to_uppercase()),
            None => out.push(chars[i - 1]),
        }
        i += 1;
    }

    out
}

fn is_separator(c: char) -> bool {
    matches!(c, ':' | '-' | '_')
}

fn canonical_path<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    names.iter().map(|n| camel_case(n.as_ref())).collect()
}

/// A configured segment.
#[derive(Debug, Clone)]
pub struct SegmentNode {
    name: String,
    params: Rc<SegmentParams>,
    children: Option<Vec<String>>,
}

impl SegmentNode {
    /// The name as it was configured.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &Rc<SegmentParams> {
        &self.params
    }

    /// Canonical keys of the children, in insertion order. `None` until the
    /// node is first descended into.
    pub fn children(&self) -> Option<&[String]> {
        self.children.as_deref()
    }
}

/// A segment picked for one level of a route.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub(crate) name: String,
    pub(crate) params: Rc<SegmentParams>,
}

/// Arena of segment definitions.
#[derive(Debug, Clone, Default)]
pub struct SegmentTree {
    nodes: HashMap<Vec<String>, SegmentNode>,
    top: Vec<String>,
    root_last_added: Option<String>,
}

impl SegmentTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cursor at the top level.
    pub fn pointer(&mut self, strict: bool) -> SegmentPointer<'_> {
        let last_added = self.root_last_added.clone();
        SegmentPointer {
            tree: self,
            strict,
            level: Level {
                path: Vec::new(),
                last_added,
                parent: None,
            },
        }
    }

    /// Node reached by walking `names` from the top.
    pub fn node<S: AsRef<str>>(&self, names: &[S]) -> Option<&SegmentNode> {
        self.nodes.get(&canonical_path(names))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-level keys in insertion order.
    pub fn top_level(&self) -> &[String] {
        &self.top
    }

    fn insert(&mut self, parent: &[String], name: &str, params: SegmentParams) {
        let mut path = parent.to_vec();
        path.push(camel_case(name));

        if let Some(node) = self.nodes.get_mut(&path) {
            node.name = name.to_string();
            node.params = Rc::new(params);
            trace_log!("Segment '{}' overwritten", path.join("."));
            return;
        }

        self.link(parent, &path);
        self.nodes.insert(
            path,
            SegmentNode {
                name: name.to_string(),
                params: Rc::new(params),
                children: None,
            },
        );
    }

    /// Path of the child `name` under `parent`, creating an empty node when
    /// allowed, and making sure it has a children list.
    fn ensure_children(&mut self, parent: &[String], name: &str, strict: bool) -> Result<Vec<String>> {
        let mut path = parent.to_vec();
        path.push(camel_case(name));

        if let Some(node) = self.nodes.get_mut(&path) {
            node.children.get_or_insert_with(Vec::new);
            return Ok(path);
        }
        if strict {
            return Err(SegmentError::UnknownSegment {
                name: name.to_string(),
            });
        }

        self.link(parent, &path);
        self.nodes.insert(
            path.clone(),
            SegmentNode {
                name: name.to_string(),
                params: Rc::new(SegmentParams::default()),
                children: Some(Vec::new()),
            },
        );
        Ok(path)
    }

    fn link(&mut self, parent: &[String], path: &[String]) {
        let Some(key) = path.last().cloned() else {
            return;
        };
        if parent.is_empty() {
            self.top.push(key);
        } else if let Some(node) = self.nodes.get_mut(parent) {
            node.children.get_or_insert_with(Vec::new).push(key);
        }
    }

    /// Segment for depth `index` of the route `names`.
    ///
    /// The candidate is named by the route component as written, whatever
    /// spelling the node was declared with. An undeclared component is an
    /// error in strict mode and an empty segment otherwise.
    pub(crate) fn lookup(&self, names: &[String], index: usize, strict: bool) -> Result<Candidate> {
        let prefix = &names[..=index];
        match self.node(prefix) {
            Some(node) => Ok(Candidate {
                name: names[index].clone(),
                params: Rc::clone(&node.params),
            }),
            None if strict => Err(SegmentError::UnknownSegment {
                name: prefix.join("."),
            }),
            None => Ok(Candidate {
                name: names[index].clone(),
                params: Rc::new(SegmentParams::default()),
            }),
        }
    }

    /// First child of the node at `names` marked as default.
    pub(crate) fn default_child(&self, names: &[String]) -> Option<Candidate> {
        let path = canonical_path(names);
        let children = self.nodes.get(&path)?.children.as_ref()?;
        children.iter().find_map(|key| {
            let mut child_path = path.clone();
            child_path.push(key.clone());
            let child = self.nodes.get(&child_path)?;
            child.params.default.then(|| Candidate {
                name: child.name.clone(),
                params: Rc::clone(&child.params),
            })
        })
    }
}

#[derive(Debug, Clone)]
struct Level {
    path: Vec<String>,
    last_added: Option<String>,
    parent: Option<Box<Level>>,
}

/// Configuration cursor over one children list of a [`SegmentTree`].
///
/// Every operation consumes the cursor and hands back the next one, so calls
/// chain the way the tree nests.
#[derive(Debug)]
pub struct SegmentPointer<'a> {
    tree: &'a mut SegmentTree,
    strict: bool,
    level: Level,
}

impl<'a> SegmentPointer<'a> {
    /// Insert or overwrite `name` at this level.
    ///
    /// Overwriting replaces the params wholesale and keeps the children.
    pub fn add_segment(mut self, name: impl Into<String>, params: SegmentParams) -> Self {
        let name = name.into();
        self.tree.insert(&self.level.path, &name, params);
        if self.level.path.is_empty() {
            self.tree.root_last_added = Some(name.clone());
        }
        self.level.last_added = Some(name);
        self
    }

    /// Move into the children of `name`.
    ///
    /// In strict mode an undeclared `name` fails with
    /// [`SegmentError::UnknownSegment`]; otherwise an empty node is created.
    pub fn descend(self, name: &str) -> Result<Self> {
        let path = self.tree.ensure_children(&self.level.path, name, self.strict)?;
        Ok(Self {
            tree: self.tree,
            strict: self.strict,
            level: Level {
                path,
                last_added: None,
                parent: Some(Box::new(self.level)),
            },
        })
    }

    /// Move into the children of the segment added last at this level.
    pub fn descend_last(self) -> Result<Self> {
        match self.level.last_added.clone() {
            Some(name) => self.descend(&name),
            None => Err(SegmentError::UnknownSegment {
                name: String::new(),
            }),
        }
    }

    /// Move back to the parent level. At the top level this is a no-op.
    pub fn ascend(self) -> Self {
        match self.level.parent {
            Some(parent) => Self {
                tree: self.tree,
                strict: self.strict,
                level: *parent,
            },
            None => Self {
                tree: self.tree,
                strict: self.strict,
                level: self.level,
            },
        }
    }

    /// Jump to the top level.
    pub fn to_root(self) -> Self {
        let tree = self.tree;
        tree.pointer(self.strict)
    }

    /// Canonical path of the level this cursor edits; empty at the top.
    pub fn path(&self) -> &[String] {
        &self.level.path
    }

    /// Name added last at this level.
    pub fn last_added(&self) -> Option<&str> {
        self.level.last_added.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> SegmentTree {
        let mut tree = SegmentTree::new();
        tree.pointer(true)
            .add_segment("section-first", SegmentParams::new().data("test", "A"))
            .add_segment("section2", SegmentParams::new().data("test", "B"))
            .descend_last()
            .unwrap()
            .add_segment("section21", SegmentParams::new().data("test", "C"))
            .descend_last()
            .unwrap()
            .add_segment("section211", SegmentParams::new().data("test", "E"))
            .ascend()
            .add_segment("section22", SegmentParams::new().data("test", "D"));
        tree
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("section-first"), "sectionFirst");
        assert_eq!(camel_case("a:b_c-d"), "aBCD");
        assert_eq!(camel_case("a--b"), "aB");
        assert_eq!(camel_case("_x"), "x");
        assert_eq!(camel_case("a-"), "a-");
        assert_eq!(camel_case("a--"), "a-");
        assert_eq!(camel_case(""), "");
    }

    #[test]
    fn test_tree_shape() {
        let tree = sample();

        let first = tree.node(&["sectionFirst"]).unwrap();
        assert_eq!(first.name(), "section-first");
        assert_eq!(first.params().data["test"], json!("A"));
        assert!(first.children().is_none());

        let s2 = tree.node(&["section2"]).unwrap();
        assert_eq!(s2.children().unwrap(), ["section21", "section22"]);
        assert!(tree.node(&["section2", "section22"]).unwrap().children().is_none());
        assert_eq!(
            tree.node(&["section2", "section21", "section211"]).unwrap().params().data["test"],
            json!("E")
        );
        assert_eq!(tree.top_level(), ["sectionFirst", "section2"]);
    }

    #[test]
    fn test_descend_without_name_uses_last_added() {
        let mut tree = SegmentTree::new();
        let pointer = tree
            .pointer(true)
            .add_segment("a", SegmentParams::new())
            .add_segment("b", SegmentParams::new())
            .descend_last()
            .unwrap();
        assert_eq!(pointer.path(), ["b"]);
    }

    #[test]
    fn test_root_remembers_last_added() {
        let mut tree = SegmentTree::new();
        tree.pointer(true).add_segment("a", SegmentParams::new());
        let pointer = tree.pointer(true).descend_last().unwrap();
        assert_eq!(pointer.path(), ["a"]);
    }

    #[test]
    fn test_descend_last_on_fresh_level_fails() {
        let mut tree = SegmentTree::new();
        assert!(tree.pointer(false).descend_last().is_err());
    }

    #[test]
    fn test_strict_descend_into_unknown() {
        let mut tree = sample();
        let err = tree.pointer(true).descend("invalid").unwrap_err();
        assert_eq!(
            err,
            SegmentError::UnknownSegment {
                name: "invalid".to_string()
            }
        );
    }

    #[test]
    fn test_lenient_descend_creates_node() {
        let mut tree = sample();
        tree.pointer(false)
            .descend("invalid")
            .unwrap()
            .add_segment("invalid-child", SegmentParams::new());

        assert!(tree.node(&["invalid"]).is_some());
        assert!(tree.node(&["invalid", "invalidChild"]).is_some());
        assert_eq!(tree.node(&["invalid"]).unwrap().children().unwrap(), ["invalidChild"]);
    }

    #[test]
    fn test_overwrite_replaces_params_and_keeps_children() {
        let mut tree = sample();
        tree.pointer(true)
            .add_segment("section2", SegmentParams::new().data("foo", "bar"));

        let node = tree.node(&["section2"]).unwrap();
        assert_eq!(node.params().data.get("test"), None);
        assert_eq!(node.params().data["foo"], json!("bar"));
        assert_eq!(node.children().unwrap().len(), 2);
    }

    #[test]
    fn test_ascend_at_root_is_noop() {
        let mut tree = sample();
        let pointer = tree.pointer(true).ascend().ascend();
        assert!(pointer.path().is_empty());
    }

    #[test]
    fn test_to_root_from_depth() {
        let mut tree = sample();
        let pointer = tree
            .pointer(true)
            .descend("section2")
            .unwrap()
            .descend("section21")
            .unwrap()
            .to_root()
            .add_segment("section3", SegmentParams::new());
        assert!(pointer.path().is_empty());
        assert!(tree.node(&["section3"]).is_some());
    }

    #[test]
    fn test_lookup() {
        let tree = sample();
        let names: Vec<String> = vec!["section2".into(), "section21".into()];

        let candidate = tree.lookup(&names, 1, true).unwrap();
        assert_eq!(candidate.name, "section21");

        let spelled: Vec<String> = vec!["section_2".into(), "section21".into()];
        assert_eq!(tree.lookup(&spelled, 0, true).unwrap().name, "section_2");

        let bad: Vec<String> = vec!["section2".into(), "nope".into()];
        assert_eq!(
            tree.lookup(&bad, 1, true).unwrap_err(),
            SegmentError::UnknownSegment {
                name: "section2.nope".to_string()
            }
        );
        let lenient = tree.lookup(&bad, 1, false).unwrap();
        assert_eq!(lenient.name, "nope");
        assert!(lenient.params.resolve.is_empty());
    }

    #[test]
    fn test_default_child_first_in_insertion_order() {
        let mut tree = SegmentTree::new();
        tree.pointer(true)
            .add_segment("p", SegmentParams::new())
            .descend_last()
            .unwrap()
            .add_segment("plain", SegmentParams::new())
            .add_segment("first", SegmentParams::new().default_child())
            .add_segment("second", SegmentParams::new().default_child());

        let child = tree.default_child(&["p".to_string()]).unwrap();
        assert_eq!(child.name, "first");
        assert!(tree.default_child(&["p".to_string(), "first".to_string()]).is_none());
    }
}
