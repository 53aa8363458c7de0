//! Host tree capability surface.
//!
//! The engine never owns the nodes it decorates. Everything it knows about the
//! host UI goes through `HostTree`: locating nodes by structural selector,
//! reading text and attributes, and a handful of writes (attributes, classes,
//! text, creating engine-owned elements, and moving children in one batch).
//!
//! Node handles are plain ids. A handle may outlive the node's attachment (the
//! host can detach or replace subtrees at any time) so callers re-check
//! `is_attached` instead of assuming a handle stays meaningful across passes.
//!
//! Mutation delivery: implementors record child-list changes (including text
//! replacement) as `MutationRecord`s. Attribute and class writes are not
//! recorded. Consumers describe what they watch with an `Observation` and
//! filter records through `Observation::observes`.

pub mod contract;
pub mod fixture;
mod memory;

pub use memory::{MemoryTree, MemoryTreeStats};

use smallvec::SmallVec;

/// Opaque handle to a node in a host tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Minimal structural selector: optional tag, a set of required classes and an
/// optional attribute equality test. All present parts must match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selector {
    pub tag: Option<&'static str>,
    pub classes: &'static [&'static str],
    pub attr: Option<(&'static str, &'static str)>,
}

impl Selector {
    pub const fn classes(classes: &'static [&'static str]) -> Self {
        Self {
            tag: None,
            classes,
            attr: None,
        }
    }

    pub const fn tag(tag: &'static str) -> Self {
        Self {
            tag: Some(tag),
            classes: &[],
            attr: None,
        }
    }

    pub const fn attr(name: &'static str, value: &'static str) -> Self {
        Self {
            tag: None,
            classes: &[],
            attr: Some((name, value)),
        }
    }
}

bitflags::bitflags! {
    /// Mirrors the child-list observation options of a DOM mutation observer.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ObserveFlags: u8 {
        const CHILD_LIST = 0b01;
        const SUBTREE    = 0b10;
    }
}

/// One child-list change. `target` is the node whose children (or text) changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added: SmallVec<[NodeId; 4]>,
    pub removed: SmallVec<[NodeId; 4]>,
}

impl MutationRecord {
    pub fn new(target: NodeId) -> Self {
        Self {
            target,
            added: SmallVec::new(),
            removed: SmallVec::new(),
        }
    }
}

/// What a watcher is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub target: NodeId,
    pub flags: ObserveFlags,
}

impl Observation {
    pub const fn new(target: NodeId, flags: ObserveFlags) -> Self {
        Self { target, flags }
    }

    /// True when `record` would have been delivered to an observer registered
    /// with this target and these flags.
    pub fn observes<T: HostTree + ?Sized>(&self, tree: &T, record: &MutationRecord) -> bool {
        if !self.flags.contains(ObserveFlags::CHILD_LIST) {
            return false;
        }
        if record.target == self.target {
            return true;
        }
        self.flags.contains(ObserveFlags::SUBTREE) && tree.contains(self.target, record.target)
    }
}

/// Capability interface over a foreign, host-owned element tree.
pub trait HostTree {
    /// Document-level container every attached node descends from.
    fn body(&self) -> NodeId;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn children(&self, node: NodeId) -> Vec<NodeId>;
    fn matches(&self, node: NodeId, selector: &Selector) -> bool;
    /// Rendered text of the node and its descendants, in document order.
    fn text(&self, node: NodeId) -> String;
    fn attr(&self, node: NodeId, name: &str) -> Option<String>;
    fn has_class(&self, node: NodeId, class: &str) -> bool;

    fn set_attr(&mut self, node: NodeId, name: &str, value: &str);
    /// No-op when the attribute is absent.
    fn remove_attr(&mut self, node: NodeId, name: &str);
    fn add_class(&mut self, node: NodeId, class: &str);
    fn remove_class(&mut self, node: NodeId, class: &str);
    /// Replace the node's own text content.
    fn set_text(&mut self, node: NodeId, text: &str);
    /// Create a detached element.
    fn create_element(&mut self, tag: &str, classes: &[&str]) -> NodeId;
    fn append_child(&mut self, parent: NodeId, child: NodeId);
    fn prepend_child(&mut self, parent: NodeId, child: NodeId);
    fn remove(&mut self, node: NodeId);
    /// Move `ordered` to the end of `parent` in that order as one batch
    /// (document-fragment semantics).
    fn move_children(&mut self, parent: NodeId, ordered: &[NodeId]);

    /// Inclusive ancestry test: a node contains itself.
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    fn is_attached(&self, node: NodeId) -> bool {
        self.contains(self.body(), node)
    }

    /// Pre-order descendants of `scope`, excluding `scope` itself.
    fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).into_iter().rev());
        }
        out
    }

    /// First descendant of `scope` matching `selector`.
    fn locate(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|n| self.matches(*n, selector))
    }

    fn locate_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|n| self.matches(*n, selector))
            .collect()
    }

    /// Nearest inclusive ancestor matching `selector`.
    fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if self.matches(current, selector) {
                return Some(current);
            }
            cursor = self.parent(current);
        }
        None
    }

    /// `node` itself or any of its descendants matches.
    fn matches_within(&self, node: NodeId, selector: &Selector) -> bool {
        self.matches(node, selector) || self.locate(node, selector).is_some()
    }
}

/// Navigation keys the engine may take over from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavKey {
    Up,
    Down,
}
