//! Arena-backed `HostTree` used by tests and the simulator binary.
//!
//! Nodes are never freed: a removed subtree stays addressable (detached) so
//! stale handles behave like detached DOM nodes rather than dangling ids.
//! Child-list changes are appended to an internal record queue drained with
//! `take_records`.

use crate::{HostTree, MutationRecord, NodeId, Selector};
use smallvec::SmallVec;
use tracing::trace;

#[derive(Debug, Clone, Default)]
struct NodeData {
    tag: String,
    classes: SmallVec<[String; 3]>,
    attrs: Vec<(String, String)>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Write counters. Attribute/class writes are counted even though they do not
/// produce mutation records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryTreeStats {
    pub child_list_records: u64,
    pub batch_moves: u64,
    pub attr_writes: u64,
    pub class_writes: u64,
    pub text_writes: u64,
}

#[derive(Debug)]
pub struct MemoryTree {
    nodes: Vec<NodeData>,
    body: NodeId,
    records: Vec<MutationRecord>,
    stats: MemoryTreeStats,
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTree {
    pub fn new() -> Self {
        let body = NodeData {
            tag: "body".to_string(),
            ..NodeData::default()
        };
        Self {
            nodes: vec![body],
            body: NodeId::from_raw(0),
            records: Vec::new(),
            stats: MemoryTreeStats::default(),
        }
    }

    /// Drain queued mutation records.
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn pending_records(&self) -> usize {
        self.records.len()
    }

    pub fn stats(&self) -> MemoryTreeStats {
        self.stats
    }

    pub fn tag(&self, node: NodeId) -> &str {
        self.node(node).map(|n| n.tag.as_str()).unwrap_or("")
    }

    fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.raw() as usize)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id.raw() as usize)
    }

    fn push_record(&mut self, record: MutationRecord) {
        trace!(
            target: "dom.memory",
            target_node = record.target.raw(),
            added = record.added.len(),
            removed = record.removed.len(),
            "child_list_record"
        );
        self.stats.child_list_records += 1;
        self.records.push(record);
    }

    /// Unlink `child` from its parent without recording. Returns the old parent.
    fn unlink(&mut self, child: NodeId) -> Option<NodeId> {
        let parent = self.node(child)?.parent?;
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|c| *c != child);
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = None;
        }
        Some(parent)
    }

    fn detach_recorded(&mut self, child: NodeId) {
        if let Some(old_parent) = self.unlink(child) {
            let mut record = MutationRecord::new(old_parent);
            record.removed.push(child);
            self.push_record(record);
        }
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let Some(data) = self.node(node) else {
            return;
        };
        out.push_str(&data.text);
        for child in &data.children {
            self.collect_text(*child, out);
        }
    }
}

impl HostTree for MemoryTree {
    fn body(&self) -> NodeId {
        self.body
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        let Some(data) = self.node(node) else {
            return false;
        };
        if selector.tag.is_some_and(|tag| data.tag != tag) {
            return false;
        }
        if !selector
            .classes
            .iter()
            .all(|c| data.classes.iter().any(|have| have == c))
        {
            return false;
        }
        match selector.attr {
            Some((name, value)) => data
                .attrs
                .iter()
                .any(|(k, v)| k == name && v == value),
            None => true,
        }
    }

    fn text(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.node(node)?
            .attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.node(node)
            .map(|n| n.classes.iter().any(|c| c == class))
            .unwrap_or(false)
    }

    fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(data) = self.node_mut(node) else {
            return;
        };
        match data.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => data.attrs.push((name.to_string(), value.to_string())),
        }
        self.stats.attr_writes += 1;
    }

    fn remove_attr(&mut self, node: NodeId, name: &str) {
        let Some(data) = self.node_mut(node) else {
            return;
        };
        let before = data.attrs.len();
        data.attrs.retain(|(k, _)| k != name);
        if data.attrs.len() != before {
            self.stats.attr_writes += 1;
        }
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        let Some(data) = self.node_mut(node) else {
            return;
        };
        if !data.classes.iter().any(|c| c == class) {
            data.classes.push(class.to_string());
        }
        self.stats.class_writes += 1;
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        let Some(data) = self.node_mut(node) else {
            return;
        };
        data.classes.retain(|c| c != class);
        self.stats.class_writes += 1;
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        let Some(data) = self.node_mut(node) else {
            return;
        };
        data.text = text.to_string();
        self.stats.text_writes += 1;
        self.push_record(MutationRecord::new(node));
    }

    fn create_element(&mut self, tag: &str, classes: &[&str]) -> NodeId {
        let id = NodeId::from_raw(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            tag: tag.to_string(),
            classes: classes.iter().map(|c| c.to_string()).collect(),
            ..NodeData::default()
        });
        id
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.node(parent).is_none() || self.node(child).is_none() || self.contains(child, parent)
        {
            return;
        }
        self.detach_recorded(child);
        if let Some(p) = self.node_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
        }
        let mut record = MutationRecord::new(parent);
        record.added.push(child);
        self.push_record(record);
    }

    fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        if self.node(parent).is_none() || self.node(child).is_none() || self.contains(child, parent)
        {
            return;
        }
        self.detach_recorded(child);
        if let Some(p) = self.node_mut(parent) {
            p.children.insert(0, child);
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
        }
        let mut record = MutationRecord::new(parent);
        record.added.push(child);
        self.push_record(record);
    }

    fn remove(&mut self, node: NodeId) {
        self.detach_recorded(node);
    }

    fn move_children(&mut self, parent: NodeId, ordered: &[NodeId]) {
        if self.node(parent).is_none() {
            return;
        }
        let mut record = MutationRecord::new(parent);
        for child in ordered {
            if self.node(*child).is_none() || self.contains(*child, parent) {
                continue;
            }
            match self.node(*child).and_then(|c| c.parent) {
                Some(old) if old == parent => {
                    self.unlink(*child);
                    record.removed.push(*child);
                }
                Some(_) => self.detach_recorded(*child),
                None => {}
            }
            if let Some(p) = self.node_mut(parent) {
                p.children.push(*child);
            }
            if let Some(c) = self.node_mut(*child) {
                c.parent = Some(parent);
            }
            record.added.push(*child);
        }
        self.stats.batch_moves += 1;
        self.push_record(record);
    }
}
