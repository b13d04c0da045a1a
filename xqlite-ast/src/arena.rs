use std::ops::Index;

use crate::error::{Error, Result};
use crate::node::{Node, NodeId, NodeKind};

/// Owns every node of one parsed query.
///
/// Child edges and parent back-references are ids into this arena. All
/// structural mutation goes through the methods here so that both
/// directions stay consistent: if `a` lists `b` as a child, `b`'s parent is
/// `a`, and a node is listed by at most one parent.
#[derive(Debug, Clone, Default)]
pub struct Ast {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, id: NodeId) -> Result<()> {
        self.check(id)?;
        if self.nodes[id.0].parent.is_some() {
            return Err(Error::AlreadyAttached(id));
        }
        self.root = Some(id);
        Ok(())
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self[id].kind
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self[id].edges
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self[id].parent
    }

    pub fn label(&self, id: NodeId) -> String {
        self[id].label()
    }

    /// The first child whose kind satisfies `f`.
    pub fn find_child(&self, id: NodeId, f: impl Fn(&NodeKind) -> bool) -> Option<NodeId> {
        self[id]
            .edges
            .iter()
            .copied()
            .find(|child| f(&self[*child].kind))
    }

    /// Create a node over already built, unattached children.
    pub fn add(&mut self, kind: NodeKind, edges: Vec<NodeId>) -> Result<NodeId> {
        let arity = kind.arity();
        if !arity.accepts(edges.len()) {
            return Err(Error::Arity {
                kind: kind.name().to_string(),
                expected: arity,
                found: edges.len(),
            });
        }
        for &child in &edges {
            self.check_detached(child)?;
        }
        let id = NodeId(self.nodes.len());
        for &child in &edges {
            self.nodes[child.0].parent = Some(id);
        }
        self.nodes.push(Node {
            kind,
            edges,
            parent: None,
        });
        Ok(id)
    }

    /// Unlink a node from its parent (or from the root slot). The node and
    /// its subtree stay in the arena.
    pub fn detach(&mut self, id: NodeId) -> Result<()> {
        self.check(id)?;
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].edges.retain(|&child| child != id);
        } else if self.root == Some(id) {
            self.root = None;
        }
        Ok(())
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<()> {
        self.check(parent)?;
        self.check_detached(child)?;
        let index = index.min(self.nodes[parent.0].edges.len());
        self.nodes[parent.0].edges.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
        Ok(())
    }

    pub fn push_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let end = self.children(parent).len();
        self.insert_child(parent, end, child)
    }

    /// Put the unattached node `new` into the slot `old` occupies, leaving
    /// `old` detached.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<()> {
        self.check(old)?;
        self.check_detached(new)?;
        if let Some(parent) = self.nodes[old.0].parent.take() {
            for edge in self.nodes[parent.0].edges.iter_mut() {
                if *edge == old {
                    *edge = new;
                }
            }
            self.nodes[new.0].parent = Some(parent);
        } else if self.root == Some(old) {
            self.root = Some(new);
        }
        Ok(())
    }

    /// Delete a node and its subtree, compacting ids afterwards.
    pub fn delete(&mut self, id: NodeId) -> Result<()> {
        self.delete_many(&[id])
    }

    /// Delete several subtrees with a single compaction pass.
    ///
    /// Any id held by the caller is invalid afterwards.
    pub fn delete_many(&mut self, ids: &[NodeId]) -> Result<()> {
        for &id in ids {
            self.check(id)?;
        }
        let mut removed = vec![false; self.nodes.len()];
        for &id in ids {
            self.detach(id)?;
            for node in self.preorder(id) {
                removed[node.0] = true;
            }
        }
        let mut remap = Vec::with_capacity(self.nodes.len());
        let mut next = 0;
        for &gone in &removed {
            if gone {
                remap.push(None);
            } else {
                remap.push(Some(NodeId(next)));
                next += 1;
            }
        }
        let nodes = std::mem::take(&mut self.nodes);
        self.nodes = nodes
            .into_iter()
            .zip(removed)
            .filter(|(_, gone)| !gone)
            .map(|(mut node, _)| {
                node.edges = node.edges.iter().filter_map(|e| remap[e.0]).collect();
                node.parent = node.parent.and_then(|p| remap[p.0]);
                node
            })
            .collect();
        self.root = self.root.and_then(|r| remap[r.0]);
        Ok(())
    }

    /// The node and all of its descendants, parents before children.
    pub fn preorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            result.push(id);
            stack.extend(self[id].edges.iter().rev().copied());
        }
        result
    }

    /// Whether every edge agrees with the parent pointer at its far end.
    pub fn is_consistent(&self) -> bool {
        self.nodes.iter().enumerate().all(|(i, node)| {
            let edges_agree = node
                .edges
                .iter()
                .all(|child| self.nodes.get(child.0).and_then(|c| c.parent) == Some(NodeId(i)));
            let parent_agrees = match node.parent {
                Some(parent) => self.nodes.get(parent.0).is_some_and(|p| {
                    p.edges.iter().filter(|&&e| e == NodeId(i)).count() == 1
                }),
                None => true,
            };
            edges_agree && parent_agrees
        })
    }

    fn check(&self, id: NodeId) -> Result<()> {
        if id.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(Error::InvalidNode(id))
        }
    }

    fn check_detached(&self, id: NodeId) -> Result<()> {
        self.check(id)?;
        if self.nodes[id.0].parent.is_some() || self.root == Some(id) {
            Err(Error::AlreadyAttached(id))
        } else {
            Ok(())
        }
    }
}

impl Index<NodeId> for Ast {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}
