use ahash::{HashSet, HashSetExt};

use crate::document_order::DocumentOrderAnnotations;

/// An ordered sequence of node handles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sequence(Vec<xot::Node>);

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<xot::Node> {
        self.0.first().copied()
    }

    pub fn get(&self, index: usize) -> Option<xot::Node> {
        self.0.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = xot::Node> + '_ {
        self.0.iter().copied()
    }

    pub fn push(&mut self, node: xot::Node) {
        self.0.push(node)
    }

    /// Append `other` after the nodes already here.
    pub fn concat(mut self, other: Sequence) -> Self {
        self.0.extend(other.0);
        self
    }

    pub fn as_slice(&self) -> &[xot::Node] {
        &self.0
    }

    // https://www.w3.org/TR/xpath-31/#id-path-operator
    pub(crate) fn deduplicate(self, xot: &xot::Xot, order: &DocumentOrderAnnotations) -> Self {
        let s = self.0.into_iter().collect::<HashSet<_>>();
        Self::process_set_result(s, xot, order)
    }

    pub(crate) fn intersect(
        self,
        other: &Sequence,
        xot: &xot::Xot,
        order: &DocumentOrderAnnotations,
    ) -> Self {
        let other = other.iter().collect::<HashSet<_>>();
        let s = self.0.into_iter().filter(|n| other.contains(n)).collect();
        Self::process_set_result(s, xot, order)
    }

    pub(crate) fn union(
        self,
        other: Sequence,
        xot: &xot::Xot,
        order: &DocumentOrderAnnotations,
    ) -> Self {
        let mut s = HashSet::with_capacity(self.len() + other.len());
        s.extend(self.0);
        s.extend(other.0);
        Self::process_set_result(s, xot, order)
    }

    fn process_set_result(
        s: HashSet<xot::Node>,
        xot: &xot::Xot,
        order: &DocumentOrderAnnotations,
    ) -> Self {
        // sort nodes by document order
        let mut nodes = s.into_iter().collect::<Vec<_>>();
        nodes.sort_by_key(|n| order.get(*n, xot));
        Self(nodes)
    }
}

impl From<Vec<xot::Node>> for Sequence {
    fn from(nodes: Vec<xot::Node>) -> Self {
        Self(nodes)
    }
}

impl From<xot::Node> for Sequence {
    fn from(node: xot::Node) -> Self {
        Self(vec![node])
    }
}

impl FromIterator<xot::Node> for Sequence {
    fn from_iter<I: IntoIterator<Item = xot::Node>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Sequence {
    type Item = xot::Node;
    type IntoIter = std::vec::IntoIter<xot::Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Extend<xot::Node> for Sequence {
    fn extend<I: IntoIterator<Item = xot::Node>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}
