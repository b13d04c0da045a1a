// Document order for XML nodes. This maintains both a tree id (so we can
// distinguish between nodes from different documents or synthesized
// fragments) as well as a preorder position (so we can sort nodes from the
// same tree).
//
// Annotations are created on the fly: the first time a node of a tree is
// asked for, the whole tree it belongs to is numbered in one preorder pass
// starting from its topmost ancestor. Synthesized elements are complete by
// the time they are returned from evaluation, so a numbered tree does not
// grow afterwards.

use std::cell::RefCell;

use ahash::{HashMap, HashMapExt};
use xot::Xot;

#[derive(Debug, Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub(crate) struct DocumentOrder(usize, usize);

#[derive(Debug, Clone)]
pub(crate) struct DocumentOrderAnnotations {
    // each tree has a different id, so track this
    tree_id: RefCell<usize>,
    map: RefCell<HashMap<xot::Node, DocumentOrder>>,
}

impl DocumentOrderAnnotations {
    pub(crate) fn new() -> Self {
        Self {
            map: RefCell::new(HashMap::new()),
            tree_id: RefCell::new(0),
        }
    }

    pub(crate) fn get(&self, node: xot::Node, xot: &Xot) -> DocumentOrder {
        let document_order = self.map.borrow().get(&node).copied();
        if let Some(document_order) = document_order {
            return document_order;
        }
        let mut top = node;
        while let Some(parent) = xot.parent(top) {
            top = parent;
        }
        let tree_id = {
            let mut tree_id = self.tree_id.borrow_mut();
            *tree_id += 1;
            *tree_id
        };
        let mut map = self.map.borrow_mut();
        for (i, descendant) in xot.all_descendants(top).enumerate() {
            map.insert(descendant, DocumentOrder(tree_id, i));
        }
        // `all_descendants` starts at `top`, an ancestor-or-self of `node`
        map.get(&node)
            .copied()
            .unwrap_or(DocumentOrder(tree_id, 0))
    }
}
