use std::hash::{Hash, Hasher};

use xot::{ValueType, Xot};

use crate::sequence::Sequence;

/// Structural equality of two nodes.
///
/// Texts compare by content. Elements compare by name and then by their
/// element and text children, pairwise and in order; documents compare by
/// their children. Comments and processing instructions are ignored.
pub fn value_equal(xot: &Xot, a: xot::Node, b: xot::Node) -> bool {
    if a == b {
        return true;
    }
    match (xot.value_type(a), xot.value_type(b)) {
        (ValueType::Text, ValueType::Text) => xot.text_str(a) == xot.text_str(b),
        (ValueType::Element, ValueType::Element) => {
            let same_name = match (xot.element(a), xot.element(b)) {
                (Some(a), Some(b)) => a.name() == b.name(),
                _ => false,
            };
            same_name && children_equal(xot, a, b)
        }
        (ValueType::Document, ValueType::Document) => children_equal(xot, a, b),
        _ => false,
    }
}

fn children_equal(xot: &Xot, a: xot::Node, b: xot::Node) -> bool {
    let mut a = compared_children(xot, a);
    let mut b = compared_children(xot, b);
    loop {
        match (a.next(), b.next()) {
            (Some(a), Some(b)) => {
                if !value_equal(xot, a, b) {
                    return false;
                }
            }
            (None, None) => return true,
            _ => return false,
        }
    }
}

fn compared_children(xot: &Xot, node: xot::Node) -> impl Iterator<Item = xot::Node> + '_ {
    xot.children(node)
        .filter(move |&child| xot.is_element(child) || xot.is_text(child))
}

/// Pairwise value equality of two sequences of the same non-zero length.
pub fn sequences_value_equal(xot: &Xot, a: &Sequence, b: &Sequence) -> bool {
    !a.is_empty()
        && a.len() == b.len()
        && a.iter().zip(b.iter()).all(|(a, b)| value_equal(xot, a, b))
}

/// Feed a node's structure into `state` so that value-equal nodes hash
/// alike.
pub fn value_hash<H: Hasher>(xot: &Xot, node: xot::Node, state: &mut H) {
    match xot.value_type(node) {
        ValueType::Text => {
            0u8.hash(state);
            xot.text_str(node).hash(state);
        }
        ValueType::Element => {
            1u8.hash(state);
            if let Some(element) = xot.element(node) {
                element.name().hash(state);
            }
            children_hash(xot, node, state);
        }
        ValueType::Document => {
            2u8.hash(state);
            children_hash(xot, node, state);
        }
        _ => 3u8.hash(state),
    }
}

fn children_hash<H: Hasher>(xot: &Xot, node: xot::Node, state: &mut H) {
    let mut count = 0usize;
    for child in compared_children(xot, node) {
        value_hash(xot, child, state);
        count += 1;
    }
    count.hash(state);
}

pub fn sequence_hash<H: Hasher>(xot: &Xot, sequence: &Sequence, state: &mut H) {
    sequence.len().hash(state);
    for node in sequence.iter() {
        value_hash(xot, node, state);
    }
}
