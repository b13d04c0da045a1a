use std::fmt::{self, Write};

use crate::arena::Ast;
use crate::node::NodeId;

impl Ast {
    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, depth: usize) -> fmt::Result {
        writeln!(f, "{:indent$}{}", "", self.kind(id), indent = depth * 2)?;
        for &child in self.children(id) {
            self.fmt_node(f, child, depth + 1)?;
        }
        Ok(())
    }

    /// Render the tree reachable from the root as a Graphviz digraph.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph ast {\n  node [shape=box];\n");
        if let Some(root) = self.root() {
            for id in self.preorder(root) {
                // writing to a String cannot fail
                let _ = writeln!(
                    out,
                    "  n{} [label=\"{}\"];",
                    id.index(),
                    escape_dot(&self.label(id))
                );
                for child in self.children(id) {
                    let _ = writeln!(out, "  n{} -> n{};", id.index(), child.index());
                }
            }
        }
        out.push_str("}\n");
        out
    }
}

impl fmt::Display for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root() {
            Some(root) => self.fmt_node(f, root, 0),
            None => Ok(()),
        }
    }
}

fn escape_dot(label: &str) -> String {
    let mut escaped = String::with_capacity(label.len());
    for c in label.chars() {
        match c {
            '"' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}
