use ahash::{HashMap, HashMapExt};
use xot::Xot;

use crate::error::Result;
use crate::sequence::Sequence;

/// Owner of the nodes a query synthesizes.
///
/// New elements and texts live in the caller's `Xot` arena as standalone
/// trees, never inside an input document. Imported nodes are deep copies,
/// so navigating from a synthesized element never reaches an input
/// document.
///
/// The collector also remembers what each constructed element was built
/// from. Join tuples use this to hand back the original nodes of a member
/// rather than its copies.
#[derive(Debug, Default)]
pub struct Collector {
    nodes: Vec<xot::Node>,
    // constructed element -> the evaluated content it was built from
    contents: HashMap<xot::Node, Sequence>,
    // copy of a constructed element -> that element
    copies: HashMap<xot::Node, xot::Node>,
    // join tuple member -> the original nodes it stands for
    members: HashMap<xot::Node, Sequence>,
}

impl Collector {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            contents: HashMap::new(),
            copies: HashMap::new(),
            members: HashMap::new(),
        }
    }

    pub fn element(&mut self, xot: &mut Xot, name: &str) -> xot::Node {
        let name = xot.add_name(name);
        let node = xot.new_element(name);
        self.nodes.push(node);
        node
    }

    pub fn text(&mut self, xot: &mut Xot, text: &str) -> xot::Node {
        let node = xot.new_text(text);
        self.nodes.push(node);
        node
    }

    /// Record the sequence a constructed element was built from.
    pub fn set_content(&mut self, element: xot::Node, content: Sequence) {
        self.contents.insert(element, content);
    }

    /// The nodes a constructed element (or a copy of one) was built from.
    pub fn content(&self, element: xot::Node) -> Option<&Sequence> {
        let source = self.copies.get(&element).copied().unwrap_or(element);
        self.contents.get(&source)
    }

    /// Mark `member` as a join tuple member standing for `originals`.
    pub fn set_member(&mut self, member: xot::Node, originals: Sequence) {
        self.members.insert(member, originals);
    }

    /// The original nodes behind a join tuple member.
    pub fn member(&self, member: xot::Node) -> Option<&Sequence> {
        self.members.get(&member)
    }

    /// Append a copy of `node` to `parent` and return the copies made. A
    /// document node contributes copies of its children instead.
    pub fn import(
        &mut self,
        xot: &mut Xot,
        parent: xot::Node,
        node: xot::Node,
    ) -> Result<Vec<xot::Node>> {
        let sources = if xot.is_document(node) {
            xot.children(node).collect::<Vec<_>>()
        } else {
            vec![node]
        };
        let mut copies = Vec::with_capacity(sources.len());
        for source in sources {
            let copy = xot.clone_node(source);
            xot.append(parent, copy)?;
            let source = self.copies.get(&source).copied().unwrap_or(source);
            if self.contents.contains_key(&source) {
                self.copies.insert(copy, source);
            }
            copies.push(copy);
        }
        Ok(copies)
    }

    /// How many trees were synthesized.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
