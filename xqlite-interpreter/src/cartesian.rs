use tracing::trace;
use xqlite_ast::{NodeId, NodeKind};

use crate::error::{Error, Result};
use crate::interpret::Interpreter;
use crate::sequence::Sequence;

#[derive(Debug, Clone)]
struct Range {
    name: String,
    expr: NodeId,
    items: Sequence,
    cursor: usize,
}

/// Odometer over the ranges of a `for` or `some` clause.
///
/// While positioned, the current item of every range is bound on the
/// context stack as a singleton, in declaration order. Advancing bumps the
/// last range first; when a range runs out, the one before it advances and
/// every later range is evaluated again under the new bindings, since it
/// may depend on them. A range that evaluates to nothing skips ahead the
/// same way.
///
/// A finished iterator has popped all of its bindings. Stopping early
/// leaves them bound; the caller's scope owns them.
#[derive(Debug, Clone)]
pub struct CartesianIterator {
    ranges: Vec<Range>,
    finished: bool,
}

impl CartesianIterator {
    /// Evaluate the clause's ranges and bind the first tuple.
    pub(crate) fn begin(
        interpreter: &mut Interpreter<'_>,
        clause: NodeId,
        input: &Sequence,
    ) -> Result<Self> {
        let ast = interpreter.ast();
        let ranges = ast
            .children(clause)
            .iter()
            .map(|&def| match (ast.kind(def), ast.children(def)) {
                (NodeKind::VariableDef(name), &[expr]) => Ok(Range {
                    name: name.clone(),
                    expr,
                    items: Sequence::new(),
                    cursor: 0,
                }),
                (kind, _) => Err(Error::TypeMismatch {
                    node: ast.label(clause),
                    expected: "variable definitions",
                    found: kind.name(),
                }),
            })
            .collect::<Result<Vec<_>>>()?;
        let mut iterator = Self {
            ranges,
            finished: false,
        };
        iterator.settle(interpreter, input, 0, false)?;
        Ok(iterator)
    }

    /// The terminal state every exhausted iterator compares equal to.
    pub fn end() -> Self {
        Self {
            ranges: Vec::new(),
            finished: true,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Move to the next tuple.
    pub(crate) fn advance(
        &mut self,
        interpreter: &mut Interpreter<'_>,
        input: &Sequence,
    ) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        let bound = self.ranges.len();
        self.settle(interpreter, input, bound, true)
    }

    /// The current tuple, one node per range.
    pub fn current(&self) -> Vec<(&str, xot::Node)> {
        if self.finished {
            return Vec::new();
        }
        self.ranges
            .iter()
            .filter_map(|range| {
                range
                    .items
                    .get(range.cursor)
                    .map(|node| (range.name.as_str(), node))
            })
            .collect()
    }

    // `bound` ranges are bound on entry. With `carry`, the last bound range
    // advances first; then the rest are evaluated and bound in order.
    fn settle(
        &mut self,
        interpreter: &mut Interpreter<'_>,
        input: &Sequence,
        mut bound: usize,
        mut carry: bool,
    ) -> Result<()> {
        loop {
            if carry {
                loop {
                    if bound == 0 {
                        trace!("iterator exhausted");
                        self.finished = true;
                        return Ok(());
                    }
                    bound -= 1;
                    interpreter.context_mut().pop_var();
                    let range = &mut self.ranges[bound];
                    range.cursor += 1;
                    if let Some(node) = range.items.get(range.cursor) {
                        trace!(name = %range.name, cursor = range.cursor, "advance");
                        interpreter
                            .context_mut()
                            .push_var(range.name.clone(), node.into());
                        bound += 1;
                        break;
                    }
                }
                carry = false;
            }
            while bound < self.ranges.len() {
                let expr = self.ranges[bound].expr;
                let label = interpreter.ast().label(expr);
                let items = interpreter.eval(expr, input)?.into_sequence(&label)?;
                let range = &mut self.ranges[bound];
                range.items = items;
                range.cursor = 0;
                match range.items.first() {
                    Some(node) => {
                        interpreter
                            .context_mut()
                            .push_var(range.name.clone(), node.into());
                        bound += 1;
                    }
                    None => {
                        trace!(name = %range.name, "empty range");
                        carry = true;
                        break;
                    }
                }
            }
            if !carry {
                return Ok(());
            }
        }
    }
}

impl PartialEq for CartesianIterator {
    fn eq(&self, other: &Self) -> bool {
        self.finished && other.finished
    }
}
