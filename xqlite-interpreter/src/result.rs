use strum_macros::IntoStaticStr;

use crate::cartesian::CartesianIterator;
use crate::error::{Error, Result};
use crate::sequence::Sequence;

/// The value one node's evaluation hands to its parent.
#[derive(Debug, IntoStaticStr)]
pub enum EvalResult {
    #[strum(serialize = "a node sequence")]
    Sequence(Sequence),
    #[strum(serialize = "a boolean")]
    Boolean(bool),
    /// A positioned iterator over a `for` or `some` clause; its current
    /// tuple is bound on the context stack.
    #[strum(serialize = "a context iterator")]
    Iterator(CartesianIterator),
    /// The result of evaluating a binding for its side effect.
    #[strum(serialize = "no value")]
    None,
}

impl EvalResult {
    fn kind_name(&self) -> &'static str {
        self.into()
    }

    fn mismatch(&self, node: &str, expected: &'static str) -> Error {
        Error::TypeMismatch {
            node: node.to_string(),
            expected,
            found: self.kind_name(),
        }
    }

    pub fn into_sequence(self, node: &str) -> Result<Sequence> {
        match self {
            EvalResult::Sequence(sequence) => Ok(sequence),
            other => Err(other.mismatch(node, "a node sequence")),
        }
    }

    pub fn into_iterator(self, node: &str) -> Result<CartesianIterator> {
        match self {
            EvalResult::Iterator(iterator) => Ok(iterator),
            other => Err(other.mismatch(node, "a context iterator")),
        }
    }

    /// Booleans are themselves; a sequence is true when it is not empty.
    pub fn truth(&self, node: &str) -> Result<bool> {
        match self {
            EvalResult::Boolean(b) => Ok(*b),
            EvalResult::Sequence(sequence) => Ok(!sequence.is_empty()),
            other => Err(other.mismatch(node, "a boolean or node sequence")),
        }
    }
}

impl From<Sequence> for EvalResult {
    fn from(sequence: Sequence) -> Self {
        EvalResult::Sequence(sequence)
    }
}

impl From<bool> for EvalResult {
    fn from(b: bool) -> Self {
        EvalResult::Boolean(b)
    }
}
