mod arena;
mod display;
mod error;
mod node;
mod parser;
mod rewrite;

pub use arena::Ast;
pub use error::{Error, Result};
pub use node::{Arity, EqualityKind, Glob, JoinVars, LogicOp, Node, NodeId, NodeKind, Separator};
pub use parser::parse;
pub use rewrite::{free_variables, rewrite, visit_free_variables};
pub use xqlite_lexer::Span;
