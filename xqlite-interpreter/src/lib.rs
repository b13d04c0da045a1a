//! Evaluation of xqlite queries over `xot` documents.
//!
//! ```
//! use xqlite_interpreter::{Documents, EvalOptions, Query};
//!
//! let mut xot = xot::Xot::new();
//! let mut documents = Documents::default();
//! let root = xot.parse("<root><a>x</a><a>y</a></root>").unwrap();
//! documents.set_context(root);
//! let query = Query::parse("for $a in doc()/root/a return $a/text()").unwrap();
//! let out = query.run(&mut xot, &mut documents, &EvalOptions::default()).unwrap();
//! assert_eq!(out, "<result>xy</result>");
//! ```
mod cartesian;
mod collector;
mod compare;
mod context;
mod document;
mod document_order;
mod error;
mod interpret;
mod join;
mod query;
mod result;
mod sequence;

pub use cartesian::CartesianIterator;
pub use collector::Collector;
pub use compare::{sequences_value_equal, value_equal};
pub use context::ContextStack;
pub use document::Documents;
pub use error::{Error, Result};
pub use interpret::Interpreter;
pub use query::{serialize, EvalOptions, Query};
pub use result::EvalResult;
pub use sequence::Sequence;
