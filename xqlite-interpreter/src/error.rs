/// Evaluation errors.
///
/// Every error aborts the whole query; there is no partial result.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A variable reference with no binding in any enclosing scope.
    #[error("undefined variable ${0}")]
    UndefinedVariable(String),
    /// A node received a value of a kind it cannot work with.
    #[error("{node} expects {expected}, found {found}")]
    TypeMismatch {
        node: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("cannot load document `{name}`: {reason}")]
    DocumentLoadFailure { name: String, reason: String },
    #[error(transparent)]
    Xot(#[from] xot::Error),
    #[error(transparent)]
    Ast(#[from] xqlite_ast::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
