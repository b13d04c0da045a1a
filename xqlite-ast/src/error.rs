use chumsky::input::ValueInput;
use chumsky::prelude::SimpleSpan;
use chumsky::util::MaybeRef;
use xqlite_lexer::{Span, Token};

use crate::node::{Arity, NodeId};

/// Errors raised while building or rewriting a query tree.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The query text is not a valid instance of the grammar.
    #[error("parse error: {message}")]
    Parse { message: String, span: Span },
    /// A node was constructed with a child count its kind does not accept.
    #[error("{kind} expects {expected} children, got {found}")]
    Arity {
        kind: String,
        expected: Arity,
        found: usize,
    },
    /// The join rewrite found an implicit join but cannot place the rest of
    /// the `where` predicate on exactly one side of it.
    #[error("cannot decorrelate join: {0}")]
    UnresolvableJoin(String),
    /// A node id that does not belong to this tree.
    #[error("node {0} does not belong to this tree")]
    InvalidNode(NodeId),
    /// A node that already has a parent was attached somewhere else.
    #[error("node {0} is already attached")]
    AlreadyAttached(NodeId),
}

impl Error {
    pub(crate) fn parse(message: impl Into<String>, span: Span) -> Self {
        Error::Parse {
            message: message.into(),
            span,
        }
    }

    /// Source span of a parse error, if this is one.
    pub fn span(&self) -> Option<Span> {
        match self {
            Error::Parse { span, .. } => Some(span.clone()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// The error the grammar combinators report, converted to [`Error::Parse`]
/// once parsing stops.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParserError<'a> {
    pub(crate) span: SimpleSpan,
    pub(crate) expected: Vec<Option<Token<'a>>>,
    pub(crate) found: Option<Token<'a>>,
}

impl<'a, I> chumsky::error::Error<'a, I> for ParserError<'a>
where
    I: ValueInput<'a, Token = Token<'a>, Span = SimpleSpan>,
{
    fn expected_found<E: IntoIterator<Item = Option<MaybeRef<'a, Token<'a>>>>>(
        expected: E,
        found: Option<MaybeRef<'a, Token<'a>>>,
        span: SimpleSpan,
    ) -> Self {
        Self {
            span,
            expected: expected
                .into_iter()
                .map(|e| e.as_deref().cloned())
                .collect(),
            found: found.as_deref().cloned(),
        }
    }

    fn merge(mut self, other: Self) -> Self {
        for entry in other.expected {
            if !self.expected.contains(&entry) {
                self.expected.push(entry);
            }
        }
        self
    }
}

fn describe(token: &Option<Token<'_>>) -> String {
    match token {
        Some(Token::Error) => "unrecognized input".to_string(),
        Some(token) => format!("{:?}", token),
        None => "end of input".to_string(),
    }
}

impl From<ParserError<'_>> for Error {
    fn from(e: ParserError<'_>) -> Self {
        let found = describe(&e.found);
        let message = if e.expected.is_empty() {
            format!("unexpected {}", found)
        } else {
            let expected = e.expected.iter().map(describe).collect::<Vec<_>>();
            format!("expected {}, found {}", expected.join(" or "), found)
        };
        Error::parse(message, e.span.start..e.span.end)
    }
}
