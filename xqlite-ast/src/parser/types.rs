use chumsky::{extra::Full, prelude::*};

use crate::error::ParserError;

pub(crate) type Span = SimpleSpan;

type Extra<'a> = Full<ParserError<'a>, (), ()>;

pub(crate) type BoxedParser<'a, I, T> = Boxed<'a, 'a, I, T, Extra<'a>>;
