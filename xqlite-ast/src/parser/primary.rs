use chumsky::{input::ValueInput, prelude::*};
use xqlite_lexer::Token;

use crate::error::ParserError;
use crate::node::{Glob, NodeKind};

use super::types::{BoxedParser, Span};
use super::Syntax;

pub(crate) struct ParserPrimaryOutput<'a, I>
where
    I: ValueInput<'a, Token = Token<'a>, Span = Span>,
{
    pub(crate) ncname: BoxedParser<'a, I, &'a str>,
    pub(crate) string: BoxedParser<'a, I, Syntax>,
    pub(crate) variable: BoxedParser<'a, I, Syntax>,
    pub(crate) glob: BoxedParser<'a, I, Syntax>,
    pub(crate) document: BoxedParser<'a, I, Syntax>,
    pub(crate) text: BoxedParser<'a, I, Syntax>,
    pub(crate) node: BoxedParser<'a, I, Syntax>,
}

/// Names and the primaries that do not contain expressions.
pub(crate) fn parser_primary<'a, I>() -> ParserPrimaryOutput<'a, I>
where
    I: ValueInput<'a, Token = Token<'a>, Span = Span>,
{
    // keywords double as element names
    let ncname = any()
        .try_map(|token: Token<'a>, span: Span| match token.ncname() {
            Some(name) => Ok(name),
            None => Err(ParserError {
                span,
                expected: Vec::new(),
                found: Some(token),
            }),
        })
        .boxed();

    let string_literal = select! {
        Token::StringLiteral(s) => s,
    }
    .boxed();

    let string = string_literal
        .clone()
        .map(|s| Syntax::leaf(NodeKind::ConstantString(s.to_string())))
        .boxed();

    let variable = just(Token::Dollar)
        .ignore_then(ncname.clone())
        .map(|name| Syntax::leaf(NodeKind::Variable(name.to_string())))
        .boxed();

    let glob = choice::<_>([
        just(Token::Asterisk).to(Glob::Wildcard),
        just(Token::Dot).to(Glob::Self_),
        just(Token::DotDot).to(Glob::Parent),
    ])
    .map(|glob| Syntax::leaf(NodeKind::PathGlobbing(glob)))
    .boxed();

    let document = just(Token::Doc)
        .ignore_then(
            string_literal
                .or_not()
                .delimited_by(just(Token::LeftParen), just(Token::RightParen)),
        )
        .map(|name| Syntax::leaf(NodeKind::Document(name.map(|name| name.to_string()))))
        .boxed();

    let empty_call = just(Token::LeftParen)
        .ignore_then(just(Token::RightParen))
        .boxed();

    let text = just(Token::Text)
        .ignore_then(empty_call.clone())
        .to(Syntax::leaf(NodeKind::Text))
        .boxed();

    let node = just(Token::Node)
        .ignore_then(empty_call)
        .to(Syntax::leaf(NodeKind::PathGlobbing(Glob::Node)))
        .boxed();

    ParserPrimaryOutput {
        ncname,
        string,
        variable,
        glob,
        document,
        text,
        node,
    }
}
