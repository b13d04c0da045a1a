use std::iter::once;

use chumsky::{input::ValueInput, prelude::*};
use xqlite_lexer::Token;

use crate::node::{EqualityKind, LogicOp, NodeKind, Separator};

use super::primary::{parser_primary, ParserPrimaryOutput};
use super::types::{BoxedParser, Span};
use super::Syntax;

/// The whole query: a comma sequence followed by end of input.
pub(crate) fn parser<'a, I>() -> BoxedParser<'a, I, Syntax>
where
    I: ValueInput<'a, Token = Token<'a>, Span = Span>,
{
    let ParserPrimaryOutput {
        ncname,
        string,
        variable,
        glob,
        document,
        text,
        node,
    } = parser_primary();

    let expr_single = recursive(|expr_single| {
        let expr_single: BoxedParser<'a, I, Syntax> = expr_single.boxed();
        let expr = concatenation(expr_single.clone());

        let parenthesized = expr
            .clone()
            .delimited_by(just(Token::LeftParen), just(Token::RightParen))
            .map(|inner| Syntax::new(NodeKind::Precedence, vec![inner]))
            .boxed();

        let empty = just(Token::Empty)
            .ignore_then(
                expr.clone()
                    .delimited_by(just(Token::LeftParen), just(Token::RightParen)),
            )
            .map(|inner| Syntax::new(NodeKind::Empty, vec![inner]))
            .boxed();

        let direct_element = direct_element(ncname.clone(), expr.clone());

        let primary = variable
            .clone()
            .or(string.clone())
            .or(parenthesized)
            .or(direct_element)
            .or(glob.clone())
            .or(document.clone())
            .or(empty)
            .or(text.clone())
            .or(node.clone())
            .or(ncname
                .clone()
                .map(|name| Syntax::leaf(NodeKind::TagName(name.to_string()))))
            .boxed();

        let predicate = expr
            .clone()
            .delimited_by(just(Token::LeftBracket), just(Token::RightBracket));
        let step_expr = primary
            .foldl(predicate.repeated(), |subject, predicate| {
                Syntax::new(NodeKind::Filter, vec![subject, predicate])
            })
            .boxed();

        let separator = choice::<_>([
            just(Token::Slash).to(Separator::Child),
            just(Token::DoubleSlash).to(Separator::DescendantOrSelf),
        ]);
        let path_expr = step_expr
            .clone()
            .foldl(
                separator.then(step_expr).repeated(),
                |left, (separator, right)| {
                    Syntax::new(NodeKind::PathSeparator(separator), vec![left, right])
                },
            )
            .boxed();

        let equality = choice::<_>([
            just(Token::Equal).to(EqualityKind::Value),
            just(Token::Eq).to(EqualityKind::Value),
            just(Token::DoubleEqual).to(EqualityKind::Reference),
            just(Token::Is).to(EqualityKind::Reference),
        ]);
        let comparison = path_expr
            .clone()
            .then(equality.then(path_expr).or_not())
            .map(|(left, right)| match right {
                Some((kind, right)) => Syntax::new(NodeKind::Equality(kind), vec![left, right]),
                None => left,
            })
            .boxed();

        // `not` falls back to a name when no operand follows it
        let not_expr = recursive(|not_expr| {
            just(Token::Not)
                .ignore_then(not_expr)
                .map(|operand| {
                    Syntax::new(NodeKind::LogicOperator(LogicOp::Not), vec![operand])
                })
                .or(comparison.clone())
        })
        .boxed();

        let and_expr = logic(not_expr, Token::And, LogicOp::And);
        let or_expr = logic(and_expr, Token::Or, LogicOp::Or);

        let in_bindings = bindings(ncname.clone(), expr_single.clone(), Token::In);
        let let_clause = just(Token::Let)
            .ignore_then(bindings(
                ncname.clone(),
                expr_single.clone(),
                Token::ColonEqual,
            ))
            .map(|defs| Syntax::new(NodeKind::LetClause, defs))
            .boxed();

        let for_clause = just(Token::For)
            .ignore_then(in_bindings.clone())
            .map(|defs| Syntax::new(NodeKind::ForClause, defs));
        let where_clause = just(Token::Where)
            .ignore_then(expr_single.clone())
            .map(|condition| Syntax::new(NodeKind::WhereClause, vec![condition]));
        let return_clause = just(Token::Return)
            .ignore_then(expr_single.clone())
            .map(|body| Syntax::new(NodeKind::ReturnClause, vec![body]));
        let flwr = for_clause
            .then(let_clause.clone().or_not())
            .then(where_clause.or_not())
            .then(return_clause)
            .map(|(((for_clause, let_clause), where_clause), return_clause)| {
                let clauses = once(for_clause)
                    .chain(let_clause)
                    .chain(where_clause)
                    .chain(once(return_clause))
                    .collect();
                Syntax::new(NodeKind::FlwrExpression, clauses)
            })
            .boxed();

        let let_expr = let_clause
            .then_ignore(just(Token::Return).or_not())
            .then(expr_single.clone())
            .map(|(clause, body)| Syntax::new(NodeKind::LetExpression, vec![clause, body]))
            .boxed();

        let some_expr = just(Token::Some)
            .ignore_then(in_bindings)
            .map(|defs| Syntax::new(NodeKind::SomeClause, defs))
            .then_ignore(just(Token::Satisfies))
            .then(expr_single)
            .map(|(clause, condition)| {
                Syntax::new(NodeKind::SomeExpression, vec![clause, condition])
            })
            .boxed();

        flwr.or(let_expr).or(some_expr).or(or_expr).boxed()
    })
    .boxed();

    concatenation(expr_single).then_ignore(end()).boxed()
}

fn concatenation<'a, I>(expr_single: BoxedParser<'a, I, Syntax>) -> BoxedParser<'a, I, Syntax>
where
    I: ValueInput<'a, Token = Token<'a>, Span = Span>,
{
    expr_single
        .clone()
        .foldl(
            just(Token::Comma).ignore_then(expr_single).repeated(),
            |left, right| Syntax::new(NodeKind::Concatenation, vec![left, right]),
        )
        .boxed()
}

fn logic<'a, I>(
    operand: BoxedParser<'a, I, Syntax>,
    token: Token<'a>,
    op: LogicOp,
) -> BoxedParser<'a, I, Syntax>
where
    I: ValueInput<'a, Token = Token<'a>, Span = Span>,
{
    operand
        .clone()
        .foldl(
            just(token).ignore_then(operand).repeated(),
            move |left, right| Syntax::new(NodeKind::LogicOperator(op), vec![left, right]),
        )
        .boxed()
}

/// `$name <binder> ExprSingle`, one or more, comma separated.
fn bindings<'a, I>(
    ncname: BoxedParser<'a, I, &'a str>,
    expr_single: BoxedParser<'a, I, Syntax>,
    binder: Token<'a>,
) -> BoxedParser<'a, I, Vec<Syntax>>
where
    I: ValueInput<'a, Token = Token<'a>, Span = Span>,
{
    just(Token::Dollar)
        .ignore_then(ncname)
        .then_ignore(just(binder))
        .then(expr_single)
        .map(|(name, value)| Syntax::new(NodeKind::VariableDef(name.to_string()), vec![value]))
        .separated_by(just(Token::Comma))
        .at_least(1)
        .collect::<Vec<_>>()
        .boxed()
}

fn direct_element<'a, I>(
    ncname: BoxedParser<'a, I, &'a str>,
    expr: BoxedParser<'a, I, Syntax>,
) -> BoxedParser<'a, I, Syntax>
where
    I: ValueInput<'a, Token = Token<'a>, Span = Span>,
{
    recursive(|direct_element| {
        let enclosed = expr
            .clone()
            .delimited_by(just(Token::LeftBrace), just(Token::RightBrace));
        let content = enclosed.or(direct_element).repeated().collect::<Vec<_>>();

        let open = just(Token::LessThan).ignore_then(ncname.clone());
        let empty_element = open
            .clone()
            .then_ignore(just(Token::SlashGreaterThan))
            .map(|name| Syntax::leaf(NodeKind::Tag(name.to_string())));
        let element = open
            .then_ignore(just(Token::GreaterThan))
            .then(content)
            .then_ignore(just(Token::LessThanSlash))
            .then(ncname.clone().map_with(|name, extra| (name, extra.span())))
            .then_ignore(just(Token::GreaterThan))
            .map(|((name, content), (closing, span))| {
                Syntax::element(name, content, closing, span)
            });

        empty_element.or(element).boxed()
    })
    .boxed()
}
