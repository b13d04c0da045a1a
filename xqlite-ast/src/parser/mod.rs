mod parser_core;
mod primary;
mod types;

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use xqlite_lexer::{lexer, Token};

use crate::arena::Ast;
use crate::error::{Error, Result};
use crate::node::{NodeId, NodeKind};

use self::parser_core::parser;
use self::types::{BoxedParser, Span};

/// A parsed expression before it moves into an arena.
#[derive(Debug, Clone)]
pub(crate) struct Syntax {
    kind: NodeKind,
    children: Vec<Syntax>,
    // name and span of an element's closing tag
    closing: Option<(String, Span)>,
}

impl Syntax {
    pub(crate) fn leaf(kind: NodeKind) -> Self {
        Self::new(kind, Vec::new())
    }

    pub(crate) fn new(kind: NodeKind, children: Vec<Syntax>) -> Self {
        Self {
            kind,
            children,
            closing: None,
        }
    }

    /// `<name>content*</closing>`, the content folded into one
    /// left-nested concatenation.
    pub(crate) fn element(name: &str, content: Vec<Syntax>, closing: &str, span: Span) -> Self {
        let content = content
            .into_iter()
            .reduce(|left, item| Syntax::new(NodeKind::Concatenation, vec![left, item]));
        Self {
            kind: NodeKind::Tag(name.to_string()),
            children: content.into_iter().collect(),
            closing: Some((closing.to_string(), span)),
        }
    }

    fn build(self, ast: &mut Ast) -> Result<NodeId> {
        if let (NodeKind::Tag(name), Some((closing, span))) = (&self.kind, &self.closing) {
            if name != closing {
                return Err(Error::parse(
                    format!("closing tag `{}` does not match `{}`", closing, name),
                    span.start..span.end,
                ));
            }
        }
        let children = self
            .children
            .into_iter()
            .map(|child| child.build(ast))
            .collect::<Result<Vec<_>>>()?;
        ast.add(self.kind, children)
    }
}

fn tokens(src: &str) -> impl ValueInput<'_, Token = Token<'_>, Span = Span> {
    Stream::from_iter(lexer(src).map(|(token, span)| (token, span.into())))
        .spanned((src.len()..src.len()).into())
}

fn parse_syntax<'a, I>(parser: BoxedParser<'a, I, Syntax>, input: I) -> Result<Syntax>
where
    I: ValueInput<'a, Token = Token<'a>, Span = Span>,
{
    parser.parse(input).into_result().map_err(|errors| {
        errors
            .into_iter()
            .next()
            .map(Error::from)
            .unwrap_or_else(|| Error::parse("invalid query", 0..0))
    })
}

/// Parse a query into a fresh arena whose root is the whole expression.
pub fn parse(input: &str) -> Result<Ast> {
    let syntax = parse_syntax(parser(), tokens(input))?;
    let mut ast = Ast::new();
    let root = syntax.build(&mut ast)?;
    ast.set_root(root)?;
    Ok(ast)
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use rstest::rstest;

    use xqlite_lexer::Span;

    use super::*;

    #[test]
    fn test_path() {
        let ast = parse(r#"doc("j.xml")//a/b[c]"#).unwrap();
        assert_snapshot!(ast.to_string(), @r###"
        PathSeparator [/]
          PathSeparator [//]
            Document [j.xml]
            TagName [a]
          Filter
            TagName [b]
            TagName [c]
        "###);
    }

    #[test]
    fn test_flwr() {
        let ast = parse(
            "for $x in doc()/root/a, $y in $x/b let $z := $y where $x/k = $y/k return <m>{$z, $x/k}</m>",
        )
        .unwrap();
        assert_snapshot!(ast.to_string(), @r###"
        FLWRExpression
          ForClause
            VariableDef [$x]
              PathSeparator [/]
                PathSeparator [/]
                  Document
                  TagName [root]
                TagName [a]
            VariableDef [$y]
              PathSeparator [/]
                Variable [$x]
                TagName [b]
          LetClause
            VariableDef [$z]
              Variable [$y]
          WhereClause
            Equality [=]
              PathSeparator [/]
                Variable [$x]
                TagName [k]
              PathSeparator [/]
                Variable [$y]
                TagName [k]
          ReturnClause
            Tag [m]
              Concatenation
                Variable [$z]
                PathSeparator [/]
                  Variable [$x]
                  TagName [k]
        "###);
    }

    #[test]
    fn test_some_and_logic() {
        let ast = parse("some $x in a satisfies not empty($x/b) or $x is .").unwrap();
        assert_snapshot!(ast.to_string(), @r###"
        SomeExpression
          SomeClause
            VariableDef [$x]
              TagName [a]
          LogicOperator [or]
            LogicOperator [not]
              Empty
                PathSeparator [/]
                  Variable [$x]
                  TagName [b]
            Equality [==]
              Variable [$x]
              PathGlobbing [.]
        "###);
    }

    #[test]
    fn test_let_expression() {
        let ast = parse(r#"let $a := "hi" return <x><y/>{$a}</x>"#).unwrap();
        assert_snapshot!(ast.to_string(), @r###"
        LetExpression
          LetClause
            VariableDef [$a]
              ConstantString ["hi"]
          Tag [x]
            Concatenation
              Tag [y]
              Variable [$a]
        "###);
    }

    #[test]
    fn test_keywords_as_names() {
        let ast = parse("return/text/text()").unwrap();
        assert_snapshot!(ast.to_string(), @r###"
        PathSeparator [/]
          PathSeparator [/]
            TagName [return]
            TagName [text]
          Text
        "###);
    }

    #[test]
    fn test_concatenation_outside_for() {
        // the comma after the last range belongs to the outer sequence
        let ast = parse("(for $x in a return $x), b").unwrap();
        let root = ast.root().unwrap();
        assert_eq!(ast.kind(root), &NodeKind::Concatenation);
    }

    #[test]
    fn test_not_as_name() {
        let ast = parse("not/a").unwrap();
        assert_snapshot!(ast.to_string(), @r###"
        PathSeparator [/]
          TagName [not]
          TagName [a]
        "###);
    }

    #[test]
    fn test_mismatched_tag_message() {
        let err = parse("<a>{b}</c>").unwrap_err();
        assert_eq!(
            err.to_string(),
            "parse error: closing tag `c` does not match `a`"
        );
    }

    #[rstest]
    #[case("for $x in a", 11..11)]
    #[case("<a>{b}</c>", 8..9)]
    #[case("a ; b", 2..3)]
    #[case("doc(1)", 4..5)]
    #[case("(a", 2..2)]
    fn test_parse_error_span(#[case] input: &str, #[case] span: Span) {
        let err = parse(input).unwrap_err();
        assert_eq!(err.span(), Some(span));
    }
}
