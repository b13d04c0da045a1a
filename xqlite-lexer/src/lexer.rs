use std::borrow::Cow;

use logos::{FilterResult, Lexer, Logos};

pub type Span = std::ops::Range<usize>;

#[derive(Logos, Clone, Debug, PartialEq)]
#[logos(skip r"[\u{20}\u{9}\u{d}\u{a}]+")]
#[logos(subpattern name_start_char = r"[A-Za-z_\u{c0}-\u{d6}\u{d8}-\u{f6}\u{f8}-\u{2ff}\u{370}-\u{37d}\u{37f}-\u{1fff}\u{200c}-\u{200d}\u{2070}-\u{218f}\u{2c00}-\u{2fef}\u{3001}-\u{d7ff}\u{f900}-\u{fdfc}\u{fdf0}-\u{fffd}\u{10000}-\u{effff}]")]
#[logos(subpattern name_char = r"(?&name_start_char)|[\-\.0-9\u{b7}\u{300}-\u{36F}\u{203f}-\u{2040}]")]
#[logos(subpattern ncname = r"(?&name_start_char)(?&name_char)*")]
pub enum Token<'a> {
    // produced by `lexer` for input logos cannot match
    Error,

    #[regex(r#""(?:""|[^"])*"|'(?:''|[^'])*'"#, string_literal, priority = 1)]
    StringLiteral(Cow<'a, str>),

    #[regex(r"(?&ncname)", priority = 2)]
    NCName(&'a str),

    #[token("$")]
    Dollar,
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token(",")]
    Comma,
    #[token("*")]
    Asterisk,
    #[token(".")]
    Dot,
    #[token("..")]
    DotDot,
    #[token("/")]
    Slash,
    #[token("//")]
    DoubleSlash,
    #[token("=")]
    Equal,
    #[token("==")]
    DoubleEqual,
    #[token(":=")]
    ColonEqual,
    #[token("<")]
    LessThan,
    #[token("</")]
    LessThanSlash,
    #[token(">")]
    GreaterThan,
    #[token("/>")]
    SlashGreaterThan,

    #[token("and")]
    And,
    #[token("doc")]
    Doc,
    #[token("empty")]
    Empty,
    #[token("eq")]
    Eq,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("is")]
    Is,
    #[token("let")]
    Let,
    #[token("node")]
    Node,
    #[token("not")]
    Not,
    #[token("or")]
    Or,
    #[token("return")]
    Return,
    #[token("satisfies")]
    Satisfies,
    #[token("some")]
    Some,
    #[token("text")]
    Text,
    #[token("where")]
    Where,

    // comments nest; the callback skips the whole comment
    #[token("(:", comment)]
    Comment,
}

impl<'a> Token<'a> {
    /// The name this token spells, if it can be used as an element name.
    ///
    /// Keywords are reserved only in the positions where the grammar expects
    /// them, so `return` or `text` are still valid element names in a step.
    pub fn ncname(&self) -> Option<&'a str> {
        match self {
            Token::NCName(s) => Some(s),
            Token::And => Some("and"),
            Token::Doc => Some("doc"),
            Token::Empty => Some("empty"),
            Token::Eq => Some("eq"),
            Token::For => Some("for"),
            Token::In => Some("in"),
            Token::Is => Some("is"),
            Token::Let => Some("let"),
            Token::Node => Some("node"),
            Token::Not => Some("not"),
            Token::Or => Some("or"),
            Token::Return => Some("return"),
            Token::Satisfies => Some("satisfies"),
            Token::Some => Some("some"),
            Token::Text => Some("text"),
            Token::Where => Some("where"),
            _ => None,
        }
    }
}

/// Tokenize a query, turning anything unrecognized into [`Token::Error`].
pub fn lexer(input: &str) -> impl Iterator<Item = (Token<'_>, Span)> {
    Token::lexer(input)
        .spanned()
        .map(|(token, span)| match token {
            Ok(token) => (token, span),
            Err(()) => (Token::Error, span),
        })
}

fn string_literal<'a>(lex: &mut Lexer<'a, Token<'a>>) -> Cow<'a, str> {
    let slice = lex.slice();
    let s = &slice[1..slice.len() - 1];
    if slice.starts_with('\"') {
        if s.contains("\"\"") {
            Cow::Owned(s.replace("\"\"", "\""))
        } else {
            Cow::Borrowed(s)
        }
    } else if s.contains("''") {
        Cow::Owned(s.replace("''", "'"))
    } else {
        Cow::Borrowed(s)
    }
}

fn comment<'a>(lex: &mut Lexer<'a, Token<'a>>) -> FilterResult<(), ()> {
    let rest = lex.remainder().as_bytes();
    let mut depth = 1usize;
    let mut i = 0;
    while i + 1 < rest.len() {
        match (rest[i], rest[i + 1]) {
            (b'(', b':') => {
                depth += 1;
                i += 2;
            }
            (b':', b')') => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    lex.bump(i);
                    return FilterResult::Skip;
                }
            }
            _ => i += 1,
        }
    }
    // unterminated; swallow the rest so the error span covers it
    lex.bump(rest.len());
    FilterResult::Error(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_prefix_is_name() {
        let tokens: Vec<_> = lexer("format").map(|(t, _)| t).collect();
        assert_eq!(tokens, vec![Token::NCName("format")]);
    }

    #[test]
    fn test_keyword_as_name() {
        assert_eq!(Token::Return.ncname(), Some("return"));
        assert_eq!(Token::Comma.ncname(), None);
    }

    #[test]
    fn test_escaped_quotes() {
        let tokens: Vec<_> = lexer(r#""a""b" 'c''d'"#).map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                Token::StringLiteral(Cow::Borrowed("a\"b")),
                Token::StringLiteral(Cow::Borrowed("c'd")),
            ]
        );
    }
}
