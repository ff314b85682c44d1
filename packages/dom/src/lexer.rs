//! Lexer for template markup using logos
//!
//! Markup is not context free at the token level: `a=b` is text between tags
//! but an attribute inside one. The lexer therefore has two modes. Content
//! mode ([`ContentToken`]) runs between tags; as soon as a tag opens the parser
//! morphs into tag mode ([`TagToken`]) until the closing `>` or `/>`.

use logos::Logos;

/// Tokens between tags
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
pub enum ContentToken<'src> {
    #[regex(r"<!--([^-]|-[^-])*-->", |lex| {
        let s = lex.slice();
        &s[4..s.len() - 3]
    })]
    Comment(&'src str),

    #[regex(r"<[a-zA-Z][a-zA-Z0-9\-]*", |lex| &lex.slice()[1..])]
    TagOpen(&'src str),

    #[regex(r"</[a-zA-Z][a-zA-Z0-9\-]*[ \t\r\n]*>", |lex| close_tag_name(lex.slice()))]
    TagClose(&'src str),

    #[regex(r"[^<]+", |lex| lex.slice())]
    Text(&'src str),
}

/// Tokens inside an opening tag
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum TagToken<'src> {
    #[token(">")]
    End,

    #[token("/>")]
    SelfClose,

    #[token("=")]
    Equals,

    #[regex(r#""[^"]*""#, |lex| strip_quotes(lex.slice()))]
    #[regex(r"'[^']*'", |lex| strip_quotes(lex.slice()))]
    Quoted(&'src str),

    // attribute names and unquoted values: `:for`, `~click`, `data-id`, `42`
    #[regex(r#"[^ \t\r\n"'<>/=]+"#, |lex| lex.slice())]
    Name(&'src str),
}

fn close_tag_name(slice: &str) -> &str {
    slice[2..]
        .trim_end_matches('>')
        .trim_end_matches([' ', '\t', '\r', '\n'])
}

fn strip_quotes(slice: &str) -> &str {
    &slice[1..slice.len() - 1]
}
