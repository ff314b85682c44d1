//! Markup parser: builds a detached fragment from template markup

use crate::document::{Document, NodeId};
use crate::error::{ParseError, ParseResult};
use crate::lexer::{ContentToken, TagToken};
use logos::{Lexer, Logos};
use tracing::debug;

/// Elements that never have children or a closing tag
pub fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta"
            | "source" | "track" | "wbr"
    )
}

/// Parse markup into a new fragment owned by `doc`
///
/// Whitespace-only text is kept, as a browser would keep it.
pub fn parse_fragment(doc: &mut Document, source: &str) -> ParseResult<NodeId> {
    let fragment = doc.create_fragment();
    let mut open: Vec<(NodeId, String)> = Vec::new();
    let mut lex = ContentToken::lexer(source);

    while let Some(token) = lex.next() {
        let pos = lex.span().start;
        let parent = open.last().map(|(id, _)| *id).unwrap_or(fragment);

        match token {
            Ok(ContentToken::Text(text)) => {
                let node = doc.create_text(decode_entities(text));
                doc.append_child(parent, node)?;
            }
            Ok(ContentToken::Comment(text)) => {
                let node = doc.create_comment(text);
                doc.append_child(parent, node)?;
            }
            Ok(ContentToken::TagOpen(tag)) => {
                let tag = tag.to_ascii_lowercase();
                let element = doc.create_element(tag.as_str());
                doc.append_child(parent, element)?;

                let mut tag_lex = lex.morph::<TagToken>();
                let self_closing = parse_attributes(doc, element, &tag, &mut tag_lex)?;
                lex = tag_lex.morph();

                if !self_closing && !is_void_element(&tag) {
                    open.push((element, tag));
                }
            }
            Ok(ContentToken::TagClose(tag)) => {
                let tag = tag.to_ascii_lowercase();
                if is_void_element(&tag) {
                    continue;
                }
                match open.pop() {
                    Some((_, expected)) if expected == tag => {}
                    Some((_, expected)) => {
                        return Err(ParseError::MismatchedClose {
                            pos,
                            expected,
                            found: tag,
                        })
                    }
                    None => return Err(ParseError::StrayClose { pos, tag }),
                }
            }
            Err(()) => return Err(ParseError::unexpected_input(pos, lex.slice())),
        }
    }

    if let Some((_, tag)) = open.pop() {
        return Err(ParseError::UnclosedTag {
            pos: source.len(),
            tag,
        });
    }

    debug!(nodes = doc.subtree(fragment).len() - 1, "Parsed markup fragment");
    Ok(fragment)
}

/// Consume attributes up to the end of the opening tag. Returns whether the
/// tag was self-closing.
fn parse_attributes<'src>(
    doc: &mut Document,
    element: NodeId,
    tag: &str,
    lex: &mut Lexer<'src, TagToken<'src>>,
) -> ParseResult<bool> {
    let mut pending: Option<&'src str> = None;

    loop {
        let token = lex.next();
        let pos = lex.span().start;
        match token {
            None => {
                return Err(ParseError::UnclosedTag {
                    pos: lex.span().end,
                    tag: tag.to_string(),
                })
            }
            Some(Ok(TagToken::End)) => {
                if let Some(name) = pending.take() {
                    doc.set_attribute(element, name, "")?;
                }
                return Ok(false);
            }
            Some(Ok(TagToken::SelfClose)) => {
                if let Some(name) = pending.take() {
                    doc.set_attribute(element, name, "")?;
                }
                return Ok(true);
            }
            Some(Ok(TagToken::Name(name))) => {
                if let Some(bare) = pending.replace(name) {
                    doc.set_attribute(element, bare, "")?;
                }
            }
            Some(Ok(TagToken::Equals)) => {
                let name = pending
                    .take()
                    .ok_or_else(|| ParseError::unexpected_input(pos, "="))?;
                match lex.next() {
                    Some(Ok(TagToken::Quoted(value))) | Some(Ok(TagToken::Name(value))) => {
                        doc.set_attribute(element, name, decode_entities(value))?;
                    }
                    _ => return Err(ParseError::unexpected_input(lex.span().start, lex.slice())),
                }
            }
            Some(Ok(TagToken::Quoted(_))) | Some(Err(())) => {
                return Err(ParseError::unexpected_input(pos, lex.slice()))
            }
        }
    }
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
