//! HTML serialization of (parts of) a [`Document`]

use crate::document::{Document, NodeId, NodeKind};
use crate::parser::is_void_element;

/// Outer HTML of a node. Fragments, shadow roots and the document root
/// serialize as their children.
pub fn to_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, &mut out);
    out
}

/// Markup of the children of a node (including its shadow root, if any)
pub fn inner_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_children(doc, id, &mut out);
    out
}

fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    match doc.kind(id) {
        Some(NodeKind::Element { tag, attributes }) => {
            out.push('<');
            out.push_str(tag);
            for attr in attributes {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                out.push_str(&escape_attribute(&attr.value));
                out.push('"');
            }
            out.push('>');
            if is_void_element(tag) && doc.children(id).is_empty() {
                return;
            }
            write_children(doc, id, out);
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        Some(NodeKind::Text(text)) => out.push_str(&escape_text(text)),
        Some(NodeKind::Comment(text)) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        Some(NodeKind::Fragment) | Some(NodeKind::ShadowRoot) | Some(NodeKind::Root) => {
            write_children(doc, id, out)
        }
        None => {}
    }
}

fn write_children(doc: &Document, id: NodeId, out: &mut String) {
    if let Some(shadow) = doc.shadow_root(id) {
        out.push_str("<template shadowrootmode=\"open\">");
        write_children(doc, shadow, out);
        out.push_str("</template>");
    }
    for &child in doc.children(id) {
        write_node(doc, child, out);
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
