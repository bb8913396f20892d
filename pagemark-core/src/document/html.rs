//! XHTML to [`ContentNode`] conversion

use super::ContentNode;

/// Elements nested deeper than this are folded into their ancestor's text
const MAX_TREE_DEPTH: usize = 256;

/// Parse a content document and return its `<body>` element
pub fn parse_body(html: &str) -> ContentNode {
    use scraper::Html;

    let document = Html::parse_document(html);
    let root = document.root_element();

    let body = root
        .children()
        .find(|child| {
            child
                .value()
                .as_element()
                .map(|el| el.name() == "body")
                .unwrap_or(false)
        })
        .unwrap_or(*root);

    element_to_node(body, 0)
}

/// Convert an element and everything below it
fn element_to_node(node: ego_tree::NodeRef<scraper::Node>, depth: usize) -> ContentNode {
    let mut out = match node.value().as_element() {
        Some(el) => {
            let mut out = ContentNode::new(el.name());
            out.id = el.attr("id").map(|s| s.to_string());
            out
        }
        None => ContentNode::new(""),
    };

    for child in node.children() {
        match child.value() {
            scraper::Node::Text(text) => append_text(&mut out, text),
            scraper::Node::Element(_) if depth < MAX_TREE_DEPTH => {
                out.children.push(element_to_node(child, depth + 1));
            }
            scraper::Node::Element(_) => {
                let flattened = get_text_content(child);
                append_text(&mut out, &flattened);
            }
            _ => {}
        }
    }

    out
}

/// Text goes to the element's own text until it has a child, then to the last child's tail
fn append_text(node: &mut ContentNode, text: &str) {
    match node.children.last_mut() {
        Some(last) => last.tail.push_str(text),
        None => node.text.push_str(text),
    }
}

/// Get text content of a node
fn get_text_content(node: ego_tree::NodeRef<scraper::Node>) -> String {
    let mut text = String::new();
    for descendant in node.descendants() {
        if let scraper::Node::Text(t) = descendant.value() {
            text.push_str(t);
        }
    }
    text
}
