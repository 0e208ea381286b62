//! Lenient HTML fragment parser.
//!
//! Produces a tree of [`ParsedNode`]s from theme and plugin markup. It is
//! forgiving in the way browsers are: unknown end tags are dropped, open
//! elements are closed at the end of input, void elements never take
//! children, and `<script>`/`<style>` bodies are kept verbatim. Character
//! references are preserved as written.

/// A node produced by [`parse_fragment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedNode {
    /// An element with lower-cased tag name.
    Element {
        /// Tag name.
        tag: String,
        /// Attributes in source order.
        attrs: Vec<(String, String)>,
        /// Child nodes.
        children: Vec<ParsedNode>,
    },
    /// A run of text.
    Text(String),
    /// A comment body.
    Comment(String),
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Whether `tag` never has children.
pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

struct OpenElement {
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<ParsedNode>,
}

/// Parses `input` into top-level nodes.
pub fn parse_fragment(input: &str) -> Vec<ParsedNode> {
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut roots: Vec<ParsedNode> = Vec::new();
    let mut pos = 0;
    let bytes = input.as_bytes();

    fn push(node: ParsedNode, stack: &mut [OpenElement], roots: &mut Vec<ParsedNode>) {
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => roots.push(node),
        }
    }

    while pos < input.len() {
        let rest = &input[pos..];

        if rest.starts_with("<!--") {
            let end = rest[4..].find("-->").map(|i| i + 4);
            let (body, consumed) = match end {
                Some(i) => (&rest[4..i], i + 3),
                None => (&rest[4..], rest.len()),
            };
            push(ParsedNode::Comment(body.to_string()), &mut stack, &mut roots);
            pos += consumed;
            continue;
        }

        if rest.starts_with("<!") || rest.starts_with("<?") {
            // Doctype and processing instructions carry no content.
            pos += rest.find('>').map(|i| i + 1).unwrap_or(rest.len());
            continue;
        }

        if rest.starts_with("</") {
            let close = rest.find('>').unwrap_or(rest.len());
            let name = rest[2..close].trim().to_ascii_lowercase();
            pos += (close + 1).min(rest.len());
            if let Some(index) = stack.iter().rposition(|open| open.tag == name) {
                while stack.len() > index {
                    if let Some(open) = stack.pop() {
                        let node = ParsedNode::Element {
                            tag: open.tag,
                            attrs: open.attrs,
                            children: open.children,
                        };
                        push(node, &mut stack, &mut roots);
                    }
                }
            }
            continue;
        }

        if rest.starts_with('<') && bytes.get(pos + 1).is_some_and(|b| b.is_ascii_alphabetic()) {
            let (tag, attrs, self_closing, consumed) = parse_start_tag(rest);
            pos += consumed;

            if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) && !self_closing {
                let closing = format!("</{tag}");
                let body_end = input[pos..]
                    .to_ascii_lowercase()
                    .find(&closing)
                    .map(|i| pos + i)
                    .unwrap_or(input.len());
                let body = &input[pos..body_end];
                let children = if body.is_empty() {
                    Vec::new()
                } else {
                    vec![ParsedNode::Text(body.to_string())]
                };
                pos = match input[body_end..].find('>') {
                    Some(i) => body_end + i + 1,
                    None => input.len(),
                };
                push(
                    ParsedNode::Element {
                        tag,
                        attrs,
                        children,
                    },
                    &mut stack,
                    &mut roots,
                );
                continue;
            }

            if self_closing || is_void(&tag) {
                push(
                    ParsedNode::Element {
                        tag,
                        attrs,
                        children: Vec::new(),
                    },
                    &mut stack,
                    &mut roots,
                );
            } else {
                stack.push(OpenElement {
                    tag,
                    attrs,
                    children: Vec::new(),
                });
            }
            continue;
        }

        // Text runs up to the next tag-like '<'.
        let next = rest
            .char_indices()
            .skip(1)
            .find(|&(_, c)| c == '<')
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        push(ParsedNode::Text(rest[..next].to_string()), &mut stack, &mut roots);
        pos += next;
    }

    while let Some(open) = stack.pop() {
        let node = ParsedNode::Element {
            tag: open.tag,
            attrs: open.attrs,
            children: open.children,
        };
        push(node, &mut stack, &mut roots);
    }

    roots
}

/// Parses `<tag attrs...>` at the start of `input`.
///
/// Returns the tag, attributes, whether the tag was self-closing, and the
/// number of bytes consumed.
fn parse_start_tag(input: &str) -> (String, Vec<(String, String)>, bool, usize) {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut i = 1;
    let mut tag = String::new();
    while i < chars.len() && !chars[i].1.is_whitespace() && chars[i].1 != '>' && chars[i].1 != '/'
    {
        tag.push(chars[i].1.to_ascii_lowercase());
        i += 1;
    }

    let mut attrs = Vec::new();
    let mut self_closing = false;

    loop {
        while i < chars.len() && chars[i].1.is_whitespace() {
            i += 1;
        }
        let Some(&(offset, c)) = chars.get(i) else {
            return (tag, attrs, self_closing, input.len());
        };
        match c {
            '>' => return (tag, attrs, self_closing, offset + 1),
            '/' => {
                self_closing = true;
                i += 1;
            }
            _ => {
                self_closing = false;
                let mut name = String::new();
                while i < chars.len()
                    && !chars[i].1.is_whitespace()
                    && !matches!(chars[i].1, '=' | '>' | '/')
                {
                    name.push(chars[i].1.to_ascii_lowercase());
                    i += 1;
                }
                while i < chars.len() && chars[i].1.is_whitespace() {
                    i += 1;
                }
                let mut value = String::new();
                if chars.get(i).map(|c| c.1) == Some('=') {
                    i += 1;
                    while i < chars.len() && chars[i].1.is_whitespace() {
                        i += 1;
                    }
                    match chars.get(i).map(|c| c.1) {
                        Some(quote @ ('"' | '\'')) => {
                            i += 1;
                            while i < chars.len() && chars[i].1 != quote {
                                value.push(chars[i].1);
                                i += 1;
                            }
                            i += 1;
                        }
                        _ => {
                            while i < chars.len()
                                && !chars[i].1.is_whitespace()
                                && chars[i].1 != '>'
                            {
                                value.push(chars[i].1);
                                i += 1;
                            }
                        }
                    }
                }
                if !name.is_empty() {
                    attrs.push((name, value));
                }
            }
        }
    }
}

/// Escapes a stored attribute value for a double-quoted attribute.
///
/// Values keep their character references as written, so only the quote
/// itself needs escaping.
pub fn escape_attr(value: &str) -> String {
    value.replace('"', "&quot;")
}
