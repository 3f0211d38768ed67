//! Presentation tree and the text emitter.
//!
//! The encoder lowers the object graph to [`Node`]s that already carry every
//! structural choice (tag, flow or block, entry order). The emitter only
//! handles layout: two-space block indentation, sequences under a mapping key
//! at the key's own column, and single-line flow collections.

/// A document node ready for layout.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    /// A scalar. `text` is emitted verbatim unless `quote` asks for string
    /// quoting rules to be applied.
    Scalar {
        tag: Option<String>,
        text: String,
        quote: bool,
    },
    Seq {
        tag: Option<String>,
        items: Vec<Node>,
        flow: bool,
    },
    Map {
        tag: Option<String>,
        entries: Vec<(Node, Node)>,
        flow: bool,
    },
}

impl Node {
    /// A token emitted as-is (numbers, booleans, null).
    pub(crate) fn plain(text: impl Into<String>) -> Self {
        Node::Scalar {
            tag: None,
            text: text.into(),
            quote: false,
        }
    }

    /// A string that needs quoting where YAML would misread it.
    pub(crate) fn text(text: impl Into<String>) -> Self {
        Node::Scalar {
            tag: None,
            text: text.into(),
            quote: true,
        }
    }

    pub(crate) fn tagged_text(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Node::Scalar {
            tag: Some(tag.into()),
            text: text.into(),
            quote: true,
        }
    }

    pub(crate) fn key(name: &str) -> Self {
        Node::text(name)
    }

    fn tag(&self) -> Option<&str> {
        match self {
            Node::Scalar { tag, .. } | Node::Seq { tag, .. } | Node::Map { tag, .. } => {
                tag.as_deref()
            }
        }
    }

    /// Whether the node occupies lines of its own rather than sitting after a
    /// key or dash.
    fn is_block(&self) -> bool {
        match self {
            Node::Scalar { .. } => false,
            Node::Seq { items, flow, .. } => !flow && !items.is_empty(),
            Node::Map { entries, flow, .. } => !flow && !entries.is_empty(),
        }
    }

    /// Force this node and every descendant into flow style.
    pub(crate) fn into_flow(self) -> Self {
        match self {
            Node::Scalar { .. } => self,
            Node::Seq { tag, items, .. } => Node::Seq {
                tag,
                items: items.into_iter().map(Node::into_flow).collect(),
                flow: true,
            },
            Node::Map { tag, entries, .. } => Node::Map {
                tag,
                entries: entries
                    .into_iter()
                    .map(|(k, v)| (k.into_flow(), v.into_flow()))
                    .collect(),
                flow: true,
            },
        }
    }
}

/// Render a whole document, starting with `---`.
pub(crate) fn emit_document(root: &Node) -> String {
    let mut lines = Vec::new();
    if root.is_block() {
        match root.tag() {
            Some(tag) => lines.push(format!("--- !{tag}")),
            None => lines.push("---".to_string()),
        }
        block_lines(root, 0, &mut lines);
    } else {
        lines.push(format!("--- {}", inline(root, false)));
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn pad(indent: usize) -> String {
    " ".repeat(indent)
}

fn tag_prefix(tag: Option<&str>) -> String {
    tag.map(|t| format!("!{t} ")).unwrap_or_default()
}

fn block_lines(node: &Node, indent: usize, lines: &mut Vec<String>) {
    match node {
        Node::Map { entries, .. } => {
            for (key, value) in entries {
                let key = inline(key, false);
                if !value.is_block() {
                    lines.push(format!("{}{key}: {}", pad(indent), inline(value, false)));
                    continue;
                }
                let tag = value.tag().map(|t| format!(" !{t}")).unwrap_or_default();
                lines.push(format!("{}{key}:{tag}", pad(indent)));
                match value {
                    Node::Seq { .. } => block_lines(value, indent, lines),
                    _ => block_lines(value, indent + 2, lines),
                }
            }
        }
        Node::Seq { items, .. } => {
            for item in items {
                if !item.is_block() {
                    lines.push(format!("{}- {}", pad(indent), inline(item, false)));
                } else if let Some(tag) = item.tag() {
                    lines.push(format!("{}- !{tag}", pad(indent)));
                    block_lines(item, indent + 2, lines);
                } else {
                    // The first nested line moves up beside the dash.
                    let first = lines.len();
                    block_lines(item, indent + 2, lines);
                    if let Some(line) = lines.get_mut(first) {
                        line.replace_range(..indent + 2, &format!("{}- ", pad(indent)));
                    }
                }
            }
        }
        Node::Scalar { .. } => lines.push(format!("{}{}", pad(indent), inline(node, false))),
    }
}

/// Single-line rendering. `in_flow` is true inside a flow collection, where
/// `,[]{}` are indicators.
fn inline(node: &Node, in_flow: bool) -> String {
    match node {
        Node::Scalar { tag, text, quote } => {
            let body = if *quote {
                quote_str(text, in_flow)
            } else {
                text.clone()
            };
            format!("{}{body}", tag_prefix(tag.as_deref()))
        }
        Node::Seq { tag, items, .. } => {
            let items: Vec<String> = items.iter().map(|item| inline(item, true)).collect();
            format!("{}[{}]", tag_prefix(tag.as_deref()), items.join(", "))
        }
        Node::Map { tag, entries, .. } => {
            let entries: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{}: {}", inline(k, true), inline(v, true)))
                .collect();
            format!("{}{{{}}}", tag_prefix(tag.as_deref()), entries.join(", "))
        }
    }
}

/// Characters YAML treats as line breaks but JSON leaves unescaped.
const UNICODE_BREAKS: [char; 3] = ['\u{85}', '\u{2028}', '\u{2029}'];

/// Quote a string scalar the way `serde_yaml` would, falling back to a
/// double-quoted string when the result would span lines, carry a Unicode line
/// break or clash with flow indicators.
pub(crate) fn quote_str(text: &str, in_flow: bool) -> String {
    if text.contains(UNICODE_BREAKS) {
        return double_quoted(text);
    }
    let rendered = serde_yaml::to_string(text).unwrap_or_default();
    let rendered = rendered
        .strip_prefix("--- ")
        .or_else(|| rendered.strip_prefix("---\n"))
        .unwrap_or(&rendered);
    let rendered = rendered.strip_suffix("\n...\n").unwrap_or(rendered);
    let rendered = rendered.trim_end_matches('\n');

    let plain = !rendered.starts_with('\'') && !rendered.starts_with('"');
    let needs_json = rendered.is_empty()
        || rendered.contains('\n')
        || (in_flow && plain && rendered.contains([',', '[', ']', '{', '}']));
    if needs_json {
        double_quoted(text)
    } else {
        rendered.to_string()
    }
}

fn double_quoted(text: &str) -> String {
    serde_json::to_string(text)
        .unwrap_or_else(|_| format!("{text:?}"))
        .replace('\u{85}', "\\x85")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: Vec<(&str, Node)>) -> Node {
        Node::Map {
            tag: None,
            entries: entries.into_iter().map(|(k, v)| (Node::key(k), v)).collect(),
            flow: false,
        }
    }

    fn seq(items: Vec<Node>) -> Node {
        Node::Seq {
            tag: None,
            items,
            flow: false,
        }
    }

    #[test]
    fn scalar_root() {
        assert_eq!(emit_document(&Node::plain("1")), "--- 1\n");
        assert_eq!(emit_document(&seq(vec![])), "--- []\n");
    }

    #[test]
    fn block_layout() {
        let doc = map(vec![
            ("name", Node::text("Hero")),
            (
                "list",
                seq(vec![
                    Node::plain("1"),
                    map(vec![("a", Node::plain("2")), ("b", Node::plain("3"))]),
                ]),
            ),
            ("empty", map(vec![])),
        ]);
        assert_eq!(
            emit_document(&doc),
            "---\nname: Hero\nlist:\n- 1\n- a: 2\n  b: 3\nempty: {}\n"
        );
    }

    #[test]
    fn tagged_block_items() {
        let mut item = map(vec![("x", Node::plain("1"))]);
        if let Node::Map { tag, .. } = &mut item {
            *tag = Some("ruby/object:RPG::Area".into());
        }
        let doc = seq(vec![Node::plain("null"), item]);
        assert_eq!(
            emit_document(&doc),
            "---\n- null\n- !ruby/object:RPG::Area\n  x: 1\n"
        );
    }

    #[test]
    fn flow_collections() {
        let flow = Node::Map {
            tag: Some("ruby/object:RPG::SE".into()),
            entries: vec![
                (Node::key("name"), Node::text("a, b")),
                (Node::key("volume"), Node::plain("80")),
            ],
            flow: true,
        };
        assert_eq!(
            emit_document(&map(vec![("se", flow)])),
            "---\nse: !ruby/object:RPG::SE {name: \"a, b\", volume: 80}\n"
        );
    }

    #[test]
    fn into_flow_reaches_descendants() {
        let nested = map(vec![("inner", seq(vec![Node::plain("1")]))]).into_flow();
        assert_eq!(emit_document(&nested), "--- {inner: [1]}\n");
    }

    #[test]
    fn string_quoting() {
        assert_eq!(quote_str("plain", false), "plain");
        assert!(matches!(quote_str("", false).as_str(), "''" | "\"\""));
        assert_eq!(quote_str("two\nlines", false), "\"two\\nlines\"");
        assert_eq!(quote_str("a,b", false), "a,b");
        assert_eq!(quote_str("a,b", true), "\"a,b\"");
        assert_ne!(quote_str("true", false), "true");
        assert_ne!(quote_str("12", true), "12");
    }

    #[test]
    fn unicode_line_breaks_are_escaped() {
        assert_eq!(quote_str("x\u{2028}y", false), "\"x\\u2028y\"");
        assert_eq!(quote_str("x\u{2029}y", true), "\"x\\u2029y\"");
        assert_eq!(quote_str("x\u{85}y", false), "\"x\\x85y\"");
        assert_eq!(
            quote_str("multi\nx\u{2028}y", false),
            "\"multi\\nx\\u2028y\""
        );

        let root = map(vec![("x\u{2028}y", Node::text("v"))]);
        let text = emit_document(&root);
        assert_eq!(text, "---\n\"x\\u2028y\": v\n");
        let parsed: serde_yaml::Value = serde_yaml::from_str(&text).unwrap();
        assert_eq!(parsed["x\u{2028}y"], serde_yaml::Value::from("v"));
    }
}
