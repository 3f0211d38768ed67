//! Object graph → presentation tree.

use std::cmp::Ordering;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use rgss_core::registry::{ClassEntry, Presentation, Representation};
use rgss_core::rules::{
    clean_event_command, encode_field, event_command_is_block, validate_event_command,
};
use rgss_core::value::{Encoding, Hash, Object, RString, UserMarshal, Value};
use rgss_core::{FieldOrdering, Leaf, Policy, Registry};

use crate::emit::Node;
use crate::error::Result;
use crate::table::table_rows;
use crate::{tags, DocumentOptions};

pub(crate) struct Encoder<'a> {
    pub(crate) registry: &'a Registry,
    pub(crate) policy: &'a Policy,
    pub(crate) options: &'a DocumentOptions,
}

fn map_node(tag: Option<String>, entries: Vec<(Node, Node)>, flow: bool) -> Node {
    let node = Node::Map {
        tag,
        entries,
        flow,
    };
    if flow {
        node.into_flow()
    } else {
        node
    }
}

fn float_text(f: f64) -> String {
    serde_yaml::to_string(&f)
        .map(|s| s.trim_end().to_string())
        .unwrap_or_else(|_| f.to_string())
}

impl<'a> Encoder<'a> {
    /// Lower a reference-free tree.
    pub(crate) fn node(&self, value: &Value) -> Result<Node> {
        Ok(match value {
            Value::Nil => Node::plain("null"),
            Value::Bool(b) => Node::plain(b.to_string()),
            Value::Int(i) => Node::plain(i.to_string()),
            Value::BigInt(big) => Node::Scalar {
                tag: Some(tags::BIGNUM.to_string()),
                text: big.to_hex(),
                quote: false,
            },
            Value::Float(f) => Node::plain(float_text(*f)),
            Value::String(s) => self.string(s),
            Value::Symbol(name) => Node::tagged_text(tags::SYMBOL, name.as_str()),
            Value::Array(items) => Node::Seq {
                tag: None,
                items: items.iter().map(|v| self.node(v)).collect::<Result<_>>()?,
                flow: false,
            },
            Value::Hash(hash) => self.hash(hash)?,
            Value::Object(object) => self.object(object)?,
            Value::UserMarshal(user) => self.user_marshal(user)?,
            Value::Leaf(leaf) => self.leaf(leaf)?,
            // Expanded before lowering.
            Value::Ref(id) => return Err(rgss_core::CoreError::DanglingReference(*id).into()),
        })
    }

    fn string(&self, s: &RString) -> Node {
        match s.as_str() {
            Some(text) if s.encoding == self.policy.string_encoding => Node::text(text),
            Some(text) => Node::tagged_text(format!("{}:{}", tags::STRING, s.encoding.name()), text),
            None => {
                let tag = match &s.encoding {
                    Encoding::Binary => tags::BINARY.to_string(),
                    other => format!("{}:{}", tags::BINARY, other.name()),
                };
                Node::tagged_text(tag, STANDARD.encode(&s.bytes))
            }
        }
    }

    fn pairs(&self, hash: &Hash) -> Result<Vec<(Node, Node)>> {
        let mut entries: Vec<&(Value, Value)> = hash.entries.iter().collect();
        if self.policy.field_ordering == FieldOrdering::Alphabetical {
            entries.sort_by(|(a, _), (b, _)| compare_keys(a, b));
        }
        entries
            .into_iter()
            .map(|(k, v)| Ok((self.node(k)?.into_key(), self.node(v)?)))
            .collect()
    }

    fn hash(&self, hash: &Hash) -> Result<Node> {
        let pairs = map_node(None, self.pairs(hash)?, false);
        Ok(match &hash.default {
            None => pairs,
            Some(default) => map_node(
                Some(tags::HASH_WITH_DEFAULT.to_string()),
                vec![
                    (Node::key("default"), self.node(default)?),
                    (Node::key("pairs"), pairs),
                ],
                false,
            ),
        })
    }

    fn object(&self, object: &Object) -> Result<Node> {
        let entry = self.registry.resolve(&object.class);
        if entry.presentation == Presentation::EventCommand {
            return self.event_command(entry, object);
        }

        let mut fields: Vec<&(String, Value)> = object.fields.iter().collect();
        if self.policy.field_ordering == FieldOrdering::Alphabetical {
            fields.sort_by(|(a, _), (b, _)| a.cmp(b));
        }
        let mut entries = Vec::with_capacity(fields.len());
        for (name, value) in fields {
            let node = match entry.rule_for(name) {
                Some(transform) => self.rule_output(&encode_field(transform, value, self.policy)?)?,
                None => self.node(value)?,
            };
            entries.push((Node::key(entry.key_for(name)), node));
        }
        Ok(map_node(
            Some(format!("{}:{}", tags::OBJECT, object.class)),
            entries,
            entry.presentation == Presentation::Compact,
        ))
    }

    /// Mappings produced by field rules keep their semantic order.
    fn rule_output(&self, value: &Value) -> Result<Node> {
        match value {
            Value::Hash(hash) if hash.default.is_none() => {
                let entries = hash
                    .entries
                    .iter()
                    .map(|(k, v)| Ok((self.node(k)?.into_key(), self.node(v)?)))
                    .collect::<Result<_>>()?;
                Ok(map_node(None, entries, false))
            }
            other => self.node(other),
        }
    }

    fn event_command(&self, entry: &ClassEntry, command: &Object) -> Result<Node> {
        validate_event_command(command)?;
        let command = clean_event_command(command, self.policy);
        let mut entries = Vec::with_capacity(3);
        for spec in entry.fields {
            if let Some(value) = command.field(spec.name) {
                entries.push((Node::key(spec.key), self.node(value)?));
            }
        }
        Ok(map_node(
            Some(format!("{}:{}", tags::OBJECT, command.class)),
            entries,
            !event_command_is_block(&command, self.policy),
        ))
    }

    fn user_marshal(&self, user: &UserMarshal) -> Result<Node> {
        let entry = self.registry.resolve(&user.class);
        let tag = if entry.representation == Representation::Interpreter {
            tags::OBJECT
        } else {
            tags::MARSHAL
        };
        Ok(map_node(
            Some(format!("{tag}:{}", user.class)),
            vec![(Node::key("data"), self.node(&user.data)?)],
            false,
        ))
    }

    fn leaf(&self, leaf: &Leaf) -> Result<Node> {
        let class = leaf.class_name();
        let entry = self.registry.resolve(class);
        let compact = entry.presentation == Presentation::Compact;
        let tag = Some(format!("{}:{class}", tags::OBJECT));
        let float = |f: f64| Node::plain(float_text(f));
        let int = |i: i64| Node::plain(i.to_string());

        let values: Vec<Node> = match leaf {
            Leaf::Table(table) => {
                let rows = table_rows(table, self.options.table_width);
                let data = Node::Seq {
                    tag: None,
                    items: rows.into_iter().map(Node::text).collect(),
                    flow: false,
                };
                vec![
                    int(table.dim.into()),
                    int(table.x.into()),
                    int(table.y.into()),
                    int(table.z.into()),
                    data,
                ]
            }
            Leaf::Color(c) => vec![float(c.red), float(c.green), float(c.blue), float(c.alpha)],
            Leaf::Tone(t) => vec![float(t.red), float(t.green), float(t.blue), float(t.gray)],
            Leaf::Rect(r) => vec![
                int(r.x.into()),
                int(r.y.into()),
                int(r.width.into()),
                int(r.height.into()),
            ],
            Leaf::Opaque { class, data } => {
                return Ok(map_node(
                    Some(format!("{}:{class}", tags::USER_DEF)),
                    vec![(Node::key("data"), self.string(data))],
                    false,
                ));
            }
        };
        let entries = entry
            .fields
            .iter()
            .zip(values)
            .map(|(spec, node)| (Node::key(spec.key), node))
            .collect();
        Ok(map_node(tag, entries, compact))
    }
}

impl Node {
    /// Collections used as mapping keys must stay on one line.
    fn into_key(self) -> Node {
        match self {
            Node::Scalar { .. } => self,
            other => other.into_flow(),
        }
    }
}

fn key_rank(value: &Value) -> u8 {
    match value {
        Value::Nil => 0,
        Value::Bool(_) => 1,
        Value::Int(_) | Value::BigInt(_) | Value::Float(_) => 2,
        Value::String(_) | Value::Symbol(_) => 3,
        _ => 4,
    }
}

fn key_number(value: &Value) -> f64 {
    match value {
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        Value::BigInt(big) if big.negative => f64::NEG_INFINITY,
        Value::BigInt(_) => f64::INFINITY,
        _ => 0.0,
    }
}

fn key_text(value: &Value) -> &[u8] {
    match value {
        Value::String(s) => &s.bytes,
        Value::Symbol(name) => name.as_bytes(),
        _ => &[],
    }
}

/// Order plain mapping keys: nil, booleans, numbers, text, everything else.
fn compare_keys(a: &Value, b: &Value) -> Ordering {
    key_rank(a).cmp(&key_rank(b)).then_with(|| match (a, b) {
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ if key_rank(a) == 2 => key_number(a).total_cmp(&key_number(b)),
        _ => key_text(a).cmp(key_text(b)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_order() {
        let mut keys = vec![
            Value::str("b"),
            Value::Int(10),
            Value::Nil,
            Value::str("a"),
            Value::Float(2.5),
            Value::Int(-3),
            Value::Bool(true),
        ];
        keys.sort_by(compare_keys);
        assert_eq!(
            keys,
            vec![
                Value::Nil,
                Value::Bool(true),
                Value::Int(-3),
                Value::Float(2.5),
                Value::Int(10),
                Value::str("a"),
                Value::str("b"),
            ]
        );
    }

    #[test]
    fn float_text_reads_back_as_float() {
        assert_eq!(float_text(1.0), "1.0");
        assert_eq!(float_text(f64::NAN), ".nan");
        assert_eq!(float_text(f64::NEG_INFINITY), "-.inf");
    }
}
