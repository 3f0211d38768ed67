//! YAML tree → object graph.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use indexmap::IndexMap;
use serde_yaml::Value as Yaml;

use rgss_core::registry::{ClassEntry, Presentation, Representation};
use rgss_core::rules::decode_field;
use rgss_core::structs::{Color, Rect, Table, Tone};
use rgss_core::value::{BigInt, Encoding, Hash, Object, RString, UserMarshal, Value};
use rgss_core::{Leaf, LeafKind, Policy, Registry};

use crate::error::{Result, YamlError};
use crate::table::parse_rows;
use crate::tags;

pub(crate) struct Decoder<'a> {
    pub(crate) registry: &'a Registry,
    pub(crate) policy: &'a Policy,
}

fn describe(node: &Yaml) -> String {
    match node {
        Yaml::Null => "null".into(),
        Yaml::Bool(_) => "boolean".into(),
        Yaml::Number(_) => "number".into(),
        Yaml::String(_) => "string".into(),
        Yaml::Sequence(_) => "sequence".into(),
        Yaml::Mapping(_) => "mapping".into(),
        Yaml::Tagged(tagged) => format!("tagged node {}", tagged.tag),
    }
}

fn unexpected(expected: &'static str, node: &Yaml, context: impl Into<String>) -> YamlError {
    YamlError::UnexpectedNode {
        expected,
        found: describe(node),
        context: context.into(),
    }
}

fn scalar_text<'y>(node: &'y Yaml, context: &str) -> Result<&'y str> {
    match node {
        Yaml::String(s) => Ok(s),
        other => Err(unexpected("a string", other, context)),
    }
}

/// Fields of a tagged mapping, keyed by their document name.
struct Fields<'y> {
    class: String,
    map: IndexMap<String, &'y Yaml>,
}

impl<'y> Fields<'y> {
    fn new(class: &str, node: &'y Yaml) -> Result<Self> {
        let Yaml::Mapping(mapping) = node else {
            return Err(unexpected("a mapping", node, class));
        };
        let mut map = IndexMap::with_capacity(mapping.len());
        for (key, value) in mapping {
            let key = match key {
                Yaml::String(s) => s.clone(),
                other => return Err(unexpected("a field name", other, class)),
            };
            map.insert(key, value);
        }
        Ok(Self {
            class: class.to_string(),
            map,
        })
    }

    fn take(&mut self, key: &str) -> Result<&'y Yaml> {
        self.map
            .shift_remove(key)
            .ok_or_else(|| YamlError::MissingField {
                class: self.class.clone(),
                field: key.to_string(),
            })
    }

    fn int(&mut self, key: &str) -> Result<i64> {
        let node = self.take(key)?;
        node.as_i64()
            .ok_or_else(|| unexpected("an integer", node, format!("{}.{key}", self.class)))
    }

    fn dimension(&mut self, key: &str) -> Result<u32> {
        let v = self.int(key)?;
        u32::try_from(v).map_err(|_| YamlError::UnexpectedNode {
            expected: "a table dimension",
            found: v.to_string(),
            context: format!("{}.{key}", self.class),
        })
    }

    fn float(&mut self, key: &str) -> Result<f64> {
        let node = self.take(key)?;
        node.as_f64()
            .ok_or_else(|| unexpected("a number", node, format!("{}.{key}", self.class)))
    }
}

impl<'a> Decoder<'a> {
    pub(crate) fn value(&self, node: &Yaml) -> Result<Value> {
        Ok(match node {
            Yaml::Null => Value::Nil,
            Yaml::Bool(b) => Value::Bool(*b),
            Yaml::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::BigInt(BigInt::new(false, u.to_le_bytes()))
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Yaml::String(s) => Value::String(RString::new(
                s.as_bytes().to_vec(),
                self.policy.string_encoding.clone(),
            )),
            Yaml::Sequence(items) => {
                Value::Array(items.iter().map(|i| self.value(i)).collect::<Result<_>>()?)
            }
            Yaml::Mapping(mapping) => Value::Hash(Hash::new(self.pairs(mapping)?)),
            Yaml::Tagged(tagged) => {
                let tag = tagged.tag.to_string();
                self.tagged(tag.trim_start_matches('!'), &tagged.value)?
            }
        })
    }

    fn pairs(&self, mapping: &serde_yaml::Mapping) -> Result<Vec<(Value, Value)>> {
        mapping
            .iter()
            .map(|(k, v)| Ok((self.value(k)?, self.value(v)?)))
            .collect()
    }

    fn tagged(&self, tag: &str, node: &Yaml) -> Result<Value> {
        let (kind, arg) = match tag.split_once(':') {
            Some((kind, arg)) => (kind, Some(arg)),
            None => (tag, None),
        };
        match (kind, arg) {
            (tags::SYMBOL, None) => Ok(Value::Symbol(scalar_text(node, tag)?.to_string())),
            (tags::BIGNUM, None) => match node {
                // Hex that fits 64 bits is read as a number by the parser.
                Yaml::Number(_) => self.value(node),
                _ => {
                    let text = scalar_text(node, tag)?;
                    let big = BigInt::from_hex(text)
                        .ok_or_else(|| unexpected("a hex integer", node, tag))?;
                    Ok(match big.to_i64() {
                        Some(i) => Value::Int(i),
                        None => Value::BigInt(big),
                    })
                }
            },
            (tags::STRING, Some(encoding)) => Ok(Value::String(RString::new(
                scalar_text(node, tag)?.as_bytes().to_vec(),
                Encoding::from_name(encoding),
            ))),
            (tags::BINARY, encoding) => {
                let text: String = scalar_text(node, tag)?
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect();
                let bytes = STANDARD.decode(text)?;
                let encoding = encoding.map_or(Encoding::Binary, Encoding::from_name);
                Ok(Value::String(RString::new(bytes, encoding)))
            }
            (tags::HASH_WITH_DEFAULT, None) => {
                let mut fields = Fields::new(tag, node)?;
                let default = self.value(fields.take("default")?)?;
                let pairs = match fields.take("pairs")? {
                    Yaml::Mapping(mapping) => self.pairs(mapping)?,
                    other => return Err(unexpected("a mapping", other, "hash pairs")),
                };
                Ok(Value::Hash(Hash {
                    entries: pairs,
                    default: Some(Box::new(default)),
                }))
            }
            (tags::OBJECT, Some(class)) => self.object(class, node),
            (tags::MARSHAL, Some(class)) => {
                let mut fields = Fields::new(class, node)?;
                let data = self.value(fields.take("data")?)?;
                Ok(Value::UserMarshal(UserMarshal {
                    class: class.to_string(),
                    data: Box::new(data),
                }))
            }
            (tags::USER_DEF, Some(class)) => {
                let mut fields = Fields::new(class, node)?;
                let data_node = fields.take("data")?;
                match self.value(data_node)? {
                    Value::String(data) => Ok(Value::Leaf(Leaf::Opaque {
                        class: class.to_string(),
                        data,
                    })),
                    _ => Err(unexpected("a string", data_node, format!("{class}.data"))),
                }
            }
            _ => Err(YamlError::UnknownTag {
                tag: tag.to_string(),
            }),
        }
    }

    fn object(&self, class: &str, node: &Yaml) -> Result<Value> {
        if let Some(kind) = self.registry.leaf_kind(class) {
            return self.leaf(kind, class, node);
        }
        let entry = self.registry.resolve(class);
        if entry.representation == Representation::Interpreter
            && self.policy.interpreter_is_opaque_leaf
        {
            let mut fields = Fields::new(class, node)?;
            let data = self.value(fields.take("data")?)?;
            return Ok(Value::UserMarshal(UserMarshal {
                class: class.to_string(),
                data: Box::new(data),
            }));
        }
        if entry.presentation == Presentation::EventCommand {
            return self.event_command(entry, class, node);
        }

        let fields = Fields::new(class, node)?;
        let mut out = Vec::with_capacity(fields.map.len());
        for (key, value) in fields.map {
            let name = entry.field_for(&key).to_string();
            let mut value = self.value(value)?;
            if let Some(transform) = entry.rule_for(&name) {
                value = decode_field(transform, value, self.policy)?;
            }
            out.push((name, value));
        }
        Ok(Value::Object(Object::new(class, out)))
    }

    fn event_command(&self, entry: &ClassEntry, class: &str, node: &Yaml) -> Result<Value> {
        let mut fields = Fields::new(class, node)?;
        let mut out = Vec::with_capacity(entry.fields.len());
        for spec in entry.fields {
            out.push((spec.name.to_string(), self.value(fields.take(spec.key)?)?));
        }
        if let Some(extra) = fields.map.keys().next() {
            return Err(rgss_core::CoreError::MalformedEventCommand {
                detail: format!("unexpected field '{extra}'"),
            }
            .into());
        }
        Ok(Value::Object(Object::new(class, out)))
    }

    fn leaf(&self, kind: LeafKind, class: &str, node: &Yaml) -> Result<Value> {
        let mut f = Fields::new(class, node)?;
        let leaf = match kind {
            LeafKind::Table => {
                let dim = f.dimension("dim")?;
                let x = f.dimension("x")?;
                let y = f.dimension("y")?;
                let z = f.dimension("z")?;
                let data = f.take("data")?;
                let rows = match data {
                    Yaml::Sequence(rows) => rows
                        .iter()
                        .map(|row| match row {
                            Yaml::String(s) => Ok(s.clone()),
                            Yaml::Number(n) => Ok(n.to_string()),
                            other => Err(unexpected("a row string", other, "Table.data")),
                        })
                        .collect::<Result<Vec<_>>>()?,
                    Yaml::Null => Vec::new(),
                    other => return Err(unexpected("a sequence", other, "Table.data")),
                };
                Leaf::Table(Table::new(dim, x, y, z, parse_rows(&rows)?)?)
            }
            LeafKind::Color => Leaf::Color(Color {
                red: f.float("r")?,
                green: f.float("g")?,
                blue: f.float("b")?,
                alpha: f.float("a")?,
            }),
            LeafKind::Tone => Leaf::Tone(Tone {
                red: f.float("r")?,
                green: f.float("g")?,
                blue: f.float("b")?,
                gray: f.float("a")?,
            }),
            LeafKind::Rect => {
                let mut coord = |key: &str| -> Result<i32> {
                    let v = f.int(key)?;
                    i32::try_from(v).map_err(|_| YamlError::UnexpectedNode {
                        expected: "a 32-bit integer",
                        found: v.to_string(),
                        context: format!("Rect.{key}"),
                    })
                };
                Leaf::Rect(Rect {
                    x: coord("x")?,
                    y: coord("y")?,
                    width: coord("width")?,
                    height: coord("height")?,
                })
            }
        };
        Ok(Value::Leaf(leaf))
    }
}
