//! Field transformations applied between the object graph and documents.
//!
//! Each function here comes in an encode/decode pair; the document codec
//! dispatches to them through the [`FieldTransform`] attached to a field in
//! the registry.

use crate::error::{CoreError, Result};
use crate::policy::{Policy, VersionSlot};
use crate::registry::FieldTransform;
use crate::value::{Encoding, Hash, Object, RString, Value};

/// Opcode of a "show text" continuation line.
pub const TEXT_LINE_OPCODE: i64 = 401;

/// Sparse sequence → `{index: value}` mapping.
///
/// Absent entries are skipped, except the last index, which is always present
/// so the original length survives.
pub fn sparse_to_index_map(items: &[Value], reduce: impl Fn(&Value) -> Value) -> Hash {
    let mut entries = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let reduced = reduce(item);
        if !reduced.is_nil() {
            entries.push((Value::Int(index as i64), reduced));
        }
    }
    if let Some(last) = items.len().checked_sub(1) {
        let key = Value::Int(last as i64);
        if !entries.iter().any(|(k, _)| *k == key) {
            entries.push((key, Value::Nil));
        }
    }
    Hash::new(entries)
}

/// Largest index a sparse map may name. The editor caps switch and variable
/// lists at a few thousand entries.
pub const MAX_SPARSE_INDEX: i64 = 1 << 20;

/// Inverse of [`sparse_to_index_map`]: size to the largest index and fill.
pub fn index_map_to_sparse(map: &Hash) -> Result<Vec<Value>> {
    let mut items = Vec::new();
    for (key, value) in &map.entries {
        let index = match key {
            Value::Int(i) if (0..=MAX_SPARSE_INDEX).contains(i) => *i as usize,
            Value::Int(i) if *i > MAX_SPARSE_INDEX => {
                return Err(CoreError::MalformedSparseIndex {
                    detail: format!("index {i} is above the limit of {MAX_SPARSE_INDEX}"),
                })
            }
            other => {
                return Err(CoreError::MalformedSparseIndex {
                    detail: format!("expected a non-negative integer key, found {}", other.kind()),
                })
            }
        };
        if index >= items.len() {
            items.resize(index + 1, Value::Nil);
        }
        items[index] = value.clone();
    }
    Ok(items)
}

/// Trim surrounding whitespace and NULs; blank strings become nil.
pub fn reduce_string(value: &Value) -> Value {
    match value {
        Value::String(s) => {
            let trimmed = trim_bytes(&s.bytes);
            if trimmed.is_empty() {
                Value::Nil
            } else {
                Value::String(RString::new(trimmed.to_vec(), s.encoding.clone()))
            }
        }
        other => other.clone(),
    }
}

fn is_strippable(b: u8) -> bool {
    b == 0 || b.is_ascii_whitespace() || b == 0x0b
}

fn trim_bytes(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|&b| !is_strippable(b))
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|&b| !is_strippable(b))
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

fn rstrip_bytes(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|&b| !is_strippable(b))
        .map_or(0, |i| i + 1);
    &bytes[..end]
}

/// A self-switch key: map id, event id and switch letter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfSwitchKey {
    pub map: i64,
    pub event: i64,
    pub switch: String,
}

impl SelfSwitchKey {
    /// Render as `"%03d %03d %s"`.
    pub fn format(&self) -> String {
        format!("{:03} {:03} {}", self.map, self.event, self.switch)
    }

    /// Parse the output of [`SelfSwitchKey::format`]. Surrounding padding is
    /// tolerated; anything else that does not match fails.
    pub fn parse(text: &str) -> Result<Self> {
        let malformed = || CoreError::MalformedCompoundKey {
            key: text.to_string(),
        };
        let mut parts = text.split_whitespace();
        let map = parts
            .next()
            .and_then(|p| p.parse::<i64>().ok())
            .ok_or_else(malformed)?;
        let event = parts
            .next()
            .and_then(|p| p.parse::<i64>().ok())
            .ok_or_else(malformed)?;
        let switch = parts.next().ok_or_else(malformed)?.to_string();
        if parts.next().is_some() {
            return Err(malformed());
        }
        Ok(Self { map, event, switch })
    }

    fn from_value(key: &Value) -> Result<Self> {
        let malformed = || CoreError::MalformedCompoundKey {
            key: format!("{key:?}"),
        };
        let Value::Array(parts) = key else {
            return Err(malformed());
        };
        match parts.as_slice() {
            [Value::Int(map), Value::Int(event), switch] => {
                let switch = match switch {
                    Value::String(s) => s.as_str().map(str::to_string),
                    Value::Symbol(s) => Some(s.clone()),
                    _ => None,
                }
                .ok_or_else(malformed)?;
                if switch.is_empty() || switch.chars().any(char::is_whitespace) {
                    return Err(malformed());
                }
                Ok(Self {
                    map: *map,
                    event: *event,
                    switch,
                })
            }
            _ => Err(malformed()),
        }
    }

    fn to_value(&self, encoding: &Encoding) -> Value {
        Value::Array(vec![
            Value::Int(self.map),
            Value::Int(self.event),
            Value::String(RString::new(self.switch.as_bytes().to_vec(), encoding.clone())),
        ])
    }
}

/// `{[map, event, switch] => value}` → `{"%03d %03d %s" => value}`, with the
/// formatted keys in `encoding`.
pub fn compound_keys_to_strings(map: &Hash, encoding: &Encoding) -> Result<Hash> {
    let entries = map
        .entries
        .iter()
        .map(|(key, value)| {
            let key = SelfSwitchKey::from_value(key)?;
            let text = RString::new(key.format().into_bytes(), encoding.clone());
            Ok((Value::String(text), value.clone()))
        })
        .collect::<Result<_>>()?;
    Ok(Hash {
        entries,
        default: map.default.clone(),
    })
}

/// Inverse of [`compound_keys_to_strings`]; switch letters take `encoding`.
pub fn string_keys_to_compound(map: &Hash, encoding: &Encoding) -> Result<Hash> {
    let entries = map
        .entries
        .iter()
        .map(|(key, value)| {
            let text = match key {
                Value::String(s) => s.as_str(),
                _ => None,
            }
            .ok_or_else(|| CoreError::MalformedCompoundKey {
                key: format!("{key:?}"),
            })?;
            Ok((SelfSwitchKey::parse(text)?.to_value(encoding), value.clone()))
        })
        .collect::<Result<_>>()?;
    Ok(Hash {
        entries,
        default: map.default.clone(),
    })
}

/// The stored `version_id` for a slot: the policy constant, or the input
/// unchanged in round-trip mode.
pub fn map_version_id(value: &Value, slot: VersionSlot, policy: &Policy) -> Value {
    if policy.round_trip {
        value.clone()
    } else {
        Value::Int(policy.version_id(slot))
    }
}

/// Apply a field rule in the graph → document direction.
pub fn encode_field(transform: FieldTransform, value: &Value, policy: &Policy) -> Result<Value> {
    Ok(match (transform, value) {
        (FieldTransform::SparseIndexMap { reduce_strings }, Value::Array(items)) => {
            let reduce_on = reduce_strings && !policy.round_trip;
            Value::Hash(sparse_to_index_map(items, |item| {
                if reduce_on {
                    reduce_string(item)
                } else {
                    item.clone()
                }
            }))
        }
        (FieldTransform::CompoundKeyMap, Value::Hash(map)) => {
            Value::Hash(compound_keys_to_strings(map, &policy.string_encoding)?)
        }
        (FieldTransform::VersionId(slot), value) => map_version_id(value, slot, policy),
        (_, other) => other.clone(),
    })
}

/// Apply a field rule in the document → graph direction.
pub fn decode_field(transform: FieldTransform, value: Value, policy: &Policy) -> Result<Value> {
    Ok(match (transform, value) {
        (FieldTransform::SparseIndexMap { .. }, Value::Hash(map)) => {
            Value::Array(index_map_to_sparse(&map)?)
        }
        (FieldTransform::CompoundKeyMap, Value::Hash(map)) => {
            Value::Hash(string_keys_to_compound(&map, &policy.string_encoding)?)
        }
        (_, other) => other,
    })
}

/// Check that an event command has exactly `indent`, `code` and `parameters`.
pub fn validate_event_command(command: &Object) -> Result<()> {
    if command.fields.len() != 3 {
        return Err(CoreError::MalformedEventCommand {
            detail: format!("expected 3 fields, found {}", command.fields.len()),
        });
    }
    for name in ["indent", "code", "parameters"] {
        if command.field(name).is_none() {
            return Err(CoreError::MalformedEventCommand {
                detail: format!("missing field '{name}'"),
            });
        }
    }
    Ok(())
}

/// Whether an event command renders as an expanded block.
pub fn event_command_is_block(command: &Object, policy: &Policy) -> bool {
    command.field("code").and_then(Value::as_int) == Some(policy.move_list_opcode)
}

/// Outside round-trip mode, strip trailing whitespace from the text of a
/// show-text continuation line.
pub fn clean_event_command(command: &Object, policy: &Policy) -> Object {
    let mut cleaned = command.clone();
    if policy.round_trip || command.field("code").and_then(Value::as_int) != Some(TEXT_LINE_OPCODE) {
        return cleaned;
    }
    for (name, value) in &mut cleaned.fields {
        if name != "parameters" {
            continue;
        }
        if let Value::Array(params) = value {
            if let Some(Value::String(text)) = params.first_mut() {
                let len = rstrip_bytes(&text.bytes).len();
                text.bytes.truncate(len);
            }
        }
    }
    cleaned
}
