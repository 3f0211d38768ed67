//! The encounter-order object table over a decoded tree.
//!
//! The binary reader numbers every object it materializes and turns repeated
//! encounters into [`Value::Ref`]. [`ObjectTable::build`] walks a tree in the
//! same order the writer emits it, so the ids it assigns line up with the ones
//! the reader handed out. The document side uses it to expand references into
//! copies, since the document format has no notion of identity.

use std::collections::{HashMap, HashSet};

use crate::error::{CoreError, Result};
use crate::structs::Leaf;
use crate::value::{is_fixnum, Encoding, Hash, Object, ObjectId, RString, UserMarshal, Value};

/// One slot of the object table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Entry<'a> {
    /// A node of the tree.
    Node(&'a Value),
    /// The name string written the first time a named encoding is used.
    EncodingName(&'a str),
}

/// Ids assigned to the nodes of one tree, in wire order.
#[derive(Debug, Default)]
pub struct ObjectTable<'a> {
    entries: Vec<Entry<'a>>,
    /// Node address to id, for spotting a reference back into an ancestor.
    ids: HashMap<*const Value, ObjectId>,
}

impl<'a> ObjectTable<'a> {
    pub fn build(root: &'a Value) -> Self {
        let mut table = Self::default();
        let mut encodings = HashSet::new();
        table.visit(root, &mut encodings);
        table
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: ObjectId) -> Option<Entry<'a>> {
        self.entries.get(id.0).copied()
    }

    fn register(&mut self, value: &'a Value) {
        let id = ObjectId(self.entries.len());
        self.entries.push(Entry::Node(value));
        self.ids.insert(value as *const Value, id);
    }

    fn register_encoding(&mut self, encoding: &'a Encoding, seen: &mut HashSet<&'a str>) {
        if let Encoding::Named(name) = encoding {
            if seen.insert(name.as_str()) {
                self.entries.push(Entry::EncodingName(name));
            }
        }
    }

    fn visit(&mut self, value: &'a Value, seen: &mut HashSet<&'a str>) {
        match value {
            Value::Nil | Value::Bool(_) | Value::Symbol(_) | Value::Ref(_) => {}
            Value::Int(i) => {
                if !is_fixnum(*i) {
                    self.register(value);
                }
            }
            Value::BigInt(_) | Value::Float(_) => self.register(value),
            Value::String(s) => {
                self.register(value);
                self.register_encoding(&s.encoding, seen);
            }
            Value::Array(items) => {
                self.register(value);
                for item in items {
                    self.visit(item, seen);
                }
            }
            Value::Hash(hash) => {
                self.register(value);
                for (k, v) in &hash.entries {
                    self.visit(k, seen);
                    self.visit(v, seen);
                }
                if let Some(default) = &hash.default {
                    self.visit(default, seen);
                }
            }
            Value::Object(object) => {
                self.register(value);
                for (_, field) in &object.fields {
                    self.visit(field, seen);
                }
            }
            Value::UserMarshal(user) => {
                self.register(value);
                self.visit(&user.data, seen);
            }
            Value::Leaf(leaf) => {
                // The blob's encoding marker is written before the leaf is numbered.
                if let Leaf::Opaque { data, .. } = leaf {
                    self.register_encoding(&data.encoding, seen);
                }
                self.register(value);
            }
        }
    }

    /// Copy `value`, replacing every reference with a copy of its target.
    pub fn resolve(&self, value: &Value) -> Result<Value> {
        let mut active = Vec::new();
        self.expand(value, &mut active)
    }

    fn expand(&self, value: &Value, active: &mut Vec<ObjectId>) -> Result<Value> {
        let own_id = self.ids.get(&(value as *const Value)).copied();
        if let Some(id) = own_id {
            active.push(id);
        }
        let result = self.expand_inner(value, active);
        if own_id.is_some() {
            active.pop();
        }
        result
    }

    fn expand_inner(&self, value: &Value, active: &mut Vec<ObjectId>) -> Result<Value> {
        Ok(match value {
            Value::Ref(id) => {
                if active.contains(id) {
                    return Err(CoreError::CyclicReference(*id));
                }
                match self.get(*id) {
                    Some(Entry::Node(target)) => self.expand(target, active)?,
                    Some(Entry::EncodingName(name)) => Value::String(RString::binary(name.as_bytes().to_vec())),
                    None => return Err(CoreError::DanglingReference(*id)),
                }
            }
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.expand(item, active))
                    .collect::<Result<_>>()?,
            ),
            Value::Hash(hash) => {
                let mut entries = Vec::with_capacity(hash.entries.len());
                for (k, v) in &hash.entries {
                    entries.push((self.expand(k, active)?, self.expand(v, active)?));
                }
                let default = match &hash.default {
                    Some(d) => Some(Box::new(self.expand(d, active)?)),
                    None => None,
                };
                Value::Hash(Hash { entries, default })
            }
            Value::Object(object) => {
                let mut fields = Vec::with_capacity(object.fields.len());
                for (name, field) in &object.fields {
                    fields.push((name.clone(), self.expand(field, active)?));
                }
                Value::Object(Object::new(object.class.clone(), fields))
            }
            Value::UserMarshal(user) => Value::UserMarshal(UserMarshal {
                class: user.class.clone(),
                data: Box::new(self.expand(&user.data, active)?),
            }),
            other => other.clone(),
        })
    }
}

/// Expand every reference in a decoded tree.
pub fn resolve_references(root: &Value) -> Result<Value> {
    ObjectTable::build(root).resolve(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::Color;

    #[test]
    fn numbering_follows_wire_order() {
        // [obj, "s", 1.5, 7, 2**40]
        let root = Value::Array(vec![
            Value::Object(Object::new("RPG::SE", vec![("name".into(), Value::str("a"))])),
            Value::String(RString::binary(b"s".to_vec())),
            Value::Float(1.5),
            Value::Int(7),
            Value::Int(1 << 40),
        ]);
        let table = ObjectTable::build(&root);
        // array, object, "a", "s", 1.5, 2**40
        assert_eq!(table.len(), 6);
        assert_eq!(table.get(ObjectId(2)), Some(Entry::Node(&Value::str("a"))));
        assert_eq!(table.get(ObjectId(5)), Some(Entry::Node(&Value::Int(1 << 40))));
    }

    #[test]
    fn named_encoding_registered_once() {
        let sjis = |s: &str| {
            Value::String(RString::new(
                s.as_bytes().to_vec(),
                Encoding::Named("Shift_JIS".into()),
            ))
        };
        let root = Value::Array(vec![sjis("a"), sjis("b")]);
        let table = ObjectTable::build(&root);
        // array, "a", "Shift_JIS", "b"
        assert_eq!(table.len(), 4);
        assert_eq!(table.get(ObjectId(2)), Some(Entry::EncodingName("Shift_JIS")));
    }

    #[test]
    fn leaf_numbered_after_payload() {
        let root = Value::Array(vec![
            Value::Leaf(Leaf::Color(Color {
                red: 0.0,
                green: 0.0,
                blue: 0.0,
                alpha: 255.0,
            })),
            Value::Ref(ObjectId(1)),
        ]);
        let expanded = resolve_references(&root).unwrap();
        match expanded {
            Value::Array(items) => assert_eq!(items[0], items[1]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn shared_references_are_copied() {
        let root = Value::Array(vec![
            Value::Array(vec![Value::Int(1)]),
            Value::Ref(ObjectId(1)),
            Value::Hash(Hash::new(vec![(Value::Ref(ObjectId(1)), Value::Nil)])),
        ]);
        let expanded = resolve_references(&root).unwrap();
        let inner = Value::Array(vec![Value::Int(1)]);
        assert_eq!(
            expanded,
            Value::Array(vec![
                inner.clone(),
                inner.clone(),
                Value::Hash(Hash::new(vec![(inner, Value::Nil)])),
            ])
        );
    }

    #[test]
    fn cycles_are_rejected() {
        let root = Value::Array(vec![Value::Ref(ObjectId(0))]);
        assert_eq!(
            resolve_references(&root),
            Err(CoreError::CyclicReference(ObjectId(0)))
        );

        let nested = Value::Array(vec![Value::Array(vec![Value::Ref(ObjectId(0))])]);
        assert!(matches!(
            resolve_references(&nested),
            Err(CoreError::CyclicReference(_))
        ));
    }

    #[test]
    fn dangling_reference() {
        let root = Value::Array(vec![Value::Ref(ObjectId(9))]);
        assert_eq!(
            resolve_references(&root),
            Err(CoreError::DanglingReference(ObjectId(9)))
        );
    }
}
