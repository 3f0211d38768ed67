//! YAML document codec for RGSS data files.
//!
//! Converts the shared object graph to and from human-editable text. Each
//! document is self-describing: class names, symbols, bignums and strings in
//! a foreign encoding carry a tag, so decoding needs only the registry and
//! the dialect policy.
//!
//! ```text
//! --- !ruby/object:RPG::System
//! switches:
//!   1: Door opened
//!   12: Boss beaten
//! version_id: 12345678
//! title_bgm: !ruby/object:RPG::BGM {name: Theme, pitch: 100, volume: 100}
//! ```
//!
//! Shared and cyclic references are expanded into copies before rendering;
//! a cycle fails with [`rgss_core::CoreError::CyclicReference`].

mod decode;
mod emit;
mod encode;
mod error;
mod table;
pub mod tags;

use rgss_core::{resolve_references, Policy, Registry, Value};

pub use error::{Result, YamlError};
pub use table::{parse_rows, table_rows};

use decode::Decoder;
use encode::Encoder;

/// Layout settings that do not change the decoded value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentOptions {
    /// Maximum cells per `Table` row; `None` keeps whole rows.
    pub table_width: Option<usize>,
}

/// Render a value tree as a YAML document.
pub fn to_document(
    root: &Value,
    registry: &Registry,
    policy: &Policy,
    options: &DocumentOptions,
) -> Result<String> {
    let expanded = resolve_references(root)?;
    let encoder = Encoder {
        registry,
        policy,
        options,
    };
    let node = encoder.node(&expanded)?;
    let text = emit::emit_document(&node);
    log::debug!("rendered {} document bytes", text.len());
    Ok(text)
}

/// Parse a YAML document back into a value tree.
pub fn from_document(text: &str, registry: &Registry, policy: &Policy) -> Result<Value> {
    let document: serde_yaml::Value = serde_yaml::from_str(text)?;
    Decoder { registry, policy }.value(&document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgss_core::value::{Hash, Object, ObjectId};
    use rgss_core::{CoreError, Dialect};

    fn ace() -> Policy {
        Policy::resolve(Dialect::Ace, false)
    }

    #[test]
    fn shared_values_are_copied() {
        let root = Value::Array(vec![
            Value::Array(vec![Value::Int(1)]),
            Value::Ref(ObjectId(1)),
        ]);
        let registry = Registry::standard();
        let text = to_document(&root, &registry, &ace(), &DocumentOptions::default()).unwrap();
        assert_eq!(text, "---\n- - 1\n- - 1\n");
    }

    #[test]
    fn cycles_are_rejected() {
        let root = Value::Array(vec![Value::Ref(ObjectId(0))]);
        let registry = Registry::standard();
        assert!(matches!(
            to_document(&root, &registry, &ace(), &DocumentOptions::default()),
            Err(YamlError::Core(CoreError::CyclicReference(_)))
        ));
    }

    #[test]
    fn scalars_survive() {
        let registry = Registry::standard();
        let policy = ace();
        let root = Value::Hash(Hash::new(vec![
            (Value::symbol("s"), Value::Nil),
            (Value::Int(1), Value::Float(0.5)),
            (Value::str("t"), Value::Bool(false)),
        ]));
        let text = to_document(&root, &registry, &policy, &DocumentOptions::default()).unwrap();
        assert_eq!(from_document(&text, &registry, &policy).unwrap(), root);
    }

    #[test]
    fn foreign_tags_fail() {
        let registry = Registry::standard();
        assert!(matches!(
            from_document("--- !ruby/range 1..2\n", &registry, &ace()),
            Err(YamlError::UnknownTag { .. })
        ));
    }

    #[test]
    fn unknown_classes_keep_fields() {
        let registry = Registry::standard();
        let policy = ace();
        let root = Value::Object(Object::new("Game_Quest", vec![("id".into(), Value::Int(3))]));
        let text = to_document(&root, &registry, &policy, &DocumentOptions::default()).unwrap();
        assert_eq!(text, "--- !ruby/object:Game_Quest\nid: 3\n");
        assert_eq!(from_document(&text, &registry, &policy).unwrap(), root);
    }
}
