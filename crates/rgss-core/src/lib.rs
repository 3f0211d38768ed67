//! Core model for RGSS game data files.
//!
//! This crate holds everything the binary and document codecs share:
//!
//! - [`value`]: the object graph (scalars, sequences, mappings, tagged
//!   objects, custom binary leaves and references).
//! - [`structs`]: byte-exact layouts of `Table`, `Color`, `Tone` and `Rect`.
//! - [`registry`]: the fixed class catalog and its per-field rules.
//! - [`rules`]: the field transformations themselves.
//! - [`policy`]: the three engine dialects and the behaviour record they
//!   resolve to.
//! - [`graph`]: the encounter-order object table and reference expansion.

pub mod error;
pub mod graph;
pub mod policy;
pub mod registry;
pub mod rules;
pub mod structs;
pub mod value;

pub use error::{CoreError, Result};
pub use graph::{resolve_references, ObjectTable};
pub use policy::{Dialect, FieldOrdering, Policy, VersionSlot};
pub use registry::{ClassEntry, FieldTransform, Presentation, Registry, Representation};
pub use structs::{Color, Leaf, LeafKind, Rect, Table, Tone};
pub use value::{BigInt, Encoding, Hash, Object, ObjectId, RString, UserMarshal, Value};
