//! The fixed catalog of engine classes and their per-field rules.
//!
//! Every class the data files are known to contain has one [`ClassEntry`]
//! declaring how it is stored on the wire, how it is presented in documents
//! and which of its fields go through a [`FieldTransform`]. Classes outside the
//! catalog resolve to an inert placeholder entry with no rules.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use crate::error::{CoreError, Result};
use crate::policy::{Policy, VersionSlot};
use crate::structs::LeafKind;

/// How instances of a class are stored on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    /// An ordinary object with named fields.
    Fields,
    /// A custom binary leaf handled by the struct codec.
    Leaf(LeafKind),
    /// Field-wise object or marshal-dumped payload, depending on the dialect.
    Interpreter,
}

/// How instances render in documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    /// Expanded, one field per line.
    Block,
    /// A single inline record.
    Compact,
    /// Compact unless the opcode is the dialect's move-list opcode.
    EventCommand,
}

/// A named field transformation, applied on encode and inverted on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTransform {
    /// Sequence ↔ integer-indexed mapping that skips absent entries.
    SparseIndexMap {
        /// Normalise each string element before indexing.
        reduce_strings: bool,
    },
    /// Mapping with `[map, event, switch]` keys ↔ mapping with `"%03d %03d %s"` keys.
    CompoundKeyMap,
    /// Replaced by the policy's version constant outside round-trip mode.
    VersionId(VersionSlot),
}

/// Which fields of an object a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSelector {
    Named(&'static str),
    Every,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub selector: FieldSelector,
    pub transform: FieldTransform,
}

/// A declared field and the document key it renders under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub key: &'static str,
}

/// Catalog entry for one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassEntry {
    pub name: &'static str,
    pub representation: Representation,
    pub presentation: Presentation,
    /// Declared fields, in declaration order. Empty for classes whose fields
    /// are taken from each instance.
    pub fields: &'static [FieldSpec],
    pub rules: &'static [FieldRule],
}

impl ClassEntry {
    const fn plain(name: &'static str) -> Self {
        Self {
            name,
            representation: Representation::Fields,
            presentation: Presentation::Block,
            fields: &[],
            rules: &[],
        }
    }

    const fn compact(name: &'static str) -> Self {
        Self {
            presentation: Presentation::Compact,
            ..Self::plain(name)
        }
    }

    const fn leaf(
        name: &'static str,
        kind: LeafKind,
        presentation: Presentation,
        fields: &'static [FieldSpec],
    ) -> Self {
        Self {
            name,
            representation: Representation::Leaf(kind),
            presentation,
            fields,
            rules: &[],
        }
    }

    const fn with_rules(name: &'static str, rules: &'static [FieldRule]) -> Self {
        Self {
            rules,
            ..Self::plain(name)
        }
    }

    /// The transform attached to a field, if any.
    pub fn rule_for(&self, field: &str) -> Option<FieldTransform> {
        self.rules.iter().find_map(|rule| match rule.selector {
            FieldSelector::Named(name) if name == field => Some(rule.transform),
            FieldSelector::Every => Some(rule.transform),
            FieldSelector::Named(_) => None,
        })
    }

    /// Document key for a field name.
    pub fn key_for<'a>(&self, field: &'a str) -> &'a str {
        self.fields
            .iter()
            .find(|spec| spec.name == field)
            .map_or(field, |spec| spec.key)
    }

    /// Field name for a document key.
    pub fn field_for<'a>(&self, key: &'a str) -> &'a str {
        self.fields
            .iter()
            .find(|spec| spec.key == key)
            .map_or(key, |spec| spec.name)
    }

    pub fn is_placeholder(&self) -> bool {
        std::ptr::eq(self, &PLACEHOLDER)
    }

    /// Whether instances are stored through the marshal-dump hook.
    pub fn is_user_marshal(&self, policy: &Policy) -> bool {
        self.representation == Representation::Interpreter && policy.interpreter_is_opaque_leaf
    }
}

const fn spec(name: &'static str, key: &'static str) -> FieldSpec {
    FieldSpec { name, key }
}

const fn rule(selector: FieldSelector, transform: FieldTransform) -> FieldRule {
    FieldRule {
        selector,
        transform,
    }
}

pub const TABLE_FIELDS: &[FieldSpec] = &[
    spec("dim", "dim"),
    spec("x", "x"),
    spec("y", "y"),
    spec("z", "z"),
    spec("data", "data"),
];

pub const COLOR_FIELDS: &[FieldSpec] = &[
    spec("red", "r"),
    spec("green", "g"),
    spec("blue", "b"),
    spec("alpha", "a"),
];

pub const TONE_FIELDS: &[FieldSpec] = &[
    spec("red", "r"),
    spec("green", "g"),
    spec("blue", "b"),
    spec("gray", "a"),
];

pub const RECT_FIELDS: &[FieldSpec] = &[
    spec("x", "x"),
    spec("y", "y"),
    spec("width", "width"),
    spec("height", "height"),
];

pub const EVENT_COMMAND_FIELDS: &[FieldSpec] = &[
    spec("indent", "i"),
    spec("code", "c"),
    spec("parameters", "p"),
];

const SPARSE: FieldTransform = FieldTransform::SparseIndexMap {
    reduce_strings: false,
};

const REDUCED_SPARSE: FieldTransform = FieldTransform::SparseIndexMap {
    reduce_strings: true,
};

static PLACEHOLDER: ClassEntry = ClassEntry::plain("");

static CATALOG: &[ClassEntry] = &[
    // Custom binary leaves
    ClassEntry::leaf("Table", LeafKind::Table, Presentation::Block, TABLE_FIELDS),
    ClassEntry::leaf("Color", LeafKind::Color, Presentation::Compact, COLOR_FIELDS),
    ClassEntry::leaf("Tone", LeafKind::Tone, Presentation::Compact, TONE_FIELDS),
    ClassEntry::leaf("Rect", LeafKind::Rect, Presentation::Block, RECT_FIELDS),
    // Database structures
    ClassEntry::plain("RPG::Actor"),
    ClassEntry::plain("RPG::Animation"),
    ClassEntry::plain("RPG::Animation::Frame"),
    ClassEntry::plain("RPG::Animation::Timing"),
    ClassEntry::plain("RPG::Area"),
    ClassEntry::plain("RPG::Armor"),
    ClassEntry::plain("RPG::AudioFile"),
    ClassEntry::plain("RPG::BaseItem"),
    ClassEntry::plain("RPG::BaseItem::Feature"),
    ClassEntry::compact("RPG::BGM"),
    ClassEntry::compact("RPG::BGS"),
    ClassEntry::plain("RPG::Class"),
    ClassEntry::plain("RPG::Class::Learning"),
    ClassEntry::plain("RPG::CommonEvent"),
    ClassEntry::plain("RPG::Enemy"),
    ClassEntry::plain("RPG::Enemy::Action"),
    ClassEntry::plain("RPG::Enemy::DropItem"),
    ClassEntry::plain("RPG::EquipItem"),
    ClassEntry::plain("RPG::Event"),
    ClassEntry::plain("RPG::Event::Page"),
    ClassEntry::plain("RPG::Event::Page::Condition"),
    ClassEntry::plain("RPG::Event::Page::Graphic"),
    ClassEntry {
        presentation: Presentation::EventCommand,
        fields: EVENT_COMMAND_FIELDS,
        ..ClassEntry::plain("RPG::EventCommand")
    },
    ClassEntry::plain("RPG::Item"),
    ClassEntry::plain("RPG::Map"),
    ClassEntry::plain("RPG::Map::Encounter"),
    ClassEntry::plain("RPG::MapInfo"),
    ClassEntry::plain("RPG::ME"),
    ClassEntry::compact("RPG::MoveCommand"),
    ClassEntry::plain("RPG::MoveRoute"),
    ClassEntry::compact("RPG::SE"),
    ClassEntry::plain("RPG::Skill"),
    ClassEntry::plain("RPG::State"),
    ClassEntry::with_rules(
        "RPG::System",
        &[
            rule(FieldSelector::Named("switches"), REDUCED_SPARSE),
            rule(FieldSelector::Named("variables"), REDUCED_SPARSE),
            rule(
                FieldSelector::Named("version_id"),
                FieldTransform::VersionId(VersionSlot::System),
            ),
        ],
    ),
    ClassEntry::plain("RPG::System::Terms"),
    ClassEntry::plain("RPG::System::TestBattler"),
    ClassEntry::plain("RPG::System::Vehicle"),
    ClassEntry::plain("RPG::System::Words"),
    ClassEntry::plain("RPG::Tileset"),
    ClassEntry::plain("RPG::Troop"),
    ClassEntry::plain("RPG::Troop::Member"),
    ClassEntry::plain("RPG::Troop::Page"),
    ClassEntry::plain("RPG::Troop::Page::Condition"),
    ClassEntry::plain("RPG::UsableItem"),
    ClassEntry::plain("RPG::UsableItem::Damage"),
    ClassEntry::plain("RPG::UsableItem::Effect"),
    ClassEntry::plain("RPG::Weapon"),
    // Script classes found in save files
    ClassEntry::plain("Game_ActionResult"),
    ClassEntry::plain("Game_Actor"),
    ClassEntry::plain("Game_Actors"),
    ClassEntry::plain("Game_BaseItem"),
    ClassEntry::plain("Game_BattleAction"),
    ClassEntry::plain("Game_CommonEvent"),
    ClassEntry::plain("Game_Enemy"),
    ClassEntry::plain("Game_Event"),
    ClassEntry::plain("Game_Follower"),
    ClassEntry::plain("Game_Followers"),
    ClassEntry {
        representation: Representation::Interpreter,
        ..ClassEntry::plain("Game_Interpreter")
    },
    ClassEntry::plain("Game_Map"),
    ClassEntry::plain("Game_Message"),
    ClassEntry::plain("Game_Party"),
    ClassEntry::plain("Game_Picture"),
    ClassEntry::plain("Game_Pictures"),
    ClassEntry::plain("Game_Player"),
    ClassEntry::plain("Game_Screen"),
    ClassEntry::with_rules(
        "Game_SelfSwitches",
        &[rule(FieldSelector::Every, FieldTransform::CompoundKeyMap)],
    ),
    ClassEntry::with_rules("Game_Switches", &[rule(FieldSelector::Every, SPARSE)]),
    ClassEntry::with_rules(
        "Game_System",
        &[rule(
            FieldSelector::Named("version_id"),
            FieldTransform::VersionId(VersionSlot::SaveGame),
        )],
    ),
    ClassEntry::plain("Game_Timer"),
    ClassEntry::plain("Game_Troop"),
    ClassEntry::with_rules("Game_Variables", &[rule(FieldSelector::Every, SPARSE)]),
    ClassEntry::plain("Game_Vehicle"),
    ClassEntry::plain("Interpreter"),
];

/// Immutable class lookup built once per run.
#[derive(Debug)]
pub struct Registry {
    classes: HashMap<&'static str, &'static ClassEntry>,
    /// Unknown class names already reported.
    warned: Mutex<HashSet<String>>,
}

impl Clone for Registry {
    fn clone(&self) -> Self {
        let warned = self
            .warned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Self {
            classes: self.classes.clone(),
            warned: Mutex::new(warned),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

impl Registry {
    /// The full engine catalog.
    pub fn standard() -> Self {
        let classes = CATALOG.iter().map(|entry| (entry.name, entry)).collect();
        Self {
            classes,
            warned: Mutex::new(HashSet::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Look up a class, failing for names outside the catalog.
    pub fn lookup(&self, class: &str) -> Result<&'static ClassEntry> {
        self.classes
            .get(class)
            .copied()
            .ok_or_else(|| CoreError::UnrecognizedClass {
                class: class.to_string(),
            })
    }

    /// Look up a class, degrading unknown names to the placeholder entry.
    /// Each unknown name is reported once.
    pub fn resolve(&self, class: &str) -> &'static ClassEntry {
        self.lookup(class).unwrap_or_else(|err| {
            if self.first_sighting(class) {
                log::warn!("{err}; treating it as a plain object");
            }
            &PLACEHOLDER
        })
    }

    fn first_sighting(&self, class: &str) -> bool {
        let mut warned = self.warned.lock().unwrap_or_else(PoisonError::into_inner);
        warned.insert(class.to_string())
    }

    /// The struct layout for a custom-leaf class.
    pub fn leaf_kind(&self, class: &str) -> Option<LeafKind> {
        match self.classes.get(class)?.representation {
            Representation::Leaf(kind) => Some(kind),
            _ => None,
        }
    }
}
