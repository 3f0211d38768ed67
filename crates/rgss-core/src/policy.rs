//! Engine dialects and the behaviour record each one resolves to.
//!
//! Nothing outside this module matches on [`Dialect`] directly: every
//! dialect-sensitive decision reads a field of [`Policy`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::value::Encoding;

/// `version_id` written into `RPG::System` outside round-trip mode.
pub const SYSTEM_VERSION_ID: i64 = 12_345_678;

/// `version_id` written into `Game_System` outside round-trip mode. Must
/// differ from [`SYSTEM_VERSION_ID`] so a save file never looks current.
pub const SAVE_VERSION_ID: i64 = 87_654_321;

/// The three engine generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Xp,
    Vx,
    Ace,
}

impl Dialect {
    /// Data file extension used by this dialect, with the leading dot.
    pub fn data_extension(self) -> &'static str {
        match self {
            Dialect::Xp => ".rxdata",
            Dialect::Vx => ".rvdata",
            Dialect::Ace => ".rvdata2",
        }
    }

    /// Identify a dialect from a data file extension (with or without dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.') {
            "rxdata" => Some(Dialect::Xp),
            "rvdata" => Some(Dialect::Vx),
            "rvdata2" => Some(Dialect::Ace),
            _ => None,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Dialect::Xp => "xp",
            Dialect::Vx => "vx",
            Dialect::Ace => "ace",
        })
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xp" => Ok(Dialect::Xp),
            "vx" => Ok(Dialect::Vx),
            "ace" | "vxace" => Ok(Dialect::Ace),
            other => Err(format!("unknown dialect '{other}' (expected xp, vx or ace)")),
        }
    }
}

/// How tagged-object fields and plain mappings are ordered in documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOrdering {
    /// Keep the stored order.
    Declared,
    Alphabetical,
}

/// Which class a remapped `version_id` belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionSlot {
    /// `RPG::System`, the project database.
    System,
    /// `Game_System`, inside save files.
    SaveGame,
}

/// Behaviour record resolved once per conversion run.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    pub dialect: Dialect,
    pub field_ordering: FieldOrdering,
    /// Event-command opcode whose parameters hold a move route.
    pub move_list_opcode: i64,
    /// `Game_Interpreter` is stored through its marshal-dump hook.
    pub interpreter_is_opaque_leaf: bool,
    /// `(System, SaveGame)` version ids.
    pub version_id_constants: (i64, i64),
    /// Disable the lossy normalisations so repeated conversions are stable.
    pub round_trip: bool,
    /// Encoding given to plain document strings.
    pub string_encoding: Encoding,
}

impl Policy {
    pub fn resolve(dialect: Dialect, round_trip: bool) -> Self {
        let ace = dialect == Dialect::Ace;
        Self {
            dialect,
            field_ordering: if ace {
                FieldOrdering::Declared
            } else {
                FieldOrdering::Alphabetical
            },
            move_list_opcode: if dialect == Dialect::Xp { 209 } else { 205 },
            interpreter_is_opaque_leaf: ace,
            version_id_constants: (SYSTEM_VERSION_ID, SAVE_VERSION_ID),
            round_trip,
            string_encoding: if ace {
                Encoding::Utf8
            } else {
                Encoding::Binary
            },
        }
    }

    pub fn version_id(&self, slot: VersionSlot) -> i64 {
        match slot {
            VersionSlot::System => self.version_id_constants.0,
            VersionSlot::SaveGame => self.version_id_constants.1,
        }
    }
}
