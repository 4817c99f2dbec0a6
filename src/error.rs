//! Crate-wide error type.
//!
//! Route handlers never propagate these to the bridge: they render them as a
//! red error fragment in place of the panel that failed.

use thiserror::Error;

use crate::store::DocumentKind;

#[derive(Debug, Error)]
pub enum CompanionError {
    #[error("stored {kind} document for dungeon `{slug}` is corrupt: {source}")]
    CorruptDocument {
        kind: DocumentKind,
        slug: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("missing or invalid `{0}` parameter")]
    MissingParam(&'static str),

    #[error("invalid dungeon slug `{0}`")]
    InvalidSlug(String),

    #[error("cell ({row}, {col}) is outside the dungeon map")]
    CellOutOfBounds { row: usize, col: usize },

    #[error("no character in slot {0}")]
    SlotOutOfRange(usize),

    #[error("no spell at index {0}")]
    SpellOutOfRange(usize),

    #[error("no encounter at index {0}")]
    EncounterOutOfRange(usize),

    #[error("no log entry with id {0}")]
    LogEntryNotFound(i64),

    #[error("character `{id}` is no longer in `{key}`")]
    MigrationSourceMissing { id: String, key: String },

    #[error("unknown die `{0}` (expected d6, 2d6 or d66)")]
    UnknownDie(String),

    #[error("unknown {what} `{value}`")]
    UnknownValue { what: &'static str, value: String },

    #[error("invalid backup bundle: {0}")]
    InvalidBundle(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CompanionError>;
