//! Per-dungeon document persistence.
//!
//! Every dungeon owns five independent JSON documents, each stored under its
//! own key. The key layout is the one the JS companion always used, so data
//! already sitting in a visitor's localStorage keeps working:
//!
//! ```text
//! dungeon-{slug}     → Grid (28 × 20 cells)
//! characters-{slug}  → [Character]
//! encounters-{slug}  → [Encounter]
//! log-{slug}         → [LogEntry]
//! position-{slug}    → {row, col} | null
//! ```
//!
//! Uses `thread_local!` + `RefCell` for the single-threaded WASM worker,
//! the same way the game state is held.

pub mod memory;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{CompanionError, Result};
use crate::game::session::SessionId;

pub use memory::{MemoryStore, PendingWrite};

/// Synchronous string key/value storage (localStorage semantics).
pub trait KvStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn keys(&self) -> Vec<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentKind {
    Grid,
    Characters,
    Encounters,
    Log,
    Position,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 5] = [
        DocumentKind::Grid,
        DocumentKind::Characters,
        DocumentKind::Encounters,
        DocumentKind::Log,
        DocumentKind::Position,
    ];

    fn prefix(self) -> &'static str {
        match self {
            DocumentKind::Grid => "dungeon-",
            DocumentKind::Characters => "characters-",
            DocumentKind::Encounters => "encounters-",
            DocumentKind::Log => "log-",
            DocumentKind::Position => "position-",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DocumentKind::Grid => "grid",
            DocumentKind::Characters => "characters",
            DocumentKind::Encounters => "encounters",
            DocumentKind::Log => "log",
            DocumentKind::Position => "position",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Storage key of `kind` for the dungeon `slug`.
pub fn storage_key(kind: DocumentKind, slug: &SessionId) -> String {
    format!("{}{}", kind.prefix(), slug.as_str())
}

/// Invert `storage_key`. Keys that belong to no document (e.g. `theme`) or
/// whose slug is not valid yield `None`.
pub fn parse_key(key: &str) -> Option<(DocumentKind, SessionId)> {
    DocumentKind::ALL.iter().find_map(|&kind| {
        key.strip_prefix(kind.prefix())
            .and_then(|slug| SessionId::parse(slug).ok())
            .map(|slug| (kind, slug))
    })
}

/// Load and decode one document. `Ok(None)` when nothing is stored yet.
pub fn load_document<T, S>(store: &S, kind: DocumentKind, slug: &SessionId) -> Result<Option<T>>
where
    T: DeserializeOwned,
    S: KvStore + ?Sized,
{
    let Some(raw) = store.get(&storage_key(kind, slug)) else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| {
            tracing::warn!(%kind, slug = slug.as_str(), "corrupt stored document");
            CompanionError::CorruptDocument {
                kind,
                slug: slug.to_string(),
                source,
            }
        })
}

/// Encode and overwrite one document.
pub fn save_document<T, S>(store: &mut S, kind: DocumentKind, slug: &SessionId, doc: &T) -> Result<()>
where
    T: Serialize + ?Sized,
    S: KvStore + ?Sized,
{
    let json = serde_json::to_string(doc)?;
    store.set(&storage_key(kind, slug), json);
    Ok(())
}

/// Every stored document of `kind`, across all dungeons, as raw JSON.
pub fn list_documents<S>(store: &S, kind: DocumentKind) -> Vec<(SessionId, String)>
where
    S: KvStore + ?Sized,
{
    store
        .keys()
        .into_iter()
        .filter_map(|key| match parse_key(&key) {
            Some((k, slug)) if k == kind => store.get(&key).map(|raw| (slug, raw)),
            _ => None,
        })
        .collect()
}

/// Every dungeon that has at least one stored document, sorted by slug.
pub fn list_sessions<S>(store: &S) -> Vec<SessionId>
where
    S: KvStore + ?Sized,
{
    let slugs: BTreeSet<SessionId> = store
        .keys()
        .iter()
        .filter_map(|key| parse_key(key).map(|(_, slug)| slug))
        .collect();
    slugs.into_iter().collect()
}

thread_local! {
    static STORE: RefCell<MemoryStore> = RefCell::new(MemoryStore::new());
}

/// Execute a closure with read access to the store.
pub fn with_store<F, R>(f: F) -> R
where
    F: FnOnce(&MemoryStore) -> R,
{
    STORE.with(|s| f(&s.borrow()))
}

/// Execute a closure with mutable access to the store.
pub fn with_store_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut MemoryStore) -> R,
{
    STORE.with(|s| f(&mut s.borrow_mut()))
}

/// Drop every entry (tests, and the bridge before a fresh hydrate).
pub fn reset_store() {
    STORE.with(|s| *s.borrow_mut() = MemoryStore::new());
}
