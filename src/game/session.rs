//! A dungeon session: the five documents stored under one slug.
//!
//! Sessions are created implicitly: opening a slug with nothing stored
//! yields default documents, which are written back on the first change.
//! Documents are saved one at a time; there is no transaction spanning them.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CompanionError, Result};
use crate::game::adventure_log::LogEntry;
use crate::game::character::{self, Character};
use crate::game::encounter::Encounter;
use crate::game::grid::{Grid, Position};
use crate::store::{self, DocumentKind, KvStore};

const MAX_SLUG_LEN: usize = 64;
const SLUG_ATTEMPTS_PER_LENGTH: usize = 32;
const SLUG_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Opaque dungeon identifier taken from `/dungeon/{slug}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn parse(slug: &str) -> Result<Self> {
        let valid = !slug.is_empty()
            && slug.len() <= MAX_SLUG_LEN
            && slug
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if valid {
            Ok(Self(slug.to_string()))
        } else {
            Err(CompanionError::InvalidSlug(slug.to_string()))
        }
    }

    /// Random lowercase base-36 slug.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, len: usize) -> Self {
        let slug = (0..len.clamp(1, MAX_SLUG_LEN))
            .map(|_| SLUG_ALPHABET[rng.gen_range(0..SLUG_ALPHABET.len())] as char)
            .collect();
        Self(slug)
    }

    /// Random slug not in `taken`. After a run of collisions the slug grows
    /// by one character, so a crowded short length cannot stall.
    pub fn generate_unused<R: Rng + ?Sized>(rng: &mut R, len: usize, taken: &[SessionId]) -> Self {
        let mut len = len.clamp(1, MAX_SLUG_LEN);
        loop {
            for _ in 0..SLUG_ATTEMPTS_PER_LENGTH {
                let id = Self::generate(rng, len);
                if !taken.contains(&id) {
                    return id;
                }
            }
            if len < MAX_SLUG_LEN {
                len += 1;
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Storage key of this dungeon's character roster; doubles as the
    /// `key` field of every character living in it.
    pub fn roster_key(&self) -> String {
        store::storage_key(DocumentKind::Characters, self)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// All five documents of one dungeon, for backup files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SessionBundle {
    grid: Grid,
    characters: Vec<Character>,
    #[serde(default)]
    encounters: Vec<Encounter>,
    #[serde(default)]
    log: Vec<LogEntry>,
    #[serde(default)]
    position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: SessionId,
    pub grid: Grid,
    pub characters: Vec<Character>,
    pub encounters: Vec<Encounter>,
    pub log: Vec<LogEntry>,
    pub position: Option<Position>,
}

impl Session {
    /// Fresh documents for `id`.
    pub fn new(id: SessionId, roster_size: usize) -> Self {
        let characters = character::default_roster(&id.roster_key(), roster_size);
        Self {
            id,
            grid: Grid::default(),
            characters,
            encounters: Vec::new(),
            log: Vec::new(),
            position: None,
        }
    }

    /// Load every document for `id`, defaulting the ones not stored yet.
    /// Characters saved before ids existed get an id and roster key.
    pub fn open<S: KvStore + ?Sized>(store: &S, id: SessionId, roster_size: usize) -> Result<Self> {
        let mut session = Self::new(id, roster_size);
        if let Some(grid) = store::load_document(store, DocumentKind::Grid, &session.id)? {
            session.grid = grid;
        }
        if let Some(characters) = store::load_document(store, DocumentKind::Characters, &session.id)? {
            session.characters = characters;
        }
        if let Some(encounters) = store::load_document(store, DocumentKind::Encounters, &session.id)? {
            session.encounters = encounters;
        }
        if let Some(log) = store::load_document(store, DocumentKind::Log, &session.id)? {
            session.log = log;
        }
        if let Some(position) = store::load_document::<Option<Position>, _>(store, DocumentKind::Position, &session.id)? {
            session.position = position;
        }

        let key = session.id.roster_key();
        for c in &mut session.characters {
            if c.id.is_none() {
                c.id = Some(uuid::Uuid::new_v4().to_string());
            }
            if c.key.is_none() {
                c.key = Some(key.clone());
            }
        }
        Ok(session)
    }

    pub fn character_mut(&mut self, slot: usize) -> Result<&mut Character> {
        self.characters
            .get_mut(slot)
            .ok_or(CompanionError::SlotOutOfRange(slot))
    }

    pub fn encounter_mut(&mut self, index: usize) -> Result<&mut Encounter> {
        self.encounters
            .get_mut(index)
            .ok_or(CompanionError::EncounterOutOfRange(index))
    }

    pub fn save_grid<S: KvStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        store::save_document(store, DocumentKind::Grid, &self.id, &self.grid)
    }

    pub fn save_characters<S: KvStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        store::save_document(store, DocumentKind::Characters, &self.id, &self.characters)
    }

    pub fn save_encounters<S: KvStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        store::save_document(store, DocumentKind::Encounters, &self.id, &self.encounters)
    }

    pub fn save_log<S: KvStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        store::save_document(store, DocumentKind::Log, &self.id, &self.log)
    }

    pub fn save_position<S: KvStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        store::save_document(store, DocumentKind::Position, &self.id, &self.position)
    }

    /// Encode every document as URL-safe base64 JSON.
    pub fn export_bundle(&self) -> Result<String> {
        let bundle = SessionBundle {
            grid: self.grid.clone(),
            characters: self.characters.clone(),
            encounters: self.encounters.clone(),
            log: self.log.clone(),
            position: self.position,
        };
        let json = serde_json::to_vec(&bundle)?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    /// Decode a backup into a session for `id`. Imported characters are
    /// re-keyed to `id`'s roster.
    pub fn import_bundle(id: SessionId, encoded: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded.trim())
            .map_err(|e| CompanionError::InvalidBundle(format!("base64 decode error: {}", e)))?;
        let bundle: SessionBundle = serde_json::from_slice(&bytes)
            .map_err(|e| CompanionError::InvalidBundle(e.to_string()))?;
        let key = id.roster_key();
        let mut characters = bundle.characters;
        for c in &mut characters {
            c.key = Some(key.clone());
            if c.id.is_none() {
                c.id = Some(uuid::Uuid::new_v4().to_string());
            }
        }
        Ok(Self {
            id,
            grid: bundle.grid,
            characters,
            encounters: bundle.encounters,
            log: bundle.log,
            position: bundle.position,
        })
    }

    pub fn save_all<S: KvStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        self.save_grid(store)?;
        self.save_characters(store)?;
        self.save_encounters(store)?;
        self.save_log(store)?;
        self.save_position(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::grid::Cell;
    use crate::store::MemoryStore;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn slug_validation() {
        assert!(SessionId::parse("abc123").is_ok());
        assert!(SessionId::parse("a-b_c").is_ok());
        assert!(SessionId::parse("").is_err());
        assert!(SessionId::parse("a/b").is_err());
        assert!(SessionId::parse("<script>").is_err());
        assert!(SessionId::parse(&"x".repeat(65)).is_err());
    }

    #[test]
    fn unused_slug_grows_when_length_is_exhausted() {
        let mut rng = StdRng::seed_from_u64(3);
        let taken: Vec<SessionId> = SLUG_ALPHABET
            .iter()
            .map(|&b| SessionId((b as char).to_string()))
            .collect();
        let id = SessionId::generate_unused(&mut rng, 1, &taken);
        assert_eq!(id.as_str().len(), 2);
        assert!(!taken.contains(&id));

        let id = SessionId::generate_unused(&mut rng, 8, &taken);
        assert_eq!(id.as_str().len(), 8);
    }

    #[test]
    fn generated_slug_is_base36() {
        let mut rng = StdRng::seed_from_u64(9);
        let id = SessionId::generate(&mut rng, 8);
        assert_eq!(id.as_str().len(), 8);
        assert!(id.as_str().bytes().all(|b| SLUG_ALPHABET.contains(&b)));
        assert!(SessionId::parse(id.as_str()).is_ok());
    }

    #[test]
    fn fresh_session_scenario() {
        let store = MemoryStore::new();
        let s = Session::open(&store, SessionId::parse("abc123").unwrap(), 4).unwrap();
        assert_eq!(s.grid.row_count(), 28);
        assert_eq!(s.grid.col_count(), 20);
        assert!(s.grid.rows().flatten().all(|c| *c == Cell::default()));
        assert_eq!(s.characters.len(), 4);
        for c in &s.characters {
            assert_eq!(c.current_life, 0);
            assert_eq!(c.full_life, 0);
            assert_eq!(c.equipment, vec!["bandage".to_string()]);
            assert_eq!(c.key.as_deref(), Some("characters-abc123"));
        }
        assert!(s.encounters.is_empty());
        assert!(s.log.is_empty());
        assert!(s.position.is_none());
    }

    #[test]
    fn open_does_not_write() {
        let mut store = MemoryStore::new();
        Session::open(&store, SessionId::parse("a").unwrap(), 4).unwrap();
        assert!(store.take_pending().is_empty());
    }

    #[test]
    fn save_and_reopen() {
        let mut store = MemoryStore::new();
        let id = SessionId::parse("xyz").unwrap();
        let mut s = Session::open(&store, id.clone(), 4).unwrap();
        s.grid.set_filled(1, 1, true).unwrap();
        s.position = Some(Position { row: 1, col: 1 });
        s.encounters.push(Encounter::default());
        s.characters[0].name = "Ragnar".to_string();
        s.save_all(&mut store).unwrap();

        let reopened = Session::open(&store, id, 4).unwrap();
        assert_eq!(reopened, s);
    }

    #[test]
    fn legacy_characters_get_identity() {
        let mut store = MemoryStore::new();
        store.set("characters-old", r#"[{"name":"Bob","class":"Rogue"}]"#.to_string());
        let s = Session::open(&store, SessionId::parse("old").unwrap(), 4).unwrap();
        assert_eq!(s.characters.len(), 1);
        assert!(s.characters[0].id.is_some());
        assert_eq!(s.characters[0].key.as_deref(), Some("characters-old"));
    }

    #[test]
    fn corrupt_document_surfaces_error() {
        let mut store = MemoryStore::new();
        store.set("dungeon-bad", "[[".to_string());
        let err = Session::open(&store, SessionId::parse("bad").unwrap(), 4).unwrap_err();
        assert!(matches!(err, CompanionError::CorruptDocument { kind: DocumentKind::Grid, .. }));
    }

    #[test]
    fn bundle_moves_to_new_slug() {
        let mut s = Session::new(SessionId::parse("from").unwrap(), 2);
        s.grid.set_filled(0, 0, true).unwrap();
        s.characters[1].name = "Ada".to_string();
        s.position = Some(Position { row: 0, col: 0 });
        let encoded = s.export_bundle().unwrap();

        let restored = Session::import_bundle(SessionId::parse("to").unwrap(), &encoded).unwrap();
        assert_eq!(restored.grid, s.grid);
        assert_eq!(restored.position, s.position);
        assert_eq!(restored.characters[1].name, "Ada");
        assert_eq!(restored.characters[1].id, s.characters[1].id);
        assert_eq!(restored.characters[1].key.as_deref(), Some("characters-to"));
    }

    #[test]
    fn bundle_rejects_garbage() {
        let id = SessionId::parse("to").unwrap();
        assert!(matches!(Session::import_bundle(id.clone(), "!!!"), Err(CompanionError::InvalidBundle(_))));
        let not_a_bundle = URL_SAFE_NO_PAD.encode(b"{\"grid\":1}");
        assert!(matches!(Session::import_bundle(id, &not_a_bundle), Err(CompanionError::InvalidBundle(_))));
    }

    #[test]
    fn slot_out_of_range() {
        let mut s = Session::new(SessionId::parse("a").unwrap(), 4);
        assert!(s.character_mut(3).is_ok());
        assert!(matches!(s.character_mut(4), Err(CompanionError::SlotOutOfRange(4))));
        assert!(s.encounter_mut(0).is_err());
    }
}
