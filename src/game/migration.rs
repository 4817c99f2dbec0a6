//! Moving a character from one dungeon into another.
//!
//! The move is destructive: the source roster keeps its slot (same `id` and
//! `key`) but the sheet is wiped back to a blank placeholder. Nothing guards
//! against two tabs importing the same character at once; the last write to
//! storage wins.

use crate::error::{CompanionError, Result};
use crate::game::character::Character;
use crate::game::session::{Session, SessionId};
use crate::store::{self, DocumentKind, KvStore};

/// A character stored in another dungeon that can be pulled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportCandidate {
    pub source: SessionId,
    pub character: Character,
}

impl ImportCandidate {
    /// Label shown in the migration picker.
    pub fn label(&self) -> String {
        format!("{} {} Level: {}", self.character.name, self.character.class, self.character.level)
    }
}

/// Every named, identified character stored outside the dungeon `current`.
/// Rosters that fail to parse are skipped.
pub fn import_candidates<S: KvStore + ?Sized>(store: &S, current: &SessionId) -> Vec<ImportCandidate> {
    let current_key = current.roster_key();
    store::list_documents(store, DocumentKind::Characters)
        .into_iter()
        .filter_map(|(source, raw)| match serde_json::from_str::<Vec<Character>>(&raw) {
            Ok(roster) => Some((source, roster)),
            Err(e) => {
                tracing::warn!(slug = source.as_str(), error = %e, "skipping unreadable roster");
                None
            }
        })
        .flat_map(|(source, roster)| {
            roster
                .into_iter()
                .map(move |character| ImportCandidate {
                    source: source.clone(),
                    character,
                })
        })
        .filter(|c| {
            !c.character.has_placeholder_name()
                && c.character.id.is_some()
                && c.character.key.as_deref() != Some(current_key.as_str())
        })
        .collect()
}

/// Move character `id` from the roster stored under `source_key` into
/// `slot` of `session`, then blank the source copy in place. Both rosters
/// are written back to `store`.
pub fn migrate_character<S: KvStore + ?Sized>(
    store: &mut S,
    session: &mut Session,
    slot: usize,
    source_key: &str,
    id: &str,
) -> Result<()> {
    let missing = || CompanionError::MigrationSourceMissing {
        id: id.to_string(),
        key: source_key.to_string(),
    };

    let (kind, source) = store::parse_key(source_key).ok_or_else(missing)?;
    if kind != DocumentKind::Characters {
        return Err(missing());
    }
    if source == session.id {
        // Same dungeon: nothing to move.
        return Err(missing());
    }

    let mut source_roster: Vec<Character> =
        store::load_document(store, DocumentKind::Characters, &source)?.ok_or_else(missing)?;
    let source_slot = source_roster
        .iter_mut()
        .find(|c| c.id.as_deref() == Some(id))
        .ok_or_else(missing)?;

    let target_key = session.id.roster_key();
    let target = session.character_mut(slot)?;

    let mut imported = source_slot.clone();
    imported.key = Some(target_key);
    *target = imported;

    *source_slot = Character::blank(id.to_string(), source_key.to_string());

    session.save_characters(store)?;
    store::save_document(store, DocumentKind::Characters, &source, &source_roster)?;
    tracing::debug!(id, from = source.as_str(), to = session.id.as_str(), slot, "character migrated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn sid(s: &str) -> SessionId {
        SessionId::parse(s).unwrap()
    }

    fn named(id: &str, key: &str, name: &str) -> Character {
        let mut c = Character::blank(id.to_string(), key.to_string());
        c.name = name.to_string();
        c.class = "Wizard".to_string();
        c.level = 3;
        c.full_life = 6;
        c.current_life = 4;
        c.add_spell("Fireball", 2);
        c
    }

    fn seeded() -> MemoryStore {
        let mut store = MemoryStore::new();
        let b = vec![
            named("X", "characters-B", "Zed"),
            Character::blank("Y".into(), "characters-B".into()),
        ];
        store::save_document(&mut store, DocumentKind::Characters, &sid("B"), &b).unwrap();
        store
    }

    #[test]
    fn candidates_exclude_placeholders_and_current_session() {
        let mut store = seeded();
        let a = vec![named("Q", "characters-A", "Own")];
        store::save_document(&mut store, DocumentKind::Characters, &sid("A"), &a).unwrap();
        store.set("characters-C", r#"[{"name":"NoId","class":"Elf"}]"#.to_string());
        store.set("characters-D", "garbage".to_string());

        let candidates = import_candidates(&store, &sid("A"));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].source, sid("B"));
        assert_eq!(candidates[0].character.id.as_deref(), Some("X"));
        assert_eq!(candidates[0].label(), "Zed Wizard Level: 3");
    }

    #[test]
    fn migration_scenario() {
        let mut store = seeded();
        let mut session = Session::open(&store, sid("A"), 4).unwrap();

        migrate_character(&mut store, &mut session, 0, "characters-B", "X").unwrap();

        let expected = {
            let mut c = named("X", "characters-B", "Zed");
            c.key = Some("characters-A".to_string());
            c
        };
        assert_eq!(session.characters[0], expected);

        let reopened_a = Session::open(&store, sid("A"), 4).unwrap();
        assert_eq!(reopened_a.characters[0], expected);

        let b: Vec<Character> = store::load_document(&store, DocumentKind::Characters, &sid("B"))
            .unwrap()
            .unwrap();
        assert_eq!(b[0], Character::blank("X".into(), "characters-B".into()));
        assert_eq!(b[1].id.as_deref(), Some("Y"));

        // Source no longer offers it
        assert!(import_candidates(&store, &sid("A")).is_empty());
    }

    #[test]
    fn missing_source_character() {
        let mut store = seeded();
        let mut session = Session::open(&store, sid("A"), 4).unwrap();
        let err = migrate_character(&mut store, &mut session, 0, "characters-B", "nope").unwrap_err();
        assert!(matches!(err, CompanionError::MigrationSourceMissing { .. }));
        let err = migrate_character(&mut store, &mut session, 0, "dungeon-B", "X").unwrap_err();
        assert!(matches!(err, CompanionError::MigrationSourceMissing { .. }));
    }

    #[test]
    fn bad_slot_leaves_source_untouched() {
        let mut store = seeded();
        let mut session = Session::open(&store, sid("A"), 4).unwrap();
        let err = migrate_character(&mut store, &mut session, 9, "characters-B", "X").unwrap_err();
        assert!(matches!(err, CompanionError::SlotOutOfRange(9)));
        let b: Vec<Character> = store::load_document(&store, DocumentKind::Characters, &sid("B"))
            .unwrap()
            .unwrap();
        assert_eq!(b[0].name, "Zed");
    }
}
