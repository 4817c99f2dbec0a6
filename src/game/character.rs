//! Character sheets.
//!
//! A roster is an ordered list of characters owned by one dungeon. Field
//! edits mutate the stored record directly; there is no edit snapshot to roll
//! back to. Life is clamped only by the +1/-1 buttons, never on typed input.

use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

use crate::error::{CompanionError, Result};

/// Name every blank character starts with. Characters still carrying it are
/// never offered for migration.
pub const PLACEHOLDER_NAME: &str = "Name";
pub const PLACEHOLDER_CLASS: &str = "Class";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredSpell")]
pub struct Spell {
    pub name: String,
    pub slots: usize,
    /// Always `slots` long once decoded.
    pub checked_slots: Vec<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSpell {
    #[serde(default)]
    name: String,
    #[serde(default, deserialize_with = "lenient_optional_count")]
    slots: Option<usize>,
    #[serde(default)]
    checked_slots: Vec<bool>,
}

impl From<StoredSpell> for Spell {
    fn from(stored: StoredSpell) -> Self {
        let slots = stored.slots.unwrap_or(stored.checked_slots.len());
        let mut spell = Spell {
            name: stored.name,
            slots,
            checked_slots: stored.checked_slots,
        };
        spell.resize(slots);
        spell
    }
}

impl Spell {
    /// New spells start with every slot checked (available).
    pub fn new(name: &str, slots: usize) -> Self {
        Self {
            name: name.to_string(),
            slots,
            checked_slots: vec![true; slots],
        }
    }

    /// Change the slot count, truncating or padding `checked_slots` with
    /// `true` while keeping existing values in place.
    pub fn resize(&mut self, slots: usize) {
        self.checked_slots.resize(slots, true);
        self.slots = slots;
    }

    pub fn toggle_slot(&mut self, slot: usize) {
        if let Some(checked) = self.checked_slots.get_mut(slot) {
            *checked = !*checked;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub class: String,
    #[serde(default = "one", deserialize_with = "lenient_int")]
    pub level: i64,
    #[serde(default, deserialize_with = "lenient_int")]
    pub gold: i64,
    #[serde(default, deserialize_with = "lenient_int")]
    pub attack: i64,
    #[serde(default, alias = "defence", deserialize_with = "lenient_int")]
    pub defense: i64,
    #[serde(default, deserialize_with = "lenient_int")]
    pub full_life: i64,
    #[serde(default, deserialize_with = "lenient_int")]
    pub current_life: i64,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub spells: Vec<Spell>,
    #[serde(default)]
    pub notes: String,
    /// Storage key of the roster this record lives in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

fn one() -> i64 {
    1
}

impl Character {
    /// A blank sheet with the given identity.
    pub fn blank(id: String, key: String) -> Self {
        Self {
            id: Some(id),
            name: PLACEHOLDER_NAME.to_string(),
            class: PLACEHOLDER_CLASS.to_string(),
            level: 1,
            gold: 0,
            attack: 0,
            defense: 0,
            full_life: 0,
            current_life: 0,
            equipment: vec!["bandage".to_string()],
            spells: Vec::new(),
            notes: String::new(),
            key: Some(key),
        }
    }

    /// A blank sheet with a fresh random id.
    pub fn new_blank(key: &str) -> Self {
        Self::blank(uuid::Uuid::new_v4().to_string(), key.to_string())
    }

    pub fn has_placeholder_name(&self) -> bool {
        self.name == PLACEHOLDER_NAME
    }

    /// Apply a typed edit. Numbers are parsed leniently and never clamped.
    pub fn set_field(&mut self, field: CharacterField, value: &str) {
        match field {
            CharacterField::Name => self.name = value.to_string(),
            CharacterField::Class => self.class = value.to_string(),
            CharacterField::Notes => self.notes = value.to_string(),
            CharacterField::Level => self.level = parse_int(value),
            CharacterField::Gold => self.gold = parse_int(value),
            CharacterField::Attack => self.attack = parse_int(value),
            CharacterField::Defense => self.defense = parse_int(value),
            CharacterField::FullLife => self.full_life = parse_int(value),
            CharacterField::CurrentLife => self.current_life = parse_int(value),
        }
    }

    pub fn increment_life(&mut self) {
        self.current_life = clamp_life(self.current_life.saturating_add(1), self.full_life);
    }

    pub fn decrement_life(&mut self) {
        self.current_life = clamp_life(self.current_life.saturating_sub(1), self.full_life);
    }

    /// Append a trimmed item. Blank names are ignored. Returns whether added.
    pub fn add_equipment(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        self.equipment.push(name.to_string());
        true
    }

    /// Remove every item whose text is exactly `name`.
    pub fn delete_equipment(&mut self, name: &str) {
        self.equipment.retain(|item| item != name);
    }

    /// Append a spell with all slots checked. Blank names are ignored.
    pub fn add_spell(&mut self, name: &str, slots: usize) -> bool {
        if name.trim().is_empty() {
            return false;
        }
        self.spells.push(Spell::new(name, slots));
        true
    }

    pub fn spell_mut(&mut self, index: usize) -> Result<&mut Spell> {
        self.spells
            .get_mut(index)
            .ok_or(CompanionError::SpellOutOfRange(index))
    }
}

/// `[0, full_life]`, upper bound first so a negative full life still yields 0.
fn clamp_life(value: i64, full_life: i64) -> i64 {
    value.min(full_life).max(0)
}

/// Typed numeric input: surrounding whitespace ignored, a trailing fraction
/// truncated, anything unparseable becomes 0.
pub fn parse_int(value: &str) -> i64 {
    let value = value.trim();
    value
        .parse::<i64>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        .unwrap_or(0)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LenientNumber {
    Int(i64),
    Float(f64),
    Text(String),
    Other(serde_json::Value),
}

impl LenientNumber {
    fn into_i64(self) -> i64 {
        match self {
            LenientNumber::Int(n) => n,
            LenientNumber::Float(f) if f.is_finite() => f.trunc() as i64,
            LenientNumber::Text(s) => parse_int(&s),
            _ => 0,
        }
    }
}

/// Stored sheets may hold numbers as strings (typed input) or `null`.
pub(crate) fn lenient_int<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(LenientNumber::deserialize(deserializer)?.into_i64())
}

/// A missing or `null` count stays `None`; anything else goes through the
/// lenient parse, negatives becoming 0.
fn lenient_optional_count<'de, D>(deserializer: D) -> std::result::Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    match LenientNumber::deserialize(deserializer)? {
        LenientNumber::Other(serde_json::Value::Null) => Ok(None),
        n => Ok(Some(usize::try_from(n.into_i64()).unwrap_or(0))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacterField {
    Name,
    Class,
    Level,
    Gold,
    Attack,
    Defense,
    FullLife,
    CurrentLife,
    Notes,
}

impl FromStr for CharacterField {
    type Err = CompanionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "name" => Ok(CharacterField::Name),
            "class" => Ok(CharacterField::Class),
            "level" => Ok(CharacterField::Level),
            "gold" => Ok(CharacterField::Gold),
            "attack" => Ok(CharacterField::Attack),
            "defense" | "defence" => Ok(CharacterField::Defense),
            "fullLife" => Ok(CharacterField::FullLife),
            "currentLife" => Ok(CharacterField::CurrentLife),
            "notes" => Ok(CharacterField::Notes),
            other => Err(CompanionError::UnknownValue {
                what: "character field",
                value: other.to_string(),
            }),
        }
    }
}

/// Fresh roster of `size` blank sheets for the roster stored under `key`.
pub fn default_roster(key: &str, size: usize) -> Vec<Character> {
    (0..size).map(|_| Character::new_blank(key)).collect()
}
