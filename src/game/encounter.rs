//! Encounter roster: append-only list of monsters met in the dungeon.

use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

use crate::error::{CompanionError, Result};
use crate::game::character::{lenient_int, parse_int};

/// Length of the tally / boss life track.
pub const COUNT_TRACK_LEN: usize = 21;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EncounterType {
    #[default]
    Minion,
    Vermin,
    Boss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EncounterStatus {
    #[default]
    Alive,
    Fled,
    Bribed,
    Defeated,
}

impl EncounterType {
    pub const ALL: [EncounterType; 3] = [EncounterType::Minion, EncounterType::Vermin, EncounterType::Boss];

    pub fn as_str(self) -> &'static str {
        match self {
            EncounterType::Minion => "Minion",
            EncounterType::Vermin => "Vermin",
            EncounterType::Boss => "Boss",
        }
    }
}

impl EncounterStatus {
    pub const ALL: [EncounterStatus; 4] = [
        EncounterStatus::Alive,
        EncounterStatus::Fled,
        EncounterStatus::Bribed,
        EncounterStatus::Defeated,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EncounterStatus::Alive => "Alive",
            EncounterStatus::Fled => "Fled",
            EncounterStatus::Bribed => "Bribed",
            EncounterStatus::Defeated => "Defeated",
        }
    }
}

impl FromStr for EncounterType {
    type Err = CompanionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CompanionError::UnknownValue {
                what: "encounter type",
                value: s.to_string(),
            })
    }
}

impl FromStr for EncounterStatus {
    type Err = CompanionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CompanionError::UnknownValue {
                what: "encounter status",
                value: s.to_string(),
            })
    }
}

/// Fields missing from a stored record take their value from
/// `Encounter::default()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Encounter {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EncounterType,
    #[serde(deserialize_with = "lenient_int")]
    pub level: i64,
    #[serde(deserialize_with = "count_track")]
    pub count: Vec<bool>,
    #[serde(deserialize_with = "lenient_int")]
    pub attacks_per_round: i64,
    pub status: EncounterStatus,
    pub notes: String,
}

/// Short tracks from older records are padded out to the full length.
fn count_track<'de, D>(deserializer: D) -> std::result::Result<Vec<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut track = Option::<Vec<bool>>::deserialize(deserializer)?.unwrap_or_default();
    if track.len() < COUNT_TRACK_LEN {
        track.resize(COUNT_TRACK_LEN, false);
    }
    Ok(track)
}

impl Default for Encounter {
    fn default() -> Self {
        Self {
            name: "New Encounter".to_string(),
            kind: EncounterType::Minion,
            level: 1,
            count: vec![false; COUNT_TRACK_LEN],
            attacks_per_round: 1,
            status: EncounterStatus::Alive,
            notes: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncounterField {
    Name,
    Level,
    AttacksPerRound,
    Notes,
}

impl FromStr for EncounterField {
    type Err = CompanionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "name" => Ok(EncounterField::Name),
            "level" => Ok(EncounterField::Level),
            "attacksPerRound" => Ok(EncounterField::AttacksPerRound),
            "notes" => Ok(EncounterField::Notes),
            other => Err(CompanionError::UnknownValue {
                what: "encounter field",
                value: other.to_string(),
            }),
        }
    }
}

impl Encounter {
    pub fn set_field(&mut self, field: EncounterField, value: &str) {
        match field {
            EncounterField::Name => self.name = value.to_string(),
            EncounterField::Notes => self.notes = value.to_string(),
            EncounterField::Level => self.level = parse_int(value),
            EncounterField::AttacksPerRound => self.attacks_per_round = parse_int(value),
        }
    }

    /// Flip one box of the count track. Status is left alone.
    pub fn toggle_count(&mut self, index: usize) -> Result<()> {
        if self.count.len() < COUNT_TRACK_LEN {
            self.count.resize(COUNT_TRACK_LEN, false);
        }
        let slot = self
            .count
            .get_mut(index)
            .ok_or(CompanionError::UnknownValue {
                what: "count box",
                value: index.to_string(),
            })?;
        *slot = !*slot;
        Ok(())
    }

    pub fn ticked(&self) -> usize {
        self.count.iter().filter(|&&b| b).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_encounter_defaults() {
        let e = Encounter::default();
        assert_eq!(e.name, "New Encounter");
        assert_eq!(e.kind, EncounterType::Minion);
        assert_eq!(e.count.len(), 21);
        assert!(e.count.iter().all(|b| !b));
        assert_eq!(e.attacks_per_round, 1);
        assert_eq!(e.status, EncounterStatus::Alive);
    }

    #[test]
    fn json_shape_matches_roster_format() {
        let json = serde_json::to_string(&Encounter::default()).unwrap();
        assert!(json.contains(r#""type":"Minion""#));
        assert!(json.contains(r#""attacksPerRound":1"#));
        assert!(json.contains(r#""status":"Alive""#));
    }

    #[test]
    fn roster_roundtrip() {
        let mut e = Encounter::default();
        e.kind = EncounterType::Boss;
        e.status = EncounterStatus::Bribed;
        e.toggle_count(20).unwrap();
        let roster = vec![Encounter::default(), e];
        let json = serde_json::to_string(&roster).unwrap();
        assert_eq!(serde_json::from_str::<Vec<Encounter>>(&json).unwrap(), roster);
    }

    #[test]
    fn sparse_stored_encounter_takes_defaults() {
        let json = r#"[{"name":"Orc","type":"Minion","status":"Alive"},
            {"type":"Boss","count":[true,false],"level":"4"},
            {"name":"Rats","count":null}]"#;
        let roster: Vec<Encounter> = serde_json::from_str(json).unwrap();
        assert_eq!(roster[0].name, "Orc");
        assert_eq!(roster[0].level, 1);
        assert_eq!(roster[0].attacks_per_round, 1);
        assert_eq!(roster[0].count, vec![false; COUNT_TRACK_LEN]);
        assert_eq!(roster[1].name, "New Encounter");
        assert_eq!(roster[1].level, 4);
        assert_eq!(roster[1].count.len(), COUNT_TRACK_LEN);
        assert!(roster[1].count[0]);
        assert_eq!(roster[1].ticked(), 1);
        assert_eq!(roster[2].count.len(), COUNT_TRACK_LEN);
    }

    #[test]
    fn toggle_count_is_independent() {
        let mut e = Encounter::default();
        e.toggle_count(3).unwrap();
        e.toggle_count(7).unwrap();
        e.toggle_count(3).unwrap();
        assert_eq!(e.ticked(), 1);
        assert!(e.count[7]);
        assert!(e.toggle_count(21).is_err());
    }

    #[test]
    fn status_change_keeps_count() {
        let mut e = Encounter::default();
        e.toggle_count(0).unwrap();
        e.status = EncounterStatus::Defeated;
        assert!(e.count[0]);
    }

    #[test]
    fn set_fields() {
        let mut e = Encounter::default();
        e.set_field(EncounterField::Name, "Goblin");
        e.set_field(EncounterField::Level, "3");
        e.set_field(EncounterField::AttacksPerRound, "x");
        assert_eq!(e.name, "Goblin");
        assert_eq!(e.level, 3);
        assert_eq!(e.attacks_per_round, 0);
    }

    #[test]
    fn parse_enums() {
        assert_eq!("Vermin".parse::<EncounterType>().unwrap(), EncounterType::Vermin);
        assert_eq!("Fled".parse::<EncounterStatus>().unwrap(), EncounterStatus::Fled);
        assert!("Dragon".parse::<EncounterType>().is_err());
    }
}
