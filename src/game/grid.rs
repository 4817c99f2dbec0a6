//! Dungeon map document: a 28 × 20 matrix of cells.
//!
//! Stored as a JSON array of rows. Maps saved by the first companion release
//! held bare booleans per cell; those still decode (`true` → filled, no door,
//! no encounter marker).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CompanionError, Result};

pub const GRID_ROWS: usize = 28;
pub const GRID_COLS: usize = 20;

/// Which edge of a cell a door sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Top,
    Right,
    Bottom,
    Left,
}

impl Orientation {
    /// Next orientation clockwise.
    pub fn rotate(self) -> Self {
        match self {
            Orientation::Top => Orientation::Right,
            Orientation::Right => Orientation::Bottom,
            Orientation::Bottom => Orientation::Left,
            Orientation::Left => Orientation::Top,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Top => "top",
            Orientation::Right => "right",
            Orientation::Bottom => "bottom",
            Orientation::Left => "left",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Orientation {
    type Err = CompanionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "top" => Ok(Orientation::Top),
            "right" => Ok(Orientation::Right),
            "bottom" => Ok(Orientation::Bottom),
            "left" => Ok(Orientation::Left),
            other => Err(CompanionError::UnknownValue {
                what: "door orientation",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "StoredCell")]
pub struct Cell {
    pub filled: bool,
    pub door: Option<Orientation>,
    /// 1-based encounter number shown on the cell.
    pub encounter: Option<usize>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredCell {
    Flag(bool),
    Full {
        #[serde(default)]
        filled: bool,
        #[serde(default)]
        door: Option<Orientation>,
        #[serde(default)]
        encounter: Option<usize>,
    },
}

impl From<StoredCell> for Cell {
    fn from(stored: StoredCell) -> Self {
        match stored {
            StoredCell::Flag(filled) => Cell {
                filled,
                ..Cell::default()
            },
            StoredCell::Full {
                filled,
                door,
                encounter,
            } => Cell {
                filled,
                door,
                encounter,
            },
        }
    }
}

/// The single party token on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
}

impl Default for Grid {
    fn default() -> Self {
        Self::blank(GRID_ROWS, GRID_COLS)
    }
}

impl Grid {
    pub fn blank(rows: usize, cols: usize) -> Self {
        Self {
            rows: vec![vec![Cell::default(); cols]; rows],
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }

    pub fn cell(&self, row: usize, col: usize) -> Result<&Cell> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .ok_or(CompanionError::CellOutOfBounds { row, col })
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Result<&mut Cell> {
        self.rows
            .get_mut(row)
            .and_then(|r| r.get_mut(col))
            .ok_or(CompanionError::CellOutOfBounds { row, col })
    }

    /// Set `filled` on one cell. Returns whether the cell changed.
    pub fn set_filled(&mut self, row: usize, col: usize, filled: bool) -> Result<bool> {
        let cell = self.cell_mut(row, col)?;
        let changed = cell.filled != filled;
        cell.filled = filled;
        Ok(changed)
    }

    /// Clear an existing door, or place one facing `orientation`.
    pub fn toggle_door(&mut self, row: usize, col: usize, orientation: Orientation) -> Result<()> {
        let cell = self.cell_mut(row, col)?;
        cell.door = match cell.door {
            Some(_) => None,
            None => Some(orientation),
        };
        Ok(())
    }

    /// Clear the marker if it already shows `index`, otherwise set it.
    pub fn toggle_encounter(&mut self, row: usize, col: usize, index: usize) -> Result<()> {
        let cell = self.cell_mut(row, col)?;
        cell.encounter = if cell.encounter == Some(index) {
            None
        } else {
            Some(index)
        };
        Ok(())
    }

    pub fn filled_count(&self) -> usize {
        self.rows.iter().flatten().filter(|c| c.filled).count()
    }
}
