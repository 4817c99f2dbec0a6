//! Map tool modes and pointer gestures.
//!
//! Exactly one `ToolMode` is active. A paint/erase gesture fixes its ink on
//! pointer-down and keeps applying that same value to every cell the pointer
//! enters until pointer-up or pointer-leave. Switching modes mid-gesture does
//! not end it.

use std::fmt;
use std::str::FromStr;

use crate::error::{CompanionError, Result};
use crate::game::grid::{Grid, Orientation, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolMode {
    #[default]
    Draw,
    Erase,
    Door,
    Character,
    Encounter,
}

impl ToolMode {
    pub const ALL: [ToolMode; 5] = [
        ToolMode::Draw,
        ToolMode::Erase,
        ToolMode::Door,
        ToolMode::Character,
        ToolMode::Encounter,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolMode::Draw => "draw",
            ToolMode::Erase => "erase",
            ToolMode::Door => "door",
            ToolMode::Character => "character",
            ToolMode::Encounter => "encounter",
        }
    }
}

impl fmt::Display for ToolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolMode {
    type Err = CompanionError;

    fn from_str(s: &str) -> Result<Self> {
        ToolMode::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| CompanionError::UnknownValue {
                what: "tool mode",
                value: s.to_string(),
            })
    }
}

/// What a pointer event did to the session documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EditOutcome {
    pub grid_changed: bool,
    pub position: Option<Option<Position>>,
}

impl EditOutcome {
    fn grid(changed: bool) -> Self {
        Self {
            grid_changed: changed,
            position: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridEditor {
    pub mode: ToolMode,
    pub door: Orientation,
    /// 1-based encounter number placed in encounter mode.
    pub selected_encounter: usize,
    /// Ink of the gesture in progress.
    gesture: Option<bool>,
}

impl Default for GridEditor {
    fn default() -> Self {
        Self {
            mode: ToolMode::Draw,
            door: Orientation::Top,
            selected_encounter: 1,
            gesture: None,
        }
    }
}

impl GridEditor {
    pub fn set_mode(&mut self, mode: ToolMode) {
        self.mode = mode;
    }

    /// Affects future door placements only.
    pub fn rotate_door(&mut self) {
        self.door = self.door.rotate();
    }

    /// Select the encounter number to place, bounded by the roster size.
    pub fn select_encounter(&mut self, index: usize, roster_len: usize) {
        self.selected_encounter = index.clamp(1, roster_len.max(1));
    }

    pub fn gesture(&self) -> Option<bool> {
        self.gesture
    }

    pub fn pointer_down(
        &mut self,
        grid: &mut Grid,
        roster_len: usize,
        row: usize,
        col: usize,
    ) -> Result<EditOutcome> {
        match self.mode {
            ToolMode::Draw => {
                let ink = !grid.cell(row, col)?.filled;
                self.gesture = Some(ink);
                grid.set_filled(row, col, ink).map(EditOutcome::grid)
            }
            ToolMode::Erase => {
                grid.cell(row, col)?;
                self.gesture = Some(false);
                grid.set_filled(row, col, false).map(EditOutcome::grid)
            }
            ToolMode::Door => {
                grid.toggle_door(row, col, self.door)?;
                Ok(EditOutcome::grid(true))
            }
            ToolMode::Encounter => {
                if roster_len == 0 {
                    return Ok(EditOutcome::default());
                }
                let index = self.selected_encounter.clamp(1, roster_len);
                grid.toggle_encounter(row, col, index)?;
                Ok(EditOutcome::grid(true))
            }
            ToolMode::Character => Ok(EditOutcome::default()),
        }
    }

    pub fn pointer_enter(&mut self, grid: &mut Grid, row: usize, col: usize) -> Result<EditOutcome> {
        match (self.gesture, self.mode) {
            (Some(ink), ToolMode::Draw | ToolMode::Erase) => {
                grid.set_filled(row, col, ink).map(EditOutcome::grid)
            }
            _ => Ok(EditOutcome::default()),
        }
    }

    /// Pointer-up and pointer-leaving-the-map both end the gesture.
    pub fn pointer_up(&mut self) {
        self.gesture = None;
    }

    /// A click (not a drag) in character mode moves the party token.
    pub fn click(&mut self, grid: &Grid, row: usize, col: usize) -> Result<EditOutcome> {
        if self.mode != ToolMode::Character {
            return Ok(EditOutcome::default());
        }
        grid.cell(row, col)?;
        Ok(EditOutcome {
            grid_changed: false,
            position: Some(Some(Position { row, col })),
        })
    }
}
