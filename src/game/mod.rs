//! Game state: the dungeon documents, their editing operations, and the
//! per-dungeon view state. Persistent documents go through `store`; view
//! state lives in WASM memory only.

pub mod adventure_log;
pub mod character;
pub mod editor;
pub mod encounter;
pub mod grid;
pub mod migration;
pub mod session;
pub mod ui;
