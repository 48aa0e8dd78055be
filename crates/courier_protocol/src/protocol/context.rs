//! # Protocol Context
//!
//! The state every codec call shares for the lifetime of one session: the
//! intern table that gives each name its byte, and the grid mapping. It is
//! passed explicitly; there is no ambient codec state.

use courier_core::InternTable;

use super::error::{ProtocolError, ProtocolResult};
use super::grid::GridMapper;

/// Session-lifetime codec state.
#[derive(Debug, Default)]
pub struct ProtocolContext {
    interns: InternTable,
    grid: GridMapper,
}

impl ProtocolContext {
    /// Creates a context with an empty intern table and unfrozen grid.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Intern`] when the table is full.
    pub fn intern(&mut self, name: &str) -> ProtocolResult<u8> {
        Ok(self.interns.get_id(name.as_bytes())?)
    }

    /// Looks up `name` without interning it.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<u8> {
        self.interns.get_id_readonly(name.as_bytes())
    }

    /// The string behind an id.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownId`] if the id was never handed out.
    pub fn name(&self, id: u8) -> ProtocolResult<&str> {
        self.interns.get_str(id).ok_or(ProtocolError::UnknownId(id))
    }

    /// The intern table.
    #[must_use]
    pub const fn interns(&self) -> &InternTable {
        &self.interns
    }

    /// The grid mapping.
    #[must_use]
    pub const fn grid(&self) -> &GridMapper {
        &self.grid
    }

    /// The grid mapping, mutably.
    pub fn grid_mut(&mut self) -> &mut GridMapper {
        &mut self.grid
    }
}
