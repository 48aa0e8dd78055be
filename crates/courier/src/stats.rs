//! # Statistics Log
//!
//! One summary record per finished simulation, kept in a single file:
//!
//! ```text
//! ┌──────────────┬───────────┬─────────────────────────────┐
//! │ magic (u32)  │ count u16 │ GameStatistic[count]        │
//! │ 0x446a63dc   │           │ 20 bytes each               │
//! └──────────────┴───────────┴─────────────────────────────┘
//! ```
//!
//! The file is read whole, appended to in memory and rewritten.

use std::fs;
use std::io;
use std::path::Path;

use bytemuck::{Pod, Zeroable};
use courier_core::{Arena, FlatList};
use thiserror::Error;
use tracing::info;

/// First four bytes of every statistics file.
pub const STATS_MAGIC: u32 = 0x446a_63dc;

/// Offset of the record list, right after the magic.
const LIST_OFFSET: usize = 4;

/// Summary of one simulation.
///
/// Size: 20 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct GameStatistic {
    /// Starting money.
    pub seed_capital: u32,
    /// Team money at the last perception.
    pub final_money: i32,
    /// Final score.
    pub score: i32,
    /// Steps played.
    pub steps: u16,
    /// Final ranking.
    pub ranking: u16,
    /// Products in the catalogue.
    pub products: u8,
    /// Distinct jobs seen during the simulation.
    pub distinct_jobs: u8,
    /// Agents on the team.
    pub agents: u8,
    /// Padding for alignment.
    pub _padding: u8,
}

/// Errors reading or writing the statistics file.
#[derive(Error, Debug)]
pub enum StatsError {
    /// The file does not start with [`STATS_MAGIC`].
    #[error("not a statistics file: magic {found:#010x}")]
    BadMagic {
        /// The first four bytes as read.
        found: u32,
    },

    /// The record count does not match the file length.
    #[error("statistics file is corrupt ({len} bytes)")]
    Corrupt {
        /// File length.
        len: usize,
    },

    /// File I/O failed.
    #[error("statistics file I/O error: {0}")]
    Io(#[from] io::Error),
}

/// The statistics file, held in an arena.
#[derive(Debug)]
pub struct StatisticsLog {
    arena: Arena,
    list: FlatList<GameStatistic, u16>,
}

impl StatisticsLog {
    /// An empty log.
    #[must_use]
    pub fn new() -> Self {
        let mut arena = Arena::with_capacity(LIST_OFFSET + 2);
        arena.emplace_back(&STATS_MAGIC);
        let list = FlatList::init(&mut arena);
        Self { arena, list }
    }

    /// Parses the bytes of a statistics file.
    ///
    /// # Errors
    ///
    /// [`StatsError::BadMagic`] or [`StatsError::Corrupt`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StatsError> {
        let mut arena = Arena::with_capacity(bytes.len());
        arena.append(bytes);
        let found = arena
            .try_get::<u32>(0)
            .ok_or(StatsError::Corrupt { len: bytes.len() })?;
        if found != STATS_MAGIC {
            return Err(StatsError::BadMagic { found });
        }
        let list = FlatList::open(&arena, LIST_OFFSET).ok_or(StatsError::Corrupt { len: bytes.len() })?;
        Ok(Self { arena, list })
    }

    /// Reads `path`, or starts an empty log if the file does not exist.
    ///
    /// # Errors
    ///
    /// Any read failure other than a missing file, or a malformed file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StatsError> {
        match fs::read(path.as_ref()) {
            Ok(bytes) => Self::from_bytes(&bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.as_ref().display(), "statistics file does not exist, will be initialized");
                Ok(Self::new())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Appends one record.
    ///
    /// # Panics
    ///
    /// Panics past `u16::MAX` records.
    pub fn push(&mut self, statistic: &GameStatistic) {
        self.list.push_back(statistic, &mut self.arena);
    }

    /// Every record, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<GameStatistic> {
        self.list.iter(&self.arena).collect()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.list.len(&self.arena)
    }

    /// Returns true if no record was written yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty(&self.arena)
    }

    /// The file image.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.arena.as_slice()
    }

    /// Writes the whole file.
    ///
    /// # Errors
    ///
    /// Any write failure.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StatsError> {
        fs::write(path, self.as_bytes())?;
        Ok(())
    }

    /// Loads `path`, appends `statistic` and rewrites the file.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load) and [`save`](Self::save).
    pub fn append(path: impl AsRef<Path>, statistic: &GameStatistic) -> Result<usize, StatsError> {
        let path = path.as_ref();
        let mut log = Self::load(path)?;
        log.push(statistic);
        log.save(path)?;
        Ok(log.len())
    }
}

impl Default for StatisticsLog {
    fn default() -> Self {
        Self::new()
    }
}
