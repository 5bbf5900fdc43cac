//! The record store seam.
//!
//! A record store is a table with one row per employee. Columns are
//! addressed 1-based, the way spreadsheet users count them.

use crate::error::StoreError;
use async_trait::async_trait;
use std::fmt;

/// Opaque locator for a row, issued by the store that found it.
///
/// Only meaningful to the store instance it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowRef(u32);

impl RowRef {
    /// Creates a reference to the given 1-based row number.
    #[must_use]
    pub const fn new(row: u32) -> Self {
        Self(row)
    }

    /// Returns the 1-based row number.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for RowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}", self.0)
    }
}

/// Lookups against a tabular record store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Finds the first row whose cell in `column` equals `key` exactly.
    ///
    /// Returns `Ok(None)` when no row matches.
    async fn find_row_by_key(&self, column: u32, key: &str)
    -> Result<Option<RowRef>, StoreError>;

    /// Reads one cell. Empty cells read as `None`.
    async fn get_cell(&self, row: RowRef, column: u32) -> Result<Option<String>, StoreError>;

    /// Reads a whole row, left to right, without trailing empty cells.
    async fn get_row(&self, row: RowRef) -> Result<Vec<String>, StoreError>;
}
