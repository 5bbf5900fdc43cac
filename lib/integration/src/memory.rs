//! In-memory record store.
//!
//! Holds the table in memory and can be told to fail, so conversation tests
//! can drive every branch without a spreadsheet.

use crate::connector::StoreConnector;
use crate::error::StoreError;
use crate::store::{RecordStore, RowRef};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// How the connector should misbehave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// Everything works.
    #[default]
    None,
    /// `connect` fails.
    Connect,
    /// `connect` works but every lookup fails.
    Lookups,
}

#[derive(Debug, Default)]
struct Shared {
    rows: RwLock<Vec<Vec<String>>>,
    failure: RwLock<FailureMode>,
    connections: AtomicUsize,
}

/// Connector handing out snapshots of an in-memory table.
///
/// Clones share the same table and failure mode.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConnector {
    shared: Arc<Shared>,
}

impl InMemoryConnector {
    /// Creates a connector over the given rows.
    #[must_use]
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        let connector = Self::default();
        *connector.shared.rows.write().unwrap_or_else(|e| e.into_inner()) = rows;
        connector
    }

    /// Builds a connector from string slices, one slice per row.
    #[must_use]
    pub fn from_rows(rows: &[&[&str]]) -> Self {
        Self::new(
            rows.iter()
                .map(|row| row.iter().map(|cell| (*cell).to_string()).collect())
                .collect(),
        )
    }

    /// Changes how subsequent connections behave.
    pub fn set_failure(&self, mode: FailureMode) {
        *self
            .shared
            .failure
            .write()
            .unwrap_or_else(|e| e.into_inner()) = mode;
    }

    /// Number of successful `connect` calls so far.
    #[must_use]
    pub fn connections(&self) -> usize {
        self.shared.connections.load(Ordering::SeqCst)
    }

    fn failure(&self) -> FailureMode {
        *self.shared.failure.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl StoreConnector for InMemoryConnector {
    type Store = InMemoryRecordStore;

    fn name(&self) -> &str {
        "memory"
    }

    async fn connect(&self) -> Result<Self::Store, StoreError> {
        let failure = self.failure();
        if failure == FailureMode::Connect {
            return Err(StoreError::ConnectionFailed {
                reason: "in-memory store is offline".to_string(),
            });
        }

        self.shared.connections.fetch_add(1, Ordering::SeqCst);
        let rows = self
            .shared
            .rows
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        Ok(InMemoryRecordStore {
            rows,
            fail_lookups: failure == FailureMode::Lookups,
        })
    }
}

/// A snapshot of the table taken at connect time.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    rows: Vec<Vec<String>>,
    fail_lookups: bool,
}

impl InMemoryRecordStore {
    fn check(&self) -> Result<(), StoreError> {
        if self.fail_lookups {
            return Err(StoreError::RequestFailed {
                status: 503,
                reason: "in-memory store rejected the lookup".to_string(),
            });
        }
        Ok(())
    }

    fn row(&self, row: RowRef) -> Result<&[String], StoreError> {
        (row.row() as usize)
            .checked_sub(1)
            .and_then(|index| self.rows.get(index))
            .map(Vec::as_slice)
            .ok_or(StoreError::InvalidReference { row })
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn find_row_by_key(
        &self,
        column: u32,
        key: &str,
    ) -> Result<Option<RowRef>, StoreError> {
        self.check()?;
        let Some(index) = (column as usize).checked_sub(1) else {
            return Ok(None);
        };

        let position = self
            .rows
            .iter()
            .position(|row| row.get(index).is_some_and(|cell| cell == key));

        Ok(position.map(|i| RowRef::new(i as u32 + 1)))
    }

    async fn get_cell(&self, row: RowRef, column: u32) -> Result<Option<String>, StoreError> {
        self.check()?;
        let cells = self.row(row)?;
        let cell = (column as usize)
            .checked_sub(1)
            .and_then(|index| cells.get(index))
            .filter(|cell| !cell.is_empty())
            .cloned();
        Ok(cell)
    }

    async fn get_row(&self, row: RowRef) -> Result<Vec<String>, StoreError> {
        self.check()?;
        let mut cells = self.row(row)?.to_vec();
        while cells.last().is_some_and(String::is_empty) {
            cells.pop();
        }
        Ok(cells)
    }
}
