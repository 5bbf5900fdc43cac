//! Resolving store handles.
//!
//! The conversation never holds on to a store between steps: every step asks
//! the connector for a fresh handle and drops it when the step ends.

use crate::error::StoreError;
use crate::store::RecordStore;
use async_trait::async_trait;

/// Opens connections to a record store.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    /// The store handle produced by a successful connection.
    type Store: RecordStore;

    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Opens a new handle to the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or authenticated.
    async fn connect(&self) -> Result<Self::Store, StoreError>;
}

