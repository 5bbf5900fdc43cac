//! Record store integration for staffcheck.
//!
//! This crate provides:
//!
//! - **Record store seam**: `RecordStore` lookups and the `StoreConnector`
//!   that resolves a fresh store handle for every conversation step
//! - **Google Sheets**: the production store, authorised with a service
//!   account
//! - **In-memory store**: a table held in memory, used by tests and local runs

pub mod connector;
pub mod credential;
pub mod error;
pub mod memory;
pub mod sheets;
pub mod store;

pub use connector::StoreConnector;
pub use credential::{AccessToken, ServiceAccountCredentials};
pub use error::{CredentialError, StoreError};
pub use memory::{FailureMode, InMemoryConnector, InMemoryRecordStore};
pub use sheets::{GoogleSheet, GoogleSheetsConnector, SheetsConfig};
pub use store::{RecordStore, RowRef};
