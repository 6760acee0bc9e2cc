//! Outbound REST clients (fallback paths only).

pub mod tables_client;

pub use tables_client::{AvailableTablesApi, RestTablesClient, TableCandidate};
