//! In-process caches shared for the lifetime of the process.

pub mod table_status;

pub use table_status::{SharedTableStatusCache, TableStatusCache};
