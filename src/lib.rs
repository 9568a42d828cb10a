pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod storage;

pub use crate::core::{SyncEngine, SyncReport, SyncStatus};
pub use crate::error::{Result, SyncError};
pub use crate::storage::{create_storage, Storage, StorageBackend};
