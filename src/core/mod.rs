pub mod comparator;
pub mod engine;
pub mod executor;
pub mod inventory;
pub mod scanner;

pub use comparator::{ActionSummary, Change, ChangeReason, ChangeSet, FileComparator, FileRelation};
pub use engine::{clean_root, resolve_backup_root, SyncEngine, SyncReport, SyncStatus};
pub use executor::{CopyReport, SyncExecutor};
pub use inventory::{Inventory, InventoryEntry};
pub use scanner::FileScanner;
