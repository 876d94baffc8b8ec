pub mod buffer_pool;
pub mod catalog;
pub mod error;
pub mod heap_file;
pub mod heap_page;
pub mod histogram;
pub mod lock_manager;
pub mod lock_table;
pub mod page;
pub mod page_id;
pub mod page_store;
pub mod table_stats;
pub mod transaction_id;
pub mod tuple;
pub mod wait_for_graph;

pub use buffer_pool::{AccessMode, BufferPool};
pub use catalog::Catalog;
pub use error::{StorageError, StorageResult};
pub use heap_file::{HeapFile, HeapFileIterator};
pub use histogram::{IntHistogram, Predicate, StringHistogram};
pub use lock_manager::LockManager;
pub use lock_table::{LockMode, PageLockStatus};
pub use page_id::PageId;
pub use table_stats::{get_table_stats, set_table_stats, FieldValue, TableStats, TupleAccessor};
pub use transaction_id::TransactionId;
pub use tuple::{RecordId, Tuple};

/// Default page size in bytes. Tests that need a smaller page to exercise
/// eviction or slot-bitmap edge cases construct a `Catalog`/`PageLayout`
/// directly with an explicit size instead of mutating this constant.
pub const DEFAULT_PAGE_SIZE: usize = 4096;
