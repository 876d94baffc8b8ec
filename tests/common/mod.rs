use std::sync::Arc;

use tempfile::NamedTempFile;
use txstore::{BufferPool, Catalog, HeapFile, LockManager};

/// Builds a single-table storage stack backed by a fresh temp file: a
/// `Catalog` with one registered table, a `LockManager`, a `BufferPool`
/// of the requested capacity, and the `HeapFile` over it. The temp file
/// handle is returned too so it isn't dropped (and deleted) out from
/// under the test.
pub fn single_table_heap_file(
    page_size: usize,
    tuple_size: usize,
    pool_capacity: usize,
) -> (HeapFile, Arc<Catalog>, Arc<BufferPool>, NamedTempFile) {
    let tmp = NamedTempFile::new().expect("create temp file");
    let catalog = Arc::new(Catalog::new());
    catalog
        .register_table(1, tmp.path(), page_size, tuple_size)
        .expect("register table");
    let lock_manager = Arc::new(LockManager::new());
    let buffer_pool = Arc::new(BufferPool::new(
        Arc::clone(&catalog),
        lock_manager,
        pool_capacity,
    ));
    let heap_file = HeapFile::new(1, Arc::clone(&catalog), Arc::clone(&buffer_pool));
    (heap_file, catalog, buffer_pool, tmp)
}
