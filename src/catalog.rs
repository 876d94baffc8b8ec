use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::error::{StorageError, StorageResult};
use crate::heap_page::PageLayout;
use crate::page_id::PageId;
use crate::page_store::PageStore;

/// Registry of tables known to a storage instance: each table is a
/// `PageStore` (raw page I/O) plus the `PageLayout` derived from its tuple
/// size. Distinct from the buffer pool and lock manager, which are shared
/// across all tables rather than per-table.
#[derive(Default)]
pub struct Catalog {
    tables: RwLock<HashMap<i32, Arc<TableEntry>>>,
}

struct TableEntry {
    store: Arc<PageStore>,
    layout: PageLayout,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_table<P: AsRef<Path>>(
        &self,
        table_id: i32,
        path: P,
        page_size: usize,
        tuple_size: usize,
    ) -> StorageResult<()> {
        let store = PageStore::open(path, table_id, page_size)?;
        let layout = PageLayout::new(page_size, tuple_size);
        self.tables.write().unwrap().insert(
            table_id,
            Arc::new(TableEntry {
                store: Arc::new(store),
                layout,
            }),
        );
        Ok(())
    }

    fn entry(&self, table_id: i32) -> StorageResult<Arc<TableEntry>> {
        self.tables
            .read()
            .unwrap()
            .get(&table_id)
            .cloned()
            .ok_or_else(|| {
                StorageError::Precondition(format!("no table registered with id {}", table_id))
            })
    }

    pub fn page_store(&self, table_id: i32) -> StorageResult<Arc<PageStore>> {
        Ok(self.entry(table_id)?.store.clone())
    }

    pub fn layout(&self, table_id: i32) -> StorageResult<PageLayout> {
        Ok(self.entry(table_id)?.layout)
    }

    pub fn read_page(&self, pid: PageId) -> StorageResult<Vec<u8>> {
        self.page_store(pid.table_id)?.read(pid)
    }

    pub fn write_page(&self, pid: PageId, bytes: &[u8]) -> StorageResult<()> {
        self.page_store(pid.table_id)?.write(pid, bytes)
    }

    pub fn num_pages(&self, table_id: i32) -> StorageResult<usize> {
        self.page_store(table_id)?.num_pages()
    }
}
