use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::debug;

use crate::error::StorageResult;
use crate::page_id::PageId;

/// Synchronous, per-table-file page I/O. All reads and writes go through a
/// single `Mutex<File>`; callers are expected to keep page-level
/// concurrency control (locking) above this layer, not rely on this layer
/// to serialize logically-concurrent access beyond what the OS file
/// position demands.
pub struct PageStore {
    table_id: i32,
    page_size: usize,
    path: PathBuf,
    file: Mutex<File>,
}

impl PageStore {
    pub fn open<P: AsRef<Path>>(path: P, table_id: i32, page_size: usize) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;
        Ok(Self {
            table_id,
            page_size,
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn table_id(&self) -> i32 {
        self.table_id
    }

    pub fn num_pages(&self) -> StorageResult<usize> {
        let file = self.file.lock().unwrap();
        let len = file.metadata()?.len() as usize;
        Ok(len / self.page_size)
    }

    pub fn read(&self, pid: PageId) -> StorageResult<Vec<u8>> {
        let mut file = self.file.lock().unwrap();
        let mut buf = vec![0u8; self.page_size];
        file.seek(SeekFrom::Start(pid.offset(self.page_size)))?;
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn write(&self, pid: PageId, bytes: &[u8]) -> StorageResult<()> {
        assert_eq!(bytes.len(), self.page_size, "page size mismatch");
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(pid.offset(self.page_size)))?;
        file.write_all(bytes)?;
        file.flush()?;
        debug!("wrote page {} ({} bytes)", pid, bytes.len());
        Ok(())
    }

    /// Appends a new zeroed page at the end of the file and returns its
    /// `PageId`. Used by `HeapFile::insert_tuple` to grow the file before
    /// the page is ever brought through the buffer pool.
    pub fn append_blank_page(&self) -> StorageResult<PageId> {
        let mut file = self.file.lock().unwrap();
        let len = file.metadata()?.len();
        let page_index = (len / self.page_size as u64) as usize;
        let pid = PageId::new(self.table_id, page_index);
        file.seek(SeekFrom::Start(pid.offset(self.page_size)))?;
        file.write_all(&vec![0u8; self.page_size])?;
        file.flush()?;
        Ok(pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn write_then_read_round_trips() {
        let tmp = NamedTempFile::new().unwrap();
        let store = PageStore::open(tmp.path(), 1, 128).unwrap();
        let pid = store.append_blank_page().unwrap();
        let mut data = vec![0u8; 128];
        data[0] = 42;
        store.write(pid, &data).unwrap();
        let read_back = store.read(pid).unwrap();
        assert_eq!(read_back[0], 42);
    }

    #[test]
    fn append_grows_num_pages() {
        let tmp = NamedTempFile::new().unwrap();
        let store = PageStore::open(tmp.path(), 1, 128).unwrap();
        assert_eq!(store.num_pages().unwrap(), 0);
        store.append_blank_page().unwrap();
        assert_eq!(store.num_pages().unwrap(), 1);
        store.append_blank_page().unwrap();
        assert_eq!(store.num_pages().unwrap(), 2);
    }
}
