use std::fmt;

/// The four error kinds the storage core can raise. Callers match on these
/// directly rather than string-sniff a message.
#[derive(Debug)]
pub enum StorageError {
    /// Raised synchronously from `BufferPool::get_page` when the deadlock
    /// detector finds a cycle that would be completed by granting the
    /// request. The transaction is not auto-cleaned up: the caller must
    /// still call `BufferPool::transaction_complete(tid, false)`.
    TransactionAborted,
    /// Eviction could not proceed because every buffered page is dirty.
    /// NO-STEAL refuses to write dirty pages of in-flight transactions to
    /// disk, so this surfaces instead of silently violating that rule.
    CapacityExhausted,
    /// A page read or write against the backing file failed.
    Io(std::io::Error),
    /// The access method refused an operation against its own invariants,
    /// e.g. inserting a tuple whose size doesn't match a page's slot size,
    /// or deleting a tuple whose record id is stale.
    Precondition(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StorageError::TransactionAborted => {
                write!(f, "transaction aborted: deadlock detected")
            }
            StorageError::CapacityExhausted => write!(
                f,
                "buffer pool capacity exhausted: every buffered page is dirty"
            ),
            StorageError::Io(e) => write!(f, "page i/o error: {}", e),
            StorageError::Precondition(msg) => write!(f, "precondition violated: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
