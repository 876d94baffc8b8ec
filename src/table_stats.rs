use std::collections::HashMap;
use std::sync::Arc;

use log::info;
use once_cell::sync::OnceCell;
use std::sync::RwLock;

use crate::error::StorageResult;
use crate::heap_file::HeapFile;
use crate::histogram::{IntHistogram, Predicate, StringHistogram};
use crate::transaction_id::TransactionId;

const DEFAULT_NUM_BUCKETS: usize = 100;

/// A single field's typed value, as surfaced by `TupleAccessor`. The
/// storage core otherwise treats tuples as opaque bytes; this is the
/// narrow seam `TableStats` needs to build histograms.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Str(String),
}

/// Lets `TableStats::compute` read typed field values out of a `Tuple`
/// without the storage core depending on a schema or value system.
/// Callers implement this against whatever row/schema representation
/// sits above this crate.
pub trait TupleAccessor {
    fn num_fields(&self, bytes: &[u8]) -> usize;
    fn field_value(&self, bytes: &[u8], field_index: usize) -> FieldValue;
}

enum FieldHistogram {
    Int(IntHistogram),
    Str(StringHistogram),
}

impl FieldHistogram {
    fn ntuples(&self) -> u64 {
        match self {
            FieldHistogram::Int(h) => h.ntuples(),
            FieldHistogram::Str(h) => h.ntuples(),
        }
    }
}

/// Per-table statistics built from a two-pass heap-file scan: one pass to
/// find each field's min/max, a second to populate per-field equi-width
/// histograms. Used to estimate scan cost and predicate selectivity
/// without touching the table itself.
pub struct TableStats {
    histograms: Vec<FieldHistogram>,
    num_pages: usize,
    num_tuples: u64,
}

impl TableStats {
    pub fn compute<A: TupleAccessor>(
        heap_file: &HeapFile,
        accessor: &A,
        tid: TransactionId,
    ) -> StorageResult<Self> {
        Self::compute_with_buckets(heap_file, accessor, tid, DEFAULT_NUM_BUCKETS)
    }

    pub fn compute_with_buckets<A: TupleAccessor>(
        heap_file: &HeapFile,
        accessor: &A,
        tid: TransactionId,
        num_buckets: usize,
    ) -> StorageResult<Self> {
        let mut num_fields = 0usize;
        let mut int_bounds: Vec<Option<(i64, i64)>> = Vec::new();
        let mut is_str: Vec<bool> = Vec::new();
        let mut num_tuples = 0u64;

        for tuple in heap_file.iter(tid) {
            let tuple = tuple?;
            if num_tuples == 0 {
                num_fields = accessor.num_fields(&tuple.bytes);
                int_bounds = vec![None; num_fields];
                is_str = vec![false; num_fields];
            }
            for field in 0..num_fields {
                match accessor.field_value(&tuple.bytes, field) {
                    FieldValue::Int(v) => {
                        let bounds = int_bounds[field].get_or_insert((v, v));
                        bounds.0 = bounds.0.min(v);
                        bounds.1 = bounds.1.max(v);
                    }
                    FieldValue::Str(_) => {
                        is_str[field] = true;
                    }
                }
            }
            num_tuples += 1;
        }

        let mut histograms: Vec<FieldHistogram> = (0..num_fields)
            .map(|field| {
                if is_str[field] {
                    FieldHistogram::Str(StringHistogram::new(num_buckets))
                } else {
                    let (lo, hi) = int_bounds[field].unwrap_or((0, 0));
                    FieldHistogram::Int(IntHistogram::new(num_buckets, lo, hi))
                }
            })
            .collect();

        for tuple in heap_file.iter(tid) {
            let tuple = tuple?;
            for field in 0..num_fields {
                match (&mut histograms[field], accessor.field_value(&tuple.bytes, field)) {
                    (FieldHistogram::Int(h), FieldValue::Int(v)) => h.add_value(v),
                    (FieldHistogram::Str(h), FieldValue::Str(s)) => h.add_value(&s),
                    _ => {}
                }
            }
        }

        let num_pages = heap_file.num_pages()?;
        info!(
            "computed table stats: {} tuples over {} pages",
            num_tuples, num_pages
        );

        Ok(Self {
            histograms,
            num_pages,
            num_tuples,
        })
    }

    /// Estimated I/O cost of a full sequential scan: one page read per
    /// page, weighted by `page_cost`.
    pub fn estimate_scan_cost(&self, page_cost: f64) -> f64 {
        self.num_pages as f64 * page_cost
    }

    /// Estimated number of tuples satisfying a predicate of selectivity
    /// `factor`: `floor(n * factor)`.
    pub fn estimate_table_cardinality(&self, factor: f64) -> u64 {
        (self.num_tuples as f64 * factor).floor() as u64
    }

    pub fn estimate_selectivity_int(&self, field: usize, op: Predicate, constant: i64) -> f64 {
        match self.histograms.get(field) {
            Some(FieldHistogram::Int(h)) => h.estimate_selectivity(op, constant),
            _ => 1.0,
        }
    }

    pub fn estimate_selectivity_str(&self, field: usize, op: Predicate, constant: &str) -> f64 {
        match self.histograms.get(field) {
            Some(FieldHistogram::Str(h)) => h.estimate_selectivity(op, constant),
            _ => 1.0,
        }
    }

    pub fn field_ntuples(&self, field: usize) -> u64 {
        self.histograms.get(field).map_or(0, FieldHistogram::ntuples)
    }
}

/// Process-wide table-name -> `TableStats` registry. Populated explicitly
/// by callers (typically once at startup per table) rather than lazily
/// computed on first lookup.
static REGISTRY: OnceCell<RwLock<HashMap<String, Arc<TableStats>>>> = OnceCell::new();

fn registry() -> &'static RwLock<HashMap<String, Arc<TableStats>>> {
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

pub fn set_table_stats(table_name: &str, stats: TableStats) {
    registry()
        .write()
        .unwrap()
        .insert(table_name.to_string(), Arc::new(stats));
}

pub fn get_table_stats(table_name: &str) -> Option<Arc<TableStats>> {
    registry().read().unwrap().get(table_name).cloned()
}
