mod common;

use txstore::{FieldValue, Predicate, TableStats, TransactionId, TupleAccessor};

struct SingleIntAccessor;

impl TupleAccessor for SingleIntAccessor {
    fn num_fields(&self, _bytes: &[u8]) -> usize {
        1
    }

    fn field_value(&self, bytes: &[u8], _field_index: usize) -> FieldValue {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&bytes[0..8]);
        FieldValue::Int(i64::from_le_bytes(buf))
    }
}

fn encode(v: i64) -> Vec<u8> {
    let mut bytes = vec![0u8; 20];
    bytes[0..8].copy_from_slice(&v.to_le_bytes());
    bytes
}

#[test]
fn selectivity_estimates_match_uniform_distribution() {
    let (heap_file, _catalog, _bp, _tmp) = common::single_table_heap_file(4096, 20, 16);

    let tid = TransactionId::new();
    for v in 1..=100 {
        heap_file.insert_tuple(tid, encode(v)).unwrap();
    }

    let stats =
        TableStats::compute_with_buckets(&heap_file, &SingleIntAccessor, tid, 10).unwrap();
    assert_eq!(stats.estimate_table_cardinality(1.0), 100);

    let eq_sel = stats.estimate_selectivity_int(0, Predicate::Equals, 42);
    assert!((eq_sel - 0.001).abs() < 0.01, "eq_sel was {}", eq_sel);

    let gt_sel = stats.estimate_selectivity_int(0, Predicate::GreaterThan, 50);
    assert!((gt_sel - 0.50).abs() < 0.05, "gt_sel was {}", gt_sel);
}
