/// Comparison operator a histogram can estimate selectivity for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEq,
    LessThan,
    LessThanOrEq,
}

/// Equi-width histogram over an integer domain `[min, max]`, used to
/// estimate selectivity of a comparison against a constant without
/// scanning the underlying table.
pub struct IntHistogram {
    buckets: Vec<u64>,
    bucket_lo: Vec<i64>,
    bucket_width: Vec<i64>,
    min: i64,
    max: i64,
    ntuples: u64,
}

impl IntHistogram {
    /// `num_buckets` equi-width buckets spanning `[min, max]` inclusive,
    /// widths differing by at most one: the first `span % num_buckets`
    /// buckets get width `ceil(span / num_buckets)`, the rest get width
    /// `floor(span / num_buckets)`, where `span = max - min + 1`. Assumes
    /// `num_buckets <= span`; a caller that violates this gets degenerate
    /// (but not panicking) buckets.
    pub fn new(num_buckets: usize, min: i64, max: i64) -> Self {
        assert!(num_buckets > 0, "num_buckets must be positive");
        assert!(max >= min, "max must be >= min");
        let span = max - min + 1;
        let base_width = span / num_buckets as i64;
        let remainder = span % num_buckets as i64;

        let mut bucket_lo = Vec::with_capacity(num_buckets);
        let mut bucket_width = Vec::with_capacity(num_buckets);
        let mut lo = min;
        for i in 0..num_buckets {
            let width = std::cmp::max(
                if (i as i64) < remainder {
                    base_width + 1
                } else {
                    base_width
                },
                1,
            );
            bucket_lo.push(lo);
            bucket_width.push(width);
            lo += width;
        }

        Self {
            buckets: vec![0; num_buckets],
            bucket_lo,
            bucket_width,
            min,
            max,
            ntuples: 0,
        }
    }

    fn bucket_index(&self, value: i64) -> usize {
        match self.bucket_lo.binary_search(&value) {
            Ok(i) => i,
            Err(0) => 0,
            Err(i) => i - 1,
        }
    }

    pub fn add_value(&mut self, value: i64) {
        let idx = self.bucket_index(value.clamp(self.min, self.max));
        self.buckets[idx] += 1;
        self.ntuples += 1;
    }

    fn bucket_hi(&self, idx: usize) -> i64 {
        if idx + 1 < self.bucket_lo.len() {
            self.bucket_lo[idx + 1] - 1
        } else {
            self.max
        }
    }

    /// Fraction of stored values satisfying `value op constant`, as a
    /// float in `[0.0, 1.0]`. Within a bucket, values are assumed to be
    /// distributed uniformly across its range.
    pub fn estimate_selectivity(&self, op: Predicate, constant: i64) -> f64 {
        if self.ntuples == 0 {
            return 0.0;
        }
        let n = self.ntuples as f64;

        match op {
            Predicate::Equals => {
                if constant < self.min || constant > self.max {
                    return 0.0;
                }
                let idx = self.bucket_index(constant);
                let height = self.buckets[idx] as f64;
                height / (self.bucket_width[idx] as f64) / n
            }
            Predicate::NotEquals => 1.0 - self.estimate_selectivity(Predicate::Equals, constant),
            Predicate::GreaterThan => {
                if constant < self.min {
                    return 1.0;
                }
                if constant >= self.max {
                    return 0.0;
                }
                let idx = self.bucket_index(constant);
                let hi = self.bucket_hi(idx);
                let height = self.buckets[idx] as f64;
                let fraction_in_bucket = (hi - constant) as f64 / (self.bucket_width[idx] as f64);
                let within = fraction_in_bucket.max(0.0) * height;
                let rest: u64 = self.buckets[idx + 1..].iter().sum();
                (within + rest as f64) / n
            }
            Predicate::GreaterThanOrEq => {
                self.estimate_selectivity(Predicate::GreaterThan, constant - 1)
            }
            Predicate::LessThan => {
                1.0 - self.estimate_selectivity(Predicate::GreaterThanOrEq, constant)
            }
            Predicate::LessThanOrEq => {
                1.0 - self.estimate_selectivity(Predicate::GreaterThan, constant)
            }
        }
        .clamp(0.0, 1.0)
    }

    pub fn ntuples(&self) -> u64 {
        self.ntuples
    }
}

/// 24-bit, order-preserving hash of a string's first three bytes,
/// projecting strings onto the `[0, 2^24 - 1]` integer domain so a
/// `StringHistogram` can delegate to `IntHistogram`. Order-preserving up
/// to the first three bytes: strings sharing that prefix collide into
/// one bucket, matching the rough-estimate intent of this histogram.
pub fn string_to_hash(s: &str) -> i64 {
    let mut bytes = s.bytes();
    let b0 = bytes.next().unwrap_or(0) as i64;
    let b1 = bytes.next().unwrap_or(0) as i64;
    let b2 = bytes.next().unwrap_or(0) as i64;
    (b0 << 16) | (b1 << 8) | b2
}

/// Equi-width histogram over strings, implemented by hashing each string
/// into `[0, 2^24 - 1]` via `string_to_hash` and delegating to an
/// `IntHistogram` over that domain.
pub struct StringHistogram {
    inner: IntHistogram,
}

impl StringHistogram {
    pub fn new(num_buckets: usize) -> Self {
        Self {
            inner: IntHistogram::new(num_buckets, 0, (1 << 24) - 1),
        }
    }

    pub fn add_value(&mut self, s: &str) {
        self.inner.add_value(string_to_hash(s));
    }

    pub fn estimate_selectivity(&self, op: Predicate, constant: &str) -> f64 {
        self.inner
            .estimate_selectivity(op, string_to_hash(constant))
    }

    pub fn ntuples(&self) -> u64 {
        self.inner.ntuples()
    }
}
