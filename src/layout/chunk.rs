//! Chunk-size selection.
//!
//! Datasets are pre-sized at open time and never resized, so the chunk
//! length must divide the total session length exactly (no ragged final
//! chunk) while staying under the substrate's chunk-size ceiling.

use smallvec::SmallVec;

/// Maximum count of distinct prime-power factors fed into the subset-product
/// enumeration. Beyond this the planner falls back to a downward divisor
/// scan. A u64 has at most 15 distinct prime factors, so the cap only
/// matters for heavily squarefree totals.
const FACTOR_ENUMERATION_LIMIT: usize = 12;

/// Chunking decision for one session: every dataset in the file is laid out
/// as `chunk_count` chunks of `chunk_len` samples each.
///
/// `chunk_len == 0` means no legal chunking exists; callers must treat that
/// as fatal before any dataset is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub chunk_len: u64,
    pub chunk_count: u64,
}

impl ChunkPlan {
    /// Total extent covered by the plan.
    pub fn extent(&self) -> u64 {
        self.chunk_len * self.chunk_count
    }

    /// Whether the plan is usable.
    pub fn is_valid(&self) -> bool {
        self.chunk_len > 0
    }

    fn invalid() -> Self {
        Self { chunk_len: 0, chunk_count: 0 }
    }
}

/// Compute the chunk plan for `total_len` samples under a `max_chunk_len`
/// ceiling.
///
/// Totals below the ceiling are stored as a single chunk. Otherwise the
/// chunk length is the largest subset-product of the total's prime-power
/// factors that does not exceed the ceiling; prime powers above the ceiling
/// are discarded outright. No such product means an invalid plan.
pub fn plan(total_len: u64, max_chunk_len: u64) -> ChunkPlan {
    if total_len == 0 || max_chunk_len == 0 {
        return ChunkPlan::invalid();
    }
    if total_len < max_chunk_len {
        return ChunkPlan { chunk_len: total_len, chunk_count: 1 };
    }

    let factors: SmallVec<[u64; 16]> = prime_power_factors(total_len)
        .into_iter()
        .filter(|&f| f <= max_chunk_len)
        .collect();

    let chunk_len = if factors.len() > FACTOR_ENUMERATION_LIMIT {
        largest_divisor(total_len, max_chunk_len)
    } else {
        best_subset_product(&factors, max_chunk_len)
    };

    if chunk_len == 0 {
        ChunkPlan::invalid()
    } else {
        ChunkPlan { chunk_len, chunk_count: total_len / chunk_len }
    }
}

/// Factor `n` into prime powers: equal primes are folded into one factor,
/// e.g. 2000 -> [16, 125].
fn prime_power_factors(mut n: u64) -> SmallVec<[u64; 16]> {
    let mut factors = SmallVec::new();
    let mut p: u64 = 2;
    while p * p <= n {
        if n % p == 0 {
            let mut power = 1u64;
            while n % p == 0 {
                n /= p;
                power *= p;
            }
            factors.push(power);
        }
        p += if p == 2 { 1 } else { 2 };
    }
    if n > 1 {
        factors.push(n);
    }
    factors
}

/// Largest product of any non-empty factor subset not exceeding `limit`.
fn best_subset_product(factors: &[u64], limit: u64) -> u64 {
    let mut best = 0u64;
    for mask in 1u32..(1u32 << factors.len()) {
        let mut product = 1u64;
        let mut overflow = false;
        for (i, &f) in factors.iter().enumerate() {
            if mask & (1 << i) == 0 {
                continue;
            }
            match product.checked_mul(f) {
                Some(p) if p <= limit => product = p,
                _ => {
                    overflow = true;
                    break;
                }
            }
        }
        if !overflow && product > best {
            best = product;
        }
    }
    best
}

/// Fallback for pathological factor counts: scan downward for the largest
/// exact divisor not exceeding `limit`.
fn largest_divisor(n: u64, limit: u64) -> u64 {
    let mut d = limit.min(n);
    while d > 0 {
        if n % d == 0 {
            return d;
        }
        d -= 1;
    }
    0
}
