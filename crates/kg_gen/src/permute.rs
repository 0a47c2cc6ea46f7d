//! Reproducible random permutations ("rand_sort").
//!
//! A variant of the rand_sort algorithm of Cong & Bader ("An Empirical
//! Analysis of Parallel Random Permutation Algorithms on SMPs", Georgia Tech
//! TR GT-CSE-06-06): every element draws a random key into a closed hash
//! table, keys act as buckets, buckets are sorted into a canonical order and
//! then Fisher–Yates shuffled with a per-key stream. Chosen over plain
//! parallel shuffles because the output is bytewise identical for any worker
//! count: element `i` hashes with the stream at `skip(1, i, 0)` and bucket
//! `h` reshuffles with the stream at `skip(1, h, 100)`, regardless of who
//! computes them.

use kg_core::mrg::MrgState;
use kg_core::{shuffle, uniform_below};

use crate::transport::AllToAll;

/// Key marking an unoccupied hash-table slot.
const EMPTY_KEY: u64 = u64::MAX;

/// A `(key, value)` pair; also the unit of the distributed exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slot {
    pub key: u64,
    pub value: u64,
}

/// Closed-addressing hash table with linear probing. Probes run from the
/// start slot to the end of the table and then wrap to the front once; the
/// run of occupied slots starting at a key's home position contains every
/// entry carrying that key.
struct BucketTable {
    slots: Vec<Slot>,
}

impl BucketTable {
    fn new(len: usize) -> Self {
        BucketTable {
            slots: vec![
                Slot {
                    key: EMPTY_KEY,
                    value: 0,
                };
                len
            ],
        }
    }

    /// Claim the first empty slot at or after `probe_from`. Single-owner
    /// tables claim with a plain conditional store; a concurrent variant
    /// would compare-and-set the key, with the same visible contract.
    fn insert(&mut self, key: u64, value: u64, probe_from: u64) {
        let start = probe_from as usize;
        for i in start..self.slots.len() {
            if self.slots[i].key == EMPTY_KEY {
                self.slots[i] = Slot { key, value };
                return;
            }
        }
        for i in 0..start {
            if self.slots[i].key == EMPTY_KEY {
                self.slots[i] = Slot { key, value };
                return;
            }
        }
        panic!("hash table overflow inserting key {key}");
    }

    fn count_key(&self, key: u64, probe_from: u64) -> u64 {
        let start = probe_from as usize;
        let mut count = 0;
        let mut i = start;
        while i < self.slots.len() && self.slots[i].key != EMPTY_KEY {
            if self.slots[i].key == key {
                count += 1;
            }
            i += 1;
        }
        if i == self.slots.len() {
            let mut j = 0;
            while j < start && self.slots[j].key != EMPTY_KEY {
                if self.slots[j].key == key {
                    count += 1;
                }
                j += 1;
            }
        }
        count
    }

    /// Copy every value carrying `key` into `out`, returning how many were
    /// written. Visit order is probe order; callers canonicalize afterwards.
    fn gather(&self, key: u64, probe_from: u64, out: &mut [u64]) -> usize {
        let start = probe_from as usize;
        let mut written = 0;
        let mut i = start;
        while i < self.slots.len() && self.slots[i].key != EMPTY_KEY {
            if self.slots[i].key == key {
                out[written] = self.slots[i].value;
                written += 1;
            }
            i += 1;
        }
        if i == self.slots.len() {
            let mut j = 0;
            while j < start && self.slots[j].key != EMPTY_KEY {
                if self.slots[j].key == key {
                    out[written] = self.slots[j].value;
                    written += 1;
                }
                j += 1;
            }
        }
        written
    }
}

/// Selection sort. Deliberate: bucket contents must reach a canonical order
/// that does not depend on insertion order, buckets are tiny, and a fancier
/// unstable sort would not buy anything here.
fn selection_sort(a: &mut [u64]) {
    for i in 0..a.len().saturating_sub(1) {
        let mut min = i;
        for j in i + 1..a.len() {
            if a[j] < a[min] {
                min = j;
            }
        }
        if min != i {
            a.swap(i, min);
        }
    }
}

fn table_len_for(n: u64) -> u64 {
    2 * n + 128 // must exceed n; the slack keeps probe chains short
}

/// Canonicalize and scramble one bucket in place.
fn finalize_bucket(root: &MrgState, key: u64, bucket: &mut [u64]) {
    if bucket.len() > 1 {
        selection_sort(bucket);
        let mut st = *root;
        st.skip(1, key, 100);
        shuffle(&mut st, bucket);
    }
}

/// Exclusive prefix sum in place; returns the total.
fn exclusive_prefix_sum(counts: &mut [u64]) -> u64 {
    let mut running = 0u64;
    for c in counts.iter_mut() {
        let this = *c;
        *c = running;
        running += this;
    }
    running
}

/// Fill `result` with a random permutation of `[0, result.len())`.
///
/// The root state is only forked, never advanced.
pub fn rand_sort_shared(root: &MrgState, result: &mut [u64]) {
    let n = result.len() as u64;
    let table_len = table_len_for(n);
    let mut table = BucketTable::new(table_len as usize);

    // Hash every element into the table with a positionally-derived key.
    for i in 0..n {
        let mut st = *root;
        st.skip(1, i, 0);
        let key = uniform_below(&mut st, table_len);
        table.insert(key, i, key);
    }

    // Per-key counts, then output offsets.
    let mut starts: Vec<u64> = (0..table_len).map(|h| table.count_key(h, h)).collect();
    let total = exclusive_prefix_sum(&mut starts);
    assert_eq!(total, n, "bucket totals must cover every element");

    for h in 0..table_len {
        let start = starts[h as usize] as usize;
        let count = table.gather(h, h, &mut result[start..]);
        finalize_bucket(root, h, &mut result[start..start + count]);
    }
}

/// Distributed variant: returns this rank's slice of the permutation. The
/// concatenation of all ranks' slices in rank order equals the output of
/// [`rand_sort_shared`] for the same root state and `n`.
pub fn rand_sort_distributed<X: AllToAll>(net: &mut X, root: &MrgState, n: u64) -> Vec<u64> {
    let size = net.size() as u64;
    let rank = net.rank() as u64;
    debug_assert!(rank < size);
    let table_len = table_len_for(n);

    // The table is distributed by blocks: the first `table_len % size` ranks
    // hold one extra slot. Block (rather than cyclic) distribution is what
    // lets the per-rank results concatenate into the shared-variant output.
    let base = table_len / size;
    let cutoff_rank = table_len % size;
    let cutoff_index = cutoff_rank * (base + 1);
    let owner = |key: u64| {
        if key < cutoff_index {
            key / (base + 1)
        } else {
            cutoff_rank + (key - cutoff_index) / base
        }
    };
    let my_len = base + u64::from(rank < cutoff_rank);
    let my_start = if rank < cutoff_rank {
        rank * (base + 1)
    } else {
        cutoff_index + (rank - cutoff_rank) * base
    };
    let my_end = my_start + my_len;

    // Elements are assigned cyclically; their distribution does not matter.
    let elements_here = n / size + u64::from(rank < n % size);
    let mut outbound: Vec<Vec<Slot>> = vec![Vec::new(); size as usize];
    for i in 0..elements_here {
        let element = i * size + rank;
        let mut st = *root;
        st.skip(1, element, 0);
        let key = uniform_below(&mut st, table_len);
        outbound[owner(key) as usize].push(Slot {
            key,
            value: element,
        });
    }

    let inbound = net.exchange(outbound);

    // Build the local table slice; probing stays within the slice.
    let mut table = BucketTable::new(my_len as usize);
    for pair in &inbound {
        debug_assert_eq!(owner(pair.key), rank);
        table.insert(pair.key, pair.value, pair.key - my_start);
    }

    let mut result = vec![0u64; inbound.len()];
    let mut starts: Vec<u64> = (my_start..my_end)
        .map(|h| table.count_key(h, h - my_start))
        .collect();
    let total = exclusive_prefix_sum(&mut starts);
    assert_eq!(
        total,
        inbound.len() as u64,
        "bucket totals must cover every received element"
    );

    for h in my_start..my_end {
        let start = starts[(h - my_start) as usize] as usize;
        let count = table.gather(h, h - my_start, &mut result[start..]);
        // Reshuffle keys by their global table index, same as the shared run.
        finalize_bucket(root, h, &mut result[start..start + count]);
    }
    result
}
