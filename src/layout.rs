//! Physical storage for neighbor lists.
//!
//! Both layouts keep one row per particle and hand out atomic slots during
//! the fill pass. [`CsrLayout`] packs rows back to back behind an offset
//! array; [`PaddedLayout`] gives every row the same stride.

use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Neighbor storage of {rows} rows x {capacity} slots overflows usize")]
    SizeOverflow { rows: usize, capacity: usize },
    #[error("Could not allocate {slots} neighbor slots")]
    AllocationFailed { slots: usize },
}

pub trait NeighborLayout: Clone + Default + Debug + Send + Sync {
    /// Short name used in logs.
    const NAME: &'static str;

    /// Whether every row has the same capacity. Fixed-stride layouts can be
    /// sized from a capacity guess before any counting has happened.
    const FIXED_STRIDE: bool;

    /// Sizes the rows from exact per-particle counts. `min_capacity` is a
    /// lower bound on the row width for fixed-stride layouts.
    fn plan_exact(&mut self, counts: &[usize], min_capacity: usize) -> Result<(), LayoutError>;

    /// Gives every one of `num_particles` rows `capacity` slots. Only called
    /// when `FIXED_STRIDE` is true.
    fn plan_uniform(&mut self, num_particles: usize, capacity: usize)
    -> Result<(), LayoutError>;

    /// First slot of row `i` in [`NeighborLayout::slots`].
    fn row_start(&self, i: usize) -> usize;

    /// Slots available to row `i` under the current plan.
    fn row_capacity(&self, i: usize) -> usize;

    fn slots(&self) -> &[AtomicUsize];

    /// Records the final per-row counts once the fill pass succeeded.
    fn commit(&mut self, counts: &[usize]);

    fn num_particles(&self) -> usize;

    fn count(&self, i: usize) -> usize;

    /// Drops all rows, keeping allocations.
    fn clear(&mut self);

    /// Writes `value` to slot `n` of row `i`. `n` must be below `row_capacity(i)`.
    #[inline]
    fn store(&self, i: usize, n: usize, value: usize) {
        debug_assert!(n < self.row_capacity(i));
        self.slots()[self.row_start(i) + n].store(value, Ordering::Relaxed);
    }

    #[inline]
    fn load(&self, i: usize, n: usize) -> usize {
        self.slots()[self.row_start(i) + n].load(Ordering::Relaxed)
    }
}

fn copy_slots(slots: &[AtomicUsize]) -> Vec<AtomicUsize> {
    slots
        .iter()
        .map(|s| AtomicUsize::new(s.load(Ordering::Relaxed)))
        .collect()
}

fn resize_slots(slots: &mut Vec<AtomicUsize>, len: usize) -> Result<(), LayoutError> {
    if slots.len() > len {
        slots.truncate(len);
    } else {
        slots
            .try_reserve_exact(len - slots.len())
            .map_err(|_| LayoutError::AllocationFailed { slots: len })?;
        slots.resize_with(len, || AtomicUsize::new(0));
    }
    Ok(())
}

/// Compressed rows: `offsets` of length `N + 1` and a flat neighbor array of
/// length `offsets[N]`.
#[derive(Debug, Default)]
pub struct CsrLayout {
    offsets: Vec<usize>,
    neighbors: Vec<AtomicUsize>,
}

impl CsrLayout {
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Flat neighbor ids, row `i` at `offsets[i]..offsets[i + 1]`.
    pub fn neighbors(&self) -> Vec<usize> {
        self.neighbors
            .iter()
            .map(|n| n.load(Ordering::Relaxed))
            .collect()
    }
}

impl Clone for CsrLayout {
    fn clone(&self) -> Self {
        Self {
            offsets: self.offsets.clone(),
            neighbors: copy_slots(&self.neighbors),
        }
    }
}

impl NeighborLayout for CsrLayout {
    const NAME: &'static str = "csr";
    const FIXED_STRIDE: bool = false;

    fn plan_exact(&mut self, counts: &[usize], _min_capacity: usize) -> Result<(), LayoutError> {
        self.offsets.clear();
        self.offsets.reserve(counts.len() + 1);
        let mut accum = 0usize;
        for &c in counts {
            self.offsets.push(accum);
            accum = accum
                .checked_add(c)
                .ok_or(LayoutError::SizeOverflow {
                    rows: counts.len(),
                    capacity: c,
                })?;
        }
        self.offsets.push(accum);
        resize_slots(&mut self.neighbors, accum)
    }

    fn plan_uniform(&mut self, num_particles: usize, capacity: usize) -> Result<(), LayoutError> {
        num_particles
            .checked_mul(capacity)
            .ok_or(LayoutError::SizeOverflow {
                rows: num_particles,
                capacity,
            })?;
        self.plan_exact(&vec![capacity; num_particles], capacity)
    }

    #[inline]
    fn row_start(&self, i: usize) -> usize {
        self.offsets[i]
    }

    #[inline]
    fn row_capacity(&self, i: usize) -> usize {
        self.offsets[i + 1] - self.offsets[i]
    }

    fn slots(&self) -> &[AtomicUsize] {
        &self.neighbors
    }

    fn commit(&mut self, counts: &[usize]) {
        // Rows were planned from the same counts; a mismatch means the fill
        // pass saw a different candidate set than the count pass.
        debug_assert!(
            counts
                .iter()
                .enumerate()
                .all(|(i, &c)| c == self.row_capacity(i))
        );
    }

    fn num_particles(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    #[inline]
    fn count(&self, i: usize) -> usize {
        self.row_capacity(i)
    }

    fn clear(&mut self) {
        self.offsets.clear();
        self.neighbors.clear();
    }
}

/// Fixed-stride rows: `counts` of length `N` and an `N x capacity` matrix.
/// Slots past `counts[i]` in row `i` hold stale values.
#[derive(Debug, Default)]
pub struct PaddedLayout {
    counts: Vec<usize>,
    neighbors: Vec<AtomicUsize>,
    capacity: usize,
    num_particles: usize,
}

impl PaddedLayout {
    /// Row stride of the neighbor matrix.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Row-major `N x capacity` copy of the neighbor matrix.
    pub fn neighbors(&self) -> Vec<usize> {
        self.neighbors
            .iter()
            .map(|n| n.load(Ordering::Relaxed))
            .collect()
    }
}

impl Clone for PaddedLayout {
    fn clone(&self) -> Self {
        Self {
            counts: self.counts.clone(),
            neighbors: copy_slots(&self.neighbors),
            capacity: self.capacity,
            num_particles: self.num_particles,
        }
    }
}

impl NeighborLayout for PaddedLayout {
    const NAME: &'static str = "padded";
    const FIXED_STRIDE: bool = true;

    fn plan_exact(&mut self, counts: &[usize], min_capacity: usize) -> Result<(), LayoutError> {
        let max_count = counts.iter().copied().max().unwrap_or(0);
        self.plan_uniform(counts.len(), max_count.max(min_capacity))
    }

    fn plan_uniform(&mut self, num_particles: usize, capacity: usize) -> Result<(), LayoutError> {
        let slots = num_particles
            .checked_mul(capacity)
            .ok_or(LayoutError::SizeOverflow {
                rows: num_particles,
                capacity,
            })?;
        resize_slots(&mut self.neighbors, slots)?;
        self.num_particles = num_particles;
        self.capacity = capacity;
        self.counts.clear();
        self.counts.resize(num_particles, 0);
        Ok(())
    }

    #[inline]
    fn row_start(&self, i: usize) -> usize {
        i * self.capacity
    }

    #[inline]
    fn row_capacity(&self, _i: usize) -> usize {
        self.capacity
    }

    fn slots(&self) -> &[AtomicUsize] {
        &self.neighbors
    }

    fn commit(&mut self, counts: &[usize]) {
        self.counts.clear();
        self.counts.extend_from_slice(counts);
    }

    fn num_particles(&self) -> usize {
        self.num_particles
    }

    #[inline]
    fn count(&self, i: usize) -> usize {
        self.counts[i]
    }

    fn clear(&mut self) {
        self.counts.clear();
        self.neighbors.clear();
        self.capacity = 0;
        self.num_particles = 0;
    }
}
