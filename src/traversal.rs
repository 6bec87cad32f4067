//! Parallel loops over the pairs and triples of a neighbor list.
//!
//! Each helper restricts the outer particle index to a range and runs on an
//! [`ExecutionSpace`]. With [`Dispatch::Nested`] every particle is one work
//! item that walks its own row; with [`Dispatch::Flattened`] every pair (or
//! triple) is its own work item, which balances load when row lengths vary
//! a lot.

use crate::neighbor_list::NeighborList;
use crate::parallel::ExecutionSpace;
use std::ops::Range;
use tracing::info_span;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Dispatch {
    /// Outer parallel loop over particles, serial loop over each row.
    #[default]
    Nested,
    /// One work item per pair or triple, located through a prefix sum.
    Flattened,
}

/// Prefix sum of `work(count(i))` over `range`, `range.len() + 1` entries.
fn work_offsets<L, W>(list: &L, range: Range<usize>, work: W) -> Vec<usize>
where
    L: NeighborList + ?Sized,
    W: Fn(usize) -> usize,
{
    let mut offsets = Vec::with_capacity(range.len() + 1);
    let mut accum = 0;
    offsets.push(0);
    for i in range {
        accum += work(list.num_neighbor(i));
        offsets.push(accum);
    }
    offsets
}

/// Maps a flat task id to (row position in the range, rank within the row).
#[inline]
fn locate(offsets: &[usize], task: usize) -> (usize, usize) {
    let row = offsets.partition_point(|&o| o <= task) - 1;
    (row, task - offsets[row])
}

#[inline]
fn pair_work(count: usize) -> usize {
    count * count.saturating_sub(1)
}

/// Decodes the `rank`-th ordered pair `(n1, n2)`, `n1 != n2`, of a row with
/// `count` entries.
#[inline]
fn decode_pair(rank: usize, count: usize) -> (usize, usize) {
    let n1 = rank / (count - 1);
    let m = rank % (count - 1);
    let n2 = if m >= n1 { m + 1 } else { m };
    (n1, n2)
}

#[inline]
fn debug_check_range<L: NeighborList + ?Sized>(list: &L, range: &Range<usize>) {
    debug_assert!(
        range.end <= list.num_particles(),
        "traversal range {range:?} exceeds {} particles",
        list.num_particles()
    );
}

/// Calls `f(i, j)` once for every neighbor `j` of every particle `i` in `range`.
pub fn first_neighbor_parallel_for<E, L, F>(
    exec: &E,
    list: &L,
    range: Range<usize>,
    dispatch: Dispatch,
    f: F,
) where
    E: ExecutionSpace + ?Sized,
    L: NeighborList + ?Sized,
    F: Fn(usize, usize) + Sync + Send,
{
    let _span = info_span!("first_neighbor_parallel_for", ?dispatch).entered();
    debug_check_range(list, &range);
    match dispatch {
        Dispatch::Nested => exec.parallel_for(range, |i| {
            for n in 0..list.num_neighbor(i) {
                f(i, list.neighbor(i, n));
            }
        }),
        Dispatch::Flattened => {
            let begin = range.start;
            let offsets = work_offsets(list, range, |c| c);
            let total = offsets[offsets.len() - 1];
            exec.parallel_for(0..total, |task| {
                let (row, n) = locate(&offsets, task);
                let i = begin + row;
                f(i, list.neighbor(i, n));
            });
        }
    }
}

/// Calls `f(i, j, k)` once for every ordered pair of distinct neighbor slots
/// `(j, k)` of every particle `i` in `range`.
pub fn second_neighbor_parallel_for<E, L, F>(
    exec: &E,
    list: &L,
    range: Range<usize>,
    dispatch: Dispatch,
    f: F,
) where
    E: ExecutionSpace + ?Sized,
    L: NeighborList + ?Sized,
    F: Fn(usize, usize, usize) + Sync + Send,
{
    let _span = info_span!("second_neighbor_parallel_for", ?dispatch).entered();
    debug_check_range(list, &range);
    match dispatch {
        Dispatch::Nested => exec.parallel_for(range, |i| {
            let count = list.num_neighbor(i);
            for n1 in 0..count {
                let j = list.neighbor(i, n1);
                for n2 in (0..count).filter(|&n2| n2 != n1) {
                    f(i, j, list.neighbor(i, n2));
                }
            }
        }),
        Dispatch::Flattened => {
            let begin = range.start;
            let offsets = work_offsets(list, range, pair_work);
            let total = offsets[offsets.len() - 1];
            exec.parallel_for(0..total, |task| {
                let (row, rank) = locate(&offsets, task);
                let i = begin + row;
                let (n1, n2) = decode_pair(rank, list.num_neighbor(i));
                f(i, list.neighbor(i, n1), list.neighbor(i, n2));
            });
        }
    }
}

/// Reduces `f(i, j)` over the same pairs [`first_neighbor_parallel_for`]
/// visits. `combine` must be associative and commutative.
pub fn first_neighbor_parallel_reduce<E, L, T, F, C>(
    exec: &E,
    list: &L,
    range: Range<usize>,
    dispatch: Dispatch,
    identity: T,
    f: F,
    combine: C,
) -> T
where
    E: ExecutionSpace + ?Sized,
    L: NeighborList + ?Sized,
    T: Clone + Send + Sync,
    F: Fn(usize, usize) -> T + Sync + Send,
    C: Fn(T, T) -> T + Sync + Send,
{
    let _span = info_span!("first_neighbor_parallel_reduce", ?dispatch).entered();
    debug_check_range(list, &range);
    match dispatch {
        Dispatch::Nested => exec.parallel_reduce(
            range,
            identity.clone(),
            |i| {
                let mut acc = identity.clone();
                for n in 0..list.num_neighbor(i) {
                    acc = combine(acc, f(i, list.neighbor(i, n)));
                }
                acc
            },
            &combine,
        ),
        Dispatch::Flattened => {
            let begin = range.start;
            let offsets = work_offsets(list, range, |c| c);
            let total = offsets[offsets.len() - 1];
            exec.parallel_reduce(
                0..total,
                identity,
                |task| {
                    let (row, n) = locate(&offsets, task);
                    let i = begin + row;
                    f(i, list.neighbor(i, n))
                },
                &combine,
            )
        }
    }
}

/// Reduces `f(i, j, k)` over the same triples
/// [`second_neighbor_parallel_for`] visits.
pub fn second_neighbor_parallel_reduce<E, L, T, F, C>(
    exec: &E,
    list: &L,
    range: Range<usize>,
    dispatch: Dispatch,
    identity: T,
    f: F,
    combine: C,
) -> T
where
    E: ExecutionSpace + ?Sized,
    L: NeighborList + ?Sized,
    T: Clone + Send + Sync,
    F: Fn(usize, usize, usize) -> T + Sync + Send,
    C: Fn(T, T) -> T + Sync + Send,
{
    let _span = info_span!("second_neighbor_parallel_reduce", ?dispatch).entered();
    debug_check_range(list, &range);
    match dispatch {
        Dispatch::Nested => exec.parallel_reduce(
            range,
            identity.clone(),
            |i| {
                let mut acc = identity.clone();
                let count = list.num_neighbor(i);
                for n1 in 0..count {
                    let j = list.neighbor(i, n1);
                    for n2 in (0..count).filter(|&n2| n2 != n1) {
                        acc = combine(acc, f(i, j, list.neighbor(i, n2)));
                    }
                }
                acc
            },
            &combine,
        ),
        Dispatch::Flattened => {
            let begin = range.start;
            let offsets = work_offsets(list, range, pair_work);
            let total = offsets[offsets.len() - 1];
            exec.parallel_reduce(
                0..total,
                identity,
                |task| {
                    let (row, rank) = locate(&offsets, task);
                    let i = begin + row;
                    let (n1, n2) = decode_pair(rank, list.num_neighbor(i));
                    f(i, list.neighbor(i, n1), list.neighbor(i, n2))
                },
                &combine,
            )
        }
    }
}
