//! Layout-agnostic access to a built neighbor list.
//!
//! Traversal code only sees [`NeighborList`], so it works unchanged on
//! compressed and padded storage.

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    #[error("Particle {particle} is out of range for a list of {len} particles")]
    ParticleOutOfRange { particle: usize, len: usize },
    #[error("Neighbor {index} is out of range for particle {particle} with {count} neighbors")]
    NeighborOutOfRange {
        particle: usize,
        index: usize,
        count: usize,
    },
}

pub trait NeighborList: Sync {
    /// Number of rows, one per particle in the position set the list was
    /// built from.
    fn num_particles(&self) -> usize;

    /// Neighbor count of particle `i`. Zero for particles outside the built
    /// range.
    fn num_neighbor(&self, i: usize) -> usize;

    /// Id of the `n`-th neighbor of particle `i`, `n < num_neighbor(i)`.
    ///
    /// # Panics
    /// On an out-of-range `i` or `n` (checked in debug builds; release builds
    /// still panic on `i` or on a slot past the storage end). Use
    /// [`NeighborList::try_neighbor`] for a checked lookup.
    fn neighbor(&self, i: usize, n: usize) -> usize;

    fn try_neighbor(&self, i: usize, n: usize) -> Result<usize, AccessError> {
        check_slot(self, i, n)?;
        Ok(self.neighbor(i, n))
    }

    fn max_neighbor(&self) -> usize {
        (0..self.num_particles())
            .map(|i| self.num_neighbor(i))
            .max()
            .unwrap_or(0)
    }

    fn total_neighbor(&self) -> usize {
        (0..self.num_particles()).map(|i| self.num_neighbor(i)).sum()
    }

    fn neighbors(&self, i: usize) -> NeighborIter<'_, Self>
    where
        Self: Sized,
    {
        NeighborIter {
            list: self,
            particle: i,
            next: 0,
            count: self.num_neighbor(i),
        }
    }
}

pub trait NeighborListMut: NeighborList {
    /// Overwrites the `n`-th neighbor of particle `i`. The count is unchanged.
    fn set_neighbor(&self, i: usize, n: usize, value: usize) -> Result<(), AccessError>;
}

pub(crate) fn check_slot<L: NeighborList + ?Sized>(
    list: &L,
    i: usize,
    n: usize,
) -> Result<(), AccessError> {
    let len = list.num_particles();
    if i >= len {
        return Err(AccessError::ParticleOutOfRange { particle: i, len });
    }
    let count = list.num_neighbor(i);
    if n >= count {
        return Err(AccessError::NeighborOutOfRange {
            particle: i,
            index: n,
            count,
        });
    }
    Ok(())
}

#[derive(Debug)]
pub struct NeighborIter<'a, L> {
    list: &'a L,
    particle: usize,
    next: usize,
    count: usize,
}

impl<L: NeighborList> Iterator for NeighborIter<'_, L> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.next == self.count {
            return None;
        }
        let j = self.list.neighbor(self.particle, self.next);
        self.next += 1;
        Some(j)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rem = self.count - self.next;
        (rem, Some(rem))
    }
}

impl<L: NeighborList> ExactSizeIterator for NeighborIter<'_, L> {}

/// Calls `f(i, j)` for every neighbor `j` of particle `i` on the calling
/// thread. Pairs with a caller-driven outer loop over particles.
pub fn for_each_neighbor<L, F>(list: &L, i: usize, mut f: F)
where
    L: NeighborList + ?Sized,
    F: FnMut(usize, usize),
{
    for n in 0..list.num_neighbor(i) {
        f(i, list.neighbor(i, n));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rows(Vec<Vec<usize>>);

    impl NeighborList for Rows {
        fn num_particles(&self) -> usize {
            self.0.len()
        }
        fn num_neighbor(&self, i: usize) -> usize {
            self.0[i].len()
        }
        fn neighbor(&self, i: usize, n: usize) -> usize {
            self.0[i][n]
        }
    }

    #[test]
    fn test_derived_statistics() {
        let list = Rows(vec![vec![1, 2], vec![0], vec![], vec![0, 1, 2]]);
        assert_eq!(list.max_neighbor(), 3);
        assert_eq!(list.total_neighbor(), 6);
        assert_eq!(Rows(Vec::new()).max_neighbor(), 0);
    }

    #[test]
    fn test_iterator_is_exact() {
        let list = Rows(vec![vec![4, 7, 9]]);
        let mut iter = list.neighbors(0);
        assert_eq!(iter.len(), 3);
        assert_eq!(iter.next(), Some(4));
        assert_eq!(iter.len(), 2);
        assert_eq!(iter.collect::<Vec<_>>(), vec![7, 9]);
    }

    #[test]
    fn test_checked_access() {
        let list = Rows(vec![vec![1], vec![]]);
        assert_eq!(list.try_neighbor(0, 0), Ok(1));
        assert_eq!(
            list.try_neighbor(1, 0),
            Err(AccessError::NeighborOutOfRange {
                particle: 1,
                index: 0,
                count: 0
            })
        );
        assert_eq!(
            list.try_neighbor(5, 0),
            Err(AccessError::ParticleOutOfRange { particle: 5, len: 2 })
        );
    }

    #[test]
    fn test_for_each_neighbor_visits_row() {
        let list = Rows(vec![vec![], vec![0, 2]]);
        let mut pairs = Vec::new();
        for_each_neighbor(&list, 1, |i, j| pairs.push((i, j)));
        assert_eq!(pairs, vec![(1, 0), (1, 2)]);
    }
}
