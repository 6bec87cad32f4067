use crate::grid::{GridError, SpatialGrid};
use crate::parallel::ExecutionSpace;
use crate::positions::PositionSource;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info_span;

/// Particles bucketed by grid cell. Buckets are laid out along a Morton
/// curve so that spatially close cells are close in memory.
#[derive(Clone, Debug, Default)]
pub struct LinkedCells {
    /// particles[sorted_idx] = original_idx
    particles: Vec<usize>,
    /// cell_starts[bin_rank] = start index in particles
    cell_starts: Vec<usize>,
    /// Maps cardinal cell index to Morton rank
    bin_ranks: Vec<usize>,
    /// Cardinal cell of each particle, by original index
    particle_cells: Vec<usize>,
    dims: [usize; 3],
}

impl LinkedCells {
    /// Rebins every particle of `positions`, reusing the existing buffers.
    ///
    /// Fails with [`GridError::TooManyCells`] when the per-cell tables cannot
    /// be allocated.
    pub fn bin<E, P>(
        &mut self,
        exec: &E,
        grid: &SpatialGrid,
        positions: &P,
    ) -> Result<(), GridError>
    where
        E: ExecutionSpace + ?Sized,
        P: PositionSource + ?Sized,
    {
        let _span = info_span!("LinkedCells::bin", n_particles = positions.len()).entered();
        let n = positions.len();
        let dims = grid.dims();
        let total_cells = grid.num_cells();

        if self.dims != dims || self.bin_ranks.len() != total_cells {
            let _s = info_span!("compute_bin_ranks").entered();
            self.bin_ranks.clear();
            self.dims = [0; 3];
            try_grow(&mut self.bin_ranks, total_cells, dims)?;
            self.bin_ranks.resize(total_cells, 0);
            let mut bin_morton: Vec<(u64, usize)> = Vec::new();
            try_grow(&mut bin_morton, total_cells, dims)?;
            bin_morton.extend((0..total_cells).map(|c| {
                let [i, j, k] = grid.ijk_from_cardinal(c);
                (morton_3(i as u64, j as u64, k as u64), c)
            }));
            bin_morton.sort_unstable_by_key(|&(z, _)| z);
            for (rank, &(_z, cell)) in bin_morton.iter().enumerate() {
                self.bin_ranks[cell] = rank;
            }
            self.dims = dims;
        }

        // Cell lookup is the only per-particle floating point work, so it is
        // the part worth dispatching.
        let cells: Vec<AtomicUsize> = (0..n).map(|_| AtomicUsize::new(0)).collect();
        {
            let _s = info_span!("locate_particles").entered();
            exec.parallel_for(0..n, |p| {
                let cell = grid.cell_of(&positions.position(p));
                cells[p].store(cell, Ordering::Relaxed);
            });
        }
        self.particle_cells.clear();
        self.particle_cells
            .extend(cells.into_iter().map(AtomicUsize::into_inner));

        let mut counts: Vec<usize> = Vec::new();
        try_grow(&mut counts, total_cells, dims)?;
        counts.resize(total_cells, 0);
        for &cell in &self.particle_cells {
            counts[self.bin_ranks[cell]] += 1;
        }

        self.cell_starts.clear();
        try_grow(&mut self.cell_starts, total_cells.saturating_add(1), dims)?;
        let mut accum = 0;
        for c in counts {
            self.cell_starts.push(accum);
            accum += c;
        }
        self.cell_starts.push(accum);

        let _s = info_span!("bin_fill").entered();
        let mut current_fill = self.cell_starts.clone();
        self.particles.clear();
        self.particles.resize(n, 0);
        for (p, &cell) in self.particle_cells.iter().enumerate() {
            let rank = self.bin_ranks[cell];
            self.particles[current_fill[rank]] = p;
            current_fill[rank] += 1;
        }
        Ok(())
    }

    pub fn num_particles(&self) -> usize {
        self.particles.len()
    }

    /// Cardinal cell index particle `p` was binned into.
    #[inline]
    pub fn cell_of_particle(&self, p: usize) -> usize {
        self.particle_cells[p]
    }

    /// Original indices of the particles in a cardinal cell.
    #[inline]
    pub fn particles_in_cell(&self, cell: usize) -> &[usize] {
        let rank = self.bin_ranks[cell];
        &self.particles[self.cell_starts[rank]..self.cell_starts[rank + 1]]
    }

    pub fn get_particles_in_bin(&self, i: usize, j: usize, k: usize) -> &[usize] {
        if i >= self.dims[0] || j >= self.dims[1] || k >= self.dims[2] {
            return &[];
        }
        self.particles_in_cell(i + self.dims[0] * (j + self.dims[1] * k))
    }
}

fn try_grow<T>(buf: &mut Vec<T>, len: usize, dims: [usize; 3]) -> Result<(), GridError> {
    buf.try_reserve_exact(len.saturating_sub(buf.len()))
        .map_err(|_| GridError::TooManyCells {
            dims: dims.map(|d| d as f64),
        })
}

fn morton_3(x: u64, y: u64, z: u64) -> u64 {
    interleave_3(x) | (interleave_3(y) << 1) | (interleave_3(z) << 2)
}

fn interleave_3(mut x: u64) -> u64 {
    x &= 0x1fffff;
    x = (x | x << 32) & 0x1f00000000ffffu64;
    x = (x | x << 16) & 0x1f0000ff0000ffu64;
    x = (x | x << 8) & 0x100f00f00f00f00fu64;
    x = (x | x << 4) & 0x10c30c30c30c30c3u64;
    x = (x | x << 2) & 0x1249249249249249u64;
    x
}
