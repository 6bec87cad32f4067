use crate::binning::LinkedCells;
use crate::config;
use crate::grid::{CellStencil, Domain, GridError};
use crate::layout::{CsrLayout, LayoutError, NeighborLayout, PaddedLayout};
use crate::neighbor_list::{AccessError, NeighborList, NeighborListMut, check_slot};
use crate::parallel::{ExecutionSpace, Rayon};
use crate::positions::PositionSource;
use nalgebra::Vector3;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tracing::{debug, info_span, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("Build range [{begin}, {end}) is invalid for {len} particles")]
    InvalidRange { begin: usize, end: usize, len: usize },
    #[error(
        "Particle {particle} needs {required} neighbor slots but only {capacity} were allocated after the last build attempt"
    )]
    CapacityExceeded {
        particle: usize,
        required: usize,
        capacity: usize,
    },
    #[error("At least one build attempt is required")]
    InvalidAttempts,
}

/// Which pairs a list stores.
pub trait NeighborSemantics: Default + Debug + Send + Sync + 'static {
    const NAME: &'static str;

    /// Whether candidate `j` is recorded under target `i`.
    fn accepts(i: usize, j: usize) -> bool;
}

/// Every qualifying pair is stored under both particles.
#[derive(Clone, Copy, Debug, Default)]
pub struct FullNeighborTag;

impl NeighborSemantics for FullNeighborTag {
    const NAME: &'static str = "full";

    #[inline(always)]
    fn accepts(i: usize, j: usize) -> bool {
        i != j
    }
}

/// Every qualifying pair is stored once, under its lower index.
#[derive(Clone, Copy, Debug, Default)]
pub struct HalfNeighborTag;

impl NeighborSemantics for HalfNeighborTag {
    const NAME: &'static str = "half";

    #[inline(always)]
    fn accepts(i: usize, j: usize) -> bool {
        i < j
    }
}

/// How the candidate scan is split into parallel work items.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BuildOp {
    /// One work item per target particle.
    #[default]
    Particle,
    /// One work item per (target particle, stencil cell). Items for the same
    /// particle run concurrently and meet only in its atomic counters.
    ParticleCell,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildOptions {
    /// Initial per-particle slot guess. For fixed-stride layouts this lets
    /// the first attempt skip the count pass; a low guess costs one retry.
    pub capacity_hint: Option<usize>,
    /// Count+fill attempts before giving up on an overflowing row.
    pub max_attempts: usize,
    pub op: BuildOp,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            capacity_hint: None,
            max_attempts: config::get_max_build_attempts(),
            op: BuildOp::default(),
        }
    }
}

impl BuildOptions {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity_hint = Some(capacity);
        self
    }

    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_op(mut self, op: BuildOp) -> Self {
        self.op = op;
        self
    }
}

/// Cell-list Verlet neighbor list.
///
/// `S` picks half or full semantics, `L` the storage layout. Both are
/// fixed for the lifetime of the list; every `build` recomputes the whole
/// list from scratch.
#[derive(Debug, Default)]
pub struct VerletList<S: NeighborSemantics, L: NeighborLayout> {
    layout: L,
    bins: LinkedCells,
    counters: Vec<AtomicUsize>,
    options: BuildOptions,
    built: bool,
    _semantics: PhantomData<S>,
}

pub type FullCsrList = VerletList<FullNeighborTag, CsrLayout>;
pub type FullPaddedList = VerletList<FullNeighborTag, PaddedLayout>;
pub type HalfCsrList = VerletList<HalfNeighborTag, CsrLayout>;
pub type HalfPaddedList = VerletList<HalfNeighborTag, PaddedLayout>;

impl<S: NeighborSemantics, L: NeighborLayout> Clone for VerletList<S, L> {
    fn clone(&self) -> Self {
        Self {
            layout: self.layout.clone(),
            bins: self.bins.clone(),
            // Scratch only, rebuilt on the next build.
            counters: Vec::new(),
            options: self.options.clone(),
            built: self.built,
            _semantics: PhantomData,
        }
    }
}

impl<S: NeighborSemantics, L: NeighborLayout> VerletList<S, L> {
    /// Builds a list for targets in `range` on the default execution space.
    pub fn new<P>(
        positions: &P,
        range: Range<usize>,
        radius: f64,
        ratio: f64,
        grid_min: [f64; 3],
        grid_max: [f64; 3],
    ) -> Result<Self, BuildError>
    where
        P: PositionSource + ?Sized,
    {
        Self::with_options(
            positions,
            range,
            radius,
            ratio,
            grid_min,
            grid_max,
            BuildOptions::default(),
        )
    }

    pub fn with_options<P>(
        positions: &P,
        range: Range<usize>,
        radius: f64,
        ratio: f64,
        grid_min: [f64; 3],
        grid_max: [f64; 3],
        options: BuildOptions,
    ) -> Result<Self, BuildError>
    where
        P: PositionSource + ?Sized,
    {
        let mut list = Self {
            options,
            ..Self::default()
        };
        list.build(positions, range, radius, ratio, grid_min, grid_max)?;
        Ok(list)
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Options used by subsequent builds.
    pub fn set_options(&mut self, options: BuildOptions) {
        self.options = options;
    }

    /// False before the first build and after a failed one.
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Physical storage, for consumers that want the raw arrays.
    pub fn layout(&self) -> &L {
        &self.layout
    }

    /// Rebuilds on the default execution space.
    pub fn build<P>(
        &mut self,
        positions: &P,
        range: Range<usize>,
        radius: f64,
        ratio: f64,
        grid_min: [f64; 3],
        grid_max: [f64; 3],
    ) -> Result<(), BuildError>
    where
        P: PositionSource + ?Sized,
    {
        self.build_with(
            &Rayon::default(),
            positions,
            range,
            radius,
            ratio,
            grid_min,
            grid_max,
        )
    }

    /// Recomputes the list for targets in `range` against every particle in
    /// `positions`, replacing any previous contents.
    ///
    /// Invalid arguments are rejected before the old contents are touched.
    /// If the rows still overflow after `max_attempts` attempts, or the grid
    /// or neighbor storage cannot be allocated, the list is left empty and
    /// unbuilt.
    pub fn build_with<E, P>(
        &mut self,
        exec: &E,
        positions: &P,
        range: Range<usize>,
        radius: f64,
        ratio: f64,
        grid_min: [f64; 3],
        grid_max: [f64; 3],
    ) -> Result<(), BuildError>
    where
        E: ExecutionSpace + ?Sized,
        P: PositionSource + ?Sized,
    {
        let n = positions.len();
        let _span = info_span!(
            "VerletList::build",
            semantics = S::NAME,
            layout = L::NAME,
            n_particles = n,
            begin = range.start,
            end = range.end
        )
        .entered();

        if range.start > range.end || range.end > n {
            return Err(BuildError::InvalidRange {
                begin: range.start,
                end: range.end,
                len: n,
            });
        }
        if self.options.max_attempts == 0 {
            return Err(BuildError::InvalidAttempts);
        }
        let domain = Domain::new(grid_min, grid_max)?;
        let stencil = CellStencil::new(domain, radius, ratio)?;

        self.built = false;
        if let Err(e) = self.bins.bin(exec, &stencil.grid, positions) {
            self.layout.clear();
            return Err(e.into());
        }
        if self.counters.len() != n {
            self.counters.resize_with(n, || AtomicUsize::new(0));
        }

        let ctx = SearchContext {
            stencil: &stencil,
            bins: &self.bins,
            positions,
            radius_sq: radius * radius,
        };
        let op = self.options.op;
        // No row can hold more than every other particle.
        let mut capacity = self
            .options
            .capacity_hint
            .unwrap_or(0)
            .min(n.saturating_sub(1));
        let mut plan_from_hint = L::FIXED_STRIDE && self.options.capacity_hint.is_some();
        let mut overflow = (0, 0, 0);

        for attempt in 0..self.options.max_attempts {
            let planned = if plan_from_hint {
                self.layout.plan_uniform(n, capacity)
            } else {
                reset(&mut self.counters);
                {
                    let _s = info_span!("count_pass", attempt).entered();
                    let counters = &self.counters;
                    ctx.for_each_pair::<S, _, _>(exec, op, range.clone(), |i, _j| {
                        counters[i].fetch_add(1, Ordering::Relaxed);
                    });
                }
                let counts = snapshot(&self.counters);
                self.layout.plan_exact(&counts, capacity)
            };
            if let Err(e) = planned {
                self.layout.clear();
                return Err(e.into());
            }
            debug!(
                attempt,
                from_hint = plan_from_hint,
                slots = self.layout.slots().len(),
                "planned neighbor storage"
            );

            reset(&mut self.counters);
            {
                let _s = info_span!("fill_pass", attempt).entered();
                let counters = &self.counters;
                let layout = &self.layout;
                ctx.for_each_pair::<S, _, _>(exec, op, range.clone(), |i, j| {
                    let slot = counters[i].fetch_add(1, Ordering::Relaxed);
                    if slot < layout.row_capacity(i) {
                        layout.store(i, slot, j);
                    }
                });
            }
            let filled = snapshot(&self.counters);

            match find_overflow(&self.layout, &filled, range.clone()) {
                None => {
                    self.layout.commit(&filled);
                    self.built = true;
                    debug!(
                        attempts = attempt + 1,
                        total = filled.iter().sum::<usize>(),
                        "neighbor list built"
                    );
                    return Ok(());
                }
                Some((particle, required)) => {
                    let available = self.layout.row_capacity(particle);
                    warn!(
                        attempt,
                        particle, required, available, "neighbor storage overflow, regrowing"
                    );
                    overflow = (particle, required, available);
                    capacity = capacity.max(required);
                    plan_from_hint = false;
                }
            }
        }

        self.layout.clear();
        let (particle, required, capacity) = overflow;
        Err(BuildError::CapacityExceeded {
            particle,
            required,
            capacity,
        })
    }
}

impl<S: NeighborSemantics, L: NeighborLayout> NeighborList for VerletList<S, L> {
    #[inline]
    fn num_particles(&self) -> usize {
        self.layout.num_particles()
    }

    #[inline]
    fn num_neighbor(&self, i: usize) -> usize {
        self.layout.count(i)
    }

    #[inline]
    fn neighbor(&self, i: usize, n: usize) -> usize {
        debug_assert!(
            n < self.layout.count(i),
            "neighbor {n} out of range for particle {i}"
        );
        self.layout.load(i, n)
    }
}

impl<S: NeighborSemantics, L: NeighborLayout> NeighborListMut for VerletList<S, L> {
    fn set_neighbor(&self, i: usize, n: usize, value: usize) -> Result<(), AccessError> {
        check_slot(self, i, n)?;
        self.layout.store(i, n, value);
        Ok(())
    }
}

fn reset(counters: &mut [AtomicUsize]) {
    for c in counters {
        *c.get_mut() = 0;
    }
}

fn snapshot(counters: &[AtomicUsize]) -> Vec<usize> {
    counters.iter().map(|c| c.load(Ordering::Relaxed)).collect()
}

/// The row with the largest shortfall, if any row received more neighbors
/// than it had slots for.
fn find_overflow<L: NeighborLayout>(
    layout: &L,
    filled: &[usize],
    range: Range<usize>,
) -> Option<(usize, usize)> {
    range
        .filter(|&i| filled[i] > layout.row_capacity(i))
        .max_by_key(|&i| filled[i])
        .map(|i| (i, filled[i]))
}

/// Everything the candidate scan reads during one build.
struct SearchContext<'a, P: ?Sized> {
    stencil: &'a CellStencil,
    bins: &'a LinkedCells,
    positions: &'a P,
    radius_sq: f64,
}

impl<P: PositionSource + ?Sized> SearchContext<'_, P> {
    #[inline]
    fn scan_cell<S: NeighborSemantics>(
        &self,
        i: usize,
        pos_i: &Vector3<f64>,
        cell: usize,
        on_accept: &mut impl FnMut(usize),
    ) {
        for &j in self.bins.particles_in_cell(cell) {
            if !S::accepts(i, j) {
                continue;
            }
            let disp = self.positions.position(j) - pos_i;
            if disp.norm_squared() <= self.radius_sq {
                on_accept(j);
            }
        }
    }

    fn scan_particle<S: NeighborSemantics>(&self, i: usize, mut on_accept: impl FnMut(usize)) {
        let pos_i = self.positions.position(i);
        let grid = &self.stencil.grid;
        let cells = self.stencil.get_cells(self.bins.cell_of_particle(i));
        for [a, b, c] in cells.iter() {
            let cell = grid.cardinal_cell_index(a, b, c);
            self.scan_cell::<S>(i, &pos_i, cell, &mut on_accept);
        }
    }

    /// Calls `f(i, j)` for every accepted pair with `i` in `targets`, split
    /// into work items according to `op`.
    fn for_each_pair<S, E, F>(&self, exec: &E, op: BuildOp, targets: Range<usize>, f: F)
    where
        S: NeighborSemantics,
        E: ExecutionSpace + ?Sized,
        F: Fn(usize, usize) + Sync + Send,
    {
        match op {
            BuildOp::Particle => {
                exec.parallel_for(targets, |i| self.scan_particle::<S>(i, |j| f(i, j)));
            }
            BuildOp::ParticleCell => {
                let per_particle = self.stencil.max_cells();
                let begin = targets.start;
                exec.parallel_for(0..targets.len() * per_particle, |task| {
                    let i = begin + task / per_particle;
                    let home = self.bins.cell_of_particle(i);
                    if let Some(cell) = self.stencil.stencil_cell(home, task % per_particle) {
                        let pos_i = self.positions.position(i);
                        self.scan_cell::<S>(i, &pos_i, cell, &mut |j| f(i, j));
                    }
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brute_force::brute_force_neighbors;
    use crate::parallel::Serial;

    const MIN: [f64; 3] = [0.0; 3];
    const MAX: [f64; 3] = [10.0; 3];

    fn lattice(n: usize, spacing: f64) -> Vec<Vector3<f64>> {
        let mut positions = Vec::new();
        for i in 0..n {
            for j in 0..n {
                for k in 0..n {
                    positions.push(Vector3::new(
                        0.3 + i as f64 * spacing,
                        0.3 + j as f64 * spacing,
                        0.3 + k as f64 * spacing,
                    ));
                }
            }
        }
        positions
    }

    fn sorted_rows<L: NeighborList>(list: &L) -> Vec<Vec<usize>> {
        (0..list.num_particles())
            .map(|i| {
                let mut row: Vec<usize> = list.neighbors(i).collect();
                row.sort_unstable();
                row
            })
            .collect()
    }

    #[test]
    fn test_simple_pair() {
        let positions = vec![[1.0, 1.0, 1.0], [1.5, 1.0, 1.0], [5.0, 5.0, 5.0]];
        let full = FullCsrList::new(&positions, 0..3, 1.0, 1.0, MIN, MAX).unwrap();
        assert!(full.is_built());
        assert_eq!(sorted_rows(&full), vec![vec![1], vec![0], vec![]]);

        let half = HalfPaddedList::new(&positions, 0..3, 1.0, 1.0, MIN, MAX).unwrap();
        assert_eq!(sorted_rows(&half), vec![vec![1], vec![], vec![]]);
        assert_eq!(half.layout().capacity(), 1);
    }

    #[test]
    fn test_distance_at_radius_is_included() {
        let positions = vec![[2.0, 2.0, 2.0], [3.0, 2.0, 2.0]];
        let list = FullPaddedList::new(&positions, 0..2, 1.0, 1.0, MIN, MAX).unwrap();
        assert_eq!(list.total_neighbor(), 2);
    }

    #[test]
    fn test_matches_brute_force_all_combinations() {
        let positions = lattice(6, 1.1);
        let radius = 1.6;
        let n = positions.len();
        let expected_full = brute_force_neighbors(positions.as_slice(), 0..n, radius, false);
        let expected_half = brute_force_neighbors(positions.as_slice(), 0..n, radius, true);

        for op in [BuildOp::Particle, BuildOp::ParticleCell] {
            for ratio in [1.0, 0.5, 0.3] {
                let options = BuildOptions::default().with_op(op);
                let mut full = FullCsrList::default();
                full.set_options(options.clone());
                full.build_with(&Serial, &positions, 0..n, radius, ratio, MIN, MAX)
                    .unwrap();
                assert_eq!(sorted_rows(&full), expected_full);

                let mut half = HalfPaddedList::default();
                half.set_options(options);
                half.build_with(&Rayon::default(), &positions, 0..n, radius, ratio, MIN, MAX)
                    .unwrap();
                assert_eq!(sorted_rows(&half), expected_half);
            }
        }
    }

    #[test]
    fn test_hint_overflow_retries() {
        let positions = lattice(5, 0.9);
        let options = BuildOptions::default().with_capacity(1).with_max_attempts(2);
        let small = FullPaddedList::with_options(&positions, 0..125, 1.0, 1.0, MIN, MAX, options)
            .unwrap();
        let large = FullPaddedList::with_options(
            &positions,
            0..125,
            1.0,
            1.0,
            MIN,
            MAX,
            BuildOptions::default().with_capacity(100),
        )
        .unwrap();
        assert_eq!(small.layout().capacity(), 6);
        assert_eq!(large.layout().capacity(), 100);
        assert_eq!(sorted_rows(&small), sorted_rows(&large));
    }

    #[test]
    fn test_capacity_exceeded_after_last_attempt() {
        let positions = lattice(3, 0.9);
        let options = BuildOptions::default().with_capacity(1).with_max_attempts(1);
        let err = FullPaddedList::with_options(&positions, 0..27, 1.0, 1.0, MIN, MAX, options)
            .unwrap_err();
        match err {
            BuildError::CapacityExceeded {
                required, capacity, ..
            } => {
                assert_eq!(required, 6);
                assert_eq!(capacity, 1);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_failed_build_leaves_list_unbuilt() {
        let positions = lattice(3, 0.9);
        let mut list = FullPaddedList::new(&positions, 0..27, 1.0, 1.0, MIN, MAX).unwrap();
        assert_eq!(list.num_particles(), 27);

        list.set_options(BuildOptions::default().with_capacity(1).with_max_attempts(1));
        assert!(list.build(&positions, 0..27, 1.0, 1.0, MIN, MAX).is_err());
        assert!(!list.is_built());
        assert_eq!(list.num_particles(), 0);
        assert_eq!(list.total_neighbor(), 0);
    }

    #[test]
    fn test_invalid_arguments_keep_prior_list() {
        let positions = lattice(3, 0.9);
        let mut list = HalfCsrList::new(&positions, 0..27, 1.0, 1.0, MIN, MAX).unwrap();
        let before = sorted_rows(&list);

        assert_eq!(
            list.build(&positions, 5..30, 1.0, 1.0, MIN, MAX),
            Err(BuildError::InvalidRange {
                begin: 5,
                end: 30,
                len: 27
            })
        );
        assert_eq!(
            list.build(&positions, Range { start: 5, end: 2 }, 1.0, 1.0, MIN, MAX),
            Err(BuildError::InvalidRange {
                begin: 5,
                end: 2,
                len: 27
            })
        );
        assert_eq!(
            list.build(&positions, 0..27, -1.0, 1.0, MIN, MAX),
            Err(BuildError::Grid(GridError::InvalidRadius(-1.0)))
        );
        assert!(matches!(
            list.build(&positions, 0..27, 1.0, 2.0, MIN, MAX),
            Err(BuildError::Grid(GridError::InvalidRatio(_)))
        ));
        assert!(matches!(
            list.build(&positions, 0..27, 1.0, 1.0, MAX, MIN),
            Err(BuildError::Grid(GridError::InvalidDomain { axis: 0, .. }))
        ));
        list.set_options(BuildOptions::default().with_max_attempts(0));
        assert_eq!(
            list.build(&positions, 0..27, 1.0, 1.0, MIN, MAX),
            Err(BuildError::InvalidAttempts)
        );

        assert!(list.is_built());
        assert_eq!(sorted_rows(&list), before);
    }

    #[test]
    fn test_oversized_hint_is_clamped() {
        let positions = vec![[1.0, 1.0, 1.0], [1.5, 1.0, 1.0], [5.0, 5.0, 5.0]];
        let options = BuildOptions::default().with_capacity(usize::MAX / 2);
        let list =
            FullPaddedList::with_options(&positions, 0..3, 1.0, 1.0, MIN, MAX, options).unwrap();
        assert_eq!(list.layout().capacity(), 2);
        assert_eq!(sorted_rows(&list), vec![vec![1], vec![0], vec![]]);
    }

    #[test]
    fn test_unallocatable_grid_fails_cleanly() {
        let positions = vec![[1.0, 1.0, 1.0], [1.5, 1.0, 1.0]];
        let mut list = FullCsrList::new(&positions, 0..2, 1.0, 1.0, MIN, MAX).unwrap();

        // 1e15 cells pass the size check but cannot be allocated.
        let err = list.build(&positions, 0..2, 1e-4, 1.0, MIN, MAX).unwrap_err();
        assert!(matches!(err, BuildError::Grid(GridError::TooManyCells { .. })));
        assert!(!list.is_built());
        assert_eq!(list.num_particles(), 0);

        list.build(&positions, 0..2, 1.0, 1.0, MIN, MAX).unwrap();
        assert_eq!(sorted_rows(&list), vec![vec![1], vec![0]]);
    }

    #[test]
    fn test_set_neighbor_bounds() {
        let positions = vec![[1.0, 1.0, 1.0], [1.5, 1.0, 1.0]];
        let list = FullCsrList::new(&positions, 0..2, 1.0, 1.0, MIN, MAX).unwrap();
        assert_eq!(list.try_neighbor(0, 0), Ok(1));
        assert_eq!(
            list.set_neighbor(0, 1, 9),
            Err(AccessError::NeighborOutOfRange {
                particle: 0,
                index: 1,
                count: 1
            })
        );
        assert_eq!(
            list.try_neighbor(2, 0),
            Err(AccessError::ParticleOutOfRange {
                particle: 2,
                len: 2
            })
        );
        list.set_neighbor(0, 0, 9).unwrap();
        assert_eq!(list.neighbor(0, 0), 9);
        assert_eq!(list.num_neighbor(0), 1);
        assert_eq!(list.neighbor(1, 0), 0);
    }

    #[test]
    fn test_empty_positions() {
        let positions: Vec<[f64; 3]> = Vec::new();
        let list = HalfCsrList::new(&positions, 0..0, 1.0, 1.0, MIN, MAX).unwrap();
        assert!(list.is_built());
        assert_eq!(list.num_particles(), 0);
        assert_eq!(list.max_neighbor(), 0);
    }

    #[test]
    fn test_clone_is_independent() {
        let positions = vec![[1.0, 1.0, 1.0], [1.5, 1.0, 1.0]];
        let list = FullPaddedList::new(&positions, 0..2, 1.0, 1.0, MIN, MAX).unwrap();
        let copy = list.clone();
        list.set_neighbor(0, 0, 7).unwrap();
        assert_eq!(copy.neighbor(0, 0), 1);
        assert_eq!(list.neighbor(0, 0), 7);
    }

    #[cfg(feature = "dhat-heap")]
    #[test]
    fn test_memory_profile() {
        let _profiler = dhat::Profiler::new_heap();

        let mut positions = Vec::new();
        for i in 0..50 {
            for j in 0..50 {
                positions.push(Vector3::new(i as f64 * 0.2, j as f64 * 0.2, 5.0));
            }
        }

        let mut list = HalfCsrList::default();
        list.build(&positions, 0..positions.len(), 1.0, 0.5, MIN, MAX)
            .unwrap();
        list.build(&positions, 0..positions.len(), 1.0, 0.5, MIN, MAX)
            .unwrap();
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_build_matches_brute_force(
                radius in 0.5..2.5,
                ratio in 0.25..1.0,
                half in any::<bool>(),
                positions_data in prop::collection::vec(prop::collection::vec(0.0..10.0, 3), 0..60)
            ) {
                let positions: Vec<Vector3<f64>> = positions_data
                    .iter()
                    .map(|p| Vector3::new(p[0], p[1], p[2]))
                    .collect();
                let n = positions.len();
                let expected = brute_force_neighbors(positions.as_slice(), 0..n, radius, half);

                let rows = if half {
                    let list = HalfPaddedList::new(&positions, 0..n, radius, ratio, MIN, MAX).unwrap();
                    sorted_rows(&list)
                } else {
                    let list = FullCsrList::new(&positions, 0..n, radius, ratio, MIN, MAX).unwrap();
                    sorted_rows(&list)
                };
                prop_assert_eq!(rows, expected);
            }
        }
    }
}
