use nalgebra::Vector3;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("Radius must be positive and finite, got {0}")]
    InvalidRadius(f64),
    #[error("Cell size ratio must be in (0, 1], got {0}")]
    InvalidRatio(f64),
    #[error("Domain bounds on axis {axis} must be finite with max > min, got [{min}, {max}]")]
    InvalidDomain { axis: usize, min: f64, max: f64 },
    #[error("Grid of {dims:?} cells does not fit in memory")]
    TooManyCells { dims: [f64; 3] },
}

/// Axis-aligned box the grid covers. Supplied by the caller, never inferred
/// from the particles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Domain {
    min: Vector3<f64>,
    max: Vector3<f64>,
}

impl Domain {
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Result<Self, GridError> {
        for axis in 0..3 {
            let (lo, hi) = (min[axis], max[axis]);
            if !lo.is_finite() || !hi.is_finite() || hi <= lo {
                return Err(GridError::InvalidDomain {
                    axis,
                    min: lo,
                    max: hi,
                });
            }
        }
        Ok(Self {
            min: Vector3::from(min),
            max: Vector3::from(max),
        })
    }

    pub fn min(&self) -> &Vector3<f64> {
        &self.min
    }

    pub fn max(&self) -> &Vector3<f64> {
        &self.max
    }

    pub fn extent(&self) -> Vector3<f64> {
        self.max - self.min
    }
}

/// Largest cell count whose Morton sort keys are addressable.
const MAX_CELLS: usize = usize::MAX / std::mem::size_of::<(u64, usize)>();

/// Uniform grid over a [`Domain`] with cubic cells of edge `radius * ratio`.
#[derive(Clone, Debug)]
pub struct SpatialGrid {
    domain: Domain,
    cell_size: f64,
    inv_cell_size: f64,
    dims: [usize; 3],
}

impl SpatialGrid {
    pub fn new(domain: Domain, radius: f64, ratio: f64) -> Result<Self, GridError> {
        check_radius_ratio(radius, ratio)?;
        let cell_size = radius * ratio;
        let extent = domain.extent();
        let raw = [
            (extent.x / cell_size).ceil(),
            (extent.y / cell_size).ceil(),
            (extent.z / cell_size).ceil(),
        ];
        let total = raw[0] * raw[1] * raw[2];
        if !total.is_finite() || total > MAX_CELLS as f64 {
            return Err(GridError::TooManyCells { dims: raw });
        }
        let dims = [
            (raw[0] as usize).max(1),
            (raw[1] as usize).max(1),
            (raw[2] as usize).max(1),
        ];
        Ok(Self {
            domain,
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            dims,
        })
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn num_cells(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    /// Cell coordinates of a point. Points outside the domain land in the
    /// nearest boundary cell.
    pub fn locate_point(&self, x: f64, y: f64, z: f64) -> [usize; 3] {
        let min = self.domain.min();
        [
            locate_axis(x - min.x, self.inv_cell_size, self.dims[0]),
            locate_axis(y - min.y, self.inv_cell_size, self.dims[1]),
            locate_axis(z - min.z, self.inv_cell_size, self.dims[2]),
        ]
    }

    #[inline]
    pub fn cardinal_cell_index(&self, i: usize, j: usize, k: usize) -> usize {
        i + self.dims[0] * (j + self.dims[1] * k)
    }

    #[inline]
    pub fn ijk_from_cardinal(&self, cell: usize) -> [usize; 3] {
        let i = cell % self.dims[0];
        let j = (cell / self.dims[0]) % self.dims[1];
        let k = cell / (self.dims[0] * self.dims[1]);
        [i, j, k]
    }

    #[inline]
    pub fn cell_of(&self, pos: &Vector3<f64>) -> usize {
        let [i, j, k] = self.locate_point(pos.x, pos.y, pos.z);
        self.cardinal_cell_index(i, j, k)
    }
}

#[inline]
fn locate_axis(offset: f64, inv_cell_size: f64, dim: usize) -> usize {
    let c = (offset * inv_cell_size).floor();
    // NaN and negative offsets both fall through to cell 0.
    if c >= 1.0 {
        (c as usize).min(dim - 1)
    } else {
        0
    }
}

fn check_radius_ratio(radius: f64, ratio: f64) -> Result<(), GridError> {
    if !radius.is_finite() || radius <= 0.0 {
        return Err(GridError::InvalidRadius(radius));
    }
    if !(ratio > 0.0 && ratio <= 1.0) {
        return Err(GridError::InvalidRatio(ratio));
    }
    Ok(())
}

/// Half-open block of cells `[lo, hi)` on each axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellRange {
    pub lo: [usize; 3],
    pub hi: [usize; 3],
}

impl CellRange {
    pub fn len(&self) -> usize {
        (self.hi[0] - self.lo[0]) * (self.hi[1] - self.lo[1]) * (self.hi[2] - self.lo[2])
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cells of the block in row-major order (i fastest).
    pub fn iter(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        (self.lo[2]..self.hi[2]).flat_map(move |k| {
            (self.lo[1]..self.hi[1])
                .flat_map(move |j| (self.lo[0]..self.hi[0]).map(move |i| [i, j, k]))
        })
    }
}

/// Block of cells that must be scanned around any cell so that every point
/// within `radius` of a point in that cell is visited.
#[derive(Clone, Debug)]
pub struct CellStencil {
    pub grid: SpatialGrid,
    reach: usize,
}

impl CellStencil {
    pub fn new(domain: Domain, radius: f64, ratio: f64) -> Result<Self, GridError> {
        let grid = SpatialGrid::new(domain, radius, ratio)?;
        let reach = (radius / grid.cell_size()).ceil() as usize;
        Ok(Self {
            grid,
            reach: reach.max(1),
        })
    }

    /// Stencil half-width in cells, the same on every axis.
    pub fn reach(&self) -> usize {
        self.reach
    }

    /// Number of cells in an unclamped stencil.
    pub fn max_cells(&self) -> usize {
        let w = 2 * self.reach + 1;
        w * w * w
    }

    pub fn get_cells(&self, cell: usize) -> CellRange {
        let center = self.grid.ijk_from_cardinal(cell);
        let dims = self.grid.dims();
        let mut lo = [0; 3];
        let mut hi = [0; 3];
        for d in 0..3 {
            lo[d] = center[d].saturating_sub(self.reach);
            hi[d] = (center[d] + self.reach + 1).min(dims[d]);
        }
        CellRange { lo, hi }
    }

    /// The `slot`-th cell of the unclamped stencil around `cell`, or `None`
    /// when that cell lies outside the grid. Slots enumerate offsets in
    /// row-major order, `slot < max_cells()`.
    pub fn stencil_cell(&self, cell: usize, slot: usize) -> Option<usize> {
        let w = 2 * self.reach + 1;
        let offset = [slot % w, (slot / w) % w, slot / (w * w)];
        let center = self.grid.ijk_from_cardinal(cell);
        let dims = self.grid.dims();
        let mut ijk = [0; 3];
        for d in 0..3 {
            let c = (center[d] + offset[d]).checked_sub(self.reach)?;
            if c >= dims[d] {
                return None;
            }
            ijk[d] = c;
        }
        Some(self.grid.cardinal_cell_index(ijk[0], ijk[1], ijk[2]))
    }
}
