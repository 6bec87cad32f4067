pub mod binning;
pub mod brute_force;
pub mod config;
pub mod grid;
pub mod layout;
pub mod neighbor_list;
pub mod parallel;
pub mod positions;
pub mod traversal;
pub mod verlet;

#[cfg(feature = "python")]
mod python_api;

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

pub use grid::{CellRange, CellStencil, Domain, GridError, SpatialGrid};
pub use layout::{CsrLayout, LayoutError, NeighborLayout, PaddedLayout};
pub use neighbor_list::{
    AccessError, NeighborIter, NeighborList, NeighborListMut, for_each_neighbor,
};
pub use parallel::{ExecutionSpace, Rayon, Serial};
pub use positions::PositionSource;
pub use traversal::{
    Dispatch, first_neighbor_parallel_for, first_neighbor_parallel_reduce,
    second_neighbor_parallel_for, second_neighbor_parallel_reduce,
};
pub use verlet::{
    BuildError, BuildOp, BuildOptions, FullCsrList, FullNeighborTag, FullPaddedList, HalfCsrList,
    HalfNeighborTag, HalfPaddedList, NeighborSemantics, VerletList,
};

use tracing_subscriber::EnvFilter;

/// Installs a `tracing` subscriber on stderr. `RUST_LOG` wins over `level`,
/// which defaults to `info`. Calling it again after a subscriber is set is a
/// no-op.
pub fn init_logging(level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or("info")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .with_thread_ids(true)
        .try_init();
}
