//! Cell means, compaction and temporal merging.

mod cells;
mod temporal;

pub use cells::{compact_cells, compute_cell_means, DenseAccumulator};
pub use temporal::{aggregate, aggregate_flat};
