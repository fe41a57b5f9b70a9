//! Optics-table loading for coupling-knob synthesis.
//!
//! Parses the external optics table (TFS-style text) for named fields only
//! and selects the per-sector skew-quadrupole corrector samples.

mod select;
mod table;

pub use select::{ring_correctors, sector_correctors};
pub use table::{OpticsRecord, OpticsTable};
