//! Reference lattice model implementing the `cmk-core` contracts.
//!
//! The model keeps a named-variable store, an element registry with indexed
//! skew-strength attributes, and the dependent-expression bindings between
//! them. Writes to a variable re-evaluate every binding that references it.

mod model;
mod twiss;

pub use model::{RingModel, MAX_MULTIPOLE_ORDER};
