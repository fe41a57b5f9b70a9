#![deny(missing_docs)]
#![doc = "Core traits and data types for coupling-knob synthesis on collider lattice models."]

use serde::{Deserialize, Serialize};

pub mod errors;
pub mod expr;
pub mod provenance;
mod types;

pub use errors::{CmkError, ErrorInfo};
pub use expr::{Expr, VarLookup};
pub use provenance::{SchemaVersion, SourceDigest};
pub use types::{
    coefficient_name, knob_name, Beam, CorrectorMatcher, KnobComponent, Sector, MQS_PER_SECTOR,
};

/// Named-variable store exposed by a lattice model.
///
/// Values are plain `f64`s. Writing a variable that dependent expressions
/// reference must trigger re-evaluation of those expressions (the
/// recompute-on-write obligation of the model, not of its callers).
pub trait VariableStore {
    /// Returns the current value of the named variable, if present.
    fn value(&self, name: &str) -> Option<f64>;

    /// Creates or updates the named variable.
    ///
    /// Errors surface from re-evaluating dependent expressions, never from
    /// the write itself.
    fn set_value(&mut self, name: &str, value: f64) -> Result<(), CmkError>;

    /// Returns whether the named variable exists.
    fn contains_variable(&self, name: &str) -> bool;

    /// Returns all variable names in deterministic order.
    fn variable_names(&self) -> Box<dyn ExactSizeIterator<Item = &str> + '_>;
}

/// Registry of lattice elements with indexed skew-strength attributes.
pub trait ElementRegistry {
    /// Returns all element names in deterministic order.
    fn element_names(&self) -> Box<dyn ExactSizeIterator<Item = &str> + '_>;

    /// Returns the current skew strength of the given multipole order.
    fn skew_strength(&self, element: &str, order: usize) -> Result<f64, CmkError>;

    /// Binds the skew strength of the given multipole order to a dependent
    /// expression, replacing any previous binding on that attribute.
    ///
    /// The expression is evaluated immediately and again on every write to
    /// a variable it references.
    fn bind_skew_strength(&mut self, element: &str, order: usize, expr: Expr)
        -> Result<(), CmkError>;
}

/// Combined surface required to install knobs into a model.
pub trait KnobHost: VariableStore + ElementRegistry {}

impl<T> KnobHost for T where T: VariableStore + ElementRegistry {}

/// Global optical quantities evaluated from the current variable state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwissSummary {
    /// Horizontal tune.
    pub qx: f64,
    /// Vertical tune.
    pub qy: f64,
    /// Coupling closest-tune-approach `|C-|`.
    pub c_minus: f64,
}

/// Lattice model that can evaluate global optics on top of knob hosting.
pub trait LatticeModel: KnobHost {
    /// Evaluates tunes and coupling from the current variable state.
    fn twiss(&self) -> Result<TwissSummary, CmkError>;
}
