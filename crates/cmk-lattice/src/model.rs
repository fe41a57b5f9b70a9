use std::collections::{BTreeMap, BTreeSet};

use cmk_core::{
    CmkError, ElementRegistry, ErrorInfo, Expr, LatticeModel, TwissSummary, VariableStore,
};
use cmk_optics::{OpticsRecord, OpticsTable};

use crate::twiss::coupling_closest_tune_approach;

/// Highest multipole order the skew-strength attribute array supports.
pub const MAX_MULTIPOLE_ORDER: usize = 5;

const DEFAULT_QX: f64 = 62.31;
const DEFAULT_QY: f64 = 60.32;

type BindingKey = (String, usize);

#[derive(Debug, Clone)]
pub(crate) struct ElementRecord {
    pub(crate) optics: OpticsRecord,
    pub(crate) ksl: Vec<f64>,
}

impl ElementRecord {
    fn new(optics: OpticsRecord) -> Self {
        Self {
            optics,
            ksl: Vec::new(),
        }
    }

    pub(crate) fn skew_strength(&self, order: usize) -> f64 {
        self.ksl.get(order).copied().unwrap_or(0.0)
    }

    fn write_skew_strength(&mut self, order: usize, value: f64) {
        if self.ksl.len() <= order {
            self.ksl.resize(order + 1, 0.0);
        }
        self.ksl[order] = value;
    }
}

/// In-memory ring model built from a parsed optics table.
///
/// One element per table row, optics attached. Tunes come from the table
/// headers (`Q1`/`Q2`), falling back to the nominal working point.
#[derive(Debug, Clone)]
pub struct RingModel {
    qx: f64,
    qy: f64,
    base_coupling: (f64, f64),
    vars: BTreeMap<String, f64>,
    elements: BTreeMap<String, ElementRecord>,
    bindings: BTreeMap<BindingKey, Expr>,
    dependents: BTreeMap<String, BTreeSet<BindingKey>>,
}

impl RingModel {
    /// Builds a model from a parsed optics table.
    pub fn from_optics(table: &OpticsTable) -> Result<Self, CmkError> {
        let qx = table.numeric_header("Q1")?.unwrap_or(DEFAULT_QX);
        let qy = table.numeric_header("Q2")?.unwrap_or(DEFAULT_QY);
        let mut elements = BTreeMap::new();
        for record in table.records() {
            elements.insert(record.name.clone(), ElementRecord::new(record.clone()));
        }
        Ok(Self {
            qx,
            qy,
            base_coupling: (0.0, 0.0),
            vars: BTreeMap::new(),
            elements,
            bindings: BTreeMap::new(),
            dependents: BTreeMap::new(),
        })
    }

    /// Sets the residual coupling of the bare machine as a complex value.
    pub fn set_base_coupling(&mut self, re: f64, im: f64) {
        self.base_coupling = (re, im);
    }

    /// Returns the optics record attached to an element, if present.
    pub fn optics(&self, element: &str) -> Option<&OpticsRecord> {
        self.elements.get(element).map(|record| &record.optics)
    }

    /// Returns the number of elements in the registry.
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Returns the number of dependent-expression bindings currently live.
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    pub(crate) fn elements(&self) -> impl Iterator<Item = &ElementRecord> {
        self.elements.values()
    }

    pub(crate) fn tunes(&self) -> (f64, f64) {
        (self.qx, self.qy)
    }

    pub(crate) fn base_coupling(&self) -> (f64, f64) {
        self.base_coupling
    }

    fn check_order(order: usize) -> Result<(), CmkError> {
        if order > MAX_MULTIPOLE_ORDER {
            return Err(CmkError::Model(
                ErrorInfo::new("skew-order-range", "skew-strength order exceeds the attribute array")
                    .with_context("order", order.to_string())
                    .with_context("max", MAX_MULTIPOLE_ORDER.to_string()),
            ));
        }
        Ok(())
    }

    fn unbind(&mut self, key: &BindingKey) {
        if let Some(expr) = self.bindings.remove(key) {
            for name in expr.variables() {
                if let Some(targets) = self.dependents.get_mut(&name) {
                    targets.remove(key);
                    if targets.is_empty() {
                        self.dependents.remove(&name);
                    }
                }
            }
        }
    }

    fn recompute(&mut self, key: &BindingKey) -> Result<(), CmkError> {
        let value = match self.bindings.get(key) {
            Some(expr) => expr.eval(&self.vars)?,
            None => return Ok(()),
        };
        if let Some(record) = self.elements.get_mut(&key.0) {
            record.write_skew_strength(key.1, value);
        }
        Ok(())
    }
}

fn unknown_element(element: &str) -> CmkError {
    CmkError::Model(
        ErrorInfo::new("unknown-element", "element is not in the registry")
            .with_context("element", element.to_string()),
    )
}

impl VariableStore for RingModel {
    fn value(&self, name: &str) -> Option<f64> {
        self.vars.get(name).copied()
    }

    fn set_value(&mut self, name: &str, value: f64) -> Result<(), CmkError> {
        self.vars.insert(name.to_string(), value);
        let affected: Vec<BindingKey> = self
            .dependents
            .get(name)
            .map(|targets| targets.iter().cloned().collect())
            .unwrap_or_default();
        for key in &affected {
            self.recompute(key)?;
        }
        Ok(())
    }

    fn contains_variable(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    fn variable_names(&self) -> Box<dyn ExactSizeIterator<Item = &str> + '_> {
        Box::new(self.vars.keys().map(|name| name.as_str()))
    }
}

impl ElementRegistry for RingModel {
    fn element_names(&self) -> Box<dyn ExactSizeIterator<Item = &str> + '_> {
        Box::new(self.elements.keys().map(|name| name.as_str()))
    }

    fn skew_strength(&self, element: &str, order: usize) -> Result<f64, CmkError> {
        Self::check_order(order)?;
        let record = self
            .elements
            .get(element)
            .ok_or_else(|| unknown_element(element))?;
        Ok(record.skew_strength(order))
    }

    fn bind_skew_strength(
        &mut self,
        element: &str,
        order: usize,
        expr: Expr,
    ) -> Result<(), CmkError> {
        Self::check_order(order)?;
        if !self.elements.contains_key(element) {
            return Err(unknown_element(element));
        }
        // Evaluate first so a bad expression never replaces a live binding.
        let value = expr.eval(&self.vars)?;
        let key: BindingKey = (element.to_string(), order);
        self.unbind(&key);
        for name in expr.variables() {
            self.dependents.entry(name).or_default().insert(key.clone());
        }
        self.bindings.insert(key.clone(), expr);
        if let Some(record) = self.elements.get_mut(element) {
            record.write_skew_strength(order, value);
        }
        Ok(())
    }
}

impl LatticeModel for RingModel {
    fn twiss(&self) -> Result<TwissSummary, CmkError> {
        let (qx, qy) = self.tunes();
        Ok(TwissSummary {
            qx,
            qy,
            c_minus: coupling_closest_tune_approach(self),
        })
    }
}
