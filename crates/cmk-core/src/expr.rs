//! Dependent-variable expressions.
//!
//! A bound attribute is kept as an explicit expression tree over named
//! variables. Models re-evaluate the tree whenever a referenced variable
//! changes; nothing here evaluates code dynamically.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::errors::{CmkError, ErrorInfo};

/// Read-only variable lookup used during expression evaluation.
pub trait VarLookup {
    /// Returns the current value of the named variable, if present.
    fn lookup(&self, name: &str) -> Option<f64>;
}

impl VarLookup for std::collections::BTreeMap<String, f64> {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

/// Expression tree for derived lattice attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Literal constant.
    Const(f64),
    /// Reference to a named variable.
    Var(String),
    /// Sum of two subexpressions.
    Add(Box<Expr>, Box<Expr>),
    /// Product of two subexpressions.
    Mul(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Creates a constant expression.
    pub fn constant(value: f64) -> Self {
        Expr::Const(value)
    }

    /// Creates a variable reference.
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    /// Returns `self + rhs`.
    pub fn add(self, rhs: Expr) -> Self {
        Expr::Add(Box::new(self), Box::new(rhs))
    }

    /// Returns `self * rhs`.
    pub fn mul(self, rhs: Expr) -> Self {
        Expr::Mul(Box::new(self), Box::new(rhs))
    }

    /// Evaluates the expression against the provided variable lookup.
    ///
    /// Sums and products evaluate left to right, so two expressions built
    /// the same way produce bit-identical results.
    pub fn eval(&self, vars: &dyn VarLookup) -> Result<f64, CmkError> {
        match self {
            Expr::Const(value) => Ok(*value),
            Expr::Var(name) => vars.lookup(name).ok_or_else(|| {
                CmkError::Model(
                    ErrorInfo::new("unknown-variable", "expression references an unknown variable")
                        .with_context("variable", name.clone()),
                )
            }),
            Expr::Add(lhs, rhs) => Ok(lhs.eval(vars)? + rhs.eval(vars)?),
            Expr::Mul(lhs, rhs) => Ok(lhs.eval(vars)? * rhs.eval(vars)?),
        }
    }

    /// Returns the set of variable names the expression depends on.
    pub fn variables(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Const(_) => {}
            Expr::Var(name) => {
                out.insert(name.clone());
            }
            Expr::Add(lhs, rhs) | Expr::Mul(lhs, rhs) => {
                lhs.collect_variables(out);
                rhs.collect_variables(out);
            }
        }
    }
}
