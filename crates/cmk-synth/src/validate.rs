//! Cross-validation against externally generated reference coefficients.
//!
//! The reference file carries assignments of the form `B{sector}{component}
//! := {value} ;` produced by the external correction code. Names are
//! re-mapped to this system's coefficient naming before comparison.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use cmk_core::{coefficient_name, Beam, CmkError, ErrorInfo, KnobComponent, Sector};
use serde::{Deserialize, Serialize};

use crate::coefficients::CoefficientTable;

fn reference_error(code: &str, message: impl Into<String>) -> CmkError {
    CmkError::Data(ErrorInfo::new(code, message))
}

/// Reference coefficients, keyed by canonical coefficient variable name.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceCoefficients {
    values: BTreeMap<String, f64>,
}

impl ReferenceCoefficients {
    /// Parses reference assignments from already-loaded text.
    ///
    /// Lines that are not `B{digit}{digit} := {value} ;` assignments are
    /// ignored; the file format is otherwise opaque.
    pub fn from_str_content(content: &str, beam: Beam) -> Result<Self, CmkError> {
        let mut values = BTreeMap::new();
        for raw_line in content.lines() {
            let line = raw_line.trim();
            let Some((lhs, rhs)) = line.split_once(":=") else {
                continue;
            };
            let name = lhs.trim();
            let Some((sector_digit, component_digit)) = reference_name_digits(name) else {
                continue;
            };
            let sector = Sector::from_index(sector_digit)?;
            let component = KnobComponent::from_index(component_digit)?;
            let value_text = rhs.trim().trim_end_matches(';').trim();
            let value: f64 = value_text.parse().map_err(|_| {
                CmkError::Data(
                    ErrorInfo::new("reference-bad-float", "assignment value is not a float")
                        .with_context("name", name.to_string())
                        .with_context("value", value_text.to_string()),
                )
            })?;
            values.insert(coefficient_name(&sector, component, beam), value);
        }
        if values.is_empty() {
            return Err(reference_error(
                "reference-empty",
                "no coefficient assignments found in reference file",
            ));
        }
        Ok(Self { values })
    }

    /// Reads and parses a reference file from disk.
    pub fn from_path(path: &Path, beam: Beam) -> Result<Self, CmkError> {
        let content = fs::read_to_string(path).map_err(|err| {
            CmkError::Data(
                ErrorInfo::new("reference-read", "failed to read reference file")
                    .with_context("path", path.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
        Self::from_str_content(&content, beam)
    }

    /// Number of reference coefficients.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns whether the reference is empty (never true after parsing).
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns a reference value by canonical coefficient name.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Iterates over `(name, value)` pairs in deterministic order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }
}

/// `B{sector}{component}` with single digits, case tolerant.
fn reference_name_digits(name: &str) -> Option<(u8, u8)> {
    let mut chars = name.chars();
    if !chars.next()?.eq_ignore_ascii_case(&'B') {
        return None;
    }
    let sector = chars.next()?.to_digit(10)? as u8;
    let component = chars.next()?.to_digit(10)? as u8;
    if chars.next().is_some() {
        return None;
    }
    Some((sector, component))
}

fn default_rel_tol() -> f64 {
    1e-7
}

fn default_abs_tol() -> f64 {
    1e-7
}

/// Tolerances for the reference comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidateOpts {
    /// Relative tolerance, scaled by the larger magnitude of each pair.
    #[serde(default = "default_rel_tol")]
    pub rel_tol: f64,
    /// Absolute tolerance floor.
    #[serde(default = "default_abs_tol")]
    pub abs_tol: f64,
}

impl Default for ValidateOpts {
    fn default() -> Self {
        Self {
            rel_tol: default_rel_tol(),
            abs_tol: default_abs_tol(),
        }
    }
}

/// Outcome of a successful reference comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Number of coefficient names compared.
    pub names_checked: usize,
    /// Largest absolute deviation observed.
    pub max_abs_deviation: f64,
    /// Largest deviation relative to the reference magnitude.
    pub max_rel_deviation: f64,
}

/// Compares a computed coefficient table against reference values.
///
/// The name sets must match exactly in both directions; every value must
/// agree within the configured tolerances. The first failure aborts the
/// comparison with a `Validation` error.
pub fn compare(
    table: &CoefficientTable,
    reference: &ReferenceCoefficients,
    opts: &ValidateOpts,
) -> Result<ValidationReport, CmkError> {
    let computed: BTreeMap<String, f64> = table.named_entries()?.into_iter().collect();

    for (name, _) in reference.entries() {
        if !computed.contains_key(name) {
            return Err(CmkError::Validation(
                ErrorInfo::new("reference-name-unmatched", "reference name has no computed value")
                    .with_context("name", name.to_string()),
            ));
        }
    }
    for name in computed.keys() {
        if reference.value(name).is_none() {
            return Err(CmkError::Validation(
                ErrorInfo::new("computed-name-unmatched", "computed name has no reference value")
                    .with_context("name", name.clone()),
            ));
        }
    }

    let mut max_abs_deviation = 0.0f64;
    let mut max_rel_deviation = 0.0f64;
    for (name, expected) in reference.entries() {
        let actual = computed[name];
        let delta = (actual - expected).abs();
        let scale = actual.abs().max(expected.abs());
        if delta > opts.abs_tol.max(opts.rel_tol * scale) {
            return Err(CmkError::Validation(
                ErrorInfo::new("coefficient-mismatch", "coefficient deviates from the reference")
                    .with_context("name", name.to_string())
                    .with_context("expected", format!("{expected:e}"))
                    .with_context("actual", format!("{actual:e}"))
                    .with_context("delta", format!("{delta:e}")),
            ));
        }
        max_abs_deviation = max_abs_deviation.max(delta);
        if scale > 0.0 {
            max_rel_deviation = max_rel_deviation.max(delta / scale);
        }
    }

    Ok(ValidationReport {
        names_checked: reference.len(),
        max_abs_deviation,
        max_rel_deviation,
    })
}
