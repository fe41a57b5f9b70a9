use std::path::Path;

use cmk_core::{Beam, CmkError, KnobHost, SchemaVersion, SourceDigest};
use cmk_optics::OpticsTable;
use serde::{Deserialize, Serialize};

use crate::coefficients::{compute_coefficients, CoefficientTable};
use crate::install::{install_coupling_knobs, InstallReport};

/// Serializable record of a complete synthesis pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisReport {
    /// Schema version for the report payload.
    pub schema_version: SchemaVersion,
    /// Identity of the optics source the coefficients were computed from.
    pub optics: SourceDigest,
    /// The computed coefficient table.
    pub coefficients: CoefficientTable,
    /// Installation summary.
    pub install: InstallReport,
}

/// Loads the optics table, computes the coefficients and installs the knobs
/// on the model, in one pass.
pub fn synthesize_coupling_knobs(
    host: &mut dyn KnobHost,
    beam: Beam,
    optics_path: &Path,
) -> Result<SynthesisReport, CmkError> {
    let table = OpticsTable::from_path(optics_path)?;
    let coefficients = compute_coefficients(&table, beam)?;
    let install = install_coupling_knobs(host, &coefficients)?;
    let optics = table.digest().cloned().unwrap_or_default();
    Ok(SynthesisReport {
        schema_version: SchemaVersion::default(),
        optics,
        coefficients,
        install,
    })
}
