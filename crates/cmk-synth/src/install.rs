use cmk_core::{
    coefficient_name, knob_name, CmkError, ErrorInfo, Expr, KnobComponent, KnobHost, Sector,
    MQS_PER_SECTOR,
};
use serde::{Deserialize, Serialize};

use crate::coefficients::CoefficientTable;
use crate::{MQS_LENGTH, MQS_SKEW_ORDER};

/// Summary of one installation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallReport {
    /// Beam number the knobs were installed for.
    pub beam_number: u32,
    /// Knob variables created by this pass (empty on re-installation).
    pub knobs_created: Vec<String>,
    /// Coefficient variables written.
    pub coefficients_written: usize,
    /// Corrector magnets whose skew strength was bound.
    pub magnets_wired: usize,
}

/// Wires the computed coefficients and the two global knobs into a model.
///
/// Resolves every sector's corrector group before touching the model, so a
/// topology failure leaves it unchanged. Knob variables are created only
/// when absent and keep their current values otherwise; coefficient
/// variables and strength bindings are overwritten.
pub fn install_coupling_knobs(
    host: &mut dyn KnobHost,
    table: &CoefficientTable,
) -> Result<InstallReport, CmkError> {
    let beam = table.beam;

    let mut resolved: Vec<(Sector, Vec<String>, f64, f64)> = Vec::with_capacity(8);
    for sector in Sector::all() {
        let entry = table.sector(sector.index()).ok_or_else(|| {
            CmkError::Data(
                ErrorInfo::new(
                    "missing-sector-coefficients",
                    "coefficient table does not cover every sector",
                )
                .with_context("sector", sector.name()),
            )
        })?;
        let matcher = sector.corrector_matcher(beam)?;
        let magnets: Vec<String> = host
            .element_names()
            .filter(|name| matcher.is_match(name))
            .map(str::to_string)
            .collect();
        if magnets.len() != MQS_PER_SECTOR {
            return Err(CmkError::Topology(
                ErrorInfo::new(
                    "missing-correctors",
                    "lattice does not expose the expected corrector magnets",
                )
                .with_context("sector", sector.name())
                .with_context("beam", beam.number().to_string())
                .with_context("expected", MQS_PER_SECTOR.to_string())
                .with_context("found", magnets.len().to_string()),
            ));
        }
        resolved.push((sector, magnets, entry.real, entry.imaginary));
    }

    let knob_re = knob_name(KnobComponent::Real, beam);
    let knob_im = knob_name(KnobComponent::Imaginary, beam);
    let mut knobs_created = Vec::new();
    for knob in [&knob_re, &knob_im] {
        if !host.contains_variable(knob) {
            host.set_value(knob, 0.0)?;
            knobs_created.push(knob.clone());
        }
    }

    let mut coefficients_written = 0;
    let mut magnets_wired = 0;
    for (sector, magnets, real, imaginary) in &resolved {
        let coeff_re = coefficient_name(sector, KnobComponent::Real, beam);
        let coeff_im = coefficient_name(sector, KnobComponent::Imaginary, beam);
        host.set_value(&coeff_re, *real)?;
        host.set_value(&coeff_im, *imaginary)?;
        coefficients_written += 2;

        for magnet in magnets {
            let expr = Expr::var(coeff_re.as_str())
                .mul(Expr::var(knob_re.as_str()))
                .mul(Expr::constant(MQS_LENGTH))
                .add(
                    Expr::var(coeff_im.as_str())
                        .mul(Expr::var(knob_im.as_str()))
                        .mul(Expr::constant(MQS_LENGTH)),
                );
            host.bind_skew_strength(magnet, MQS_SKEW_ORDER, expr)?;
            magnets_wired += 1;
        }
    }

    Ok(InstallReport {
        beam_number: beam.number(),
        knobs_created,
        coefficients_written,
        magnets_wired,
    })
}
