use cmk_core::{coefficient_name, Beam, CmkError, ErrorInfo, KnobComponent, Sector};
use cmk_optics::{ring_correctors, OpticsTable};
use serde::{Deserialize, Serialize};

use crate::MQS_LENGTH;

/// Relative floor below which the sector response system counts as singular.
const SINGULARITY_FLOOR: f64 = 1e-12;

/// The two correction coefficients of one sector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorCoefficients {
    /// 1-based sector index.
    pub sector_index: u8,
    /// Symbolic arc name, e.g. `"12"`.
    pub sector_name: String,
    /// Coefficient driven by the real knob.
    pub real: f64,
    /// Coefficient driven by the imaginary knob.
    pub imaginary: f64,
}

/// Computed coefficients for one beam, in sector order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientTable {
    /// Beam the coefficients were computed for.
    pub beam: Beam,
    /// One entry per sector.
    pub sectors: Vec<SectorCoefficients>,
}

impl CoefficientTable {
    /// Returns the coefficients of the given sector, if present.
    pub fn sector(&self, sector_index: u8) -> Option<&SectorCoefficients> {
        self.sectors
            .iter()
            .find(|entry| entry.sector_index == sector_index)
    }

    /// Returns one coefficient by sector and component.
    pub fn coefficient(&self, sector_index: u8, component: KnobComponent) -> Option<f64> {
        self.sector(sector_index).map(|entry| match component {
            KnobComponent::Real => entry.real,
            KnobComponent::Imaginary => entry.imaginary,
        })
    }

    /// Returns all coefficients under their canonical variable names, in
    /// deterministic order.
    pub fn named_entries(&self) -> Result<Vec<(String, f64)>, CmkError> {
        let mut out = Vec::with_capacity(self.sectors.len() * 2);
        for entry in &self.sectors {
            let sector = Sector::from_index(entry.sector_index)?;
            out.push((
                coefficient_name(&sector, KnobComponent::Real, self.beam),
                entry.real,
            ));
            out.push((
                coefficient_name(&sector, KnobComponent::Imaginary, self.beam),
                entry.imaginary,
            ));
        }
        Ok(out)
    }
}

/// Computes the per-sector coupling-correction coefficients for one beam.
///
/// For each sector the corrector samples are combined into the complex
/// driving-term response per unit integrated strength,
/// `a + i b = sum_j w_j * exp(i dphi_j)`, scaled by the corrector length
/// over 2π. The two coefficient vectors are the minimum-norm solution that
/// makes the ring-wide response to the real knob exactly `1` and to the
/// imaginary knob exactly `i`, so the knobs act isotropically on `C-`.
pub fn compute_coefficients(
    table: &OpticsTable,
    beam: Beam,
) -> Result<CoefficientTable, CmkError> {
    let scale = MQS_LENGTH / std::f64::consts::TAU;
    let ring = ring_correctors(table, beam)?;

    let mut responses: Vec<(Sector, f64, f64)> = Vec::with_capacity(ring.len());
    for (sector, samples) in &ring {
        let mut a = 0.0;
        let mut b = 0.0;
        for sample in samples {
            let weight = sample.coupling_weight();
            let dphi = sample.phase_difference();
            a += weight * dphi.cos();
            b += weight * dphi.sin();
        }
        responses.push((*sector, scale * a, scale * b));
    }

    let spp: f64 = responses.iter().map(|(_, p, _)| p * p).sum();
    let sqq: f64 = responses.iter().map(|(_, _, q)| q * q).sum();
    let spq: f64 = responses.iter().map(|(_, p, q)| p * q).sum();
    let det = spp * sqq - spq * spq;
    if !(det.abs() > SINGULARITY_FLOOR * spp * sqq) {
        return Err(CmkError::Data(
            ErrorInfo::new(
                "singular-response",
                "sector responses cannot span both knob components",
            )
            .with_context("spp", format!("{spp:e}"))
            .with_context("sqq", format!("{sqq:e}"))
            .with_context("spq", format!("{spq:e}"))
            .with_hint("phase advances at the correctors are degenerate"),
        ));
    }

    let sectors = responses
        .into_iter()
        .map(|(sector, p, q)| SectorCoefficients {
            sector_index: sector.index(),
            sector_name: sector.name(),
            real: (p * sqq - q * spq) / det,
            imaginary: (q * spp - p * spq) / det,
        })
        .collect();

    Ok(CoefficientTable { beam, sectors })
}
