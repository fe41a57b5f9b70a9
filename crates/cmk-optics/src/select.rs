use cmk_core::{Beam, CmkError, ErrorInfo, Sector, MQS_PER_SECTOR};

use crate::table::{OpticsRecord, OpticsTable};

/// Returns the skew-quadrupole corrector samples of one sector, ordered by
/// longitudinal position.
///
/// Fails with a `Data` error when the table does not contribute exactly
/// [`MQS_PER_SECTOR`] rows for the sector.
pub fn sector_correctors<'a>(
    table: &'a OpticsTable,
    sector: &Sector,
    beam: Beam,
) -> Result<Vec<&'a OpticsRecord>, CmkError> {
    let matcher = sector.corrector_matcher(beam)?;
    let mut samples: Vec<&OpticsRecord> = table
        .records()
        .iter()
        .filter(|record| matcher.is_match(&record.name))
        .collect();
    samples.sort_by(|lhs, rhs| lhs.s.total_cmp(&rhs.s));
    if samples.len() != MQS_PER_SECTOR {
        return Err(CmkError::Data(
            ErrorInfo::new(
                "optics-corrector-count",
                "sector does not provide the expected corrector samples",
            )
            .with_context("sector", sector.name())
            .with_context("beam", beam.number().to_string())
            .with_context("expected", MQS_PER_SECTOR.to_string())
            .with_context("found", samples.len().to_string()),
        ));
    }
    Ok(samples)
}

/// Returns the corrector samples for every sector of the ring, in sector
/// order.
pub fn ring_correctors<'a>(
    table: &'a OpticsTable,
    beam: Beam,
) -> Result<Vec<(Sector, Vec<&'a OpticsRecord>)>, CmkError> {
    let mut out = Vec::with_capacity(Sector::all().len());
    for sector in Sector::all() {
        let samples = sector_correctors(table, &sector, beam)?;
        out.push((sector, samples));
    }
    Ok(out)
}
