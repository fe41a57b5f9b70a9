use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::errors::{CmkError, ErrorInfo};

/// Number of skew-quadrupole correctors wired per sector, fixed by the
/// machine layout.
pub const MQS_PER_SECTOR: usize = 4;

/// Beam selector for optics addressing and knob naming.
///
/// Beam 4 is the counter-rotating representation of beam 2 used by some
/// simulation codes; it shares beam 2's addressing everywhere. Call
/// [`Beam::addressing`] instead of matching on the variant when building
/// names or patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Beam {
    /// Clockwise beam.
    Beam1,
    /// Counter-clockwise beam.
    Beam2,
    /// Counter-rotating representation of beam 2.
    Beam4,
}

impl Beam {
    /// Resolves a beam from its conventional number (1, 2 or 4).
    pub fn from_number(number: u32) -> Result<Self, CmkError> {
        match number {
            1 => Ok(Beam::Beam1),
            2 => Ok(Beam::Beam2),
            4 => Ok(Beam::Beam4),
            other => Err(CmkError::Data(
                ErrorInfo::new("unknown-beam", "beam number is not 1, 2 or 4")
                    .with_context("beam", other.to_string()),
            )),
        }
    }

    /// Returns the conventional beam number.
    pub fn number(&self) -> u32 {
        match self {
            Beam::Beam1 => 1,
            Beam::Beam2 => 2,
            Beam::Beam4 => 4,
        }
    }

    /// Returns the beam number used for addressing (beam 4 aliases beam 2).
    pub fn addressing(&self) -> u32 {
        match self {
            Beam::Beam1 => 1,
            Beam::Beam2 | Beam::Beam4 => 2,
        }
    }
}

/// Real or imaginary part of the coupling knob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KnobComponent {
    /// Drives the real part of `C-`.
    Real,
    /// Drives the imaginary part of `C-`.
    Imaginary,
}

impl KnobComponent {
    /// Both components in canonical order.
    pub const ALL: [KnobComponent; 2] = [KnobComponent::Real, KnobComponent::Imaginary];

    /// Returns the numeric index used in coefficient names (1 real, 2 imaginary).
    pub fn index(&self) -> u8 {
        match self {
            KnobComponent::Real => 1,
            KnobComponent::Imaginary => 2,
        }
    }

    /// Resolves a component from its numeric index.
    pub fn from_index(index: u8) -> Result<Self, CmkError> {
        match index {
            1 => Ok(KnobComponent::Real),
            2 => Ok(KnobComponent::Imaginary),
            other => Err(CmkError::Data(
                ErrorInfo::new("unknown-knob-component", "component index is not 1 or 2")
                    .with_context("index", other.to_string()),
            )),
        }
    }

    /// Returns the short label used in knob names.
    pub fn label(&self) -> &'static str {
        match self {
            KnobComponent::Real => "re",
            KnobComponent::Imaginary => "im",
        }
    }
}

/// One of the eight lattice arcs, bounded by two interaction points.
///
/// Sectors form a fixed table defined by the machine layout; they are never
/// constructed from user input at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Sector {
    index: u8,
    right_of: u8,
    left_of: u8,
}

const SECTOR_BOUNDS: [(u8, u8); 8] = [
    (1, 2),
    (2, 3),
    (3, 4),
    (4, 5),
    (5, 6),
    (6, 7),
    (7, 8),
    (8, 1),
];

impl Sector {
    /// Returns the full sector table in ring order.
    pub fn all() -> [Sector; 8] {
        let mut sectors = [Sector {
            index: 0,
            right_of: 0,
            left_of: 0,
        }; 8];
        for (idx, (right_of, left_of)) in SECTOR_BOUNDS.iter().enumerate() {
            sectors[idx] = Sector {
                index: idx as u8 + 1,
                right_of: *right_of,
                left_of: *left_of,
            };
        }
        sectors
    }

    /// Resolves a sector by its 1-based index.
    pub fn from_index(index: u8) -> Result<Self, CmkError> {
        if index == 0 || index as usize > SECTOR_BOUNDS.len() {
            return Err(CmkError::Data(
                ErrorInfo::new("unknown-sector", "sector index is out of range")
                    .with_context("index", index.to_string()),
            ));
        }
        Ok(Self::all()[index as usize - 1])
    }

    /// Returns the 1-based sector index.
    pub fn index(&self) -> u8 {
        self.index
    }

    /// Returns the symbolic arc name, e.g. `"12"` for the arc between IP1 and IP2.
    pub fn name(&self) -> String {
        format!("{}{}", self.right_of, self.left_of)
    }

    /// Interaction point the sector starts to the right of.
    pub fn right_of(&self) -> u8 {
        self.right_of
    }

    /// Interaction point the sector ends to the left of.
    pub fn left_of(&self) -> u8 {
        self.left_of
    }

    /// Builds the corrector name matcher for this sector and beam.
    pub fn corrector_matcher(&self, beam: Beam) -> Result<CorrectorMatcher, CmkError> {
        CorrectorMatcher::new(self, beam)
    }
}

/// Case-insensitive matcher for the skew-quadrupole corrector names of one
/// sector, e.g. `MQS.23R1.B1` and `MQS.27L2.B1` for sector 12 of beam 1.
#[derive(Debug, Clone)]
pub struct CorrectorMatcher {
    globs: GlobSet,
}

impl CorrectorMatcher {
    fn new(sector: &Sector, beam: Beam) -> Result<Self, CmkError> {
        let bn = beam.addressing();
        let patterns = [
            format!("MQS.*R{}.B{}", sector.right_of(), bn),
            format!("MQS.*L{}.B{}", sector.left_of(), bn),
        ];
        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            let glob = GlobBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|err| {
                    CmkError::Model(
                        ErrorInfo::new("corrector-pattern", "failed to build corrector pattern")
                            .with_context("pattern", pattern.clone())
                            .with_hint(err.to_string()),
                    )
                })?;
            builder.add(glob);
        }
        let globs = builder.build().map_err(|err| {
            CmkError::Model(
                ErrorInfo::new("corrector-pattern-set", "failed to build corrector pattern set")
                    .with_hint(err.to_string()),
            )
        })?;
        Ok(Self { globs })
    }

    /// Returns whether the element name belongs to the sector's correctors.
    pub fn is_match(&self, name: &str) -> bool {
        self.globs.is_match(name)
    }
}

/// Returns the canonical coefficient variable name for a sector, component
/// and beam, e.g. `coeff_skew_11_b1`.
pub fn coefficient_name(sector: &Sector, component: KnobComponent, beam: Beam) -> String {
    format!(
        "coeff_skew_{}{}_b{}",
        sector.index(),
        component.index(),
        beam.addressing()
    )
}

/// Returns the canonical global knob name for a component and beam, e.g.
/// `c_minus_re_b1`.
pub fn knob_name(component: KnobComponent, beam: Beam) -> String {
    format!("c_minus_{}_b{}", component.label(), beam.addressing())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beam_four_aliases_beam_two() {
        assert_eq!(Beam::Beam4.addressing(), 2);
        assert_eq!(Beam::Beam4.number(), 4);
        assert_eq!(Beam::from_number(4).unwrap(), Beam::Beam4);
        assert!(Beam::from_number(3).is_err());
    }

    #[test]
    fn sector_table_is_ring_ordered() {
        let sectors = Sector::all();
        assert_eq!(sectors.len(), 8);
        assert_eq!(sectors[0].name(), "12");
        assert_eq!(sectors[7].name(), "81");
        for (idx, sector) in sectors.iter().enumerate() {
            assert_eq!(sector.index() as usize, idx + 1);
        }
    }

    #[test]
    fn corrector_matcher_accepts_both_arc_ends() {
        let sector = Sector::from_index(1).unwrap();
        let matcher = sector.corrector_matcher(Beam::Beam1).unwrap();
        assert!(matcher.is_match("MQS.23R1.B1"));
        assert!(matcher.is_match("mqs.27l2.b1"));
        assert!(!matcher.is_match("MQS.23R1.B2"));
        assert!(!matcher.is_match("MQ.12R1.B1"));
        assert!(!matcher.is_match("MQS.23R2.B1"));
    }

    #[test]
    fn names_follow_addressing_rule() {
        let sector = Sector::from_index(3).unwrap();
        assert_eq!(
            coefficient_name(&sector, KnobComponent::Real, Beam::Beam4),
            "coeff_skew_31_b2"
        );
        assert_eq!(knob_name(KnobComponent::Imaginary, Beam::Beam1), "c_minus_im_b1");
    }
}
