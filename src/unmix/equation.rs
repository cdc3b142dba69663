use serde::{Deserialize, Serialize};

use super::reference::HarmonicSlot;
use crate::data::assay::Phasor;
use crate::DisplayName;

// ---------------------------------------------------------------------------
// Axis – which phasor coordinate an equation constrains
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    G,
    S,
}

impl Axis {
    /// Pick this axis's coordinate out of a phasor.
    pub fn of(self, phasor: Phasor) -> f64 {
        match self {
            Axis::G => phasor.g,
            Axis::S => phasor.s,
        }
    }
}

// ---------------------------------------------------------------------------
// LinearEquation – one row of the unmixing system
// ---------------------------------------------------------------------------

/// What a linear equation constrains: one phasor coordinate at one harmonic
/// slot, or the unity condition that the fractions sum to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquationKind {
    Coordinate { axis: Axis, slot: HarmonicSlot },
    Unity,
}

/// One row of the unmixing system: coefficients on the left, and a kind
/// deciding the right-hand side (a measured phasor coordinate, or 1).
///
/// Equality compares the kind only. Two equations constraining the same
/// coordinate at the same slot describe the same measurement, so the system
/// rejects the second one without comparing coefficient values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearEquation {
    kind: EquationKind,
    coefficients: Vec<f64>,
}

impl LinearEquation {
    /// A coordinate-constraint row. `coefficients` holds the chosen axis's
    /// value of the slot's reference points, in stored order.
    pub fn coordinate(axis: Axis, slot: HarmonicSlot, coefficients: Vec<f64>) -> Self {
        LinearEquation {
            kind: EquationKind::Coordinate { axis, slot },
            coefficients,
        }
    }

    /// The fractions-sum-to-one row: `component_count` ones.
    pub fn unity(component_count: usize) -> Self {
        LinearEquation {
            kind: EquationKind::Unity,
            coefficients: vec![1.0; component_count],
        }
    }

    pub fn kind(&self) -> EquationKind {
        self.kind
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn is_unity(&self) -> bool {
        self.kind == EquationKind::Unity
    }
}

impl PartialEq for LinearEquation {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl DisplayName for LinearEquation {
    fn display_name(&self) -> String {
        match self.kind {
            EquationKind::Unity => "Sum of fractions".to_string(),
            EquationKind::Coordinate { axis, slot } => {
                let coord = match axis {
                    Axis::G => "G coordinates",
                    Axis::S => "S coordinates",
                };
                format!("{coord} at {slot}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
