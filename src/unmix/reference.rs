use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::assay::Harmonic;
use crate::math;
use crate::DisplayName;

// ---------------------------------------------------------------------------
// HarmonicSlot – the 8 canonical (n, m) combinations
// ---------------------------------------------------------------------------

/// The fixed set of harmonics reference points and equations may refer to,
/// in canonical order: (0,1) (0,2) (1,0) (1,1) (1,2) (2,0) (2,1) (2,2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HarmonicSlot {
    Em1,
    Em2,
    Ex1,
    Ex1Em1,
    Ex1Em2,
    Ex2,
    Ex2Em1,
    Ex2Em2,
}

impl HarmonicSlot {
    /// All slots in canonical order.
    pub const ALL: [HarmonicSlot; 8] = [
        HarmonicSlot::Em1,
        HarmonicSlot::Em2,
        HarmonicSlot::Ex1,
        HarmonicSlot::Ex1Em1,
        HarmonicSlot::Ex1Em2,
        HarmonicSlot::Ex2,
        HarmonicSlot::Ex2Em1,
        HarmonicSlot::Ex2Em2,
    ];

    /// The (n, m) harmonic this slot stands for.
    pub fn harmonic(self) -> Harmonic {
        match self {
            HarmonicSlot::Em1 => Harmonic::new(0, 1),
            HarmonicSlot::Em2 => Harmonic::new(0, 2),
            HarmonicSlot::Ex1 => Harmonic::new(1, 0),
            HarmonicSlot::Ex1Em1 => Harmonic::new(1, 1),
            HarmonicSlot::Ex1Em2 => Harmonic::new(1, 2),
            HarmonicSlot::Ex2 => Harmonic::new(2, 0),
            HarmonicSlot::Ex2Em1 => Harmonic::new(2, 1),
            HarmonicSlot::Ex2Em2 => Harmonic::new(2, 2),
        }
    }

    /// Position in the canonical order.
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|&s| s == self).unwrap_or(0)
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for HarmonicSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = self.harmonic();
        write!(f, "(n, m) = ({}, {})", h.n, h.m)
    }
}

// ---------------------------------------------------------------------------
// ReferencePoint – a named fixed phasor coordinate
// ---------------------------------------------------------------------------

/// A fixed (G, S) coordinate acting as a pure-component reference, scoped to
/// one harmonic slot. Never mutated in place.
///
/// Equality compares the coordinates only — not the name or the slot — so a
/// slot's point list can reject coordinate duplicates regardless of how they
/// were named.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferencePoint {
    slot: HarmonicSlot,
    name: String,
    g: f64,
    s: f64,
}

impl ReferencePoint {
    pub fn new(slot: HarmonicSlot, name: impl Into<String>, g: f64, s: f64) -> Self {
        ReferencePoint { slot, name: name.into(), g, s }
    }

    pub fn slot(&self) -> HarmonicSlot {
        self.slot
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn g(&self) -> f64 {
        self.g
    }

    pub fn s(&self) -> f64 {
        self.s
    }
}

impl PartialEq for ReferencePoint {
    fn eq(&self, other: &Self) -> bool {
        self.g == other.g && self.s == other.s
    }
}

impl DisplayName for ReferencePoint {
    fn display_name(&self) -> String {
        format!(
            "{} ({}; {})",
            self.name,
            math::round_by_error(self.g, 0.001),
            math::round_by_error(self.s, 0.001)
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
