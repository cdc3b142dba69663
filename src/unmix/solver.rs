//! Fraction solver for small dense systems.
//!
//! The unmixing system is assembled from user-built [`LinearEquation`] rows
//! and solved per spectrum with Cramer's rule over an exact recursive
//! cofactor determinant. No pivoting and no rounding shortcuts: the cost is
//! O(C!) and only acceptable because component counts stay small (C ≤ ~8).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::equation::{Axis, EquationKind, LinearEquation};
use super::reference::{HarmonicSlot, ReferencePoint};
use crate::data::assay::PhasorAssay;
use crate::DisplayName;

// ---------------------------------------------------------------------------
// Errors and system state
// ---------------------------------------------------------------------------

/// Non-fatal solve failures. Each one means "no fractions for this spectrum";
/// the system stays usable and batch recomputation skips to the next
/// spectrum.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveError {
    #[error("no equation system defined")]
    EmptySystem,
    #[error("system needs {expected} usable equations, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("system is not invertible (determinant is zero)")]
    SingularSystem,
    #[error("harmonic (0, 0) has no phasor")]
    InvalidHarmonic,
}

/// Readiness of the equation system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemState {
    /// No component count set yet.
    Undefined,
    /// Component count set, fewer equations than components.
    PartiallyDefined,
    /// At least as many equations as components; the first C are usable.
    Correct,
}

// ---------------------------------------------------------------------------
// UnmixingSolver
// ---------------------------------------------------------------------------

/// Reference points, the equation list, and the per-spectrum solve.
///
/// Only the first `component_count` equations are ever read when solving;
/// rows added beyond that are stored but unused.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnmixingSolver {
    component_count: Option<usize>,
    system: Vec<LinearEquation>,
    points: BTreeMap<HarmonicSlot, Vec<ReferencePoint>>,
}

impl UnmixingSolver {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- reference points ----

    /// The stored points of a slot, in insertion order.
    pub fn points_at(&self, slot: HarmonicSlot) -> &[ReferencePoint] {
        self.points.get(&slot).map_or(&[], Vec::as_slice)
    }

    /// Add a point to its slot. Rejects a point whose (G, S) coordinates
    /// already exist in that slot; the same coordinates may live in other
    /// slots.
    pub fn add_point(&mut self, point: ReferencePoint) -> bool {
        let bucket = self.points.entry(point.slot()).or_default();
        if bucket.contains(&point) {
            log::debug!("rejected duplicate point {}", point.display_name());
            return false;
        }
        bucket.push(point);
        true
    }

    pub fn remove_point(&mut self, slot: HarmonicSlot, index: usize) -> Option<ReferencePoint> {
        let bucket = self.points.get_mut(&slot)?;
        if index < bucket.len() {
            Some(bucket.remove(index))
        } else {
            None
        }
    }

    /// Drop every stored point of every slot.
    pub fn clear_points(&mut self) {
        self.points.clear();
    }

    /// Derive one reference point per harmonic slot from a measured
    /// spectrum, all 8 slots in one operation. Returns how many points were
    /// actually added (slot-local duplicates are skipped).
    pub fn points_from_assay(
        &mut self,
        assay: &PhasorAssay,
        spectrum_index: usize,
        name: &str,
    ) -> usize {
        let mut added = 0;
        for slot in HarmonicSlot::ALL {
            if let Some(phasor) = assay.phasor(spectrum_index, slot.harmonic()) {
                let point = ReferencePoint::new(slot, name, phasor.g, phasor.s);
                if self.add_point(point) {
                    added += 1;
                }
            }
        }
        added
    }

    /// A new point at the arithmetic mean of the selected points of a slot.
    /// `None` when `indices` is empty or any index is out of range.
    pub fn averaged_point(
        &self,
        slot: HarmonicSlot,
        indices: &[usize],
        name: &str,
    ) -> Option<ReferencePoint> {
        if indices.is_empty() {
            return None;
        }
        let bucket = self.points_at(slot);
        let mut g = 0.0;
        let mut s = 0.0;
        for &i in indices {
            let point = bucket.get(i)?;
            g += point.g();
            s += point.s();
        }
        let count = indices.len() as f64;
        Some(ReferencePoint::new(slot, name, g / count, s / count))
    }

    // ---- equation system ----

    pub fn component_count(&self) -> Option<usize> {
        self.component_count
    }

    /// Redefine the system: set the component count and drop every stored
    /// equation. The two always reset together.
    pub fn define_system(&mut self, component_count: usize) {
        self.component_count = Some(component_count);
        self.system.clear();
    }

    pub fn equations(&self) -> &[LinearEquation] {
        &self.system
    }

    /// Build a coordinate equation whose coefficients are the chosen axis of
    /// the slot's first C reference points, in stored order. `None` while no
    /// component count is set or the slot holds fewer than C points.
    pub fn coordinate_equation(&self, axis: Axis, slot: HarmonicSlot) -> Option<LinearEquation> {
        let count = self.component_count?;
        let bucket = self.points_at(slot);
        if bucket.len() < count {
            return None;
        }
        let coefficients = bucket[..count]
            .iter()
            .map(|p| match axis {
                Axis::G => p.g(),
                Axis::S => p.s(),
            })
            .collect();
        Some(LinearEquation::coordinate(axis, slot, coefficients))
    }

    /// The fractions-sum-to-one equation. `None` while no component count is
    /// set.
    pub fn unity_equation(&self) -> Option<LinearEquation> {
        self.component_count.map(LinearEquation::unity)
    }

    /// Append an equation, rejecting one that already exists in the system
    /// (same kind — coefficients are not compared).
    pub fn add_equation(&mut self, equation: LinearEquation) -> bool {
        if self.system.contains(&equation) {
            log::debug!("rejected duplicate equation {}", equation.display_name());
            return false;
        }
        self.system.push(equation);
        true
    }

    pub fn remove_equation(&mut self, index: usize) -> Option<LinearEquation> {
        if index < self.system.len() {
            Some(self.system.remove(index))
        } else {
            None
        }
    }

    /// Readiness of the system. Reaching `Correct` is the caller's
    /// precondition for batch recomputation; nothing recomputes on its own.
    pub fn state(&self) -> SystemState {
        match self.component_count {
            None => SystemState::Undefined,
            Some(count) if self.system.is_empty() || self.system.len() < count => {
                SystemState::PartiallyDefined
            }
            Some(_) => SystemState::Correct,
        }
    }

    // ---- solving ----

    /// Fractions of each component in spectrum `spectrum_index` of `assay`.
    ///
    /// Builds the C×C system from the first C equations — Unity rows give
    /// `b = 1`, Coordinate rows pull `b` from the measured phasor at the
    /// row's slot — and solves by Cramer's rule. No normalization is applied
    /// afterwards: without a Unity row the fractions need not sum to 1.
    pub fn fractions(
        &self,
        assay: &PhasorAssay,
        spectrum_index: usize,
    ) -> Result<Vec<f64>, SolveError> {
        if self.system.is_empty() {
            return Err(SolveError::EmptySystem);
        }
        let count = self.component_count.ok_or(SolveError::EmptySystem)?;

        let mut matrix = Vec::with_capacity(count);
        let mut b = Vec::with_capacity(count);
        for i in 0..count {
            let equation = self
                .system
                .get(i)
                .ok_or(SolveError::DimensionMismatch { expected: count, found: self.system.len() })?;
            if equation.coefficients().len() != count {
                return Err(SolveError::DimensionMismatch {
                    expected: count,
                    found: equation.coefficients().len(),
                });
            }
            matrix.push(equation.coefficients().to_vec());
            b.push(match equation.kind() {
                EquationKind::Unity => 1.0,
                EquationKind::Coordinate { axis, slot } => {
                    let phasor = assay
                        .phasor(spectrum_index, slot.harmonic())
                        .ok_or(SolveError::InvalidHarmonic)?;
                    axis.of(phasor)
                }
            });
        }
        solve(&matrix, &b)
    }
}

// ---------------------------------------------------------------------------
// Cramer's rule over the cofactor determinant
// ---------------------------------------------------------------------------

/// Solve `matrix · x = b` by Cramer's rule: one determinant ratio per
/// unknown, columns replaced in turn.
fn solve(matrix: &[Vec<f64>], b: &[f64]) -> Result<Vec<f64>, SolveError> {
    let main = determinant(matrix);
    if main == 0.0 {
        return Err(SolveError::SingularSystem);
    }
    let size = matrix.len();
    let mut result = Vec::with_capacity(size);
    for i in 0..size {
        let mut replaced = matrix.to_vec();
        for (row, rhs) in replaced.iter_mut().zip(b) {
            row[i] = *rhs;
        }
        result.push(determinant(&replaced) / main);
    }
    Ok(result)
}

/// Determinant by recursive Laplace expansion along the first row.
/// Exact for the inputs given (no pivoting), factorial cost.
fn determinant(matrix: &[Vec<f64>]) -> f64 {
    let size = matrix.len();
    if size == 1 {
        return matrix[0][0];
    }
    let mut result = 0.0;
    let mut sign = 1.0;
    for i in 0..size {
        result += sign * matrix[0][i] * determinant(&minor(matrix, 0, i));
        sign = -sign;
    }
    result
}

/// Copy of `matrix` with row `p` and column `q` removed.
fn minor(matrix: &[Vec<f64>], p: usize, q: usize) -> Vec<Vec<f64>> {
    matrix
        .iter()
        .enumerate()
        .filter(|(row, _)| *row != p)
        .map(|(_, cells)| {
            cells
                .iter()
                .enumerate()
                .filter(|(col, _)| *col != q)
                .map(|(_, &v)| v)
                .collect()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// UnmixingModel – assays plus the batch fraction cache
// ---------------------------------------------------------------------------

/// The complete unmixing workspace: the assays under analysis, the solver,
/// and the cached per-spectrum fraction vectors.
///
/// The cache is rebuilt wholesale by [`UnmixingModel::recalculate`] and only
/// there — mutating the solver or the assay list leaves it untouched until
/// the caller asks again.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnmixingModel {
    pub assays: Vec<PhasorAssay>,
    pub solver: UnmixingSolver,
    fractions: Vec<Vec<Option<Vec<f64>>>>,
}

impl UnmixingModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the fraction cache for every spectrum of every assay.
    /// Spectra whose solve fails are cached as `None` and skipped, never
    /// aborting the batch.
    pub fn recalculate(&mut self) {
        self.fractions.clear();
        for assay in &self.assays {
            let mut per_assay = Vec::with_capacity(assay.len());
            let mut failures = 0;
            for i in 0..assay.len() {
                match self.solver.fractions(assay, i) {
                    Ok(values) => per_assay.push(Some(values)),
                    Err(err) => {
                        log::warn!(
                            "assay '{}', spectrum {i}: no fractions ({err})",
                            assay.name()
                        );
                        failures += 1;
                        per_assay.push(None);
                    }
                }
            }
            log::info!(
                "assay '{}': fractions for {}/{} spectra",
                assay.name(),
                assay.len() - failures,
                assay.len()
            );
            self.fractions.push(per_assay);
        }
    }

    /// The cached fraction vector of one spectrum, if the last
    /// recalculation produced one.
    pub fn fractions_for(&self, assay_index: usize, spectrum_index: usize) -> Option<&[f64]> {
        self.fractions
            .get(assay_index)?
            .get(spectrum_index)?
            .as_deref()
    }

    /// One cached fraction value.
    pub fn fraction_for(
        &self,
        assay_index: usize,
        spectrum_index: usize,
        component: usize,
    ) -> Option<f64> {
        self.fractions_for(assay_index, spectrum_index)?
            .get(component)
            .copied()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
