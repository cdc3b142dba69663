use std::f64::consts::PI;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::model::{Spectrum, XUnit};
use crate::math;
use crate::DisplayName;

// ---------------------------------------------------------------------------
// Phasor and harmonic
// ---------------------------------------------------------------------------

/// A phasor coordinate: the harmonic content of a spectrum reduced to one
/// point, `g` the cosine (real) part and `s` the sine (imaginary) part of an
/// intensity-weighted average over unit-circle points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Phasor {
    pub g: f64,
    pub s: f64,
}

impl Phasor {
    pub fn new(g: f64, s: f64) -> Self {
        Phasor { g, s }
    }

    /// Whether both coordinates are finite. A zero-intensity window or a
    /// zero axis value propagates NaN/∞ into the phasor instead of failing.
    pub fn is_finite(&self) -> bool {
        self.g.is_finite() && self.s.is_finite()
    }
}

/// The pair of integer multipliers applied to the normalized excitation (n)
/// and emission (m) coordinates. `(n, 0)` and `(0, m)` degenerate to the 1D
/// excitation-only / emission-only phasor; `(0, 0)` is not a valid harmonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Harmonic {
    pub n: u32,
    pub m: u32,
}

impl Harmonic {
    pub fn new(n: u32, m: u32) -> Self {
        Harmonic { n, m }
    }
}

// ---------------------------------------------------------------------------
// RangeTriple – a sorted (min, selected, max) selection
// ---------------------------------------------------------------------------

/// An immutable non-decreasing `(min, selected, max)` triple in axis units.
///
/// Constructors sort and clamp, so the invariant holds by construction and
/// every mutation goes through a new value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RangeTriple {
    min: f64,
    selected: f64,
    max: f64,
}

impl RangeTriple {
    /// Sort three values into a triple.
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        let mut v = [a, b, c];
        v.sort_by(f64::total_cmp);
        RangeTriple { min: v[0], selected: v[1], max: v[2] }
    }

    /// Triple over `[a, b]` with the selection at the midpoint.
    pub fn from_bounds(a: f64, b: f64) -> Self {
        RangeTriple {
            min: a.min(b),
            selected: (a + b) / 2.0,
            max: a.max(b),
        }
    }

    /// Same bounds, new selection clamped into them.
    pub fn with_selected(self, value: f64) -> Self {
        RangeTriple {
            min: self.min,
            selected: value.clamp(self.min, self.max),
            max: self.max,
        }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn selected(&self) -> f64 {
        self.selected
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

// ---------------------------------------------------------------------------
// ZoomWindow – phasor-plot zoom state
// ---------------------------------------------------------------------------

/// The zoom state of a phasor plot, bounds always clamped into [-1, 1]².
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomWindow {
    pub zoomed: bool,
    min_g: f64,
    max_g: f64,
    min_s: f64,
    max_s: f64,
}

impl Default for ZoomWindow {
    fn default() -> Self {
        ZoomWindow { zoomed: false, min_g: -1.0, max_g: 1.0, min_s: -1.0, max_s: 1.0 }
    }
}

impl ZoomWindow {
    pub fn set(&mut self, min_g: f64, max_g: f64, min_s: f64, max_s: f64) {
        self.min_g = min_g.clamp(-1.0, 1.0);
        self.max_g = max_g.clamp(-1.0, 1.0);
        self.min_s = min_s.clamp(-1.0, 1.0);
        self.max_s = max_s.clamp(-1.0, 1.0);
    }

    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        (self.min_g, self.max_g, self.min_s, self.max_s)
    }
}

/// Plot symbol for the assay's phasor points. Presentation data carried with
/// the assay but outside the numeric contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MarkerShape {
    #[default]
    Rectangle,
    Circle,
    Triangle,
    PlusSign,
}

// ---------------------------------------------------------------------------
// PhasorAssay – an ordered spectra collection with shared selection state
// ---------------------------------------------------------------------------

/// A group of spectra measured together, with the range/harmonic/zoom
/// selections shared by all of them and the phasor transform itself.
///
/// Spectra are reference-counted: the same `Spectrum` may belong to several
/// assays, and switching the x-axis unit on one assay is visible to all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhasorAssay {
    name: String,
    spectra: Vec<Rc<Spectrum>>,
    /// Harmonic used when the caller does not specify one.
    pub harmonic: Harmonic,
    ex_range: RangeTriple,
    em_range: RangeTriple,
    pub zoom: ZoomWindow,
    pub color_index: usize,
    pub marker_shape: MarkerShape,
}

impl PhasorAssay {
    pub fn new(name: impl Into<String>) -> Self {
        PhasorAssay {
            name: name.into(),
            spectra: Vec::new(),
            harmonic: Harmonic::new(1, 1),
            ex_range: RangeTriple::default(),
            em_range: RangeTriple::default(),
            zoom: ZoomWindow::default(),
            color_index: 0,
            marker_shape: MarkerShape::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn push(&mut self, spectrum: Rc<Spectrum>) {
        self.spectra.push(spectrum);
    }

    pub fn spectra(&self) -> &[Rc<Spectrum>] {
        &self.spectra
    }

    pub fn len(&self) -> usize {
        self.spectra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spectra.is_empty()
    }

    // ---- range state ----

    pub fn ex_range(&self) -> RangeTriple {
        self.ex_range
    }

    pub fn em_range(&self) -> RangeTriple {
        self.em_range
    }

    pub fn set_ex_range(&mut self, range: RangeTriple) {
        self.ex_range = range;
    }

    pub fn set_em_range(&mut self, range: RangeTriple) {
        self.em_range = range;
    }

    pub fn set_selected_excitation(&mut self, value: f64) {
        self.ex_range = self.ex_range.with_selected(value);
    }

    pub fn set_selected_emission(&mut self, value: f64) {
        self.em_range = self.em_range.with_selected(value);
    }

    /// Reset both ranges to the intersection of the member spectra extents
    /// (max of the per-spectrum minima, min of the maxima), selection at the
    /// midpoint. With no members the sentinel extremes are left in place.
    pub fn reset_ranges(&mut self) {
        let mut min_ex = -f64::MAX;
        let mut max_ex = f64::MAX;
        let mut min_em = -f64::MAX;
        let mut max_em = f64::MAX;
        for spectrum in &self.spectra {
            if min_ex < spectrum.min_excitation() {
                min_ex = spectrum.min_excitation();
            }
            if max_ex > spectrum.max_excitation() {
                max_ex = spectrum.max_excitation();
            }
            if min_em < spectrum.min_emission() {
                min_em = spectrum.min_emission();
            }
            if max_em > spectrum.max_emission() {
                max_em = spectrum.max_emission();
            }
        }
        self.ex_range = RangeTriple::from_bounds(min_ex, max_ex);
        self.em_range = RangeTriple::from_bounds(min_em, max_em);
        log::debug!(
            "assay '{}': ranges reset to ex [{}, {}], em [{}, {}]",
            self.name,
            self.ex_range.min(),
            self.ex_range.max(),
            self.em_range.min(),
            self.em_range.max()
        );
    }

    // ---- unit state ----

    /// The x-axis unit of the member spectra (first member decides; a unit
    /// switch applies to all of them).
    pub fn x_unit(&self) -> XUnit {
        self.spectra
            .first()
            .map_or(XUnit::Wavelength, |sp| sp.current_unit.get())
    }

    /// Switch every member spectrum to `unit`. The numeric range bounds are
    /// left untouched and still carry the previous unit's values; callers
    /// re-derive them from the new axis representation (typically via
    /// [`PhasorAssay::reset_ranges`]).
    pub fn set_x_unit(&self, unit: XUnit) {
        for spectrum in &self.spectra {
            spectrum.current_unit.set(unit);
        }
    }

    // ---- cross-sections for plotting collaborators ----

    /// Emission profile of spectrum `index` at the selected excitation.
    pub fn emission_intensities_for(&self, index: usize) -> &[f64] {
        self.spectra[index].row_at(self.ex_range.selected())
    }

    /// Excitation profile of spectrum `index` at the selected emission.
    pub fn excitation_intensities_for(&self, index: usize) -> Vec<f64> {
        self.spectra[index].column_at(self.em_range.selected())
    }

    // ---- phasor transform ----

    /// Phasor of spectrum `index` at the assay's currently selected
    /// harmonic.
    pub fn current_phasor(&self, index: usize) -> Option<Phasor> {
        self.phasor(index, self.harmonic)
    }

    /// Phasor of spectrum `index` for `harmonic`, over the current range
    /// windows. `None` for the invalid harmonic (0, 0).
    ///
    /// A window with zero total intensity divides by zero and returns NaN
    /// coordinates inside `Some`; callers check [`Phasor::is_finite`].
    pub fn phasor(&self, index: usize, harmonic: Harmonic) -> Option<Phasor> {
        match (harmonic.n, harmonic.m) {
            (0, 0) => None,
            (0, m) => Some(self.phasor_1d(true, index, f64::from(m), self.ex_range.selected())),
            (n, 0) => Some(self.phasor_1d(false, index, f64::from(n), self.em_range.selected())),
            _ => Some(self.phasor_2d(index, harmonic)),
        }
    }

    /// 2D transform: both axes normalized jointly onto the combined global
    /// min/max of the two range windows, summed over the half-open
    /// rectangular index window.
    fn phasor_2d(&self, index: usize, harmonic: Harmonic) -> Phasor {
        let spectrum = &self.spectra[index];
        let full_ex = spectrum.excitation_values();
        let full_em = spectrum.emission_values();
        let min_ex_index = math::nearest_index(self.ex_range.min(), full_ex);
        let max_ex_index = math::nearest_index(self.ex_range.max(), full_ex);
        let min_em_index = math::nearest_index(self.em_range.min(), full_em);
        let max_em_index = math::nearest_index(self.em_range.max(), full_em);
        let from_ex = min_ex_index.min(max_ex_index);
        let to_ex = min_ex_index.max(max_ex_index);
        let from_em = min_em_index.min(max_em_index);
        let to_em = min_em_index.max(max_em_index);
        let global_min = self.ex_range.min().min(self.em_range.min());
        let global_max = self.ex_range.max().max(self.em_range.max());

        let n = f64::from(harmonic.n);
        let m = f64::from(harmonic.m);
        let mut total = 0.0;
        let mut real = 0.0;
        let mut imaginary = 0.0;
        for i in from_ex..to_ex {
            let lx = (full_ex[i] - global_min) / (global_max - global_min);
            for j in from_em..to_em {
                let lm = (full_em[j] - global_min) / (global_max - global_min);
                let intensity = spectrum.intensity_at(i, j);
                let angle = 2.0 * PI * (lx * n + lm * m);
                real += intensity * angle.cos();
                imaginary += intensity * angle.sin();
                total += intensity;
            }
        }
        Phasor::new(real / total, imaginary / total)
    }

    /// 1D transform along one axis, the other axis fixed at the index
    /// nearest to its selected value. The sweep axis is normalized locally
    /// by the values at its resolved (unordered) window indices.
    fn phasor_1d(&self, emission: bool, index: usize, order: f64, fixed_x: f64) -> Phasor {
        let spectrum = &self.spectra[index];
        let (full_xs, fixed_index, min_index, max_index) = if emission {
            let full_xs = spectrum.emission_values();
            (
                full_xs,
                math::nearest_index(fixed_x, spectrum.excitation_values()),
                math::nearest_index(self.em_range.min(), full_xs),
                math::nearest_index(self.em_range.max(), full_xs),
            )
        } else {
            let full_xs = spectrum.excitation_values();
            (
                full_xs,
                math::nearest_index(fixed_x, spectrum.emission_values()),
                math::nearest_index(self.ex_range.min(), full_xs),
                math::nearest_index(self.ex_range.max(), full_xs),
            )
        };
        let from = min_index.min(max_index);
        let to = min_index.max(max_index);

        let mut total = 0.0;
        let mut real = 0.0;
        let mut imaginary = 0.0;
        for i in from..to {
            let l = (full_xs[i] - full_xs[min_index]) / (full_xs[max_index] - full_xs[min_index]);
            let (ex_index, em_index) = if emission { (fixed_index, i) } else { (i, fixed_index) };
            let intensity = spectrum.intensity_at(ex_index, em_index);
            let angle = 2.0 * PI * l * order;
            real += intensity * angle.cos();
            imaginary += intensity * angle.sin();
            total += intensity;
        }
        Phasor::new(real / total, imaginary / total)
    }
}

impl DisplayName for PhasorAssay {
    fn display_name(&self) -> String {
        self.name.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::RawGrid;

    /// Grid with the given axis arrays and a constant intensity.
    fn grid(ex: &[f64], em: &[f64], fill: f64) -> RawGrid {
        let mut values = Vec::with_capacity(em.len() + 1);
        let mut header = vec![0.0];
        header.extend_from_slice(ex);
        values.push(header);
        for &em_x in em {
            let mut row = vec![em_x];
            row.extend(std::iter::repeat(fill).take(ex.len()));
            values.push(row);
        }
        RawGrid::new("test", values)
    }

    fn assay_of(grids: &[RawGrid]) -> PhasorAssay {
        let mut assay = PhasorAssay::new("assay");
        for g in grids {
            assay.push(Rc::new(Spectrum::from_grid(g, XUnit::Wavelength)));
        }
        assay.reset_ranges();
        assay
    }

    fn steps(from: f64, to: f64, n: usize) -> Vec<f64> {
        let step = (to - from) / (n - 1) as f64;
        (0..n).map(|i| from + step * i as f64).collect()
    }

    #[test]
    fn range_triple_sorts_on_construction() {
        let r = RangeTriple::new(5.0, 1.0, 3.0);
        assert_eq!((r.min(), r.selected(), r.max()), (1.0, 3.0, 5.0));
    }

    #[test]
    fn range_triple_selection_is_clamped() {
        let r = RangeTriple::from_bounds(0.0, 10.0);
        assert_eq!(r.selected(), 5.0);
        assert_eq!(r.with_selected(42.0).selected(), 10.0);
        assert_eq!(r.with_selected(-3.0).selected(), 0.0);
    }

    #[test]
    fn zoom_bounds_are_clamped_to_unit_square() {
        let mut zoom = ZoomWindow::default();
        zoom.set(-3.0, 0.5, 0.2, 7.0);
        assert_eq!(zoom.bounds(), (-1.0, 0.5, 0.2, 1.0));
    }

    #[test]
    fn reset_ranges_intersects_member_extents() {
        let em = steps(500.0, 600.0, 5);
        let a = grid(&steps(0.0, 10.0, 6), &em, 1.0);
        let b = grid(&steps(2.0, 12.0, 6), &em, 1.0);
        let c = grid(&steps(1.0, 9.0, 5), &em, 1.0);
        let assay = assay_of(&[a, b, c]);
        assert_eq!(assay.ex_range().min(), 2.0);
        assert_eq!(assay.ex_range().max(), 9.0);
        assert_eq!(assay.ex_range().selected(), 5.5);
    }

    #[test]
    fn invalid_harmonic_yields_no_phasor() {
        let mut assay = assay_of(&[grid(&steps(400.0, 500.0, 6), &steps(500.0, 600.0, 6), 1.0)]);
        assert!(assay.phasor(0, Harmonic::new(0, 0)).is_none());
        assert!(assay.phasor(0, Harmonic::new(1, 1)).is_some());
        assay.harmonic = Harmonic::new(0, 0);
        assert!(assay.current_phasor(0).is_none());
    }

    #[test]
    fn phasor_is_bounded_for_nonnegative_grids() {
        // A weighted average of unit-circle points stays inside the circle.
        let mut g = grid(&steps(400.0, 500.0, 11), &steps(500.0, 620.0, 13), 0.0);
        for (i, row) in g.values.iter_mut().enumerate().skip(1) {
            for (j, cell) in row.iter_mut().enumerate().skip(1) {
                *cell = (i * j % 7) as f64 + 0.25;
            }
        }
        let assay = assay_of(&[g]);
        for harmonic in [
            Harmonic::new(1, 1),
            Harmonic::new(2, 1),
            Harmonic::new(0, 1),
            Harmonic::new(2, 0),
        ] {
            let p = assay.phasor(0, harmonic).unwrap();
            assert!(p.is_finite());
            assert!(p.g * p.g + p.s * p.s <= 1.0 + 1e-9, "{harmonic:?}: {p:?}");
        }
    }

    #[test]
    fn single_cell_phasor_lies_on_unit_circle() {
        let mut g = grid(&steps(400.0, 500.0, 6), &steps(500.0, 600.0, 6), 0.0);
        g.values[2][3] = 5.0;
        let assay = assay_of(&[g]);
        let p = assay.phasor(0, Harmonic::new(1, 2)).unwrap();
        assert!((p.g * p.g + p.s * p.s - 1.0).abs() < 1e-12);
    }

    #[test]
    fn emission_phasor_with_intensity_at_window_start_is_one_zero() {
        // Single nonzero cell at the start of the emission window: L = 0,
        // so the phasor collapses onto (1, 0).
        let mut g = grid(&steps(0.0, 2.0, 3), &steps(0.0, 10.0, 11), 0.0);
        g.values[1][2] = 3.0; // em index 0, ex index 1
        let mut assay = assay_of(&[g]);
        assay.set_ex_range(assay.ex_range().with_selected(1.0));
        let p = assay.phasor(0, Harmonic::new(0, 1)).unwrap();
        assert!((p.g - 1.0).abs() < 1e-12 && p.s.abs() < 1e-12);
    }

    #[test]
    fn zero_intensity_window_propagates_nan() {
        let assay = assay_of(&[grid(&steps(400.0, 500.0, 6), &steps(500.0, 600.0, 6), 0.0)]);
        let p = assay.phasor(0, Harmonic::new(1, 1)).unwrap();
        assert!(p.g.is_nan() && p.s.is_nan());
        assert!(!p.is_finite());
    }

    #[test]
    fn unit_switch_is_shared_between_assays() {
        let spectrum = Rc::new(Spectrum::from_grid(
            &grid(&steps(400.0, 500.0, 6), &steps(500.0, 600.0, 6), 1.0),
            XUnit::Wavelength,
        ));
        let mut a = PhasorAssay::new("a");
        let mut b = PhasorAssay::new("b");
        a.push(Rc::clone(&spectrum));
        b.push(spectrum);
        a.set_x_unit(XUnit::WavenumberUm);
        assert_eq!(b.x_unit(), XUnit::WavenumberUm);
    }

    #[test]
    fn selected_cross_sections_follow_range_state() {
        let mut g = grid(&steps(0.0, 2.0, 3), &steps(0.0, 1.0, 2), 0.0);
        g.values[1][1] = 1.0; // (ex 0, em 0)
        g.values[1][3] = 9.0; // (ex 2, em 0)
        let mut assay = assay_of(&[g]);
        assay.set_selected_excitation(2.0);
        assert_eq!(assay.emission_intensities_for(0)[0], 9.0);
        assay.set_selected_emission(0.0);
        assert_eq!(assay.excitation_intensities_for(0), vec![1.0, 0.0, 9.0]);
    }
}
