use std::cell::Cell;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math;
use crate::DisplayName;

// ---------------------------------------------------------------------------
// XUnit – the three x-axis unit systems
// ---------------------------------------------------------------------------

/// Unit system for the excitation and emission axes.
///
/// Every spectrum keeps its axes in all three representations at once;
/// `XUnit` selects which one the read accessors expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum XUnit {
    /// Wavelength, λ (nm).
    Wavelength,
    /// Wavenumber, v (1/cm).
    WavenumberCm,
    /// Wavenumber, v (1/µm).
    WavenumberUm,
}

impl XUnit {
    /// All unit systems, in the order axis tables store them.
    pub const ALL: [XUnit; 3] = [XUnit::Wavelength, XUnit::WavenumberCm, XUnit::WavenumberUm];

    /// Convert a single axis value from `self` into `target`.
    ///
    /// A zero value converts to ±∞ where the formula divides by it; that is
    /// propagated, not trapped.
    pub fn convert(self, target: XUnit, value: f64) -> f64 {
        use XUnit::*;
        match (self, target) {
            (Wavelength, WavenumberCm) => 1e7 / value,
            (Wavelength, WavenumberUm) => 1e3 / value,
            (WavenumberCm, Wavelength) => 1e7 / value,
            (WavenumberCm, WavenumberUm) => value / 1e4,
            (WavenumberUm, Wavelength) => 1e3 / value,
            (WavenumberUm, WavenumberCm) => value * 1e4,
            _ => value,
        }
    }

    fn index(self) -> usize {
        match self {
            XUnit::Wavelength => 0,
            XUnit::WavenumberCm => 1,
            XUnit::WavenumberUm => 2,
        }
    }
}

impl fmt::Display for XUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            XUnit::Wavelength => "λ (nm)",
            XUnit::WavenumberCm => "v (1/cm)",
            XUnit::WavenumberUm => "v (1/µm)",
        };
        write!(f, "{label}")
    }
}

// ---------------------------------------------------------------------------
// RawGrid – the ingestion boundary type
// ---------------------------------------------------------------------------

/// A named rectangular numeric grid as produced by the loader.
///
/// Layout: `values[0][1..]` holds the excitation axis, `values[1..][0]` the
/// emission axis, `values[0][0]` is ignored, and every other cell is the
/// intensity at its (emission row, excitation column). Producers must pad
/// ragged rows (the CSV loader pads with NaN) so the grid is rectangular.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawGrid {
    pub name: String,
    pub values: Vec<Vec<f64>>,
}

impl RawGrid {
    pub fn new(name: impl Into<String>, values: Vec<Vec<f64>>) -> Self {
        RawGrid { name: name.into(), values }
    }
}

// ---------------------------------------------------------------------------
// Spectrum – one excitation–emission map
// ---------------------------------------------------------------------------

/// An excitation–emission intensity map with multi-unit axes.
///
/// Immutable after construction except for [`Spectrum::current_unit`], which
/// only changes which axis representation the accessors expose. Spectra are
/// shared between assays by `Rc`, so that field uses interior mutability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spectrum {
    name: String,
    /// Excitation axis in each unit system, indexed per [`XUnit::ALL`].
    excitation: [Vec<f64>; 3],
    /// Emission axis in each unit system, indexed per [`XUnit::ALL`].
    emission: [Vec<f64>; 3],
    /// Intensity grid, indexed `[excitation][emission]`.
    intensities: Vec<Vec<f64>>,
    /// The unit system the read accessors currently expose.
    pub current_unit: Cell<XUnit>,
}

impl Spectrum {
    /// Build a spectrum from a raw grid whose axes are in `unit`.
    ///
    /// The other two axis representations are filled element-wise at
    /// construction; the intensity grid dimensions are fixed from then on.
    pub fn from_grid(grid: &RawGrid, unit: XUnit) -> Self {
        let rows = grid.values.len();
        let cols = if rows > 0 { grid.values[0].len() } else { 0 };
        let ex_count = cols.saturating_sub(1);
        let em_count = rows.saturating_sub(1);

        let ex_source: Vec<f64> = (0..ex_count).map(|j| grid.values[0][j + 1]).collect();
        let em_source: Vec<f64> = (0..em_count).map(|i| grid.values[i + 1][0]).collect();

        let mut intensities = vec![vec![0.0; em_count]; ex_count];
        for (ex, row) in intensities.iter_mut().enumerate() {
            for (em, cell) in row.iter_mut().enumerate() {
                *cell = grid.values[em + 1][ex + 1];
            }
        }

        Spectrum {
            name: grid.name.clone(),
            excitation: fill_units(ex_source, unit),
            emission: fill_units(em_source, unit),
            intensities,
            current_unit: Cell::new(unit),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Excitation axis values in the current unit.
    pub fn excitation_values(&self) -> &[f64] {
        &self.excitation[self.current_unit.get().index()]
    }

    /// Emission axis values in the current unit.
    pub fn emission_values(&self) -> &[f64] {
        &self.emission[self.current_unit.get().index()]
    }

    /// Intensity at an (excitation, emission) index pair.
    pub fn intensity_at(&self, ex_index: usize, em_index: usize) -> f64 {
        self.intensities[ex_index][em_index]
    }

    /// The 1D emission spectrum at the excitation value nearest to `ex_x`.
    pub fn row_at(&self, ex_x: f64) -> &[f64] {
        let index = math::nearest_index(ex_x, self.excitation_values());
        &self.intensities[index]
    }

    /// The 1D excitation spectrum at the emission value nearest to `em_x`.
    pub fn column_at(&self, em_x: f64) -> Vec<f64> {
        let index = math::nearest_index(em_x, self.emission_values());
        self.intensities.iter().map(|row| row[index]).collect()
    }

    /// Number of excitation samples.
    pub fn excitation_len(&self) -> usize {
        self.intensities.len()
    }

    /// Number of emission samples.
    pub fn emission_len(&self) -> usize {
        self.intensities.first().map_or(0, Vec::len)
    }

    // Extent accessors return the first/last axis element; axes converted
    // into a reciprocal unit run in descending order, so callers order the
    // pair before using it as a range.

    pub fn min_excitation(&self) -> f64 {
        *self.excitation_values().first().unwrap_or(&f64::NAN)
    }

    pub fn max_excitation(&self) -> f64 {
        *self.excitation_values().last().unwrap_or(&f64::NAN)
    }

    pub fn min_emission(&self) -> f64 {
        *self.emission_values().first().unwrap_or(&f64::NAN)
    }

    pub fn max_emission(&self) -> f64 {
        *self.emission_values().last().unwrap_or(&f64::NAN)
    }
}

impl DisplayName for Spectrum {
    fn display_name(&self) -> String {
        self.name.clone()
    }
}

/// Populate all three unit representations from the source axis.
fn fill_units(source: Vec<f64>, unit: XUnit) -> [Vec<f64>; 3] {
    let mut table: [Vec<f64>; 3] = Default::default();
    for target in XUnit::ALL {
        if target == unit {
            continue;
        }
        table[target.index()] = source.iter().map(|&v| unit.convert(target, v)).collect();
    }
    table[unit.index()] = source;
    table
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_grid() -> RawGrid {
        // Excitation axis 400/450/500 nm, emission axis 500/550 nm.
        RawGrid::new(
            "sample",
            vec![
                vec![0.0, 400.0, 450.0, 500.0],
                vec![500.0, 1.0, 2.0, 3.0],
                vec![550.0, 4.0, 5.0, 6.0],
            ],
        )
    }

    #[test]
    fn grid_layout_maps_axes_and_intensities() {
        let sp = Spectrum::from_grid(&sample_grid(), XUnit::Wavelength);
        assert_eq!(sp.excitation_values(), &[400.0, 450.0, 500.0]);
        assert_eq!(sp.emission_values(), &[500.0, 550.0]);
        assert_eq!(sp.excitation_len(), 3);
        assert_eq!(sp.emission_len(), 2);
        // intensities[ex][em]
        assert_eq!(sp.intensity_at(0, 0), 1.0);
        assert_eq!(sp.intensity_at(2, 0), 3.0);
        assert_eq!(sp.intensity_at(0, 1), 4.0);
        assert_eq!(sp.intensity_at(2, 1), 6.0);
    }

    #[test]
    fn unit_conversion_round_trips() {
        // A→B→A stays within 1e-9 relative error for every unit pair.
        for from in XUnit::ALL {
            for to in XUnit::ALL {
                for v in [320.0, 450.5, 700.0, 12500.0] {
                    let back = to.convert(from, from.convert(to, v));
                    assert!(
                        ((back - v) / v).abs() < 1e-9,
                        "{from:?}→{to:?}→{from:?} for {v}: got {back}"
                    );
                }
            }
        }
    }

    #[test]
    fn conversion_constants() {
        assert_eq!(XUnit::Wavelength.convert(XUnit::WavenumberCm, 500.0), 2e4);
        assert_eq!(XUnit::Wavelength.convert(XUnit::WavenumberUm, 500.0), 2.0);
        assert_eq!(XUnit::WavenumberCm.convert(XUnit::WavenumberUm, 2e4), 2.0);
        assert_eq!(XUnit::WavenumberUm.convert(XUnit::WavenumberCm, 2.0), 2e4);
    }

    #[test]
    fn zero_axis_value_converts_to_infinity() {
        let v = XUnit::Wavelength.convert(XUnit::WavenumberCm, 0.0);
        assert!(v.is_infinite());
    }

    #[test]
    fn switching_units_switches_accessor_output() {
        let sp = Spectrum::from_grid(&sample_grid(), XUnit::Wavelength);
        sp.current_unit.set(XUnit::WavenumberCm);
        assert_eq!(sp.excitation_values()[0], 1e7 / 400.0);
        assert_eq!(sp.emission_values()[1], 1e7 / 550.0);
        sp.current_unit.set(XUnit::Wavelength);
        assert_eq!(sp.excitation_values()[0], 400.0);
    }

    #[test]
    fn cross_sections_resolve_nearest_axis_value() {
        let sp = Spectrum::from_grid(&sample_grid(), XUnit::Wavelength);
        // row_at: emission spectrum at excitation ≈ 460 → index 1
        assert_eq!(sp.row_at(460.0), &[2.0, 5.0]);
        // column_at: excitation spectrum at emission ≈ 540 → index 1
        assert_eq!(sp.column_at(540.0), vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn serde_round_trip_preserves_fields() {
        let sp = Spectrum::from_grid(&sample_grid(), XUnit::Wavelength);
        let json = serde_json::to_string(&sp).unwrap();
        let back: Spectrum = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name(), "sample");
        assert_eq!(back.current_unit.get(), XUnit::Wavelength);
        assert_eq!(back.intensity_at(1, 1), 5.0);
    }
}
