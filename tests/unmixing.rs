//! End-to-end unmixing scenarios: raw grid → spectrum → assay → phasor →
//! equation system → fractions.

use std::rc::Rc;

use spectral_phasor::data::loader;
use spectral_phasor::{
    Axis, HarmonicSlot, PhasorAssay, RawGrid, ReferencePoint, Spectrum, SystemState,
    UnmixingModel, XUnit,
};

/// Synthetic excitation–emission grid with a smooth intensity surface.
fn sample_grid(name: &str, peak_ex: f64, peak_em: f64) -> RawGrid {
    let excitation: Vec<f64> = (0..21).map(|i| 400.0 + f64::from(i) * 5.0).collect();
    let emission: Vec<f64> = (0..31).map(|i| 450.0 + f64::from(i) * 5.0).collect();
    let mut values = Vec::with_capacity(emission.len() + 1);
    let mut header = vec![0.0];
    header.extend_from_slice(&excitation);
    values.push(header);
    for &em in &emission {
        let mut row = vec![em];
        for &ex in &excitation {
            let d = ((ex - peak_ex) / 40.0).powi(2) + ((em - peak_em) / 60.0).powi(2);
            row.push((-d).exp());
        }
        values.push(row);
    }
    RawGrid::new(name, values)
}

fn sample_assay() -> PhasorAssay {
    let mut assay = PhasorAssay::new("measurements");
    assay.push(Rc::new(Spectrum::from_grid(
        &sample_grid("mix_1", 430.0, 520.0),
        XUnit::Wavelength,
    )));
    assay.push(Rc::new(Spectrum::from_grid(
        &sample_grid("mix_2", 470.0, 560.0),
        XUnit::Wavelength,
    )));
    assay.reset_ranges();
    assay
}

#[test]
fn three_component_unmixing_with_unity_constraint() {
    let mut model = UnmixingModel::new();
    model.assays.push(sample_assay());

    // Pure-component references at harmonic (1, 1):
    // G coefficients [0.8, 0.3, 0.1], S coefficients [0.1, 0.4, 0.9].
    let slot = HarmonicSlot::Ex1Em1;
    for (name, g, s) in [("a", 0.8, 0.1), ("b", 0.3, 0.4), ("c", 0.1, 0.9)] {
        assert!(model.solver.add_point(ReferencePoint::new(slot, name, g, s)));
    }

    model.solver.define_system(3);
    let g_eq = model.solver.coordinate_equation(Axis::G, slot).unwrap();
    let s_eq = model.solver.coordinate_equation(Axis::S, slot).unwrap();
    let unity = model.solver.unity_equation().unwrap();
    assert_eq!(g_eq.coefficients(), &[0.8, 0.3, 0.1]);
    assert_eq!(s_eq.coefficients(), &[0.1, 0.4, 0.9]);
    assert!(model.solver.add_equation(g_eq));
    assert!(model.solver.add_equation(s_eq));
    assert!(model.solver.add_equation(unity));
    assert_eq!(model.solver.state(), SystemState::Correct);

    model.recalculate();

    for spectrum_index in 0..2 {
        let fractions = model.fractions_for(0, spectrum_index).unwrap();
        assert_eq!(fractions.len(), 3);

        // The unity row makes the fractions sum to exactly one.
        let sum: f64 = fractions.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6, "spectrum {spectrum_index}: sum {sum}");

        // The coordinate rows must reproduce the measured phasor.
        let phasor = model.assays[0]
            .phasor(spectrum_index, slot.harmonic())
            .unwrap();
        let g: f64 = fractions
            .iter()
            .zip([0.8, 0.3, 0.1])
            .map(|(f, c)| f * c)
            .sum();
        let s: f64 = fractions
            .iter()
            .zip([0.1, 0.4, 0.9])
            .map(|(f, c)| f * c)
            .sum();
        assert!((g - phasor.g).abs() < 1e-9);
        assert!((s - phasor.s).abs() < 1e-9);
    }
}

#[test]
fn model_graph_survives_serialization() {
    let mut model = UnmixingModel::new();
    model.assays.push(sample_assay());
    let slot = HarmonicSlot::Em2;
    model
        .solver
        .add_point(ReferencePoint::new(slot, "a", 0.7, 0.2));
    model
        .solver
        .add_point(ReferencePoint::new(slot, "b", 0.2, 0.6));
    model.solver.define_system(2);
    let g_eq = model.solver.coordinate_equation(Axis::G, slot).unwrap();
    let unity = model.solver.unity_equation().unwrap();
    model.solver.add_equation(g_eq);
    model.solver.add_equation(unity);
    model.recalculate();

    let json = serde_json::to_string(&model).unwrap();
    let restored: UnmixingModel = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.assays.len(), 1);
    assert_eq!(restored.assays[0].name(), "measurements");
    assert_eq!(restored.assays[0].len(), 2);
    assert_eq!(restored.solver.component_count(), Some(2));
    assert_eq!(restored.solver.points_at(slot).len(), 2);
    assert_eq!(restored.solver.equations(), model.solver.equations());
    // The fraction cache travels with the graph.
    assert_eq!(restored.fractions_for(0, 0), model.fractions_for(0, 0));
    // The restored assay still computes.
    assert!(restored.assays[0]
        .phasor(0, slot.harmonic())
        .unwrap()
        .is_finite());
}

#[test]
fn csv_file_to_phasor_pipeline() {
    let grid = sample_grid("from_disk", 450.0, 540.0);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("from_disk.csv");
    let mut writer = csv::Writer::from_path(&path).unwrap();
    for row in &grid.values {
        writer
            .write_record(row.iter().map(f64::to_string))
            .unwrap();
    }
    writer.flush().unwrap();

    let loaded = loader::load_file(&path).unwrap();
    assert_eq!(loaded.len(), 1);
    let mut assay = PhasorAssay::new("loaded");
    assay.push(Rc::new(Spectrum::from_grid(&loaded[0], XUnit::Wavelength)));
    assay.reset_ranges();

    let p = assay.phasor(0, spectral_phasor::Harmonic::new(1, 1)).unwrap();
    assert!(p.is_finite());
    assert!(p.g * p.g + p.s * p.s <= 1.0 + 1e-9);

    // The same data straight from memory gives the same phasor.
    let mut direct = PhasorAssay::new("direct");
    direct.push(Rc::new(Spectrum::from_grid(&grid, XUnit::Wavelength)));
    direct.reset_ranges();
    let q = direct.phasor(0, spectral_phasor::Harmonic::new(1, 1)).unwrap();
    assert!((p.g - q.g).abs() < 1e-12);
    assert!((p.s - q.s).abs() < 1e-12);
}
