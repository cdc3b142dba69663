/// Data layer: spectral containers, the phasor transform, and loading.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → rectangular RawGrid(s)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ Spectrum  │  axes in 3 unit systems + intensity grid
///   └──────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ PhasorAssay │  grouped spectra, ranges → (G, S) phasors
///   └────────────┘
/// ```
pub mod assay;
pub mod loader;
pub mod model;
