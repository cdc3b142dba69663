//! Generate a synthetic excitation–emission dataset: three pure fluorophores
//! plus mixtures with known fractions, written as long-format Parquet
//! (`sample_data.parquet`) and as a plain CSV grid of the first mixture
//! (`sample_mix.csv`).

use std::sync::Arc;

use arrow::array::{Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// A 2D Gaussian emission–excitation peak.
struct Peak {
    mu_ex: f64,
    mu_em: f64,
    sigma_ex: f64,
    sigma_em: f64,
    amplitude: f64,
}

fn surface(ex: f64, em: f64, peaks: &[Peak]) -> f64 {
    peaks
        .iter()
        .map(|p| {
            p.amplitude
                * (-(ex - p.mu_ex).powi(2) / (2.0 * p.sigma_ex.powi(2))
                    - (em - p.mu_em).powi(2) / (2.0 * p.sigma_em.powi(2)))
                .exp()
        })
        .sum()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn main() {
    spectral_phasor::logging::init();
    let mut rng = SimpleRng::new(42);

    // Excitation 350→550 nm, emission 400→700 nm, 5 nm steps.
    let excitation: Vec<f64> = (0..41).map(|i| 350.0 + i as f64 * 5.0).collect();
    let emission: Vec<f64> = (0..61).map(|i| 400.0 + i as f64 * 5.0).collect();

    let components: Vec<(&str, Vec<Peak>)> = vec![
        (
            "component_A",
            vec![Peak { mu_ex: 380.0, mu_em: 450.0, sigma_ex: 25.0, sigma_em: 35.0, amplitude: 1.0 }],
        ),
        (
            "component_B",
            vec![Peak { mu_ex: 450.0, mu_em: 540.0, sigma_ex: 30.0, sigma_em: 40.0, amplitude: 0.9 }],
        ),
        (
            "component_C",
            vec![
                Peak { mu_ex: 500.0, mu_em: 620.0, sigma_ex: 20.0, sigma_em: 30.0, amplitude: 0.7 },
                Peak { mu_ex: 420.0, mu_em: 620.0, sigma_ex: 15.0, sigma_em: 30.0, amplitude: 0.2 },
            ],
        ),
    ];

    // Pure references plus mixtures with known fractions of A/B/C.
    let mixtures: Vec<(String, [f64; 3])> = vec![
        ("component_A".to_string(), [1.0, 0.0, 0.0]),
        ("component_B".to_string(), [0.0, 1.0, 0.0]),
        ("component_C".to_string(), [0.0, 0.0, 1.0]),
        ("mix_60_30_10".to_string(), [0.6, 0.3, 0.1]),
        ("mix_20_50_30".to_string(), [0.2, 0.5, 0.3]),
        ("mix_33_33_33".to_string(), [1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]),
    ];

    let mut all_name: Vec<String> = Vec::new();
    let mut all_ex: Vec<f64> = Vec::new();
    let mut all_em: Vec<f64> = Vec::new();
    let mut all_intensity: Vec<f64> = Vec::new();

    for (name, fractions) in &mixtures {
        for &ex in &excitation {
            for &em in &emission {
                let signal: f64 = components
                    .iter()
                    .zip(fractions)
                    .map(|((_, peaks), &f)| f * surface(ex, em, peaks))
                    .sum();
                let noisy = (signal + rng.gauss(0.0, 0.002)).max(0.0);
                all_name.push(name.clone());
                all_ex.push(ex);
                all_em.push(em);
                all_intensity.push(noisy);
            }
        }
    }

    // ---- Parquet (long format) ----
    let schema = Arc::new(Schema::new(vec![
        Field::new("name", DataType::Utf8, false),
        Field::new("excitation", DataType::Float64, false),
        Field::new("emission", DataType::Float64, false),
        Field::new("intensity", DataType::Float64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(
                all_name.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(all_ex)),
            Arc::new(Float64Array::from(all_em)),
            Arc::new(Float64Array::from(all_intensity)),
        ],
    )
    .expect("Failed to create RecordBatch");

    let parquet_path = "sample_data.parquet";
    let file = std::fs::File::create(parquet_path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");

    // ---- CSV grid of the first mixture ----
    let csv_path = "sample_mix.csv";
    let mut csv_writer = csv::Writer::from_path(csv_path).expect("Failed to create CSV file");
    let (mix_name, mix_fractions) = &mixtures[3];
    let mut header = vec!["0".to_string()];
    header.extend(excitation.iter().map(f64::to_string));
    csv_writer.write_record(&header).expect("Failed to write CSV header");
    for &em in &emission {
        let mut row = vec![em.to_string()];
        for &ex in &excitation {
            let signal: f64 = components
                .iter()
                .zip(mix_fractions)
                .map(|((_, peaks), &f)| f * surface(ex, em, peaks))
                .sum();
            row.push(signal.to_string());
        }
        csv_writer.write_record(&row).expect("Failed to write CSV row");
    }
    csv_writer.flush().expect("Failed to flush CSV");

    log::info!(
        "wrote {} spectra ({} x {} cells each) to {parquet_path}, grid '{mix_name}' to {csv_path}",
        mixtures.len(),
        excitation.len(),
        emission.len()
    );
}
