use aimcore::chunk::{ChunkMetadata, PsdChunk};
use anyhow::ensure;
use ndarray::{Array1, Array3};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// One simulated leakage source on the die.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hotspot {
    pub x: usize,
    pub y: usize,
    /// Gaussian radius in grid cells.
    pub radius: f64,
    /// Peak power in watts.
    pub power_w: f64,
}

/// Configuration for generating a synthetic PSD measurement chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub identifier: String,
    pub x_div: usize,
    pub y_div: usize,
    pub bins: usize,
    pub freq_start_hz: f64,
    pub freq_span_hz: f64,
    pub noise_floor_w: f64,
    /// Relative jitter applied to the noise floor, in `[0, 1]`.
    pub noise_jitter: f64,
    pub seed: u64,
    pub hotspots: Vec<Hotspot>,
    pub scenario: Option<String>,
    pub description: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            identifier: "synthetic".into(),
            x_div: 32,
            y_div: 32,
            bins: 64,
            freq_start_hz: 128e6,
            freq_span_hz: 10e6,
            noise_floor_w: 1e-9,
            noise_jitter: 0.05,
            seed: 0,
            hotspots: vec![
                Hotspot {
                    x: 8,
                    y: 9,
                    radius: 2.5,
                    power_w: 1e-6,
                },
                Hotspot {
                    x: 24,
                    y: 22,
                    radius: 2.5,
                    power_w: 5e-7,
                },
            ],
            scenario: None,
            description: None,
        }
    }
}

/// Builds a reproducible synthetic chunk: a jittered noise floor with
/// Gaussian leakage humps, plus a complete metadata record.
pub fn build_psd_chunk(config: &GeneratorConfig) -> anyhow::Result<PsdChunk> {
    ensure!(
        config.x_div > 0 && config.y_div > 0 && config.bins > 0,
        "generator grid dimensions must be positive"
    );
    ensure!(
        config.freq_span_hz > 0.0 && config.noise_floor_w > 0.0,
        "generator span and noise floor must be positive"
    );

    let mut rng = StdRng::seed_from_u64(config.seed);
    let bin_spacing = config.freq_span_hz / config.bins as f64;

    let mut data = Array3::zeros((config.y_div, config.x_div, config.bins));
    for y in 0..config.y_div {
        for x in 0..config.x_div {
            let mut leakage = 0.0;
            for spot in &config.hotspots {
                let dx = x as f64 - spot.x as f64;
                let dy = y as f64 - spot.y as f64;
                let d2 = dx * dx + dy * dy;
                leakage += spot.power_w * (-d2 / (2.0 * spot.radius * spot.radius)).exp();
            }
            for bin in 0..config.bins {
                let jitter = rng.gen_range(-config.noise_jitter..=config.noise_jitter);
                data[[y, x, bin]] = config.noise_floor_w * (1.0 + jitter) + leakage;
            }
        }
    }

    let freq = Array1::from_shape_fn(config.bins, |i| {
        config.freq_start_hz + i as f64 * bin_spacing
    });

    let metadata = ChunkMetadata {
        rbw: Some(bin_spacing),
        vbw: Some(bin_spacing),
        freq_start: Some(config.freq_start_hz),
        freq_stop: Some(config.freq_start_hz + config.freq_span_hz),
        freq_span: Some(config.freq_span_hz),
        freq_center: Some(config.freq_start_hz + config.freq_span_hz / 2.0),
        psd_unit: Some("W".into()),
        ref_level: Some(0.0),
        avg: Some(true),
        maxh: Some(false),
        avg_maxh_count: Some(10),
        sweep_time_s: Some(0.02),
        ..Default::default()
    };

    Ok(PsdChunk::new(
        config.identifier.clone(),
        data,
        freq,
        metadata,
    )?)
}

pub fn build_default_chunk() -> anyhow::Result<PsdChunk> {
    build_psd_chunk(&GeneratorConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_builds_expected_shape() {
        let chunk = build_default_chunk().unwrap();
        assert_eq!(chunk.y_div(), 32);
        assert_eq!(chunk.x_div(), 32);
        assert_eq!(chunk.bins(), 64);
        assert!((chunk.bin_spacing_hz().unwrap() - 10e6 / 64.0).abs() < 1e-6);
    }

    #[test]
    fn hotspots_rise_above_the_noise_floor() {
        let config = GeneratorConfig::default();
        let chunk = build_psd_chunk(&config).unwrap();
        let spot = &config.hotspots[0];
        let at_spot = chunk.data()[[spot.y, spot.x, 0]];
        let far_away = chunk.data()[[0, 31, 0]];
        assert!(at_spot > 100.0 * far_away);
    }

    #[test]
    fn identical_seeds_reproduce_identical_chunks() {
        let a = build_default_chunk().unwrap();
        let b = build_default_chunk().unwrap();
        assert_eq!(a.data(), b.data());
    }

    #[test]
    fn degenerate_dimensions_are_rejected() {
        let config = GeneratorConfig {
            bins: 0,
            ..Default::default()
        };
        assert!(build_psd_chunk(&config).is_err());
    }
}
