use std::path::PathBuf;

use crate::embedding::EmbeddingConfig;

/// Default public location of the round-by-round model performance data.
pub const DEFAULT_DATA_URL: &str =
    "https://raw.githubusercontent.com/woobe/numerati/master/data.csv";

/// Configuration for the full fetch → pivot → embed → render pipeline.
///
/// The round window and annotation table were module-level constants in the
/// original tooling; carrying them in a config structure lets tests vary them
/// without editing source.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub data_url: String,
    pub cache_path: PathBuf,
    /// First round of the inclusive window used for the embedding.
    pub first_round: u32,
    /// Last round of the inclusive window used for the embedding.
    pub last_round: u32,
    pub embedding: EmbeddingConfig,
    /// Lower clamp of the diverging color scale (mean correlation).
    pub color_min: f64,
    /// Upper clamp of the diverging color scale (mean correlation).
    pub color_max: f64,
    /// Models of interest to label on the chart, with the text offset
    /// (in embedding units) relative to each model's point.
    pub known_models: Vec<(String, (f64, f64))>,
    pub chart_path: PathBuf,
    pub export_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_url: DEFAULT_DATA_URL.to_string(),
            cache_path: PathBuf::from("round_data.csv"),
            first_round: 221,
            last_round: 245,
            embedding: EmbeddingConfig::default(),
            color_min: -0.03,
            color_max: 0.03,
            known_models: vec![
                ("budbot_7".to_string(), (-2.0, -2.0)),
                ("integration_test_7".to_string(), (2.0, 0.5)),
                ("krat".to_string(), (-0.25, -2.5)),
                ("trivial".to_string(), (-2.0, -2.0)),
            ],
            chart_path: PathBuf::from("model_map.png"),
            export_path: PathBuf::from("model_map.json"),
        }
    }
}

impl PipelineConfig {
    /// Load config from environment variables (for window sweeps) or use defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(first) = parse_env_var("ATLAS_FIRST_ROUND") {
            config.first_round = first;
        }
        if let Some(last) = parse_env_var("ATLAS_LAST_ROUND") {
            config.last_round = last;
        }
        if let Ok(url) = std::env::var("ATLAS_DATA_URL") {
            if !url.is_empty() {
                config.data_url = url;
            }
        }
        config
    }

    /// Number of rounds in the inclusive window.
    pub fn window_len(&self) -> usize {
        (self.last_round.saturating_sub(self.first_round) + 1) as usize
    }
}

fn parse_env_var(name: &str) -> Option<u32> {
    std::env::var(name).ok()?.parse().ok()
}
