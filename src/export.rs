use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One model's position in the embedded space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingEntry {
    pub model: String,
    pub x: f64,
    pub y: f64,
    pub mean_corr: f64,
}

/// The computed embedding plus the parameters that produced it, so the
/// chart can be rebuilt without re-running the optimization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEmbedding {
    pub first_round: u32,
    pub last_round: u32,
    pub seed: u64,
    pub entries: Vec<EmbeddingEntry>,
}

impl ModelEmbedding {
    pub fn new(
        first_round: u32,
        last_round: u32,
        seed: u64,
        models: &[String],
        coords: &[(f64, f64)],
        mean_corrs: &[f64],
    ) -> Self {
        let entries = models
            .iter()
            .zip(coords.iter())
            .zip(mean_corrs.iter())
            .map(|((model, (x, y)), mean_corr)| EmbeddingEntry {
                model: model.clone(),
                x: *x,
                y: *y,
                mean_corr: *mean_corr,
            })
            .collect();
        Self {
            first_round,
            last_round,
            seed,
            entries,
        }
    }

    /// Save the embedding to a JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), String> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize: {}", e))?;
        fs::write(path.as_ref(), json).map_err(|e| format!("Failed to write file: {}", e))?;
        Ok(())
    }

    /// Load a previously exported embedding from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let json =
            fs::read_to_string(path.as_ref()).map_err(|e| format!("Failed to read file: {}", e))?;
        let embedding: ModelEmbedding =
            serde_json::from_str(&json).map_err(|e| format!("Failed to deserialize: {}", e))?;
        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_model_embedding_save_load() {
        let models = vec!["budbot_7".to_string(), "krat".to_string()];
        let coords = vec![(1.5, -2.0), (0.25, 3.0)];
        let means = vec![0.012, -0.004];
        let original = ModelEmbedding::new(221, 245, 42, &models, &coords, &means);

        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path();

        original.save_json(path).unwrap();
        let loaded = ModelEmbedding::load_json(path).unwrap();

        assert_eq!(loaded.first_round, 221);
        assert_eq!(loaded.last_round, 245);
        assert_eq!(loaded.seed, 42);
        assert_eq!(loaded.entries.len(), 2);
        assert_eq!(loaded.entries[0].model, "budbot_7");
        assert_eq!(loaded.entries[0].x, 1.5);
        assert_eq!(loaded.entries[1].mean_corr, -0.004);
    }

    #[test]
    fn test_model_embedding_json_format() {
        let embedding = ModelEmbedding::new(
            10,
            12,
            7,
            &["trivial".to_string()],
            &[(0.0, 0.0)],
            &[0.001],
        );

        let json = serde_json::to_string_pretty(&embedding).unwrap();
        assert!(json.contains("\"first_round\": 10"));
        assert!(json.contains("\"seed\": 7"));
        assert!(json.contains("\"trivial\""));
    }
}
