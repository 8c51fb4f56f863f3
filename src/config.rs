use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{InterpretError, Result};
use crate::topic_modeling::ModelKey;

/// Settings for one analysis run. Every output location is carried here
/// and handed to the exporter explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub store_dir: PathBuf,
    /// Pre-processed documents carrying tokens.
    pub raw_collection: String,
    /// Documents carrying inferred topics.
    pub derived_collection: String,
    pub models_folder: PathBuf,
    pub labels_path: PathBuf,
    pub plot_folder: PathBuf,
    pub table_folder: PathBuf,
    pub model: ModelKey,
    pub top_n_words: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let files = PathBuf::from("files");
        AnalysisConfig {
            store_dir: files.join("db"),
            raw_collection: "publications_raw".to_string(),
            derived_collection: "publications".to_string(),
            models_folder: files.join("models"),
            labels_path: files.join("labels.json"),
            plot_folder: files.join("plots"),
            table_folder: files.join("tables"),
            model: ModelKey::default(),
            top_n_words: 10,
        }
    }
}

impl AnalysisConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let config: AnalysisConfig = serde_json::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.k == 0 {
            return Err(InterpretError::Config("model.k must be at least 1".to_string()));
        }
        if self.raw_collection == self.derived_collection {
            return Err(InterpretError::Config(format!(
                "raw and derived collections are both '{}'",
                self.raw_collection
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"model": {"k": 14, "dir_prior": "symmetric", "random_state": 1, "num_pass": 10, "iteration": 100}, "top_n_words": 5}"#).unwrap();

        let config = AnalysisConfig::load(&path).unwrap();
        assert_eq!(config.model.k, 14);
        assert_eq!(config.top_n_words, 5);
        assert_eq!(config.derived_collection, "publications");
    }

    #[test]
    fn same_collection_for_input_and_output_is_rejected() {
        let config = AnalysisConfig {
            derived_collection: "publications_raw".to_string(),
            ..AnalysisConfig::default()
        };
        assert!(matches!(config.validate(), Err(InterpretError::Config(_))));
    }
}
