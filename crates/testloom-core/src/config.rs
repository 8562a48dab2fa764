//! Pipeline configuration

use crate::error::{LoomError, Result};
use crate::plan::{PlanRequest, DEFAULT_TARGET_FRACTION};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Synthetic data generation parameters
    pub generation: GenerationSettings,

    /// Text generator backend
    pub provider: ProviderSettings,

    /// Validation behaviour
    pub validation: ValidationSettings,

    /// Artifact file names
    pub paths: PathSettings,
}

impl PipelineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of synthetic records
    pub fn with_record_count(mut self, record_count: usize) -> Self {
        self.generation.record_count = record_count;
        self
    }

    /// Set both invalid-cell floors
    pub fn with_minimums(mut self, per_row: usize, per_col: usize) -> Self {
        self.generation.min_invalid_per_row = per_row;
        self.generation.min_invalid_per_col = per_col;
        self
    }

    /// Set the seed probability of an invalid cell
    pub fn with_target_fraction(mut self, fraction: f64) -> Self {
        self.generation.target_invalid_fraction = fraction;
        self
    }

    /// Enable or disable strict validation
    pub fn with_strict_validation(mut self, strict: bool) -> Self {
        self.validation.strict = strict;
        self
    }

    /// Check values that can be judged without knowing the dictionary
    pub fn validate(&self) -> Result<()> {
        if self.generation.record_count == 0 {
            return Err(LoomError::InvalidConfiguration(
                "record count must be at least 1".into(),
            ));
        }
        if self.generation.min_invalid_per_col > self.generation.record_count {
            return Err(LoomError::InvalidConfiguration(format!(
                "min invalid per column ({}) exceeds record count ({})",
                self.generation.min_invalid_per_col, self.generation.record_count
            )));
        }
        let fraction = self.generation.target_invalid_fraction;
        if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
            return Err(LoomError::InvalidConfiguration(format!(
                "target invalid fraction must be in [0, 1], got {}",
                fraction
            )));
        }
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(LoomError::InvalidConfiguration(format!(
                "temperature must be in [0, 2], got {}",
                self.provider.temperature
            )));
        }
        Ok(())
    }

    /// Plan request for a dictionary with `field_count` fields
    pub fn plan_request(&self, field_count: usize) -> PlanRequest {
        PlanRequest::new(
            self.generation.record_count,
            field_count,
            self.generation.min_invalid_per_row,
            self.generation.min_invalid_per_col,
        )
        .with_target_fraction(self.generation.target_invalid_fraction)
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Number of synthetic records
    pub record_count: usize,

    /// Minimum invalid values per row
    pub min_invalid_per_row: usize,

    /// Minimum invalid values per column
    pub min_invalid_per_col: usize,

    /// Probability of an invalid cell before repair
    pub target_invalid_fraction: f64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            record_count: 50,
            min_invalid_per_row: 4,
            min_invalid_per_col: 10,
            target_invalid_fraction: DEFAULT_TARGET_FRACTION,
        }
    }
}

/// Supported text generator backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Gemini,
    OpenaiCompatible,
}

/// Text generator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub kind: ProviderKind,

    /// Model name
    pub model: String,

    /// Endpoint override (required for OpenAI-compatible backends)
    pub base_url: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: String,

    pub temperature: f64,

    pub max_tokens: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Gemini,
            model: "gemini-1.5-flash".to_string(),
            base_url: None,
            api_key_env: "GEMINI_API_KEY".to_string(),
            temperature: 0.3,
            max_tokens: 2048,
        }
    }
}

/// Validation settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    /// Also enforce length, is_numeric and is_alphanumeric
    pub strict: bool,
}

/// Artifact file names, relative to the output directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub formatted_dictionary: String,
    pub synthetic_data: String,
    pub validation_report: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            formatted_dictionary: "formatted_dictionary.csv".to_string(),
            synthetic_data: "synthetic_data.csv".to_string(),
            validation_report: "validation_report.csv".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.generation.record_count, 50);
        assert_eq!(config.generation.min_invalid_per_row, 4);
        assert_eq!(config.generation.min_invalid_per_col, 10);
        assert_eq!(config.provider.kind, ProviderKind::Gemini);
        assert!(!config.validation.strict);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = PipelineConfig::new()
            .with_record_count(10)
            .with_minimums(2, 3)
            .with_target_fraction(0.25)
            .with_strict_validation(true);

        let request = config.plan_request(4);
        assert_eq!(request, PlanRequest::new(10, 4, 2, 3).with_target_fraction(0.25));
        assert!(config.validation.strict);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(PipelineConfig::new().with_record_count(0).validate().is_err());
        assert!(PipelineConfig::new().with_target_fraction(-0.1).validate().is_err());
    }

    #[test]
    fn test_column_floor_above_record_count_rejected() {
        let err = PipelineConfig::new().with_record_count(5).validate().unwrap_err();
        assert!(matches!(err, LoomError::InvalidConfiguration(_)));
        assert!(err.to_string().contains("exceeds record count (5)"));

        let config = PipelineConfig::new().with_record_count(5).with_minimums(4, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"generation": {"record_count": 12}, "provider": {"kind": "openai_compatible"}}"#)
                .unwrap();
        assert_eq!(config.generation.record_count, 12);
        assert_eq!(config.generation.min_invalid_per_col, 10);
        assert_eq!(config.provider.kind, ProviderKind::OpenaiCompatible);
        assert_eq!(config.provider.model, "gemini-1.5-flash");
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("testloom.json");
        let config = PipelineConfig::new().with_minimums(1, 1);

        config.to_file(&path).unwrap();
        assert_eq!(PipelineConfig::from_file(&path).unwrap(), config);
    }
}
