use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, StepsmithError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Project-level settings
    pub project: ProjectConfig,

    /// Existing-artifact registry scan settings
    pub registry: RegistryConfig,

    /// Reusability analysis thresholds
    pub analysis: AnalysisConfig,

    /// Artifact generation settings
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Directory of existing step-definition files to scan for reuse
    pub registry_dir: PathBuf,

    /// Output directory for generated artifacts
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Filename suffixes identifying step-definition files
    pub step_file_suffixes: Vec<String>,

    /// Maximum file size to scan (in bytes)
    pub max_file_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Similarity above which an existing step is reused verbatim
    pub exact_threshold: f64,

    /// Similarity above which an existing step is reused with review
    pub similar_threshold: f64,

    /// Similarity floor below which a candidate is irrelevant
    pub candidate_floor: f64,

    /// Maximum candidates kept per step, best-first
    pub max_candidates: usize,

    /// Minimum reusability score (0-100) for registry-informed generation;
    /// below this the renderer falls back to fully-custom stubs
    pub adaptive_floor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Tags applied to every generated feature
    pub base_tags: Vec<String>,

    /// Background steps emitted in every generated feature
    pub background_steps: Vec<String>,

    /// Actor names stripped when deriving method names from step text
    pub actor_names: Vec<String>,

    /// Title used when a requirement document has none
    pub default_title: String,

    /// Filename prefixes stripped when deriving the artifact base name
    pub strip_prefixes: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: ProjectConfig {
                name: "Unnamed Project".to_string(),
                registry_dir: PathBuf::from("SBS_Automation/steps"),
                output_dir: PathBuf::from("generated"),
            },
            registry: RegistryConfig {
                step_file_suffixes: vec!["-steps.js".to_string(), "-step.js".to_string()],
                max_file_size: 1024 * 1024, // 1MB
            },
            analysis: AnalysisConfig {
                exact_threshold: 0.95,
                similar_threshold: 0.8,
                candidate_floor: 0.7,
                max_candidates: 5,
                adaptive_floor: 30.0,
            },
            generation: GenerationConfig {
                base_tags: vec!["@Generated".to_string(), "@regression".to_string()],
                background_steps: vec![
                    "Given Alex is logged into the application".to_string(),
                    "And the homepage is displayed".to_string(),
                ],
                actor_names: vec![
                    "Alex".to_string(),
                    "the user".to_string(),
                    "user".to_string(),
                    "I".to_string(),
                ],
                default_title: "Untitled Requirement".to_string(),
                strip_prefixes: vec![
                    "story-".to_string(),
                    "jira-".to_string(),
                    "requirement-".to_string(),
                    "req-".to_string(),
                ],
            },
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| StepsmithError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| StepsmithError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Ok(Self::default())
                }
            }
            None => {
                // Try common config file locations
                let candidates = ["Stepsmith.toml", "stepsmith.toml", ".stepsmith.toml"];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds_match_business_rules() {
        let config = Config::default();
        assert_eq!(config.analysis.exact_threshold, 0.95);
        assert_eq!(config.analysis.similar_threshold, 0.8);
        assert_eq!(config.analysis.candidate_floor, 0.7);
        assert_eq!(config.analysis.max_candidates, 5);
        assert_eq!(config.analysis.adaptive_floor, 30.0);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.project.name, config.project.name);
        assert_eq!(
            parsed.registry.step_file_suffixes,
            config.registry.step_file_suffixes
        );
        assert_eq!(parsed.generation.base_tags, config.generation.base_tags);
    }
}
