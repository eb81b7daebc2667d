//! The closed domain -> sub-domain -> role -> experience-level -> dimension
//! hierarchy that constrains every classification and extraction output.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One structured field defined for a role/experience level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionConfig {
    /// Whether extraction must produce this field for the run to pass
    pub required: bool,

    /// Minimum confidence for the extracted value to count, in [0, 1]
    pub confidence_threshold: f32,

    /// Instruction handed to the completion service for this field
    pub extraction_prompt: String,
}

/// One experience level under a role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Declared number of required dimensions; validated against the
    /// resolved dimension set on load
    pub required_count: usize,

    /// Level-specific dimensions; falls back to the role default when absent
    #[serde(default)]
    pub dimensions: Option<IndexMap<String, DimensionConfig>>,
}

/// One role under a sub-domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Role-default dimension set, used by levels that declare none
    #[serde(default)]
    pub dimensions: IndexMap<String, DimensionConfig>,

    /// Closed set of experience levels, in declaration order
    pub experience_levels: IndexMap<String, LevelConfig>,
}

impl RoleConfig {
    /// Resolve the dimension set for a level: level-specific when declared,
    /// role default otherwise.
    pub fn dimensions_for(&self, level: &str) -> Option<&IndexMap<String, DimensionConfig>> {
        let level = self.experience_levels.get(level)?;
        Some(level.dimensions.as_ref().unwrap_or(&self.dimensions))
    }

    /// Declared level names in declaration order.
    pub fn level_names(&self) -> Vec<&str> {
        self.experience_levels.keys().map(|k| k.as_str()).collect()
    }

    /// First declared level, the detector's last-resort default.
    pub fn default_level(&self) -> Option<&str> {
        self.experience_levels.keys().next().map(|k| k.as_str())
    }
}

/// One sub-domain under a domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubDomainConfig {
    pub roles: IndexMap<String, RoleConfig>,
}

/// A full domain taxonomy, loaded from one JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainTaxonomy {
    pub sub_domains: IndexMap<String, SubDomainConfig>,
}

/// Global quality gates, overridable per run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QualityThresholds {
    /// Minimum combined quality score
    pub quality: f32,

    /// Minimum completeness score
    pub completeness: f32,

    /// Default confidence threshold for dimensions
    pub confidence: f32,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            quality: 0.7,
            completeness: 0.6,
            confidence: 0.7,
        }
    }
}
