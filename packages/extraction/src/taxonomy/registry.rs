//! The configuration registry.
//!
//! Loads every domain taxonomy eagerly, validates structurally, and serves
//! read-only lookups afterwards. Constructed once and injected into the
//! pipeline; safe to share across runs.

use std::path::Path;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::taxonomy::types::{DomainTaxonomy, QualityThresholds, RoleConfig};

/// File name for the optional global thresholds definition.
const THRESHOLDS_FILE: &str = "thresholds.json";

/// Eagerly loaded, validated taxonomy lookups plus global quality gates.
#[derive(Debug)]
pub struct TaxonomyRegistry {
    domains: IndexMap<String, DomainTaxonomy>,
    thresholds: QualityThresholds,
}

impl TaxonomyRegistry {
    /// Load every `<domain>.json` in a directory, keyed by file stem.
    ///
    /// An optional `thresholds.json` in the same directory overrides the
    /// default quality gates. Validation failures are fatal: the pipeline
    /// cannot safely classify against a malformed taxonomy.
    pub fn load_dir(dir: impl AsRef<Path>) -> ConfigResult<Self> {
        let dir = dir.as_ref();
        let mut domains = IndexMap::new();
        let mut thresholds = QualityThresholds::default();

        let entries = std::fs::read_dir(dir).map_err(|source| ConfigError::Io {
            path: dir.display().to_string(),
            source,
        })?;

        let mut paths: Vec<_> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        for path in paths {
            let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;

            if path.file_name().is_some_and(|n| n == THRESHOLDS_FILE) {
                thresholds =
                    serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                        path: path.display().to_string(),
                        source,
                    })?;
                continue;
            }

            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();

            let taxonomy: DomainTaxonomy =
                serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                    path: path.display().to_string(),
                    source,
                })?;

            debug!(domain = %name, path = %path.display(), "Loaded domain taxonomy");
            domains.insert(name, taxonomy);
        }

        let registry = Self::from_domains(domains)?.with_thresholds(thresholds);
        info!(domains = registry.domains.len(), "Taxonomy registry ready");
        Ok(registry)
    }

    /// Build from already-parsed domain taxonomies, validating each.
    pub fn from_domains(
        domains: impl IntoIterator<Item = (String, DomainTaxonomy)>,
    ) -> ConfigResult<Self> {
        let domains: IndexMap<String, DomainTaxonomy> = domains.into_iter().collect();

        for (name, taxonomy) in &domains {
            validate_domain(name, taxonomy)?;
        }

        Ok(Self {
            domains,
            thresholds: QualityThresholds::default(),
        })
    }

    /// Override the global quality thresholds.
    pub fn with_thresholds(mut self, thresholds: QualityThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Look up one domain taxonomy.
    pub fn domain(&self, name: &str) -> ConfigResult<&DomainTaxonomy> {
        self.domains.get(name).ok_or_else(|| ConfigError::NotFound {
            domain: name.to_string(),
        })
    }

    /// All loaded domains, in load order.
    pub fn domains(&self) -> impl Iterator<Item = (&str, &DomainTaxonomy)> {
        self.domains.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of loaded domains.
    pub fn domain_count(&self) -> usize {
        self.domains.len()
    }

    /// Global quality gates.
    pub fn thresholds(&self) -> QualityThresholds {
        self.thresholds
    }

    /// Resolve a full (domain, sub_domain, role) path, if it exists.
    pub fn resolve_role(&self, domain: &str, sub_domain: &str, role: &str) -> Option<&RoleConfig> {
        self.domains
            .get(domain)?
            .sub_domains
            .get(sub_domain)?
            .roles
            .get(role)
    }
}

/// Structural validation of one domain taxonomy.
fn validate_domain(domain: &str, taxonomy: &DomainTaxonomy) -> ConfigResult<()> {
    let invalid = |reason: String| ConfigError::Invalid {
        domain: domain.to_string(),
        reason,
    };

    if taxonomy.sub_domains.is_empty() {
        return Err(invalid("no sub-domains defined".into()));
    }

    for (sub_name, sub) in &taxonomy.sub_domains {
        if sub.roles.is_empty() {
            return Err(invalid(format!("sub-domain {sub_name} defines no roles")));
        }

        for (role_name, role) in &sub.roles {
            if role.experience_levels.is_empty() {
                return Err(invalid(format!(
                    "role {sub_name}/{role_name} declares no experience levels"
                )));
            }

            for level_name in role.experience_levels.keys() {
                let dims = role
                    .dimensions_for(level_name)
                    .expect("level name comes from the map");

                if dims.is_empty() {
                    return Err(invalid(format!(
                        "role {sub_name}/{role_name} level {level_name} resolves to an empty dimension set"
                    )));
                }

                for (dim_name, dim) in dims {
                    if !(0.0..=1.0).contains(&dim.confidence_threshold) {
                        return Err(invalid(format!(
                            "dimension {dim_name} threshold {} outside [0, 1]",
                            dim.confidence_threshold
                        )));
                    }
                    if dim.extraction_prompt.trim().is_empty() {
                        return Err(invalid(format!(
                            "dimension {dim_name} has an empty extraction prompt"
                        )));
                    }
                }

                let required = dims.values().filter(|d| d.required).count();
                let declared = role.experience_levels[level_name].required_count;
                if declared != required {
                    return Err(invalid(format!(
                        "level {level_name} declares {declared} required dimensions but resolves {required}"
                    )));
                }
            }
        }
    }

    Ok(())
}
