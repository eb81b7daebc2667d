//! Taxonomy configuration: the closed vocabulary and the registry serving it.

pub mod registry;
pub mod types;

pub use registry::TaxonomyRegistry;
pub use types::{
    DimensionConfig, DomainTaxonomy, LevelConfig, QualityThresholds, RoleConfig, SubDomainConfig,
};
