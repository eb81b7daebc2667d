//! Field-level merge policy for the upsert engine.
//!
//! Repeated pipeline runs for the same job id must converge instead of
//! duplicating or clobbering data: a merge never drops a field present in
//! the stored record but absent from the new run, except the keys the new
//! run explicitly recomputes. The policy is an explicit per-field table so
//! the invariant stays auditable.

use chrono::Utc;
use indexmap::IndexMap;

use crate::types::record::StoredRecord;

/// How one top-level field of [`StoredRecord`] behaves on merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Never changed by an update (`id`, `created_at`)
    Immutable,

    /// New value wins when the new run produced one; the stored value is
    /// preserved when it did not
    Replace,

    /// Merged key-by-key: new keys win on conflict, stored keys absent from
    /// the new run are preserved
    MergeMap,

    /// Always set to the merge time (`updated_at`)
    Refresh,
}

/// The merge policy for every serialized field of [`StoredRecord`].
pub const FIELD_POLICIES: &[(&str, MergePolicy)] = &[
    ("id", MergePolicy::Immutable),
    ("url", MergePolicy::Replace),
    ("status", MergePolicy::Replace),
    ("domain", MergePolicy::Replace),
    ("sub_domain", MergePolicy::Replace),
    ("role", MergePolicy::Replace),
    ("experience_level", MergePolicy::Replace),
    ("extracted_dimensions", MergePolicy::MergeMap),
    ("quality_metrics", MergePolicy::Replace),
    ("entities", MergePolicy::Replace),
    ("created_at", MergePolicy::Immutable),
    ("updated_at", MergePolicy::Refresh),
    ("extraction_metadata", MergePolicy::MergeMap),
];

/// Merge a new extraction into the stored record under [`FIELD_POLICIES`].
pub fn merge_records(existing: StoredRecord, incoming: StoredRecord) -> StoredRecord {
    StoredRecord {
        // Immutable
        id: existing.id,
        created_at: existing.created_at,

        // Replace: the new run always carries these
        url: incoming.url,
        status: incoming.status,

        // Replace: preserved when the new run produced nothing
        domain: incoming.domain.or(existing.domain),
        sub_domain: incoming.sub_domain.or(existing.sub_domain),
        role: incoming.role.or(existing.role),
        experience_level: incoming.experience_level.or(existing.experience_level),
        quality_metrics: incoming.quality_metrics.or(existing.quality_metrics),
        entities: if incoming.entities.is_empty() {
            existing.entities
        } else {
            incoming.entities
        },

        // MergeMap
        extracted_dimensions: merge_maps(existing.extracted_dimensions, incoming.extracted_dimensions),
        extraction_metadata: merge_maps(existing.extraction_metadata, incoming.extraction_metadata),

        // Refresh
        updated_at: Utc::now(),
    }
}

/// Key-by-key merge: new keys win, old keys are preserved.
fn merge_maps<V>(existing: IndexMap<String, V>, incoming: IndexMap<String, V>) -> IndexMap<String, V> {
    let mut merged = existing;
    for (key, value) in incoming {
        merged.insert(key, value);
    }
    merged
}
