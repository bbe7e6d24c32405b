//! Client-facing types

use serde::{Deserialize, Serialize};

/// One denormalized node from the flattened objectives tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlatRecord {
    pub id: i64,
    pub name: String,
    /// `" > "`-joined ancestor chain ending in `name`
    pub full_path: String,
    /// The parent's `full_path`, `None` at a root
    pub parent_path: Option<String>,
    /// True when the node links directly to a fetchable procedure rather
    /// than grouping other nodes
    pub is_leaf_resource: bool,
}

/// Procedure detail enriched with derived convenience links
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureDetail {
    pub id: i64,
    /// The raw detail payload as returned by the service (or the
    /// malformed-body sentinel if the body failed to parse)
    pub data: serde_json::Value,
    pub resume_url: String,
    pub totals_url: String,
    pub steps_base_url: String,
}
