//! Logical resource keys
//!
//! One key per logical unit of remote data. Two calls for the same
//! resource always collide on the same key; different parameters never do.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    /// The full flattened procedure list
    Procedures,
    Procedure(i64),
    ProcedureStep { procedure_id: i64, step_id: i64 },
    ProcedureResume(i64),
    ProcedureTotals(i64),
    Search(String),
}

impl ResourceKey {
    /// Build a search key; the keyword is normalized so trivially-equal
    /// queries share a cache entry
    pub fn search(keyword: &str) -> Self {
        Self::Search(keyword.trim().to_lowercase())
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Procedures => write!(f, "procedures"),
            Self::Procedure(id) => write!(f, "procedure:{id}"),
            Self::ProcedureStep {
                procedure_id,
                step_id,
            } => write!(f, "procedure:{procedure_id}:step:{step_id}"),
            Self::ProcedureResume(id) => write!(f, "procedure:{id}:resume"),
            Self::ProcedureTotals(id) => write!(f, "procedure:{id}:totals"),
            Self::Search(keyword) => write!(f, "search:{keyword}"),
        }
    }
}
