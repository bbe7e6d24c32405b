//! Data types for eRegulations API responses
//!
//! These structs mirror the remote payloads loosely. The service is
//! inconsistent about which field carries a node's children ("subMenus" on
//! some instances, "childs" on others, occasionally both), so `RawRecord`
//! keeps the known slots as independent fields and honors each of them.

use serde::{Deserialize, Serialize};

/// A relation link attached to a remote record
///
/// A `rel` of `"procedure"` marks the record as directly fetchable through
/// the procedure detail endpoint rather than a pure grouping node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordLink {
    pub rel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

/// One node of the nested objectives tree
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRecord {
    pub id: Option<i64>,
    pub name: String,
    /// Children under the "subMenus" convention
    pub sub_menus: Vec<RawRecord>,
    /// Children under the "childs" convention
    #[serde(alias = "childs")]
    pub children: Vec<RawRecord>,
    pub links: Vec<RecordLink>,
}

/// A lightweight record returned by keyword search
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub links: Vec<RecordLink>,
}

/// Outcome of defensively parsing a response body
///
/// A body that fails structural parsing is surfaced as data rather than an
/// error, so callers can tell "server returned garbage" apart from "server
/// is unreachable" without crashing.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Parsed(serde_json::Value),
    Malformed { length: usize },
}

impl ResponseBody {
    /// Deserialize a parsed body into `T`; `None` for malformed bodies or
    /// a shape mismatch
    pub fn decode<T: serde::de::DeserializeOwned>(self) -> Option<T> {
        match self {
            Self::Parsed(v) => serde_json::from_value(v).ok(),
            Self::Malformed { .. } => None,
        }
    }

    /// The observed byte length of a malformed body
    pub fn malformed_length(&self) -> Option<usize> {
        match self {
            Self::Malformed { length } => Some(*length),
            Self::Parsed(_) => None,
        }
    }

    /// Turn the body into a JSON value, mapping a malformed body to a
    /// sentinel object carrying the error tag and observed length
    pub fn into_value(self) -> serde_json::Value {
        match self {
            Self::Parsed(v) => v,
            Self::Malformed { length } => serde_json::json!({
                "error": "malformed_response",
                "length": length,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_record_with_sub_menus() {
        let json = r#"{
            "id": 1,
            "name": "Import",
            "subMenus": [{"id": 2, "name": "Permits"}]
        }"#;
        let record: RawRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, Some(1));
        assert_eq!(record.sub_menus.len(), 1);
        assert_eq!(record.sub_menus[0].name, "Permits");
        assert!(record.children.is_empty());
    }

    #[test]
    fn test_parse_record_with_childs_alias() {
        let json = r#"{"id": 1, "name": "Export", "childs": [{"id": 3, "name": "Coffee"}]}"#;
        let record: RawRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.children.len(), 1);
        assert_eq!(record.children[0].id, Some(3));
    }

    #[test]
    fn test_parse_record_with_both_child_slots() {
        let json = r#"{
            "id": 1,
            "name": "Trade",
            "subMenus": [{"id": 2, "name": "A"}],
            "childs": [{"id": 3, "name": "B"}]
        }"#;
        let record: RawRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.sub_menus.len(), 1);
        assert_eq!(record.children.len(), 1);
    }

    #[test]
    fn test_parse_record_without_id() {
        let record: RawRecord = serde_json::from_str(r#"{"name": "Orphan"}"#).unwrap();
        assert_eq!(record.id, None);
        assert_eq!(record.name, "Orphan");
    }

    #[test]
    fn test_parse_record_link_rel() {
        let json = r#"{
            "id": 7,
            "name": "Register a company",
            "links": [{"rel": "procedure", "href": "/Procedures/7"}]
        }"#;
        let record: RawRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.links[0].rel, "procedure");
        assert_eq!(record.links[0].href.as_deref(), Some("/Procedures/7"));
    }

    #[test]
    fn test_parse_search_hit_minimal() {
        let hit: SearchHit = serde_json::from_str(r#"{"id": 42, "name": "Import permit"}"#).unwrap();
        assert_eq!(hit.id, 42);
        assert!(hit.description.is_none());
        assert!(hit.links.is_empty());
    }

    #[test]
    fn test_decode_parsed_body() {
        let body = ResponseBody::Parsed(serde_json::json!([{"id": 1, "name": "n"}]));
        let records: Vec<RawRecord> = body.decode().unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_decode_malformed_body_is_none() {
        let body = ResponseBody::Malformed { length: 12 };
        assert!(body.clone().decode::<Vec<RawRecord>>().is_none());
        assert_eq!(body.malformed_length(), Some(12));
    }

    #[test]
    fn test_malformed_into_value_sentinel() {
        let value = ResponseBody::Malformed { length: 99 }.into_value();
        assert_eq!(value["error"], "malformed_response");
        assert_eq!(value["length"], 99);
    }
}
