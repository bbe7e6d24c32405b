//! Objectives-tree flattening
//!
//! The remote tree is deeply nested and inconsistent about which field
//! carries children; consumers want a flat, globally addressable list.
//! Each node is annotated with the full ancestor path of display names so
//! a record is findable without walking the tree.

use crate::types::FlatRecord;
use eregulations_api::RawRecord;
use tracing::debug;

/// Separator between path segments in `full_path`
pub const PATH_SEPARATOR: &str = " > ";

/// The link relation marking a node as a directly fetchable procedure
const PROCEDURE_REL: &str = "procedure";

/// Flatten the nested objectives tree into a path-annotated list
///
/// Depth-first from each root. Nodes without a numeric id are skipped
/// with a log line; their well-formed siblings are unaffected. Both child
/// slots the service uses are recursed independently, since a node may
/// legitimately populate both. Ids are assumed globally unique by the
/// source, so no deduplication is performed; the result is sorted by
/// `full_path` for a stable, human-browsable ordering.
pub fn flatten(roots: &[RawRecord]) -> Vec<FlatRecord> {
    let mut out = Vec::new();
    for root in roots {
        walk(root, None, &mut out);
    }
    out.sort_by(|a, b| a.full_path.cmp(&b.full_path));
    out
}

fn walk(node: &RawRecord, parent_path: Option<&str>, out: &mut Vec<FlatRecord>) {
    let Some(id) = node.id else {
        debug!(name = %node.name, "Skipping tree node without a numeric id");
        return;
    };

    let full_path = match parent_path {
        Some(parent) => format!("{parent}{PATH_SEPARATOR}{}", node.name),
        None => node.name.clone(),
    };
    let is_leaf_resource = node.links.iter().any(|link| link.rel == PROCEDURE_REL);

    out.push(FlatRecord {
        id,
        name: node.name.clone(),
        full_path: full_path.clone(),
        parent_path: parent_path.map(str::to_string),
        is_leaf_resource,
    });

    for child in node.sub_menus.iter().chain(node.children.iter()) {
        walk(child, Some(&full_path), out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eregulations_api::RecordLink;

    fn node(id: Option<i64>, name: &str) -> RawRecord {
        RawRecord {
            id,
            name: name.to_string(),
            ..RawRecord::default()
        }
    }

    fn procedure_link() -> RecordLink {
        RecordLink {
            rel: "procedure".to_string(),
            href: Some("/Procedures/1".to_string()),
        }
    }

    #[test]
    fn test_three_level_path() {
        let mut b = node(Some(2), "B");
        let mut c = node(Some(3), "C");
        c.links.push(procedure_link());
        b.sub_menus.push(c);
        let mut a = node(Some(1), "A");
        a.sub_menus.push(b);

        let flat = flatten(&[a]);
        assert_eq!(flat.len(), 3);

        let c = flat.iter().find(|r| r.id == 3).unwrap();
        assert_eq!(c.full_path, "A > B > C");
        assert_eq!(c.parent_path.as_deref(), Some("A > B"));
        assert!(c.is_leaf_resource);

        let a = flat.iter().find(|r| r.id == 1).unwrap();
        assert_eq!(a.full_path, "A");
        assert_eq!(a.parent_path, None);
        assert!(!a.is_leaf_resource);
    }

    #[test]
    fn test_node_without_id_dropped_siblings_kept() {
        let mut root = node(Some(1), "Root");
        root.sub_menus.push(node(None, "Anonymous"));
        root.sub_menus.push(node(Some(2), "Kept"));

        let flat = flatten(&[root]);
        assert_eq!(flat.len(), 2);
        assert!(flat.iter().any(|r| r.id == 2 && r.full_path == "Root > Kept"));
        assert!(!flat.iter().any(|r| r.name == "Anonymous"));
    }

    #[test]
    fn test_both_child_slots_recursed() {
        let mut root = node(Some(1), "Root");
        root.sub_menus.push(node(Some(2), "FromSubMenus"));
        root.children.push(node(Some(3), "FromChilds"));

        let flat = flatten(&[root]);
        assert_eq!(flat.len(), 3);
        assert!(flat.iter().any(|r| r.full_path == "Root > FromSubMenus"));
        assert!(flat.iter().any(|r| r.full_path == "Root > FromChilds"));
    }

    #[test]
    fn test_leaf_only_with_procedure_rel() {
        let mut with_other_rel = node(Some(1), "Category");
        with_other_rel.links.push(RecordLink {
            rel: "self".to_string(),
            href: None,
        });
        let mut leaf = node(Some(2), "Leaf");
        leaf.links.push(procedure_link());

        let flat = flatten(&[with_other_rel, leaf]);
        assert!(!flat.iter().find(|r| r.id == 1).unwrap().is_leaf_resource);
        assert!(flat.iter().find(|r| r.id == 2).unwrap().is_leaf_resource);
    }

    #[test]
    fn test_output_sorted_by_full_path() {
        let mut root = node(Some(1), "M");
        root.sub_menus.push(node(Some(2), "Zebra"));
        root.sub_menus.push(node(Some(3), "Alpha"));
        let other = node(Some(4), "B");

        let flat = flatten(&[root, other]);
        let paths: Vec<&str> = flat.iter().map(|r| r.full_path.as_str()).collect();
        assert_eq!(paths, vec!["B", "M", "M > Alpha", "M > Zebra"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(flatten(&[]).is_empty());
    }
}
