//! Component tree assembly by repeated filtering.
//!
//! There is no materialised graph. The forest answers two queries over the
//! flat record list, "roots" and "children of X", and callers walk the tree by
//! re-querying from each root. Anything whose parent chain never reaches a
//! root is simply never visited, which is how orphans (and parent cycles)
//! disappear without special handling.
//!
//! Each `children_of` call re-scans the whole list, so a full walk costs
//! O(n × depth). Responses carry tens of nodes; the simplicity is worth it.
//!
//! Duplicate ids are tolerated: every duplicate is rendered, but children
//! hang only off the first record bearing an id, so no record ever appears
//! under two parents.

use std::collections::HashSet;

use crate::record::ComponentRecord;

/// Read-only query view over one batch of records.
#[derive(Debug, Clone, Copy)]
pub struct ComponentForest<'a> {
    records: &'a [ComponentRecord],
}

/// A record with its (re-queried) descendants.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode<'a> {
    pub record: &'a ComponentRecord,
    pub children: Vec<TreeNode<'a>>,
}

impl TreeNode<'_> {
    /// Number of records in this subtree, including this one.
    #[must_use]
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TreeNode::size).sum::<usize>()
    }
}

impl<'a> ComponentForest<'a> {
    #[must_use]
    pub fn new(records: &'a [ComponentRecord]) -> Self {
        Self { records }
    }

    #[must_use]
    pub fn records(&self) -> &'a [ComponentRecord] {
        self.records
    }

    /// Records without a parent, in original order.
    #[must_use]
    pub fn roots(&self) -> Vec<&'a ComponentRecord> {
        self.records.iter().filter(|r| r.is_root()).collect()
    }

    /// Records whose `parentId` equals `parent_id`, in original order.
    #[must_use]
    pub fn children_of(&self, parent_id: &str) -> Vec<&'a ComponentRecord> {
        self.records
            .iter()
            .filter(|r| r.parent_id.as_deref() == Some(parent_id))
            .collect()
    }

    /// Whether `record` is the first record carrying its id.
    #[must_use]
    pub fn owns_id(&self, record: &ComponentRecord) -> bool {
        self.records
            .iter()
            .find(|candidate| candidate.id == record.id)
            .is_some_and(|first| std::ptr::eq(first, record))
    }

    /// Walk every root and its descendants.
    #[must_use]
    pub fn materialize(&self) -> Vec<TreeNode<'a>> {
        self.roots()
            .into_iter()
            .map(|root| self.subtree(root))
            .collect()
    }

    fn subtree(&self, record: &'a ComponentRecord) -> TreeNode<'a> {
        let children = if self.owns_id(record) {
            self.children_of(&record.id)
                .into_iter()
                .map(|child| self.subtree(child))
                .collect()
        } else {
            Vec::new()
        };
        TreeNode { record, children }
    }

    /// Ids that appear on more than one record, each listed once.
    #[must_use]
    pub fn duplicate_ids(&self) -> Vec<&'a str> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        let mut duplicates = Vec::new();
        for record in self.records {
            if !seen.insert(record.id.as_str()) && reported.insert(record.id.as_str()) {
                duplicates.push(record.id.as_str());
            }
        }
        duplicates
    }

    /// Records no walk from a root will ever visit.
    #[must_use]
    pub fn unreachable(&self) -> Vec<&'a ComponentRecord> {
        let mut visited: HashSet<*const ComponentRecord> = HashSet::new();
        fn mark(node: &TreeNode<'_>, visited: &mut HashSet<*const ComponentRecord>) {
            visited.insert(std::ptr::from_ref(node.record));
            for child in &node.children {
                mark(child, visited);
            }
        }
        for root in self.materialize() {
            mark(&root, &mut visited);
        }
        self.records
            .iter()
            .filter(|r| !visited.contains(&std::ptr::from_ref(*r)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, parent: Option<&str>) -> ComponentRecord {
        let record = ComponentRecord::new(id, "card");
        match parent {
            Some(parent) => record.parent(parent),
            None => record,
        }
    }

    #[test]
    fn children_keep_original_order() {
        let records = vec![
            record("root", None),
            record("b", Some("root")),
            record("a", Some("root")),
            record("c", Some("b")),
        ];
        let forest = ComponentForest::new(&records);
        let ids: Vec<&str> = forest
            .children_of("root")
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(forest.roots().len(), 1);
        assert_eq!(forest.materialize()[0].size(), 4);
    }

    #[test]
    fn orphans_and_cycles_are_unreachable() {
        let records = vec![
            record("root", None),
            record("orphan", Some("missing")),
            record("x", Some("y")),
            record("y", Some("x")),
            record("self", Some("self")),
        ];
        let forest = ComponentForest::new(&records);
        let tree = forest.materialize();
        assert_eq!(tree.len(), 1);
        assert!(tree[0].children.is_empty());
        let unreachable: Vec<&str> = forest.unreachable().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(unreachable, vec!["orphan", "x", "y", "self"]);
    }

    #[test]
    fn duplicate_ids_only_first_owns_children() {
        let records = vec![
            record("dup", None),
            record("dup", None),
            record("kid", Some("dup")),
        ];
        let forest = ComponentForest::new(&records);
        let tree = forest.materialize();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].children.len(), 1);
        assert!(tree[1].children.is_empty());
        assert_eq!(forest.duplicate_ids(), vec!["dup"]);
    }
}
