use crate::{error::Result, models::ObjectAndRelation};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Set operation carried by an intermediate expansion node
///
/// `Unspecified` is the zero value of the wire enum and is never produced by a
/// valid dispatch layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetOperation {
    #[default]
    Unspecified,
    Union,
    Intersection,
    Exclusion,
}

impl fmt::Display for SetOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SetOperation::Unspecified => "unspecified",
            SetOperation::Union => "union",
            SetOperation::Intersection => "intersection",
            SetOperation::Exclusion => "exclusion",
        };
        f.write_str(name)
    }
}

/// Intermediate node: a set operation over child nodes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetOperationUserset {
    #[serde(default)]
    pub operation: SetOperation,
    #[serde(default)]
    pub child_nodes: Vec<RelationTupleTreeNode>,
}

/// Leaf node: the terminal subjects found for an expanded relation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectSubjects {
    #[serde(default)]
    pub subjects: Vec<ObjectAndRelation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Intermediate(SetOperationUserset),
    Leaf(DirectSubjects),
}

/// One node of a fully expanded permission tree, as produced by dispatch
///
/// `expanded` is the relation edge actually traversed to reach this node.
/// A node without a `node_type` is malformed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationTupleTreeNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<NodeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanded: Option<ObjectAndRelation>,
}

impl RelationTupleTreeNode {
    pub fn intermediate(
        operation: SetOperation,
        expanded: Option<ObjectAndRelation>,
        child_nodes: Vec<RelationTupleTreeNode>,
    ) -> Self {
        Self {
            node_type: Some(NodeType::Intermediate(SetOperationUserset {
                operation,
                child_nodes,
            })),
            expanded,
        }
    }

    pub fn union(expanded: Option<ObjectAndRelation>, children: Vec<RelationTupleTreeNode>) -> Self {
        Self::intermediate(SetOperation::Union, expanded, children)
    }

    pub fn intersection(
        expanded: Option<ObjectAndRelation>,
        children: Vec<RelationTupleTreeNode>,
    ) -> Self {
        Self::intermediate(SetOperation::Intersection, expanded, children)
    }

    pub fn exclusion(
        expanded: Option<ObjectAndRelation>,
        children: Vec<RelationTupleTreeNode>,
    ) -> Self {
        Self::intermediate(SetOperation::Exclusion, expanded, children)
    }

    pub fn leaf(expanded: Option<ObjectAndRelation>, subjects: Vec<ObjectAndRelation>) -> Self {
        Self {
            node_type: Some(NodeType::Leaf(DirectSubjects { subjects })),
            expanded,
        }
    }

    /// Decodes a tree from its JSON form
    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Short description used in error messages and logs
    pub fn describe(&self) -> String {
        let kind = match &self.node_type {
            Some(NodeType::Intermediate(node)) => format!("{} node", node.operation),
            Some(NodeType::Leaf(leaf)) => format!("leaf with {} subject(s)", leaf.subjects.len()),
            None => "untyped node".to_string(),
        };
        match &self.expanded {
            Some(onr) => format!("{} expanded as {}", kind, onr),
            None => kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_tree_from_json() {
        let json = r#"{
            "expanded": {"namespace": "document", "object_id": "doc1", "relation": "viewer"},
            "node_type": {"intermediate": {
                "operation": "exclusion",
                "child_nodes": [
                    {"node_type": {"leaf": {"subjects": [
                        {"namespace": "user", "object_id": "alice", "relation": "..."}
                    ]}}},
                    {"node_type": {"leaf": {}}}
                ]
            }}
        }"#;

        let tree = RelationTupleTreeNode::from_json(json).unwrap();
        match tree.node_type {
            Some(NodeType::Intermediate(ref node)) => {
                assert_eq!(node.operation, SetOperation::Exclusion);
                assert_eq!(node.child_nodes.len(), 2);
            }
            other => panic!("expected intermediate node, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_operation_decodes_as_unspecified() {
        let json = r#"{"node_type": {"intermediate": {"child_nodes": []}}}"#;
        let tree: RelationTupleTreeNode = serde_json::from_str(json).unwrap();
        assert_eq!(
            tree.node_type,
            Some(NodeType::Intermediate(SetOperationUserset::default()))
        );
    }

    #[test]
    fn test_from_json_reports_serialization_error() {
        let err = RelationTupleTreeNode::from_json("{\"node_type\": 42}").unwrap_err();
        assert!(matches!(err, crate::ZanzibarError::Serialization(_)));
        assert!(!err.is_internal());
    }

    #[test]
    fn test_describe() {
        let viewer = ObjectAndRelation::new("document", "doc1", "viewer");
        let node = RelationTupleTreeNode::union(Some(viewer), vec![]);
        assert_eq!(node.describe(), "union node expanded as document:doc1#viewer");
        assert_eq!(RelationTupleTreeNode::default().describe(), "untyped node");
    }
}
