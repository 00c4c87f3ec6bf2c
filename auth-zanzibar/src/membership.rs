//! Membership sets built from fully expanded permission trees.
//!
//! This is a developer/introspection facility and should not be used on any
//! performance or security sensitive path. Intersection and exclusion nodes
//! are walked like unions: every subject on every branch is reported, together
//! with each relation edge through which it was reached.

use crate::{
    error::{Result, ZanzibarError},
    expand::{NodeType, RelationTupleTreeNode, SetOperation},
    models::{ObjectAndRelation, OnrSet},
};
use ahash::AHashMap;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::collections::hash_map::Entry;
use tracing::{debug, trace, warn};

/// The set of memberships for one or more ONRs, keyed by the ONR string form
#[derive(Debug, Default)]
pub struct MembershipSet {
    objects_and_relations: AHashMap<String, FoundSubjects>,
}

impl MembershipSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map from root ONR string to the subjects found for it
    pub fn subjects_by_onr(&self) -> &AHashMap<String, FoundSubjects> {
        &self.objects_and_relations
    }

    pub fn len(&self) -> usize {
        self.objects_and_relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects_and_relations.is_empty()
    }

    /// Adds the expansion of `onr` to the set.
    ///
    /// Returns `false` alongside the stored result if the ONR was already
    /// added; `expansion` is ignored in that case. The tree must be the fully
    /// recursive expansion and acyclic; its depth is bounded upstream by the
    /// schema, so no depth guard is applied here.
    ///
    /// # Errors
    ///
    /// Fails with an internal error if the tree contains an unknown set
    /// operation or an untyped node. Nothing is recorded for `onr` then.
    pub fn add_expansion(
        &mut self,
        onr: &ObjectAndRelation,
        expansion: &RelationTupleTreeNode,
    ) -> Result<(&FoundSubjects, bool)> {
        match self.objects_and_relations.entry(onr.onr_string()) {
            Entry::Occupied(existing) => {
                debug!(onr = %onr, "Expansion already present in membership set");
                Ok((&*existing.into_mut(), false))
            }
            Entry::Vacant(slot) => {
                let found = populate_found_subjects(onr, expansion)?;
                debug!(onr = %onr, subjects = found.len(), "Added expansion to membership set");
                Ok((&*slot.insert(found), true))
            }
        }
    }
}

/// Walks the tree with an explicit stack and collects every terminal subject.
fn populate_found_subjects(
    root: &ObjectAndRelation,
    tree: &RelationTupleTreeNode,
) -> Result<FoundSubjects> {
    let mut builder = FoundSubjectsBuilder::default();
    let mut stack = vec![tree];

    while let Some(node) = stack.pop() {
        let relationship = node.expanded.as_ref().unwrap_or(root);

        match &node.node_type {
            Some(NodeType::Intermediate(intermediate)) => match intermediate.operation {
                SetOperation::Union | SetOperation::Intersection | SetOperation::Exclusion => {
                    trace!(
                        operation = %intermediate.operation,
                        children = intermediate.child_nodes.len(),
                        "Visiting intermediate node"
                    );
                    // reversed so children are visited in declaration order
                    stack.extend(intermediate.child_nodes.iter().rev());
                }
                SetOperation::Unspecified => {
                    warn!(root = %root, node = %node.describe(), "Unknown expand operation");
                    return Err(ZanzibarError::UnknownSetOperation {
                        operation: intermediate.operation.to_string(),
                        node: node.describe(),
                    });
                }
            },
            Some(NodeType::Leaf(leaf)) => {
                for subject in &leaf.subjects {
                    builder.record(subject, relationship);
                }
            }
            None => {
                warn!(root = %root, node = %node.describe(), "Unknown tree node type");
                return Err(ZanzibarError::UnknownNodeType {
                    node: node.describe(),
                });
            }
        }
    }

    Ok(builder.freeze())
}

/// Walk-local accumulator, frozen into [`FoundSubjects`] once the walk succeeds
#[derive(Default)]
struct FoundSubjectsBuilder {
    subjects: AHashMap<String, FoundSubject>,
}

impl FoundSubjectsBuilder {
    fn record(&mut self, subject: &ObjectAndRelation, relationship: &ObjectAndRelation) {
        let found = self
            .subjects
            .entry(subject.onr_string())
            .or_insert_with(|| FoundSubject {
                subject: subject.clone(),
                relationships: OnrSet::new(),
            });
        found.relationships.add(relationship);
    }

    fn freeze(self) -> FoundSubjects {
        FoundSubjects {
            subjects: self.subjects,
        }
    }
}

/// The subjects found for a specific ONR
#[derive(Debug, Clone, Default)]
pub struct FoundSubjects {
    subjects: AHashMap<String, FoundSubject>,
}

impl FoundSubjects {
    /// All found subjects, in no particular order
    pub fn list_found(&self) -> Vec<&FoundSubject> {
        self.subjects.values().collect()
    }

    /// Returns the found subject matching `subject`, if any
    pub fn lookup_subject(&self, subject: &ObjectAndRelation) -> Option<&FoundSubject> {
        self.subjects.get(&subject.onr_string())
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

impl Serialize for FoundSubjects {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut found = self.list_found();
        found.sort_by_key(|f| f.subject.onr_string());
        found.serialize(serializer)
    }
}

/// A single found subject and every relationship through which it was found
#[derive(Debug, Clone)]
pub struct FoundSubject {
    subject: ObjectAndRelation,
    relationships: OnrSet,
}

impl FoundSubject {
    pub fn subject(&self) -> &ObjectAndRelation {
        &self.subject
    }

    pub fn relationships(&self) -> Vec<ObjectAndRelation> {
        self.relationships.as_vec()
    }
}

impl Serialize for FoundSubject {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FoundSubject", 2)?;
        state.serialize_field("subject", &self.subject.onr_string())?;
        let relationships: Vec<String> =
            self.relationships.iter().map(|onr| onr.onr_string()).collect();
        state.serialize_field("relationships", &relationships)?;
        state.end()
    }
}
