use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Relation used by subjects that refer to the object itself rather than a userset
pub const ELLIPSIS: &str = "...";

/// Identifies one endpoint of a relationship: `namespace:object_id#relation`
///
/// Used as an opaque key. Equality and hashing follow the canonical string
/// form returned by [`ObjectAndRelation::onr_string`]; the string form is never
/// parsed back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectAndRelation {
    pub namespace: String,
    pub object_id: String,
    pub relation: String,
}

impl ObjectAndRelation {
    pub fn new(namespace: &str, object_id: &str, relation: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            object_id: object_id.to_string(),
            relation: relation.to_string(),
        }
    }

    /// Subject pointing at the object itself (`namespace:object_id#...`)
    pub fn subject(namespace: &str, object_id: &str) -> Self {
        Self::new(namespace, object_id, ELLIPSIS)
    }

    /// Canonical string form, used as map key everywhere
    pub fn onr_string(&self) -> String {
        self.to_string()
    }
}

impl PartialEq for ObjectAndRelation {
    fn eq(&self, other: &Self) -> bool {
        self.onr_string() == other.onr_string()
    }
}

impl Eq for ObjectAndRelation {}

impl Hash for ObjectAndRelation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.onr_string().hash(state);
    }
}

impl fmt::Display for ObjectAndRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}#{}", self.namespace, self.object_id, self.relation)
    }
}

/// De-duplicating set of [`ObjectAndRelation`]s keyed by their canonical form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OnrSet {
    onrs: BTreeMap<String, ObjectAndRelation>,
}

impl OnrSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the ONR. Returns false if it was already present.
    pub fn add(&mut self, onr: &ObjectAndRelation) -> bool {
        let key = onr.onr_string();
        if self.onrs.contains_key(&key) {
            return false;
        }
        self.onrs.insert(key, onr.clone());
        true
    }

    pub fn has(&self, onr: &ObjectAndRelation) -> bool {
        self.onrs.contains_key(&onr.onr_string())
    }

    pub fn len(&self) -> usize {
        self.onrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.onrs.is_empty()
    }

    /// Returns a new set holding the members of both sets
    pub fn union(&self, other: &OnrSet) -> OnrSet {
        let mut merged = self.clone();
        for onr in other.iter() {
            merged.add(onr);
        }
        merged
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectAndRelation> {
        self.onrs.values()
    }

    /// Exports the set as a sequence
    pub fn as_vec(&self) -> Vec<ObjectAndRelation> {
        self.onrs.values().cloned().collect()
    }
}

impl FromIterator<ObjectAndRelation> for OnrSet {
    fn from_iter<I: IntoIterator<Item = ObjectAndRelation>>(iter: I) -> Self {
        let mut set = OnrSet::new();
        for onr in iter {
            set.add(&onr);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_onr_string_form() {
        let onr = ObjectAndRelation::new("document", "doc1", "viewer");
        assert_eq!(onr.onr_string(), "document:doc1#viewer");

        let subject = ObjectAndRelation::subject("user", "alice");
        assert_eq!(subject.onr_string(), "user:alice#...");
    }

    #[test]
    fn test_onr_set_deduplicates() {
        let mut set = OnrSet::new();
        let viewer = ObjectAndRelation::new("document", "doc1", "viewer");

        assert!(set.add(&viewer));
        assert!(!set.add(&viewer.clone()));
        assert_eq!(set.len(), 1);
        assert!(set.has(&viewer));
        assert!(!set.has(&ObjectAndRelation::new("document", "doc1", "editor")));
    }

    #[test]
    fn test_onr_set_union() {
        let viewer = ObjectAndRelation::new("document", "doc1", "viewer");
        let editor = ObjectAndRelation::new("document", "doc1", "editor");
        let owner = ObjectAndRelation::new("document", "doc1", "owner");

        let left: OnrSet = vec![viewer.clone(), editor.clone()].into_iter().collect();
        let right: OnrSet = vec![editor.clone(), owner.clone()].into_iter().collect();

        let merged = left.union(&right);
        assert_eq!(merged.len(), 3);
        assert!(merged.has(&viewer) && merged.has(&editor) && merged.has(&owner));
        // inputs untouched
        assert_eq!(left.len(), 2);
    }
}
