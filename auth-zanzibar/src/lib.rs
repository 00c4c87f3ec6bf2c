//! Zanzibar-style relationship primitives and membership introspection
//!
//! This crate provides:
//! - Object-and-relation identifiers (ONRs) and de-duplicating ONR sets
//! - The expansion tree shape produced by the dispatch layer
//! - Membership sets: every subject reachable in an expansion tree, together
//!   with the relationship edges that justify it
//!
//! # Core Concepts
//!
//! - **ONR**: `namespace:object_id#relation`, the key for either end of a relationship
//! - **Expansion tree**: intermediate (set operation) and leaf (terminal subjects) nodes
//! - **Found subject**: a terminal subject plus every relationship through which it was reached
//!
//! # Example
//!
//! ```rust
//! use auth_zanzibar::{MembershipSet, ObjectAndRelation, RelationTupleTreeNode};
//!
//! let viewer = ObjectAndRelation::new("document", "doc1", "viewer");
//! let editor = ObjectAndRelation::new("document", "doc1", "editor");
//! let alice = ObjectAndRelation::subject("user", "alice");
//!
//! let tree = RelationTupleTreeNode::union(
//!     Some(viewer.clone()),
//!     vec![
//!         RelationTupleTreeNode::leaf(Some(viewer.clone()), vec![alice.clone()]),
//!         RelationTupleTreeNode::leaf(Some(editor.clone()), vec![alice.clone()]),
//!     ],
//! );
//!
//! let mut memberships = MembershipSet::new();
//! let (found, added) = memberships.add_expansion(&viewer, &tree)?;
//! assert!(added);
//! assert_eq!(found.lookup_subject(&alice).map(|f| f.relationships().len()), Some(2));
//! # Ok::<(), auth_zanzibar::ZanzibarError>(())
//! ```

pub mod models;
pub mod expand;
pub mod membership;
pub mod error;

pub use models::*;
pub use expand::*;
pub use membership::*;
pub use error::*;
