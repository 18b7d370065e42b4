//! Schema registry
//!
//! This module holds the declarative description of every extractable
//! object type (columns, identity, relation edges) and of the namespaces
//! the remap pass substitutes in. The ACI fabric declarations live in
//! [`aci`].

pub mod aci;
pub mod registry;

pub use registry::{
    ColumnSource, ColumnSpec, Derivation, NamespaceSpec, ReferenceForm, Registry, RelationKind,
    RelationSpec, TypeSpec, ValueSource,
};
