//! Relation resolution shared by the closure engine and the projector

use crate::dn;
use crate::schema::{ColumnSource, ReferenceForm, Registry, RelationKind, RelationSpec, TypeSpec};
use crate::tree::TreeIndex;
use crate::types::{ConfigObject, ObjectId, ObjectKey};
use std::collections::HashMap;
use tracing::debug;

/// Outcome of following one relation edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(ObjectId),
    /// The reference names an object that is not in the tree
    Missing { reference: String },
}

type ReverseIndex = HashMap<ObjectId, Vec<ObjectId>>;

/// Resolves relations against one tree, caching reverse indexes and keys
pub struct Resolver<'a> {
    tree: &'a TreeIndex,
    registry: &'a Registry,
    /// (source class, via relation) -> target -> sources
    reverse: HashMap<(&'static str, &'static str), ReverseIndex>,
    keys: HashMap<ObjectId, ObjectKey>,
}

impl<'a> Resolver<'a> {
    pub fn new(tree: &'a TreeIndex, registry: &'a Registry) -> Self {
        Resolver {
            tree,
            registry,
            reverse: HashMap::new(),
            keys: HashMap::new(),
        }
    }

    pub fn tree(&self) -> &'a TreeIndex {
        self.tree
    }

    /// All targets of `relation` from `obj`, in discovery order
    pub fn resolve(&mut self, obj: &ConfigObject, relation: &RelationSpec) -> Vec<Resolution> {
        match &relation.kind {
            RelationKind::ReverseLookup { source, via } => {
                let index = self.reverse_index(*source, *via);
                index
                    .get(&obj.id)
                    .map(|sources| sources.iter().copied().map(Resolution::Found).collect())
                    .unwrap_or_default()
            }
            kind => resolve_direct(self.tree, obj, kind),
        }
    }

    /// Canonical key of an object; `None` for classes the registry does not know
    pub fn key(&mut self, id: ObjectId) -> Option<ObjectKey> {
        if let Some(key) = self.keys.get(&id) {
            return Some(key.clone());
        }
        let obj = self.tree.get(id)?;
        let spec = self.registry.spec_of(self.tree, obj)?;
        let key = key_of(self.tree, spec, obj);
        self.keys.insert(id, key.clone());
        Some(key)
    }

    fn reverse_index(&mut self, source: &'static str, via: &'static str) -> &ReverseIndex {
        let tree = self.tree;
        let registry = self.registry;
        self.reverse.entry((source, via)).or_insert_with(|| {
            let mut index = ReverseIndex::new();
            for candidate in tree.find(source, None) {
                let Some(forward) = registry
                    .spec_of(tree, candidate)
                    .and_then(|spec| spec.relation_named(via))
                else {
                    continue;
                };
                for resolution in resolve_direct(tree, candidate, &forward.kind) {
                    if let Resolution::Found(target) = resolution {
                        index.entry(target).or_default().push(candidate.id);
                    }
                }
            }
            debug!(source, via, targets = index.len(), "built reverse index");
            index
        })
    }
}

/// Key of `obj` from the primary-key columns of its type
///
/// Relation-sourced key columns are read from the target without any
/// closure check; an unresolved reference contributes the raw reference.
pub fn key_of(tree: &TreeIndex, spec: &TypeSpec, obj: &ConfigObject) -> ObjectKey {
    let parts = spec.key_columns().map(|column| match &column.source {
        ColumnSource::Value(value) => value.read(tree, obj).unwrap_or_default(),
        ColumnSource::Relation { relation, value, .. } => spec
            .relation_named(relation)
            .and_then(|rel| resolve_direct(tree, obj, &rel.kind).into_iter().next())
            .map(|resolution| match resolution {
                Resolution::Found(target) => tree
                    .get(target)
                    .and_then(|t| value.read(tree, t))
                    .unwrap_or_default(),
                Resolution::Missing { reference } => reference,
            })
            .unwrap_or_default(),
    });
    ObjectKey(parts.collect())
}

/// Child lookups and attribute references; reverse lookups resolve to nothing here
fn resolve_direct(tree: &TreeIndex, obj: &ConfigObject, kind: &RelationKind) -> Vec<Resolution> {
    match kind {
        RelationKind::ChildLookup { target } => tree
            .find(target, Some(obj.id))
            .map(|t| Resolution::Found(t.id))
            .collect(),
        RelationKind::AttributeReference {
            carrier,
            attribute,
            target,
            form,
        } => {
            let holders: Vec<&ConfigObject> = match carrier {
                None => vec![obj],
                Some(class) => tree.children_of(obj.id, class).collect(),
            };
            holders
                .into_iter()
                .filter_map(|holder| holder.attr(attribute))
                .map(|reference| resolve_reference(tree, obj, reference, *target, form))
                .collect()
        }
        RelationKind::ReverseLookup { .. } => Vec::new(),
    }
}

fn resolve_reference(
    tree: &TreeIndex,
    obj: &ConfigObject,
    reference: &str,
    target: Option<&str>,
    form: &ReferenceForm,
) -> Resolution {
    let accepts = |candidate: &ConfigObject| target.map_or(true, |class| candidate.class == class);

    let candidates = match form {
        ReferenceForm::Path => vec![reference.to_string()],
        ReferenceForm::Named {
            scope,
            rn_prefix,
            fallback,
        } => {
            let rn = format!("{}{}", rn_prefix, reference);
            let mut paths = Vec::with_capacity(2);
            if let Some(scope) = tree.ancestor_of_class(obj.id, scope) {
                paths.push(dn::join(&scope.path, &rn));
            }
            if let Some(fallback) = fallback {
                let path = dn::join(fallback, &rn);
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
            paths
        }
    };

    let found = candidates
        .iter()
        .filter_map(|path| tree.resolve(path))
        .find(|candidate| accepts(*candidate))
        .map(|candidate| candidate.id);

    match found {
        Some(id) => Resolution::Found(id),
        None => Resolution::Missing {
            reference: candidates
                .into_iter()
                .next()
                .unwrap_or_else(|| reference.to_string()),
        },
    }
}
