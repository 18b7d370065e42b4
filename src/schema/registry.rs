//! Declarative schema registry
//!
//! Every extractable object type is described once: its table, its ordered
//! columns, the columns forming its identity, and the relation edges it
//! exposes. The closure engine and the projector consult these declarations
//! generically, so adding a type is a data entry rather than a code path.

use crate::error::ClosureError;
use crate::tree::TreeIndex;
use crate::types::{Column, ConfigObject, Table};
use std::collections::{HashMap, HashSet};

/// Value derived from an object's path
pub type PathFn = fn(&str) -> Option<String>;

/// Rewrite of a raw attribute value
pub type ValueFn = fn(&str) -> String;

/// Where a plain (non-relation) value comes from
#[derive(Debug, Clone)]
pub enum ValueSource {
    /// Attribute of the object itself
    Attribute {
        name: &'static str,
        default: Option<&'static str>,
        transform: Option<ValueFn>,
    },
    /// Attribute of the first direct child of the given class, optionally
    /// restricted to children where `filter.0` equals `filter.1`
    ChildAttribute {
        class: &'static str,
        name: &'static str,
        filter: Option<(&'static str, &'static str)>,
        default: Option<&'static str>,
        transform: Option<ValueFn>,
    },
    /// Function of the object's path
    Derived(PathFn),
}

impl ValueSource {
    pub fn attribute(name: &'static str) -> Self {
        ValueSource::Attribute {
            name,
            default: None,
            transform: None,
        }
    }

    /// Read this value from `obj`; `None` when unset and no default applies
    pub fn read(&self, tree: &TreeIndex, obj: &ConfigObject) -> Option<String> {
        match self {
            ValueSource::Attribute { name, default, transform } => {
                let raw = obj.attr(name).or(*default)?;
                Some(transformed(raw, *transform))
            }
            ValueSource::ChildAttribute { class, name, filter, default, transform } => {
                let raw = tree
                    .children_of(obj.id, class)
                    .filter(|child| filter.map_or(true, |(attr, value)| child.attr(attr) == Some(value)))
                    .find_map(|child| child.attr(name))
                    .or(*default)?;
                Some(transformed(raw, *transform))
            }
            ValueSource::Derived(derive) => derive(&obj.path),
        }
    }

    fn set_default(&mut self, value: &'static str) {
        match self {
            ValueSource::Attribute { default, .. } | ValueSource::ChildAttribute { default, .. } => {
                *default = Some(value)
            }
            ValueSource::Derived(_) => {}
        }
    }

    fn set_transform(&mut self, f: ValueFn) {
        match self {
            ValueSource::Attribute { transform, .. }
            | ValueSource::ChildAttribute { transform, .. } => *transform = Some(f),
            ValueSource::Derived(_) => {}
        }
    }
}

fn transformed(raw: &str, transform: Option<ValueFn>) -> String {
    match transform {
        Some(f) => f(raw),
        None => raw.to_string(),
    }
}

/// Where a column's value comes from
#[derive(Debug, Clone)]
pub enum ColumnSource {
    Value(ValueSource),
    /// Value read from the object reached through `relation`. The related
    /// object must be in the closure for the row to be emitted.
    Relation {
        relation: &'static str,
        value: ValueSource,
        /// Drop the row when the relation does not resolve at all
        required: bool,
    },
}

/// One column of a table
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub source: ColumnSource,
    pub namespace: Option<&'static str>,
}

impl ColumnSpec {
    pub fn attribute(name: &'static str, attribute: &'static str) -> Self {
        ColumnSpec {
            name,
            source: ColumnSource::Value(ValueSource::attribute(attribute)),
            namespace: None,
        }
    }

    pub fn child_attribute(name: &'static str, class: &'static str, attribute: &'static str) -> Self {
        ColumnSpec {
            name,
            source: ColumnSource::Value(ValueSource::ChildAttribute {
                class,
                name: attribute,
                filter: None,
                default: None,
                transform: None,
            }),
            namespace: None,
        }
    }

    pub fn derived(name: &'static str, derive: PathFn) -> Self {
        ColumnSpec {
            name,
            source: ColumnSource::Value(ValueSource::Derived(derive)),
            namespace: None,
        }
    }

    /// Attribute of the object reached through `relation`
    pub fn related(name: &'static str, relation: &'static str, attribute: &'static str) -> Self {
        Self::related_value(name, relation, ValueSource::attribute(attribute))
    }

    pub fn related_value(name: &'static str, relation: &'static str, value: ValueSource) -> Self {
        ColumnSpec {
            name,
            source: ColumnSource::Relation {
                relation,
                value,
                required: false,
            },
            namespace: None,
        }
    }

    pub fn namespace(mut self, namespace: &'static str) -> Self {
        self.namespace = Some(namespace);
        self
    }

    pub fn default_value(mut self, value: &'static str) -> Self {
        self.value_source_mut().set_default(value);
        self
    }

    pub fn map(mut self, f: ValueFn) -> Self {
        self.value_source_mut().set_transform(f);
        self
    }

    /// Only read children whose `attribute` equals `value`
    pub fn when(mut self, attribute: &'static str, value: &'static str) -> Self {
        if let ValueSource::ChildAttribute { filter, .. } = self.value_source_mut() {
            *filter = Some((attribute, value));
        }
        self
    }

    pub fn required(mut self) -> Self {
        if let ColumnSource::Relation { required, .. } = &mut self.source {
            *required = true;
        }
        self
    }

    pub fn is_relation(&self) -> bool {
        matches!(self.source, ColumnSource::Relation { .. })
    }

    fn value_source_mut(&mut self) -> &mut ValueSource {
        match &mut self.source {
            ColumnSource::Value(value) | ColumnSource::Relation { value, .. } => value,
        }
    }
}

/// How an attribute reference encodes its target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceForm {
    /// The attribute holds the target's full path
    Path,
    /// The attribute holds a name, resolved as `<scope path>/<rn_prefix><name>`
    /// where the scope is the nearest ancestor of class `scope`, then as
    /// `<fallback>/<rn_prefix><name>`
    Named {
        scope: &'static str,
        rn_prefix: &'static str,
        fallback: Option<&'static str>,
    },
}

/// Resolution rule of a relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationKind {
    /// Descendants of the object with the given class
    ChildLookup { target: &'static str },
    /// An attribute of the object, or of its `carrier` children, points at
    /// the target
    AttributeReference {
        carrier: Option<&'static str>,
        attribute: &'static str,
        target: Option<&'static str>,
        form: ReferenceForm,
    },
    /// Objects of class `source` whose relation `via` resolves to this object
    ReverseLookup {
        source: &'static str,
        via: &'static str,
    },
}

/// A relation edge exposed by a type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSpec {
    pub name: &'static str,
    pub kind: RelationKind,
    /// Followed by the closure; lookup-only relations are resolved during
    /// projection only
    pub traverse: bool,
}

impl RelationSpec {
    pub fn children(name: &'static str, target: &'static str) -> Self {
        RelationSpec {
            name,
            kind: RelationKind::ChildLookup { target },
            traverse: true,
        }
    }

    /// Reference through a full path held in `attribute`
    pub fn reference(name: &'static str, attribute: &'static str) -> Self {
        RelationSpec {
            name,
            kind: RelationKind::AttributeReference {
                carrier: None,
                attribute,
                target: None,
                form: ReferenceForm::Path,
            },
            traverse: true,
        }
    }

    pub fn reverse(name: &'static str, source: &'static str, via: &'static str) -> Self {
        RelationSpec {
            name,
            kind: RelationKind::ReverseLookup { source, via },
            traverse: true,
        }
    }

    /// Read the reference from children of class `carrier`
    pub fn via(mut self, carrier_class: &'static str) -> Self {
        if let RelationKind::AttributeReference { carrier, .. } = &mut self.kind {
            *carrier = Some(carrier_class);
        }
        self
    }

    /// Only accept targets of this class
    pub fn to(mut self, class: &'static str) -> Self {
        if let RelationKind::AttributeReference { target, .. } = &mut self.kind {
            *target = Some(class);
        }
        self
    }

    /// Resolve the referenced name inside the nearest `scope` ancestor
    pub fn named_in(mut self, scope: &'static str, rn_prefix: &'static str) -> Self {
        if let RelationKind::AttributeReference { form, .. } = &mut self.kind {
            *form = ReferenceForm::Named {
                scope,
                rn_prefix,
                fallback: None,
            };
        }
        self
    }

    /// Second scope tried when the name is not found in the first one
    pub fn fallback(mut self, path: &'static str) -> Self {
        if let RelationKind::AttributeReference {
            form: ReferenceForm::Named { fallback, .. },
            ..
        } = &mut self.kind
        {
            *fallback = Some(path);
        }
        self
    }

    pub fn lookup_only(mut self) -> Self {
        self.traverse = false;
        self
    }
}

/// Declaration of one extractable object type
///
/// A class normally maps to one type. When the same class means different
/// things under different parents (a BGP peer under a routed path or under
/// a floating SVI), each meaning is declared with [`TypeSpec::within`].
#[derive(Debug, Clone)]
pub struct TypeSpec {
    pub class: &'static str,
    /// Further classes projected into the same table
    pub also: Vec<&'static str>,
    /// Only objects whose parent has this class
    pub within: Option<&'static str>,
    pub table: &'static str,
    pub columns: Vec<ColumnSpec>,
    pub primary_key: Vec<&'static str>,
    pub relations: Vec<RelationSpec>,
}

impl TypeSpec {
    pub fn new(class: &'static str, table: &'static str) -> Self {
        TypeSpec {
            class,
            also: Vec::new(),
            within: None,
            table,
            columns: Vec::new(),
            primary_key: Vec::new(),
            relations: Vec::new(),
        }
    }

    pub fn also(mut self, class: &'static str) -> Self {
        self.also.push(class);
        self
    }

    pub fn within(mut self, parent_class: &'static str) -> Self {
        self.within = Some(parent_class);
        self
    }

    /// Every class whose objects land in this table
    pub fn classes(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.class).chain(self.also.iter().copied())
    }

    pub fn declares(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    /// Whether `obj` is described by this declaration
    pub fn applies_to(&self, tree: &TreeIndex, obj: &ConfigObject) -> bool {
        self.declares(&obj.class) && self.within.map_or(true, |parent| parent_class_is(tree, obj, parent))
    }

    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    pub fn key(mut self, columns: &[&'static str]) -> Self {
        self.primary_key = columns.to_vec();
        self
    }

    pub fn relation(mut self, relation: RelationSpec) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn relation_named(&self, name: &str) -> Option<&RelationSpec> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn column_named(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Primary-key columns, in key order
    pub fn key_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.primary_key
            .iter()
            .filter_map(move |name| self.column_named(name))
    }

    pub fn layout(&self) -> Vec<Column> {
        self.columns
            .iter()
            .map(|c| Column {
                name: c.name.to_string(),
                namespace: c.namespace.map(str::to_string),
            })
            .collect()
    }

    pub fn key_indexes(&self) -> Vec<usize> {
        self.primary_key
            .iter()
            .filter_map(|name| self.columns.iter().position(|c| c.name == *name))
            .collect()
    }

    /// A table with this type's layout and no rows
    pub fn empty_table(&self) -> Table {
        Table::new(self.table, self.layout(), self.key_indexes())
    }
}

fn parent_class_is(tree: &TreeIndex, obj: &ConfigObject, class: &str) -> bool {
    tree.parent(obj.id).map_or(false, |parent| parent.class == class)
}

/// Default value of a namespace derived from a parent namespace's value
///
/// `base(old_parent) + suffix -> base(new_parent) + suffix`, where `base`
/// strips `strip_suffix` when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
    pub from: &'static str,
    pub strip_suffix: &'static str,
    pub suffix: &'static str,
}

impl Derivation {
    pub fn derive(&self, parent_value: &str) -> String {
        let base = parent_value
            .strip_suffix(self.strip_suffix)
            .filter(|base| !base.is_empty())
            .unwrap_or(parent_value);
        format!("{}{}", base, self.suffix)
    }
}

/// An identifier domain subject to substitution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceSpec {
    pub name: &'static str,
    /// Distinct values must stay distinct after substitution
    pub unique: bool,
    pub derivation: Option<Derivation>,
}

impl NamespaceSpec {
    pub fn unique(name: &'static str) -> Self {
        NamespaceSpec {
            name,
            unique: true,
            derivation: None,
        }
    }

    pub fn shared(name: &'static str) -> Self {
        NamespaceSpec {
            name,
            unique: false,
            derivation: None,
        }
    }

    pub fn derived_from(
        mut self,
        from: &'static str,
        strip_suffix: &'static str,
        suffix: &'static str,
    ) -> Self {
        self.derivation = Some(Derivation {
            from,
            strip_suffix,
            suffix,
        });
        self
    }
}

/// The full set of type and namespace declarations
#[derive(Debug, Clone, Default)]
pub struct Registry {
    types: Vec<TypeSpec>,
    namespaces: Vec<NamespaceSpec>,
    by_class: HashMap<&'static str, Vec<usize>>,
    by_table: HashMap<&'static str, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, spec: TypeSpec) -> Self {
        let idx = self.types.len();
        for class in spec.classes() {
            self.by_class.entry(class).or_default().push(idx);
        }
        // first declaration wins; validate() reports the duplicate
        self.by_table.entry(spec.table).or_insert(idx);
        self.types.push(spec);
        self
    }

    pub fn with_namespace(mut self, namespace: NamespaceSpec) -> Self {
        self.namespaces.push(namespace);
        self
    }

    /// First declaration of a class
    pub fn type_spec(&self, class: &str) -> Option<&TypeSpec> {
        self.specs_for_class(class).next()
    }

    /// Every declaration of a class, in registry order
    pub fn specs_for_class<'s>(&'s self, class: &str) -> impl Iterator<Item = &'s TypeSpec> + 's {
        self.by_class
            .get(class)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.types[idx])
    }

    /// The declaration describing `obj`: one scoped to its parent's class
    /// if there is one, else the unscoped declaration of its class
    pub fn spec_of(&self, tree: &TreeIndex, obj: &ConfigObject) -> Option<&TypeSpec> {
        let mut fallback = None;
        for spec in self.specs_for_class(&obj.class) {
            match spec.within {
                Some(parent) if parent_class_is(tree, obj, parent) => return Some(spec),
                Some(_) => {}
                None => fallback = fallback.or(Some(spec)),
            }
        }
        fallback
    }

    pub fn table(&self, table: &str) -> Option<&TypeSpec> {
        self.by_table.get(table).map(|&idx| &self.types[idx])
    }

    pub fn types(&self) -> &[TypeSpec] {
        &self.types
    }

    pub fn namespace(&self, name: &str) -> Option<&NamespaceSpec> {
        self.namespaces.iter().find(|n| n.name == name)
    }

    pub fn namespaces(&self) -> &[NamespaceSpec] {
        &self.namespaces
    }

    /// Check that every declaration refers to things that exist and that
    /// reverse lookups can converge
    pub fn validate(&self) -> Result<(), ClosureError> {
        let invalid = |class: &str, detail: String| ClosureError::InvalidDeclaration {
            class: class.to_string(),
            detail,
        };

        let mut classes = HashSet::new();
        let mut tables = HashSet::new();
        for spec in &self.types {
            for class in spec.classes() {
                if !classes.insert((class, spec.within)) {
                    let detail = match spec.within {
                        Some(parent) => format!("declared twice under `{}`", parent),
                        None => "declared twice".to_string(),
                    };
                    return Err(invalid(class, detail));
                }
            }
            if !tables.insert(spec.table) {
                return Err(invalid(spec.class, format!("table `{}` declared twice", spec.table)));
            }
        }

        for ns in &self.namespaces {
            if let Some(derivation) = &ns.derivation {
                let parent = self.namespace(derivation.from).ok_or_else(|| {
                    invalid(ns.name, format!("derived from unknown namespace `{}`", derivation.from))
                })?;
                if parent.derivation.is_some() {
                    return Err(invalid(
                        ns.name,
                        format!("derived from `{}`, which is itself derived", parent.name),
                    ));
                }
            }
        }

        for spec in &self.types {
            self.validate_type(spec)?;
        }
        Ok(())
    }

    fn validate_type(&self, spec: &TypeSpec) -> Result<(), ClosureError> {
        let invalid = |detail: String| ClosureError::InvalidDeclaration {
            class: spec.class.to_string(),
            detail,
        };

        let mut relation_names = HashSet::new();
        for relation in &spec.relations {
            if !relation_names.insert(relation.name) {
                return Err(invalid(format!("relation `{}` declared twice", relation.name)));
            }
            match &relation.kind {
                RelationKind::ChildLookup { target } => {
                    if self.type_spec(target).is_none() {
                        return Err(invalid(format!(
                            "relation `{}` targets unregistered class `{}`",
                            relation.name, target
                        )));
                    }
                }
                RelationKind::AttributeReference { target, form, .. } => {
                    if let Some(target) = target {
                        if self.type_spec(target).is_none() {
                            return Err(invalid(format!(
                                "relation `{}` targets unregistered class `{}`",
                                relation.name, target
                            )));
                        }
                    }
                    if let ReferenceForm::Named { rn_prefix, .. } = form {
                        if rn_prefix.is_empty() {
                            return Err(invalid(format!(
                                "relation `{}` has an empty name prefix",
                                relation.name
                            )));
                        }
                    }
                }
                RelationKind::ReverseLookup { source, via } => {
                    if self.type_spec(source).is_none() {
                        return Err(invalid(format!(
                            "relation `{}` scans unregistered class `{}`",
                            relation.name, source
                        )));
                    }
                    let forwards: Vec<&RelationSpec> = self
                        .specs_for_class(source)
                        .filter_map(|source_spec| source_spec.relation_named(via))
                        .collect();
                    if forwards.is_empty() {
                        return Err(invalid(format!(
                            "relation `{}` goes through unknown relation `{}.{}`",
                            relation.name, source, via
                        )));
                    }
                    for forward in forwards {
                        match &forward.kind {
                            RelationKind::ReverseLookup { .. } => {
                                return Err(invalid(format!(
                                    "relation `{}` reverses `{}.{}`, itself a reverse lookup",
                                    relation.name, source, via
                                )))
                            }
                            RelationKind::ChildLookup { target }
                            | RelationKind::AttributeReference { target: Some(target), .. }
                                if !spec.declares(target) =>
                            {
                                return Err(invalid(format!(
                                    "relation `{}` reverses `{}.{}`, which targets `{}`",
                                    relation.name, source, via, target
                                )))
                            }
                            _ => {}
                        }
                    }
                }
            }
        }

        if spec.primary_key.is_empty() {
            return Err(invalid("empty primary key".to_string()));
        }
        for name in &spec.primary_key {
            let column = spec
                .column_named(name)
                .ok_or_else(|| invalid(format!("primary key column `{}` is not declared", name)))?;
            if let ColumnSource::Relation { relation, .. } = &column.source {
                let attribute_based = spec
                    .relation_named(relation)
                    .map(|r| matches!(r.kind, RelationKind::AttributeReference { .. }))
                    .unwrap_or(false);
                if !attribute_based {
                    return Err(invalid(format!(
                        "primary key column `{}` must come from an attribute reference",
                        name
                    )));
                }
            }
        }

        let mut column_names = HashSet::new();
        for column in &spec.columns {
            if !column_names.insert(column.name) {
                return Err(invalid(format!("column `{}` declared twice", column.name)));
            }
            if let ColumnSource::Relation { relation, .. } = &column.source {
                if spec.relation_named(relation).is_none() {
                    return Err(invalid(format!(
                        "column `{}` uses unknown relation `{}`",
                        column.name, relation
                    )));
                }
            }
            if let Some(ns) = column.namespace {
                if self.namespace(ns).is_none() {
                    return Err(invalid(format!(
                        "column `{}` uses unknown namespace `{}`",
                        column.name, ns
                    )));
                }
            }
        }
        Ok(())
    }
}
