//! Projector - closure to tables
//!
//! One generic routine driven by the registry: for each object of a type
//! whose key is in the closure, build a row column by column. A relation
//! column that points outside the closure drops the whole row, so no
//! emitted row ever references something that was not extracted.

use crate::error::Warning;
use crate::extract::closure::ClosureState;
use crate::extract::resolve::{Resolution, Resolver};
use crate::schema::{ColumnSource, Registry, TypeSpec};
use crate::tree::TreeIndex;
use crate::types::{ConfigObject, Row, Table};
use std::collections::HashSet;
use tracing::{info, warn};

/// Rows of one table plus what was left out and why
#[derive(Debug, Clone)]
pub struct Projection {
    pub table: Table,
    /// Rows not emitted because a relation column left the closure
    pub dropped: usize,
    /// Rows not emitted because their key was already taken
    pub duplicates: usize,
    pub warnings: Vec<Warning>,
}

/// Outcome of building one row
enum Built {
    Row(Vec<String>),
    Dropped(Warning),
}

pub struct Projector<'a> {
    registry: &'a Registry,
    resolver: Resolver<'a>,
}

impl<'a> Projector<'a> {
    pub fn new(tree: &'a TreeIndex, registry: &'a Registry) -> Self {
        Projector {
            registry,
            resolver: Resolver::new(tree, registry),
        }
    }

    /// Project one class; `None` when the class is not registered
    pub fn project(&mut self, class: &str, closure: &ClosureState) -> Option<Projection> {
        let spec = self.registry.type_spec(class)?;
        Some(self.project_spec(spec, closure))
    }

    /// Project every registered type, in registry order
    pub fn project_all(&mut self, closure: &ClosureState) -> Vec<Projection> {
        let registry = self.registry;
        registry
            .types()
            .iter()
            .map(|spec| self.project_spec(spec, closure))
            .collect()
    }

    fn project_spec(&mut self, spec: &TypeSpec, closure: &ClosureState) -> Projection {
        let tree = self.resolver.tree();
        let mut table = spec.empty_table();
        let mut projection_warnings = Vec::new();
        let mut dropped = 0;
        let mut duplicates = 0;
        let mut seen = HashSet::new();

        let objects = spec
            .classes()
            .flat_map(|class| tree.find(class, None))
            .filter(|obj| spec.applies_to(tree, obj));
        for obj in objects {
            let Some(key) = self.resolver.key(obj.id) else {
                continue;
            };
            if !closure.contains(&obj.class, &key) {
                continue;
            }

            let values = match self.build_row(spec, obj, closure, &mut projection_warnings) {
                Built::Row(values) => values,
                Built::Dropped(warning) => {
                    dropped += 1;
                    warn!("{}", warning);
                    projection_warnings.push(warning);
                    continue;
                }
            };

            let row_key = table.key_of(&values);
            if !seen.insert(row_key.clone()) {
                duplicates += 1;
                let warning = Warning::DuplicateKey {
                    table: spec.table.to_string(),
                    key: row_key,
                    source: obj.path.clone(),
                };
                warn!("{}", warning);
                projection_warnings.push(warning);
                continue;
            }
            table.rows.push(Row { key: row_key, values });
        }

        // stable: equal keys cannot occur, discovery order is kept otherwise
        table.rows.sort_by(|a, b| a.key.cmp(&b.key));

        info!(table = spec.table, rows = table.len(), dropped, duplicates, "projected");
        Projection {
            table,
            dropped,
            duplicates,
            warnings: projection_warnings,
        }
    }

    /// Values of one row. Lookup-only references that miss are noted in
    /// `notes`; the closure never follows them, so nothing else reports them.
    fn build_row(
        &mut self,
        spec: &TypeSpec,
        obj: &ConfigObject,
        closure: &ClosureState,
        notes: &mut Vec<Warning>,
    ) -> Built {
        let tree = self.resolver.tree();
        let mut values = Vec::with_capacity(spec.columns.len());
        // several columns may read through the same relation
        let mut noted: Vec<&str> = Vec::new();

        for column in &spec.columns {
            let value = match &column.source {
                ColumnSource::Value(source) => source.read(tree, obj).unwrap_or_default(),
                ColumnSource::Relation {
                    relation,
                    value,
                    required,
                } => {
                    let mut target = None;
                    if let Some(rel) = spec.relation_named(relation) {
                        let mut missing = None;
                        for resolution in self.resolver.resolve(obj, rel) {
                            match resolution {
                                Resolution::Found(id) => {
                                    target = Some(id);
                                    break;
                                }
                                Resolution::Missing { reference } => {
                                    missing = missing.or(Some(reference));
                                }
                            }
                        }
                        let unresolved = target.is_none() && !rel.traverse && !noted.contains(&rel.name);
                        if let (true, Some(reference)) = (unresolved, missing) {
                            noted.push(rel.name);
                            let warning = Warning::UnresolvedReference {
                                source: obj.path.clone(),
                                relation: rel.name.to_string(),
                                reference,
                            };
                            warn!("{}", warning);
                            notes.push(warning);
                        }
                    }

                    match target.and_then(|id| tree.get(id)) {
                        Some(target) => {
                            let included = self
                                .resolver
                                .key(target.id)
                                .map(|key| closure.contains(&target.class, &key))
                                .unwrap_or(false);
                            if !included {
                                return Built::Dropped(Warning::RowDropped {
                                    table: spec.table.to_string(),
                                    source: obj.path.clone(),
                                    column: column.name.to_string(),
                                    target: target.path.clone(),
                                });
                            }
                            value.read(tree, target).unwrap_or_default()
                        }
                        None if *required => {
                            return Built::Dropped(Warning::RowDropped {
                                table: spec.table.to_string(),
                                source: obj.path.clone(),
                                column: column.name.to_string(),
                                target: String::new(),
                            })
                        }
                        None => String::new(),
                    }
                }
            };
            values.push(value);
        }
        Built::Row(values)
    }
}

/// Project one class of a closure
pub fn project(
    registry: &Registry,
    class: &str,
    closure: &ClosureState,
    tree: &TreeIndex,
) -> Option<Projection> {
    Projector::new(tree, registry).project(class, closure)
}
