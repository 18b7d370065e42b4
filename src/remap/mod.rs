//! Remap Engine - deterministic identifier substitution across tables
//!
//! A plan is validated as a whole against the tables it will rewrite before
//! any cell changes. Validation is a state transition:
//!
//! ```text
//! RemapEngine<Unvalidated> --validate()--> RemapEngine<Validated> --apply()--> Applied
//!                                     \--> Rejected (every conflict found)
//! ```
//!
//! Derived namespaces (a VRF or application profile named after its tenant)
//! follow their parent's entries unless the plan says otherwise.

pub mod plan;

pub use plan::SubstitutionPlan;

use crate::error::{ConversionError, ConversionErrors};
use crate::schema::Registry;
use crate::types::Table;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// A failed validation
pub type Rejected = ConversionErrors;

/// Plan not checked yet
#[derive(Debug)]
pub struct Unvalidated;

/// Plan checked against the tables; holds the effective substitutions
#[derive(Debug)]
pub struct Validated {
    substitutions: BTreeMap<String, BTreeMap<String, String>>,
    derived: Vec<DerivedEntry>,
}

/// An entry added from a parent namespace's entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedEntry {
    pub namespace: String,
    pub old: String,
    pub new: String,
}

/// What an application changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemapReport {
    /// Changed cells per table; tables without changes are absent
    pub changed: BTreeMap<String, usize>,
    pub derived: Vec<DerivedEntry>,
}

impl RemapReport {
    pub fn total(&self) -> usize {
        self.changed.values().sum()
    }
}

/// Converted tables and the report of the conversion
#[derive(Debug, Clone)]
pub struct Applied {
    pub tables: Vec<Table>,
    pub report: RemapReport,
}

pub struct RemapEngine<'a, S> {
    registry: &'a Registry,
    plan: &'a SubstitutionPlan,
    tables: &'a [Table],
    state: S,
}

impl<'a> RemapEngine<'a, Unvalidated> {
    pub fn new(registry: &'a Registry, plan: &'a SubstitutionPlan, tables: &'a [Table]) -> Self {
        RemapEngine {
            registry,
            plan,
            tables,
            state: Unvalidated,
        }
    }

    /// Check the whole plan, collecting every conflict
    pub fn validate(self) -> Result<RemapEngine<'a, Validated>, Rejected> {
        let mut errors = Vec::new();

        for namespace in self.plan.namespaces() {
            if self.registry.namespace(namespace).is_none() {
                errors.push(ConversionError::UnknownNamespace {
                    namespace: namespace.to_string(),
                });
            }
        }

        let observed = observed_values(self.tables);
        let (substitutions, derived, conflicts) = self.effective_substitutions(&observed);
        errors.extend(conflicts);

        for (namespace, entries) in &substitutions {
            for (old, new) in entries {
                if let Some(next) = entries.get(new) {
                    errors.push(ConversionError::Chained {
                        namespace: namespace.clone(),
                        old: old.clone(),
                        new: new.clone(),
                        next: next.clone(),
                    });
                }
            }

            let unique = self
                .registry
                .namespace(namespace)
                .map(|ns| ns.unique)
                .unwrap_or(false);
            if unique {
                let seen = observed.get(namespace.as_str());
                errors.extend(collisions(namespace, entries, seen));
            }
        }

        if !errors.is_empty() {
            return Err(ConversionErrors(errors));
        }

        debug!(
            namespaces = substitutions.len(),
            derived = derived.len(),
            "substitution plan validated"
        );
        Ok(RemapEngine {
            registry: self.registry,
            plan: self.plan,
            tables: self.tables,
            state: Validated {
                substitutions,
                derived,
            },
        })
    }

    /// Explicit non-identity entries plus the derived ones that apply
    ///
    /// A derived value reached from several parent entries is kept only when
    /// they all agree on its image; otherwise it is returned as a conflict.
    fn effective_substitutions(
        &self,
        observed: &BTreeMap<&str, BTreeSet<&str>>,
    ) -> (
        BTreeMap<String, BTreeMap<String, String>>,
        Vec<DerivedEntry>,
        Vec<ConversionError>,
    ) {
        let mut substitutions: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        let mut derived = Vec::new();
        let mut conflicts = Vec::new();

        for namespace in self.plan.namespaces() {
            let entries: BTreeMap<String, String> = self
                .plan
                .entries(namespace)
                .filter(|(old, new)| old != new)
                .map(|(old, new)| (old.to_string(), new.to_string()))
                .collect();
            if !entries.is_empty() {
                substitutions.insert(namespace.to_string(), entries);
            }
        }

        for spec in self.registry.namespaces() {
            let Some(derivation) = &spec.derivation else {
                continue;
            };
            // derived value -> (parent source, image) for every parent entry reaching it
            let mut origins: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
            for (parent_old, parent_new) in self.plan.entries(derivation.from) {
                if parent_old == parent_new {
                    continue;
                }
                let old = derivation.derive(parent_old);
                let new = derivation.derive(parent_new);
                let is_observed = observed
                    .get(spec.name)
                    .map(|values| values.contains(old.as_str()))
                    .unwrap_or(false);
                if old == new || !is_observed || self.plan.get(spec.name, &old).is_some() {
                    continue;
                }
                origins.entry(old).or_default().push((parent_old.to_string(), new));
            }

            for (old, sources) in origins {
                let distinct: BTreeSet<&str> = sources.iter().map(|(_, new)| new.as_str()).collect();
                if distinct.len() > 1 {
                    conflicts.push(ConversionError::DerivedConflict {
                        namespace: spec.name.to_string(),
                        value: old,
                        parent_namespace: derivation.from.to_string(),
                        parents: sources.iter().map(|(parent, _)| parent.clone()).collect(),
                        images: sources.into_iter().map(|(_, new)| new).collect(),
                    });
                    continue;
                }
                let Some((_, new)) = sources.into_iter().next() else {
                    continue;
                };
                debug!(namespace = spec.name, %old, %new, "derived substitution");
                substitutions
                    .entry(spec.name.to_string())
                    .or_default()
                    .insert(old.clone(), new.clone());
                derived.push(DerivedEntry {
                    namespace: spec.name.to_string(),
                    old,
                    new,
                });
            }
        }

        (substitutions, derived, conflicts)
    }
}

impl<'a> RemapEngine<'a, Validated> {
    /// Effective substitutions of a namespace, derived entries included
    pub fn substitution(&self, namespace: &str, old: &str) -> Option<&str> {
        self.state
            .substitutions
            .get(namespace)?
            .get(old)
            .map(String::as_str)
    }

    pub fn derived(&self) -> &[DerivedEntry] {
        &self.state.derived
    }

    /// Rewrite every namespaced cell; row order and column order are kept
    pub fn apply(self) -> Applied {
        let mut report = RemapReport {
            changed: BTreeMap::new(),
            derived: self.state.derived.clone(),
        };

        let tables = self
            .tables
            .iter()
            .map(|table| {
                let (converted, changed) = self.convert_table(table);
                if changed > 0 {
                    report.changed.insert(table.name.clone(), changed);
                }
                converted
            })
            .collect();

        info!(
            cells = report.total(),
            tables = report.changed.len(),
            derived = report.derived.len(),
            "substitution plan applied"
        );
        Applied { tables, report }
    }

    fn convert_table(&self, table: &Table) -> (Table, usize) {
        let mut converted = table.clone();
        let mut changed = 0;

        let columns: Vec<(usize, &BTreeMap<String, String>)> = table
            .columns
            .iter()
            .enumerate()
            .filter_map(|(idx, column)| {
                let namespace = column.namespace.as_deref()?;
                self.state.substitutions.get(namespace).map(|entries| (idx, entries))
            })
            .collect();
        if columns.is_empty() {
            return (converted, 0);
        }

        for row in &mut converted.rows {
            for (idx, entries) in &columns {
                let Some(cell) = row.values.get_mut(*idx) else {
                    continue;
                };
                if let Some(new) = entries.get(cell.as_str()) {
                    *cell = new.clone();
                    changed += 1;
                }
            }
        }
        for idx in 0..converted.rows.len() {
            converted.rows[idx].key = converted.key_of(&converted.rows[idx].values);
        }

        (converted, changed)
    }
}

/// Non-empty values per namespace across all tables
fn observed_values(tables: &[Table]) -> BTreeMap<&str, BTreeSet<&str>> {
    let mut observed: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for table in tables {
        for (idx, column) in table.columns.iter().enumerate() {
            let Some(namespace) = column.namespace.as_deref() else {
                continue;
            };
            let values = observed.entry(namespace).or_default();
            for row in &table.rows {
                if let Some(value) = row.values.get(idx).filter(|v| !v.is_empty()) {
                    values.insert(value.as_str());
                }
            }
        }
    }
    observed
}

/// Distinct values that would end up equal in a unique namespace
///
/// Entries sharing an image collide; so does an entry whose source occurs in
/// the tables and whose image already occurs there untouched. An entry whose
/// source no longer occurs is inert, which keeps re-application a no-op.
fn collisions(
    namespace: &str,
    entries: &BTreeMap<String, String>,
    observed: Option<&BTreeSet<&str>>,
) -> Vec<ConversionError> {
    let is_observed = |value: &str| observed.map(|seen| seen.contains(value)).unwrap_or(false);

    let mut by_image: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (old, new) in entries {
        by_image.entry(new.as_str()).or_default().push(old.as_str());
    }

    let mut errors = Vec::new();
    for (image, sources) in by_image {
        let untouched_image = is_observed(image) && !entries.contains_key(image);
        let colliding = if sources.len() >= 2 {
            Some(sources.iter().map(|s| s.to_string()).collect::<Vec<_>>())
        } else if untouched_image && sources.iter().any(|s| is_observed(s)) {
            Some(vec![sources[0].to_string(), image.to_string()])
        } else {
            None
        };
        if let Some(sources) = colliding {
            errors.push(ConversionError::Collision {
                namespace: namespace.to_string(),
                new_value: image.to_string(),
                sources,
            });
        }
    }
    errors
}

/// Validate `plan` against `tables` and apply it
pub fn apply(
    registry: &Registry,
    tables: &[Table],
    plan: &SubstitutionPlan,
) -> Result<(Vec<Table>, RemapReport), ConversionErrors> {
    let applied = RemapEngine::new(registry, plan, tables).validate()?.apply();
    Ok((applied.tables, applied.report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::aci;
    use crate::types::Row;

    fn table(name: &str, rows: &[&[&str]]) -> Table {
        let mut table = aci::registry().table(name).unwrap().empty_table();
        for values in rows {
            let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
            let key = table.key_of(&values);
            table.rows.push(Row { key, values });
        }
        table
    }

    fn tables() -> Vec<Table> {
        vec![
            table("tenant", &[&["Prod-TN", ""], &["Staging-TN", ""]]),
            table("vrf", &[&["Prod-TN", "Prod-VRF", ""], &["Staging-TN", "Staging-VRF", ""]]),
            table("ap", &[&["Prod-TN", "Prod-ANP", ""]]),
        ]
    }

    #[test]
    fn test_apply_with_derived_entries() {
        let plan = SubstitutionPlan::new().with("tenant", "Prod-TN", "New-TN");
        let (converted, report) = apply(aci::registry(), &tables(), &plan).unwrap();

        assert_eq!(converted[0].rows[0].values[0], "New-TN");
        assert_eq!(converted[1].rows[0].values, vec!["New-TN", "New-VRF", ""]);
        assert_eq!(converted[2].rows[0].values[1], "New-ANP");
        assert_eq!(converted[1].rows[1].values[1], "Staging-VRF");
        assert_eq!(report.derived.len(), 2);
        assert_eq!(report.changed.get("vrf"), Some(&2));
        assert_eq!(report.total(), 5);
        assert_eq!(converted[1].rows[0].key.parts(), ["New-TN", "New-VRF"]);
    }

    #[test]
    fn test_explicit_entry_beats_derived() {
        let plan = SubstitutionPlan::new()
            .with("tenant", "Prod-TN", "New-TN")
            .with("vrf", "Prod-VRF", "Prod-VRF");
        let (converted, report) = apply(aci::registry(), &tables(), &plan).unwrap();
        assert_eq!(converted[1].rows[0].values[1], "Prod-VRF");
        assert_eq!(report.derived.len(), 1);
        assert_eq!(report.derived[0].namespace, "ap");
    }

    #[test]
    fn test_collision_names_every_source() {
        let plan = SubstitutionPlan::new()
            .with("tenant", "Prod-TN", "One-TN")
            .with("tenant", "Staging-TN", "One-TN");
        let err = apply(aci::registry(), &tables(), &plan).unwrap_err();
        assert!(err.errors().contains(&ConversionError::Collision {
            namespace: "tenant".into(),
            new_value: "One-TN".into(),
            sources: vec!["Prod-TN".into(), "Staging-TN".into()],
        }));
    }

    #[test]
    fn test_collision_with_untouched_value() {
        let plan = SubstitutionPlan::new().with("tenant", "Prod-TN", "Staging-TN");
        let err = apply(aci::registry(), &tables(), &plan).unwrap_err();
        assert!(matches!(
            &err.errors()[0],
            ConversionError::Collision { sources, .. } if sources == &vec!["Prod-TN".to_string(), "Staging-TN".to_string()]
        ));
    }

    #[test]
    fn test_chained_and_unknown_are_all_reported() {
        let plan = SubstitutionPlan::new()
            .with("bd", "a", "b")
            .with("bd", "b", "c")
            .with("nope", "x", "y");
        let err = apply(aci::registry(), &tables(), &plan).unwrap_err();
        assert_eq!(err.errors().len(), 2);
        assert!(err.errors().iter().any(|e| matches!(e, ConversionError::UnknownNamespace { .. })));
        assert!(err.errors().iter().any(|e| matches!(e, ConversionError::Chained { old, .. } if old == "a")));
    }

    #[test]
    fn test_parent_entries_deriving_one_value_apart_are_rejected() {
        // "Prod" and "Prod-TN" both derive Prod-VRF and Prod-ANP
        let plan = SubstitutionPlan::new()
            .with("tenant", "Prod", "Alpha")
            .with("tenant", "Prod-TN", "Beta-TN");
        let err = apply(aci::registry(), &tables(), &plan).unwrap_err();

        assert!(err.errors().contains(&ConversionError::DerivedConflict {
            namespace: "vrf".into(),
            value: "Prod-VRF".into(),
            parent_namespace: "tenant".into(),
            parents: vec!["Prod".into(), "Prod-TN".into()],
            images: vec!["Alpha-VRF".into(), "Beta-VRF".into()],
        }));
        assert!(err.errors().iter().any(|e| matches!(
            e,
            ConversionError::DerivedConflict { namespace, value, .. } if namespace == "ap" && value == "Prod-ANP"
        )));
        assert_eq!(err.errors().len(), 2);
    }

    #[test]
    fn test_parent_entries_deriving_one_value_alike_are_merged() {
        let plan = SubstitutionPlan::new()
            .with("tenant", "Prod", "New")
            .with("tenant", "Prod-TN", "New-TN");
        let tables = tables();
        let engine = RemapEngine::new(aci::registry(), &plan, &tables).validate().unwrap();
        assert_eq!(engine.substitution("vrf", "Prod-VRF"), Some("New-VRF"));
        assert_eq!(engine.derived().len(), 2);
    }

    #[test]
    fn test_reapplication_is_a_no_op() {
        let plan = SubstitutionPlan::new().with("tenant", "Prod-TN", "New-TN");
        let (once, _) = apply(aci::registry(), &tables(), &plan).unwrap();
        let (twice, report) = apply(aci::registry(), &once, &plan).unwrap();
        assert_eq!(once, twice);
        assert_eq!(report.total(), 0);
    }

    #[test]
    fn test_typestate_exposes_effective_entries() {
        let plan = SubstitutionPlan::new().with("tenant", "Prod-TN", "New-TN");
        let tables = tables();
        let engine = RemapEngine::new(aci::registry(), &plan, &tables).validate().unwrap();
        assert_eq!(engine.substitution("vrf", "Prod-VRF"), Some("New-VRF"));
        assert_eq!(engine.derived().len(), 2);
        assert_eq!(engine.apply().tables.len(), 3);
    }
}
