//! Error taxonomy and non-fatal warnings
//!
//! Load and closure errors are fatal to their step. Projection problems are
//! recovered locally and surfaced as [`Warning`]s. Conversion errors are
//! collected exhaustively before any table is emitted.

use crate::types::{ObjectKey, Seed};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Malformed or inconsistent input tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("duplicate path `{path}` (first {first_class}, then {second_class})")]
    DuplicatePath {
        path: String,
        first_class: String,
        second_class: String,
    },

    #[error("object of class `{class}` at {location} has no path and none can be derived")]
    MissingPath { class: String, location: String },

    #[error("malformed payload at {location}: {reason}")]
    Malformed { location: String, reason: String },
}

/// Closure computation could not complete
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClosureError {
    #[error("closure exceeded the {limit} limit of {max}")]
    LimitExceeded { limit: &'static str, max: usize },

    #[error("invalid declaration for `{class}`: {detail}")]
    InvalidDeclaration { class: String, detail: String },
}

/// A single problem in a substitution plan
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversionError {
    #[error("namespace `{namespace}`: {} would all become `{new_value}`", .sources.join(", "))]
    Collision {
        namespace: String,
        new_value: String,
        sources: Vec<String>,
    },

    #[error("namespace `{namespace}`: `{old}` -> `{new}` is itself remapped to `{next}`")]
    Chained {
        namespace: String,
        old: String,
        new: String,
        next: String,
    },

    #[error(
        "namespace `{namespace}`: `{value}` follows {parent_namespace} entries {} to different values {}",
        .parents.join(", "),
        .images.join(", ")
    )]
    DerivedConflict {
        namespace: String,
        value: String,
        parent_namespace: String,
        /// Parent entry sources, in plan order
        parents: Vec<String>,
        /// What each parent entry would turn `value` into
        images: Vec<String>,
    },

    #[error("unknown namespace `{namespace}`")]
    UnknownNamespace { namespace: String },
}

/// Every problem found while validating a substitution plan
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ConversionErrors(pub Vec<ConversionError>);

impl ConversionErrors {
    pub fn errors(&self) -> &[ConversionError] {
        &self.0
    }
}

impl fmt::Display for ConversionErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} conflict(s) in substitution plan", self.0.len())?;
        for error in &self.0 {
            write!(f, "; {}", error)?;
        }
        Ok(())
    }
}

/// Either step of the extraction pipeline failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SliceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Closure(#[from] ClosureError),
}

/// Non-fatal notes recorded during closure and projection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A seed selector matched no object
    SeedNotFound { seed: Seed },

    /// A relation's target is absent from the tree; the edge was skipped
    UnresolvedReference {
        source: String,
        relation: String,
        reference: String,
    },

    /// A relation resolved to an object of a type the registry does not know
    UnregisteredTarget {
        source: String,
        relation: String,
        target: String,
        class: String,
    },

    /// A row was not emitted because a relation column points outside the closure
    RowDropped {
        table: String,
        source: String,
        column: String,
        target: String,
    },

    /// A second object produced an already emitted primary key
    DuplicateKey {
        table: String,
        key: ObjectKey,
        source: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::SeedNotFound { seed } => write!(f, "seed {} not found", seed),
            Warning::UnresolvedReference { source, relation, reference } => write!(
                f,
                "{}: relation `{}` points to missing `{}`",
                source, relation, reference
            ),
            Warning::UnregisteredTarget { source, relation, target, class } => write!(
                f,
                "{}: relation `{}` reaches `{}` of unregistered class {}",
                source, relation, target, class
            ),
            Warning::RowDropped { table, source, column, target } => {
                if target.is_empty() {
                    write!(f, "{}: row for {} dropped, `{}` unresolved", table, source, column)
                } else {
                    write!(
                        f,
                        "{}: row for {} dropped, `{}` -> {} is outside the closure",
                        table, source, column, target
                    )
                }
            }
            Warning::DuplicateKey { table, key, source } => {
                write!(f, "{}: duplicate key [{}] from {} suppressed", table, key, source)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_errors_display_names_all_sources() {
        let errors = ConversionErrors(vec![ConversionError::Collision {
            namespace: "tenant".into(),
            new_value: "ProdNew".into(),
            sources: vec!["Prod".into(), "Staging".into()],
        }]);
        let text = errors.to_string();
        assert!(text.contains("Prod, Staging"));
        assert!(text.contains("ProdNew"));
    }

    #[test]
    fn test_derived_conflict_names_both_parents() {
        let error = ConversionError::DerivedConflict {
            namespace: "vrf".into(),
            value: "Prod-VRF".into(),
            parent_namespace: "tenant".into(),
            parents: vec!["Prod".into(), "Prod-TN".into()],
            images: vec!["Alpha-VRF".into(), "Beta-VRF".into()],
        };
        let text = error.to_string();
        assert!(text.contains("tenant entries Prod, Prod-TN"));
        assert!(text.contains("Alpha-VRF, Beta-VRF"));

        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["kind"], "derived_conflict");
    }
}
