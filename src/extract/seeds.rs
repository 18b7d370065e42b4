//! Extraction lists
//!
//! A seed file is a stream of YAML documents, each naming what to extract:
//!
//! ```yaml
//! tenant: Prod
//! ap: shop
//! epgs: [front, back]
//! ---
//! tenant: Prod
//! l3out: wan
//! floating: no
//! ---
//! class: infraAttEntityP
//! key: [servers]
//! ```

use crate::types::Seed;
use serde::{Deserialize, Deserializer};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid seed document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("seed document {document}: {reason}")]
    Invalid { document: usize, reason: String },
}

/// One document of an extraction list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SeedSpec {
    Epgs {
        tenant: String,
        ap: String,
        epgs: Vec<String>,
    },
    L3Out {
        tenant: String,
        l3out: String,
        /// Accepted for compatibility with existing lists. The L3Out brings
        /// in its routed paths and its floating SVIs either way, so the flag
        /// does not change the seed.
        #[serde(default, deserialize_with = "flag")]
        floating: bool,
    },
    Object {
        class: String,
        key: Vec<String>,
    },
}

impl SeedSpec {
    pub fn seeds(&self) -> Vec<Seed> {
        match self {
            SeedSpec::Epgs { tenant, ap, epgs } => epgs
                .iter()
                .map(|epg| Seed::new("fvAEPg", [tenant.as_str(), ap.as_str(), epg.as_str()]))
                .collect(),
            SeedSpec::L3Out { tenant, l3out, .. } => {
                vec![Seed::new("l3extOut", [tenant.as_str(), l3out.as_str()])]
            }
            SeedSpec::Object { class, key } => vec![Seed::new(class.as_str(), key.iter().map(String::as_str))],
        }
    }

    fn check(&self) -> Result<(), String> {
        let blank = |values: &[&String]| values.iter().any(|v| v.trim().is_empty());
        match self {
            SeedSpec::Epgs { tenant, ap, epgs } => {
                if blank(&[tenant, ap]) || epgs.iter().any(|e| e.trim().is_empty()) {
                    return Err("tenant, ap and every epg must be non-empty".to_string());
                }
            }
            SeedSpec::L3Out { tenant, l3out, .. } => {
                if blank(&[tenant, l3out]) {
                    return Err("tenant and l3out must be non-empty".to_string());
                }
            }
            SeedSpec::Object { class, key } => {
                if class.trim().is_empty() || key.is_empty() {
                    return Err("class and key must be non-empty".to_string());
                }
            }
        }
        Ok(())
    }
}

/// `yes`/`true`/`1` style flags, as booleans or strings
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Text(text) => matches!(text.trim().to_lowercase().as_str(), "yes" | "true" | "1"),
    })
}

/// Parse every document of an extraction list; empty documents are skipped
pub fn parse_seed_specs(text: &str) -> Result<Vec<SeedSpec>, SeedError> {
    let mut specs = Vec::new();
    for (idx, document) in serde_yaml::Deserializer::from_str(text).enumerate() {
        let Some(spec) = Option::<SeedSpec>::deserialize(document)? else {
            continue;
        };
        spec.check()
            .map_err(|reason| SeedError::Invalid { document: idx + 1, reason })?;
        specs.push(spec);
    }
    Ok(specs)
}

/// Seeds of an extraction list, in document order
pub fn load_seeds(text: &str) -> Result<Vec<Seed>, SeedError> {
    let seeds: Vec<Seed> = parse_seed_specs(text)?
        .iter()
        .flat_map(SeedSpec::seeds)
        .collect();
    info!(seeds = seeds.len(), "extraction list loaded");
    Ok(seeds)
}

pub fn read_seeds<P: AsRef<Path>>(path: P) -> Result<Vec<Seed>, SeedError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_seeds(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ObjectKey;

    #[test]
    fn test_multi_document_list() {
        let text = "tenant: Prod\nap: shop\nepgs: [front, back]\n---\ntenant: Prod\nl3out: wan\nfloating: \"yes\"\n---\n---\nclass: infraAttEntityP\nkey: [servers]\n";
        let specs = parse_seed_specs(text).unwrap();
        assert_eq!(specs.len(), 3);
        assert!(matches!(specs[1], SeedSpec::L3Out { floating: true, .. }));

        let seeds = load_seeds(text).unwrap();
        assert_eq!(seeds.len(), 4);
        assert_eq!(seeds[0].class, "fvAEPg");
        assert_eq!(seeds[1].key, ObjectKey::new(["Prod", "shop", "back"]));
        assert_eq!(seeds[2], Seed::new("l3extOut", ["Prod", "wan"]));
        assert_eq!(seeds[3], Seed::new("infraAttEntityP", ["servers"]));
    }

    #[test]
    fn test_floating_defaults_to_false() {
        let specs = parse_seed_specs("tenant: A\nl3out: b\n").unwrap();
        assert!(matches!(specs[0], SeedSpec::L3Out { floating: false, .. }));
        let specs = parse_seed_specs("tenant: A\nl3out: b\nfloating: true\n").unwrap();
        assert!(matches!(specs[0], SeedSpec::L3Out { floating: true, .. }));
    }

    #[test]
    fn test_invalid_documents() {
        assert!(matches!(
            parse_seed_specs("tenant: ''\nap: shop\nepgs: [x]\n"),
            Err(SeedError::Invalid { document: 1, .. })
        ));
        assert!(matches!(
            parse_seed_specs("something: else\n"),
            Err(SeedError::Yaml(_))
        ));
    }
}
