use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::Path;

/// Value substitutions grouped by namespace: namespace -> old -> new
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawPlan")]
pub struct SubstitutionPlan {
    entries: BTreeMap<String, BTreeMap<String, String>>,
}

impl SubstitutionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        namespace: impl Into<String>,
        old: impl Into<String>,
        new: impl Into<String>,
    ) -> Option<String> {
        self.entries
            .entry(namespace.into())
            .or_default()
            .insert(old.into(), new.into())
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(
        mut self,
        namespace: impl Into<String>,
        old: impl Into<String>,
        new: impl Into<String>,
    ) -> Self {
        self.insert(namespace, old, new);
        self
    }

    pub fn get(&self, namespace: &str, old: &str) -> Option<&str> {
        self.entries.get(namespace)?.get(old).map(String::as_str)
    }

    /// Entries of one namespace, identity entries included
    pub fn entries(&self, namespace: &str) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .get(namespace)
            .into_iter()
            .flatten()
            .map(|(old, new)| (old.as_str(), new.as_str()))
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parse a YAML mapping `namespace -> {old: new}`; numbers and booleans
    /// are taken as their text
    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        let plan: Option<SubstitutionPlan> = serde_yaml::from_str(text)?;
        Ok(plan.unwrap_or_default())
    }

    pub fn read<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        use anyhow::Context;
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read plan file: {}", path.display()))?;
        Self::from_yaml_str(&text)
            .with_context(|| format!("Failed to parse plan file: {}", path.display()))
    }
}

impl Serialize for SubstitutionPlan {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

/// Plan file as written by hand: empty namespaces and non-string scalars allowed
#[derive(Deserialize)]
#[serde(transparent)]
struct RawPlan(BTreeMap<String, Option<BTreeMap<Scalar, Scalar>>>);

impl From<RawPlan> for SubstitutionPlan {
    fn from(raw: RawPlan) -> Self {
        let entries = raw
            .0
            .into_iter()
            .map(|(namespace, values)| {
                let values = values
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(old, new)| (old.0, new.0))
                    .collect();
                (namespace, values)
            })
            .collect();
        SubstitutionPlan { entries }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Scalar(String);

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Int(i64),
            Float(f64),
            Bool(bool),
        }

        Ok(Scalar(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text,
            Raw::Int(n) => n.to_string(),
            Raw::Float(n) => n.to_string(),
            Raw::Bool(b) => b.to_string(),
        }))
    }
}
