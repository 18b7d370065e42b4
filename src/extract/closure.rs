//! Closure Engine - dependency closure of a seed set
//!
//! Breadth-first fixed point over the traversed relations of the registry.
//! The visited set is keyed by object; admitting a key also admits every
//! other object with the same (class, key), so that re-seeding from the
//! resulting keys reproduces the same closure.

use crate::error::{ClosureError, Warning};
use crate::extract::resolve::{Resolution, Resolver};
use crate::schema::Registry;
use crate::tree::TreeIndex;
use crate::types::{ObjectId, ObjectKey, Seed, SliceConfig};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use tracing::{debug, info, warn};

/// The frozen result of a closure computation: class -> admitted keys
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ClosureState {
    members: BTreeMap<String, BTreeSet<ObjectKey>>,
}

impl ClosureState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, class: &str, key: &ObjectKey) -> bool {
        self.members
            .get(class)
            .map(|keys| keys.contains(key))
            .unwrap_or(false)
    }

    /// Returns true when the key was not yet present
    pub fn insert(&mut self, class: &str, key: ObjectKey) -> bool {
        self.members.entry(class.to_string()).or_default().insert(key)
    }

    /// Admitted keys of a class, in key order
    pub fn keys<'s>(&'s self, class: &str) -> impl Iterator<Item = &'s ObjectKey> + 's {
        self.members.get(class).into_iter().flatten()
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    /// Total number of admitted keys
    pub fn len(&self) -> usize {
        self.members.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Set union
    pub fn merge(&mut self, other: &ClosureState) {
        for (class, keys) in &other.members {
            self.members
                .entry(class.clone())
                .or_default()
                .extend(keys.iter().cloned());
        }
    }

    /// Every admitted key as a seed
    pub fn seeds(&self) -> Vec<Seed> {
        self.members
            .iter()
            .flat_map(|(class, keys)| {
                keys.iter().map(move |key| Seed {
                    class: class.clone(),
                    key: key.clone(),
                })
            })
            .collect()
    }
}

/// Computes closures over one tree and registry
pub struct ClosureEngine<'a> {
    tree: &'a TreeIndex,
    registry: &'a Registry,
    config: &'a SliceConfig,
}

/// Mutable state of one computation
struct Walk<'a> {
    resolver: Resolver<'a>,
    state: ClosureState,
    warnings: Vec<Warning>,
    visited: HashSet<ObjectId>,
    queue: VecDeque<(ObjectId, usize)>,
    /// class -> key -> objects, built on first use of a class
    by_key: HashMap<String, HashMap<ObjectKey, Vec<ObjectId>>>,
    max_objects: usize,
}

impl<'a> ClosureEngine<'a> {
    pub fn new(tree: &'a TreeIndex, registry: &'a Registry, config: &'a SliceConfig) -> Self {
        ClosureEngine {
            tree,
            registry,
            config,
        }
    }

    /// Compute the closure of `seeds`
    ///
    /// Fails without a partial result when the registry is inconsistent or
    /// a limit of the [`SliceConfig`] is exceeded. Unmatched seeds and
    /// unresolvable edges are reported as warnings.
    pub fn compute(&self, seeds: &[Seed]) -> Result<(ClosureState, Vec<Warning>), ClosureError> {
        self.registry.validate()?;

        let mut walk = Walk {
            resolver: Resolver::new(self.tree, self.registry),
            state: ClosureState::new(),
            warnings: Vec::new(),
            visited: HashSet::new(),
            queue: VecDeque::new(),
            by_key: HashMap::new(),
            max_objects: self.config.max_objects,
        };

        for seed in seeds {
            let matches = walk.objects_with_key(&seed.class, &seed.key);
            if matches.is_empty() {
                walk.record(Warning::SeedNotFound { seed: seed.clone() });
                continue;
            }
            for id in matches {
                walk.admit(id, 0)?;
            }
        }

        while let Some((id, depth)) = walk.queue.pop_front() {
            self.expand(&mut walk, id, depth)?;
        }

        info!(
            seeds = seeds.len(),
            objects = walk.visited.len(),
            keys = walk.state.len(),
            warnings = walk.warnings.len(),
            "closure computed"
        );
        Ok((walk.state, walk.warnings))
    }

    fn expand(&self, walk: &mut Walk<'a>, id: ObjectId, depth: usize) -> Result<(), ClosureError> {
        let Some(obj) = self.tree.get(id) else {
            return Ok(());
        };
        let Some(spec) = self.registry.spec_of(self.tree, obj) else {
            return Ok(());
        };
        let Some(key) = walk.resolver.key(id) else {
            return Ok(());
        };

        if walk.state.insert(&obj.class, key.clone()) {
            for twin in walk.objects_with_key(&obj.class, &key) {
                walk.admit(twin, depth)?;
            }
        }

        for relation in spec.relations.iter().filter(|r| r.traverse) {
            for resolution in walk.resolver.resolve(obj, relation) {
                match resolution {
                    Resolution::Found(target_id) => {
                        if walk.visited.contains(&target_id) {
                            continue;
                        }
                        let Some(target) = self.tree.get(target_id) else {
                            continue;
                        };
                        if self.registry.spec_of(self.tree, target).is_none() {
                            walk.record(Warning::UnregisteredTarget {
                                source: obj.path.clone(),
                                relation: relation.name.to_string(),
                                target: target.path.clone(),
                                class: target.class.clone(),
                            });
                            continue;
                        }
                        if depth + 1 > self.config.max_depth {
                            return Err(ClosureError::LimitExceeded {
                                limit: "max_depth",
                                max: self.config.max_depth,
                            });
                        }
                        debug!(from = %obj.path, to = %target.path, relation = relation.name, "follow");
                        walk.admit(target_id, depth + 1)?;
                    }
                    Resolution::Missing { reference } => {
                        walk.record(Warning::UnresolvedReference {
                            source: obj.path.clone(),
                            relation: relation.name.to_string(),
                            reference,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

impl<'a> Walk<'a> {
    fn admit(&mut self, id: ObjectId, depth: usize) -> Result<(), ClosureError> {
        if self.visited.insert(id) {
            if self.visited.len() > self.max_objects {
                return Err(ClosureError::LimitExceeded {
                    limit: "max_objects",
                    max: self.max_objects,
                });
            }
            self.queue.push_back((id, depth));
        }
        Ok(())
    }

    fn objects_with_key(&mut self, class: &str, key: &ObjectKey) -> Vec<ObjectId> {
        if !self.by_key.contains_key(class) {
            let tree = self.resolver.tree();
            let mut index: HashMap<ObjectKey, Vec<ObjectId>> = HashMap::new();
            for obj in tree.find(class, None) {
                if let Some(obj_key) = self.resolver.key(obj.id) {
                    index.entry(obj_key).or_default().push(obj.id);
                }
            }
            self.by_key.insert(class.to_string(), index);
        }
        self.by_key
            .get(class)
            .and_then(|index| index.get(key))
            .cloned()
            .unwrap_or_default()
    }

    fn record(&mut self, warning: Warning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }
}

/// One-shot closure computation
pub fn compute_closure(
    tree: &TreeIndex,
    registry: &Registry,
    seeds: &[Seed],
    config: &SliceConfig,
) -> Result<(ClosureState, Vec<Warning>), ClosureError> {
    ClosureEngine::new(tree, registry, config).compute(seeds)
}
