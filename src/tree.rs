//! Tree Index - an addressable, typed view over the raw payload
//!
//! Objects live in an arena and are addressed by [`ObjectId`]. Two indexes
//! are built at load time: path -> object and class -> objects (pre-order).

use crate::dn;
use crate::error::ConfigError;
use crate::types::{ConfigObject, ObjectId};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Root path assumed for top-level objects that carry no `dn`
const UNIVERSE: &str = "uni";

/// Read-only index over the configuration objects of one payload
#[derive(Debug, Default)]
pub struct TreeIndex {
    objects: Vec<ConfigObject>,
    roots: Vec<ObjectId>,
    by_path: HashMap<String, ObjectId>,
    by_class: HashMap<String, Vec<ObjectId>>,
}

/// Pending node during the load walk
struct PendingNode<'v> {
    node: &'v Value,
    parent: Option<ObjectId>,
    location: String,
}

impl TreeIndex {
    /// Parse a payload into an index
    ///
    /// Accepts a single node (`{"polUni": {...}}`), an API envelope
    /// (`{"imdata": [...]}`) or a bare array of nodes.
    pub fn load(payload: &Value) -> Result<Self, ConfigError> {
        let mut tree = TreeIndex::default();

        match payload {
            Value::Object(map) if map.contains_key("imdata") => {
                let items = map["imdata"].as_array().ok_or_else(|| ConfigError::Malformed {
                    location: "imdata".to_string(),
                    reason: "expected an array".to_string(),
                })?;
                for (idx, item) in items.iter().enumerate() {
                    tree.add_subtree(item, format!("imdata[{}]", idx))?;
                }
            }
            Value::Object(_) => tree.add_subtree(payload, "$".to_string())?,
            Value::Array(items) => {
                for (idx, item) in items.iter().enumerate() {
                    tree.add_subtree(item, format!("[{}]", idx))?;
                }
            }
            _ => {
                return Err(ConfigError::Malformed {
                    location: "$".to_string(),
                    reason: "expected an object or an array".to_string(),
                })
            }
        }

        info!(
            objects = tree.objects.len(),
            classes = tree.by_class.len(),
            "configuration tree loaded"
        );
        Ok(tree)
    }

    /// Add one top-level node and everything under it, in pre-order
    fn add_subtree(&mut self, root: &Value, location: String) -> Result<(), ConfigError> {
        let mut stack = vec![PendingNode {
            node: root,
            parent: None,
            location,
        }];

        while let Some(pending) = stack.pop() {
            let (class, body) = split_node(pending.node, &pending.location)?;
            let attributes = read_attributes(body, &pending.location)?;

            let parent_path = pending.parent.map(|p| self.objects[p.0].path.as_str());
            let path = node_path(class, &attributes, parent_path).ok_or_else(|| {
                ConfigError::MissingPath {
                    class: class.to_string(),
                    location: pending.location.clone(),
                }
            })?;

            let id = self.insert(class, path, attributes, pending.parent)?;

            let children = match body.get("children") {
                None | Some(Value::Null) => &[][..],
                Some(Value::Array(children)) => children.as_slice(),
                Some(_) => {
                    return Err(ConfigError::Malformed {
                        location: pending.location,
                        reason: "`children` must be an array".to_string(),
                    })
                }
            };

            // reversed so that children pop in payload order
            for (idx, child) in children.iter().enumerate().rev() {
                stack.push(PendingNode {
                    node: child,
                    parent: Some(id),
                    location: format!("{}/{}[{}]", pending.location, class, idx),
                });
            }
        }

        Ok(())
    }

    fn insert(
        &mut self,
        class: &str,
        path: String,
        attributes: BTreeMap<String, String>,
        parent: Option<ObjectId>,
    ) -> Result<ObjectId, ConfigError> {
        if let Some(existing) = self.by_path.get(&path) {
            return Err(ConfigError::DuplicatePath {
                path,
                first_class: self.objects[existing.0].class.clone(),
                second_class: class.to_string(),
            });
        }

        let id = ObjectId(self.objects.len());
        debug!(%path, class, "indexed object");
        self.by_path.insert(path.clone(), id);
        self.by_class.entry(class.to_string()).or_default().push(id);

        match parent {
            Some(p) => self.objects[p.0].children.push(id),
            None => self.roots.push(id),
        }

        self.objects.push(ConfigObject {
            id,
            class: class.to_string(),
            path,
            attributes,
            children: Vec::new(),
            parent,
        });
        Ok(id)
    }

    /// Matching objects of `class` under `root` (root excluded), or in the
    /// whole tree, in discovery order
    pub fn find<'a>(&'a self, class: &'a str, root: Option<ObjectId>) -> Find<'a> {
        let mode = match root {
            None => FindMode::Indexed(
                self.by_class
                    .get(class)
                    .map(|ids| ids.iter())
                    .unwrap_or_default(),
            ),
            Some(root) => {
                let start: Vec<ObjectId> = self
                    .objects
                    .get(root.0)
                    .map(|obj| obj.children.iter().rev().copied().collect())
                    .unwrap_or_default();
                FindMode::Walk(start)
            }
        };
        Find {
            tree: self,
            class,
            mode,
        }
    }

    /// Exact path lookup
    pub fn resolve(&self, path: &str) -> Option<&ConfigObject> {
        self.by_path.get(path).map(|id| &self.objects[id.0])
    }

    pub fn get(&self, id: ObjectId) -> Option<&ConfigObject> {
        self.objects.get(id.0)
    }

    pub fn parent(&self, id: ObjectId) -> Option<&ConfigObject> {
        self.get(id)?.parent.and_then(|p| self.get(p))
    }

    /// Direct children of `id` of the given class
    pub fn children_of<'a>(
        &'a self,
        id: ObjectId,
        class: &'a str,
    ) -> impl Iterator<Item = &'a ConfigObject> + 'a {
        self.get(id)
            .map(|obj| obj.children.as_slice())
            .unwrap_or_default()
            .iter()
            .map(move |child| &self.objects[child.0])
            .filter(move |child| child.class == class)
    }

    /// Nearest object of `class` on the way up from `id`, `id` itself included
    pub fn ancestor_of_class(&self, id: ObjectId, class: &str) -> Option<&ConfigObject> {
        let mut current = self.get(id);
        while let Some(obj) = current {
            if obj.class == class {
                return Some(obj);
            }
            current = obj.parent.and_then(|p| self.get(p));
        }
        None
    }

    pub fn roots(&self) -> impl Iterator<Item = &ConfigObject> {
        self.roots.iter().map(move |id| &self.objects[id.0])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigObject> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Lazy, restartable result of [`TreeIndex::find`]
pub struct Find<'a> {
    tree: &'a TreeIndex,
    class: &'a str,
    mode: FindMode<'a>,
}

enum FindMode<'a> {
    Indexed(std::slice::Iter<'a, ObjectId>),
    Walk(Vec<ObjectId>),
}

impl<'a> Iterator for Find<'a> {
    type Item = &'a ConfigObject;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.mode {
            FindMode::Indexed(ids) => ids.next().map(|id| &self.tree.objects[id.0]),
            FindMode::Walk(stack) => {
                while let Some(id) = stack.pop() {
                    let obj = &self.tree.objects[id.0];
                    stack.extend(obj.children.iter().rev().copied());
                    if obj.class == self.class {
                        return Some(obj);
                    }
                }
                None
            }
        }
    }
}

/// Split `{"<class>": {...}}` into its class and body
fn split_node<'v>(node: &'v Value, location: &str) -> Result<(&'v str, &'v Map<String, Value>), ConfigError> {
    let malformed = |reason: &str| ConfigError::Malformed {
        location: location.to_string(),
        reason: reason.to_string(),
    };

    let map = node
        .as_object()
        .ok_or_else(|| malformed("node must be an object"))?;
    if map.len() != 1 {
        return Err(malformed("node must have exactly one class key"));
    }
    let (class, body) = map
        .iter()
        .next()
        .ok_or_else(|| malformed("node must have exactly one class key"))?;
    if class.is_empty() {
        return Err(malformed("empty class name"));
    }
    let body = body
        .as_object()
        .ok_or_else(|| malformed("node body must be an object"))?;
    Ok((class.as_str(), body))
}

fn read_attributes(
    body: &Map<String, Value>,
    location: &str,
) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut attributes = BTreeMap::new();
    let raw = match body.get("attributes") {
        None | Some(Value::Null) => return Ok(attributes),
        Some(Value::Object(raw)) => raw,
        Some(_) => {
            return Err(ConfigError::Malformed {
                location: location.to_string(),
                reason: "`attributes` must be an object".to_string(),
            })
        }
    };

    for (name, value) in raw {
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Array(_) | Value::Object(_) => {
                return Err(ConfigError::Malformed {
                    location: location.to_string(),
                    reason: format!("attribute `{}` is not a scalar", name),
                })
            }
        };
        attributes.insert(name.clone(), text);
    }
    Ok(attributes)
}

/// Path of a node: its `dn`, else `rn` or a rebuilt relative name joined to
/// the parent path
fn node_path(
    class: &str,
    attributes: &BTreeMap<String, String>,
    parent_path: Option<&str>,
) -> Option<String> {
    if let Some(dn) = attributes.get("dn").filter(|dn| !dn.is_empty()) {
        return Some(dn.clone());
    }
    if class == "polUni" {
        return Some(UNIVERSE.to_string());
    }

    let rn = attributes
        .get("rn")
        .filter(|rn| !rn.is_empty())
        .cloned()
        .or_else(|| default_rn(class, attributes))?;
    Some(dn::join(parent_path.unwrap_or(UNIVERSE), &rn))
}

/// Relative name rebuilt from naming attributes for well-known classes
fn default_rn(class: &str, attributes: &BTreeMap<String, String>) -> Option<String> {
    let attr = |name: &str| attributes.get(name).filter(|v| !v.is_empty());
    let named = |prefix: &str| attr("name").map(|name| format!("{}{}", prefix, name));

    match class {
        "infraInfra" => Some("infra".to_string()),
        "infraFuncP" => Some("funcprof".to_string()),
        "fvTenant" => named("tn-"),
        "fvCtx" => named("ctx-"),
        "fvBD" => named("BD-"),
        "fvAp" => named("ap-"),
        "fvAEPg" => named("epg-"),
        "l3extOut" => named("out-"),
        "physDomP" => named("phys-"),
        "l3extDomP" => named("l3dom-"),
        "infraAttEntityP" => named("attentp-"),
        "infraAccPortGrp" => named("accportgrp-"),
        "infraAccBndlGrp" => named("accbundle-"),
        "fvSubnet" => attr("ip").map(|ip| format!("subnet-[{}]", ip)),
        "fvnsVlanInstP" => {
            let mode = attr("allocMode").map(String::as_str).unwrap_or("dynamic");
            attr("name").map(|name| format!("vlanns-[{}]-{}", name, mode))
        }
        "fvnsEncapBlk" => match (attr("from"), attr("to")) {
            (Some(from), Some(to)) => Some(format!("from-[{}]-to-[{}]", from, to)),
            _ => None,
        },
        "vmmDomP" => named("vmmp-"),
        "l3extLNodeP" => named("lnodep-"),
        "l3extLIfP" => named("lifp-"),
        "fvRsBDToOut" => attr("tnL3extOutName").map(|out| format!("rsBDToOut-{}", out)),
        "infraGeneric" => named("gen-"),
        "infraAccPortP" => named("accportprof-"),
        "infraHPortS" => {
            let kind = attr("type").map(String::as_str).unwrap_or("range");
            attr("name").map(|name| format!("hports-{}-typ-{}", name, kind))
        }
        "infraPortBlk" => named("portblk-"),
        "l3extInstP" => named("instP-"),
        "l3extSubnet" => attr("ip").map(|ip| format!("extsubnet-[{}]", ip)),
        "l3extDefaultRouteLeakP" => Some("defrtleak".to_string()),
        "l3extMember" => attr("side").map(|side| format!("mem-{}", side)),
        "l3extIp" => attr("addr").map(|addr| format!("addr-[{}]", addr)),
        "l3extVirtualLIfP" => match (attr("nodeDn"), attr("encap")) {
            (Some(node), Some(encap)) => Some(format!("vlifp-[{}]-[{}]", node, encap)),
            _ => None,
        },
        "l3extRsInstPToProfile" => match (attr("tnRtctrlProfileName"), attr("direction")) {
            (Some(profile), Some(direction)) => Some(format!("rsinstPToProfile-[{}]-{}", profile, direction)),
            _ => None,
        },
        "fvRsCons" => attr("tnVzBrCPName").map(|contract| format!("rscons-{}", contract)),
        "fvRsProv" => attr("tnVzBrCPName").map(|contract| format!("rsprov-{}", contract)),
        "bgpProtP" => Some("protp".to_string()),
        "bgpPeerP" => attr("addr").map(|addr| format!("peerP-[{}]", addr)),
        "bgpAsP" => Some("as".to_string()),
        "bgpLocalAsnP" => Some("localasn".to_string()),
        "bfdIfP" => Some("bfdIfP".to_string()),
        "rtctrlProfile" => named("prof-"),
        "rtctrlCtxP" => named("ctx-"),
        "rtctrlSubjP" => named("subj-"),
        "rtctrlMatchRtDest" => attr("ip").map(|ip| format!("dest-[{}]", ip)),
        _ => relation_rn(class, attributes),
    }
}

/// Relation classes a parent may hold several of, one per target
const MULTI_TARGET_RELATIONS: &[&str] = &[
    "fvRsDomAtt",
    "fvRsPathAtt",
    "infraRsDomP",
    "infraRsFuncToEpg",
    "l3extRsDynPathAtt",
    "l3extRsNodeL3OutAtt",
    "l3extRsPathL3OutAtt",
];

/// `fvRsCtx` gives `rsctx`, `fvRsDomAtt` with a target gives `rsdomAtt-[<tDn>]`
fn relation_rn(class: &str, attributes: &BTreeMap<String, String>) -> Option<String> {
    let rest = ["fvRs", "infraRs", "l3extRs", "bgpRs", "bfdRs", "rtctrlRs"]
        .iter()
        .find_map(|prefix| class.strip_prefix(prefix))?;
    let mut chars = rest.chars();
    let first = chars.next()?;
    let base = format!("rs{}{}", first.to_lowercase(), chars.as_str());

    match attributes.get("tDn").filter(|t| !t.is_empty()) {
        Some(tdn) if MULTI_TARGET_RELATIONS.contains(&class) => Some(format!("{}-[{}]", base, tdn)),
        _ => Some(base),
    }
}
