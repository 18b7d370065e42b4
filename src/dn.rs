//! Hierarchical path (distinguished name) helpers
//!
//! Paths are `/`-separated relative names. A relative name may embed a
//! bracketed segment that itself contains `/`, e.g.
//! `uni/tn-Prod/ap-web/epg-front/rspathAtt-[topology/pod-1/paths-101/pathep-[eth1/1]]`.

use once_cell::sync::Lazy;
use regex::Regex;

static POD_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"/pod-(\d+)(/|$)").unwrap());

static PATHS_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"/paths-(\d+)/").unwrap());

static PROTPATHS_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/protpaths-(\d+)-(\d+)/").unwrap());

static NODE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"/node-(\d+)$").unwrap());

static PATHEP_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"/pathep-\[(.+)\]$").unwrap());

static VLAN_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^vlan-(\d+)$").unwrap());

/// Split a path into its relative names, keeping bracketed segments intact
pub fn split_rns(path: &str) -> Vec<&str> {
    let mut rns = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (idx, ch) in path.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => {
                if idx > start {
                    rns.push(&path[start..idx]);
                }
                start = idx + 1;
            }
            _ => {}
        }
    }
    if start < path.len() {
        rns.push(&path[start..]);
    }
    rns
}

/// Last relative name of a path
pub fn last_rn(path: &str) -> Option<&str> {
    split_rns(path).pop()
}

/// Join a parent path and a relative name
pub fn join(parent: &str, rn: &str) -> String {
    if parent.is_empty() {
        rn.to_string()
    } else {
        format!("{}/{}", parent, rn)
    }
}

/// Value of the first relative name starting with `prefix`
///
/// `rn_value("uni/tn-Prod/BD-web", "BD-")` is `Some("web")`. A value wrapped
/// entirely in brackets is unwrapped: `subnet-[10.0.0.1/24]` gives `10.0.0.1/24`.
pub fn rn_value(path: &str, prefix: &str) -> Option<String> {
    let rn = split_rns(path).into_iter().find(|rn| rn.starts_with(prefix))?;
    let value = &rn[prefix.len()..];
    if value.is_empty() {
        return None;
    }
    Some(unwrap_brackets(value).to_string())
}

/// Content of the first top-level bracketed segment of a value
pub fn bracketed(value: &str) -> Option<&str> {
    let open = value.find('[')?;
    let mut depth = 0usize;
    for (idx, ch) in value[open..].char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&value[open + 1..open + idx]);
                }
            }
            _ => {}
        }
    }
    None
}

fn unwrap_brackets(value: &str) -> &str {
    if value.starts_with('[') && value.ends_with(']') {
        if let Some(inner) = bracketed(value) {
            if inner.len() + 2 == value.len() {
                return inner;
            }
        }
    }
    value
}

/// Location of a fabric port or node, parsed from a topology path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyPath {
    pub pod_id: String,
    /// Single node ("101") or vPC pair ("101-102")
    pub node_id: String,
    pub interface: String,
}

/// Parse `topology/pod-1/paths-101/pathep-[eth1/1]`,
/// `topology/pod-1/protpaths-101-102/pathep-[vpc-name]` or
/// `topology/pod-1/node-101`. Missing parts are left empty.
pub fn parse_topology_path(tdn: &str) -> TopologyPath {
    let mut parsed = TopologyPath::default();

    if let Some(caps) = POD_REGEX.captures(tdn) {
        parsed.pod_id = caps[1].to_string();
    }

    if let Some(caps) = PATHS_REGEX.captures(tdn) {
        parsed.node_id = caps[1].to_string();
    } else if let Some(caps) = PROTPATHS_REGEX.captures(tdn) {
        parsed.node_id = format!("{}-{}", &caps[1], &caps[2]);
    } else if let Some(caps) = NODE_REGEX.captures(tdn) {
        parsed.node_id = caps[1].to_string();
    }

    if let Some(caps) = PATHEP_REGEX.captures(tdn) {
        parsed.interface = caps[1].to_string();
    }

    parsed
}

/// VLAN number of an encapsulation string, `vlan-100` gives `100`
pub fn vlan_number(encap: &str) -> Option<String> {
    VLAN_REGEX.captures(encap).map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_keeps_brackets() {
        let rns = split_rns("uni/tn-Prod/ap-web/epg-front/rspathAtt-[topology/pod-1/paths-101/pathep-[eth1/1]]");
        assert_eq!(
            rns,
            vec![
                "uni",
                "tn-Prod",
                "ap-web",
                "epg-front",
                "rspathAtt-[topology/pod-1/paths-101/pathep-[eth1/1]]"
            ]
        );
    }

    #[test]
    fn test_rn_value() {
        assert_eq!(rn_value("uni/tn-Prod/BD-web", "tn-").as_deref(), Some("Prod"));
        assert_eq!(rn_value("uni/tn-Prod/BD-web", "BD-").as_deref(), Some("web"));
        assert_eq!(rn_value("uni/tn-Prod/BD-web/subnet-[10.0.0.1/24]", "subnet-").as_deref(), Some("10.0.0.1/24"));
        assert_eq!(rn_value("uni/tn-Prod/BD-web", "ap-"), None);
        // a value that is only partly bracketed stays as is
        assert_eq!(
            rn_value("uni/infra/vlanns-[pool-a]-static", "vlanns-").as_deref(),
            Some("[pool-a]-static")
        );
    }

    #[test]
    fn test_bracketed_nested() {
        assert_eq!(bracketed("rsdomAtt-[uni/phys-dom]"), Some("uni/phys-dom"));
        assert_eq!(bracketed("x-[a/[b]]-y"), Some("a/[b]"));
        assert_eq!(bracketed("no-brackets"), None);
    }

    #[test]
    fn test_parse_topology_paths() {
        let single = parse_topology_path("topology/pod-1/paths-101/pathep-[eth1/1]");
        assert_eq!(single.pod_id, "1");
        assert_eq!(single.node_id, "101");
        assert_eq!(single.interface, "eth1/1");

        let vpc = parse_topology_path("topology/pod-2/protpaths-101-102/pathep-[vpc-web]");
        assert_eq!(vpc.pod_id, "2");
        assert_eq!(vpc.node_id, "101-102");
        assert_eq!(vpc.interface, "vpc-web");

        let node = parse_topology_path("topology/pod-1/node-201");
        assert_eq!(node.node_id, "201");
        assert_eq!(node.interface, "");
    }

    #[test]
    fn test_vlan_number() {
        assert_eq!(vlan_number("vlan-100").as_deref(), Some("100"));
        assert_eq!(vlan_number("vxlan-100"), None);
    }
}
