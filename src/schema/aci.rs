//! Built-in declarations for the ACI policy universe
//!
//! Tables follow the layout expected by the fabric deployment tasks: one
//! table per object kind (`bd`, `epg`, `l3out`, ...) and one per relation
//! object (`epg_to_domain`, `aep_to_domain`, ...).
//!
//! Every type has a traversed edge to its parent (tenant, application
//! profile, BD, EPG, L3Out and its profiles, domain, VLAN pool, AEP), so an
//! object seeded on its own still brings its owners along. Owners pull in the
//! children that make up their own configuration (subnets, static paths, L3Out
//! subtrees). Broad containers only look their content up: a tenant never
//! pulls in its BDs, an AEP never pulls in every EPG bound to it.

use crate::dn::{self, parse_topology_path};
use crate::schema::registry::{ColumnSpec, NamespaceSpec, Registry, RelationSpec, TypeSpec, ValueSource};
use once_cell::sync::Lazy;

/// Tenant holding the shared objects looked up when a name is not local
pub const COMMON_TENANT: &str = "uni/tn-common";

static ACI_REGISTRY: Lazy<Registry> = Lazy::new(build);

/// The ACI registry, built once on first use
pub fn registry() -> &'static Registry {
    &ACI_REGISTRY
}

fn build() -> Registry {
    let registry = Registry::new()
        .with_namespace(NamespaceSpec::unique("tenant"))
        .with_namespace(NamespaceSpec::unique("vrf").derived_from("tenant", "-TN", "-VRF"))
        .with_namespace(NamespaceSpec::unique("ap").derived_from("tenant", "-TN", "-ANP"))
        .with_namespace(NamespaceSpec::unique("bd"))
        .with_namespace(NamespaceSpec::unique("epg"))
        .with_namespace(NamespaceSpec::unique("l3out"))
        .with_namespace(NamespaceSpec::shared("node_id"))
        .with_namespace(NamespaceSpec::shared("interface"))
        .with_namespace(NamespaceSpec::unique("node_profile"))
        .with_namespace(NamespaceSpec::unique("interface_profile"))
        .with_namespace(NamespaceSpec::unique("vlan_pool"))
        .with_namespace(NamespaceSpec::unique("domain"))
        .with_namespace(NamespaceSpec::unique("aep"))
        .with_namespace(NamespaceSpec::unique("policy_group"))
        .with_namespace(NamespaceSpec::unique("extepg"))
        .with_namespace(NamespaceSpec::unique("match_rule"))
        .with_namespace(NamespaceSpec::unique("route_control_profile"))
        .with_namespace(NamespaceSpec::unique("route_control_context"));

    let registry = tenant_types(registry);
    let registry = access_types(registry);
    let registry = interface_selector_types(registry);
    let registry = l3out_types(registry);
    let registry = l3out_peering_types(registry);
    let registry = floating_svi_types(registry);
    let registry = external_epg_types(registry);
    route_control_types(registry)
}

fn tenant_types(registry: Registry) -> Registry {
    registry
        .with_type(
            TypeSpec::new("fvTenant", "tenant")
                .column(ColumnSpec::attribute("tenant", "name").namespace("tenant"))
                .column(description())
                .key(&["tenant"])
                .relation(RelationSpec::children("vrfs", "fvCtx").lookup_only())
                .relation(RelationSpec::children("bds", "fvBD").lookup_only())
                .relation(RelationSpec::children("aps", "fvAp").lookup_only())
                .relation(RelationSpec::children("l3outs", "l3extOut").lookup_only())
                .relation(RelationSpec::children("match_rules", "rtctrlSubjP").lookup_only()),
        )
        .with_type(
            TypeSpec::new("fvCtx", "vrf")
                .column(tenant())
                .column(ColumnSpec::attribute("vrf", "name").namespace("vrf"))
                .column(description())
                .key(&["tenant", "vrf"])
                .relation(RelationSpec::reverse("tenant", "fvTenant", "vrfs")),
        )
        .with_type(
            TypeSpec::new("fvBD", "bd")
                .column(tenant())
                .column(ColumnSpec::attribute("bd", "name").namespace("bd"))
                .column(ColumnSpec::related("vrf", "vrf", "name").namespace("vrf"))
                .column(description())
                .column(
                    ColumnSpec::attribute("enable_routing", "unicastRoute")
                        .default_value("yes")
                        .map(yes_no),
                )
                .column(
                    ColumnSpec::attribute("arp_flooding", "arpFlood")
                        .default_value("no")
                        .map(yes_no),
                )
                .key(&["tenant", "bd"])
                .relation(RelationSpec::reverse("tenant", "fvTenant", "bds"))
                .relation(
                    RelationSpec::reference("vrf", "tnFvCtxName")
                        .via("fvRsCtx")
                        .to("fvCtx")
                        .named_in("fvTenant", "ctx-")
                        .fallback(COMMON_TENANT),
                )
                .relation(RelationSpec::children("subnets", "fvSubnet"))
                .relation(RelationSpec::children("l3out_links", "fvRsBDToOut")),
        )
        .with_type(
            TypeSpec::new("fvSubnet", "bd_subnet")
                .column(tenant())
                .column(ColumnSpec::derived("bd", bd_of).namespace("bd"))
                .column(description())
                .column(ColumnSpec::attribute("gateway", "ip").map(subnet_gateway))
                .column(ColumnSpec::attribute("mask", "ip").map(subnet_mask))
                .column(ColumnSpec::attribute("scope", "scope").default_value("private"))
                .key(&["tenant", "bd", "gateway", "mask"])
                .relation(RelationSpec::reverse("bd", "fvBD", "subnets")),
        )
        .with_type(
            TypeSpec::new("fvRsBDToOut", "bd_to_l3out")
                .column(tenant())
                .column(ColumnSpec::derived("bd", bd_of).namespace("bd"))
                .column(ColumnSpec::related("l3out", "l3out", "name").namespace("l3out").required())
                .key(&["tenant", "bd", "l3out"])
                .relation(RelationSpec::reverse("bd", "fvBD", "l3out_links"))
                .relation(
                    RelationSpec::reference("l3out", "tnL3extOutName")
                        .to("l3extOut")
                        .named_in("fvTenant", "out-")
                        .fallback(COMMON_TENANT)
                        .lookup_only(),
                ),
        )
        .with_type(
            TypeSpec::new("fvAp", "ap")
                .column(tenant())
                .column(ColumnSpec::attribute("ap", "name").namespace("ap"))
                .column(description())
                .key(&["tenant", "ap"])
                .relation(RelationSpec::reverse("tenant", "fvTenant", "aps"))
                .relation(RelationSpec::children("epgs", "fvAEPg").lookup_only()),
        )
        .with_type(
            TypeSpec::new("fvAEPg", "epg")
                .column(tenant())
                .column(ap())
                .column(ColumnSpec::attribute("epg", "name").namespace("epg"))
                .column(ColumnSpec::related("bd", "bd", "name").namespace("bd"))
                .column(description())
                .key(&["tenant", "ap", "epg"])
                .relation(RelationSpec::reverse("ap", "fvAp", "epgs"))
                .relation(
                    RelationSpec::reference("bd", "tnFvBDName")
                        .via("fvRsBd")
                        .to("fvBD")
                        .named_in("fvTenant", "BD-")
                        .fallback(COMMON_TENANT),
                )
                .relation(RelationSpec::children("domains", "fvRsDomAtt"))
                .relation(RelationSpec::children("static_paths", "fvRsPathAtt"))
                .relation(RelationSpec::reverse("aep_bindings", "infraRsFuncToEpg", "epg")),
        )
        .with_type(
            TypeSpec::new("fvRsDomAtt", "epg_to_domain")
                .column(tenant())
                .column(ap())
                .column(epg())
                .column(ColumnSpec::related("domain", "domain", "name").namespace("domain").required())
                .column(domain_type("domain"))
                .key(&["tenant", "ap", "epg", "domain"])
                .relation(RelationSpec::reverse("epg", "fvAEPg", "domains"))
                .relation(RelationSpec::reference("domain", "tDn")),
        )
        .with_type(
            TypeSpec::new("fvRsPathAtt", "epg_static_path")
                .column(tenant())
                .column(ap())
                .column(epg())
                .column(ColumnSpec::attribute("pod_id", "tDn").map(topology_pod))
                .column(ColumnSpec::attribute("node_id", "tDn").map(topology_node).namespace("node_id"))
                .column(
                    ColumnSpec::attribute("interface", "tDn")
                        .map(topology_interface)
                        .namespace("interface"),
                )
                .column(ColumnSpec::attribute("encap", "encap").map(vlan_id))
                .column(
                    ColumnSpec::attribute("interface_mode", "mode")
                        .default_value("regular")
                        .map(interface_mode),
                )
                .key(&["tenant", "ap", "epg", "pod_id", "node_id", "interface"])
                .relation(RelationSpec::reverse("epg", "fvAEPg", "static_paths")),
        )
}

fn access_types(registry: Registry) -> Registry {
    registry
        .with_type(domain_type_spec("physDomP", "physical_domain"))
        .with_type(domain_type_spec("l3extDomP", "l3_domain"))
        .with_type(
            TypeSpec::new("infraRsVlanNs", "domain_to_vlan_pool")
                .column(ColumnSpec::derived("domain", domain_of).namespace("domain"))
                .column(ColumnSpec::derived("domain_type", domain_type_of))
                .column(ColumnSpec::related("vlan_pool", "pool", "name").namespace("vlan_pool").required())
                .column(
                    ColumnSpec::related("pool_allocation_mode", "pool", "allocMode")
                        .default_value("dynamic"),
                )
                .key(&["domain_type", "domain"])
                .relation(RelationSpec::reverse("physical_domain", "physDomP", "vlan_pool_links"))
                .relation(RelationSpec::reverse("l3_domain", "l3extDomP", "vlan_pool_links"))
                .relation(RelationSpec::reference("pool", "tDn").to("fvnsVlanInstP")),
        )
        .with_type(
            TypeSpec::new("fvnsVlanInstP", "vlan_pool")
                .column(ColumnSpec::attribute("vlan_pool", "name").namespace("vlan_pool"))
                .column(ColumnSpec::attribute("pool_allocation_mode", "allocMode").default_value("dynamic"))
                .column(description())
                .key(&["vlan_pool", "pool_allocation_mode"])
                .relation(RelationSpec::children("blocks", "fvnsEncapBlk")),
        )
        .with_type(
            TypeSpec::new("fvnsEncapBlk", "vlan_pool_encap_block")
                .column(ColumnSpec::derived("vlan_pool", vlan_pool_of).namespace("vlan_pool"))
                .column(ColumnSpec::derived("pool_allocation_mode", allocation_mode_of))
                .column(ColumnSpec::attribute("block_start", "from").map(vlan_id))
                .column(ColumnSpec::attribute("block_end", "to").map(vlan_id))
                .column(description())
                .key(&["vlan_pool", "pool_allocation_mode", "block_start", "block_end"])
                .relation(RelationSpec::reverse("pool", "fvnsVlanInstP", "blocks")),
        )
        .with_type(
            TypeSpec::new("infraAttEntityP", "aep")
                .column(ColumnSpec::attribute("aep", "name").namespace("aep"))
                .column(description())
                .key(&["aep"])
                .relation(RelationSpec::reference("domains", "tDn").via("infraRsDomP").lookup_only())
                .relation(RelationSpec::children("domain_links", "infraRsDomP"))
                .relation(RelationSpec::children("epg_bindings", "infraRsFuncToEpg").lookup_only())
                .relation(RelationSpec::reverse("leaf_policy_groups", "infraAccPortGrp", "aep"))
                .relation(RelationSpec::reverse("bundle_policy_groups", "infraAccBndlGrp", "aep")),
        )
        .with_type(
            TypeSpec::new("infraRsDomP", "aep_to_domain")
                .column(ColumnSpec::derived("aep", aep_of).namespace("aep"))
                .column(ColumnSpec::related("domain", "domain", "name").namespace("domain").required())
                .column(domain_type("domain"))
                .key(&["aep", "domain_type", "domain"])
                .relation(RelationSpec::reverse("aep", "infraAttEntityP", "domain_links"))
                .relation(RelationSpec::reference("domain", "tDn").lookup_only()),
        )
        .with_type(
            TypeSpec::new("infraRsFuncToEpg", "aep_to_epg")
                .column(ColumnSpec::derived("aep", aep_of).namespace("aep"))
                .column(
                    ColumnSpec::related_value("tenant", "epg", ValueSource::Derived(tenant_of))
                        .namespace("tenant"),
                )
                .column(ColumnSpec::related_value("ap", "epg", ValueSource::Derived(ap_of)).namespace("ap"))
                .column(ColumnSpec::related("epg", "epg", "name").namespace("epg").required())
                .column(ColumnSpec::attribute("encap", "encap").map(vlan_id))
                .column(
                    ColumnSpec::attribute("interface_mode", "mode")
                        .default_value("regular")
                        .map(interface_mode),
                )
                .key(&["aep", "tenant", "ap", "epg"])
                .relation(RelationSpec::reverse("aep", "infraAttEntityP", "epg_bindings"))
                .relation(RelationSpec::reference("epg", "tDn").to("fvAEPg")),
        )
        .with_type(
            policy_group_spec("infraAccPortGrp", "interface_policy_leaf_policy_gr")
                .column(ColumnSpec::derived("lag_type", |_| Some("leaf".to_string())))
                .column(description()),
        )
        .with_type(
            policy_group_spec("infraAccBndlGrp", "interface_policy_bundle_gr")
                .column(ColumnSpec::attribute("lag_type", "lagT").default_value("link"))
                .column(ColumnSpec::child_attribute("port_channel_policy", "infraRsLacpPol", "tnLacpLagPolName"))
                .column(description()),
        )
}

/// Leaf interface profiles and the port selectors that apply policy groups
fn interface_selector_types(registry: Registry) -> Registry {
    registry
        .with_type(
            TypeSpec::new("infraAccPortP", "interface_policy_leaf_profile")
                .column(ColumnSpec::attribute("interface_profile", "name").namespace("interface_profile"))
                .column(description())
                .column(ColumnSpec::derived("type", |_| Some("leaf".to_string())))
                .key(&["interface_profile"])
                .relation(RelationSpec::children("selectors", "infraHPortS").lookup_only()),
        )
        .with_type(
            TypeSpec::new("infraHPortS", "access_port_to_int_policy_leaf")
                .column(
                    ColumnSpec::derived("interface_profile", |p| dn::rn_value(p, "accportprof-"))
                        .namespace("interface_profile"),
                )
                .column(ColumnSpec::attribute("access_port_selector", "name"))
                .column(description())
                .column(
                    ColumnSpec::related("policy_group", "policy_group", "name")
                        .namespace("policy_group")
                        .required(),
                )
                .column(ColumnSpec::child_attribute("port_blk", "infraPortBlk", "name"))
                .column(ColumnSpec::child_attribute("from_port", "infraPortBlk", "fromPort"))
                .column(ColumnSpec::child_attribute("to_port", "infraPortBlk", "toPort"))
                .key(&["interface_profile", "access_port_selector"])
                .relation(RelationSpec::reverse("interface_profile", "infraAccPortP", "selectors"))
                .relation(RelationSpec::reference("policy_group", "tDn").via("infraRsAccBaseGrp")),
        )
}

fn l3out_types(registry: Registry) -> Registry {
    registry
        .with_type(
            TypeSpec::new("l3extOut", "l3out")
                .column(tenant())
                .column(ColumnSpec::attribute("l3out", "name").namespace("l3out"))
                .column(ColumnSpec::related("vrf", "vrf", "name").namespace("vrf"))
                .column(ColumnSpec::related("domain", "domain", "name").namespace("domain"))
                .column(ColumnSpec::attribute("route_control", "enforceRtctrl").default_value("export"))
                .column(description())
                .key(&["tenant", "l3out"])
                .relation(RelationSpec::reverse("tenant", "fvTenant", "l3outs"))
                .relation(
                    RelationSpec::reference("vrf", "tnFvCtxName")
                        .via("l3extRsEctx")
                        .to("fvCtx")
                        .named_in("fvTenant", "ctx-")
                        .fallback(COMMON_TENANT),
                )
                .relation(
                    RelationSpec::reference("domain", "tDn")
                        .via("l3extRsL3DomAtt")
                        .to("l3extDomP"),
                )
                .relation(RelationSpec::children("node_profiles", "l3extLNodeP"))
                .relation(RelationSpec::children("external_epgs", "l3extInstP"))
                .relation(RelationSpec::children("route_maps", "rtctrlProfile"))
                .relation(RelationSpec::children("default_route_leak", "l3extDefaultRouteLeakP")),
        )
        .with_type(
            TypeSpec::new("l3extLNodeP", "l3out_logical_node_profile")
                .column(tenant())
                .column(l3out())
                .column(ColumnSpec::attribute("node_profile", "name").namespace("node_profile"))
                .column(description())
                .key(&["tenant", "l3out", "node_profile"])
                .relation(RelationSpec::reverse("l3out", "l3extOut", "node_profiles"))
                .relation(RelationSpec::children("nodes", "l3extRsNodeL3OutAtt"))
                .relation(RelationSpec::children("interface_profiles", "l3extLIfP"))
                .relation(RelationSpec::children("bgp_protocol", "bgpProtP")),
        )
        .with_type(
            TypeSpec::new("l3extRsNodeL3OutAtt", "l3out_logical_node")
                .column(tenant())
                .column(l3out())
                .column(node_profile())
                .column(ColumnSpec::attribute("pod_id", "tDn").map(topology_pod))
                .column(ColumnSpec::attribute("node_id", "tDn").map(topology_node).namespace("node_id"))
                .column(ColumnSpec::attribute("router_id", "rtrId"))
                .column(
                    ColumnSpec::attribute("router_id_as_loopback", "rtrIdLoopBack")
                        .default_value("no"),
                )
                .key(&["tenant", "l3out", "node_profile", "node_id"])
                .relation(RelationSpec::reverse("node_profile", "l3extLNodeP", "nodes")),
        )
        .with_type(
            TypeSpec::new("l3extLIfP", "l3out_logical_interface_profile")
                .column(tenant())
                .column(l3out())
                .column(node_profile())
                .column(ColumnSpec::attribute("interface_profile", "name").namespace("interface_profile"))
                .column(description())
                .key(&["tenant", "l3out", "node_profile", "interface_profile"])
                .relation(RelationSpec::reverse("node_profile", "l3extLNodeP", "interface_profiles"))
                .relation(RelationSpec::children("interfaces", "l3extRsPathL3OutAtt"))
                .relation(RelationSpec::children("floating_svis", "l3extVirtualLIfP"))
                .relation(RelationSpec::children("bfd", "bfdIfP")),
        )
        .with_type(
            TypeSpec::new("l3extRsPathL3OutAtt", "l3out_interface")
                .column(tenant())
                .column(l3out())
                .column(node_profile())
                .column(interface_profile())
                .column(ColumnSpec::attribute("pod_id", "tDn").map(topology_pod))
                .column(ColumnSpec::attribute("node_id", "tDn").map(topology_node).namespace("node_id"))
                .column(
                    ColumnSpec::attribute("path_ep", "tDn")
                        .map(topology_interface)
                        .namespace("interface"),
                )
                .column(ColumnSpec::attribute("interface_type", "ifInstT"))
                .column(ColumnSpec::attribute("encap", "encap"))
                .column(ColumnSpec::attribute("mode", "mode").default_value("regular"))
                .column(ColumnSpec::attribute("address", "addr"))
                .column(ColumnSpec::attribute("mtu", "mtu").default_value("inherit"))
                .key(&[
                    "tenant",
                    "l3out",
                    "node_profile",
                    "interface_profile",
                    "node_id",
                    "path_ep",
                ])
                .relation(RelationSpec::reverse("interface_profile", "l3extLIfP", "interfaces"))
                .relation(RelationSpec::children("bgp_peers", "bgpPeerP"))
                .relation(RelationSpec::children("vpc_members", "l3extMember")),
        )
}

/// BGP and BFD settings of node and interface profiles, peers and vPC members
/// of routed paths
fn l3out_peering_types(registry: Registry) -> Registry {
    registry
        .with_type(
            TypeSpec::new("bgpProtP", "l3out_bgp_protocol_profile")
                .column(tenant())
                .column(l3out())
                .column(node_profile())
                .column(ColumnSpec::child_attribute("bgp_timers_policy", "bgpRsPeerPfxPol", "tnBgpPeerPfxPolName"))
                .column(description())
                .key(&["tenant", "l3out", "node_profile"])
                .relation(RelationSpec::reverse("node_profile", "l3extLNodeP", "bgp_protocol")),
        )
        .with_type(
            TypeSpec::new("bfdIfP", "l3out_bfd_interface_profile")
                .column(tenant())
                .column(l3out())
                .column(node_profile())
                .column(interface_profile())
                .column(ColumnSpec::child_attribute("bfd_interface_policy", "bfdRsIfPol", "tnBfdIfPolName"))
                .key(&["tenant", "l3out", "node_profile", "interface_profile"])
                .relation(RelationSpec::reverse("interface_profile", "l3extLIfP", "bfd")),
        )
        .with_type(
            bgp_peer_spec(
                "l3extRsPathL3OutAtt",
                "l3out_bgp_peer",
                [
                    ColumnSpec::derived("pod_id", routed_pod),
                    ColumnSpec::derived("node_id", routed_node).namespace("node_id"),
                    ColumnSpec::derived("path_ep", routed_interface).namespace("interface"),
                ],
            )
            .column(ColumnSpec::attribute("bgp_controls", "ctrl"))
            .column(ColumnSpec::attribute("peer_controls", "peerCtrl"))
            .key(&[
                "tenant",
                "l3out",
                "node_profile",
                "interface_profile",
                "node_id",
                "path_ep",
                "peer_ip",
            ])
            .relation(RelationSpec::reverse("interface", "l3extRsPathL3OutAtt", "bgp_peers")),
        )
        .with_type(
            TypeSpec::new("l3extMember", "l3out_logical_interface_vpc_mem")
                .within("l3extRsPathL3OutAtt")
                .column(tenant())
                .column(l3out())
                .column(node_profile())
                .column(interface_profile())
                .column(ColumnSpec::derived("pod_id", routed_pod))
                .column(ColumnSpec::derived("node_id", routed_node).namespace("node_id"))
                .column(ColumnSpec::derived("path_ep", routed_interface).namespace("interface"))
                .column(ColumnSpec::attribute("side", "side"))
                .column(ColumnSpec::attribute("address", "addr"))
                .column(ColumnSpec::attribute("ipv6_dad", "ipv6Dad").default_value("enabled"))
                .column(description())
                .key(&[
                    "tenant",
                    "l3out",
                    "node_profile",
                    "interface_profile",
                    "node_id",
                    "path_ep",
                    "side",
                ])
                .relation(RelationSpec::reverse("interface", "l3extRsPathL3OutAtt", "vpc_members")),
        )
}

/// Floating SVIs: the anchor interface, its dynamic paths, their secondary
/// addresses and the BGP peers configured on it
fn floating_svi_types(registry: Registry) -> Registry {
    registry
        .with_type(
            TypeSpec::new("l3extVirtualLIfP", "l3out_floating_svi")
                .column(tenant())
                .column(l3out())
                .column(node_profile())
                .column(interface_profile())
                .column(ColumnSpec::attribute("pod_id", "nodeDn").map(topology_pod))
                .column(ColumnSpec::attribute("node_id", "nodeDn").map(topology_node).namespace("node_id"))
                .column(ColumnSpec::attribute("encap", "encap"))
                .column(ColumnSpec::attribute("encap_scope", "encapScope").default_value("local"))
                .column(ColumnSpec::attribute("address", "addr"))
                .column(ColumnSpec::attribute("mode", "mode").default_value("regular"))
                .column(ColumnSpec::attribute("auto_state", "autostate").default_value("enabled"))
                .column(ColumnSpec::attribute("dscp", "targetDscp").default_value("unspecified"))
                .column(ColumnSpec::attribute("ipv6_dad", "ipv6Dad").default_value("enabled"))
                .column(ColumnSpec::attribute("mtu", "mtu").default_value("inherit"))
                .key(&["tenant", "l3out", "node_profile", "interface_profile", "node_id", "encap"])
                .relation(RelationSpec::reverse("interface_profile", "l3extLIfP", "floating_svis"))
                .relation(RelationSpec::children("paths", "l3extRsDynPathAtt"))
                .relation(RelationSpec::children("secondary_ips", "l3extIp"))
                .relation(RelationSpec::children("bgp_peers", "bgpPeerP")),
        )
        .with_type(
            floating_spec("l3extRsDynPathAtt", "l3out_floating_svi_path")
                .column(ColumnSpec::attribute("access_encap", "encap"))
                .column(ColumnSpec::related("domain", "domain", "name").namespace("domain").required())
                .column(domain_type("domain"))
                .column(ColumnSpec::attribute("floating_ip", "floatingAddr"))
                .key(&[
                    "tenant",
                    "l3out",
                    "node_profile",
                    "interface_profile",
                    "node_id",
                    "encap",
                    "domain",
                ])
                .relation(RelationSpec::reverse("svi", "l3extVirtualLIfP", "paths"))
                .relation(RelationSpec::reference("domain", "tDn"))
                .relation(RelationSpec::children("secondary_ips", "l3extIp")),
        )
        .with_type(
            floating_spec("l3extIp", "l3out_floating_svi_secondary_ip")
                .within("l3extVirtualLIfP")
                .column(ColumnSpec::attribute("secondary_ip", "addr"))
                .column(description())
                .key(&[
                    "tenant",
                    "l3out",
                    "node_profile",
                    "interface_profile",
                    "node_id",
                    "encap",
                    "secondary_ip",
                ])
                .relation(RelationSpec::reverse("svi", "l3extVirtualLIfP", "secondary_ips")),
        )
        .with_type(
            floating_spec("l3extIp", "l3out_floating_svi_path_sec")
                .within("l3extRsDynPathAtt")
                .column(ColumnSpec::derived("domain", dynamic_path_domain).namespace("domain"))
                .column(ColumnSpec::attribute("secondary_ip", "addr"))
                .column(description())
                .key(&[
                    "tenant",
                    "l3out",
                    "node_profile",
                    "interface_profile",
                    "node_id",
                    "encap",
                    "domain",
                    "secondary_ip",
                ])
                .relation(RelationSpec::reverse("path", "l3extRsDynPathAtt", "secondary_ips")),
        )
        .with_type(
            bgp_peer_spec(
                "l3extVirtualLIfP",
                "l3out_bgp_peer_floating",
                [
                    ColumnSpec::derived("pod_id", floating_pod),
                    ColumnSpec::derived("node_id", floating_node).namespace("node_id"),
                    ColumnSpec::derived("vlan", floating_vlan),
                ],
            )
            .column(ColumnSpec::attribute("ttl", "ttl").default_value("1"))
            .column(ColumnSpec::attribute("weight", "weight").default_value("0"))
            .column(ColumnSpec::attribute("bgp_controls", "ctrl"))
            .column(ColumnSpec::attribute("peer_controls", "peerCtrl"))
            .column(ColumnSpec::attribute("address_type_controls", "addrTCtrl"))
            .key(&[
                "tenant",
                "l3out",
                "node_profile",
                "interface_profile",
                "node_id",
                "vlan",
                "peer_ip",
            ])
            .relation(RelationSpec::reverse("svi", "l3extVirtualLIfP", "bgp_peers")),
        )
}

/// External EPGs of an L3Out with their subnets and contracts
fn external_epg_types(registry: Registry) -> Registry {
    registry
        .with_type(
            TypeSpec::new("l3extInstP", "l3out_extepg")
                .column(tenant())
                .column(l3out())
                .column(ColumnSpec::attribute("extepg", "name").namespace("extepg"))
                .column(description())
                .column(
                    ColumnSpec::child_attribute(
                        "route_control_profile_import",
                        "l3extRsInstPToProfile",
                        "tnRtctrlProfileName",
                    )
                    .when("direction", "import")
                    .namespace("route_control_profile"),
                )
                .column(
                    ColumnSpec::child_attribute(
                        "route_control_profile_export",
                        "l3extRsInstPToProfile",
                        "tnRtctrlProfileName",
                    )
                    .when("direction", "export")
                    .namespace("route_control_profile"),
                )
                .key(&["tenant", "l3out", "extepg"])
                .relation(RelationSpec::reverse("l3out", "l3extOut", "external_epgs"))
                .relation(RelationSpec::children("subnets", "l3extSubnet"))
                .relation(RelationSpec::children("consumed", "fvRsCons"))
                .relation(RelationSpec::children("provided", "fvRsProv")),
        )
        .with_type(
            TypeSpec::new("l3extSubnet", "l3out_extsubnet")
                .column(tenant())
                .column(l3out())
                .column(extepg())
                .column(ColumnSpec::attribute("network", "ip"))
                .column(ColumnSpec::attribute("scope", "scope").default_value("import-security"))
                .column(ColumnSpec::attribute("subnet_name", "name"))
                .column(description())
                .key(&["tenant", "l3out", "extepg", "network"])
                .relation(RelationSpec::reverse("extepg", "l3extInstP", "subnets")),
        )
        .with_type(
            TypeSpec::new("fvRsCons", "l3out_extepg_to_contract")
                .also("fvRsProv")
                .within("l3extInstP")
                .column(tenant())
                .column(l3out())
                .column(extepg())
                .column(ColumnSpec::attribute("contract", "tnVzBrCPName"))
                .column(ColumnSpec::derived("contract_type", contract_role))
                .key(&["tenant", "l3out", "extepg", "contract", "contract_type"])
                .relation(RelationSpec::reverse("consumer", "l3extInstP", "consumed"))
                .relation(RelationSpec::reverse("provider", "l3extInstP", "provided")),
        )
        .with_type(
            TypeSpec::new("l3extDefaultRouteLeakP", "l3out_default_route_leak_policy")
                .column(tenant())
                .column(l3out())
                .column(ColumnSpec::attribute("always", "always").default_value("yes"))
                .column(ColumnSpec::attribute("criteria", "criteria").default_value("only"))
                .column(ColumnSpec::attribute("scope", "scope").default_value("l3-out"))
                .key(&["tenant", "l3out"])
                .relation(RelationSpec::reverse("l3out", "l3extOut", "default_route_leak")),
        )
}

/// Route maps of an L3Out and the tenant match rules they reference
fn route_control_types(registry: Registry) -> Registry {
    registry
        .with_type(
            TypeSpec::new("rtctrlProfile", "route_control_profile")
                .column(tenant())
                .column(l3out())
                .column(ColumnSpec::attribute("route_control_profile", "name").namespace("route_control_profile"))
                .column(description())
                .key(&["tenant", "l3out", "route_control_profile"])
                .relation(RelationSpec::reverse("l3out", "l3extOut", "route_maps"))
                .relation(RelationSpec::children("contexts", "rtctrlCtxP")),
        )
        .with_type(
            TypeSpec::new("rtctrlCtxP", "route_control_context")
                .column(tenant())
                .column(l3out())
                .column(
                    ColumnSpec::derived("route_control_profile", |p| dn::rn_value(p, "prof-"))
                        .namespace("route_control_profile"),
                )
                .column(ColumnSpec::attribute("route_control_context", "name").namespace("route_control_context"))
                .column(ColumnSpec::attribute("action", "action").default_value("permit"))
                .column(ColumnSpec::attribute("order", "order").default_value("0"))
                .column(ColumnSpec::related("match_rule", "match_rule", "name").namespace("match_rule"))
                .key(&["tenant", "l3out", "route_control_profile", "route_control_context"])
                .relation(RelationSpec::reverse("profile", "rtctrlProfile", "contexts"))
                .relation(
                    RelationSpec::reference("match_rule", "tnRtctrlSubjPName")
                        .via("rtctrlRsCtxPToSubjP")
                        .to("rtctrlSubjP")
                        .named_in("fvTenant", "subj-")
                        .fallback(COMMON_TENANT),
                ),
        )
        .with_type(
            TypeSpec::new("rtctrlSubjP", "match_rule")
                .column(tenant())
                .column(ColumnSpec::attribute("match_rule", "name").namespace("match_rule"))
                .column(description())
                .key(&["tenant", "match_rule"])
                .relation(RelationSpec::reverse("tenant", "fvTenant", "match_rules"))
                .relation(RelationSpec::children("destinations", "rtctrlMatchRtDest")),
        )
        .with_type(
            TypeSpec::new("rtctrlMatchRtDest", "match_route_destination")
                .column(tenant())
                .column(ColumnSpec::derived("match_rule", |p| dn::rn_value(p, "subj-")).namespace("match_rule"))
                .column(ColumnSpec::attribute("ip", "ip"))
                .column(ColumnSpec::attribute("aggregate", "aggregate").default_value("no"))
                .column(description())
                .key(&["tenant", "match_rule", "ip"])
                .relation(RelationSpec::reverse("match_rule", "rtctrlSubjP", "destinations")),
        )
}

fn domain_type_spec(class: &'static str, table: &'static str) -> TypeSpec {
    TypeSpec::new(class, table)
        .column(ColumnSpec::attribute("domain", "name").namespace("domain"))
        .column(description())
        .key(&["domain"])
        .relation(RelationSpec::children("vlan_pool_links", "infraRsVlanNs"))
        .relation(RelationSpec::reverse("aeps", "infraAttEntityP", "domains"))
}

fn policy_group_spec(class: &'static str, table: &'static str) -> TypeSpec {
    TypeSpec::new(class, table)
        .column(ColumnSpec::attribute("policy_group", "name").namespace("policy_group"))
        .column(ColumnSpec::related("aep", "aep", "name").namespace("aep"))
        .column(ColumnSpec::child_attribute("link_level_policy", "infraRsHIfPol", "tnFabricHIfPolName"))
        .column(ColumnSpec::child_attribute("cdp_policy", "infraRsCdpIfPol", "tnCdpIfPolName"))
        .column(ColumnSpec::child_attribute("lldp_policy", "infraRsLldpIfPol", "tnLldpIfPolName"))
        .column(ColumnSpec::child_attribute("mcp_policy", "infraRsMcpIfPol", "tnMcpIfPolName"))
        .column(ColumnSpec::child_attribute("stp_interface_policy", "infraRsStpIfPol", "tnStpIfPolName"))
        .column(ColumnSpec::child_attribute("l2_interface_policy", "infraRsL2IfPol", "tnL2IfPolName"))
        .key(&["policy_group"])
        .relation(
            RelationSpec::reference("aep", "tDn")
                .via("infraRsAttEntP")
                .to("infraAttEntityP"),
        )
        .relation(RelationSpec::reverse("selectors", "infraHPortS", "policy_group"))
}

/// BGP peer columns shared by routed-path and floating SVI peers; the
/// location columns and the key come from the caller
fn bgp_peer_spec(parent: &'static str, table: &'static str, location: [ColumnSpec; 3]) -> TypeSpec {
    let spec = TypeSpec::new("bgpPeerP", table)
        .within(parent)
        .column(tenant())
        .column(l3out())
        .column(node_profile())
        .column(interface_profile());
    location
        .into_iter()
        .fold(spec, TypeSpec::column)
        .column(ColumnSpec::attribute("peer_ip", "addr"))
        .column(ColumnSpec::child_attribute("remote_asn", "bgpAsP", "asn"))
        .column(ColumnSpec::attribute("admin_state", "adminSt").default_value("enabled"))
        .column(ColumnSpec::child_attribute("local_as_number", "bgpLocalAsnP", "localAsn"))
        .column(ColumnSpec::child_attribute("local_as_number_config", "bgpLocalAsnP", "asnPropagate"))
}

/// Objects below a floating SVI, located by the SVI's node and encap
fn floating_spec(class: &'static str, table: &'static str) -> TypeSpec {
    TypeSpec::new(class, table)
        .column(tenant())
        .column(l3out())
        .column(node_profile())
        .column(interface_profile())
        .column(ColumnSpec::derived("pod_id", floating_pod))
        .column(ColumnSpec::derived("node_id", floating_node).namespace("node_id"))
        .column(ColumnSpec::derived("encap", floating_encap))
}

// shared column shapes

fn tenant() -> ColumnSpec {
    ColumnSpec::derived("tenant", tenant_of).namespace("tenant")
}

fn ap() -> ColumnSpec {
    ColumnSpec::derived("ap", ap_of).namespace("ap")
}

fn epg() -> ColumnSpec {
    ColumnSpec::derived("epg", |p| dn::rn_value(p, "epg-")).namespace("epg")
}

fn l3out() -> ColumnSpec {
    ColumnSpec::derived("l3out", |p| dn::rn_value(p, "out-")).namespace("l3out")
}

fn node_profile() -> ColumnSpec {
    ColumnSpec::derived("node_profile", |p| dn::rn_value(p, "lnodep-")).namespace("node_profile")
}

fn interface_profile() -> ColumnSpec {
    ColumnSpec::derived("interface_profile", |p| dn::rn_value(p, "lifp-")).namespace("interface_profile")
}

fn extepg() -> ColumnSpec {
    ColumnSpec::derived("extepg", |p| dn::rn_value(p, "instP-")).namespace("extepg")
}

fn description() -> ColumnSpec {
    ColumnSpec::attribute("description", "descr")
}

/// Kind of the domain reached through `relation`
fn domain_type(relation: &'static str) -> ColumnSpec {
    ColumnSpec::related_value("domain_type", relation, ValueSource::Derived(domain_type_of))
}

// path readers

fn tenant_of(path: &str) -> Option<String> {
    dn::rn_value(path, "tn-")
}

fn ap_of(path: &str) -> Option<String> {
    dn::rn_value(path, "ap-")
}

fn bd_of(path: &str) -> Option<String> {
    dn::rn_value(path, "BD-")
}

fn aep_of(path: &str) -> Option<String> {
    dn::rn_value(path, "attentp-")
}

fn domain_of(path: &str) -> Option<String> {
    ["phys-", "l3dom-"]
        .iter()
        .find_map(|prefix| dn::rn_value(path, prefix))
}

fn domain_type_of(path: &str) -> Option<String> {
    let kind = match dn::split_rns(path).get(1) {
        Some(rn) if rn.starts_with("phys-") => "phys",
        Some(rn) if rn.starts_with("l3dom-") => "l3dom",
        Some(rn) if rn.starts_with("vmmp-") => "vmm",
        _ => return None,
    };
    Some(kind.to_string())
}

/// `uni/infra/vlanns-[pool-a]-static/...` gives `pool-a`
fn vlan_pool_of(path: &str) -> Option<String> {
    let value = dn::rn_value(path, "vlanns-")?;
    dn::bracketed(&value).map(str::to_string)
}

/// `uni/infra/vlanns-[pool-a]-static/...` gives `static`
fn allocation_mode_of(path: &str) -> Option<String> {
    let value = dn::rn_value(path, "vlanns-")?;
    value.rsplit_once("]-").map(|(_, mode)| mode.to_string())
}

/// Topology path of the routed path an object sits under
fn routed_path(path: &str) -> Option<dn::TopologyPath> {
    dn::rn_value(path, "rspathL3OutAtt-").map(|tdn| parse_topology_path(&tdn))
}

fn routed_pod(path: &str) -> Option<String> {
    routed_path(path).map(|p| p.pod_id)
}

fn routed_node(path: &str) -> Option<String> {
    routed_path(path).map(|p| p.node_id)
}

fn routed_interface(path: &str) -> Option<String> {
    routed_path(path).map(|p| p.interface)
}

/// `.../vlifp-[topology/pod-1/node-103]-[vlan-200]/...` gives the node path
/// and the encap
fn floating_svi(path: &str) -> Option<(String, String)> {
    let value = dn::rn_value(path, "vlifp-")?;
    let node = dn::bracketed(&value)?;
    let rest = value[node.len() + 2..].strip_prefix('-')?;
    let encap = dn::bracketed(rest)?;
    Some((node.to_string(), encap.to_string()))
}

fn floating_pod(path: &str) -> Option<String> {
    floating_svi(path).map(|(node, _)| parse_topology_path(&node).pod_id)
}

fn floating_node(path: &str) -> Option<String> {
    floating_svi(path).map(|(node, _)| parse_topology_path(&node).node_id)
}

fn floating_encap(path: &str) -> Option<String> {
    floating_svi(path).map(|(_, encap)| encap)
}

fn floating_vlan(path: &str) -> Option<String> {
    floating_encap(path).map(|encap| vlan_id(&encap))
}

/// Domain name of the dynamic path an object sits under
fn dynamic_path_domain(path: &str) -> Option<String> {
    let target = dn::rn_value(path, "rsdynPathAtt-")?;
    domain_of(&target)
}

fn contract_role(path: &str) -> Option<String> {
    let rn = dn::last_rn(path)?;
    let role = if rn.starts_with("rscons-") {
        "consumer"
    } else if rn.starts_with("rsprov-") {
        "provider"
    } else {
        return None;
    };
    Some(role.to_string())
}

// value transforms

fn yes_no(value: &str) -> String {
    (value == "yes").to_string()
}

fn vlan_id(encap: &str) -> String {
    dn::vlan_number(encap).unwrap_or_else(|| encap.to_string())
}

fn interface_mode(mode: &str) -> String {
    match mode {
        "regular" => "trunk",
        "untagged" => "access",
        "native" => "802.1p",
        other => other,
    }
    .to_string()
}

fn subnet_gateway(ip: &str) -> String {
    ip.split('/').next().unwrap_or(ip).to_string()
}

fn subnet_mask(ip: &str) -> String {
    ip.split_once('/').map(|(_, mask)| mask).unwrap_or("24").to_string()
}

fn topology_pod(tdn: &str) -> String {
    parse_topology_path(tdn).pod_id
}

fn topology_node(tdn: &str) -> String {
    parse_topology_path(tdn).node_id
}

fn topology_interface(tdn: &str) -> String {
    parse_topology_path(tdn).interface
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_valid() {
        registry().validate().unwrap();
        assert_eq!(registry().types().len(), 43);
    }

    #[test]
    fn test_expected_tables_are_declared() {
        for table in [
            "tenant",
            "vrf",
            "bd",
            "bd_subnet",
            "bd_to_l3out",
            "ap",
            "epg",
            "epg_to_domain",
            "epg_static_path",
            "physical_domain",
            "l3_domain",
            "vlan_pool",
            "vlan_pool_encap_block",
            "domain_to_vlan_pool",
            "aep",
            "aep_to_domain",
            "interface_policy_leaf_policy_gr",
            "interface_policy_bundle_gr",
            "l3out",
            "l3out_logical_node_profile",
            "l3out_logical_node",
            "l3out_logical_interface_profile",
            "l3out_interface",
            "aep_to_epg",
            "interface_policy_leaf_profile",
            "access_port_to_int_policy_leaf",
            "l3out_bgp_protocol_profile",
            "l3out_bfd_interface_profile",
            "l3out_bgp_peer",
            "l3out_logical_interface_vpc_mem",
            "l3out_floating_svi",
            "l3out_floating_svi_path",
            "l3out_floating_svi_secondary_ip",
            "l3out_floating_svi_path_sec",
            "l3out_bgp_peer_floating",
            "l3out_extepg",
            "l3out_extsubnet",
            "l3out_extepg_to_contract",
            "l3out_default_route_leak_policy",
            "route_control_profile",
            "route_control_context",
            "match_rule",
            "match_route_destination",
        ] {
            assert!(registry().table(table).is_some(), "missing table {}", table);
        }
    }

    #[test]
    fn test_derived_namespaces() {
        let vrf = registry().namespace("vrf").unwrap();
        let derivation = vrf.derivation.as_ref().unwrap();
        assert_eq!(derivation.from, "tenant");
        assert_eq!(derivation.derive("Prod-TN"), "Prod-VRF");

        let ap = registry().namespace("ap").unwrap();
        assert_eq!(ap.derivation.as_ref().unwrap().derive("Prod-TN"), "Prod-ANP");
        assert!(!registry().namespace("interface").unwrap().unique);
    }

    #[test]
    fn test_path_readers() {
        let blk = "uni/infra/vlanns-[pool-a]-static/from-[vlan-100]-to-[vlan-199]";
        assert_eq!(vlan_pool_of(blk).as_deref(), Some("pool-a"));
        assert_eq!(allocation_mode_of(blk).as_deref(), Some("static"));
        assert_eq!(domain_of("uni/l3dom-wan/rsvlanNs").as_deref(), Some("wan"));
        assert_eq!(domain_type_of("uni/phys-dom").as_deref(), Some("phys"));
        assert_eq!(domain_type_of("uni/tn-A"), None);
    }

    #[test]
    fn test_one_class_in_several_tables() {
        let tables: Vec<&str> = registry().specs_for_class("bgpPeerP").map(|spec| spec.table).collect();
        assert_eq!(tables, ["l3out_bgp_peer", "l3out_bgp_peer_floating"]);

        let contracts = registry().type_spec("fvRsProv").unwrap();
        assert_eq!(contracts.table, "l3out_extepg_to_contract");
        assert!(contracts.declares("fvRsCons"));
    }

    #[test]
    fn test_location_readers() {
        let peer = "uni/tn-A/out-wan/lnodep-n/lifp-i/rspathL3OutAtt-[topology/pod-2/paths-101/pathep-[eth1/10]]/peerP-[192.0.2.2]";
        assert_eq!(routed_pod(peer).as_deref(), Some("2"));
        assert_eq!(routed_node(peer).as_deref(), Some("101"));
        assert_eq!(routed_interface(peer).as_deref(), Some("eth1/10"));

        let ip = "uni/tn-A/out-edge/lnodep-n/lifp-svi/vlifp-[topology/pod-1/node-103]-[vlan-200]/rsdynPathAtt-[uni/phys-servers]/addr-[198.51.100.3/24]";
        assert_eq!(floating_pod(ip).as_deref(), Some("1"));
        assert_eq!(floating_node(ip).as_deref(), Some("103"));
        assert_eq!(floating_encap(ip).as_deref(), Some("vlan-200"));
        assert_eq!(floating_vlan(ip).as_deref(), Some("200"));
        assert_eq!(dynamic_path_domain(ip).as_deref(), Some("servers"));
        assert_eq!(floating_node("uni/tn-A/out-edge/lnodep-n/lifp-svi"), None);

        assert_eq!(contract_role("uni/tn-A/out-wan/instP-all/rsprov-web").as_deref(), Some("provider"));
        assert_eq!(contract_role("uni/tn-A/out-wan/instP-all/rscons-web").as_deref(), Some("consumer"));
        assert_eq!(contract_role("uni/tn-A/out-wan/instP-all"), None);
    }

    #[test]
    fn test_value_transforms() {
        assert_eq!(vlan_id("vlan-100"), "100");
        assert_eq!(interface_mode("untagged"), "access");
        assert_eq!(interface_mode("weird"), "weird");
        assert_eq!(subnet_gateway("10.0.0.1/24"), "10.0.0.1");
        assert_eq!(subnet_mask("10.0.0.1"), "24");
        assert_eq!(topology_node("topology/pod-1/protpaths-101-102/pathep-[vpc]"), "101-102");
    }
}
