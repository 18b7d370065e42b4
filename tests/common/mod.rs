#![allow(dead_code)]

use aci_slice::{Row, Table};
use serde_json::{json, Value};

/// A small fabric: one production tenant with web/db tiers, a routed L3Out,
/// a floating SVI L3Out, the access policies behind the physical domain, and
/// a few distractors that must never be extracted.
pub fn fabric() -> Value {
    json!({"polUni": {"attributes": {"dn": ""}, "children": [
        {"fvTenant": {"attributes": {"name": "common"}, "children": [
            {"fvCtx": {"attributes": {"name": "shared"}}}
        ]}},
        {"fvTenant": {"attributes": {"name": "Prod-TN", "descr": "production"}, "children": [
            {"fvCtx": {"attributes": {"name": "Prod-VRF"}}},
            {"fvCtx": {"attributes": {"name": "unused"}}},
            {"fvBD": {"attributes": {"name": "web", "arpFlood": "yes"}, "children": [
                {"fvRsCtx": {"attributes": {"tnFvCtxName": "Prod-VRF"}}},
                {"fvSubnet": {"attributes": {"ip": "10.1.1.1/24", "scope": "public"}}},
                {"fvRsBDToOut": {"attributes": {"tnL3extOutName": "wan"}}},
                {"fvRsBDToOut": {"attributes": {"tnL3extOutName": "other"}}}
            ]}},
            {"fvBD": {"attributes": {"name": "db", "unicastRoute": "no"}, "children": [
                {"fvRsCtx": {"attributes": {"tnFvCtxName": "shared"}}}
            ]}},
            {"fvBD": {"attributes": {"name": "orphan"}, "children": [
                {"fvRsCtx": {"attributes": {"tnFvCtxName": "gone"}}}
            ]}},
            {"fvAp": {"attributes": {"name": "Prod-ANP"}, "children": [
                {"fvAEPg": {"attributes": {"name": "front", "descr": "web tier"}, "children": [
                    {"fvRsBd": {"attributes": {"tnFvBDName": "web"}}},
                    {"fvRsDomAtt": {"attributes": {"tDn": "uni/phys-servers"}}},
                    {"fvRsDomAtt": {"attributes": {"tDn": "uni/vmmp-VMware/dom-dvs"}}},
                    {"fvRsPathAtt": {"attributes": {
                        "tDn": "topology/pod-1/paths-101/pathep-[eth1/1]",
                        "encap": "vlan-100",
                        "mode": "untagged"
                    }}},
                    {"fvRsPathAtt": {"attributes": {
                        "tDn": "topology/pod-1/protpaths-101-102/pathep-[vpc-web]",
                        "encap": "vlan-100"
                    }}}
                ]}},
                {"fvAEPg": {"attributes": {"name": "back"}, "children": [
                    {"fvRsBd": {"attributes": {"tnFvBDName": "db"}}}
                ]}},
                {"fvAEPg": {"attributes": {"name": "lonely"}, "children": [
                    {"fvRsBd": {"attributes": {"tnFvBDName": "orphan"}}}
                ]}}
            ]}},
            {"l3extOut": {"attributes": {"name": "wan", "enforceRtctrl": "export,import"}, "children": [
                {"l3extRsEctx": {"attributes": {"tnFvCtxName": "Prod-VRF"}}},
                {"l3extRsL3DomAtt": {"attributes": {"tDn": "uni/l3dom-wan-dom"}}},
                {"l3extLNodeP": {"attributes": {"name": "border"}, "children": [
                    {"l3extRsNodeL3OutAtt": {"attributes": {
                        "tDn": "topology/pod-1/node-101",
                        "rtrId": "1.1.1.1"
                    }}},
                    {"l3extLIfP": {"attributes": {"name": "uplinks"}, "children": [
                        {"l3extRsPathL3OutAtt": {"attributes": {
                            "tDn": "topology/pod-1/paths-101/pathep-[eth1/10]",
                            "ifInstT": "l3-port",
                            "addr": "192.0.2.1/30"
                        }, "children": [
                            {"bgpPeerP": {"attributes": {"addr": "192.0.2.2", "ctrl": "send-com"}, "children": [
                                {"bgpAsP": {"attributes": {"asn": "65001"}}}
                            ]}}
                        ]}},
                        {"bfdIfP": {"attributes": {}, "children": [
                            {"bfdRsIfPol": {"attributes": {"tnBfdIfPolName": "bfd-fast"}}}
                        ]}}
                    ]}},
                    {"bgpProtP": {"attributes": {}, "children": [
                        {"bgpRsPeerPfxPol": {"attributes": {"tnBgpPeerPfxPolName": "pfx-limit"}}}
                    ]}}
                ]}},
                {"l3extInstP": {"attributes": {"name": "all", "descr": "everything"}, "children": [
                    {"l3extSubnet": {"attributes": {"ip": "0.0.0.0/0"}}},
                    {"fvRsCons": {"attributes": {"tnVzBrCPName": "web-to-wan"}}},
                    {"fvRsProv": {"attributes": {"tnVzBrCPName": "wan-svc"}}},
                    {"l3extRsInstPToProfile": {"attributes": {
                        "tnRtctrlProfileName": "wan-rm",
                        "direction": "export"
                    }}}
                ]}},
                {"rtctrlProfile": {"attributes": {"name": "wan-rm"}, "children": [
                    {"rtctrlCtxP": {"attributes": {"name": "permit-default", "order": "1"}, "children": [
                        {"rtctrlRsCtxPToSubjP": {"attributes": {"tnRtctrlSubjPName": "default-route"}}}
                    ]}}
                ]}},
                {"l3extDefaultRouteLeakP": {"attributes": {"always": "no", "criteria": "in-addition"}}}
            ]}},
            {"l3extOut": {"attributes": {"name": "edge"}, "children": [
                {"l3extRsEctx": {"attributes": {"tnFvCtxName": "Prod-VRF"}}},
                {"l3extLNodeP": {"attributes": {"name": "edge-nodes"}, "children": [
                    {"l3extRsNodeL3OutAtt": {"attributes": {
                        "tDn": "topology/pod-1/node-103",
                        "rtrId": "3.3.3.3"
                    }}},
                    {"l3extLIfP": {"attributes": {"name": "svi"}, "children": [
                        {"l3extVirtualLIfP": {"attributes": {
                            "nodeDn": "topology/pod-1/node-103",
                            "encap": "vlan-200",
                            "addr": "198.51.100.1/24"
                        }, "children": [
                            {"l3extRsDynPathAtt": {"attributes": {
                                "tDn": "uni/phys-servers",
                                "floatingAddr": "198.51.100.254/24"
                            }, "children": [
                                {"l3extIp": {"attributes": {"addr": "198.51.100.253/24"}}}
                            ]}},
                            {"l3extIp": {"attributes": {"addr": "198.51.100.2/24"}}},
                            {"bgpPeerP": {"attributes": {"addr": "198.51.100.10", "ttl": "2"}, "children": [
                                {"bgpAsP": {"attributes": {"asn": "65010"}}}
                            ]}}
                        ]}},
                        {"l3extRsPathL3OutAtt": {"attributes": {
                            "tDn": "topology/pod-1/protpaths-103-104/pathep-[vpc-edge]",
                            "ifInstT": "ext-svi",
                            "encap": "vlan-300"
                        }, "children": [
                            {"l3extMember": {"attributes": {"side": "A", "addr": "203.0.113.2/29"}}},
                            {"l3extMember": {"attributes": {"side": "B", "addr": "203.0.113.3/29"}}}
                        ]}}
                    ]}}
                ]}}
            ]}},
            {"l3extOut": {"attributes": {"name": "other"}}},
            {"rtctrlSubjP": {"attributes": {"name": "default-route"}, "children": [
                {"rtctrlMatchRtDest": {"attributes": {"ip": "0.0.0.0/0", "aggregate": "yes"}}}
            ]}},
            {"rtctrlSubjP": {"attributes": {"name": "unused-rule"}}}
        ]}},
        {"physDomP": {"attributes": {"name": "servers"}, "children": [
            {"infraRsVlanNs": {"attributes": {"tDn": "uni/infra/vlanns-[servers-pool]-static"}}}
        ]}},
        {"l3extDomP": {"attributes": {"name": "wan-dom"}}},
        {"physDomP": {"attributes": {"name": "storage"}}},
        {"infraInfra": {"attributes": {}, "children": [
            {"fvnsVlanInstP": {"attributes": {"name": "servers-pool", "allocMode": "static"}, "children": [
                {"fvnsEncapBlk": {"attributes": {"from": "vlan-100", "to": "vlan-199"}}}
            ]}},
            {"infraAttEntityP": {"attributes": {"name": "servers-aep"}, "children": [
                {"infraRsDomP": {"attributes": {"tDn": "uni/phys-servers"}}},
                {"infraRsDomP": {"attributes": {"tDn": "uni/phys-storage"}}},
                {"infraGeneric": {"attributes": {"name": "default"}, "children": [
                    {"infraRsFuncToEpg": {"attributes": {
                        "tDn": "uni/tn-Prod-TN/ap-Prod-ANP/epg-front",
                        "encap": "vlan-100",
                        "mode": "untagged"
                    }}},
                    {"infraRsFuncToEpg": {"attributes": {
                        "tDn": "uni/tn-Prod-TN/ap-Prod-ANP/epg-lonely",
                        "encap": "vlan-150"
                    }}}
                ]}}
            ]}},
            {"infraAccPortP": {"attributes": {"name": "leaf101", "descr": "leaf 101 ports"}, "children": [
                {"infraHPortS": {"attributes": {"name": "port1", "type": "range"}, "children": [
                    {"infraRsAccBaseGrp": {"attributes": {"tDn": "uni/infra/funcprof/accportgrp-leaf-pg"}}},
                    {"infraPortBlk": {"attributes": {"name": "block1", "fromPort": "1", "toPort": "1"}}}
                ]}},
                {"infraHPortS": {"attributes": {"name": "vpc-ports", "type": "range"}, "children": [
                    {"infraRsAccBaseGrp": {"attributes": {"tDn": "uni/infra/funcprof/accbundle-vpc-pg"}}},
                    {"infraPortBlk": {"attributes": {"name": "block2", "fromPort": "20", "toPort": "21"}}}
                ]}},
                {"infraHPortS": {"attributes": {"name": "spare", "type": "range"}, "children": [
                    {"infraRsAccBaseGrp": {"attributes": {"tDn": "uni/infra/funcprof/accportgrp-unrelated-pg"}}}
                ]}}
            ]}},
            {"infraFuncP": {"attributes": {}, "children": [
                {"infraAccPortGrp": {"attributes": {"name": "leaf-pg"}, "children": [
                    {"infraRsAttEntP": {"attributes": {"tDn": "uni/infra/attentp-servers-aep"}}},
                    {"infraRsCdpIfPol": {"attributes": {"tnCdpIfPolName": "cdp-on"}}}
                ]}},
                {"infraAccBndlGrp": {"attributes": {"name": "vpc-pg", "lagT": "node"}, "children": [
                    {"infraRsAttEntP": {"attributes": {"tDn": "uni/infra/attentp-servers-aep"}}},
                    {"infraRsLacpPol": {"attributes": {"tnLacpLagPolName": "lacp-active"}}}
                ]}},
                {"infraAccPortGrp": {"attributes": {"name": "unrelated-pg"}}}
            ]}}
        ]}}
    ]}})
}

pub fn table<'a>(tables: &'a [Table], name: &str) -> &'a Table {
    tables
        .iter()
        .find(|t| t.name == name)
        .unwrap_or_else(|| panic!("no table {}", name))
}

/// Values of one column, in row order
pub fn column(table: &Table, name: &str) -> Vec<String> {
    let idx = table.column_index(name).unwrap();
    table.rows.iter().map(|row| row.values[idx].clone()).collect()
}

pub fn row(table: &Table, key: &[&str]) -> Option<Row> {
    table
        .rows
        .iter()
        .find(|row| row.key.parts().iter().map(String::as_str).eq(key.iter().copied()))
        .cloned()
}
