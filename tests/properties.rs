//! Property tests over random reference graphs and substitution plans

use aci_slice::remap::{self, SubstitutionPlan};
use aci_slice::schema::{aci, ColumnSpec, Registry, RelationSpec, TypeSpec};
use aci_slice::{compute_closure, extract, ClosureState, Row, Seed, SliceConfig, Table, TreeIndex};
use proptest::prelude::*;
use serde_json::{json, Value};

/// Names repeat every few nodes so that several objects can share a key
const NAMES: usize = 7;

fn node_registry() -> Registry {
    Registry::new().with_type(
        TypeSpec::new("node", "node")
            .column(ColumnSpec::attribute("name", "name"))
            .column(ColumnSpec::related("next", "next", "name"))
            .column(ColumnSpec::related("alt", "alt", "name"))
            .key(&["name"])
            .relation(RelationSpec::reference("next", "next").to("node"))
            .relation(RelationSpec::reference("alt", "alt").to("node")),
    )
}

/// Outgoing edges per node; indexes past the end point at nothing
fn arb_graph() -> impl Strategy<Value = Vec<(Option<usize>, Option<usize>)>> {
    prop::collection::vec(
        (prop::option::of(0usize..12), prop::option::of(0usize..12)),
        1..10,
    )
}

fn arb_seeds() -> impl Strategy<Value = Vec<Seed>> {
    prop::collection::vec(0usize..NAMES + 2, 0..4).prop_map(|picks| {
        picks
            .into_iter()
            .map(|i| Seed::new("node", [format!("n{}", i)]))
            .collect::<Vec<_>>()
    })
}

fn graph_tree(edges: &[(Option<usize>, Option<usize>)]) -> TreeIndex {
    let nodes: Vec<Value> = edges
        .iter()
        .enumerate()
        .map(|(i, (next, alt))| {
            let mut attributes = json!({"dn": format!("g/{}", i), "name": format!("n{}", i % NAMES)});
            if let Some(next) = next {
                attributes["next"] = json!(format!("g/{}", next));
            }
            if let Some(alt) = alt {
                attributes["alt"] = json!(format!("g/{}", alt));
            }
            json!({"node": {"attributes": attributes}})
        })
        .collect();
    TreeIndex::load(&Value::Array(nodes)).unwrap()
}

fn closure(tree: &TreeIndex, registry: &Registry, seeds: &[Seed]) -> ClosureState {
    compute_closure(tree, registry, seeds, &SliceConfig::default()).unwrap().0
}

fn arb_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Prod-TN"),
        Just("Staging-TN"),
        Just("Lab-TN"),
        Just("Dev-TN"),
    ]
    .prop_map(String::from)
}

fn tenant_table(names: &[String]) -> Table {
    let mut table = aci::registry().table("tenant").unwrap().empty_table();
    for name in names {
        let values = vec![name.clone(), format!("{} owner", name)];
        table.rows.push(Row { key: table.key_of(&values), values });
    }
    table
}

proptest! {
    #[test]
    fn closure_is_a_fixed_point(edges in arb_graph(), seeds in arb_seeds()) {
        let tree = graph_tree(&edges);
        let registry = node_registry();

        let state = closure(&tree, &registry, &seeds);
        let reseeded = closure(&tree, &registry, &state.seeds());
        prop_assert_eq!(reseeded, state);
    }

    #[test]
    fn closure_of_union_is_union_of_closures(
        edges in arb_graph(),
        left in arb_seeds(),
        right in arb_seeds(),
    ) {
        let tree = graph_tree(&edges);
        let registry = node_registry();

        let mut merged = closure(&tree, &registry, &left);
        merged.merge(&closure(&tree, &registry, &right));

        let both: Vec<Seed> = left.iter().chain(right.iter()).cloned().collect();
        prop_assert_eq!(closure(&tree, &registry, &both), merged);
    }

    #[test]
    fn projected_rows_never_dangle(edges in arb_graph(), seeds in arb_seeds()) {
        let tree = graph_tree(&edges);
        let registry = node_registry();

        let extraction = extract(&tree, &registry, &seeds, &SliceConfig::default()).unwrap();
        let table = extraction.table("node").unwrap();
        let names: Vec<&str> = (0..table.len()).filter_map(|i| table.value(i, "name")).collect();

        for i in 0..table.len() {
            for column in ["next", "alt"] {
                let value = table.value(i, column).unwrap();
                prop_assert!(value.is_empty() || names.contains(&value), "{} -> {}", column, value);
            }
        }
        prop_assert_eq!(table.len(), extraction.closure.len());
    }

    #[test]
    fn reapplying_a_plan_changes_nothing(
        names in prop::collection::vec(arb_name(), 1..6),
        entries in prop::collection::vec((arb_name(), arb_name()), 0..4),
    ) {
        let tables = vec![tenant_table(&names)];
        let plan = entries
            .into_iter()
            .fold(SubstitutionPlan::new(), |plan, (old, new)| plan.with("tenant", old, new));

        if let Ok((once, _)) = remap::apply(aci::registry(), &tables, &plan) {
            let (twice, report) = remap::apply(aci::registry(), &once, &plan).unwrap();
            prop_assert_eq!(report.total(), 0);
            prop_assert_eq!(twice, once);
        }
    }

    #[test]
    fn conversion_keeps_rows_and_columns(
        names in prop::collection::vec(arb_name(), 1..6),
        entries in prop::collection::vec((arb_name(), arb_name()), 0..4),
    ) {
        let tables = vec![tenant_table(&names)];
        let plan = entries
            .into_iter()
            .fold(SubstitutionPlan::new(), |plan, (old, new)| plan.with("tenant", old, new));

        if let Ok((converted, _)) = remap::apply(aci::registry(), &tables, &plan) {
            prop_assert_eq!(converted.len(), tables.len());
            prop_assert_eq!(&converted[0].columns, &tables[0].columns);
            prop_assert_eq!(converted[0].len(), tables[0].len());
            for (before, after) in tables[0].rows.iter().zip(&converted[0].rows) {
                // description is not namespaced
                prop_assert_eq!(&before.values[1], &after.values[1]);
                let expected = plan.get("tenant", &before.values[0]).unwrap_or(before.values[0].as_str());
                prop_assert_eq!(after.values[0].as_str(), expected);
            }
        }
    }
}
