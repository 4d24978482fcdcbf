//! Property tests for staging loads.

use proptest::prelude::*;
use retailhub_core::table::TableData;
use retailhub_runner::{Destination, MemoryDestination, StageGraph};

fn arb_cell() -> impl Strategy<Value = Option<String>> {
    prop_oneof![Just(None), "[a-zA-Z0-9 ,\\t'\"-]{0,12}".prop_map(Some)]
}

fn arb_table() -> impl Strategy<Value = TableData> {
    (1usize..5).prop_flat_map(|width| {
        prop::collection::vec(prop::collection::vec(arb_cell(), width), 0..20).prop_map(move |rows| {
            TableData {
                name: "dim_products".into(),
                columns: (0..width).map(|i| format!("c{i}")).collect(),
                rows,
            }
        })
    })
}

proptest! {
    #[test]
    fn loading_twice_is_idempotent(table in arb_table()) {
        let mut dest = MemoryDestination::new();
        dest.replace_table(&table).unwrap();
        let first = dest.snapshot("dim_products").unwrap();
        dest.replace_table(&table).unwrap();
        let second = dest.snapshot("dim_products").unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.fingerprint(), table.fingerprint());
    }

    #[test]
    fn changed_content_changes_fingerprint(table in arb_table(), extra in "[a-z]{1,8}") {
        let mut changed = table.clone();
        let width = changed.columns.len();
        changed.rows.push(vec![Some(extra); width]);
        prop_assert_ne!(changed.fingerprint(), table.fingerprint());
    }
}

#[test]
fn retail_graph_is_acyclic() {
    let waves = StageGraph::retail().waves().unwrap();
    let total: usize = waves.iter().map(Vec::len).sum();
    assert_eq!(total, 7);
}
