//! Property tests for naming and dependency ordering.

use cfnport::core::naming::{
    clean_for_name, derive_package_name, is_valid_identifier, sanitize_identifier, MAX_CLEANED_LEN,
};
use cfnport::core::resolver::{build_resource_order, find_cycles, sub_references};
use cfnport::core::types::ReferenceGraph;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};

/// Random DAG over `n` nodes: node `i` may depend only on nodes `j < i`.
/// Names are assigned so alphabetical order disagrees with the topology.
fn dag() -> impl Strategy<Value = (Vec<String>, ReferenceGraph)> {
    (1usize..24).prop_flat_map(|n| {
        proptest::collection::vec(any::<bool>(), n * n).prop_map(move |bits| {
            let names: Vec<String> = (0..n).map(|i| format!("R{:02}", n - 1 - i)).collect();
            let mut graph = ReferenceGraph::default();
            for i in 0..n {
                let deps: BTreeSet<String> = (0..i)
                    .filter(|&j| bits[i * n + j])
                    .map(|j| names[j].clone())
                    .collect();
                if !deps.is_empty() {
                    graph.resources.insert(names[i].clone(), deps);
                }
            }
            (names, graph)
        })
    })
}

proptest! {
    #[test]
    fn prop_sanitize_identifier_idempotent(name in "\\PC{0,24}") {
        let once = sanitize_identifier(&name);
        prop_assert!(is_valid_identifier(&once));
        prop_assert_eq!(sanitize_identifier(&once), once);
    }

    #[test]
    fn prop_package_name_is_identifier(stem in "[A-Za-z0-9._ -]{0,24}") {
        let name = derive_package_name(&stem);
        prop_assert!(is_valid_identifier(&name), "{:?} -> {:?}", stem, name);
        prop_assert_eq!(derive_package_name(&name), name);
    }

    #[test]
    fn prop_clean_for_name_bounded(value in "[ -~]{0,64}") {
        let cleaned = clean_for_name(&value);
        prop_assert!(cleaned.chars().count() <= MAX_CLEANED_LEN);
        prop_assert!(cleaned.chars().all(char::is_alphanumeric));
    }

    #[test]
    fn prop_sub_references_are_plain_names(text in "[A-Za-z0-9${}.:!-]{0,40}") {
        for name in sub_references(&text) {
            prop_assert!(!name.is_empty());
            prop_assert!(!name.contains('.'));
            prop_assert!(!name.starts_with('!'));
        }
    }

    #[test]
    fn prop_order_respects_dependencies((names, graph) in dag()) {
        let order = build_resource_order(&names, &graph);

        let mut sorted = order.clone();
        sorted.sort();
        let mut expected = names.clone();
        expected.sort();
        prop_assert_eq!(sorted, expected);

        let position: HashMap<&str, usize> =
            order.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();
        for (from, to) in graph.edges() {
            prop_assert!(position[to] < position[from], "{} must precede {}", to, from);
        }
        prop_assert!(find_cycles(&names, &graph).is_empty());
    }

    #[test]
    fn prop_order_is_deterministic((names, graph) in dag()) {
        let mut reversed = names.clone();
        reversed.reverse();
        prop_assert_eq!(
            build_resource_order(&names, &graph),
            build_resource_order(&reversed, &graph)
        );
    }
}
