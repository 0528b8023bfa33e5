use causeway_core::config::TemporalConfig;
use causeway_core::engine::{BuildRequest, CausalEngine};
use causeway_core::infer::{Stage, temporal_strength};
use causeway_core::{EngineError, GraphError};
use causeway_core::model::TimeWindow;
use causeway_core::query::{detect_cycles, find_path, most_influential_events};
use proptest::prelude::*;

#[path = "generators.rs"]
mod generators;
use generators::*;

fn whole_history() -> BuildRequest {
    BuildRequest::new(TimeWindow::new(ts(-1), ts(20_000)).expect("window"))
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(256))]

    #[test]
    fn temporal_strength_is_bounded(elapsed in 0.0f64..1e7) {
        let config = TemporalConfig::default();
        let s = temporal_strength(elapsed, &config);
        prop_assert!((config.min_strength..=config.max_strength).contains(&s));
    }

    #[test]
    fn temporal_strength_never_increases(a in 0.0f64..1e5, b in 0.0f64..1e5) {
        let config = TemporalConfig::default();
        let (near, far) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(temporal_strength(near, &config) >= temporal_strength(far, &config));
    }

    #[test]
    fn built_graphs_hold_only_unit_strengths(records in prop::collection::vec(arb_record(), 0..60)) {
        let source = source_from(&records);
        // Runs of one kind can push a pattern rate past 1; that must abort
        // the pattern stage rather than write a clamped edge.
        let report = match CausalEngine::default().build(&source, &whole_history()) {
            Ok(report) => report,
            Err(err) => {
                let is_pattern_range_error = matches!(
                    err,
                    EngineError::Graph(GraphError::StrengthOutOfRange { stage: Stage::Pattern, .. })
                );
                prop_assert!(is_pattern_range_error);
                return Ok(());
            }
        };
        for (_, _, edge) in report.graph.edges() {
            prop_assert!((0.0..=1.0).contains(&edge.strength.get()));
        }
        for candidate in &report.inference.candidates {
            prop_assert!(candidate.rate <= 1.0);
            prop_assert!(candidate.occurrences <= candidate.opportunities);
        }
        prop_assert!(report.graph.is_consistent());
    }

    #[test]
    fn prune_removes_exactly_the_weak_edges(
        edges in arb_edges(12),
        threshold in 0.0f64..=1.0,
    ) {
        let mut g = graph_from(12, &edges);
        let before = g.edge_count();
        let weak = g.edges().filter(|(_, _, e)| e.strength.get() < threshold).count();

        let removed = g.prune_weak_edges(threshold);

        prop_assert_eq!(removed, weak);
        prop_assert_eq!(g.edge_count(), before - weak);
        prop_assert!(g.edges().all(|(_, _, e)| e.strength.get() >= threshold));
        prop_assert!(g.is_consistent());
        prop_assert_eq!(g.node_count(), 12);
    }

    #[test]
    fn influence_ranking_is_sorted_and_deterministic(edges in arb_edges(10), limit in 0usize..12) {
        let g = graph_from(10, &edges);
        let first = most_influential_events(&g, limit);
        let second = most_influential_events(&g, limit);

        prop_assert_eq!(&first, &second);
        prop_assert!(first.len() <= limit);
        prop_assert!(first.iter().all(|e| e.influence > 0.0));
        for pair in first.windows(2) {
            prop_assert!(
                pair[0].influence > pair[1].influence
                    || (pair[0].influence == pair[1].influence && pair[0].event < pair[1].event)
            );
        }
    }

    #[test]
    fn self_path_is_always_empty(edges in arb_edges(8), node in 0usize..8) {
        let g = graph_from(8, &edges);
        let key = g.nodes().nth(node).map(|(_, n)| n.key.clone()).expect("node exists");
        prop_assert_eq!(find_path(&g, &key, &key), Some(Vec::new()));
    }

    #[test]
    fn cycle_witnesses_are_real_cycles(edges in arb_edges(8)) {
        let g = graph_from(8, &edges);
        for found in detect_cycles(&g) {
            prop_assert!(!found.edges.is_empty());
            for (from, to) in &found.edges {
                prop_assert!(g.edge_by_keys(from, to).is_some());
            }
            let first = &found.edges[0].0;
            let last = &found.edges[found.edges.len() - 1].1;
            prop_assert_eq!(first, last);
        }
    }
}
