#![no_main]

use causeway_core::engine::{BuildRequest, CausalEngine};
use causeway_core::model::{RecordBundle, TimeWindow};
use causeway_core::query::{detect_cycles, most_influential_events};
use causeway_core::source::MemorySource;
use chrono::{DateTime, Utc};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(bundle) = serde_json::from_slice::<RecordBundle>(data) else {
        return;
    };
    let window = TimeWindow::new(DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC).expect("window");
    let source = MemorySource::from(bundle);

    // Out-of-range trigger confidences are a legitimate build error.
    let Ok(report) = CausalEngine::default().build(&source, &BuildRequest::new(window)) else {
        return;
    };
    let graph = report.graph;
    assert!(graph.is_consistent());
    assert!(graph.edges().all(|(_, _, e)| (0.0..=1.0).contains(&e.strength.get())));
    for found in detect_cycles(&graph) {
        assert!(!found.edges.is_empty());
    }
    let ranked = most_influential_events(&graph, 10);
    assert!(ranked.windows(2).all(|w| w[0].influence >= w[1].influence));
});
