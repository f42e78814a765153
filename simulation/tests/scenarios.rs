//! Built-in scenarios with known outcomes

use churn_simulation::{
    Algorithm, MemoryFrameSink, MessageId, MessageStatus, NodeId, Scenario, SimConfig, SimState,
    Ttl, run_scenario,
};

#[test]
fn test_every_scenario_runs() {
    churn_logging::init_testing();
    for scenario in Scenario::ALL {
        let report = run_scenario(scenario).unwrap();
        assert_eq!(report.total_messages, 1, "{}", scenario.name());
        assert!(report.detailed.is_some());
    }
}

#[test]
fn test_two_node() {
    churn_logging::init_testing();
    let mut sim = Scenario::TwoNode.build().unwrap();
    let report = sim.run().unwrap();
    assert_eq!(sim.state(), SimState::Finished);
    assert_eq!(report.fraction_delivered, 1.0);
    assert_eq!(
        sim.tracker().status(MessageId(0)),
        MessageStatus::Delivered { step: 1, hops: 1 }
    );
}

#[test]
fn test_line_needs_four_hops() {
    churn_logging::init_testing();
    let report = run_scenario(Scenario::LineTtl).unwrap();
    assert_eq!(report.delivered, 0);

    let mut sim = Scenario::LineFlood.build().unwrap();
    let report = sim.run().unwrap();
    assert_eq!(report.delivered, 1);
    assert_eq!(
        sim.tracker().status(MessageId(0)),
        MessageStatus::Delivered { step: 4, hops: 4 }
    );
    assert_eq!(report.detailed.unwrap().average_latency, 4.0);

    // exactly enough budget for the line
    let config = SimConfig {
        ttl: Ttl::Hops(4),
        ..Scenario::LineTtl.config()
    };
    let mut sim = Scenario::LineTtl.build_with(config).unwrap();
    assert_eq!(sim.run().unwrap().delivered, 1);
}

/// Steps at which some copy of the only message sat on node 0
fn steps_back_at_origin(alg: Algorithm) -> Vec<u64> {
    let config = SimConfig {
        alg,
        ..Scenario::TriangleLoops.config()
    };
    let mut sim = Scenario::TriangleLoops.build_with(config).unwrap();
    let mut sink = MemoryFrameSink::new();
    sim.run_with_sink(&mut sink).unwrap();
    assert_eq!(sim.tracker().status(MessageId(0)), MessageStatus::Dead);
    sink.frames
        .iter()
        .filter(|f| f.copies.iter().any(|c| c.holder == NodeId(0)))
        .map(|f| f.step)
        .collect()
}

#[test]
fn test_loops_revisit_the_origin() {
    churn_logging::init_testing();
    assert_eq!(steps_back_at_origin(Algorithm::BfsLoops), vec![2, 3]);
    assert!(steps_back_at_origin(Algorithm::BfsTtl).is_empty());
}
