//! End-to-end properties of single trials
//!
//! These tests run complete simulations and check the guarantees every
//! routing algorithm and topology must uphold.

use churn_simulation::{
    Algorithm, ConfigError, MemoryFrameSink, MessageId, NodeId, ScheduledMessage, SimConfig,
    SimError, Simulation, Snapshot, Topology, TopologyKind, Ttl, Workload, run_trial,
};

fn small_config(alg: Algorithm, topology: TopologyKind) -> SimConfig {
    SimConfig {
        num_nodes: 25,
        num_messages: 40,
        num_steps: 20,
        ttl: Ttl::Hops(5),
        density: 0.15,
        volatility: 0.3,
        topology,
        alg,
        seed: 11,
        ..Default::default()
    }
}

#[test]
fn test_fraction_delivered_is_a_fraction() {
    churn_logging::init_testing();
    for topology in [TopologyKind::Random, TopologyKind::Geo] {
        for alg in Algorithm::ALL {
            let report = run_trial(&small_config(alg, topology)).unwrap();
            assert!(
                (0.0..=1.0).contains(&report.fraction_delivered),
                "{} on {}: {}",
                alg,
                topology,
                report.fraction_delivered
            );
            assert_eq!(report.total_messages, 40);
            assert_eq!(report.delivered, report.delivered_ids.len());
            assert_eq!(report.steps, 20);
        }
    }
}

#[test]
fn test_same_seed_same_outcome() {
    for alg in Algorithm::ALL {
        let config = SimConfig {
            verbose: true,
            ..small_config(alg, TopologyKind::Geo)
        };
        let first = run_trial(&config).unwrap();
        let second = run_trial(&config).unwrap();
        assert_eq!(first, second, "{} is not reproducible", alg);
    }
}

#[test]
fn test_different_seeds_diverge() {
    let config = small_config(Algorithm::Random, TopologyKind::Random);
    let outcomes: Vec<Vec<MessageId>> = (0..5)
        .map(|seed| {
            run_trial(&config.clone().with_seed(seed))
                .unwrap()
                .delivered_ids
        })
        .collect();
    assert!(outcomes.windows(2).any(|w| w[0] != w[1]));
}

#[test]
fn test_larger_ttl_never_delivers_less() {
    churn_logging::init_testing();
    for alg in [
        Algorithm::Random,
        Algorithm::BfsTtl,
        Algorithm::BfsTtlEarlySplit,
        Algorithm::BfsTtlLateSplit,
        Algorithm::BfsLoops,
    ] {
        for density in [0.1, 0.15] {
            for seed in 0..60 {
                let mut previous: Vec<MessageId> = Vec::new();
                for ttl in [0, 1, 2, 4, 8, 12, 13, 16] {
                    let config = SimConfig {
                        ttl: Ttl::Hops(ttl),
                        density,
                        ..small_config(alg, TopologyKind::Random)
                    }
                    .with_seed(seed);
                    let delivered = run_trial(&config).unwrap().delivered_ids;
                    assert!(
                        previous.iter().all(|id| delivered.contains(id)),
                        "{} density {} seed {} lost deliveries going to ttl {}",
                        alg,
                        density,
                        seed,
                        ttl
                    );
                    previous = delivered;
                }
            }
        }
    }
}

#[test]
fn test_zero_ttl_delivers_nothing() {
    for alg in Algorithm::ALL.into_iter().filter(|a| *a != Algorithm::Bfs) {
        let config = SimConfig {
            ttl: Ttl::Hops(0),
            density: 1.0,
            ..small_config(alg, TopologyKind::Random)
        };
        assert_eq!(run_trial(&config).unwrap().delivered, 0, "{}", alg);
    }
}

#[test]
fn test_complete_graph_floods_everything() {
    let config = SimConfig {
        density: 1.0,
        ..small_config(Algorithm::Bfs, TopologyKind::Random)
    };
    let report = run_trial(&config).unwrap();
    assert_eq!(report.fraction_delivered, 1.0);
}

#[test]
fn test_empty_graph_delivers_nothing() {
    for alg in Algorithm::ALL {
        let config = SimConfig {
            density: 0.0,
            volatility: 1.0,
            ..small_config(alg, TopologyKind::Random)
        };
        assert_eq!(run_trial(&config).unwrap().fraction_delivered, 0.0, "{}", alg);
    }
}

/// Ring of 8 nodes plus node 8, which nothing connects to
fn ring_with_island(alg: Algorithm) -> Simulation {
    let config = SimConfig {
        num_nodes: 9,
        num_messages: 1,
        num_steps: 12,
        ttl: Ttl::Hops(6),
        alg,
        ..Default::default()
    };
    let mut edges: Vec<(u32, u32)> = (0..8).map(|i| (i, (i + 1) % 8)).collect();
    edges.push((0, 4));
    let topology = Topology::fixed(Snapshot::from_edges(9, &edges).unwrap());
    let workload =
        Workload::from_schedule(&[ScheduledMessage::new(1, 0, 8)], 9, config.ttl).unwrap();
    Simulation::with_topology(config, topology)
        .unwrap()
        .with_workload(workload)
        .unwrap()
}

#[test]
fn test_early_split_sends_no_more_than_ttl_flood() {
    churn_logging::init_testing();
    let mut flood = ring_with_island(Algorithm::BfsTtl);
    let mut split = ring_with_island(Algorithm::BfsTtlEarlySplit);
    assert_eq!(flood.run().unwrap().delivered, 0);
    assert_eq!(split.run().unwrap().delivered, 0);

    let flood_sent = flood.tracker().stats().transmissions;
    let split_sent = split.tracker().stats().transmissions;
    assert!(flood_sent > 0);
    assert!(
        split_sent <= flood_sent,
        "early split sent {} copies, ttl flood {}",
        split_sent,
        flood_sent
    );
}

/// Early split never spawns more copies of a message than ttl flooding does
/// while the flood is still searching for its destination
#[test]
fn test_early_split_cost_bounded_until_flood_delivers() {
    churn_logging::init_testing();
    for topology in [TopologyKind::Random, TopologyKind::Geo] {
        for seed in 0..8 {
            let config = SimConfig {
                ttl: Ttl::Hops(8),
                density: 0.2,
                ..small_config(Algorithm::BfsTtl, topology)
            }
            .with_seed(seed);
            let steps = config.num_steps;
            let mut flood = Simulation::new(config.clone()).unwrap();
            let mut split = Simulation::new(SimConfig {
                alg: Algorithm::BfsTtlEarlySplit,
                ..config
            })
            .unwrap();

            for step in 1..=steps {
                flood.step().unwrap();
                split.step().unwrap();
                for message in flood.workload().messages() {
                    if flood.tracker().is_message_delivered(message.id) {
                        continue;
                    }
                    let flood_sent = flood.tracker().transmissions_of(message.id);
                    let split_sent = split.tracker().transmissions_of(message.id);
                    assert!(
                        split_sent <= flood_sent,
                        "{} seed {} step {}: message {} split sent {}, flood {}",
                        topology,
                        seed,
                        step,
                        message.id,
                        split_sent,
                        flood_sent
                    );
                }
            }
            assert!(flood.tracker().stats().transmissions > 0);
            assert!(
                !flood.tracker().deliveries().is_empty(),
                "{} seed {} delivered nothing",
                topology,
                seed
            );
        }
    }
}

#[test]
fn test_every_copy_dies_eventually_when_undeliverable() {
    for alg in [
        Algorithm::BfsTtl,
        Algorithm::BfsTtlEarlySplit,
        Algorithm::BfsTtlLateSplit,
        Algorithm::BfsLoops,
    ] {
        let mut sim = ring_with_island(alg);
        sim.run().unwrap();
        assert_eq!(sim.tracker().active_count(), 0, "{}", alg);
    }
}

#[test]
fn test_frames_follow_the_run() {
    let mut sim = ring_with_island(Algorithm::BfsTtl);
    let mut sink = MemoryFrameSink::new();
    sim.run_with_sink(&mut sink).unwrap();

    assert_eq!(sink.frames.len(), 12);
    for (i, frame) in sink.frames.iter().enumerate() {
        assert_eq!(frame.step, i as u64 + 1);
        assert_eq!(frame.nodes.len(), 9);
        assert_eq!(frame.edges.len(), 9);
    }
    // the first hop reaches both ring neighbors and the chord
    let holders: Vec<NodeId> = sink.frames[0].copies.iter().map(|c| c.holder).collect();
    assert_eq!(holders, vec![NodeId(1), NodeId(4), NodeId(7)]);
    assert!(sink.frames[0].copies.iter().all(|c| c.budget == Some(5)));
}

#[test]
fn test_geo_frames_carry_positions() {
    let config = SimConfig {
        num_steps: 3,
        graphics: true,
        ..small_config(Algorithm::Random, TopologyKind::Geo)
    };
    let mut sim = Simulation::new(config).unwrap();
    let mut sink = MemoryFrameSink::new();
    sim.run_with_sink(&mut sink).unwrap();
    for frame in &sink.frames {
        assert!(frame.nodes.iter().all(|n| n.position.is_some()));
    }
}

#[test]
fn test_invalid_configs_fail_before_running() {
    let cases = [
        (
            SimConfig {
                num_nodes: 1,
                ..Default::default()
            },
            ConfigError::TooFewNodes(1),
        ),
        (
            SimConfig {
                num_steps: 0,
                ..Default::default()
            },
            ConfigError::NonPositive("num_steps"),
        ),
        (
            SimConfig {
                density: 1.5,
                ..Default::default()
            },
            ConfigError::OutOfRange {
                name: "density",
                value: 1.5,
            },
        ),
        (
            SimConfig {
                volatility: -0.1,
                ..Default::default()
            },
            ConfigError::OutOfRange {
                name: "volatility",
                value: -0.1,
            },
        ),
        (
            SimConfig {
                metrics: Vec::new(),
                ..Default::default()
            },
            ConfigError::NoMetrics,
        ),
    ];
    for (config, expected) in cases {
        match run_trial(&config) {
            Err(SimError::Config(err)) => assert_eq!(err, expected),
            other => panic!("expected {:?}, got {:?}", expected, other),
        }
    }
}

#[test]
fn test_config_from_json() {
    let config: SimConfig = serde_json::from_str(
        r#"{
            "num_nodes": 30,
            "ttl": 4,
            "alg": "bfs-ttl-late-split",
            "topology": "geo",
            "metric": ["fraction_delivered", "average_hops"]
        }"#,
    )
    .unwrap();
    assert_eq!(config.num_nodes, 30);
    assert_eq!(config.ttl, Ttl::Hops(4));
    assert_eq!(config.alg, Algorithm::BfsTtlLateSplit);
    assert_eq!(config.topology, TopologyKind::Geo);
    assert_eq!(config.metrics.len(), 2);
    assert_eq!(config.num_steps, SimConfig::default().num_steps);

    assert!(serde_json::from_str::<SimConfig>(r#"{"ttl": -1}"#).is_err());
    assert!(serde_json::from_str::<SimConfig>(r#"{"alg": "dijkstra"}"#).is_err());
}
