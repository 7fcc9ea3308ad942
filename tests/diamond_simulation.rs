//! Algorithm-level tests for diamond detection, run on the deterministic
//! simulator.

use lattice::diamond::simulation::Simulation;
use lattice::diamond::{
    CollectingSink, DetectionConfig, DetectionMessage, PathComparison, PostponePolicy, TriggerRef,
};
use lattice::element::{ElementId, ElementKind, Pad};
use lattice::pipeline::{EffectiveFlowControl, FlowControl, Link, Pipeline};
use std::sync::Arc;
use std::time::Duration;

fn add(
    pipeline: &mut Pipeline,
    name: &str,
    kind: ElementKind,
    inputs: &[&str],
    outputs: &[&str],
) -> ElementId {
    let id = pipeline.add_element(name, kind).unwrap();
    for input in inputs {
        pipeline
            .add_pad(id, Pad::input(*input, FlowControl::Manual))
            .unwrap();
    }
    for output in outputs {
        pipeline
            .add_pad(id, Pad::output(*output, FlowControl::Manual))
            .unwrap();
    }
    id
}

/// Elements for the A/B/C scenario, not yet linked.
fn abc() -> (Pipeline, [ElementId; 3]) {
    let mut pipeline = Pipeline::new();
    let a = add(&mut pipeline, "a", ElementKind::Source, &[], &["out_0", "out_1"]);
    let b = add(&mut pipeline, "b", ElementKind::Filter, &["sink"], &["src"]);
    let c = add(&mut pipeline, "c", ElementKind::Sink, &["in_0", "in_1"], &[]);
    (pipeline, [a, b, c])
}

fn abc_links(a: ElementId, b: ElementId, c: ElementId) -> [Link; 3] {
    [
        Link::new(a, "out_0", c, "in_0"),
        Link::new(a, "out_1", b, "sink"),
        Link::new(b, "src", c, "in_1"),
    ]
}

fn config(comparison: PathComparison) -> DetectionConfig {
    DetectionConfig::default().with_comparison(comparison)
}

#[test]
fn test_abc_full_path_reports_one_diamond() {
    let (pipeline, [a, b, c]) = abc();
    let mut sim = Simulation::new(pipeline, config(PathComparison::FullPath)).unwrap();

    sim.link_all(abc_links(a, b, c)).unwrap();
    sim.run_until_idle();

    assert_eq!(sim.reports().len(), 1);
    let report = &sim.reports()[0];
    assert_eq!(report.element(), c);
    assert_eq!(report.label(), "c");
    assert_eq!(report.origin().element(), a);
    assert_eq!(report.reference().origin(), a);
    // Direct leg arrives first with zero latency
    assert_eq!(report.remembered().vertex_count(), 3);
    assert_eq!(report.arrived().vertex_count(), 5);
    assert_eq!(report.divergence(), Some(report.origin()));
    assert_eq!(
        report.arrived().to_string(),
        "a -> a:out_1 -> sink:b -> b:src -> in_1:c"
    );
}

#[test]
fn test_abc_origin_comparison_reports_nothing() {
    let (pipeline, [a, b, c]) = abc();
    let mut sim = Simulation::new(pipeline, config(PathComparison::Origin)).unwrap();

    sim.link_all(abc_links(a, b, c)).unwrap();
    sim.run_until_idle();

    // Both legs share the origin, so the literal rule never fires
    assert!(sim.reports().is_empty());
    assert!(sim.delivered() > 0);
}

#[test]
fn test_abc_first_hop_comparison_reports() {
    let (pipeline, [a, b, c]) = abc();
    let mut sim = Simulation::new(pipeline, config(PathComparison::FirstHop)).unwrap();

    sim.link_all(abc_links(a, b, c)).unwrap();
    sim.run_until_idle();

    assert_eq!(sim.reports().len(), 1);
}

#[test]
fn test_arrival_order_only_swaps_roles() {
    let (pipeline, [a, b, c]) = abc();
    let mut fast = Simulation::new(pipeline.clone(), config(PathComparison::FullPath)).unwrap();
    fast.link_all(abc_links(a, b, c)).unwrap();
    fast.run_until_idle();

    let mut slow = Simulation::new(pipeline, config(PathComparison::FullPath)).unwrap();
    slow.set_link_latency(a, "out_0", Duration::from_millis(100));
    slow.link_all(abc_links(a, b, c)).unwrap();
    slow.run_until_idle();

    assert_eq!(fast.reports().len(), 1);
    assert_eq!(slow.reports().len(), 1);
    // The leg through b now arrives first and is the remembered one
    assert_eq!(slow.reports()[0].remembered().vertex_count(), 5);
    assert!(fast.reports()[0].same_pair(&slow.reports()[0]));
}

#[test]
fn test_long_branch_reports_and_tears_down() {
    const DEPTH: usize = 5_000;

    let mut pipeline = Pipeline::new();
    let tee = add(&mut pipeline, "tee", ElementKind::Source, &[], &["out_0", "out_1"]);
    let mixer = add(&mut pipeline, "mixer", ElementKind::Sink, &["in_0", "in_1"], &[]);
    let chain: Vec<ElementId> = (0..DEPTH)
        .map(|n| {
            let name = format!("filter_{}", n);
            add(&mut pipeline, &name, ElementKind::Filter, &["sink"], &["src"])
        })
        .collect();

    let mut links = vec![
        Link::new(tee, "out_0", chain[0], "sink"),
        Link::new(tee, "out_1", mixer, "in_1"),
        Link::new(chain[DEPTH - 1], "src", mixer, "in_0"),
    ];
    links.extend(
        chain
            .windows(2)
            .map(|pair| Link::new(pair[0], "src", pair[1], "sink")),
    );

    let mut sim = Simulation::new(pipeline, config(PathComparison::FullPath)).unwrap();
    sim.link_all(links).unwrap();
    sim.run_until_idle();

    assert_eq!(sim.reports().len(), 1);
    let report = &sim.reports()[0];
    assert_eq!(report.element(), mixer);
    assert_eq!(report.arrived().vertex_count(), 2 * DEPTH + 3);
    // Every detector and the report hold the long path until here
    drop(sim);
}

#[test]
fn test_runs_are_deterministic() {
    let run = || {
        let (pipeline, [a, b, c]) = abc();
        let mut sim = Simulation::new(pipeline, config(PathComparison::FullPath)).unwrap();
        sim.link_all(abc_links(a, b, c)).unwrap();
        sim.run_until_idle();
        (sim.take_reports(), sim.delivered())
    };
    assert_eq!(run(), run());
}

#[test]
fn test_cycle_produces_no_report() {
    let mut pipeline = Pipeline::new();
    let x = add(&mut pipeline, "x", ElementKind::Filter, &["sink"], &["out_0", "out_1"]);
    let y = add(&mut pipeline, "y", ElementKind::Filter, &["sink"], &["src"]);
    let z = add(&mut pipeline, "z", ElementKind::Sink, &["sink"], &[]);
    pipeline.link_pads(x, "out_0", y, "sink").unwrap();
    pipeline.link_pads(y, "src", x, "sink").unwrap();
    pipeline.link_pads(x, "out_1", z, "sink").unwrap();

    let mut sim = Simulation::new(pipeline, config(PathComparison::FullPath)).unwrap();
    sim.start();
    sim.run_for(Duration::from_secs(2));

    assert!(sim.reports().is_empty());
    // Only the first arrival is remembered at each element
    assert_eq!(sim.snapshot(y).unwrap().remembered_searches, 1);
    assert_eq!(sim.snapshot(z).unwrap().remembered_searches, 1);
    assert_eq!(sim.snapshot(x).unwrap().remembered_searches, 0);
}

#[test]
fn test_cycle_with_diamond_still_reports() {
    // x feeds c twice, and c loops back into x
    let mut pipeline = Pipeline::new();
    let x = add(&mut pipeline, "x", ElementKind::Filter, &["sink"], &["out_0", "out_1"]);
    let c = add(&mut pipeline, "c", ElementKind::Filter, &["in_0", "in_1"], &["src"]);
    pipeline.link_pads(x, "out_0", c, "in_0").unwrap();
    pipeline.link_pads(x, "out_1", c, "in_1").unwrap();
    pipeline.link_pads(c, "src", x, "sink").unwrap();

    let mut sim = Simulation::new(pipeline, config(PathComparison::FullPath)).unwrap();
    sim.start();
    sim.run_until_idle();

    assert_eq!(sim.reports().len(), 1);
    assert_eq!(sim.reports()[0].element(), c);
}

#[test]
fn test_trigger_travels_upstream() {
    let (mut pipeline, [a, b, c]) = abc();
    pipeline.link_pads(a, "out_0", c, "in_0").unwrap();
    pipeline.link_pads(a, "out_1", b, "sink").unwrap();

    let mut sim = Simulation::new(pipeline, config(PathComparison::FullPath)).unwrap();
    // Only b's output is new; a learns about it through b's input
    sim.link(Link::new(b, "src", c, "in_1")).unwrap();
    sim.run_for(Duration::from_millis(10));

    assert_eq!(sim.snapshot(b).unwrap().trigger_refs, 1);
    assert_eq!(sim.snapshot(a).unwrap().trigger_refs, 1);
    assert!(sim.snapshot(a).unwrap().search_postponed);

    sim.run_until_idle();
    assert_eq!(sim.reports().len(), 1);
}

#[test]
fn test_endpoint_stops_trigger_propagation() {
    let mut pipeline = Pipeline::new();
    let a = add(&mut pipeline, "a", ElementKind::Source, &[], &["out_0", "out_1"]);
    let b = add(&mut pipeline, "b", ElementKind::Endpoint, &["sink"], &["src"]);
    let c = add(&mut pipeline, "c", ElementKind::Sink, &["in_0", "in_1"], &[]);
    pipeline.link_pads(a, "out_0", c, "in_0").unwrap();
    pipeline.link_pads(a, "out_1", b, "sink").unwrap();

    let mut sim = Simulation::new(pipeline, config(PathComparison::FullPath)).unwrap();
    sim.link(Link::new(b, "src", c, "in_1")).unwrap();
    sim.run_until_idle();

    assert!(sim.reports().is_empty());
}

#[test]
fn test_push_edge_breaks_the_diamond() {
    let mut pipeline = Pipeline::new();
    let a = add(&mut pipeline, "a", ElementKind::Source, &[], &["out_0", "out_1"]);
    let b = pipeline.add_element("b", ElementKind::Filter).unwrap();
    pipeline
        .add_pads(
            b,
            [
                Pad::input("sink", FlowControl::Manual),
                Pad::output("src", FlowControl::Auto),
            ],
        )
        .unwrap();
    let c = pipeline.add_element("c", ElementKind::Sink).unwrap();
    pipeline
        .add_pads(
            c,
            [
                Pad::input("in_0", FlowControl::Manual),
                Pad::input("in_1", FlowControl::Push),
            ],
        )
        .unwrap();

    let mut sim = Simulation::new(pipeline, config(PathComparison::FullPath)).unwrap();
    sim.link_all(abc_links(a, b, c)).unwrap();
    sim.run_until_idle();

    assert!(sim.reports().is_empty());
}

#[test]
fn test_auto_pads_resolved_to_pull() {
    let mut pipeline = Pipeline::new().with_auto_resolution(EffectiveFlowControl::Pull);
    let a = pipeline.add_element("a", ElementKind::Source).unwrap();
    pipeline
        .add_pads(
            a,
            [
                Pad::output("out_0", FlowControl::Auto),
                Pad::output("out_1", FlowControl::Auto),
            ],
        )
        .unwrap();
    let c = pipeline.add_element("c", ElementKind::Sink).unwrap();
    pipeline
        .add_pads(
            c,
            [
                Pad::input("in_0", FlowControl::Auto),
                Pad::input("in_1", FlowControl::Auto),
            ],
        )
        .unwrap();

    let mut sim = Simulation::new(pipeline, config(PathComparison::FullPath)).unwrap();
    sim.link_all([
        Link::new(a, "out_0", c, "in_0"),
        Link::new(a, "out_1", c, "in_1"),
    ])
    .unwrap();
    sim.run_until_idle();

    assert_eq!(sim.reports().len(), 1);
}

#[test]
fn test_triggers_within_debounce_start_one_search() {
    let (pipeline, [a, b, c]) = abc();
    let mut sim = Simulation::new(pipeline, config(PathComparison::FullPath)).unwrap();

    sim.link_all(abc_links(a, b, c)).unwrap();
    for i in 0..4 {
        sim.run_for(Duration::from_millis(200));
        sim.send(a, DetectionMessage::Trigger(TriggerRef::new(100 + i)))
            .unwrap();
    }
    sim.run_until_idle();

    // One search, one diamond
    assert_eq!(sim.reports().len(), 1);
}

#[test]
fn test_postpone_policy_controls_later_searches() {
    for (policy, expected) in [(PostponePolicy::ResetOnFire, 2), (PostponePolicy::Once, 1)] {
        let (pipeline, [a, b, c]) = abc();
        let config = config(PathComparison::FullPath).with_postpone_policy(policy);
        let mut sim = Simulation::new(pipeline, config).unwrap();

        sim.link_all(abc_links(a, b, c)).unwrap();
        sim.run_for(Duration::from_secs(2));
        assert_eq!(sim.reports().len(), 1);

        // A later, unrelated trigger after the first search has fired
        sim.send(a, DetectionMessage::Trigger(TriggerRef::new(42)))
            .unwrap();
        sim.run_until_idle();
        assert_eq!(sim.reports().len(), expected, "{:?}", policy);
    }
}

#[test]
fn test_state_expires() {
    let (pipeline, [a, b, c]) = abc();
    let mut sim = Simulation::new(pipeline, config(PathComparison::FullPath)).unwrap();

    sim.link_all(abc_links(a, b, c)).unwrap();
    sim.run_for(Duration::from_secs(1));
    assert_eq!(sim.reports().len(), 1);
    assert_eq!(sim.snapshot(c).unwrap().remembered_searches, 1);
    assert_eq!(sim.snapshot(a).unwrap().trigger_refs, 1);

    // Search refs were remembered at t=1s, trigger refs at t=0
    sim.run_for(Duration::from_secs(9));
    assert_eq!(sim.snapshot(a).unwrap().trigger_refs, 0);
    assert_eq!(sim.snapshot(c).unwrap().remembered_searches, 1);

    sim.run_for(Duration::from_secs(1));
    assert_eq!(sim.snapshot(c).unwrap().remembered_searches, 0);
    assert_eq!(sim.snapshot(b).unwrap().remembered_searches, 0);
    assert_eq!(sim.pending(), 0);

    // A new session finds the diamond again
    sim.send(a, DetectionMessage::StartSearch).unwrap();
    sim.run_until_idle();
    assert_eq!(sim.reports().len(), 2);
    assert_ne!(sim.reports()[0].reference(), sim.reports()[1].reference());
}

#[test]
fn test_custom_time_unit() {
    let (pipeline, [a, b, c]) = abc();
    let config = DetectionConfig::with_time_unit(Duration::from_millis(10))
        .with_comparison(PathComparison::FullPath);
    let mut sim = Simulation::new(pipeline, config).unwrap();

    sim.link_all(abc_links(a, b, c)).unwrap();
    sim.run_for(Duration::from_millis(10));
    assert_eq!(sim.reports().len(), 1);

    sim.run_until_idle();
    assert_eq!(sim.now(), Duration::from_millis(110));
}

#[test]
fn test_reports_reach_the_sink() {
    let (pipeline, [a, b, c]) = abc();
    let sink = Arc::new(CollectingSink::new());
    let mut sim = Simulation::new(pipeline, config(PathComparison::FullPath))
        .unwrap()
        .with_sink(sink.clone());

    sim.link_all(abc_links(a, b, c)).unwrap();
    sim.run_until_idle();

    assert_eq!(sink.reports(), sim.reports());
}

#[test]
fn test_disabled_detection_is_silent() {
    let (pipeline, [a, b, c]) = abc();
    let mut sim = Simulation::new(pipeline, DetectionConfig::disabled()).unwrap();

    sim.link_all(abc_links(a, b, c)).unwrap();
    sim.run_until_idle();

    assert!(sim.reports().is_empty());
    assert_eq!(sim.snapshot(a).unwrap().trigger_refs, 0);
}

#[test]
fn test_invalid_link_leaves_simulation_untouched() {
    let (pipeline, [a, b, c]) = abc();
    let mut sim = Simulation::new(pipeline, config(PathComparison::FullPath)).unwrap();

    let result = sim.link_all([
        Link::new(a, "out_0", c, "in_0"),
        Link::new(b, "sink", c, "in_1"),
    ]);
    assert!(result.is_err());
    assert_eq!(sim.pending(), 0);
    assert_eq!(sim.pipeline().edge_count(), 0);
}
