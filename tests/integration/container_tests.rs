//! End-to-end tests for container construction, refresh and snapshots,
//! exercised through the public crate surface.

use std::collections::HashMap;

use stochgraph::{
    Container, Member, Members, ModelError, ModelGraph, SnapshotRef, Value, VariableId,
};

fn real(x: f64) -> Value {
    Value::Real(x)
}

fn stochastic(graph: &mut ModelGraph, name: &str, x: f64) -> VariableId {
    graph
        .add_stochastic(name, real(x), false, HashMap::new())
        .unwrap()
}

#[test]
fn sequence_container_substitutes_live_values_in_place() {
    let mut graph = ModelGraph::default();
    let v1 = stochastic(&mut graph, "v1", 1.0);
    let v2 = stochastic(&mut graph, "v2", 2.0);

    let mut container = Container::construct(
        Members::Sequence(vec![
            Member::Variable(v1),
            Member::Constant(real(10.0)),
            Member::Variable(v2),
            Member::Constant(real(20.0)),
            Member::Constant(real(30.0)),
        ]),
        &mut graph,
    )
    .unwrap();

    assert_eq!(container.n_val(), 2);
    assert_eq!(container.n_nonval(), 3);
    assert_eq!(container.n_val() + container.n_nonval(), container.len());

    match container.snapshot() {
        SnapshotRef::Sequence(values) => assert_eq!(
            values,
            &[real(1.0), real(10.0), real(2.0), real(20.0), real(30.0)]
        ),
        other => panic!("expected sequence snapshot, got {:?}", other),
    }

    graph.set_value(v1, real(9.0)).unwrap();
    graph.set_value(v2, real(9.0)).unwrap();
    container.refresh(&mut graph).unwrap();

    match container.snapshot() {
        SnapshotRef::Sequence(values) => assert_eq!(
            values,
            &[real(9.0), real(10.0), real(9.0), real(20.0), real(30.0)]
        ),
        other => panic!("expected sequence snapshot, got {:?}", other),
    }
}

#[test]
fn refresh_is_idempotent_without_intervening_mutation() {
    let mut graph = ModelGraph::default();
    let v = stochastic(&mut graph, "v", 1.0);

    let mut container = Container::construct(
        Members::Sequence(vec![Member::Variable(v), Member::Constant(real(2.0))]),
        &mut graph,
    )
    .unwrap();

    container.refresh(&mut graph).unwrap();
    let first = match container.snapshot() {
        SnapshotRef::Sequence(values) => values.to_vec(),
        other => panic!("expected sequence snapshot, got {:?}", other),
    };
    container.refresh(&mut graph).unwrap();
    match container.snapshot() {
        SnapshotRef::Sequence(values) => assert_eq!(values, first.as_slice()),
        other => panic!("expected sequence snapshot, got {:?}", other),
    }
}

#[test]
fn mapping_refresh_touches_only_the_changed_key() {
    let mut graph = ModelGraph::default();
    let mu = stochastic(&mut graph, "mu", 0.0);
    let sigma = stochastic(&mut graph, "sigma", 1.0);

    let mut container = Container::construct(
        Members::Mapping(vec![
            ("mu".to_string(), Member::Variable(mu)),
            ("sigma".to_string(), Member::Variable(sigma)),
            ("n".to_string(), Member::Constant(real(100.0))),
        ]),
        &mut graph,
    )
    .unwrap();

    let before = match container.snapshot() {
        SnapshotRef::Mapping(map) => map.clone(),
        other => panic!("expected mapping snapshot, got {:?}", other),
    };

    graph.set_value(mu, real(0.5)).unwrap();
    container.refresh(&mut graph).unwrap();

    match container.snapshot() {
        SnapshotRef::Mapping(map) => {
            assert_eq!(map.get("mu"), Some(&real(0.5)));
            assert_eq!(map.get("sigma"), before.get("sigma"));
            assert_eq!(map.get("n"), before.get("n"));
        }
        other => panic!("expected mapping snapshot, got {:?}", other),
    }
}

#[test]
fn array_refresh_updates_exactly_the_ravelled_variable_positions() {
    let mut graph = ModelGraph::default();
    let v0 = stochastic(&mut graph, "v0", 0.0);
    let v4 = stochastic(&mut graph, "v4", 4.0);

    let mut container = Container::construct(
        Members::Array {
            shape: vec![2, 3],
            data: vec![
                Member::Variable(v0),
                Member::Constant(real(1.0)),
                Member::Constant(real(2.0)),
                Member::Constant(real(3.0)),
                Member::Variable(v4),
                Member::Constant(real(5.0)),
            ],
        },
        &mut graph,
    )
    .unwrap();

    let before = match container.snapshot() {
        SnapshotRef::Array { data, .. } => data.to_vec(),
        other => panic!("expected array snapshot, got {:?}", other),
    };

    graph.set_value(v0, real(-1.0)).unwrap();
    graph.set_value(v4, real(-4.0)).unwrap();
    container.refresh(&mut graph).unwrap();

    match container.snapshot() {
        SnapshotRef::Array { shape, data } => {
            assert_eq!(shape, &[2, 3]);
            assert_eq!(data[0], real(-1.0));
            assert_eq!(data[4], real(-4.0));
            for ind in [1usize, 2, 3, 5] {
                assert_eq!(data[ind], before[ind], "ravelled position {} untouched", ind);
            }
        }
        other => panic!("expected array snapshot, got {:?}", other),
    }
}

#[test]
fn object_attributes_project_the_delegated_mapping() {
    let mut graph = ModelGraph::default();
    let rate = stochastic(&mut graph, "rate", 0.25);

    let mut container = Container::construct(
        Members::Object(vec![
            ("rate".to_string(), Member::Variable(rate)),
            ("offset".to_string(), Member::Constant(real(3.0))),
        ]),
        &mut graph,
    )
    .unwrap();

    graph.set_value(rate, real(0.75)).unwrap();
    container.refresh(&mut graph).unwrap();

    let object = match &container {
        Container::Object(object) => object,
        other => panic!("expected object container, got {:?}", other),
    };
    assert_eq!(object.snapshot(), object.inner().snapshot());
    assert_eq!(object.attr("rate"), Some(&real(0.75)));
    assert_eq!(object.attr("offset"), Some(&real(3.0)));
}

#[test]
fn malformed_member_collections_are_rejected_at_construction() {
    let mut graph = ModelGraph::default();

    let err = Container::construct(
        Members::Array {
            shape: vec![2, 3],
            data: vec![Member::Constant(real(0.0)); 5],
        },
        &mut graph,
    )
    .unwrap_err();
    assert!(matches!(err, ModelError::ContainerShape(_)));

    let err = Container::construct(
        Members::Mapping(vec![
            ("k".to_string(), Member::Constant(real(1.0))),
            ("k".to_string(), Member::Constant(real(2.0))),
        ]),
        &mut graph,
    )
    .unwrap_err();
    assert!(matches!(err, ModelError::ContainerShape(_)));
}

#[test]
fn freshness_follows_member_mutations_only() {
    let mut graph = ModelGraph::default();
    let inside = stochastic(&mut graph, "inside", 1.0);
    let outside = stochastic(&mut graph, "outside", 2.0);

    let mut container = Container::construct(
        Members::Sequence(vec![Member::Variable(inside), Member::Constant(real(0.0))]),
        &mut graph,
    )
    .unwrap();
    assert!(container.is_fresh(&graph));

    graph.set_value(outside, real(5.0)).unwrap();
    assert!(container.is_fresh(&graph), "unrelated variables do not stale it");

    graph.set_value(inside, real(5.0)).unwrap();
    assert!(!container.is_fresh(&graph));

    container.refresh(&mut graph).unwrap();
    assert!(container.is_fresh(&graph));
}

#[test]
fn container_reports_its_member_variables() {
    let mut graph = ModelGraph::default();
    let a = stochastic(&mut graph, "a", 1.0);
    let b = stochastic(&mut graph, "b", 2.0);

    let container = Container::construct(
        Members::Sequence(vec![
            Member::Constant(real(0.0)),
            Member::Variable(a),
            Member::Variable(b),
        ]),
        &mut graph,
    )
    .unwrap();

    assert_eq!(container.variable_ids(), vec![a, b]);
}

#[test]
fn one_sampler_step_flows_through_graph_and_container() {
    use std::sync::Arc;
    use stochgraph::{EvalFn, Parent};

    // mu -> scaled = 10 * mu; the container aggregates [scaled, mu, const].
    let mut graph = ModelGraph::default();
    let mu = stochastic(&mut graph, "mu", 1.0);
    let eval: EvalFn = Arc::new(|args: &HashMap<String, Value>| {
        let x = args.get("x").and_then(Value::as_real).ok_or("missing x")?;
        Ok(Value::Real(10.0 * x))
    });
    let scaled = graph
        .add_deterministic(
            "scaled",
            eval,
            HashMap::from([("x".to_string(), Parent::Var(mu))]),
        )
        .unwrap();

    let mut container = Container::construct(
        Members::Sequence(vec![
            Member::Variable(scaled),
            Member::Variable(mu),
            Member::Constant(real(-1.0)),
        ]),
        &mut graph,
    )
    .unwrap();

    match container.snapshot() {
        SnapshotRef::Sequence(values) => {
            assert_eq!(values, &[real(10.0), real(1.0), real(-1.0)])
        }
        other => panic!("expected sequence snapshot, got {:?}", other),
    }

    // Driver step: mutate, then refresh on demand.
    graph.set_value(mu, real(3.0)).unwrap();
    assert!(!container.is_fresh(&graph));
    container.refresh(&mut graph).unwrap();

    match container.snapshot() {
        SnapshotRef::Sequence(values) => {
            assert_eq!(values, &[real(30.0), real(3.0), real(-1.0)])
        }
        other => panic!("expected sequence snapshot, got {:?}", other),
    }
}
