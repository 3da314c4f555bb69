//! End-to-end tests driving the variable graph the way a sampler would.

use std::collections::HashMap;
use std::sync::Arc;

use stochgraph::{EvalFn, ModelError, ModelGraph, Parent, Value, VariableId};

fn real(x: f64) -> Value {
    Value::Real(x)
}

fn parents(pairs: &[(&str, Parent)]) -> HashMap<String, Parent> {
    pairs
        .iter()
        .map(|(role, parent)| (role.to_string(), parent.clone()))
        .collect()
}

/// A small regression-style model:
///
/// ```text
/// slope, intercept   stochastic
/// prediction = slope * x + intercept   deterministic, x constant
/// y   observed stochastic with prediction as a parent
/// ```
fn build_line_model(graph: &mut ModelGraph) -> (VariableId, VariableId, VariableId) {
    let slope = graph
        .add_stochastic("slope", real(2.0), false, HashMap::new())
        .unwrap();
    let intercept = graph
        .add_stochastic("intercept", real(1.0), false, HashMap::new())
        .unwrap();

    let eval: EvalFn = Arc::new(|args: &HashMap<String, Value>| {
        let slope = args.get("slope").and_then(Value::as_real).ok_or("missing slope")?;
        let intercept = args
            .get("intercept")
            .and_then(Value::as_real)
            .ok_or("missing intercept")?;
        let x = args.get("x").and_then(Value::as_real).ok_or("missing x")?;
        Ok(Value::Real(slope * x + intercept))
    });
    let prediction = graph
        .add_deterministic(
            "prediction",
            eval,
            parents(&[
                ("slope", Parent::Var(slope)),
                ("intercept", Parent::Var(intercept)),
                ("x", Parent::Const(real(3.0))),
            ]),
        )
        .unwrap();

    let _y = graph
        .add_stochastic(
            "y",
            real(7.2),
            true,
            parents(&[("mu", Parent::Var(prediction))]),
        )
        .unwrap();

    (slope, intercept, prediction)
}

#[test]
fn deterministic_variable_tracks_its_parents() {
    let mut graph = ModelGraph::default();
    let (slope, _intercept, prediction) = build_line_model(&mut graph);

    assert_eq!(graph.value(prediction).unwrap(), real(7.0));

    graph.set_value(slope, real(3.0)).unwrap();
    assert_eq!(graph.value(prediction).unwrap(), real(10.0));
}

#[test]
fn observed_data_is_never_reassigned() {
    let mut graph = ModelGraph::default();
    build_line_model(&mut graph);

    let y = graph
        .variables()
        .iter()
        .find(|v| v.name == "y")
        .map(|v| v.id)
        .unwrap();
    assert!(graph.variable(y).unwrap().is_observed());
    assert!(matches!(
        graph.set_value(y, real(0.0)),
        Err(ModelError::ImmutableValue { .. })
    ));
}

#[test]
fn metropolis_style_propose_and_reject_round_trip() {
    let mut graph = ModelGraph::default();
    let (slope, _intercept, prediction) = build_line_model(&mut graph);

    let before = graph.value(prediction).unwrap();

    // Propose a jump, inspect the implied prediction, then reject it.
    graph.set_value(slope, real(50.0)).unwrap();
    let proposed = graph.value(prediction).unwrap();
    assert_ne!(proposed, before);

    graph.revert_value(slope).unwrap();
    assert_eq!(graph.value(slope).unwrap(), real(2.0));
    assert_eq!(graph.value(prediction).unwrap(), before);
}

#[test]
fn computation_failure_surfaces_the_offending_variable() {
    let mut graph = ModelGraph::default();
    let base = graph
        .add_stochastic("base", real(1.0), false, HashMap::new())
        .unwrap();

    let log_eval: EvalFn = Arc::new(|args: &HashMap<String, Value>| {
        let x = args.get("x").and_then(Value::as_real).ok_or("missing x")?;
        if x <= 0.0 {
            return Err(format!("log of non-positive value {}", x));
        }
        Ok(Value::Real(x.ln()))
    });
    let log_base = graph
        .add_deterministic("log_base", log_eval, parents(&[("x", Parent::Var(base))]))
        .unwrap();

    let double_eval: EvalFn = Arc::new(|args: &HashMap<String, Value>| {
        let x = args.get("x").and_then(Value::as_real).ok_or("missing x")?;
        Ok(Value::Real(2.0 * x))
    });
    let doubled = graph
        .add_deterministic(
            "doubled",
            double_eval,
            parents(&[("x", Parent::Var(log_base))]),
        )
        .unwrap();

    assert_eq!(graph.value(doubled).unwrap(), real(0.0));

    graph.set_value(base, real(-2.0)).unwrap();
    match graph.value(doubled).unwrap_err() {
        ModelError::Computation { variable, reason } => {
            assert_eq!(variable, "log_base", "the failing variable is named");
            assert!(reason.contains("log of non-positive"));
        }
        other => panic!("expected Computation, got {:?}", other),
    }

    // The caches survived the failed pull.
    assert_eq!(graph.cached_value(log_base), Some(&real(0.0)));
    assert_eq!(graph.cached_value(doubled), Some(&real(0.0)));
}

#[test]
fn rewiring_a_parent_rebinds_the_dependency() {
    let mut graph = ModelGraph::default();
    let a = graph
        .add_stochastic("a", real(1.0), false, HashMap::new())
        .unwrap();
    let b = graph
        .add_stochastic("b", real(5.0), false, HashMap::new())
        .unwrap();

    let eval: EvalFn = Arc::new(|args: &HashMap<String, Value>| {
        let x = args.get("x").and_then(Value::as_real).ok_or("missing x")?;
        Ok(Value::Real(x + 100.0))
    });
    let shifted = graph
        .add_deterministic("shifted", eval, parents(&[("x", Parent::Var(a))]))
        .unwrap();

    assert_eq!(graph.value(shifted).unwrap(), real(101.0));

    graph.rewire_parent(shifted, "x", Parent::Var(b)).unwrap();
    assert_eq!(graph.value(shifted).unwrap(), real(105.0));

    // Changes to the abandoned parent no longer invalidate the child.
    graph.set_value(a, real(1000.0)).unwrap();
    assert!(!graph.variable(shifted).unwrap().is_stale());
}

#[test]
fn whole_model_acyclicity_validates() {
    let mut graph = ModelGraph::default();
    build_line_model(&mut graph);
    graph.validate_acyclic().unwrap();
}
