use gp_kernel::{StateRecord, Transition, WorkflowError, WorkflowGraph, INITIAL_STATE, NEXT_LABEL};
use proptest::prelude::*;
use std::io::Write;

fn name() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

fn text() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 ]{0,20}"
}

prop_compose! {
    fn record()(
        name in name(),
        goal in text(),
        group in text(),
        roles in prop::collection::vec((name(), text()), 0..4),
        completed in any::<bool>(),
        transitions in prop::collection::vec((name(), name()), 0..3),
    ) -> StateRecord {
        let mut rec = StateRecord::new(name, goal).with_group_instructions(group);
        for (role, instructions) in roles {
            rec = rec.with_role(role, instructions);
        }
        for (label, target) in transitions {
            rec = rec.with_transition(label, target);
        }
        rec.completed = completed;
        rec
    }
}

#[test]
fn test_file_loading_by_extension() {
    let dir = tempfile::tempdir().unwrap();

    let yaml_path = dir.path().join("workflow.yaml");
    let mut file = std::fs::File::create(&yaml_path).unwrap();
    writeln!(
        file,
        "name: init\ngoal: Draft a plan\nroles: [Planner]\nindividual_instructions:\n  Planner: Write steps\ntransition: review"
    )
    .unwrap();
    let rec = StateRecord::load(&yaml_path).unwrap();
    assert_eq!(rec.instructions_for("Planner"), "Write steps");
    assert_eq!(rec.transitions[NEXT_LABEL], "review");

    let json_path = dir.path().join("workflow.json");
    std::fs::write(&json_path, serde_json::to_string(&rec).unwrap()).unwrap();
    assert_eq!(StateRecord::load(&json_path).unwrap(), rec);

    assert!(matches!(
        StateRecord::load(dir.path().join("missing.json")),
        Err(WorkflowError::Load(_))
    ));
}

#[test]
fn test_multi_phase_walk() {
    let mut graph = WorkflowGraph::new(
        StateRecord::new("init", "Collect requirements").with_transition(NEXT_LABEL, "design"),
    );
    graph.add_state(
        "design",
        StateRecord::new("design", "Design").with_transition(NEXT_LABEL, "complete"),
    );
    graph.add_state("complete", StateRecord::default());

    for expected in ["design", "complete"] {
        let current = graph.current_state().to_string();
        assert_eq!(graph.transition().unwrap(), Transition::Blocked);
        graph.set_completed(&current, true).unwrap();
        assert!(graph.transition().unwrap().is_advanced());
        assert_eq!(graph.current_state(), expected);
    }
}

proptest! {
    #[test]
    fn prop_serde_round_trip(rec in record()) {
        let json = serde_json::to_string(&rec).unwrap();
        prop_assert_eq!(StateRecord::from_json(&json).unwrap(), rec.clone());
        let yaml = serde_yaml::to_string(&rec).unwrap();
        prop_assert_eq!(StateRecord::from_yaml(&yaml).unwrap(), rec);
    }

    #[test]
    fn prop_incomplete_never_moves(rec in record(), others in prop::collection::vec((name(), record()), 0..4)) {
        let mut rec = rec;
        rec.completed = false;
        let mut graph = WorkflowGraph::new(rec);
        for (name, other) in others {
            if name != INITIAL_STATE {
                graph.add_state(name, other);
            }
        }
        let before = graph.clone();
        prop_assert_eq!(graph.transition(), Ok(Transition::Blocked));
        prop_assert_eq!(graph, before);
    }

    #[test]
    fn prop_completed_moves_to_target(target in name(), goal in text()) {
        prop_assume!(target != INITIAL_STATE);
        let mut graph = WorkflowGraph::new(
            StateRecord::new("init", goal).with_transition(NEXT_LABEL, target.clone()).completed(),
        );
        graph.add_state(target.clone(), StateRecord::default());
        prop_assert!(graph.transition().unwrap().is_advanced());
        prop_assert_eq!(graph.current_state(), target.as_str());
    }

    #[test]
    fn prop_retrieve_returns_last_write(
        name in name(),
        writes in prop::collection::vec(record(), 1..5),
        use_update in any::<bool>(),
    ) {
        let mut graph = WorkflowGraph::new(StateRecord::default());
        let missing_key = format!("{name}-missing");
        prop_assert!(matches!(graph.retrieve_state(&missing_key), Err(WorkflowError::NotFound(_))));
        graph.add_state(name.clone(), writes[0].clone());
        for rec in &writes[1..] {
            if use_update {
                graph.update_state(&name, rec.clone()).unwrap();
            } else {
                graph.add_state(name.clone(), rec.clone());
            }
        }
        prop_assert_eq!(graph.retrieve_state(&name).unwrap(), writes.last().unwrap());
    }
}
