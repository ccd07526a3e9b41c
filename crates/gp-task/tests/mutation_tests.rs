use gp_task::{
    ApplyMode, PathMutationEngine, PathUpdate, TaskError, TaskSpec, TaskTree, UpdateOutcome,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// Five levels deep, one extra sibling at level two
fn five_level_tree() -> TaskTree {
    let leaf = TaskSpec::new("Task5", "Goal 5").with_participant("Role 1", "Instructions 5");
    let spec = TaskSpec::new("Task1", "Goal 1")
        .with_participant("Role 1", "Instructions 1")
        .with_participant("Role 2", "Instructions 2")
        .with_sub_task(
            TaskSpec::new("Task2", "Goal 2").with_sub_task(
                TaskSpec::new("Task3", "Goal 3")
                    .with_sub_task(TaskSpec::new("Task4", "Goal 4").with_sub_task(leaf)),
            ),
        )
        .with_sub_task(TaskSpec::new("Sibling", "Goal S"));
    TaskTree::new(spec).unwrap()
}

fn goal_at(tree: &TaskTree, path: &[&str]) -> String {
    let mut id = tree.root();
    for name in path {
        id = tree.child_named(id, name).unwrap().unwrap();
    }
    tree.node(id).unwrap().goal().to_string()
}

#[test]
fn test_root_goal_update_changes_only_goal() {
    let mut tree = five_level_tree();
    let mut expected = tree.to_spec().unwrap();
    expected.goal = "X".into();

    PathMutationEngine::default()
        .apply(&mut tree, [("goal", "X")])
        .unwrap();

    assert_eq!(tree.to_spec().unwrap(), expected);
}

#[test]
fn test_nested_goal_update_leaves_siblings() {
    let mut tree = five_level_tree();
    PathMutationEngine::strict()
        .apply(&mut tree, [("Task2.Task3.goal", "\"Z\"")])
        .unwrap();
    assert_eq!(goal_at(&tree, &["Task2", "Task3"]), "Z");
    assert_eq!(goal_at(&tree, &["Task2"]), "Goal 2");
    assert_eq!(goal_at(&tree, &["Sibling"]), "Goal S");
    assert_eq!(goal_at(&tree, &["Task2", "Task3", "Task4"]), "Goal 4");
}

#[test]
fn test_missing_child_is_invalid_path() {
    let mut tree = five_level_tree();
    let before = tree.clone();
    let err = PathMutationEngine::strict()
        .apply(&mut tree, [("Sibling.Task3.goal", "Z")])
        .unwrap_err();
    assert!(matches!(err, TaskError::InvalidPath { ref segment, .. } if segment == "Task3"));
    assert!(err.is_structural());
    assert_eq!(tree, before);
}

#[test]
fn test_deep_path_with_sub_tasks_aids() {
    let mut tree = five_level_tree();
    PathMutationEngine::strict()
        .apply(
            &mut tree,
            [(
                "sub_tasks.Task2.sub_tasks.Task3.sub_tasks.Task4.sub_tasks.Task5.goal",
                "'Deep'",
            )],
        )
        .unwrap();
    assert_eq!(goal_at(&tree, &["Task2", "Task3", "Task4", "Task5"]), "Deep");
}

#[test]
fn test_current_task_walks_five_levels() {
    let tree = five_level_tree();
    let current = tree.current_task().unwrap();
    assert_eq!(tree.node(current).unwrap().name(), "Task5");
    let prompts = tree.generate_prompts("Goal 1").unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts["Role 1"].contains("The current goal is: Goal 5."));
}

#[test]
fn test_nested_descriptor_builds_equivalent_tree() {
    let mut tree = TaskTree::new(TaskSpec::new("Root", "r")).unwrap();
    PathMutationEngine::strict()
        .apply(
            &mut tree,
            [(
                "Plan",
                r#"Task("Plan", "p", {"Lead": "Decide"}, [Task("A", "a"), Task("B", "b", completed=True)])"#,
            )],
        )
        .unwrap();

    let expected = TaskSpec::new("Plan", "p")
        .with_participant("Lead", "Decide")
        .with_sub_task(TaskSpec::new("A", "a"))
        .with_sub_task(TaskSpec::new("B", "b").completed());
    let plan = tree.child_named(tree.root(), "Plan").unwrap().unwrap();
    assert_eq!(tree.spec_of(plan).unwrap(), expected);
}

#[test]
fn test_strict_stops_at_first_failure() {
    let mut tree = five_level_tree();
    let err = PathMutationEngine::strict()
        .apply(
            &mut tree,
            [("goal", "first"), ("Nope.goal", "x"), ("Task2.goal", "never")],
        )
        .unwrap_err();
    assert!(matches!(err, TaskError::InvalidPath { .. }));
    assert_eq!(goal_at(&tree, &[]), "first");
    assert_eq!(goal_at(&tree, &["Task2"]), "Goal 2");
}

#[test]
fn test_best_effort_reports_every_update() {
    let mut tree = five_level_tree();
    let report = PathMutationEngine::new(ApplyMode::BestEffort)
        .apply(
            &mut tree,
            vec![
                PathUpdate::new("goal", "first"),
                PathUpdate::new("Nope.goal", "x"),
                PathUpdate::new("", "x"),
                PathUpdate::new("Task2.goal", "kept"),
            ],
        )
        .unwrap();
    assert_eq!(report.outcomes.len(), 4);
    assert_eq!(report.applied(), 2);
    assert_eq!(report.skipped().count(), 1);
    assert_eq!(report.failures().count(), 1);
    assert!(matches!(report.outcomes[1], UpdateOutcome::Failed { .. }));
    assert_eq!(goal_at(&tree, &["Task2"]), "kept");
}

#[test]
fn test_yaml_spec_loads_tree() {
    let yaml = r"
name: Root
goal: Plan the offsite
participants:
  Organizer: Book the venue
sub_tasks:
  - name: Venue
    goal: Pick a venue
current_sub_task: Venue
";
    let spec: TaskSpec = serde_yaml::from_str(yaml).unwrap();
    let tree = TaskTree::new(spec).unwrap();
    let current = tree.current_task().unwrap();
    assert_eq!(tree.node(current).unwrap().name(), "Venue");
}

fn goal_text() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 ]{0,20}[A-Za-z0-9]"
}

proptest! {
    #[test]
    fn prop_empty_updates_never_change_tree(
        path in prop::option::of("[a-z.]{0,8}"),
        blank in "[ \t]{0,3}",
    ) {
        let mut tree = five_level_tree();
        let before = tree.clone();
        let report = PathMutationEngine::default()
            .apply(&mut tree, [PathUpdate { path, value: Some(blank) }])
            .unwrap();
        prop_assert_eq!(report.skipped().count(), 1);
        prop_assert_eq!(tree, before);
    }

    #[test]
    fn prop_goal_update_sets_exactly_goal(goal in goal_text()) {
        let mut tree = five_level_tree();
        let mut expected = tree.to_spec().unwrap();
        expected.sub_tasks[0].sub_tasks[0].goal = goal.clone();
        PathMutationEngine::strict()
            .apply(&mut tree, [("Task2.Task3.goal", goal.as_str())])
            .unwrap();
        prop_assert_eq!(tree.to_spec().unwrap(), expected);
    }

    #[test]
    fn prop_last_write_wins(first in goal_text(), second in goal_text()) {
        let mut tree = five_level_tree();
        PathMutationEngine::default()
            .apply(&mut tree, [("goal", first), ("goal", second.clone())])
            .unwrap();
        prop_assert_eq!(goal_at(&tree, &[]), second);
    }
}
