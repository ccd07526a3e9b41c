//! Invocation extraction and binding properties

use gp_core::{CapabilityRegistry, Command, Invocation, InvocationError, InvocationExtractor, ManifestBuilder};
use gp_test_utils::{answer, sample_workflow};
use proptest::prelude::*;

fn value() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 ,=:.]{0,20}"
}

proptest! {
    #[test]
    fn test_extract_returns_text_between_markers(body in "[A-Za-z0-9_(),' ]{1,40}") {
        let extractor = InvocationExtractor::default();
        let text = answer(&body);
        prop_assert_eq!(extractor.extract(&text), Some(body.as_str()));
    }

    #[test]
    fn test_keyword_values_survive_parsing(state in value(), goal in value()) {
        let text = format!("update_goal(state_name='{state}', goal=\"{goal}\");");
        let invocation = Invocation::parse(&text).unwrap();
        prop_assert_eq!(&invocation.name, "update_goal");
        prop_assert_eq!(&invocation.named["state_name"], &state);
        prop_assert_eq!(&invocation.named["goal"], &goal);
    }

    #[test]
    fn test_unregistered_names_never_bind(name in "[a-z_]{1,16}") {
        let registry = CapabilityRegistry::with_defaults();
        prop_assume!(registry.get(&name).is_none());
        let invocation = Invocation::parse(&format!("{name}()")).unwrap();
        prop_assert_eq!(
            Command::bind(&registry, &invocation),
            Err(InvocationError::UnknownFunction(name))
        );
    }
}

#[test]
fn test_manifest_lists_every_default_command() {
    let builder = ManifestBuilder::default();
    let manifest = builder.manifest();
    for descriptor in builder.registry().iter() {
        assert!(manifest.contains(&format!("# {}\ndef {}(self", descriptor.name, descriptor.name)));
    }
    let message = builder.system_message("Planner", &sample_workflow()).unwrap();
    assert!(message.contains("Propose the states the workflow needs."));
}
