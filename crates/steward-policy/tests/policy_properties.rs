use proptest::prelude::*;
use steward_policy::{Effect, PolicyEngine, PolicyRequest, RulePolicyEngine};

fn engine() -> RulePolicyEngine {
    let mut engine = RulePolicyEngine::with_default_rules();
    engine.deny_capability("shell");
    engine
}

proptest! {
    #[test]
    fn prop_evaluate_is_total_and_deterministic(
        capability in ".{0,24}",
        arguments in ".{0,128}",
        owner in "[a-z0-9-]{1,12}",
    ) {
        let engine = engine();
        let request = PolicyRequest::new(capability, arguments, owner);

        let first = engine.evaluate(&request);
        let second = engine.evaluate(&request);

        prop_assert!(matches!(first.effect, Effect::Allow | Effect::Deny));
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_denied_name_ignores_argument_content(arguments in ".{0,128}") {
        let decision = engine().evaluate(&PolicyRequest::new("shell", arguments, "chat-1"));

        prop_assert_eq!(decision.effect, Effect::Deny);
        prop_assert_eq!(decision.reason, "capability 'shell' is restricted by system policy");
    }

    #[test]
    fn prop_denied_pattern_ignores_capability_name(
        capability in "[a-z_]{1,16}".prop_filter("not the denied name", |c| c != "shell"),
        prefix in "[a-z ]{0,16}",
    ) {
        let arguments = format!(r#"{{"command":"{prefix} rm -rf /"}}"#);
        let decision = engine().evaluate(&PolicyRequest::new(capability, arguments, "chat-1"));

        prop_assert_eq!(decision.effect, Effect::Deny);
        prop_assert!(decision.reason.contains(r"rm\s+-rf"));
    }

    #[test]
    fn prop_clean_arguments_are_allowed(
        capability in "[a-z_]{1,16}".prop_filter("not the denied name", |c| c != "shell"),
        word in "[a-z]{1,8}",
    ) {
        // digits cannot spell a denied pattern
        let arguments = format!(r#"{{"n":{}}}"#, word.len());
        let decision = engine().evaluate(&PolicyRequest::new(capability, arguments, "chat-1"));

        prop_assert_eq!(decision.effect, Effect::Allow);
    }
}
