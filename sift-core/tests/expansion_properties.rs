//! Property tests for the expansion engine.

use proptest::prelude::*;

use sift_core::VarMap;

proptest! {
    /// Text with no tokens comes back byte-identical.
    #[test]
    fn plain_text_is_untouched(text in "[a-zA-Z0-9 .,;:_-]{0,40}") {
        let vars = VarMap::new();
        prop_assert_eq!(vars.expand_text(&text).unwrap(), text);
    }

    /// For settled input (no undefined variables, no cycles) a second
    /// expansion changes nothing.
    #[test]
    fn settled_expansion_is_idempotent(
        fragments in prop::collection::vec(
            prop_oneof![
                Just("${A}".to_string()),
                Just("${B}".to_string()),
                "[a-z ]{0,8}",
            ],
            0..8,
        )
    ) {
        let mut vars = VarMap::new();
        vars.store("A", "alpha");
        vars.store("B", "${A} beta");
        let text: String = fragments.concat();
        let once = vars.expand_text(&text).unwrap();
        let twice = vars.expand_text(&once).unwrap();
        prop_assert_eq!(once, twice);
    }

    /// The escape is consumed exactly once per call, defined or not.
    #[test]
    fn escape_round_trip(name in "[A-Z][A-Z0-9_]{0,6}") {
        let text = format!(r"\${{{}}}", name);
        let literal = format!("${{{}}}", name);

        let undefined = VarMap::new();
        prop_assert_eq!(undefined.expand_text(&text).unwrap(), literal.clone());

        let mut defined = VarMap::new();
        defined.store(name.as_str(), "value");
        prop_assert_eq!(defined.expand_text(&text).unwrap(), literal);
    }

    /// A chain of single-step definitions resolves transitively.
    #[test]
    fn recursive_substitution_resolves(final_value in "[a-z]{1,8}") {
        let mut vars = VarMap::new();
        vars.store("A", "${B}");
        vars.store("B", "${C}");
        vars.store("C", final_value.clone());
        prop_assert_eq!(vars.expand_text("${A}").unwrap(), final_value);
    }
}
