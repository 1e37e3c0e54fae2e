//! Property-based tests for matching, normalisation and rule checks.
//!
//! # Running Property Tests
//!
//! ```bash
//! cargo test -p hxl --test property_tests
//!
//! # More cases
//! PROPTEST_CASES=10000 cargo test -p hxl --test property_tests
//! ```

use proptest::prelude::*;

use hxl::datatypes::{normalise, normalise_string, type_of, InferredType};
use hxl::validation::{find_closest_match, get_common_prefix_len, get_edit_distance};
use hxl::{Column, DataType, SchemaRule, TagPattern};

// =============================================================================
// Test Strategies
// =============================================================================

/// Short words, the usual shape of enumeration values.
fn word() -> impl Strategy<Value = String> {
    "[a-zA-Z ]{0,12}"
}

/// Arbitrary strings, including non-ASCII.
fn any_text() -> impl Strategy<Value = String> {
    "\\PC{0,40}"
}

fn hashtag() -> impl Strategy<Value = String> {
    "#[a-z][a-z0-9_]{0,10}"
}

// =============================================================================
// Edit Distance
// =============================================================================

proptest! {
    #[test]
    fn edit_distance_is_symmetric(a in word(), b in word()) {
        prop_assert_eq!(get_edit_distance(&a, &b), get_edit_distance(&b, &a));
    }

    #[test]
    fn edit_distance_to_self_is_zero(a in any_text()) {
        prop_assert_eq!(get_edit_distance(&a, &a), 0);
    }

    #[test]
    fn edit_distance_bounded_by_longer_length(a in any_text(), b in any_text()) {
        let longest = a.chars().count().max(b.chars().count());
        prop_assert!(get_edit_distance(&a, &b) <= longest);
    }

    #[test]
    fn edit_distance_triangle_inequality(a in word(), b in word(), c in word()) {
        prop_assert!(
            get_edit_distance(&a, &c) <= get_edit_distance(&a, &b) + get_edit_distance(&b, &c)
        );
    }

    #[test]
    fn common_prefix_never_exceeds_shorter(a in any_text(), b in any_text()) {
        let shorter = a.chars().count().min(b.chars().count());
        prop_assert!(get_common_prefix_len(&a, &b) <= shorter);
    }
}

// =============================================================================
// Closest Match
// =============================================================================

proptest! {
    #[test]
    fn closest_match_is_a_candidate(s in word(), candidates in prop::collection::vec(word(), 0..8)) {
        if let Some(found) = find_closest_match(&s, candidates.iter().map(String::as_str)) {
            prop_assert!(candidates.iter().any(|c| c == found));
        }
    }

    #[test]
    fn closest_match_respects_cutoff(s in word(), candidates in prop::collection::vec(word(), 0..8)) {
        if let Some(found) = find_closest_match(&s, candidates.iter().map(String::as_str)) {
            let limit = s.chars().count() as f64 / 2.0;
            prop_assert!(get_edit_distance(&s, found) as f64 <= limit);
        }
    }

    #[test]
    fn exact_candidate_always_wins(s in "[a-z]{1,10}", others in prop::collection::vec(word(), 0..6)) {
        let mut candidates = others.clone();
        candidates.push(s.clone());
        let found = find_closest_match(&s, candidates.iter().map(String::as_str));
        prop_assert_eq!(get_edit_distance(&s, found.unwrap_or_default()), 0);
    }
}

// =============================================================================
// Normalisation
// =============================================================================

proptest! {
    #[test]
    fn normalise_string_is_idempotent(s in any_text()) {
        let once = normalise_string(&s);
        prop_assert_eq!(normalise_string(&once), once.clone());
    }

    #[test]
    fn normalise_never_panics(s in any_text(), tag in hashtag()) {
        let column = Column::new(tag);
        let _ = normalise(&s, Some(&column));
        let _ = type_of(&s, Some(&column));
    }

    #[test]
    fn integers_infer_as_numbers(n in -1_000_000i64..1_000_000) {
        prop_assert_eq!(type_of(&n.to_string(), None), InferredType::Number);
    }

    #[test]
    fn equivalent_numbers_normalise_equal(n in 0u32..100_000) {
        prop_assert_eq!(normalise(&format!("{n}.0"), None), normalise(&n.to_string(), None));
    }
}

// =============================================================================
// Rules and Patterns
// =============================================================================

proptest! {
    #[test]
    fn blank_values_always_pass(blank in "[ \t]{0,5}") {
        let mut rule = SchemaRule::parse("#affected")
            .unwrap()
            .with_data_type(DataType::Number)
            .with_min_value(0.0)
            .with_enumeration(["1"])
            .unique();
        prop_assert!(rule.validate(&blank, None, None));
    }

    #[test]
    fn range_check_matches_comparison(n in -1000i32..1000) {
        let mut rule = SchemaRule::parse("#affected")
            .unwrap()
            .with_min_value(-100.0)
            .with_max_value(100.0);
        let expected = (-100..=100).contains(&n);
        prop_assert_eq!(rule.validate(&n.to_string(), None, None), expected);
    }

    #[test]
    fn bare_pattern_matches_any_attributes(
        tag in hashtag(),
        attributes in prop::collection::vec("[a-z][a-z0-9_]{0,6}", 0..4),
    ) {
        let column = attributes
            .iter()
            .fold(Column::new(tag.as_str()), |c, a| c.with_attribute(a));
        let pattern = TagPattern::parse(&tag).unwrap();
        prop_assert!(pattern.matches(&column));
    }
}
