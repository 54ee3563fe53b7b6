//! Property-based tests for the ledger's pure building blocks.
//!
//! These tests use proptest to verify invariants across a wide range of inputs,
//! helping to catch edge cases that unit tests might miss.

use backoffice_api::{
    auth::is_permission_implied,
    handlers::common::validate_money,
    slug::{first_free_candidate, slugify, MAX_SLUG_LENGTH},
};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn free_text_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Za-z0-9 _.@-]{0,40}",
        "\\PC{0,40}",
        "[ÀÉÎÕÜçñ a-z]{0,20}",
    ]
}

fn resource_strategy() -> impl Strategy<Value = String> {
    prop_oneof!["stocks", "warehouses", "product-prices", "stock-transactions", "users"]
        .prop_map(|s| s.to_string())
}

// Property: slugs are URL-safe and stable
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn slugs_only_contain_url_safe_characters(text in free_text_strategy()) {
        let slug = slugify(&text);
        prop_assert!(
            slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_'),
            "unexpected character in {:?}", slug
        );
        prop_assert!(!slug.starts_with(['-', '_']));
        prop_assert!(!slug.ends_with(['-', '_']));
        prop_assert!(!slug.contains("--"));
    }

    #[test]
    fn slugify_is_idempotent(text in free_text_strategy()) {
        let once = slugify(&text);
        prop_assert_eq!(slugify(&once), once);
    }

    #[test]
    fn chosen_candidate_is_never_taken(
        base in "[a-z]{1,12}",
        suffixes in proptest::collection::vec(0usize..20, 0..20),
        include_base in any::<bool>(),
    ) {
        let mut taken: Vec<String> = suffixes.iter().map(|n| format!("{base}-{n}")).collect();
        if include_base {
            taken.push(base.clone());
        }

        let chosen = first_free_candidate(&base, &taken);
        prop_assert!(!taken.contains(&chosen));
        prop_assert!(chosen.starts_with(&base));
        prop_assert!(chosen.len() <= MAX_SLUG_LENGTH);
        if !include_base {
            prop_assert_eq!(chosen, base);
        }
    }
}

// Property: money amounts follow the 12 digits / 2 decimals / non-negative rule
proptest! {
    #[test]
    fn two_decimal_amounts_in_range_are_accepted(cents in 0i64..1_000_000_000_000) {
        let amount = Decimal::new(cents, 2);
        prop_assert!(validate_money(&amount).is_ok(), "rejected {}", amount);
    }

    #[test]
    fn third_decimal_place_is_rejected(mills in 0i64..100_000_000, last in 1i64..10) {
        let amount = Decimal::new(mills * 10 + last, 3);
        prop_assert!(validate_money(&amount).is_err(), "accepted {}", amount);
    }

    #[test]
    fn negative_amounts_are_rejected(cents in 1i64..1_000_000) {
        let amount = Decimal::new(-cents, 2);
        prop_assert!(validate_money(&amount).is_err());
    }
}

// Property: wildcards cover exactly their resource
proptest! {
    #[test]
    fn resource_wildcard_implies_only_its_own_actions(
        granted in resource_strategy(),
        required in resource_strategy(),
        action in prop_oneof!["read", "create", "update", "delete"],
    ) {
        let wildcard = format!("{granted}:*");
        let needed = format!("{required}:{action}");
        prop_assert_eq!(is_permission_implied(&wildcard, &needed), granted == required);
        prop_assert!(is_permission_implied("*", &needed));
    }
}
