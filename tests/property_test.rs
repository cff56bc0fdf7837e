//! Property tests for the text layer

#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use fparse::text::{is_bracketed, mask, split_bracketed, split_quoted};
use proptest::prelude::*;

/// Balanced parenthesised text without quotes
fn balanced() -> impl Strategy<Value = String> {
    let leaf = "[a-z0-9 +*,]{0,6}";
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop::collection::vec(
            prop_oneof![
                inner.clone(),
                inner.prop_map(|s| format!("({s})")),
            ],
            1..4,
        )
        .prop_map(|parts| parts.concat())
    })
}

proptest! {
    #[test]
    fn test_mask_is_invertible(text in "[a-zA-Z0-9 +*/=,.()'\"_%-]{0,60}") {
        let masked = mask(&text);
        prop_assert_eq!(masked.unmask(), text);
    }

    #[test]
    fn test_masked_exponents_are_invertible(
        a in "[a-z]{1,3}",
        mantissa in "[0-9]{1,3}\\.[0-9]{0,3}",
        exp in "[eEdD][+-]?[0-9]{1,2}",
    ) {
        let text = format!("{a} = {mantissa}{exp} + f({a}, 'x y')");
        let masked = mask(&text);
        prop_assert!(!masked.text.contains(&exp));
        prop_assert_eq!(masked.unmask(), text);
    }

    #[test]
    fn test_split_bracketed_covers_input(text in "[a-z()\\[\\]'\" ,\\\\]{0,40}") {
        let pieces = split_bracketed(&text, "([", ")]");
        prop_assert_eq!(pieces.concat(), text);
        prop_assert!(pieces.iter().all(|p| !p.is_empty()));
    }

    #[test]
    fn test_split_bracketed_balanced_runs(text in balanced()) {
        for piece in split_bracketed(&text, "(", ")") {
            if piece.starts_with('(') {
                prop_assert!(is_bracketed(&piece, '(', ')'), "{}", piece);
            } else {
                prop_assert!(!piece.contains('('), "{}", piece);
            }
        }
    }

    #[test]
    fn test_split_quoted_covers_input(text in "[a-z '\"]{0,40}") {
        let (segments, _) = split_quoted(&text, None);
        let joined: String = segments.iter().map(|s| s.as_str()).collect();
        prop_assert_eq!(joined, text);
    }
}
