// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    simple = { "Alice" },
    with_digits = { "agent42" },
    underscore_start = { "_scratch" },
    hyphenated = { "swift-otter" },
    single_char = { "a" },
)]
fn valid_names(name: &str) {
    assert_eq!(validate_name(name), Ok(()));
}

#[test]
fn empty_name_rejected() {
    assert_eq!(validate_name(""), Err(NameError::Empty));
}

#[test]
fn leading_hyphen_rejected() {
    assert_eq!(validate_name("-agent"), Err(NameError::BadStart('-')));
}

#[test]
fn interior_space_rejected() {
    assert_eq!(validate_name("two words"), Err(NameError::BadChar(' ')));
}

#[test]
fn unicode_rejected() {
    assert!(matches!(validate_name("héron"), Err(NameError::BadChar(_))));
}

#[test]
fn overlong_name_rejected() {
    let name = "a".repeat(51);
    assert_eq!(validate_name(&name), Err(NameError::TooLong(51)));
}

#[test]
fn length_limit_is_inclusive() {
    let name = "a".repeat(50);
    assert_eq!(validate_name(&name), Ok(()));
}

#[test]
fn generated_names_validate() {
    for theme in [NameTheme::Default, NameTheme::Nature, NameTheme::Space, NameTheme::Minimal] {
        let name = generate_name(theme, &NameWords::default(), |_| false).unwrap();
        assert_eq!(validate_name(&name), Ok(()), "theme {theme} produced {name:?}");
    }
}

#[test]
fn collision_appends_suffix() {
    let name = generate_name(NameTheme::Default, &NameWords::default(), |candidate| {
        // Only base names are taken, numbered ones are free.
        !candidate.ends_with(|c: char| c.is_ascii_digit())
    })
    .unwrap();
    assert!(name.ends_with('2'), "expected first free suffix, got {name:?}");
}

#[test]
fn exhaustion_fails() {
    let err = generate_name(NameTheme::Minimal, &NameWords::default(), |_| true).unwrap_err();
    assert_eq!(err, NameError::Exhausted(NameTheme::Minimal));
}

#[test]
fn custom_theme_uses_word_lists() {
    let words = NameWords {
        adjectives: vec!["Quiet".into()],
        nouns: vec!["Harbor".into()],
    };
    let name = generate_name(NameTheme::Custom, &words, |_| false).unwrap();
    assert_eq!(name, "QuietHarbor");
}

#[test]
fn custom_theme_with_empty_lists_falls_back() {
    let name = generate_name(NameTheme::Custom, &NameWords::default(), |_| false).unwrap();
    assert_eq!(validate_name(&name), Ok(()));
}
