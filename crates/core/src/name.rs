// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent name validation and themed generation.
//!
//! Generated names are memorable `AdjectiveNoun` pairs (or a single word
//! for the minimal theme). On collision the generator appends a numeric
//! suffix `2..=99`; running out of suffixes is a registration failure.
//! Explicitly configured names are validated but never retried — that
//! policy belongs to the registry, not here.

use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

/// Maximum length of a valid agent name.
pub const MAX_NAME_LEN: usize = 50;

/// Highest numeric suffix tried on collision.
const MAX_SUFFIX: u32 = 99;

/// Errors from name validation and generation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NameError {
    #[error("name is empty")]
    Empty,
    #[error("name exceeds {MAX_NAME_LEN} characters ({0})")]
    TooLong(usize),
    #[error("name starts with invalid character {0:?}")]
    BadStart(char),
    #[error("name contains invalid character {0:?}")]
    BadChar(char),
    #[error("no free name available for theme {0}")]
    Exhausted(NameTheme),
}

/// Word-list theme for generated names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameTheme {
    #[default]
    Default,
    Nature,
    Space,
    Minimal,
    Custom,
}

crate::simple_display! {
    NameTheme {
        Default => "default",
        Nature => "nature",
        Space => "space",
        Minimal => "minimal",
        Custom => "custom",
    }
}

/// Validate an agent name: `[A-Za-z0-9_][A-Za-z0-9_-]*`, length ≤ 50.
pub fn validate_name(name: &str) -> Result<(), NameError> {
    let mut chars = name.chars();
    let first = chars.next().ok_or(NameError::Empty)?;
    if name.len() > MAX_NAME_LEN {
        return Err(NameError::TooLong(name.len()));
    }
    if !(first.is_ascii_alphanumeric() || first == '_') {
        return Err(NameError::BadStart(first));
    }
    for c in chars {
        if !(c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(NameError::BadChar(c));
        }
    }
    Ok(())
}

const DEFAULT_ADJECTIVES: &[&str] = &[
    "Brave", "Calm", "Clever", "Eager", "Fuzzy", "Gentle", "Happy", "Jolly", "Keen", "Lucky",
    "Mellow", "Nimble", "Plucky", "Quick", "Rusty", "Snappy", "Sunny", "Swift", "Witty", "Zesty",
];
const DEFAULT_NOUNS: &[&str] = &[
    "Badger", "Condor", "Falcon", "Gopher", "Heron", "Lemur", "Lynx", "Marmot", "Otter", "Panda",
    "Puffin", "Raven", "Seal", "Stoat", "Tapir", "Vole", "Walrus", "Wombat", "Wren", "Yak",
];

const NATURE_ADJECTIVES: &[&str] = &[
    "Amber", "Birch", "Cedar", "Dewy", "Fern", "Flint", "Hazel", "Mossy", "Pebble", "Reedy",
    "Rowan", "Sandy", "Thorn", "Tidal", "Willow",
];
const NATURE_NOUNS: &[&str] = &[
    "Brook", "Cliff", "Dune", "Glade", "Grove", "Inlet", "Knoll", "Marsh", "Meadow", "Ridge",
    "Spring", "Summit", "Thicket", "Vale", "Waterfall",
];

const SPACE_ADJECTIVES: &[&str] = &[
    "Astral", "Binary", "Cosmic", "Lunar", "Nebular", "Orbital", "Polar", "Radiant", "Sidereal",
    "Solar", "Stellar", "Umbral",
];
const SPACE_NOUNS: &[&str] = &[
    "Comet", "Corona", "Meteor", "Nova", "Orbit", "Photon", "Pulsar", "Quasar", "Rover", "Triton",
    "Vega", "Zenith",
];

const MINIMAL_WORDS: &[&str] = &[
    "Ada", "Bix", "Cole", "Dot", "Eli", "Fay", "Gus", "Ivy", "Jax", "Kit", "Lux", "Moe", "Nyx",
    "Oak", "Pax", "Quin", "Rex", "Sol", "Taz", "Uma", "Vik", "Wes", "Xan", "Yui", "Zed",
];

/// Custom word lists supplied through configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NameWords {
    #[serde(default)]
    pub adjectives: Vec<String>,
    #[serde(default)]
    pub nouns: Vec<String>,
}

fn pick_base(theme: NameTheme, words: &NameWords) -> Option<String> {
    let mut rng = rand::rng();
    match theme {
        NameTheme::Minimal => MINIMAL_WORDS.choose(&mut rng).map(|w| (*w).to_string()),
        NameTheme::Custom => {
            let adj = words.adjectives.choose(&mut rng)?;
            let noun = words.nouns.choose(&mut rng)?;
            Some(format!("{adj}{noun}"))
        }
        NameTheme::Default => pair(&mut rng, DEFAULT_ADJECTIVES, DEFAULT_NOUNS),
        NameTheme::Nature => pair(&mut rng, NATURE_ADJECTIVES, NATURE_NOUNS),
        NameTheme::Space => pair(&mut rng, SPACE_ADJECTIVES, SPACE_NOUNS),
    }
}

fn pair(rng: &mut impl rand::Rng, adjectives: &[&str], nouns: &[&str]) -> Option<String> {
    let adj = adjectives.choose(rng)?;
    let noun = nouns.choose(rng)?;
    Some(format!("{adj}{noun}"))
}

/// Generate a free name for `theme`, where `taken` reports collisions.
///
/// A custom theme with empty word lists falls back to the default theme.
/// On collision the base name gets suffixes `2..=99` before giving up.
pub fn generate_name(
    theme: NameTheme,
    words: &NameWords,
    taken: impl Fn(&str) -> bool,
) -> Result<String, NameError> {
    let base = pick_base(theme, words)
        .or_else(|| pick_base(NameTheme::Default, words))
        .ok_or(NameError::Exhausted(theme))?;
    debug_assert!(validate_name(&base).is_ok(), "word lists produce valid names");

    if !taken(&base) {
        return Ok(base);
    }
    for n in 2..=MAX_SUFFIX {
        let candidate = format!("{base}{n}");
        if !taken(&candidate) {
            return Ok(candidate);
        }
    }
    Err(NameError::Exhausted(theme))
}

#[cfg(test)]
#[path = "name_tests.rs"]
mod tests;
