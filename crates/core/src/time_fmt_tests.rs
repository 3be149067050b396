// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    now = { 0, "just now" },
    four_secs = { 4_999, "just now" },
    seconds = { 42_000, "42s ago" },
    minutes = { 180_000, "3m ago" },
    hours = { 7_200_000, "2h ago" },
    days = { 432_000_000, "5d ago" },
)]
fn formats(elapsed_ms: u64, expected: &str) {
    assert_eq!(format_elapsed_ms(elapsed_ms), expected);
}
