// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn system_clock_returns_nonzero() {
    assert!(SystemClock.epoch_ms() > 0);
}

#[parameterized(
    zero = { 0, 0, 0 },
    single_advance = { 10, 5, 15 },
    two_advances = { 100, 1, 102 },
)]
fn fake_clock_advances(start: u64, delta: u64, expected: u64) {
    let clock = FakeClock::new(start);
    clock.advance_ms(delta);
    if start == 100 {
        clock.advance_ms(delta);
    }
    assert_eq!(clock.epoch_ms(), expected);
}

#[test]
fn fake_clock_set_overrides() {
    let clock = FakeClock::new(5);
    clock.set_ms(42);
    assert_eq!(clock.epoch_ms(), 42);
}

#[test]
fn fake_clock_shares_state_across_clones() {
    let clock = FakeClock::new(0);
    let other = clock.clone();
    other.advance_ms(7);
    assert_eq!(clock.epoch_ms(), 7);
}
