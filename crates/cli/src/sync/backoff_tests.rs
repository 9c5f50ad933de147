// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn test_doubles_until_cap() {
    let mut backoff = Backoff::new(Duration::from_millis(500), Duration::from_secs(4));
    let delays: Vec<u64> = (0..6).map(|_| backoff.next_delay().as_millis() as u64).collect();
    assert_eq!(delays, vec![500, 1_000, 2_000, 4_000, 4_000, 4_000]);
    assert_eq!(backoff.attempt(), 6);
}

#[test]
fn test_reset_starts_over() {
    let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(60));
    backoff.next_delay();
    backoff.next_delay();
    backoff.reset();
    assert_eq!(backoff.attempt(), 0);
    assert_eq!(backoff.next_delay(), Duration::from_millis(100));
}

#[parameterized(
    shift_overflow = { 40 },
    huge = { 1_000 },
)]
fn test_large_attempts_saturate_at_cap(attempts: u32) {
    let mut backoff = Backoff::new(Duration::from_millis(500), Duration::from_secs(60));
    for _ in 0..attempts {
        backoff.next_delay();
    }
    assert_eq!(backoff.next_delay(), Duration::from_secs(60));
}
