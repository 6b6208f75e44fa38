// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Custom Test Assertions
//!
//! Assertion helpers with informative failure messages.

use std::ops::RangeInclusive;
use std::time::Duration;

use uademo_core::{DataValue, StatusCode, Variant};
use uademo_sampling::{DataItem, QueuedDataItem};

// =============================================================================
// DataValue Assertions
// =============================================================================

/// Assertion extensions for [`DataValue`].
pub trait DataValueAssertions {
    /// Assert that the status is Good.
    fn assert_good(&self);

    /// Assert a specific status.
    fn assert_status(&self, expected: StatusCode);

    /// Assert the carried value.
    fn assert_value(&self, expected: &Variant);

    /// Assert that both timestamps are present.
    fn assert_timestamped(&self);
}

impl DataValueAssertions for DataValue {
    fn assert_good(&self) {
        assert!(
            self.is_good(),
            "Expected Good status, but got {} (value {:?})",
            self.status,
            self.value
        );
    }

    fn assert_status(&self, expected: StatusCode) {
        assert_eq!(
            self.status, expected,
            "Expected status {}, but got {}",
            expected, self.status
        );
    }

    fn assert_value(&self, expected: &Variant) {
        assert_eq!(
            self.value.as_ref(),
            Some(expected),
            "Expected value {}, but got {:?}",
            expected,
            self.value
        );
    }

    fn assert_timestamped(&self) {
        assert!(self.source_timestamp.is_some(), "Missing source timestamp");
        assert!(self.server_timestamp.is_some(), "Missing server timestamp");
    }
}

// =============================================================================
// Item Assertions
// =============================================================================

/// Assertion extensions for [`QueuedDataItem`].
pub trait ItemAssertions {
    /// Assert the total number of delivered values.
    fn assert_delivered(&self, expected: u64);

    /// Assert the total number of delivered values lies in `range`.
    fn assert_delivered_in(&self, range: RangeInclusive<u64>);

    /// Drain and assert the values queued, in order.
    fn assert_drained_values(&self, expected: &[Variant]);

    /// Assert nothing is queued.
    fn assert_empty(&self);
}

impl ItemAssertions for QueuedDataItem {
    fn assert_delivered(&self, expected: u64) {
        assert_eq!(
            self.delivered_count(),
            expected,
            "Item {} delivered {} values, expected {}",
            self.id(),
            self.delivered_count(),
            expected
        );
    }

    fn assert_delivered_in(&self, range: RangeInclusive<u64>) {
        let delivered = self.delivered_count();
        assert!(
            range.contains(&delivered),
            "Item {} delivered {} values, expected {:?}",
            self.id(),
            delivered,
            range
        );
    }

    fn assert_drained_values(&self, expected: &[Variant]) {
        let drained: Vec<Option<Variant>> = self.drain().into_iter().map(|v| v.value).collect();
        let expected: Vec<Option<Variant>> = expected.iter().cloned().map(Some).collect();
        assert_eq!(drained, expected, "Item {} queued unexpected values", self.id());
    }

    fn assert_empty(&self) {
        assert!(
            self.is_empty(),
            "Item {} still has {} queued values",
            self.id(),
            self.len()
        );
    }
}

// =============================================================================
// Count Assertions
// =============================================================================

/// Assert that `actual` falls within `range`.
pub fn assert_count_in_range(actual: usize, range: RangeInclusive<usize>, what: &str) {
    assert!(
        range.contains(&actual),
        "Expected {} in {:?}, but got {}",
        what,
        range,
        actual
    );
}

/// Assert a duration is close to `expected`, within `tolerance`.
pub fn assert_duration_near(actual: Duration, expected: Duration, tolerance: Duration) {
    let diff = if actual > expected {
        actual - expected
    } else {
        expected - actual
    };
    assert!(
        diff <= tolerance,
        "Expected {:?} ± {:?}, but got {:?}",
        expected,
        tolerance,
        actual
    );
}

// =============================================================================
// Async Assertions
// =============================================================================

/// Polls `condition` until it holds or `timeout` elapses.
///
/// # Panics
///
/// Panics with `message` on timeout.
pub async fn assert_eventually<F>(condition: F, timeout: Duration, message: &str)
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            panic!("Condition not met within {:?}: {}", timeout, message);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
