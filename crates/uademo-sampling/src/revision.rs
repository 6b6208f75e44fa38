// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Revision of client-requested sampling parameters.
//!
//! Push-delivered items are revised first: their interval is forced to a
//! fixed value and the requested queue size is kept. Everything else falls
//! through to the default clamping.

use serde::{Deserialize, Serialize};

use crate::classify::Delivery;

/// Sampling parameters after revision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RevisedParameters {
    /// Revised sampling interval in milliseconds.
    pub sampling_interval: f64,
    /// Revised queue size.
    pub queue_size: u32,
}

/// Revision policy applied when items are created or modified.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingRevision {
    min_interval_ms: f64,
    max_interval_ms: f64,
    max_queue_size: u32,
    push_interval_ms: f64,
}

impl SamplingRevision {
    /// Default lower interval bound.
    pub const DEFAULT_MIN_INTERVAL_MS: f64 = 100.0;
    /// Default upper interval bound (one hour).
    pub const DEFAULT_MAX_INTERVAL_MS: f64 = 3_600_000.0;
    /// Default queue size limit.
    pub const DEFAULT_MAX_QUEUE_SIZE: u32 = 1000;

    /// Creates a policy with the default bounds.
    pub fn new() -> Self {
        Self {
            min_interval_ms: Self::DEFAULT_MIN_INTERVAL_MS,
            max_interval_ms: Self::DEFAULT_MAX_INTERVAL_MS,
            max_queue_size: Self::DEFAULT_MAX_QUEUE_SIZE,
            push_interval_ms: 0.0,
        }
    }

    /// Sets the interval bounds. `max` is raised to `min` if lower.
    pub fn with_interval_bounds(mut self, min_ms: f64, max_ms: f64) -> Self {
        self.min_interval_ms = min_ms.max(1.0);
        self.max_interval_ms = max_ms.max(self.min_interval_ms);
        self
    }

    /// Sets the queue size limit (at least 1).
    pub fn with_max_queue_size(mut self, max: u32) -> Self {
        self.max_queue_size = max.max(1);
        self
    }

    /// Sets the interval reported for push-delivered items.
    pub fn with_push_interval(mut self, interval_ms: f64) -> Self {
        self.push_interval_ms = interval_ms.max(0.0);
        self
    }

    /// Lower interval bound.
    pub fn min_interval_ms(&self) -> f64 {
        self.min_interval_ms
    }

    /// Upper interval bound.
    pub fn max_interval_ms(&self) -> f64 {
        self.max_interval_ms
    }

    /// Queue size limit.
    pub fn max_queue_size(&self) -> u32 {
        self.max_queue_size
    }

    /// Interval reported for push-delivered items.
    pub fn push_interval_ms(&self) -> f64 {
        self.push_interval_ms
    }

    /// Revises a request for an item delivered by `delivery`.
    pub fn revise(&self, delivery: Delivery, requested_interval: f64, requested_queue_size: u32) -> RevisedParameters {
        match delivery {
            Delivery::Subscribed => RevisedParameters {
                sampling_interval: self.push_interval_ms,
                queue_size: requested_queue_size,
            },
            Delivery::Sampled => self.revise_default(requested_interval, requested_queue_size),
        }
    }

    fn revise_default(&self, requested_interval: f64, requested_queue_size: u32) -> RevisedParameters {
        // NaN and non-positive requests mean "as fast as possible".
        let sampling_interval = if requested_interval.is_nan() || requested_interval <= 0.0 {
            self.min_interval_ms
        } else {
            requested_interval.clamp(self.min_interval_ms, self.max_interval_ms)
        };

        RevisedParameters {
            sampling_interval,
            queue_size: requested_queue_size.clamp(1, self.max_queue_size),
        }
    }
}

impl Default for SamplingRevision {
    fn default() -> Self {
        Self::new()
    }
}
