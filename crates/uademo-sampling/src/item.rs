// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The monitored item surface the delivery strategies push into.
//!
//! [`DataItem`] is what the subscription layer hands the engine: the target
//! attribute, the revised interval and queue size, the monitoring mode and a
//! value sink. [`QueuedDataItem`] is an in-process implementation whose sink
//! is a bounded queue that discards its oldest value on overflow.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use uademo_core::types::{DataValue, MonitoringMode, ReadValueId};

/// Identifies a monitored item within the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonitoredItemId(pub u32);

impl fmt::Display for MonitoredItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A client's monitored item as seen by the sampling engine.
pub trait DataItem: Send + Sync {
    /// The item id.
    fn id(&self) -> MonitoredItemId;

    /// The attribute being monitored.
    fn read_value_id(&self) -> &ReadValueId;

    /// Revised sampling interval in milliseconds.
    fn sampling_interval(&self) -> f64;

    /// Revised queue size.
    fn queue_size(&self) -> u32;

    /// Current monitoring mode.
    fn monitoring_mode(&self) -> MonitoringMode;

    /// Delivers a newly produced value.
    fn set_value(&self, value: DataValue);
}

// =============================================================================
// QueuedDataItem
// =============================================================================

/// A [`DataItem`] backed by a bounded FIFO queue.
pub struct QueuedDataItem {
    id: MonitoredItemId,
    read_value_id: ReadValueId,
    sampling_interval_bits: AtomicU64,
    queue_size: AtomicU32,
    monitoring_mode: Mutex<MonitoringMode>,
    queue: Mutex<VecDeque<DataValue>>,
    delivered: AtomicU64,
    overflows: AtomicU64,
    notify: Notify,
}

impl QueuedDataItem {
    /// Creates an item with the given parameters.
    pub fn new(
        id: MonitoredItemId,
        read_value_id: ReadValueId,
        sampling_interval: f64,
        queue_size: u32,
        monitoring_mode: MonitoringMode,
    ) -> Self {
        Self {
            id,
            read_value_id,
            sampling_interval_bits: AtomicU64::new(sampling_interval.to_bits()),
            queue_size: AtomicU32::new(queue_size.max(1)),
            monitoring_mode: Mutex::new(monitoring_mode),
            queue: Mutex::new(VecDeque::new()),
            delivered: AtomicU64::new(0),
            overflows: AtomicU64::new(0),
            notify: Notify::new(),
        }
    }

    /// Applies revised parameters, trimming the queue if it shrank.
    pub fn revise(&self, sampling_interval: f64, queue_size: u32) {
        let queue_size = queue_size.max(1);
        self.sampling_interval_bits
            .store(sampling_interval.to_bits(), Ordering::SeqCst);
        self.queue_size.store(queue_size, Ordering::SeqCst);

        let mut queue = self.queue.lock();
        while queue.len() > queue_size as usize {
            queue.pop_front();
            self.overflows.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Changes the monitoring mode.
    pub fn set_monitoring_mode(&self, mode: MonitoringMode) {
        *self.monitoring_mode.lock() = mode;
    }

    /// Removes and returns all queued values, oldest first.
    pub fn drain(&self) -> Vec<DataValue> {
        self.queue.lock().drain(..).collect()
    }

    /// Returns the most recently queued value without removing it.
    pub fn latest(&self) -> Option<DataValue> {
        self.queue.lock().back().cloned()
    }

    /// Number of queued values.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Total values delivered since creation.
    pub fn delivered_count(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Total values discarded because the queue was full.
    pub fn overflow_count(&self) -> u64 {
        self.overflows.load(Ordering::Relaxed)
    }

    /// Waits until a value is delivered.
    pub async fn changed(&self) {
        self.notify.notified().await;
    }
}

impl DataItem for QueuedDataItem {
    fn id(&self) -> MonitoredItemId {
        self.id
    }

    fn read_value_id(&self) -> &ReadValueId {
        &self.read_value_id
    }

    fn sampling_interval(&self) -> f64 {
        f64::from_bits(self.sampling_interval_bits.load(Ordering::SeqCst))
    }

    fn queue_size(&self) -> u32 {
        self.queue_size.load(Ordering::SeqCst)
    }

    fn monitoring_mode(&self) -> MonitoringMode {
        *self.monitoring_mode.lock()
    }

    fn set_value(&self, value: DataValue) {
        let capacity = self.queue_size() as usize;
        {
            let mut queue = self.queue.lock();
            if queue.len() >= capacity {
                queue.pop_front();
                self.overflows.fetch_add(1, Ordering::Relaxed);
            }
            queue.push_back(value);
        }
        self.delivered.fetch_add(1, Ordering::Relaxed);
        self.notify.notify_one();
    }
}

impl fmt::Debug for QueuedDataItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedDataItem")
            .field("id", &self.id)
            .field("node_id", &self.read_value_id.node_id)
            .field("sampling_interval", &self.sampling_interval())
            .field("queue_size", &self.queue_size())
            .field("queued", &self.len())
            .finish()
    }
}
