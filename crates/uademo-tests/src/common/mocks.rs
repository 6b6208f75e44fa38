// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! Scriptable stand-ins for the engine's seams. All mocks record their
//! interactions and are safe to share across tasks.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;

use uademo_core::node::{AccessContext, AddressSpace, AttributeObserver, AttributeValue, ObserverId, UaNode};
use uademo_core::{AttributeId, DataValue, NodeError, NodeId, NodeResult, QualifiedName, TimestampsToReturn, Variant};
use uademo_sampling::{Sampler, SamplingError, SamplingResult, TickCallback};

// =============================================================================
// MockSampler
// =============================================================================

/// A sampler that replays scripted values and can be told to fail.
#[derive(Debug)]
pub struct MockSampler {
    /// Values returned in order before falling back.
    script: Mutex<VecDeque<DataValue>>,

    /// Returned once the script is exhausted.
    fallback: Mutex<DataValue>,

    /// Simulated read latency.
    latency: Mutex<Duration>,

    /// Fail the initial read.
    fail_initial: AtomicBool,

    /// Fail every read.
    fail_all: AtomicBool,

    /// Panic on the next current-value read.
    panic_next: AtomicBool,

    /// Initial reads performed.
    initial_count: AtomicU64,

    /// Current-value reads performed.
    sample_count: AtomicU64,

    /// Reads currently inside their latency window.
    in_flight: AtomicUsize,

    /// Highest `in_flight` seen.
    max_in_flight: AtomicUsize,
}

impl MockSampler {
    /// Creates a sampler that always returns `value`.
    pub fn constant(value: impl Into<Variant>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(DataValue::new_now(value)),
            latency: Mutex::new(Duration::ZERO),
            fail_initial: AtomicBool::new(false),
            fail_all: AtomicBool::new(false),
            panic_next: AtomicBool::new(false),
            initial_count: AtomicU64::new(0),
            sample_count: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    /// Creates a sampler that returns `values` in order, then repeats the last.
    pub fn sequence<V: Into<Variant>>(values: impl IntoIterator<Item = V>) -> Arc<Self> {
        let script: VecDeque<DataValue> = values.into_iter().map(DataValue::new_now).collect();
        let fallback = script
            .back()
            .cloned()
            .unwrap_or_else(|| DataValue::new_now(Variant::Empty));
        let sampler = Self::constant(Variant::Empty);
        *sampler.script.lock() = script;
        *sampler.fallback.lock() = fallback;
        sampler
    }

    /// Sets the simulated latency of every read.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Makes the initial read fail.
    pub fn fail_initial(&self, fail: bool) {
        self.fail_initial.store(fail, Ordering::SeqCst);
    }

    /// Makes every read fail.
    pub fn fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Panics on the next current-value read.
    pub fn panic_next(&self) {
        self.panic_next.store(true, Ordering::SeqCst);
    }

    /// Initial reads performed.
    pub fn initial_count(&self) -> u64 {
        self.initial_count.load(Ordering::SeqCst)
    }

    /// Current-value reads performed.
    pub fn sample_count(&self) -> u64 {
        self.sample_count.load(Ordering::SeqCst)
    }

    /// Highest number of reads that overlapped in time.
    pub fn max_concurrent_reads(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn next_value(&self) -> DataValue {
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.lock().clone())
    }
}

#[async_trait]
impl Sampler for MockSampler {
    async fn sample_current_value(&self, _now: DateTime<Utc>) -> SamplingResult<DataValue> {
        self.sample_count.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if self.panic_next.swap(false, Ordering::SeqCst) {
            panic!("mock sampler panic");
        }
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(SamplingError::callback("mock read failure"));
        }
        Ok(self.next_value())
    }

    async fn sample_initial_value(&self, _now: DateTime<Utc>) -> SamplingResult<DataValue> {
        self.initial_count.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if self.fail_initial.load(Ordering::SeqCst) || self.fail_all.load(Ordering::SeqCst) {
            return Err(SamplingError::callback("mock initial read failure"));
        }
        Ok(self.next_value())
    }
}

// =============================================================================
// RecordingTick
// =============================================================================

/// A tick callback that records when it ran.
#[derive(Debug, Default)]
pub struct RecordingTick {
    count: AtomicUsize,
    instants: Mutex<Vec<Instant>>,
    busy: Mutex<Duration>,
    fail: AtomicBool,
}

impl RecordingTick {
    /// Creates a shared recorder.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Creates a recorder that takes `busy` to run.
    pub fn slow(busy: Duration) -> Arc<Self> {
        let tick = Self::new();
        *tick.busy.lock() = busy;
        tick
    }

    /// Makes every invocation report a failure after recording.
    pub fn failing() -> Arc<Self> {
        let tick = Self::new();
        tick.fail.store(true, Ordering::SeqCst);
        tick
    }

    /// Invocations so far.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Start instants of every invocation.
    pub fn instants(&self) -> Vec<Instant> {
        self.instants.lock().clone()
    }

    /// Gaps between consecutive invocation starts.
    pub fn gaps(&self) -> Vec<Duration> {
        self.instants()
            .windows(2)
            .map(|w| w[1].duration_since(w[0]))
            .collect()
    }
}

#[async_trait]
impl TickCallback for RecordingTick {
    async fn on_tick(&self, _now: DateTime<Utc>) -> SamplingResult<()> {
        self.instants.lock().push(Instant::now());
        self.count.fetch_add(1, Ordering::SeqCst);

        let busy = *self.busy.lock();
        if !busy.is_zero() {
            tokio::time::sleep(busy).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(SamplingError::callback("recording tick failure"));
        }
        Ok(())
    }
}

// =============================================================================
// MockNode
// =============================================================================

/// A node whose attributes and notifications are driven by the test.
pub struct MockNode {
    node_id: NodeId,
    attributes: RwLock<HashMap<AttributeId, AttributeValue>>,
    observers: Mutex<Vec<(ObserverId, Arc<dyn AttributeObserver>)>>,
    next_observer: AtomicU64,
    fail_reads: AtomicBool,
}

impl MockNode {
    /// Creates a node with no attributes.
    pub fn new(node_id: NodeId) -> Arc<Self> {
        Arc::new(Self {
            node_id,
            attributes: RwLock::new(HashMap::new()),
            observers: Mutex::new(Vec::new()),
            next_observer: AtomicU64::new(1),
            fail_reads: AtomicBool::new(false),
        })
    }

    /// Stores an attribute without notifying observers.
    pub fn set_attribute(&self, attribute_id: AttributeId, value: impl Into<AttributeValue>) {
        self.attributes.write().insert(attribute_id, value.into());
    }

    /// Stores an attribute and notifies every observer.
    pub fn emit(&self, attribute_id: AttributeId, value: impl Into<AttributeValue>) {
        let value = value.into();
        self.attributes.write().insert(attribute_id, value.clone());

        let observers: Vec<_> = self.observers.lock().iter().map(|(_, o)| o.clone()).collect();
        for observer in observers {
            observer.attribute_changed(&self.node_id, attribute_id, &value);
        }
    }

    /// Makes `read_attribute` fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }
}

impl UaNode for MockNode {
    fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    fn get_attribute(&self, _ctx: &AccessContext, attribute_id: AttributeId) -> Option<AttributeValue> {
        self.attributes.read().get(&attribute_id).cloned()
    }

    fn read_attribute(
        &self,
        ctx: &AccessContext,
        attribute_id: AttributeId,
        timestamps: TimestampsToReturn,
        _index_range: Option<&str>,
        _data_encoding: Option<&QualifiedName>,
    ) -> NodeResult<DataValue> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(NodeError::value_source(&self.node_id, "mock read failure"));
        }
        Ok(self
            .get_attribute(ctx, attribute_id)
            .map(AttributeValue::into_data_value)
            .unwrap_or_else(|| DataValue::from_status(uademo_core::StatusCode::BAD_ATTRIBUTE_ID_INVALID))
            .with_timestamps(timestamps))
    }

    fn add_attribute_observer(&self, observer: Arc<dyn AttributeObserver>) -> ObserverId {
        let id = ObserverId(self.next_observer.fetch_add(1, Ordering::SeqCst));
        self.observers.lock().push((id, observer));
        id
    }

    fn remove_attribute_observer(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }
}

// =============================================================================
// MockAddressSpace
// =============================================================================

/// An address space assembled from arbitrary nodes.
#[derive(Default)]
pub struct MockAddressSpace {
    nodes: RwLock<HashMap<NodeId, Arc<dyn UaNode>>>,
    lookups: AtomicU64,
}

impl MockAddressSpace {
    /// Creates an empty address space.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Adds a node.
    pub fn insert(&self, node: Arc<dyn UaNode>) {
        self.nodes.write().insert(node.node_id().clone(), node);
    }

    /// Removes a node.
    pub fn remove(&self, node_id: &NodeId) {
        self.nodes.write().remove(node_id);
    }

    /// Lookups performed.
    pub fn lookup_count(&self) -> u64 {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl AddressSpace for MockAddressSpace {
    fn get(&self, node_id: &NodeId) -> Option<Arc<dyn UaNode>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.nodes.read().get(node_id).cloned()
    }
}
