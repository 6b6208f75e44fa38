// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Polling delivery: a monitored item re-read on a shared tick.
//!
//! ```text
//!  startup() ──▶ [task] sample_initial_value ──▶ item.set_value
//!                          │
//!                          ▼  (only if still RUNNING, under the lifecycle lock)
//!                 TickManager::register_for_tick(interval)
//!                          │
//!        every tick ──▶ on_tick ──▶ sample_current_value ──▶ item.set_value
//!                                        │ failure
//!                                        └──▶ item.set_value(BadInternalError)
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use uademo_core::lifecycle::{Lifecycle, LifecycleState};
use uademo_core::types::{DataValue, StatusCode};

use crate::error::{SamplingError, SamplingResult};
use crate::item::DataItem;
use crate::sampler::Sampler;
use crate::scope::SamplingScope;
use crate::tick::{Tick, TickCallback, TickManager};

/// Converts a sampling interval to a whole-millisecond tick rate.
///
/// Fractions are truncated. Anything that truncates to zero is rejected.
pub fn interval_to_rate(interval_ms: f64) -> SamplingResult<u64> {
    if !interval_ms.is_finite() || interval_ms < 1.0 {
        return Err(SamplingError::invalid_rate(interval_ms));
    }
    Ok(interval_ms as u64)
}

/// A monitored item delivered by periodic sampling.
pub struct SampledItem {
    item: Arc<dyn DataItem>,
    sampler: Arc<dyn Sampler>,
    scope: SamplingScope,
    ticks: TickManager,
    sampling_enabled: AtomicBool,
    lifecycle: Lifecycle,
    tick: Mutex<Option<Tick>>,
}

impl SampledItem {
    /// Creates an item in the `NEW` state with sampling enabled.
    pub fn new(
        item: Arc<dyn DataItem>,
        sampler: Arc<dyn Sampler>,
        scope: SamplingScope,
        ticks: TickManager,
    ) -> Arc<Self> {
        Arc::new(Self {
            item,
            sampler,
            scope,
            ticks,
            sampling_enabled: AtomicBool::new(true),
            lifecycle: Lifecycle::new(),
            tick: Mutex::new(None),
        })
    }

    /// The monitored item being served.
    pub fn item(&self) -> &Arc<dyn DataItem> {
        &self.item
    }

    /// Returns `true` if ticks produce values.
    pub fn sampling_enabled(&self) -> bool {
        self.sampling_enabled.load(Ordering::SeqCst)
    }

    /// Enables or suppresses delivery without touching the tick registration.
    pub fn set_sampling_enabled(&self, enabled: bool) {
        self.sampling_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Returns `true` while a tick registration is held.
    pub fn is_registered(&self) -> bool {
        self.tick.lock().is_some()
    }

    /// The rate currently registered, if any.
    pub fn current_rate(&self) -> Option<u64> {
        self.tick.lock().as_ref().and_then(Tick::rate)
    }

    /// Starts the item.
    ///
    /// The initial value is sampled and delivered on a scope task, after which
    /// the item registers for ticks at its sampling interval. The returned
    /// handle resolves once that has happened.
    ///
    /// # Errors
    ///
    /// Fails with [`SamplingError::Lifecycle`] unless the item is `NEW`.
    pub fn startup(self: &Arc<Self>) -> SamplingResult<StartupHandle> {
        self.lifecycle.start()?;

        let this = Arc::clone(self);
        let handle = self.scope.spawn(async move { this.initialize().await });
        Ok(StartupHandle(handle))
    }

    async fn initialize(self: Arc<Self>) -> SamplingResult<()> {
        let initial = self.sample(Utc::now(), true).await;
        if self.lifecycle.with_running(|| self.item.set_value(initial)).is_none() {
            return Ok(());
        }

        let registered = self.lifecycle.with_running(|| -> SamplingResult<u64> {
            let rate = interval_to_rate(self.item.sampling_interval())?;
            let callback: Arc<dyn TickCallback> = Arc::new(SampledTick {
                item: Arc::downgrade(&self),
            });
            let tick = self.ticks.register_for_tick(rate, callback)?;
            *self.tick.lock() = Some(tick);
            Ok(rate)
        });

        match registered {
            None => {
                debug!(item_id = %self.item.id(), "Item stopped during startup, not registering");
                Ok(())
            }
            Some(Ok(rate)) => {
                debug!(item_id = %self.item.id(), rate_ms = rate, "Sampled item registered");
                Ok(())
            }
            Some(Err(e)) => {
                // Running without a tick would never sample again.
                self.lifecycle.stop_quietly();
                error!(
                    item_id = %self.item.id(),
                    node_id = %self.item.read_value_id().node_id,
                    rate_ms = self.item.sampling_interval(),
                    error = %e,
                    "Failed to register sampled item for tick"
                );
                Err(e)
            }
        }
    }

    async fn on_tick(&self, now: DateTime<Utc>) {
        if !self.sampling_enabled() || !self.lifecycle.is_running() {
            return;
        }
        let value = self.sample(now, false).await;
        self.lifecycle.with_running(|| self.item.set_value(value));
    }

    /// Samples once, converting any failure into a `BadInternalError` value.
    async fn sample(&self, now: DateTime<Utc>, initial: bool) -> DataValue {
        let read = if initial {
            AssertUnwindSafe(self.sampler.sample_initial_value(now))
                .catch_unwind()
                .await
        } else {
            AssertUnwindSafe(self.sampler.sample_current_value(now))
                .catch_unwind()
                .await
        };

        match read {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                warn!(item_id = %self.item.id(), error = %e, "Sampling failed");
                DataValue::from_status(StatusCode::BAD_INTERNAL_ERROR)
            }
            Err(_) => {
                error!(item_id = %self.item.id(), "Sampler panicked");
                DataValue::from_status(StatusCode::BAD_INTERNAL_ERROR)
            }
        }
    }

    /// Stops the item and cancels its tick. Never fails, even before startup.
    pub fn shutdown(&self) {
        let previous = self.lifecycle.stop_quietly();
        if let Some(tick) = self.tick.lock().take() {
            tick.cancel();
        }
        if previous.is_running() {
            debug!(item_id = %self.item.id(), "Sampled item stopped");
        }
    }

    /// Moves the tick registration to a new interval. No-op when unregistered.
    ///
    /// # Errors
    ///
    /// Returns [`SamplingError::InvalidRate`] for intervals below one millisecond.
    pub fn modify_rate(&self, new_interval_ms: f64) -> SamplingResult<()> {
        let tick = self.tick.lock().clone();
        let Some(tick) = tick else {
            return Ok(());
        };
        let rate = interval_to_rate(new_interval_ms)?;
        tick.modify(rate)
    }
}

impl std::fmt::Debug for SampledItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampledItem")
            .field("item_id", &self.item.id())
            .field("state", &self.state())
            .field("sampling_enabled", &self.sampling_enabled())
            .field("registered", &self.is_registered())
            .finish()
    }
}

struct SampledTick {
    item: Weak<SampledItem>,
}

#[async_trait]
impl TickCallback for SampledTick {
    async fn on_tick(&self, now: DateTime<Utc>) -> SamplingResult<()> {
        if let Some(item) = self.item.upgrade() {
            item.on_tick(now).await;
        }
        Ok(())
    }
}

/// Resolves when a [`SampledItem`] has finished starting up.
#[derive(Debug)]
pub struct StartupHandle(JoinHandle<SamplingResult<SamplingResult<()>>>);

impl StartupHandle {
    /// Waits for startup to finish.
    ///
    /// # Errors
    ///
    /// Returns the registration failure, [`SamplingError::Cancelled`] if the
    /// scope shut down first, or [`SamplingError::Join`] if the task panicked.
    pub async fn wait(self) -> SamplingResult<()> {
        self.0.await??
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use uademo_core::error::LifecycleError;
    use uademo_core::types::{MonitoringMode, NodeId, ReadValueId, Variant};

    use crate::item::{MonitoredItemId, QueuedDataItem};

    struct Constant(f64);

    #[async_trait]
    impl Sampler for Constant {
        async fn sample_current_value(&self, _now: DateTime<Utc>) -> SamplingResult<DataValue> {
            Ok(DataValue::new_now(self.0))
        }
    }

    /// Fails on the listed (zero-based) calls.
    struct Flaky {
        calls: AtomicUsize,
        fail_on: Vec<usize>,
    }

    #[async_trait]
    impl Sampler for Flaky {
        async fn sample_current_value(&self, _now: DateTime<Utc>) -> SamplingResult<DataValue> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.contains(&n) {
                return Err(SamplingError::callback("flaky read"));
            }
            Ok(DataValue::new_now(n as i32))
        }
    }

    struct Harness {
        scope: SamplingScope,
        ticks: TickManager,
    }

    impl Harness {
        fn new() -> Self {
            let scope = SamplingScope::current();
            let ticks = TickManager::new(scope.clone());
            Self { scope, ticks }
        }

        fn item(&self, interval: f64) -> Arc<QueuedDataItem> {
            Arc::new(QueuedDataItem::new(
                MonitoredItemId(1),
                ReadValueId::value(NodeId::string(2, "Sampled")),
                interval,
                100,
                MonitoringMode::Reporting,
            ))
        }

        fn sampled(&self, item: &Arc<QueuedDataItem>, sampler: impl Sampler + 'static) -> Arc<SampledItem> {
            SampledItem::new(
                item.clone(),
                Arc::new(sampler),
                self.scope.clone(),
                self.ticks.clone(),
            )
        }
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivers_initial_then_ticks_then_stops() {
        let h = Harness::new();
        let item = h.item(100.0);
        let sampled = h.sampled(&item, Constant(42.0));

        sampled.startup().unwrap().wait().await.unwrap();
        assert!(item.delivered_count() >= 1);
        assert_eq!(item.drain()[0].value, Some(Variant::Double(42.0)));
        assert!(sampled.is_registered());
        assert_eq!(h.ticks.active_rates(), vec![100]);

        sleep_ms(150).await;
        let before_shutdown = item.delivered_count();
        assert!(before_shutdown >= 2);

        sampled.shutdown();
        assert!(!sampled.is_registered());
        assert_eq!(h.ticks.job_count(), 0);

        sleep_ms(1000).await;
        assert_eq!(item.delivered_count(), before_shutdown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_failure_delivers_bad_status_and_continues() {
        let h = Harness::new();
        let item = h.item(100.0);
        let sampled = h.sampled(
            &item,
            Flaky {
                calls: AtomicUsize::new(0),
                fail_on: vec![1],
            },
        );

        sampled.startup().unwrap().wait().await.unwrap();
        sleep_ms(250).await;

        let values = item.drain();
        assert!(values.len() >= 3);
        assert_eq!(values[0].value, Some(Variant::Int32(0)));
        assert_eq!(values[1].status, StatusCode::BAD_INTERNAL_ERROR);
        assert!(values[2].is_good());
        sampled.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_failure_delivers_bad_status() {
        let h = Harness::new();
        let item = h.item(100.0);
        let sampled = h.sampled(
            &item,
            Flaky {
                calls: AtomicUsize::new(0),
                fail_on: vec![0],
            },
        );
        sampled.startup().unwrap().wait().await.unwrap();
        assert_eq!(item.drain()[0].status, StatusCode::BAD_INTERNAL_ERROR);
        assert!(sampled.is_registered());
        sampled.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sampling_disabled_suppresses_delivery() {
        let h = Harness::new();
        let item = h.item(100.0);
        let sampled = h.sampled(&item, Constant(1.0));
        sampled.startup().unwrap().wait().await.unwrap();
        item.drain();

        sampled.set_sampling_enabled(false);
        sleep_ms(500).await;
        assert!(item.is_empty());
        assert!(sampled.is_registered());

        sampled.set_sampling_enabled(true);
        sleep_ms(250).await;
        assert!(!item.is_empty());
        sampled.shutdown();
    }

    #[tokio::test]
    async fn test_lifecycle_idempotence() {
        let h = Harness::new();
        let item = h.item(100.0);

        let never_started = h.sampled(&item, Constant(0.0));
        never_started.shutdown();
        never_started.shutdown();
        assert_eq!(never_started.state(), LifecycleState::Stopped);

        let sampled = h.sampled(&item, Constant(0.0));
        let handle = sampled.startup().unwrap();
        assert!(matches!(
            sampled.startup(),
            Err(SamplingError::Lifecycle(LifecycleError::IllegalState { .. }))
        ));
        handle.wait().await.unwrap();
        sampled.shutdown();
        sampled.shutdown();
    }

    #[tokio::test]
    async fn test_invalid_interval_fails_startup() {
        let h = Harness::new();
        let item = h.item(0.0);
        let sampled = h.sampled(&item, Constant(0.0));

        let err = sampled.startup().unwrap().wait().await.unwrap_err();
        assert!(matches!(err, SamplingError::InvalidRate { .. }));
        assert_eq!(item.len(), 1);
        assert!(!sampled.is_registered());
        assert_eq!(sampled.state(), LifecycleState::Stopped);
        assert_eq!(h.ticks.job_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_registration_stops_item() {
        let h = Harness::new();
        let item = h.item(0.5);
        let sampled = h.sampled(&item, Constant(1.0));

        let err = sampled.startup().unwrap().wait().await.unwrap_err();
        assert!(matches!(err, SamplingError::InvalidRate { .. }));
        assert_eq!(sampled.state(), LifecycleState::Stopped);
        assert!(!sampled.is_registered());

        // A stopped item stays unregistered and rejects a restart.
        sampled.modify_rate(100.0).unwrap();
        assert!(!sampled.is_registered());
        assert!(matches!(
            sampled.startup(),
            Err(SamplingError::Lifecycle(LifecycleError::IllegalState { .. }))
        ));
        sampled.shutdown();
    }

    #[tokio::test]
    async fn test_shutdown_before_initialization_skips_registration() {
        let h = Harness::new();
        let item = h.item(100.0);
        let sampled = h.sampled(&item, Constant(3.0));

        let handle = sampled.startup().unwrap();
        sampled.shutdown();
        handle.wait().await.unwrap();

        assert!(!sampled.is_registered());
        assert_eq!(h.ticks.job_count(), 0);
        assert!(item.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_modify_rate() {
        let h = Harness::new();
        let item = h.item(100.0);
        let sampled = h.sampled(&item, Constant(0.0));

        sampled.modify_rate(500.0).unwrap();
        sampled.startup().unwrap().wait().await.unwrap();
        assert_eq!(sampled.current_rate(), Some(100));

        sampled.modify_rate(500.0).unwrap();
        assert_eq!(sampled.current_rate(), Some(500));
        assert_eq!(h.ticks.active_rates(), vec![500]);

        assert!(sampled.modify_rate(0.0).is_err());
        sampled.shutdown();
    }

    #[test]
    fn test_interval_to_rate() {
        assert_eq!(interval_to_rate(250.0).unwrap(), 250);
        assert_eq!(interval_to_rate(99.9).unwrap(), 99);
        assert!(interval_to_rate(0.5).is_err());
        assert!(interval_to_rate(-10.0).is_err());
        assert!(interval_to_rate(f64::NAN).is_err());
    }
}
