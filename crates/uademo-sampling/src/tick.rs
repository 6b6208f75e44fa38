// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Shared per-rate tick scheduling.
//!
//! Every distinct rate gets exactly one ticker job, no matter how many
//! callbacks are registered at it. Jobs are launched on the first
//! registration at a rate and cancelled as soon as the last callback leaves.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────── TickManager ────────────────────────────┐
//! │  Mutex<Registry>                                                     │
//! │    callbacks: rate → [entry, ...]            (registration order)   │
//! │    rates:     id → rate                                              │
//! │    jobs:      rate → TickerJob { token, handle }                     │
//! └──────────┬───────────────────────────────┬──────────────────────────┘
//!            │ launch / cancel               │
//!   ┌────────▼────────┐              ┌───────▼─────────┐
//!   │ job @ 100ms     │              │ job @ 1000ms    │   (SamplingScope)
//!   │ loop:           │              │ loop: ...       │
//!   │   run callbacks │              └─────────────────┘
//!   │   warn overrun  │
//!   │   sleep 100ms   │
//!   └─────────────────┘
//! ```
//!
//! Scheduling is fixed-delay: a job sleeps for the full rate *after* its
//! callbacks finish. Slow callbacks stretch the period and trigger an overrun
//! warning; they never cause overlapping invocations.
//!
//! Each registration carries its own async gate that travels with it across
//! `modify`. A retired job still inside a callback holds the gate, so the job
//! at the new rate waits for it before invoking that callback again.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::{SamplingError, SamplingResult};
use crate::scope::SamplingScope;

// =============================================================================
// TickCallback
// =============================================================================

/// Work invoked on every tick of a rate.
#[async_trait]
pub trait TickCallback: Send + Sync {
    /// Called with the time the tick started.
    async fn on_tick(&self, now: DateTime<Utc>) -> SamplingResult<()>;
}

/// Adapts an infallible async closure into a [`TickCallback`].
pub struct FnTick<F>(F);

#[async_trait]
impl<F, Fut> TickCallback for FnTick<F>
where
    F: Fn(DateTime<Utc>) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    async fn on_tick(&self, now: DateTime<Utc>) -> SamplingResult<()> {
        (self.0)(now).await;
        Ok(())
    }
}

/// Wraps a closure as a shared tick callback.
pub fn tick_fn<F, Fut>(f: F) -> Arc<dyn TickCallback>
where
    F: Fn(DateTime<Utc>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(FnTick(f))
}

// =============================================================================
// Registry
// =============================================================================

/// Identifies one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickId(u64);

impl fmt::Display for TickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tick-{}", self.0)
    }
}

/// One registration: the callback plus the gate serializing its invocations.
struct TickEntry {
    id: TickId,
    callback: Arc<dyn TickCallback>,
    gate: tokio::sync::Mutex<()>,
}

struct TickerJob {
    token: CancellationToken,
    handle: JoinHandle<SamplingResult<()>>,
}

#[derive(Default)]
struct Registry {
    callbacks: HashMap<u64, Vec<Arc<TickEntry>>>,
    rates: HashMap<TickId, u64>,
    jobs: HashMap<u64, TickerJob>,
    shut_down: bool,
}

struct TickInner {
    scope: SamplingScope,
    registry: Mutex<Registry>,
    next_id: AtomicU64,
}

impl TickInner {
    /// Launches or cancels the job for `rate` to match its callback set.
    fn check_ticker_job(self: &Arc<Self>, registry: &mut Registry, rate: u64) {
        let has_callbacks = registry.callbacks.get(&rate).is_some_and(|c| !c.is_empty());

        if !has_callbacks {
            registry.callbacks.remove(&rate);
            if let Some(job) = registry.jobs.remove(&rate) {
                debug!(rate_ms = rate, "Cancelling ticker job");
                job.token.cancel();
            }
        } else if !registry.jobs.contains_key(&rate) {
            debug!(rate_ms = rate, "Launching ticker job");
            let token = self.scope.child_token();
            let handle = self
                .scope
                .spawn(run_ticker_job(Arc::downgrade(self), rate, token.clone()));
            registry.jobs.insert(rate, TickerJob { token, handle });
        }
    }

    fn snapshot(&self, rate: u64) -> Option<Vec<Arc<TickEntry>>> {
        self.registry.lock().callbacks.get(&rate).cloned()
    }

    fn is_registered_at(&self, id: TickId, rate: u64) -> bool {
        self.registry.lock().rates.get(&id) == Some(&rate)
    }

    fn cancel(self: &Arc<Self>, id: TickId) {
        let mut registry = self.registry.lock();
        let Some(rate) = registry.rates.remove(&id) else {
            return;
        };
        if let Some(callbacks) = registry.callbacks.get_mut(&rate) {
            callbacks.retain(|entry| entry.id != id);
        }
        self.check_ticker_job(&mut registry, rate);
    }

    fn modify(self: &Arc<Self>, id: TickId, new_rate: u64) -> SamplingResult<()> {
        validate_rate(new_rate)?;

        let mut registry = self.registry.lock();
        let Some(old_rate) = registry.rates.get(&id).copied() else {
            debug!(tick = %id, rate_ms = new_rate, "Ignoring modify of cancelled tick");
            return Ok(());
        };
        if old_rate == new_rate {
            return Ok(());
        }

        let entry = registry.callbacks.get_mut(&old_rate).and_then(|callbacks| {
            let pos = callbacks.iter().position(|entry| entry.id == id)?;
            Some(callbacks.remove(pos))
        });
        let Some(entry) = entry else {
            return Ok(());
        };

        registry.rates.insert(id, new_rate);
        registry.callbacks.entry(new_rate).or_default().push(entry);

        self.check_ticker_job(&mut registry, old_rate);
        self.check_ticker_job(&mut registry, new_rate);

        debug!(tick = %id, from_ms = old_rate, to_ms = new_rate, "Modified tick rate");
        Ok(())
    }
}

fn validate_rate(rate: u64) -> SamplingResult<()> {
    if rate == 0 {
        return Err(SamplingError::invalid_rate(0u32));
    }
    Ok(())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

async fn run_ticker_job(inner: Weak<TickInner>, rate: u64, token: CancellationToken) {
    let period = Duration::from_millis(rate);

    while !token.is_cancelled() {
        let Some(manager) = inner.upgrade() else {
            break;
        };
        let Some(callbacks) = manager.snapshot(rate) else {
            break;
        };

        let started = Instant::now();
        let now = Utc::now();

        for entry in &callbacks {
            let id = entry.id;
            if token.is_cancelled() {
                return;
            }
            // A retired job may still be running this callback.
            let _running = entry.gate.lock().await;
            if token.is_cancelled() {
                return;
            }
            // Skip callbacks moved or cancelled since the snapshot.
            if !manager.is_registered_at(id, rate) {
                continue;
            }

            match AssertUnwindSafe(entry.callback.on_tick(now)).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(rate_ms = rate, tick = %id, error = %e, "Tick callback failed");
                }
                Err(payload) => {
                    error!(
                        rate_ms = rate,
                        tick = %id,
                        panic = panic_message(payload.as_ref()),
                        "Tick callback panicked"
                    );
                }
            }
        }

        let elapsed = started.elapsed();
        if elapsed > period {
            warn!(
                rate_ms = rate,
                elapsed_ms = elapsed.as_millis() as u64,
                callbacks = callbacks.len(),
                "Aggregate callback time exceeded tick rate"
            );
        }
        drop(manager);

        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(period) => {}
        }
    }
}

// =============================================================================
// TickManager
// =============================================================================

/// Multiplexes periodic callbacks onto one job per distinct rate.
///
/// # Example
///
/// ```rust,ignore
/// let ticks = TickManager::new(SamplingScope::current());
/// let tick = ticks.register_for_tick(100, tick_fn(|now| async move {
///     println!("tick at {now}");
/// }))?;
///
/// tick.modify(250)?;
/// tick.cancel();
/// ```
#[derive(Clone)]
pub struct TickManager {
    inner: Arc<TickInner>,
}

impl TickManager {
    /// Creates a manager whose jobs run inside `scope`.
    pub fn new(scope: SamplingScope) -> Self {
        Self {
            inner: Arc::new(TickInner {
                scope,
                registry: Mutex::new(Registry::default()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Registers `callback` to run every `rate_ms` milliseconds.
    ///
    /// # Errors
    ///
    /// - [`SamplingError::InvalidRate`] for a zero rate
    /// - [`SamplingError::Cancelled`] after [`shutdown`](Self::shutdown)
    pub fn register_for_tick(
        &self,
        rate_ms: u64,
        callback: Arc<dyn TickCallback>,
    ) -> SamplingResult<Tick> {
        validate_rate(rate_ms)?;

        let mut registry = self.inner.registry.lock();
        if registry.shut_down {
            return Err(SamplingError::Cancelled);
        }

        let id = TickId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        registry.callbacks.entry(rate_ms).or_default().push(Arc::new(TickEntry {
            id,
            callback,
            gate: tokio::sync::Mutex::new(()),
        }));
        registry.rates.insert(id, rate_ms);
        self.inner.check_ticker_job(&mut registry, rate_ms);

        Ok(Tick {
            id,
            manager: Arc::downgrade(&self.inner),
        })
    }

    /// Rates that currently have a running job, ascending.
    pub fn active_rates(&self) -> Vec<u64> {
        let mut rates: Vec<u64> = self.inner.registry.lock().jobs.keys().copied().collect();
        rates.sort_unstable();
        rates
    }

    /// Number of running jobs.
    pub fn job_count(&self) -> usize {
        self.inner.registry.lock().jobs.len()
    }

    /// Number of callbacks registered at `rate_ms`.
    pub fn callback_count(&self, rate_ms: u64) -> usize {
        self.inner
            .registry
            .lock()
            .callbacks
            .get(&rate_ms)
            .map_or(0, Vec::len)
    }

    /// Cancels every job and waits for them to stop.
    ///
    /// Later registrations fail with [`SamplingError::Cancelled`].
    pub async fn shutdown(&self) {
        let jobs: Vec<TickerJob> = {
            let mut registry = self.inner.registry.lock();
            registry.shut_down = true;
            registry.callbacks.clear();
            registry.rates.clear();
            registry.jobs.drain().map(|(_, job)| job).collect()
        };

        debug!(jobs = jobs.len(), "Shutting down tick manager");

        for job in &jobs {
            job.token.cancel();
        }
        for job in jobs {
            let _ = job.handle.await;
        }
    }
}

impl fmt::Debug for TickManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickManager")
            .field("active_rates", &self.active_rates())
            .finish()
    }
}

// =============================================================================
// Tick
// =============================================================================

/// A registration returned by [`TickManager::register_for_tick`].
///
/// Dropping a `Tick` does not cancel it.
#[derive(Debug, Clone)]
pub struct Tick {
    id: TickId,
    manager: Weak<TickInner>,
}

impl fmt::Debug for TickInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickInner").finish_non_exhaustive()
    }
}

impl Tick {
    /// The registration id.
    pub fn id(&self) -> TickId {
        self.id
    }

    /// The current rate, or `None` once cancelled.
    pub fn rate(&self) -> Option<u64> {
        let manager = self.manager.upgrade()?;
        let rate = manager.registry.lock().rates.get(&self.id).copied();
        rate
    }

    /// Removes the callback. Safe to call more than once.
    pub fn cancel(&self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.cancel(self.id);
        }
    }

    /// Moves the callback to `new_rate_ms`.
    ///
    /// A cancelled tick stays cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`SamplingError::InvalidRate`] for a zero rate.
    pub fn modify(&self, new_rate_ms: u64) -> SamplingResult<()> {
        match self.manager.upgrade() {
            Some(manager) => manager.modify(self.id, new_rate_ms),
            None => validate_rate(new_rate_ms),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, Arc<dyn TickCallback>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let callback = tick_fn(move |_| {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });
        (count, callback)
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    struct Failing;

    #[async_trait]
    impl TickCallback for Failing {
        async fn on_tick(&self, _now: DateTime<Utc>) -> SamplingResult<()> {
            Err(SamplingError::callback("always fails"))
        }
    }

    struct Panicking;

    #[async_trait]
    impl TickCallback for Panicking {
        async fn on_tick(&self, _now: DateTime<Utc>) -> SamplingResult<()> {
            panic!("tick callback exploded");
        }
    }

    #[tokio::test]
    async fn test_zero_rate_rejected() {
        let ticks = TickManager::new(SamplingScope::current());
        let (_, cb) = counter();
        assert!(matches!(
            ticks.register_for_tick(0, cb.clone()),
            Err(SamplingError::InvalidRate { .. })
        ));

        let tick = ticks.register_for_tick(100, cb).unwrap();
        assert!(matches!(tick.modify(0), Err(SamplingError::InvalidRate { .. })));
        assert_eq!(tick.rate(), Some(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_coalescing() {
        let ticks = TickManager::new(SamplingScope::current());
        let registrations: Vec<Tick> = (0..5)
            .map(|_| ticks.register_for_tick(100, counter().1).unwrap())
            .collect();

        assert_eq!(ticks.job_count(), 1);
        assert_eq!(ticks.callback_count(100), 5);

        for tick in &registrations {
            tick.cancel();
        }
        assert_eq!(ticks.job_count(), 0);
        assert_eq!(ticks.callback_count(100), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent_and_reregister_creates_job() {
        let ticks = TickManager::new(SamplingScope::current());
        let tick = ticks.register_for_tick(50, counter().1).unwrap();
        tick.cancel();
        tick.cancel();
        assert!(ticks.active_rates().is_empty());
        assert_eq!(tick.rate(), None);

        let (count, cb) = counter();
        let _again = ticks.register_for_tick(50, cb).unwrap();
        assert_eq!(ticks.active_rates(), vec![50]);
        sleep_ms(120).await;
        assert!(count.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_modify_moves_between_rates() {
        let ticks = TickManager::new(SamplingScope::current());
        let (count, cb) = counter();
        let tick = ticks.register_for_tick(100, cb).unwrap();

        sleep_ms(350).await;
        let at_100 = count.load(Ordering::SeqCst);
        assert!((3..=4).contains(&at_100), "invoked {} times", at_100);

        tick.modify(200).unwrap();
        assert_eq!(ticks.active_rates(), vec![200]);
        assert_eq!(tick.rate(), Some(200));

        sleep_ms(600).await;
        let at_200 = count.load(Ordering::SeqCst) - at_100;
        assert!((3..=4).contains(&at_200), "invoked {} times", at_200);
        assert_eq!(ticks.callback_count(100), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_modify_keeps_shared_job() {
        let ticks = TickManager::new(SamplingScope::current());
        let stay = ticks.register_for_tick(100, counter().1).unwrap();
        let mover = ticks.register_for_tick(100, counter().1).unwrap();

        mover.modify(300).unwrap();
        assert_eq!(ticks.active_rates(), vec![100, 300]);

        mover.modify(100).unwrap();
        assert_eq!(ticks.active_rates(), vec![100]);
        assert_eq!(ticks.callback_count(100), 2);

        stay.cancel();
        mover.cancel();
        mover.modify(500).unwrap();
        assert_eq!(ticks.job_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fault_isolation() {
        let ticks = TickManager::new(SamplingScope::current());
        let _failing = ticks.register_for_tick(100, Arc::new(Failing)).unwrap();
        let _panicking = ticks.register_for_tick(100, Arc::new(Panicking)).unwrap();
        let (count, cb) = counter();
        let _healthy = ticks.register_for_tick(100, cb).unwrap();

        sleep_ms(250).await;
        assert!(count.load(Ordering::SeqCst) >= 2);
        assert_eq!(ticks.job_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_never_overlaps() {
        let ticks = TickManager::new(SamplingScope::current());
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let runs = Arc::new(AtomicUsize::new(0));

        let (f, m, r) = (in_flight.clone(), max_seen.clone(), runs.clone());
        let slow = tick_fn(move |_| {
            let (f, m, r) = (f.clone(), m.clone(), r.clone());
            async move {
                let now = f.fetch_add(1, Ordering::SeqCst) + 1;
                m.fetch_max(now, Ordering::SeqCst);
                sleep_ms(150).await;
                f.fetch_sub(1, Ordering::SeqCst);
                r.fetch_add(1, Ordering::SeqCst);
            }
        });
        let _tick = ticks.register_for_tick(100, slow).unwrap();

        sleep_ms(1000).await;
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        // 250ms per iteration
        assert!(runs.load(Ordering::SeqCst) <= 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_modify_round_trip_mid_invocation_never_overlaps() {
        let ticks = TickManager::new(SamplingScope::current());
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let runs = Arc::new(AtomicUsize::new(0));

        let (f, m, r) = (in_flight.clone(), max_seen.clone(), runs.clone());
        let slow = tick_fn(move |_| {
            let (f, m, r) = (f.clone(), m.clone(), r.clone());
            async move {
                let now = f.fetch_add(1, Ordering::SeqCst) + 1;
                m.fetch_max(now, Ordering::SeqCst);
                sleep_ms(50).await;
                f.fetch_sub(1, Ordering::SeqCst);
                r.fetch_add(1, Ordering::SeqCst);
            }
        });
        let tick = ticks.register_for_tick(100, slow).unwrap();

        // First pass is still sleeping inside the callback.
        sleep_ms(10).await;
        assert_eq!(in_flight.load(Ordering::SeqCst), 1);
        tick.modify(200).unwrap();
        tick.modify(100).unwrap();
        assert_eq!(ticks.active_rates(), vec![100]);

        sleep_ms(500).await;
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(runs.load(Ordering::SeqCst) >= 3);

        tick.cancel();
        ticks.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_all_jobs() {
        let scope = SamplingScope::current();
        let ticks = TickManager::new(scope.clone());
        let (count, cb) = counter();
        let _a = ticks.register_for_tick(100, cb).unwrap();
        let _b = ticks.register_for_tick(250, counter().1).unwrap();

        sleep_ms(50).await;
        ticks.shutdown().await;
        assert_eq!(ticks.job_count(), 0);

        let after = count.load(Ordering::SeqCst);
        sleep_ms(500).await;
        assert_eq!(count.load(Ordering::SeqCst), after);

        assert!(matches!(
            ticks.register_for_tick(100, counter().1),
            Err(SamplingError::Cancelled)
        ));
        scope.shutdown().await;
    }
}
