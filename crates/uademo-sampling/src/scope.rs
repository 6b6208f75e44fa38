// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The shared task scope every sampling task runs in.
//!
//! A [`SamplingScope`] ties a runtime handle to one cancellation token and one
//! task tracker. Shutting the scope down cancels every task spawned through it
//! and waits until all of them have been dropped, so nothing spawned here can
//! run afterwards.

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::{SamplingError, SamplingResult};

/// Cooperative task scope shared by the tick manager and sampled items.
#[derive(Clone)]
pub struct SamplingScope {
    inner: Arc<ScopeInner>,
}

struct ScopeInner {
    handle: Handle,
    token: CancellationToken,
    tracker: TaskTracker,
}

impl SamplingScope {
    /// Creates a scope that spawns onto `handle`.
    pub fn new(handle: Handle) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                handle,
                token: CancellationToken::new(),
                tracker: TaskTracker::new(),
            }),
        }
    }

    /// Creates a scope on the current runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    /// Returns a token cancelled when this scope shuts down.
    pub fn child_token(&self) -> CancellationToken {
        self.inner.token.child_token()
    }

    /// Returns `true` once shutdown has begun.
    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Number of tasks still alive in this scope.
    pub fn task_count(&self) -> usize {
        self.inner.tracker.len()
    }

    /// Spawns `future`, racing it against scope cancellation.
    ///
    /// The task resolves to [`SamplingError::Cancelled`] if the scope shuts
    /// down first.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<SamplingResult<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let token = self.inner.token.clone();
        self.inner.tracker.spawn_on(
            async move {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(SamplingError::Cancelled),
                    output = future => Ok(output),
                }
            },
            &self.inner.handle,
        )
    }

    /// Cancels every task and waits for all of them to finish. Idempotent.
    pub async fn shutdown(&self) {
        if !self.inner.token.is_cancelled() {
            tracing::debug!(tasks = self.task_count(), "Shutting down sampling scope");
        }
        self.inner.token.cancel();
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
    }
}

impl std::fmt::Debug for SamplingScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplingScope")
            .field("tasks", &self.task_count())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
