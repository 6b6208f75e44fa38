// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Start/stop state shared by every startable component.
//!
//! ```text
//!   NEW ──start()──▶ RUNNING ──stop_quietly()──▶ STOPPED
//!    │                                             ▲
//!    └────────────────stop_quietly()───────────────┘
//! ```
//!
//! Transitions only move forward. A [`Lifecycle`] owns its own lock, and
//! [`Lifecycle::with_running`] lets a component perform work that must not
//! interleave with a concurrent stop.

use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::LifecycleError;

/// The lifecycle state of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum LifecycleState {
    /// Created, never started.
    #[default]
    New,

    /// Started and not yet stopped.
    Running,

    /// Stopped. Terminal.
    Stopped,
}

impl LifecycleState {
    /// Returns `true` if running.
    #[inline]
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "NEW"),
            Self::Running => write!(f, "RUNNING"),
            Self::Stopped => write!(f, "STOPPED"),
        }
    }
}

/// A lock-guarded [`LifecycleState`].
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: Mutex<LifecycleState>,
}

impl Lifecycle {
    /// Creates a lifecycle in the `NEW` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state.
    pub fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    /// Returns `true` if running.
    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    /// Moves `NEW` to `RUNNING`.
    ///
    /// # Errors
    ///
    /// Fails with [`LifecycleError::IllegalState`] from any other state.
    pub fn start(&self) -> Result<(), LifecycleError> {
        let mut state = self.state.lock();
        match *state {
            LifecycleState::New => {
                *state = LifecycleState::Running;
                Ok(())
            }
            other => Err(LifecycleError::illegal_state("startup", other)),
        }
    }

    /// Moves any state to `STOPPED` and returns the previous state.
    ///
    /// A component stopped this way before it was started can never be
    /// started afterwards.
    pub fn stop_quietly(&self) -> LifecycleState {
        std::mem::replace(&mut *self.state.lock(), LifecycleState::Stopped)
    }

    /// Runs `f` while holding the lock, only if currently `RUNNING`.
    ///
    /// Returns `None` without calling `f` otherwise. `f` must not call back
    /// into this lifecycle.
    pub fn with_running<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        let state = self.state.lock();
        state.is_running().then(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        let lc = Lifecycle::new();
        assert_eq!(lc.state(), LifecycleState::New);
        lc.start().unwrap();
        assert!(lc.is_running());
        assert_eq!(lc.stop_quietly(), LifecycleState::Running);
        assert_eq!(lc.state(), LifecycleState::Stopped);
        assert_eq!(
            lc.start(),
            Err(LifecycleError::illegal_state("startup", LifecycleState::Stopped))
        );
    }

    #[test]
    fn test_double_start_fails() {
        let lc = Lifecycle::new();
        lc.start().unwrap();
        assert_eq!(
            lc.start(),
            Err(LifecycleError::illegal_state("startup", LifecycleState::Running))
        );
    }

    #[test]
    fn test_stop_quietly() {
        let lc = Lifecycle::new();
        assert_eq!(lc.stop_quietly(), LifecycleState::New);
        assert_eq!(lc.stop_quietly(), LifecycleState::Stopped);
        assert!(lc.start().is_err());

        let running = Lifecycle::new();
        running.start().unwrap();
        assert_eq!(running.stop_quietly(), LifecycleState::Running);
    }

    #[test]
    fn test_with_running() {
        let lc = Lifecycle::new();
        assert_eq!(lc.with_running(|| 1), None);
        lc.start().unwrap();
        assert_eq!(lc.with_running(|| 2), Some(2));
        lc.stop_quietly();
        assert_eq!(lc.with_running(|| 3), None);
    }
}
