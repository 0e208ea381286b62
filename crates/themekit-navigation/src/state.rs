//! Navigation state machine.
//!
//! `Idle → Navigated → Settled → Idle`. Every navigation bumps the
//! generation; a timer armed in an older generation is stale and must not
//! settle anything.

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::location::Location;

/// Where the current navigation is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No navigation awaiting a render.
    Idle,
    /// A navigation happened and its content has not settled yet.
    Navigated,
    /// `content_render` is being dispatched for the current generation.
    Settled,
}

/// Single navigation state owned by the scheduler.
#[derive(Debug)]
pub struct NavigationState {
    /// Last location navigated to.
    pub current: Option<Location>,
    /// Lifecycle phase.
    pub phase: Phase,
    /// Invalidation token, bumped on every navigation.
    pub generation: u64,
    /// Pending fallback timer.
    pub fallback: Option<JoinHandle<()>>,
    /// Pending debounce timer.
    pub debounce: Option<JoinHandle<()>>,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationState {
    /// Idle state at generation zero.
    pub fn new() -> Self {
        Self {
            current: None,
            phase: Phase::Idle,
            generation: 0,
            fallback: None,
            debounce: None,
        }
    }

    /// Path of the current location.
    pub fn last_path(&self) -> Option<&str> {
        self.current.as_ref().map(|l| l.path.as_str())
    }

    /// Records `location` without starting a navigation.
    pub fn record(&mut self, location: Location) {
        self.current = Some(location);
    }

    /// Enters `Navigated` when `location` differs from the current path.
    ///
    /// Returns the previous location and the new generation, or `None` when
    /// the path is unchanged.
    pub fn navigate(&mut self, location: Location) -> Option<(Option<Location>, u64)> {
        if self.last_path() == Some(location.path.as_str()) {
            return None;
        }
        let previous = self.current.replace(location);
        Some((previous, self.begin()))
    }

    /// Enters `Navigated` for the current location, e.g. on page load.
    pub fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.phase = Phase::Navigated;
        self.generation
    }

    /// Whether a timer armed in `generation` may still act.
    pub fn is_live(&self, generation: u64) -> bool {
        self.generation == generation && self.phase == Phase::Navigated
    }

    /// `Navigated → Settled` for a live timer. Returns whether it happened.
    pub fn settle(&mut self, generation: u64) -> bool {
        if !self.is_live(generation) {
            return false;
        }
        self.phase = Phase::Settled;
        true
    }

    /// `Settled → Idle`, unless a newer navigation already took over.
    pub fn finish(&mut self, generation: u64) {
        if self.generation == generation && self.phase == Phase::Settled {
            self.phase = Phase::Idle;
        }
    }

    /// Aborts the pending debounce timer, if any.
    pub fn cancel_debounce(&mut self) {
        if let Some(handle) = self.debounce.take() {
            handle.abort();
        }
    }

    /// Aborts the pending fallback timer, if any.
    pub fn cancel_fallback(&mut self) {
        if let Some(handle) = self.fallback.take() {
            handle.abort();
        }
    }
}
