//! Session history feeding the scheduler.
//!
//! Mirrors the browser's History API: `push_state` and `replace_state` are
//! the wrapped entry points, `back`/`forward`/`pop_state` play the role of
//! `popstate`. Every one of them reports the new location to the scheduler.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use themekit_core::result::AppResult;

use crate::scheduler::NavigationScheduler;

#[derive(Debug)]
struct Stack {
    entries: Vec<String>,
    index: usize,
}

/// History entries plus the scheduler they notify.
#[derive(Debug)]
pub struct BrowserHistory {
    scheduler: NavigationScheduler,
    stack: Mutex<Stack>,
}

impl BrowserHistory {
    /// Starts a session at `initial`, which must already be the scheduler's
    /// current location (see [`NavigationScheduler::start`]).
    pub fn new(scheduler: NavigationScheduler, initial: &str) -> AppResult<Self> {
        let location = scheduler.resolve(initial)?;
        Ok(Self {
            scheduler,
            stack: Mutex::new(Stack {
                entries: vec![location.path],
                index: 0,
            }),
        })
    }

    /// Adds an entry after the current one, dropping forward entries.
    /// Returns whether a navigation started.
    pub async fn push_state(&self, href: &str) -> AppResult<bool> {
        let location = self.scheduler.resolve(href)?;
        {
            let mut stack = self.lock();
            let keep = stack.index + 1;
            stack.entries.truncate(keep);
            stack.entries.push(location.path.clone());
            stack.index = stack.entries.len() - 1;
            debug!(path = %location.path, depth = stack.entries.len(), "pushState");
        }
        self.scheduler.navigate_to(location).await
    }

    /// Replaces the current entry.
    pub async fn replace_state(&self, href: &str) -> AppResult<bool> {
        let location = self.scheduler.resolve(href)?;
        {
            let mut stack = self.lock();
            let index = stack.index;
            stack.entries[index] = location.path.clone();
            debug!(path = %location.path, "replaceState");
        }
        self.scheduler.navigate_to(location).await
    }

    /// Moves one entry back. Returns `false` at the first entry.
    pub async fn back(&self) -> AppResult<bool> {
        self.traverse(-1).await
    }

    /// Moves one entry forward. Returns `false` at the last entry.
    pub async fn forward(&self) -> AppResult<bool> {
        self.traverse(1).await
    }

    /// A `popstate` to `href` coming from outside this history, e.g. the
    /// user editing the fragment or the host restoring a session.
    ///
    /// Moves to the nearest entry with the same path, or replaces the
    /// current entry when there is none.
    pub async fn pop_state(&self, href: &str) -> AppResult<bool> {
        let location = self.scheduler.resolve(href)?;
        {
            let mut stack = self.lock();
            let current = stack.index;
            let nearest = stack
                .entries
                .iter()
                .enumerate()
                .filter(|(_, path)| **path == location.path)
                .min_by_key(|(i, _)| i.abs_diff(current))
                .map(|(i, _)| i);
            match nearest {
                Some(index) => stack.index = index,
                None => stack.entries[current] = location.path.clone(),
            }
            debug!(path = %location.path, index = stack.index, "popstate");
        }
        self.scheduler.navigate_to(location).await
    }

    /// Path of the current entry.
    pub fn current(&self) -> String {
        let stack = self.lock();
        stack.entries[stack.index].clone()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the session has no entries. Never true after construction.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    async fn traverse(&self, delta: isize) -> AppResult<bool> {
        let target = {
            let mut stack = self.lock();
            let Some(index) = stack.index.checked_add_signed(delta) else {
                return Ok(false);
            };
            if index >= stack.entries.len() {
                return Ok(false);
            }
            stack.index = index;
            stack.entries[index].clone()
        };
        debug!(path = %target, "popstate");
        let location = self.scheduler.resolve(&target)?;
        self.scheduler.navigate_to(location).await
    }

    fn lock(&self) -> MutexGuard<'_, Stack> {
        self.stack.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
