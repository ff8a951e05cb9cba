//! Registration record for a single named component

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::traits::{Component, Loader, Unloader};
use super::types::{ComponentStatus, LoadState};

/// A name bound to its loader, unloader and (optionally) live instance
///
/// The record lives as long as the manager. The async `slot` lock is held
/// across loader and unloader calls, which serializes load/unload for one
/// name and lets concurrent loads share a single in-flight loader call.
pub(crate) struct Registration {
    pub(crate) name: String,
    pub(crate) loader: Loader,
    pub(crate) unloader: Unloader,
    pub(crate) slot: tokio::sync::Mutex<Option<Arc<dyn Component>>>,
    state: Mutex<LoadState>,
    loaded_at: Mutex<Option<DateTime<Utc>>>,
    pub(crate) leases: AtomicUsize,
    pub(crate) loads: AtomicU64,
    pub(crate) load_failures: AtomicU64,
    pub(crate) unloads: AtomicU64,
    pub(crate) cleanup_failures: AtomicU64,
    last_memory_estimate: AtomicU64,
}

impl Registration {
    pub(crate) fn new(name: String, loader: Loader, unloader: Unloader) -> Self {
        Self {
            name,
            loader,
            unloader,
            slot: tokio::sync::Mutex::new(None),
            state: Mutex::new(LoadState::Unloaded),
            loaded_at: Mutex::new(None),
            leases: AtomicUsize::new(0),
            loads: AtomicU64::new(0),
            load_failures: AtomicU64::new(0),
            unloads: AtomicU64::new(0),
            cleanup_failures: AtomicU64::new(0),
            last_memory_estimate: AtomicU64::new(0),
        }
    }

    pub(crate) fn state(&self) -> LoadState {
        *self.state.lock()
    }

    pub(crate) fn set_state(&self, state: LoadState) {
        *self.state.lock() = state;
    }

    pub(crate) fn active_leases(&self) -> usize {
        self.leases.load(Ordering::Acquire)
    }

    /// Record a successful load. Caller holds the slot lock.
    pub(crate) fn mark_loaded(&self, instance: &Arc<dyn Component>) {
        self.set_state(LoadState::Loaded);
        *self.loaded_at.lock() = Some(Utc::now());
        self.loads.fetch_add(1, Ordering::Relaxed);
        self.last_memory_estimate
            .store(instance.estimated_memory_bytes(), Ordering::Relaxed);
    }

    /// Record a teardown. Caller holds the slot lock.
    pub(crate) fn mark_unloaded(&self) {
        self.set_state(LoadState::Unloaded);
        *self.loaded_at.lock() = None;
        self.unloads.fetch_add(1, Ordering::Relaxed);
        self.last_memory_estimate.store(0, Ordering::Relaxed);
    }

    pub(crate) fn status(&self) -> ComponentStatus {
        // Busy slot means a load or unload is in progress; fall back to the
        // last recorded estimate instead of waiting on it.
        let (kind, estimated_memory_bytes) = match self.slot.try_lock() {
            Ok(slot) => match slot.as_ref() {
                Some(instance) => (Some(instance.kind()), instance.estimated_memory_bytes()),
                None => (None, 0),
            },
            Err(_) => (None, self.last_memory_estimate.load(Ordering::Relaxed)),
        };

        ComponentStatus {
            name: self.name.clone(),
            kind,
            state: self.state(),
            active_leases: self.active_leases(),
            loads: self.loads.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            unloads: self.unloads.load(Ordering::Relaxed),
            cleanup_failures: self.cleanup_failures.load(Ordering::Relaxed),
            estimated_memory_bytes,
            loaded_at: *self.loaded_at.lock(),
        }
    }
}

/// Resets a registration to `Unloaded` if a load is abandoned midway
/// (loader error, timeout, or the caller's future being dropped).
pub(crate) struct LoadingGuard<'a> {
    registration: &'a Registration,
    armed: bool,
}

impl<'a> LoadingGuard<'a> {
    pub(crate) fn new(registration: &'a Registration) -> Self {
        registration.set_state(LoadState::Loading);
        Self {
            registration,
            armed: true,
        }
    }

    pub(crate) fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.registration.set_state(LoadState::Unloaded);
        }
    }
}
