//! Component manager
//!
//! Registry of named heavyweight components, loaded on first use and torn
//! down deterministically.
//!
//! # Thread Safety
//!
//! The registry map sits behind a `parking_lot::RwLock` (never held across
//! an await). Each registration owns a `tokio::sync::Mutex` slot that is
//! held while its loader or unloader runs, so:
//!
//! - concurrent `load`s of one name share a single loader call,
//! - `load` and `unload` of one name never interleave,
//! - different names load in parallel.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::error::{ComponentError, Result};
use super::lease::ComponentLease;
use super::registration::{LoadingGuard, Registration};
use super::traits::{cleanup_unloader, downcast_component, Component, Loader, Unloader};
use super::types::{LoadState, ManagerConfig, ManagerStats, UnloadOutcome, UnloadPolicy};

/// Lazy component registry
///
/// Cheap to clone; clones share the same registrations.
#[derive(Clone)]
pub struct ComponentManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    registrations: RwLock<HashMap<String, Arc<Registration>>>,
    config: ManagerConfig,
}

impl Default for ComponentManager {
    fn default() -> Self {
        Self::new(ManagerConfig::default())
    }
}

impl ComponentManager {
    /// Create an empty manager
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                registrations: RwLock::new(HashMap::new()),
                config,
            }),
        }
    }

    /// Manager configuration
    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    /// Register a loader/unloader pair under `name`
    ///
    /// Fails if the name is already registered.
    pub fn register(&self, name: &str, loader: Loader, unloader: Unloader) -> Result<()> {
        let mut registrations = self.inner.registrations.write();
        if registrations.contains_key(name) {
            return Err(ComponentError::AlreadyRegistered(name.to_string()));
        }
        registrations.insert(
            name.to_string(),
            Arc::new(Registration::new(name.to_string(), loader, unloader)),
        );
        debug!("Registered component {}", name);
        Ok(())
    }

    /// Register a loader whose instances are torn down via `Component::cleanup`
    pub fn register_component(&self, name: &str, loader: Loader) -> Result<()> {
        self.register(name, loader, cleanup_unloader())
    }

    /// Check whether a name is registered
    pub fn is_registered(&self, name: &str) -> bool {
        self.inner.registrations.read().contains_key(name)
    }

    /// Check whether a live instance exists for a name
    pub fn is_loaded(&self, name: &str) -> bool {
        self.lookup(name)
            .map(|r| r.state() == LoadState::Loaded)
            .unwrap_or(false)
    }

    /// Lifecycle state for a name, `None` if unregistered
    pub fn state(&self, name: &str) -> Option<LoadState> {
        self.lookup(name).map(|r| r.state())
    }

    /// Registered names, sorted
    pub fn registered_components(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.registrations.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Names with a live instance, sorted
    pub fn loaded_components(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .snapshot()
            .into_iter()
            .filter(|r| r.state() == LoadState::Loaded)
            .map(|r| r.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Get the live instance for `name`, loading it if necessary
    ///
    /// Loader errors come back as [`ComponentError::LoadFailed`] or
    /// [`ComponentError::Timeout`]; the slot stays empty so the next call
    /// retries the loader.
    pub async fn load(&self, name: &str) -> Result<Arc<dyn Component>> {
        let registration = self.registration(name)?;
        self.load_registration(&registration).await
    }

    /// Typed [`load`](Self::load)
    pub async fn load_as<T: Component>(&self, name: &str) -> Result<Arc<T>> {
        let instance = self.load(name).await?;
        downcast_component::<T>(instance).ok_or_else(|| ComponentError::TypeMismatch {
            name: name.to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    /// Tear down the live instance for `name`, if any
    ///
    /// Safe to call repeatedly and for names that were never loaded or
    /// registered. Cleanup errors are logged and reported in the outcome.
    pub async fn unload(&self, name: &str) -> UnloadOutcome {
        match self.lookup(name) {
            Some(registration) => self.unload_registration(&registration).await,
            None => {
                debug!("Unload requested for unregistered component {}", name);
                UnloadOutcome::NotLoaded
            }
        }
    }

    /// Load `name` and take a lease on it
    pub async fn acquire(&self, name: &str) -> Result<ComponentLease> {
        let registration = self.registration(name)?;

        // Count the lease before loading so an idle unload racing with this
        // call sees the component as in use.
        registration.leases.fetch_add(1, Ordering::AcqRel);

        match self.load_registration(&registration).await {
            Ok(instance) => Ok(ComponentLease::new(registration, instance)),
            Err(e) => {
                registration.leases.fetch_sub(1, Ordering::AcqRel);
                Err(e)
            }
        }
    }

    /// Return a lease, unloading the component if it became idle
    ///
    /// Returns `None` when no unload was attempted (other leases remain, or
    /// the policy is [`UnloadPolicy::Manual`]).
    pub async fn release(&self, lease: ComponentLease) -> Option<UnloadOutcome> {
        let registration = lease.registration().clone();
        let remaining = lease.surrender();

        if remaining > 0 {
            debug!(
                "Released component {} ({} leases remaining)",
                registration.name, remaining
            );
            return None;
        }

        match self.inner.config.unload_policy {
            UnloadPolicy::Manual => None,
            UnloadPolicy::WhenIdle => Some(self.unload_if_idle(&registration).await),
        }
    }

    /// Unload every loaded component with no outstanding leases
    pub async fn unload_idle(&self) -> Vec<(String, UnloadOutcome)> {
        let mut outcomes = Vec::new();
        for registration in self.snapshot() {
            if registration.state() != LoadState::Loaded || registration.active_leases() > 0 {
                continue;
            }
            let outcome = self.unload_if_idle(&registration).await;
            outcomes.push((registration.name.clone(), outcome));
        }
        outcomes
    }

    /// Load every registered component up front
    ///
    /// Used for the eager baseline. Stops at the first loader failure.
    pub async fn preload_all(&self) -> Result<usize> {
        let registrations = self.snapshot();
        info!("Preloading {} components", registrations.len());
        for registration in &registrations {
            self.load_registration(registration).await?;
        }
        Ok(registrations.len())
    }

    /// Unload every component regardless of leases
    pub async fn unload_all(&self) -> Vec<(String, UnloadOutcome)> {
        let mut outcomes = Vec::new();
        for registration in self.snapshot() {
            let outcome = self.unload_registration(&registration).await;
            outcomes.push((registration.name.clone(), outcome));
        }
        outcomes
    }

    /// Aggregate statistics
    pub fn stats(&self) -> ManagerStats {
        let mut components: Vec<_> = self.snapshot().iter().map(|r| r.status()).collect();
        components.sort_by(|a, b| a.name.cmp(&b.name));

        ManagerStats {
            registered: components.len(),
            loaded: components
                .iter()
                .filter(|c| c.state == LoadState::Loaded)
                .count(),
            loads: components.iter().map(|c| c.loads).sum(),
            load_failures: components.iter().map(|c| c.load_failures).sum(),
            unloads: components.iter().map(|c| c.unloads).sum(),
            cleanup_failures: components.iter().map(|c| c.cleanup_failures).sum(),
            estimated_memory_bytes: components.iter().map(|c| c.estimated_memory_bytes).sum(),
            components,
        }
    }

    fn lookup(&self, name: &str) -> Option<Arc<Registration>> {
        self.inner.registrations.read().get(name).cloned()
    }

    fn registration(&self, name: &str) -> Result<Arc<Registration>> {
        self.lookup(name)
            .ok_or_else(|| ComponentError::NotRegistered(name.to_string()))
    }

    fn snapshot(&self) -> Vec<Arc<Registration>> {
        let mut registrations: Vec<_> = self.inner.registrations.read().values().cloned().collect();
        registrations.sort_by(|a, b| a.name.cmp(&b.name));
        registrations
    }

    async fn load_registration(&self, registration: &Registration) -> Result<Arc<dyn Component>> {
        let mut slot = registration.slot.lock().await;
        if let Some(instance) = slot.as_ref() {
            debug!("Component {} already loaded", registration.name);
            return Ok(instance.clone());
        }

        let guard = LoadingGuard::new(registration);
        let load_timeout = self.inner.config.load_timeout;
        info!("Loading component {}", registration.name);
        let started = Instant::now();

        let instance = match timeout(load_timeout, (registration.loader)()).await {
            Ok(Ok(instance)) => instance,
            Ok(Err(e)) => {
                registration.load_failures.fetch_add(1, Ordering::Relaxed);
                error!("Failed to load component {}: {}", registration.name, e);
                return Err(if e.is_load_failure() {
                    e
                } else {
                    ComponentError::load_failed(&registration.name, e)
                });
            }
            Err(_) => {
                registration.load_failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    "Loading component {} timed out after {:?}",
                    registration.name, load_timeout
                );
                return Err(ComponentError::Timeout {
                    name: registration.name.clone(),
                    secs: load_timeout.as_secs(),
                });
            }
        };

        *slot = Some(instance.clone());
        registration.mark_loaded(&instance);
        guard.disarm();

        info!(
            "Loaded component {} ({}) in {:?}",
            registration.name,
            instance.kind(),
            started.elapsed()
        );
        Ok(instance)
    }

    async fn unload_registration(&self, registration: &Registration) -> UnloadOutcome {
        let mut slot = registration.slot.lock().await;
        self.teardown(registration, &mut slot).await
    }

    async fn unload_if_idle(&self, registration: &Registration) -> UnloadOutcome {
        let mut slot = registration.slot.lock().await;

        // Re-check under the slot lock: a job may have acquired the
        // component between the last release and now.
        let leases = registration.active_leases();
        if leases > 0 {
            debug!(
                "Keeping component {} loaded ({} active leases)",
                registration.name, leases
            );
            return UnloadOutcome::InUse(leases);
        }

        self.teardown(registration, &mut slot).await
    }

    async fn teardown(
        &self,
        registration: &Registration,
        slot: &mut Option<Arc<dyn Component>>,
    ) -> UnloadOutcome {
        let Some(instance) = slot.take() else {
            debug!("Component {} not loaded, nothing to unload", registration.name);
            return UnloadOutcome::NotLoaded;
        };
        registration.mark_unloaded();

        let leases = registration.active_leases();
        if leases > 0 {
            warn!(
                "Unloading component {} while {} leases are outstanding",
                registration.name, leases
            );
        }

        info!("Unloading component {}", registration.name);
        match (registration.unloader)(instance).await {
            Ok(()) => {
                info!("Unloaded component {}", registration.name);
                UnloadOutcome::Unloaded
            }
            Err(e) => {
                registration.cleanup_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Cleanup of component {} failed, continuing: {}",
                    registration.name, e
                );
                UnloadOutcome::CleanupFailed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{loader_fn, unloader_fn};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::time::Duration;

    struct FakeEngine {
        cleaned: Arc<AtomicBool>,
        fail_cleanup: bool,
    }

    #[async_trait]
    impl Component for FakeEngine {
        fn kind(&self) -> &'static str {
            "fake_engine"
        }

        fn estimated_memory_bytes(&self) -> u64 {
            1024
        }

        async fn cleanup(&self) -> Result<()> {
            self.cleaned.store(true, Ordering::SeqCst);
            if self.fail_cleanup {
                return Err(ComponentError::CleanupFailed("engine refused to stop".into()));
            }
            Ok(())
        }
    }

    struct OtherEngine;

    #[async_trait]
    impl Component for OtherEngine {
        fn kind(&self) -> &'static str {
            "other_engine"
        }

        async fn cleanup(&self) -> Result<()> {
            Ok(())
        }
    }

    struct LoadTracker {
        loads: Arc<AtomicUsize>,
        cleaned: Arc<AtomicBool>,
    }

    fn register_fake(manager: &ComponentManager, name: &str, fail_cleanup: bool) -> LoadTracker {
        let loads = Arc::new(AtomicUsize::new(0));
        let cleaned = Arc::new(AtomicBool::new(false));
        let (l, c) = (loads.clone(), cleaned.clone());
        manager
            .register_component(
                name,
                loader_fn(move || {
                    let loads = l.clone();
                    let cleaned = c.clone();
                    async move {
                        loads.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(FakeEngine {
                            cleaned,
                            fail_cleanup,
                        })
                    }
                }),
            )
            .unwrap();
        LoadTracker { loads, cleaned }
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_name() {
        let manager = ComponentManager::default();
        register_fake(&manager, "pdf", false);

        let result = manager.register_component("pdf", loader_fn(|| async { Ok(OtherEngine) }));
        assert!(matches!(result, Err(ComponentError::AlreadyRegistered(name)) if name == "pdf"));
        assert_eq!(manager.registered_components(), vec!["pdf".to_string()]);
    }

    #[tokio::test]
    async fn test_load_is_lazy_and_reuses_instance() {
        let manager = ComponentManager::default();
        let tracker = register_fake(&manager, "pdf", false);

        assert!(!manager.is_loaded("pdf"));
        assert_eq!(tracker.loads.load(Ordering::SeqCst), 0);

        let first = manager.load("pdf").await.unwrap();
        let second = manager.load("pdf").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(tracker.loads.load(Ordering::SeqCst), 1);
        assert!(manager.is_loaded("pdf"));
        assert_eq!(manager.loaded_components(), vec!["pdf".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_loads_share_one_loader_call() {
        let manager = ComponentManager::default();
        let tracker = register_fake(&manager, "ocr", false);

        let (a, b, c) = tokio::join!(manager.load("ocr"), manager.load("ocr"), manager.load("ocr"));
        let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());

        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&b, &c));
        assert_eq!(tracker.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_load_unknown_name() {
        let manager = ComponentManager::default();
        let result = manager.load("missing").await;
        assert!(matches!(result, Err(ComponentError::NotRegistered(_))));
    }

    #[tokio::test]
    async fn test_loader_failure_propagates_and_is_retryable() {
        let manager = ComponentManager::default();
        let attempts = Arc::new(AtomicUsize::new(0));
        let a = attempts.clone();
        manager
            .register_component(
                "flaky",
                loader_fn(move || {
                    let attempts = a.clone();
                    async move {
                        if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                            Err(ComponentError::InvalidConfig("model path missing".into()))
                        } else {
                            Ok(OtherEngine)
                        }
                    }
                }),
            )
            .unwrap();

        let err = manager.load("flaky").await.err().unwrap();
        assert!(err.is_load_failure());
        assert!(matches!(err, ComponentError::LoadFailed { ref name, .. } if name == "flaky"));
        assert_eq!(manager.state("flaky"), Some(LoadState::Unloaded));

        manager.load("flaky").await.unwrap();
        assert!(manager.is_loaded("flaky"));
        assert_eq!(manager.stats().load_failures, 1);
    }

    #[tokio::test]
    async fn test_load_timeout() {
        let manager = ComponentManager::new(ManagerConfig {
            load_timeout: Duration::from_millis(50),
            ..Default::default()
        });
        manager
            .register_component(
                "slow",
                loader_fn(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(OtherEngine)
                }),
            )
            .unwrap();

        let result = manager.load("slow").await;
        assert!(matches!(result, Err(ComponentError::Timeout { .. })));
        assert_eq!(manager.state("slow"), Some(LoadState::Unloaded));
    }

    #[tokio::test]
    async fn test_load_as_type_mismatch() {
        let manager = ComponentManager::default();
        register_fake(&manager, "pdf", false);

        assert!(manager.load_as::<FakeEngine>("pdf").await.is_ok());
        let result = manager.load_as::<OtherEngine>("pdf").await;
        assert!(matches!(result, Err(ComponentError::TypeMismatch { .. })));
    }

    #[tokio::test]
    async fn test_unload_runs_cleanup_and_clears_slot() {
        let manager = ComponentManager::default();
        let tracker = register_fake(&manager, "pdf", false);

        let instance = manager.load("pdf").await.unwrap();
        assert_eq!(manager.unload("pdf").await, UnloadOutcome::Unloaded);

        assert!(tracker.cleaned.load(Ordering::SeqCst));
        assert!(!manager.is_loaded("pdf"));
        // Manager no longer references the instance
        assert_eq!(Arc::strong_count(&instance), 1);
    }

    #[tokio::test]
    async fn test_repeated_unload_is_noop() {
        let manager = ComponentManager::default();
        register_fake(&manager, "pdf", false);

        manager.load("pdf").await.unwrap();
        assert_eq!(manager.unload("pdf").await, UnloadOutcome::Unloaded);
        assert_eq!(manager.unload("pdf").await, UnloadOutcome::NotLoaded);
        assert_eq!(manager.unload("pdf").await, UnloadOutcome::NotLoaded);
        assert_eq!(manager.stats().unloads, 1);
    }

    #[tokio::test]
    async fn test_unload_never_loaded_or_unregistered() {
        let manager = ComponentManager::default();
        let tracker = register_fake(&manager, "pdf", false);

        assert_eq!(manager.unload("pdf").await, UnloadOutcome::NotLoaded);
        assert_eq!(manager.unload("nope").await, UnloadOutcome::NotLoaded);
        assert!(!tracker.cleaned.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_cleanup_failure_is_reported_not_raised() {
        let manager = ComponentManager::default();
        register_fake(&manager, "pdf", true);

        manager.load("pdf").await.unwrap();
        let outcome = manager.unload("pdf").await;

        assert!(matches!(outcome, UnloadOutcome::CleanupFailed(_)));
        assert!(!manager.is_loaded("pdf"));
        assert_eq!(manager.stats().cleanup_failures, 1);

        // Still reloadable afterwards
        manager.load("pdf").await.unwrap();
        assert!(manager.is_loaded("pdf"));
    }

    #[tokio::test]
    async fn test_custom_unloader() {
        let manager = ComponentManager::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        manager
            .register(
                "image",
                loader_fn(|| async { Ok(OtherEngine) }),
                unloader_fn(move |instance| {
                    let calls = c.clone();
                    async move {
                        assert_eq!(instance.kind(), "other_engine");
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }),
            )
            .unwrap();

        manager.load("image").await.unwrap();
        manager.unload("image").await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_release_unloads_when_idle() {
        let manager = ComponentManager::default();
        let tracker = register_fake(&manager, "text", false);

        let first = manager.acquire("text").await.unwrap();
        let second = manager.acquire("text").await.unwrap();
        assert_eq!(manager.stats().components[0].active_leases, 2);

        assert_eq!(manager.release(first).await, None);
        assert!(manager.is_loaded("text"));

        assert_eq!(manager.release(second).await, Some(UnloadOutcome::Unloaded));
        assert!(!manager.is_loaded("text"));
        assert!(tracker.cleaned.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_manual_policy_keeps_components_loaded() {
        let manager = ComponentManager::new(ManagerConfig {
            unload_policy: UnloadPolicy::Manual,
            ..Default::default()
        });
        register_fake(&manager, "text", false);

        let lease = manager.acquire("text").await.unwrap();
        assert_eq!(manager.release(lease).await, None);
        assert!(manager.is_loaded("text"));
    }

    #[tokio::test]
    async fn test_dropped_lease_is_swept_by_unload_idle() {
        let manager = ComponentManager::default();
        register_fake(&manager, "text", false);
        register_fake(&manager, "pdf", false);

        let held = manager.acquire("pdf").await.unwrap();
        {
            let _dropped = manager.acquire("text").await.unwrap();
        }
        assert!(manager.is_loaded("text"));

        let outcomes = manager.unload_idle().await;
        assert_eq!(outcomes, vec![("text".to_string(), UnloadOutcome::Unloaded)]);
        assert!(manager.is_loaded("pdf"));

        assert_eq!(held.get::<FakeEngine>().unwrap().kind(), "fake_engine");
        manager.release(held).await;
        assert!(manager.loaded_components().is_empty());
    }

    #[tokio::test]
    async fn test_failed_acquire_does_not_leak_lease() {
        let manager = ComponentManager::default();
        manager
            .register_component(
                "broken",
                loader_fn(|| async {
                    Err::<OtherEngine, _>(ComponentError::InvalidConfig("no weights".into()))
                }),
            )
            .unwrap();

        assert!(manager.acquire("broken").await.is_err());
        assert_eq!(manager.stats().components[0].active_leases, 0);
    }

    #[tokio::test]
    async fn test_preload_and_unload_all() {
        let manager = ComponentManager::default();
        register_fake(&manager, "a", false);
        register_fake(&manager, "b", true);

        assert_eq!(manager.preload_all().await.unwrap(), 2);
        let stats = manager.stats();
        assert_eq!(stats.loaded, 2);
        assert_eq!(stats.estimated_memory_bytes, 2048);

        let outcomes = manager.unload_all().await;
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0], ("a".to_string(), UnloadOutcome::Unloaded));
        assert!(matches!(outcomes[1].1, UnloadOutcome::CleanupFailed(_)));
        assert!(manager.loaded_components().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_interleaved_acquire_and_release_never_tear_down_leased_instance() {
        let manager = ComponentManager::default();
        let loads = Arc::new(AtomicUsize::new(0));
        let leased_at_teardown = Arc::new(AtomicUsize::new(0));

        let (l, t) = (loads.clone(), leased_at_teardown.clone());
        manager
            .register(
                "ocr",
                loader_fn(move || {
                    let loads = l.clone();
                    async move {
                        loads.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        Ok(OtherEngine)
                    }
                }),
                unloader_fn(move |instance| {
                    let leased = t.clone();
                    async move {
                        // Any other strong reference belongs to a live lease
                        if Arc::strong_count(&instance) > 1 {
                            leased.fetch_add(1, Ordering::SeqCst);
                        }
                        tokio::task::yield_now().await;
                        instance.cleanup().await
                    }
                }),
            )
            .unwrap();

        let mut workers = Vec::new();
        for _ in 0..8 {
            let manager = manager.clone();
            workers.push(tokio::spawn(async move {
                for _ in 0..25 {
                    let lease = manager.acquire("ocr").await.unwrap();
                    let instance = lease.instance().clone();
                    tokio::task::yield_now().await;
                    assert_eq!(instance.kind(), "other_engine");
                    drop(instance);
                    manager.release(lease).await;
                }
            }));
        }
        for worker in workers {
            worker.await.unwrap();
        }

        assert_eq!(leased_at_teardown.load(Ordering::SeqCst), 0);

        let stats = manager.stats();
        let loads = loads.load(Ordering::SeqCst);
        assert!((1..=200).contains(&loads));
        assert_eq!(stats.loads, loads as u64);
        assert_eq!(stats.unloads, stats.loads);
        assert_eq!(stats.components[0].active_leases, 0);
        assert!(!manager.is_loaded("ocr"));
    }

    #[tokio::test]
    async fn test_release_surrenders_instance_before_idle_unload() {
        let manager = ComponentManager::default();
        let leased_at_teardown = Arc::new(AtomicBool::new(false));
        let t = leased_at_teardown.clone();
        manager
            .register(
                "text",
                loader_fn(|| async { Ok(OtherEngine) }),
                unloader_fn(move |instance| {
                    let leased = t.clone();
                    async move {
                        leased.store(Arc::strong_count(&instance) > 1, Ordering::SeqCst);
                        instance.cleanup().await
                    }
                }),
            )
            .unwrap();

        let lease = manager.acquire("text").await.unwrap();
        assert_eq!(manager.release(lease).await, Some(UnloadOutcome::Unloaded));
        assert!(!leased_at_teardown.load(Ordering::SeqCst));
    }
}
