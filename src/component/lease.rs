//! Component leases
//!
//! A lease is a job's claim on a loaded component. Idle unloading skips any
//! component with outstanding leases.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::error::{ComponentError, Result};
use super::registration::Registration;
use super::traits::{downcast_component, Component};

/// Claim on a live component, obtained from [`ComponentManager::acquire`]
///
/// Hand it back with [`ComponentManager::release`] so the manager can apply
/// its unload policy. Dropping a lease only decrements the count; the
/// component then stays loaded until the next release or
/// [`ComponentManager::unload_idle`] sweep.
///
/// [`ComponentManager::acquire`]: super::ComponentManager::acquire
/// [`ComponentManager::release`]: super::ComponentManager::release
/// [`ComponentManager::unload_idle`]: super::ComponentManager::unload_idle
pub struct ComponentLease {
    registration: Arc<Registration>,
    instance: Arc<dyn Component>,
    released: bool,
}

impl ComponentLease {
    pub(crate) fn new(registration: Arc<Registration>, instance: Arc<dyn Component>) -> Self {
        Self {
            registration,
            instance,
            released: false,
        }
    }

    /// Registered component name
    pub fn name(&self) -> &str {
        &self.registration.name
    }

    /// The leased instance
    pub fn instance(&self) -> &Arc<dyn Component> {
        &self.instance
    }

    /// The leased instance as its concrete type
    pub fn get<T: Component>(&self) -> Result<Arc<T>> {
        downcast_component::<T>(self.instance.clone()).ok_or_else(|| {
            ComponentError::TypeMismatch {
                name: self.registration.name.clone(),
                expected: std::any::type_name::<T>(),
            }
        })
    }

    /// Give up the claim, returning the number of leases still outstanding
    ///
    /// The instance reference is dropped before the count goes down, so an
    /// idle unload that observes zero leases holds the last reference.
    pub(crate) fn surrender(mut self) -> usize {
        self.released = true;
        let registration = self.registration.clone();
        drop(self);
        decrement(&registration)
    }

    pub(crate) fn registration(&self) -> &Arc<Registration> {
        &self.registration
    }
}

impl std::fmt::Debug for ComponentLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentLease")
            .field("name", &self.registration.name)
            .field("kind", &self.instance.kind())
            .finish()
    }
}

impl Drop for ComponentLease {
    fn drop(&mut self) {
        if !self.released {
            decrement(&self.registration);
        }
    }
}

fn decrement(registration: &Registration) -> usize {
    let previous = registration
        .leases
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| Some(n.saturating_sub(1)))
        .unwrap_or(0);
    previous.saturating_sub(1)
}
