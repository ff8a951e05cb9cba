//! Component manager types

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default time a loader may take before the load is abandoned
pub const DEFAULT_LOAD_TIMEOUT_SECS: u64 = 120;

/// Lifecycle state of a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    /// No live instance
    Unloaded,
    /// Loader is running
    Loading,
    /// Instance is live
    Loaded,
}

/// What happens when the last lease on a component is released
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnloadPolicy {
    /// Unload as soon as no job holds the component (lazy mode)
    WhenIdle,
    /// Keep components loaded until explicitly unloaded (eager baseline)
    Manual,
}

impl Default for UnloadPolicy {
    fn default() -> Self {
        Self::WhenIdle
    }
}

/// Result of an unload request
///
/// Unload never fails from the caller's point of view: cleanup errors are
/// logged and reported here instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "message", rename_all = "snake_case")]
pub enum UnloadOutcome {
    /// Nothing was loaded under the name
    NotLoaded,
    /// Instance cleaned up and released
    Unloaded,
    /// Instance released, but its cleanup reported an error
    CleanupFailed(String),
    /// Left loaded because a job still holds a lease
    InUse(usize),
}

impl UnloadOutcome {
    /// Whether an instance was actually torn down
    pub fn released_instance(&self) -> bool {
        matches!(self, Self::Unloaded | Self::CleanupFailed(_))
    }
}

/// Component manager configuration
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Maximum time a single loader may run
    pub load_timeout: Duration,
    /// Unloading behaviour when leases drop to zero
    pub unload_policy: UnloadPolicy,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            load_timeout: Duration::from_secs(DEFAULT_LOAD_TIMEOUT_SECS),
            unload_policy: UnloadPolicy::WhenIdle,
        }
    }
}

/// Point-in-time status of one registration
#[derive(Debug, Clone, Serialize)]
pub struct ComponentStatus {
    pub name: String,
    /// `Component::kind` of the live instance, if any
    pub kind: Option<&'static str>,
    pub state: LoadState,
    pub active_leases: usize,
    pub loads: u64,
    pub load_failures: u64,
    pub unloads: u64,
    pub cleanup_failures: u64,
    pub estimated_memory_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded_at: Option<DateTime<Utc>>,
}

/// Aggregate manager statistics
#[derive(Debug, Clone, Serialize)]
pub struct ManagerStats {
    /// Number of registrations
    pub registered: usize,
    /// Number of live instances
    pub loaded: usize,
    /// Successful loads across all components
    pub loads: u64,
    /// Failed or timed out loads
    pub load_failures: u64,
    /// Instances torn down
    pub unloads: u64,
    /// Teardowns whose cleanup reported an error
    pub cleanup_failures: u64,
    /// Sum of estimates for live instances
    pub estimated_memory_bytes: u64,
    /// Per-component breakdown, sorted by name
    pub components: Vec<ComponentStatus>,
}
