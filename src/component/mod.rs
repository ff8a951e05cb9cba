//! Lazy component lifecycle management
//!
//! Heavyweight engines (PDF processor, OCR, image and text extraction) are
//! registered once and only instantiated when a pipeline stage asks for
//! them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  ComponentManager                       │
//! │   name → Registration { loader, unloader, slot }        │
//! └─────────────────────────────────────────────────────────┘
//!        │ acquire(name)                  ▲ release(lease)
//!        ▼                                │
//!   ┌──────────────┐   loader()    ┌──────────────┐
//!   │  slot empty? │ ────────────▶ │ Arc<dyn      │
//!   │              │               │  Component>  │
//!   └──────────────┘               └──────────────┘
//!                                         │ last lease released
//!                                         ▼
//!                                  unloader(instance)
//!                                  (Component::cleanup)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use amnesia_pipeline::component::{loader_fn, ComponentManager, ManagerConfig};
//!
//! let manager = ComponentManager::new(ManagerConfig::default());
//! manager.register_component("pdf_processor", loader_fn(move || {
//!     let config = config.clone();
//!     async move { PdfProcessor::load(config).await }
//! }))?;
//!
//! let lease = manager.acquire("pdf_processor").await?;
//! let pdf = lease.get::<PdfProcessor>()?;
//! // ... run the stage ...
//! manager.release(lease).await;
//! ```

mod error;
mod lease;
mod manager;
mod registration;
mod traits;
mod types;

pub use error::{ComponentError, Result};
pub use lease::ComponentLease;
pub use manager::ComponentManager;
pub use traits::{
    cleanup_unloader, downcast_component, loader_fn, unloader_fn, AsAnyArc, Component, Loader,
    Unloader,
};
pub use types::{
    ComponentStatus, LoadState, ManagerConfig, ManagerStats, UnloadOutcome, UnloadPolicy,
    DEFAULT_LOAD_TIMEOUT_SECS,
};
